//! Decomposition of a single recognised tag.

use crate::events::{Attributes, Quote};

/// One tag split into its parts, e.g. `<a href='x'>` or `</a>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTag {
    pub name: String,
    pub end_tag: bool,
    /// `(name, value, quote)` in source order.
    pub attributes: Vec<(String, Option<String>, Quote)>,
    pub end_slash: bool,
}

impl ParsedTag {
    /// Parse the full text of a tag, angle brackets included.
    pub fn parse(snippet: &str) -> Self {
        let inner = snippet.strip_prefix('<').unwrap_or(snippet);
        let inner = inner.strip_suffix('>').unwrap_or(inner);
        let (end_tag, inner) = match inner.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, inner),
        };

        let chars: Vec<char> = inner.chars().collect();
        let mut pos = 0;

        let name_start = pos;
        while pos < chars.len() && !chars[pos].is_whitespace() && chars[pos] != '/' {
            pos += 1;
        }
        let name: String = chars[name_start..pos].iter().collect();

        let mut attributes = Vec::new();
        let mut end_slash = false;
        loop {
            while pos < chars.len() && chars[pos].is_whitespace() {
                pos += 1;
            }
            if pos >= chars.len() {
                break;
            }
            if chars[pos] == '/' {
                pos += 1;
                if chars[pos..].iter().all(|c| c.is_whitespace()) {
                    end_slash = true;
                }
                continue;
            }

            let attr_start = pos;
            while pos < chars.len()
                && !chars[pos].is_whitespace()
                && chars[pos] != '='
                && !(chars[pos] == '/' && pos > attr_start)
            {
                pos += 1;
            }
            let attr_name: String = chars[attr_start..pos].iter().collect();

            let mut lookahead = pos;
            while lookahead < chars.len() && chars[lookahead].is_whitespace() {
                lookahead += 1;
            }
            if lookahead >= chars.len() || chars[lookahead] != '=' {
                attributes.push((attr_name, None, Quote::Double));
                continue;
            }

            pos = lookahead + 1;
            while pos < chars.len() && chars[pos].is_whitespace() {
                pos += 1;
            }
            if pos >= chars.len() {
                attributes.push((attr_name, Some(String::new()), Quote::Unquoted));
                break;
            }

            let (value, quote) = match chars[pos] {
                q @ ('"' | '\'') => {
                    pos += 1;
                    let value_start = pos;
                    while pos < chars.len() && chars[pos] != q {
                        pos += 1;
                    }
                    let value: String = chars[value_start..pos].iter().collect();
                    pos += 1;
                    let quote = if q == '\'' { Quote::Single } else { Quote::Double };
                    (value, quote)
                }
                _ => {
                    let value_start = pos;
                    while pos < chars.len() && !chars[pos].is_whitespace() {
                        pos += 1;
                    }
                    let mut value: String = chars[value_start..pos].iter().collect();
                    // `<img src=x/>`: the trailing slash closes the tag
                    if pos >= chars.len() && value.len() > 1 && value.ends_with('/') {
                        value.pop();
                        end_slash = true;
                    }
                    (value, Quote::Unquoted)
                }
            };
            attributes.push((attr_name, Some(value), quote));
        }

        Self {
            name,
            end_tag,
            attributes,
            end_slash,
        }
    }

    /// Attributes in event form, lexical details in the side channel.
    pub fn to_attributes(&self) -> Attributes {
        let mut attrs = Attributes::new();
        for (name, value, quote) in &self.attributes {
            attrs.push_quoted(name.clone(), value.as_deref(), *quote);
        }
        attrs.set_end_slash(self.end_slash);
        attrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_tag_with_mixed_quotes() {
        let tag = ParsedTag::parse(r#"<a href='x' class="y" id=z>"#);
        assert_eq!(tag.name, "a");
        assert!(!tag.end_tag);
        assert!(!tag.end_slash);
        assert_eq!(
            tag.attributes,
            vec![
                ("href".to_string(), Some("x".to_string()), Quote::Single),
                ("class".to_string(), Some("y".to_string()), Quote::Double),
                ("id".to_string(), Some("z".to_string()), Quote::Unquoted),
            ]
        );
    }

    #[test]
    fn test_end_tag() {
        let tag = ParsedTag::parse("</BODY>");
        assert_eq!(tag.name, "BODY");
        assert!(tag.end_tag);
        assert!(tag.attributes.is_empty());
    }

    #[test]
    fn test_self_closing_and_bare_attributes() {
        let tag = ParsedTag::parse(r#"<input disabled value = "a b" />"#);
        assert_eq!(tag.name, "input");
        assert!(tag.end_slash);
        assert_eq!(tag.attributes[0], ("disabled".to_string(), None, Quote::Double));
        assert_eq!(
            tag.attributes[1],
            ("value".to_string(), Some("a b".to_string()), Quote::Double)
        );

        let compact = ParsedTag::parse("<img src=/a.png/>");
        assert!(compact.end_slash);
        assert_eq!(compact.attributes[0].1.as_deref(), Some("/a.png"));

        let bare = ParsedTag::parse("<br/>");
        assert_eq!(bare.name, "br");
        assert!(bare.end_slash);
    }

    #[test]
    fn test_gt_inside_quoted_value() {
        let tag = ParsedTag::parse(r#"<a title="a > b" href="/x">"#);
        assert_eq!(tag.attributes.len(), 2);
        assert_eq!(tag.attributes[0].1.as_deref(), Some("a > b"));
    }

    #[test]
    fn test_to_attributes_records_quotes() {
        let attrs = ParsedTag::parse("<a href='x'/>").to_attributes();
        assert_eq!(attrs.get("href"), Some("x"));
        assert_eq!(attrs.quote_at(0), Quote::Single);
        assert!(attrs.has_end_slash());
    }
}
