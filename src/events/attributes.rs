//! Element attributes with a lexical side channel.

use std::fmt;

/// Namespace of the synthetic attributes added by the generator.
pub const NAMESPACE: &str = "urn:content-rewriter";

/// Synthetic attribute holding one quote marker per regular attribute.
pub const QUOTES_ATTR: &str = "quotes";

/// Synthetic boolean attribute marking a `/>` self-closing tag.
pub const END_SLASH_ATTR: &str = "endSlash";

/// How an attribute value was quoted in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quote {
    #[default]
    Double,
    Single,
    Unquoted,
}

impl Quote {
    /// Marker character stored in the quotes side channel.
    pub fn as_char(self) -> char {
        match self {
            Quote::Double => '"',
            Quote::Single => '\'',
            Quote::Unquoted => ' ',
        }
    }

    pub fn from_char(c: char) -> Self {
        match c {
            '\'' => Quote::Single,
            ' ' => Quote::Unquoted,
            _ => Quote::Double,
        }
    }
}

/// A single attribute. Synthetic attributes carry [`NAMESPACE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub namespace: Option<String>,
    pub name: String,
    /// `None` for a bare attribute such as `disabled`.
    pub value: Option<String>,
}

impl Attribute {
    pub fn is_synthetic(&self) -> bool {
        self.namespace.as_deref() == Some(NAMESPACE)
    }
}

/// Ordered attribute list of one element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    items: Vec<Attribute>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a regular attribute without quote information.
    pub fn push(&mut self, name: impl Into<String>, value: Option<&str>) {
        self.items.push(Attribute {
            namespace: None,
            name: name.into(),
            value: value.map(str::to_string),
        });
    }

    /// Append a regular attribute and record its quote character.
    pub fn push_quoted(&mut self, name: impl Into<String>, value: Option<&str>, quote: Quote) {
        let index = self.len();
        self.push(name, value);
        let mut quotes: Vec<char> = self.quotes().map(|q| q.chars().collect()).unwrap_or_default();
        quotes.resize(index, Quote::Double.as_char());
        quotes.push(quote.as_char());
        self.set_synthetic(QUOTES_ATTR, Some(quotes.into_iter().collect()));
    }

    /// Mark the element as written in self-closing form.
    pub fn set_end_slash(&mut self, end_slash: bool) {
        if end_slash {
            self.set_synthetic(END_SLASH_ATTR, Some(String::new()));
        } else {
            self.items
                .retain(|a| !(a.is_synthetic() && a.name == END_SLASH_ATTR));
        }
    }

    pub fn has_end_slash(&self) -> bool {
        self.synthetic(END_SLASH_ATTR).is_some()
    }

    /// The packed quote markers, if the generator recorded them.
    pub fn quotes(&self) -> Option<&str> {
        self.synthetic(QUOTES_ATTR).and_then(|a| a.value.as_deref())
    }

    /// Quote character for the regular attribute at `index`, `"` if unknown.
    pub fn quote_at(&self, index: usize) -> Quote {
        self.quotes()
            .and_then(|q| q.chars().nth(index))
            .map(Quote::from_char)
            .unwrap_or_default()
    }

    /// Value of a regular attribute.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.regular()
            .find(|a| a.name == name)
            .and_then(|a| a.value.as_deref())
    }

    /// Replace the value of a regular attribute, keeping its position and quoting.
    /// Returns `false` if the attribute does not exist.
    pub fn set(&mut self, name: &str, value: &str) -> bool {
        match self
            .items
            .iter_mut()
            .find(|a| !a.is_synthetic() && a.name == name)
        {
            Some(attr) => {
                attr.value = Some(value.to_string());
                true
            }
            None => false,
        }
    }

    /// Remove a regular attribute together with its quote marker.
    pub fn remove(&mut self, name: &str) -> bool {
        let Some(index) = self.regular().position(|a| a.name == name) else {
            return false;
        };
        let pos = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, a)| !a.is_synthetic())
            .nth(index)
            .map(|(i, _)| i);
        if let Some(pos) = pos {
            self.items.remove(pos);
        }
        if let Some(quotes) = self.quotes() {
            let mut quotes: Vec<char> = quotes.chars().collect();
            if index < quotes.len() {
                quotes.remove(index);
            }
            self.set_synthetic(QUOTES_ATTR, Some(quotes.into_iter().collect()));
        }
        true
    }

    /// Regular (non-synthetic) attributes in source order.
    pub fn regular(&self) -> impl Iterator<Item = &Attribute> {
        self.items.iter().filter(|a| !a.is_synthetic())
    }

    /// Every attribute, synthetic ones included.
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.items.iter()
    }

    /// Number of regular attributes.
    pub fn len(&self) -> usize {
        self.regular().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn synthetic(&self, name: &str) -> Option<&Attribute> {
        self.items
            .iter()
            .find(|a| a.is_synthetic() && a.name == name)
    }

    fn set_synthetic(&mut self, name: &str, value: Option<String>) {
        if let Some(attr) = self
            .items
            .iter_mut()
            .find(|a| a.is_synthetic() && a.name == name)
        {
            attr.value = value;
            return;
        }
        self.items.push(Attribute {
            namespace: Some(NAMESPACE.to_string()),
            name: name.to_string(),
            value,
        });
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, attr) in self.regular().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match &attr.value {
                Some(v) => write!(f, "{}={:?}", attr.name, v)?,
                None => f.write_str(&attr.name)?,
            }
        }
        Ok(())
    }
}
