//! Finite-state scan over markup text.

use std::collections::HashSet;

use crate::error::Result;
use crate::events::ContentHandler;
use crate::generator::tag::ParsedTag;

const SCRIPT: &str = "script";

/// Where scanning resumes once a quoted string closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resume {
    Attributes,
    Skip,
}

/// Scanner state; each variant carries its own progress counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Character data.
    Outside,
    /// Right after `<`.
    TagStart,
    /// Inside a tag name.
    TagName,
    /// Past the tag name of a tag that may still become an element.
    Attributes,
    /// Inside markup that is passed through; waits for `>`.
    Skip,
    /// After `<!`, counting the dashes of a comment opener.
    CommentOpen { dashes: u8 },
    /// Inside `<!-- ... -->`, counting trailing dashes.
    Comment { dashes: u8 },
    /// Inside a script body; `matched` counts characters of `</script`.
    Script { matched: usize },
    /// Inside a quoted string.
    Quoted { quote: char, resume: Resume },
}

/// Incremental tag scanner emitting events for recognised tags.
#[derive(Debug)]
pub struct TagScanner {
    state: State,
    /// Uppercase tag names (`A`, `/A`, ...) to emit as elements; `None` = all.
    include: Option<HashSet<String>>,
    /// Committed character data not yet emitted.
    text: String,
    /// Text of a tag that may still become an element.
    markup: String,
    /// Whether `markup` is in use.
    pending: bool,
    tag_name: String,
}

impl TagScanner {
    pub fn new(include: Option<HashSet<String>>) -> Self {
        let mut scanner = Self {
            state: State::Outside,
            include: None,
            text: String::new(),
            markup: String::new(),
            pending: false,
            tag_name: String::new(),
        };
        scanner.set_include(include);
        scanner
    }

    /// Replace the inclusion set. Names are matched case-insensitively.
    pub fn set_include(&mut self, include: Option<HashSet<String>>) {
        self.include = include.map(|set| set.into_iter().map(|t| t.to_uppercase()).collect());
    }

    pub fn is_included(&self, tag_name: &str) -> bool {
        match &self.include {
            None => true,
            Some(set) => set.contains(&tag_name.to_uppercase()),
        }
    }

    /// Whether no characters are held back.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.markup.is_empty()
    }

    /// Scan one chunk of text.
    pub fn feed(&mut self, chunk: &str, out: &mut dyn ContentHandler) -> Result<()> {
        for c in chunk.chars() {
            self.step(c, out)?;
        }
        Ok(())
    }

    /// Emit committed character data. Markup that may still become an
    /// element stays buffered.
    pub fn flush(&mut self, out: &mut dyn ContentHandler) -> Result<()> {
        if !self.text.is_empty() {
            let text = std::mem::take(&mut self.text);
            out.characters(&text)?;
        }
        Ok(())
    }

    /// Emit everything still held, incomplete markup as plain text.
    pub fn finish(&mut self, out: &mut dyn ContentHandler) -> Result<()> {
        self.demote();
        self.flush(out)?;
        self.state = State::Outside;
        Ok(())
    }

    fn step(&mut self, c: char, out: &mut dyn ContentHandler) -> Result<()> {
        match self.state {
            State::Outside => {
                if c == '<' {
                    self.flush(out)?;
                    self.begin_markup();
                    self.state = State::TagStart;
                } else {
                    self.text.push(c);
                }
            }
            State::TagStart => {
                self.push(c);
                match c {
                    '!' => {
                        self.demote();
                        self.state = State::CommentOpen { dashes: 0 };
                    }
                    '"' | '\'' => {
                        self.demote();
                        self.state = State::Quoted {
                            quote: c,
                            resume: Resume::Skip,
                        };
                    }
                    '>' => {
                        self.demote();
                        self.state = State::Outside;
                    }
                    c if c.is_whitespace() => {
                        self.demote();
                        self.state = State::Skip;
                    }
                    c => {
                        self.tag_name.push(c);
                        self.state = State::TagName;
                    }
                }
            }
            State::TagName => {
                self.push(c);
                match c {
                    '"' | '\'' => {
                        self.decide();
                        self.state = State::Quoted {
                            quote: c,
                            resume: Resume::Attributes,
                        };
                    }
                    '>' => {
                        self.decide();
                        self.close_tag(out)?;
                    }
                    '/' if self.tag_name != "/" => {
                        self.decide();
                        self.state = State::Attributes;
                    }
                    c if c.is_whitespace() => {
                        self.decide();
                        self.state = State::Attributes;
                    }
                    c => self.tag_name.push(c),
                }
            }
            State::Attributes => {
                self.push(c);
                match c {
                    '"' | '\'' => {
                        self.state = State::Quoted {
                            quote: c,
                            resume: Resume::Attributes,
                        };
                    }
                    '>' => self.close_tag(out)?,
                    _ => {}
                }
            }
            State::Skip => {
                self.push(c);
                match c {
                    '"' | '\'' => {
                        self.state = State::Quoted {
                            quote: c,
                            resume: Resume::Skip,
                        };
                    }
                    '>' => self.state = State::Outside,
                    _ => {}
                }
            }
            State::CommentOpen { dashes } => {
                self.push(c);
                self.state = match c {
                    '-' if dashes == 1 => State::Comment { dashes: 0 },
                    '-' => State::CommentOpen { dashes: dashes + 1 },
                    '"' | '\'' => State::Quoted {
                        quote: c,
                        resume: Resume::Skip,
                    },
                    '>' => State::Outside,
                    _ => State::Skip,
                };
            }
            State::Comment { dashes } => {
                self.push(c);
                self.state = match c {
                    '-' => State::Comment {
                        dashes: (dashes + 1).min(2),
                    },
                    '>' if dashes >= 2 => State::Outside,
                    _ => State::Comment { dashes: 0 },
                };
            }
            State::Script { matched } => self.step_script(c, matched, out)?,
            State::Quoted { quote, resume } => {
                self.push(c);
                if c == quote {
                    self.state = match resume {
                        Resume::Attributes => State::Attributes,
                        Resume::Skip => State::Skip,
                    };
                }
            }
        }
        Ok(())
    }

    fn step_script(&mut self, c: char, matched: usize, out: &mut dyn ContentHandler) -> Result<()> {
        match matched {
            0 => {
                if c == '<' {
                    self.flush(out)?;
                    self.begin_markup();
                    self.state = State::Script { matched: 1 };
                } else {
                    self.text.push(c);
                }
            }
            1 if c == '/' => {
                self.push(c);
                self.state = State::Script { matched: 2 };
            }
            n if (2..2 + SCRIPT.len()).contains(&n) => {
                let expected = SCRIPT.as_bytes()[n - 2] as char;
                if c.eq_ignore_ascii_case(&expected) {
                    self.push(c);
                    self.state = State::Script { matched: n + 1 };
                } else {
                    self.abandon_script_close(c, out)?;
                }
            }
            n if n == 2 + SCRIPT.len() => {
                self.push(c);
                if c == '>' {
                    if self.is_included("SCRIPT") || self.is_included("/SCRIPT") {
                        self.emit_markup(out)?;
                    } else {
                        self.demote();
                    }
                    self.state = State::Outside;
                }
            }
            _ => self.abandon_script_close(c, out)?,
        }
        Ok(())
    }

    /// The characters after `<` in a script body were not `/script`.
    fn abandon_script_close(&mut self, c: char, out: &mut dyn ContentHandler) -> Result<()> {
        self.demote();
        self.state = State::Script { matched: 0 };
        self.step_script(c, 0, out)
    }

    fn begin_markup(&mut self) {
        self.markup.clear();
        self.markup.push('<');
        self.pending = true;
        self.tag_name.clear();
    }

    fn push(&mut self, c: char) {
        if self.pending {
            self.markup.push(c);
        } else {
            self.text.push(c);
        }
    }

    /// Give up on the pending markup; it becomes plain text.
    fn demote(&mut self) {
        if self.pending {
            self.text.push_str(&self.markup);
            self.markup.clear();
            self.pending = false;
        }
    }

    /// The tag name is complete: keep the markup only if it is included.
    fn decide(&mut self) {
        if !self.is_included(&self.tag_name) {
            self.demote();
        }
    }

    /// `>` of a start or end tag.
    fn close_tag(&mut self, out: &mut dyn ContentHandler) -> Result<()> {
        if self.pending {
            self.emit_markup(out)?;
        }
        self.state = if self.tag_name.eq_ignore_ascii_case(SCRIPT) {
            State::Script { matched: 0 }
        } else {
            State::Outside
        };
        Ok(())
    }

    fn emit_markup(&mut self, out: &mut dyn ContentHandler) -> Result<()> {
        self.flush(out)?;
        let tag = ParsedTag::parse(&self.markup);
        self.markup.clear();
        self.pending = false;
        if tag.end_tag {
            out.end_element(&tag.name)
        } else {
            out.start_element(&tag.name, &tag.to_attributes())
        }
    }
}
