//! Message templates
//!
//! A template is literal text with `{name}` placeholders; `{{` and `}}` stand
//! for literal braces. The same template type is used in both directions:
//! error templates are compiled into regular expressions that capture the
//! placeholders out of a log error, and suggestion templates are filled in
//! from the captured (and resolved) variables.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use regex::Regex;

use crate::error::TemplateError;

/// Characters a bare placeholder may capture: identifier-like runs without
/// whitespace, quotes, brackets or separators.
const BARE_VALUE: &str = r#"[^\s"'`\[\](){}<>,;:=]"#;

const QUOTES: [char; 3] = ['\'', '"', '`'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((offset, c)) = chars.next() {
            match c {
                '{' if chars.next_if(|&(_, next)| next == '{').is_some() => literal.push('{'),
                '}' if chars.next_if(|&(_, next)| next == '}').is_some() => literal.push('}'),
                '}' => {
                    return Err(TemplateError::Unbalanced {
                        template: source.to_string(),
                        offset,
                    });
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;

                    for (_, c) in chars.by_ref() {
                        match c {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => break,
                            c => name.push(c),
                        }
                    }

                    if !closed {
                        return Err(TemplateError::Unbalanced {
                            template: source.to_string(),
                            offset,
                        });
                    }

                    if !is_identifier(&name) {
                        return Err(TemplateError::InvalidPlaceholder {
                            template: source.to_string(),
                            name,
                        });
                    }

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(name));
                }
                c => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Placeholder names in order of appearance, repeated names included.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Fills every placeholder from `variables`.
    pub fn interpolate(&self, variables: &BTreeMap<String, String>) -> Result<String, TemplateError> {
        let mut output = String::with_capacity(self.source.len());

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => output.push_str(text),
                Segment::Placeholder(name) => {
                    let value = variables
                        .get(name)
                        .ok_or_else(|| TemplateError::MissingVariable(name.clone()))?;
                    output.push_str(value);
                }
            }
        }

        Ok(output)
    }

    /// Compiles the template into an unanchored regex with one named group per
    /// distinct placeholder.
    ///
    /// A placeholder enclosed in a pair of matching quotes captures anything up
    /// to the closing quote; any other placeholder captures an identifier-like
    /// run. Placeholders are lazy except a trailing one, which is greedy so it
    /// takes the whole run instead of a single character.
    pub fn matcher(&self) -> Result<Regex, regex::Error> {
        let mut pattern = String::new();
        let mut seen = HashSet::new();
        let last = self.segments.len().saturating_sub(1);

        for (index, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(text) => pattern.push_str(&regex::escape(text)),
                Segment::Placeholder(name) => {
                    let class = match self.enclosing_quote(index) {
                        Some(quote) => format!("[^{quote}]"),
                        None => String::from(BARE_VALUE),
                    };
                    let repeat = if index == last { "+" } else { "+?" };

                    if seen.insert(name.as_str()) {
                        pattern.push_str(&format!("(?P<{name}>{class}{repeat})"));
                    } else {
                        pattern.push_str(&format!("(?:{class}{repeat})"));
                    }
                }
            }
        }

        Regex::new(&pattern)
    }

    /// Quote character that both precedes and follows the placeholder at `index`.
    fn enclosing_quote(&self, index: usize) -> Option<char> {
        let before = match self.segments.get(index.checked_sub(1)?)? {
            Segment::Literal(text) => text.chars().last()?,
            Segment::Placeholder(_) => return None,
        };
        let after = match self.segments.get(index + 1)? {
            Segment::Literal(text) => text.chars().next()?,
            Segment::Placeholder(_) => return None,
        };

        (before == after && QUOTES.contains(&before)).then_some(before)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
