//! CSS selector subset used by the in-memory UI.
//!
//! Supported grammar:
//!
//! ```text
//! list      := complex ("," complex)*
//! complex   := compound ((" " | ">") compound)*
//! compound  := (type | "*")? (".class" | "#id" | attr | pseudo)*
//! attr      := "[" name (("=" | "~=" | "^=" | "$=" | "*=") value)? "]"
//! pseudo    := ":disabled" | ":enabled" | ":first-child" | ":last-child" | ":nth-child(n)"
//! ```

use crate::result::{SettleError, SettleResult};

/// Element view the matcher walks. Implemented by the in-memory document.
pub trait Element: Copy {
    /// Lower-case tag name
    fn tag(&self) -> &str;
    /// Attribute value, if present
    fn attribute(&self, name: &str) -> Option<&str>;
    /// Parent element
    fn parent(&self) -> Option<Self>;
    /// 1-based position among element siblings, and sibling count
    fn position(&self) -> (usize, usize);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Equals,
    Includes,
    Prefix,
    Suffix,
    Substring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Filter {
    Class(String),
    Id(String),
    Attr {
        name: String,
        test: Option<(AttrOp, String)>,
    },
    Disabled,
    Enabled,
    FirstChild,
    LastChild,
    NthChild(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    filters: Vec<Filter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    /// Rightmost compound first; each carries the combinator linking it to the next one
    parts: Vec<(Compound, Option<Combinator>)>,
}

/// Parsed selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    alternatives: Vec<Complex>,
}

impl SelectorList {
    /// Parse a selector list
    pub fn parse(source: &str) -> SettleResult<Self> {
        Parser::new(source).parse_list()
    }

    /// Whether `el` matches any alternative
    #[must_use]
    pub fn matches<E: Element>(&self, el: E) -> bool {
        self.alternatives.iter().any(|c| match_from(&c.parts, 0, el))
    }
}

fn match_from<E: Element>(parts: &[(Compound, Option<Combinator>)], i: usize, el: E) -> bool {
    let Some((compound, combinator)) = parts.get(i) else {
        return true;
    };
    if !compound.matches(el) {
        return false;
    }
    match combinator {
        None => true,
        Some(Combinator::Child) => el.parent().is_some_and(|p| match_from(parts, i + 1, p)),
        Some(Combinator::Descendant) => {
            let mut cursor = el.parent();
            while let Some(ancestor) = cursor {
                if match_from(parts, i + 1, ancestor) {
                    return true;
                }
                cursor = ancestor.parent();
            }
            false
        }
    }
}

impl Compound {
    fn matches<E: Element>(&self, el: E) -> bool {
        if let Some(tag) = &self.tag {
            if !el.tag().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        self.filters.iter().all(|f| f.matches(el))
    }
}

impl Filter {
    fn matches<E: Element>(&self, el: E) -> bool {
        match self {
            Self::Class(class) => el
                .attribute("class")
                .is_some_and(|v| v.split_whitespace().any(|c| c == class)),
            Self::Id(id) => el.attribute("id") == Some(id.as_str()),
            Self::Attr { name, test } => match (el.attribute(name), test) {
                (None, _) => false,
                (Some(_), None) => true,
                (Some(v), Some((op, expected))) => match op {
                    AttrOp::Equals => v == expected,
                    AttrOp::Includes => v.split_whitespace().any(|w| w == expected),
                    AttrOp::Prefix => !expected.is_empty() && v.starts_with(expected.as_str()),
                    AttrOp::Suffix => !expected.is_empty() && v.ends_with(expected.as_str()),
                    AttrOp::Substring => !expected.is_empty() && v.contains(expected.as_str()),
                },
            },
            Self::Disabled => el.attribute("disabled").is_some(),
            Self::Enabled => el.attribute("disabled").is_none(),
            Self::FirstChild => el.position().0 == 1,
            Self::LastChild => {
                let (pos, count) = el.position();
                pos == count
            }
            Self::NthChild(n) => el.position().0 == *n,
        }
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> SettleError {
        SettleError::invalid_selector(self.source, message)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        self.pos += usize::from(c.is_some());
        c
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn expect(&mut self, want: char) -> SettleResult<()> {
        match self.bump() {
            Some(c) if c == want => Ok(()),
            Some(c) => Err(self.error(format!("expected '{want}', found '{c}'"))),
            None => Err(self.error(format!("expected '{want}', found end of input"))),
        }
    }

    fn parse_list(&mut self) -> SettleResult<SelectorList> {
        let mut alternatives = vec![self.parse_complex()?];
        while self.peek() == Some(',') {
            self.pos += 1;
            alternatives.push(self.parse_complex()?);
        }
        if let Some(c) = self.peek() {
            return Err(self.error(format!("unexpected '{c}'")));
        }
        Ok(SelectorList { alternatives })
    }

    fn parse_complex(&mut self) -> SettleResult<Complex> {
        self.skip_ws();
        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();
        loop {
            let spaced = self.skip_ws();
            let combinator = match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.pos += 1;
                    self.skip_ws();
                    Combinator::Child
                }
                Some(_) if spaced => Combinator::Descendant,
                Some(c) => return Err(self.error(format!("unexpected '{c}'"))),
            };
            combinators.push(combinator);
            compounds.push(self.parse_compound()?);
        }
        // Stored right to left: the subject compound first.
        let mut parts = Vec::with_capacity(compounds.len());
        for (i, compound) in compounds.into_iter().enumerate().rev() {
            let link = i.checked_sub(1).map(|j| combinators[j]);
            parts.push((compound, link));
        }
        Ok(Complex { parts })
    }

    fn parse_compound(&mut self) -> SettleResult<Compound> {
        let mut compound = Compound::default();
        let mut any = true;
        match self.peek() {
            Some('*') => self.pos += 1,
            Some(c) if is_ident_start(c) => compound.tag = Some(self.ident()?.to_ascii_lowercase()),
            _ => any = false,
        }
        loop {
            let filter = match self.peek() {
                Some('.') => {
                    self.pos += 1;
                    Filter::Class(self.ident()?)
                }
                Some('#') => {
                    self.pos += 1;
                    Filter::Id(self.ident()?)
                }
                Some('[') => self.attribute()?,
                Some(':') => self.pseudo()?,
                _ => break,
            };
            compound.filters.push(filter);
            any = true;
        }
        if any {
            Ok(compound)
        } else {
            Err(self.error(match self.peek() {
                Some(c) => format!("expected a simple selector, found '{c}'"),
                None => "expected a simple selector, found end of input".to_string(),
            }))
        }
    }

    fn ident(&mut self) -> SettleResult<String> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected an identifier"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn attribute(&mut self) -> SettleResult<Filter> {
        self.expect('[')?;
        self.skip_ws();
        let name = self.ident()?;
        self.skip_ws();
        let op = match self.peek() {
            Some(']') => None,
            Some('=') => Some(AttrOp::Equals),
            Some(c @ ('~' | '^' | '$' | '*')) => {
                self.pos += 1;
                Some(match c {
                    '~' => AttrOp::Includes,
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    _ => AttrOp::Substring,
                })
            }
            Some(c) => return Err(self.error(format!("unexpected '{c}' in attribute selector"))),
            None => return Err(self.error("unterminated attribute selector")),
        };
        let test = match op {
            None => None,
            Some(op) => {
                self.expect('=')?;
                self.skip_ws();
                let value = self.attr_value()?;
                self.skip_ws();
                Some((op, value))
            }
        };
        self.expect(']')?;
        Ok(Filter::Attr { name, test })
    }

    fn attr_value(&mut self) -> SettleResult<String> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let mut value = String::new();
                loop {
                    match self.bump() {
                        Some(c) if c == quote => return Ok(value),
                        Some('\\') => match self.bump() {
                            Some(c) => value.push(c),
                            None => return Err(self.error("unterminated string")),
                        },
                        Some(c) => value.push(c),
                        None => return Err(self.error("unterminated string")),
                    }
                }
            }
            _ => self.ident(),
        }
    }

    fn pseudo(&mut self) -> SettleResult<Filter> {
        self.expect(':')?;
        let name = self.ident()?;
        match name.as_str() {
            "disabled" => Ok(Filter::Disabled),
            "enabled" => Ok(Filter::Enabled),
            "first-child" => Ok(Filter::FirstChild),
            "last-child" => Ok(Filter::LastChild),
            "nth-child" => {
                self.expect('(')?;
                self.skip_ws();
                let start = self.pos;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
                let digits: String = self.chars[start..self.pos].iter().collect();
                let n = digits
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| self.error("nth-child expects a positive integer"))?;
                self.skip_ws();
                self.expect(')')?;
                Ok(Filter::NthChild(n))
            }
            other => Err(self.error(format!("unsupported pseudo-class ':{other}'"))),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '-'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}
