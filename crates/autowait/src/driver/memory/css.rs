// CSS subset for in-memory documents
//
// Supported grammar:
// - selector lists: `a, b`
// - combinators: descendant (whitespace) and child (`>`)
// - compounds: `tag` or `*`, `#id`, `.class`, `[attr]`,
//   `[attr=v]`, `[attr~=v]`, `[attr^=v]`, `[attr$=v]`, `[attr*=v]`
//
// Pseudo-classes are rejected with a parse error rather than ignored.

use crate::error::{Error, Result};

/// Read access to element nodes needed for matching.
pub(crate) trait ElementView {
    type Id: Copy;

    fn tag(&self, node: Self::Id) -> &str;
    fn attribute(&self, node: Self::Id, name: &str) -> Option<&str>;
    fn parent_element(&self, node: Self::Id) -> Option<Self::Id>;
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CssSelector {
    alternatives: Vec<Vec<(Combinator, Compound)>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Compound {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeMatcher>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeMatcher {
    name: String,
    operator: Option<(AttributeOperator, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributeOperator {
    Equals,
    Word,
    Prefix,
    Suffix,
    Contains,
}

impl CssSelector {
    pub(crate) fn parse(input: &str) -> Result<Self> {
        Parser::new(input).parse_list()
    }

    pub(crate) fn matches<V: ElementView>(&self, view: &V, node: V::Id) -> bool {
        self.alternatives
            .iter()
            .any(|complex| matches_complex(view, node, complex))
    }
}

fn matches_complex<V: ElementView>(
    view: &V,
    node: V::Id,
    parts: &[(Combinator, Compound)],
) -> bool {
    let Some(((combinator, last), rest)) = parts.split_last() else {
        return false;
    };
    if !last.matches(view, node) {
        return false;
    }
    if rest.is_empty() {
        return true;
    }
    match combinator {
        Combinator::Child => view
            .parent_element(node)
            .is_some_and(|parent| matches_complex(view, parent, rest)),
        Combinator::Descendant => {
            let mut current = view.parent_element(node);
            while let Some(ancestor) = current {
                if matches_complex(view, ancestor, rest) {
                    return true;
                }
                current = view.parent_element(ancestor);
            }
            false
        }
    }
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none()
            && self.ids.is_empty()
            && self.classes.is_empty()
            && self.attributes.is_empty()
    }

    fn matches<V: ElementView>(&self, view: &V, node: V::Id) -> bool {
        if let Some(tag) = &self.tag {
            if tag != "*" && !view.tag(node).eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if !self
            .ids
            .iter()
            .all(|id| view.attribute(node, "id") == Some(id.as_str()))
        {
            return false;
        }
        let classes = view.attribute(node, "class").unwrap_or("");
        if !self
            .classes
            .iter()
            .all(|class| classes.split_whitespace().any(|c| c == class))
        {
            return false;
        }
        self.attributes.iter().all(|matcher| {
            let Some(actual) = view.attribute(node, &matcher.name) else {
                return false;
            };
            match &matcher.operator {
                None => true,
                Some((AttributeOperator::Equals, expected)) => actual == expected,
                Some((AttributeOperator::Word, expected)) => {
                    actual.split_whitespace().any(|word| word == expected)
                }
                Some((AttributeOperator::Prefix, expected)) => {
                    actual.starts_with(expected.as_str())
                }
                Some((AttributeOperator::Suffix, expected)) => actual.ends_with(expected.as_str()),
                Some((AttributeOperator::Contains, expected)) => actual.contains(expected.as_str()),
            }
        })
    }
}

struct Parser<'a> {
    input: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, message: &str) -> Error {
        Error::InvalidArgument(format!(
            "Unsupported selector '{}': {} at offset {}",
            self.input, message, self.pos
        ))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn parse_list(&mut self) -> Result<CssSelector> {
        let mut alternatives = Vec::new();
        loop {
            alternatives.push(self.parse_complex()?);
            match self.peek() {
                Some(',') => self.pos += 1,
                None => break,
                Some(_) => return Err(self.error("unexpected character")),
            }
        }
        Ok(CssSelector { alternatives })
    }

    fn parse_complex(&mut self) -> Result<Vec<(Combinator, Compound)>> {
        let mut parts = Vec::new();
        self.skip_whitespace();
        let mut combinator = Combinator::Descendant;
        loop {
            let compound = self.parse_compound()?;
            if compound.is_empty() {
                return Err(self.error("expected a selector"));
            }
            parts.push((combinator, compound));

            let had_whitespace = self.skip_whitespace();
            match self.peek() {
                None | Some(',') => return Ok(parts),
                Some('>') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    combinator = Combinator::Child;
                }
                Some(_) if had_whitespace => combinator = Combinator::Descendant,
                Some(_) => return Err(self.error("unexpected character")),
            }
        }
    }

    fn parse_compound(&mut self) -> Result<Compound> {
        let mut compound = Compound::default();
        if self.peek() == Some('*') {
            self.pos += 1;
            compound.tag = Some("*".to_string());
        } else if self.peek().is_some_and(is_ident_char) {
            compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
        }
        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    let id = self.parse_ident()?;
                    compound.ids.push(id);
                }
                Some('.') => {
                    self.pos += 1;
                    let class = self.parse_ident()?;
                    compound.classes.push(class);
                }
                Some('[') => {
                    self.pos += 1;
                    let matcher = self.parse_attribute()?;
                    compound.attributes.push(matcher);
                }
                Some(':') => return Err(self.error("pseudo-classes are not supported")),
                _ => return Ok(compound),
            }
        }
    }

    fn parse_ident(&mut self) -> Result<String> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected an identifier"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_attribute(&mut self) -> Result<AttributeMatcher> {
        self.skip_whitespace();
        let name = self.parse_ident()?;
        self.skip_whitespace();
        let operator = match self.peek() {
            Some(']') => None,
            Some('=') => {
                self.pos += 1;
                Some(AttributeOperator::Equals)
            }
            Some(c @ ('~' | '^' | '$' | '*')) => {
                self.pos += 1;
                if self.peek() != Some('=') {
                    return Err(self.error("expected '='"));
                }
                self.pos += 1;
                Some(match c {
                    '~' => AttributeOperator::Word,
                    '^' => AttributeOperator::Prefix,
                    '$' => AttributeOperator::Suffix,
                    _ => AttributeOperator::Contains,
                })
            }
            _ => return Err(self.error("malformed attribute selector")),
        };
        let operator = match operator {
            Some(operator) => {
                self.skip_whitespace();
                let value = self.parse_value()?;
                self.skip_whitespace();
                Some((operator, value))
            }
            None => None,
        };
        if self.peek() != Some(']') {
            return Err(self.error("expected ']'"));
        }
        self.pos += 1;
        Ok(AttributeMatcher { name, operator })
    }

    fn parse_value(&mut self) -> Result<String> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let mut value = String::new();
                loop {
                    match self.peek() {
                        None => return Err(self.error("unterminated string")),
                        Some('\\') => {
                            self.pos += 1;
                            if let Some(escaped) = self.peek() {
                                value.push(escaped);
                                self.pos += 1;
                            }
                        }
                        Some(c) if c == quote => {
                            self.pos += 1;
                            return Ok(value);
                        }
                        Some(c) => {
                            value.push(c);
                            self.pos += 1;
                        }
                    }
                }
            }
            _ => self.parse_ident(),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}
