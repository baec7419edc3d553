// Selector chains
//
// A locator's descriptor is a chain of steps evaluated left to right:
// - CSS step: descendants of every element in the current set (the
//   document for the first step) matching the selector
// - Parent step (`xpath=..`): the parent element of every element in the set
// - Nth step (`nth=N`): one element by index, negative counts from the end
//
// The textual form joins steps with ` >> `, e.g.
// `[data-test="open-menu"] >> xpath=.. >> nth=0`.

use std::fmt;

/// One step of a selector chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SelectorStep {
    /// CSS selector evaluated against descendants of the current set
    Css(String),
    /// Parent element of each element in the current set
    Parent,
    /// Single element by index (negative indexes count from the end)
    Nth(i32),
}

impl fmt::Display for SelectorStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectorStep::Css(css) => f.write_str(css),
            SelectorStep::Parent => f.write_str("xpath=.."),
            SelectorStep::Nth(index) => write!(f, "nth={}", index),
        }
    }
}

/// An immutable selector chain.
///
/// Parsing never fails: anything that is not a recognised relation step is
/// kept as CSS, and CSS errors surface when the driver evaluates the chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Selector {
    steps: Vec<SelectorStep>,
}

impl Selector {
    /// Parses a textual selector chain.
    pub fn parse(selector: &str) -> Self {
        let steps = split_chain(selector)
            .into_iter()
            .map(|part| parse_step(&part))
            .collect();
        Self { steps }
    }

    pub fn steps(&self) -> &[SelectorStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Returns a new chain with `step` appended.
    pub fn with_step(&self, step: SelectorStep) -> Self {
        let mut steps = self.steps.clone();
        steps.push(step);
        Self { steps }
    }

    /// Returns a new chain with every step of `other` appended.
    pub fn join(&self, other: &Selector) -> Self {
        let mut steps = self.steps.clone();
        steps.extend(other.steps.iter().cloned());
        Self { steps }
    }
}

impl From<&str> for Selector {
    fn from(value: &str) -> Self {
        Selector::parse(value)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(" >> ")?;
            }
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}

fn parse_step(part: &str) -> SelectorStep {
    if let Some(xpath) = part.strip_prefix("xpath=") {
        if xpath.trim() == ".." {
            return SelectorStep::Parent;
        }
    }
    if let Some(index) = part.strip_prefix("nth=") {
        if let Ok(index) = index.trim().parse::<i32>() {
            return SelectorStep::Nth(index);
        }
    }
    if let Some(css) = part.strip_prefix("css=") {
        return SelectorStep::Css(css.trim().to_string());
    }
    SelectorStep::Css(part.to_string())
}

// Splits on `>>` outside of quotes and brackets.
fn split_chain(selector: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    let mut chars = selector.chars().peekable();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), _) if c == q => {
                quote = None;
                current.push(c);
            }
            (Some(_), '\\') => {
                current.push(c);
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            (Some(_), _) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                current.push(c);
            }
            (None, '[' | '(') => {
                depth += 1;
                current.push(c);
            }
            (None, ']' | ')') => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            (None, '>') if depth == 0 && chars.peek() == Some(&'>') => {
                chars.next();
                push_part(&mut parts, &mut current);
            }
            (None, _) => current.push(c),
        }
    }
    push_part(&mut parts, &mut current);
    parts
}

fn push_part(parts: &mut Vec<String>, current: &mut String) {
    let part = current.trim();
    if !part.is_empty() {
        parts.push(part.to_string());
    }
    current.clear();
}
