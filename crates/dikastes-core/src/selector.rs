//! Label-selector expression parser and evaluator.
//!
//! The spec treats this as an external black-box library exposing exactly
//! two operations: `parse(expr) -> Result<Selector, SelectorError>` and
//! `Selector::matches(&self, labels) -> bool`. We ship a small
//! implementation of that contract rather than a stub, supporting the
//! grammar the spec's scenarios exercise: `has(label)`, `key == 'value'`,
//! `key != 'value'`, and `&&`-conjunctions of those.

use std::collections::HashMap;
use std::fmt;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("unexpected end of selector expression")]
    UnexpectedEof,
    #[error("unexpected character {0:?} at byte {1}")]
    UnexpectedChar(char, usize),
    #[error("unterminated string literal starting at byte {0}")]
    UnterminatedString(usize),
    #[error("expected {0} at byte {1}")]
    Expected(&'static str, usize),
    #[error("trailing input after selector expression: {0:?}")]
    TrailingInput(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Clause {
    Has(String),
    NotHas(String),
    Eq(String, String),
    NotEq(String, String),
}

impl Clause {
    fn matches(&self, labels: &HashMap<String, String>) -> bool {
        match self {
            Clause::Has(key) => labels.contains_key(key),
            Clause::NotHas(key) => !labels.contains_key(key),
            Clause::Eq(key, value) => labels.get(key).map(|v| v == value).unwrap_or(false),
            Clause::NotEq(key, value) => labels.get(key).map(|v| v != value).unwrap_or(true),
        }
    }
}

/// A compiled selector expression. Conjunction of clauses (`&&`); an empty
/// conjunction (the selector `""`) matches any label set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    clauses: Vec<Clause>,
}

impl Selector {
    pub fn matches(&self, labels: &HashMap<String, String>) -> bool {
        self.clauses.iter().all(|c| c.matches(labels))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .clauses
            .iter()
            .map(|c| match c {
                Clause::Has(k) => format!("has({k})"),
                Clause::NotHas(k) => format!("!has({k})"),
                Clause::Eq(k, v) => format!("{k} == '{v}'"),
                Clause::NotEq(k, v) => format!("{k} != '{v}'"),
            })
            .collect();
        write!(f, "{}", rendered.join(" && "))
    }
}

/// Parses a selector expression. An empty string is accepted and parses to
/// a selector that matches everything, though callers normally special-case
/// `""` before ever calling this (see `Matcher::match_labels`).
pub fn parse(expr: &str) -> Result<Selector, SelectorError> {
    let mut parser = Parser::new(expr);
    let selector = parser.parse_expr()?;
    parser.skip_ws();
    if parser.pos < parser.input.len() {
        return Err(SelectorError::TrailingInput(
            parser.input[parser.pos..].to_string(),
        ));
    }
    Ok(selector)
}

struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn skip_ws(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn parse_expr(&mut self) -> Result<Selector, SelectorError> {
        self.skip_ws();
        if self.pos >= self.bytes.len() {
            return Ok(Selector { clauses: vec![] });
        }

        let mut clauses = vec![self.parse_clause()?];
        loop {
            self.skip_ws();
            if self.input[self.pos..].starts_with("&&") {
                self.pos += 2;
                self.skip_ws();
                clauses.push(self.parse_clause()?);
            } else {
                break;
            }
        }
        Ok(Selector { clauses })
    }

    fn parse_clause(&mut self) -> Result<Clause, SelectorError> {
        self.skip_ws();
        if self.input[self.pos..].starts_with("!has(") {
            self.pos += "!has(".len();
            let key = self.parse_ident()?;
            self.expect_char(')')?;
            return Ok(Clause::NotHas(key));
        }
        if self.input[self.pos..].starts_with("has(") {
            self.pos += "has(".len();
            let key = self.parse_ident()?;
            self.expect_char(')')?;
            return Ok(Clause::Has(key));
        }

        let key = self.parse_ident()?;
        self.skip_ws();
        let negate = if self.input[self.pos..].starts_with("==") {
            self.pos += 2;
            false
        } else if self.input[self.pos..].starts_with("!=") {
            self.pos += 2;
            true
        } else {
            return Err(SelectorError::Expected("'==' or '!='", self.pos));
        };
        self.skip_ws();
        let value = self.parse_string()?;
        Ok(if negate {
            Clause::NotEq(key, value)
        } else {
            Clause::Eq(key, value)
        })
    }

    fn parse_ident(&mut self) -> Result<String, SelectorError> {
        self.skip_ws();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '/') {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(match self.peek() {
                Some(c) => SelectorError::UnexpectedChar(c, self.pos),
                None => SelectorError::UnexpectedEof,
            });
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn parse_string(&mut self) -> Result<String, SelectorError> {
        let quote_start = self.pos;
        match self.peek() {
            Some('\'') => self.pos += 1,
            Some(c) => return Err(SelectorError::UnexpectedChar(c, self.pos)),
            None => return Err(SelectorError::UnexpectedEof),
        }
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '\'' {
                let value = self.input[start..self.pos].to_string();
                self.pos += 1;
                return Ok(value);
            }
            self.pos += c.len_utf8();
        }
        Err(SelectorError::UnterminatedString(quote_start))
    }

    fn expect_char(&mut self, expected: char) -> Result<(), SelectorError> {
        self.skip_ws();
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += c.len_utf8();
                Ok(())
            }
            Some(_) => Err(SelectorError::Expected("')'", self.pos)),
            None => Err(SelectorError::UnexpectedEof),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_selector_matches_anything() {
        let selector = parse("").unwrap();
        assert!(selector.matches(&labels(&[])));
        assert!(selector.matches(&labels(&[("app", "foo")])));
    }

    #[test]
    fn has_matches_presence_only() {
        let selector = parse("has(app)").unwrap();
        assert!(selector.matches(&labels(&[("app", "anything")])));
        assert!(!selector.matches(&labels(&[("other", "x")])));
    }

    #[test]
    fn equality_matches_exact_value() {
        let selector = parse("place=='src'").unwrap();
        assert!(selector.matches(&labels(&[("place", "src")])));
        assert!(!selector.matches(&labels(&[("place", "dst")])));
        assert!(!selector.matches(&labels(&[])));
    }

    #[test]
    fn inequality_and_conjunction() {
        let selector = parse("place != 'dst' && has(app)").unwrap();
        assert!(selector.matches(&labels(&[("place", "src"), ("app", "x")])));
        assert!(!selector.matches(&labels(&[("place", "dst"), ("app", "x")])));
        assert!(!selector.matches(&labels(&[("place", "src")])));
    }

    #[test]
    fn malformed_expression_is_an_error() {
        assert!(parse("has(app").is_err());
        assert!(parse("place == ").is_err());
        assert!(parse("place === 'x'").is_err());
        assert!(parse("app == 'unterminated").is_err());
    }
}
