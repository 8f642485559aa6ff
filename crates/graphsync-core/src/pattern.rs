//! Relationship pattern parsing.
//!
//! Patterns come in a shorthand form modelled on Cypher path syntax:
//!
//! ```text
//! (this)-[:HAS_AUTHOR]->(author)
//! (author)<-[:HAS_AUTHOR]-(this)
//! ```
//!
//! or a structured form `{ from, to, rel_type }`. Both normalize to a
//! [`RelationshipDescriptor`] whose direction always reads `from -> to`.
//!
//! Aliases match `[A-Za-z_][A-Za-z0-9_]*`, relationship types `[A-Z_]+`, and
//! exactly one side of the relationship carries an arrow. No whitespace is
//! accepted inside a pattern.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Alias that refers to the row's own table.
pub const THIS: &str = "this";

/// A relationship pattern as supplied by a table's mapping rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipPattern {
    Shorthand(String),
    Structured {
        from: String,
        to: String,
        #[serde(alias = "relType")]
        rel_type: String,
    },
}

impl RelationshipPattern {
    pub fn structured(
        from: impl Into<String>,
        to: impl Into<String>,
        rel_type: impl Into<String>,
    ) -> Self {
        Self::Structured {
            from: from.into(),
            to: to.into(),
            rel_type: rel_type.into(),
        }
    }

    pub fn parse(&self) -> Result<RelationshipDescriptor, PatternError> {
        match self {
            Self::Shorthand(text) => parse_pattern(text),
            Self::Structured { from, to, rel_type } => parse_structured(from, to, rel_type),
        }
    }
}

impl From<&str> for RelationshipPattern {
    fn from(s: &str) -> Self {
        Self::Shorthand(s.to_string())
    }
}

impl From<String> for RelationshipPattern {
    fn from(s: String) -> Self {
        Self::Shorthand(s)
    }
}

impl fmt::Display for RelationshipPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shorthand(text) => f.write_str(text),
            Self::Structured { from, to, rel_type } => {
                write!(f, "{{from: {}, to: {}, rel_type: {}}}", from, to, rel_type)
            }
        }
    }
}

/// A parsed relationship, normalized to `from -> to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipDescriptor {
    pub from: String,
    pub to: String,
    pub rel_type: String,
}

/// A pattern that does not match the grammar.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed pattern '{pattern}' at offset {offset}: expected {expected}")]
pub struct PatternError {
    pub pattern: String,
    pub offset: usize,
    pub expected: String,
}

/// Parse a shorthand pattern such as `(this)-[:HAS_AUTHOR]->(author)`.
pub fn parse_pattern(input: &str) -> Result<RelationshipDescriptor, PatternError> {
    let mut scanner = Scanner::new(input.trim());

    scanner.expect("(")?;
    let left = scanner.alias()?;
    scanner.expect(")")?;

    let arrow_at = scanner.pos;
    let points_left = scanner.eat("<-");
    if !points_left {
        scanner.expect_one_of(&["<-", "-"])?;
    }

    scanner.expect("[:")?;
    let rel_type = scanner.rel_type()?;
    scanner.expect("]")?;

    let points_right = scanner.eat("->");
    if !points_right {
        scanner.expect_one_of(&["->", "-"])?;
    }

    scanner.expect("(")?;
    let right = scanner.alias()?;
    scanner.expect(")")?;
    scanner.end()?;

    let (from, to) = match (points_left, points_right) {
        (false, true) => (left, right),
        (true, false) => (right, left),
        _ => {
            return Err(scanner.error_at(arrow_at, "exactly one direction marker ('<-' or '->')"));
        }
    };

    Ok(RelationshipDescriptor {
        from: from.to_string(),
        to: to.to_string(),
        rel_type: rel_type.to_string(),
    })
}

/// Validate the structured form against the same lexical rules.
fn parse_structured(
    from: &str,
    to: &str,
    rel_type: &str,
) -> Result<RelationshipDescriptor, PatternError> {
    let pattern = RelationshipPattern::structured(from, to, rel_type).to_string();
    let fail = |expected: &str| PatternError {
        pattern: pattern.clone(),
        offset: 0,
        expected: expected.to_string(),
    };

    if !is_alias(from) {
        return Err(fail("'from' to be an alias ([A-Za-z_][A-Za-z0-9_]*)"));
    }
    if !is_alias(to) {
        return Err(fail("'to' to be an alias ([A-Za-z_][A-Za-z0-9_]*)"));
    }
    if rel_type.is_empty() || !rel_type.bytes().all(is_rel_type_byte) {
        return Err(fail("'rel_type' to match [A-Z_]+"));
    }

    Ok(RelationshipDescriptor {
        from: from.to_string(),
        to: to.to_string(),
        rel_type: rel_type.to_string(),
    })
}

pub fn is_alias(s: &str) -> bool {
    let mut bytes = s.bytes();
    match bytes.next() {
        Some(b) if b.is_ascii_alphabetic() || b == b'_' => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

fn is_rel_type_byte(b: u8) -> bool {
    b.is_ascii_uppercase() || b == b'_'
}

struct Scanner<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &str) -> Result<(), PatternError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(&format!("'{}'", token)))
        }
    }

    fn expect_one_of(&mut self, tokens: &[&str]) -> Result<(), PatternError> {
        if tokens.iter().any(|t| self.eat(t)) {
            return Ok(());
        }
        let wanted: Vec<String> = tokens.iter().map(|t| format!("'{}'", t)).collect();
        Err(self.error(&wanted.join(" or ")))
    }

    /// `[A-Za-z_][A-Za-z0-9_]*`
    fn alias(&mut self) -> Result<&'a str, PatternError> {
        let rest = self.rest();
        let len = rest
            .bytes()
            .enumerate()
            .take_while(|(i, b)| {
                b.is_ascii_alphabetic() || *b == b'_' || (*i > 0 && b.is_ascii_digit())
            })
            .count();
        if len == 0 {
            return Err(self.error("an alias"));
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    /// `[A-Z_]+`
    fn rel_type(&mut self) -> Result<&'a str, PatternError> {
        let rest = self.rest();
        let len = rest.bytes().take_while(|b| is_rel_type_byte(*b)).count();
        if len == 0 {
            return Err(self.error("a relationship type ([A-Z_]+)"));
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    fn end(&self) -> Result<(), PatternError> {
        if self.pos == self.src.len() {
            Ok(())
        } else {
            Err(self.error("end of pattern"))
        }
    }

    fn error(&self, expected: &str) -> PatternError {
        self.error_at(self.pos, expected)
    }

    fn error_at(&self, offset: usize, expected: &str) -> PatternError {
        PatternError {
            pattern: self.src.to_string(),
            offset,
            expected: expected.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(from: &str, to: &str, rel_type: &str) -> RelationshipDescriptor {
        RelationshipDescriptor {
            from: from.to_string(),
            to: to.to_string(),
            rel_type: rel_type.to_string(),
        }
    }

    #[test]
    fn test_right_arrow() {
        let parsed = parse_pattern("(this)-[:HAS_AUTHOR]->(author)").unwrap();
        assert_eq!(parsed, descriptor("this", "author", "HAS_AUTHOR"));
    }

    #[test]
    fn test_left_arrow_is_normalized() {
        let parsed = parse_pattern("(author)<-[:HAS_AUTHOR]-(this)").unwrap();
        assert_eq!(parsed, descriptor("this", "author", "HAS_AUTHOR"));
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        let parsed = parse_pattern("  (a1)-[:T]->(_b)\n").unwrap();
        assert_eq!(parsed, descriptor("a1", "_b", "T"));
    }

    #[test]
    fn test_missing_colon() {
        let err = parse_pattern("(this)-[HAS_AUTHOR]->(author)").unwrap_err();
        assert_eq!(err.offset, 7);
        assert_eq!(err.expected, "'[:'");
    }

    #[test]
    fn test_both_or_neither_arrow() {
        let err = parse_pattern("(a)<-[:T]->(b)").unwrap_err();
        assert_eq!(err.offset, 3);
        assert!(parse_pattern("(a)-[:T]-(b)").is_err());
    }

    #[test]
    fn test_lexical_rules() {
        assert!(parse_pattern("(this)-[:has_author]->(author)").is_err());
        assert!(parse_pattern("(this)-[:HAS2]->(author)").is_err());
        assert!(parse_pattern("(1this)-[:T]->(author)").is_err());
        assert!(parse_pattern("(this) -[:T]->(author)").is_err());
        assert!(parse_pattern("(this)-[:T]->(author) extra").is_err());
        assert!(parse_pattern("").is_err());
    }

    #[test]
    fn test_structured_form_matches_shorthand() {
        let structured = RelationshipPattern::structured("this", "author", "HAS_AUTHOR");
        let shorthand = RelationshipPattern::from("(this)-[:HAS_AUTHOR]->(author)");
        assert_eq!(structured.parse().unwrap(), shorthand.parse().unwrap());
    }

    #[test]
    fn test_structured_form_is_validated() {
        let err = RelationshipPattern::structured("this", "author", "has author")
            .parse()
            .unwrap_err();
        assert!(err.expected.contains("rel_type"));
        assert!(RelationshipPattern::structured("", "author", "T").parse().is_err());
    }

    #[test]
    fn test_deserialize_both_forms() {
        let patterns: Vec<RelationshipPattern> = serde_json::from_str(
            r#"["(this)-[:HAS_AUTHOR]->(author)", {"from": "this", "to": "author", "relType": "HAS_AUTHOR"}]"#,
        )
        .unwrap();
        assert_eq!(patterns[0].parse().unwrap(), patterns[1].parse().unwrap());
    }
}
