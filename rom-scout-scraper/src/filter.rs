//! Filter expression language.
//!
//! A small boolean language deciding per entry whether scraping work is
//! needed:
//!
//! ```text
//! expr   := or
//! or     := and ('or' and)*
//! and    := not ('and' not)*
//! not    := 'not' not | atom
//! atom   := 'true' | 'false' | IDENT ('.' IDENT)* | '(' expr ')'
//! ```
//!
//! Identifier paths resolve against a [`FilterContext`]: `missing.metadata`,
//! `missing.media`, and `missing.<kind>` for each media kind. Invalid
//! expressions fail at construction time with the byte offset of the
//! offending token.

use std::collections::HashMap;

use rom_scout_frontend::MediaKind;

/// Per-entry facts the filter evaluates against.
#[derive(Debug, Clone)]
pub struct FilterContext {
    pub base_name: String,
    /// True when the target catalog already has this entry.
    pub has_metadata: bool,
    /// Per-kind media presence (destination exists and is non-empty).
    pub has_media: HashMap<MediaKind, bool>,
    /// The media kinds configured for this run; `missing.media` quantifies
    /// over these.
    pub configured_kinds: Vec<MediaKind>,
}

impl FilterContext {
    fn has_media(&self, kind: MediaKind) -> bool {
        self.has_media.get(&kind).copied().unwrap_or(false)
    }
}

/// Parse error with a pointer to the offending token.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid filter at byte {offset}: {message}")]
pub struct FilterParseError {
    pub offset: usize,
    pub message: String,
}

impl FilterParseError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// A fact an identifier path resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fact {
    Metadata,
    AnyMedia,
    Media(MediaKind),
}

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    True,
    False,
    Missing(Fact),
    Not(Box<FilterExpr>),
    And(Box<FilterExpr>, Box<FilterExpr>),
    Or(Box<FilterExpr>, Box<FilterExpr>),
}

impl FilterExpr {
    /// Parse an expression. The default admit-all filter is `"true"`.
    pub fn parse(input: &str) -> Result<Self, FilterParseError> {
        let tokens = tokenize(input)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_or()?;
        if let Some(token) = parser.peek() {
            return Err(FilterParseError::new(
                token.offset,
                format!("unexpected '{}' after expression", token.text),
            ));
        }
        Ok(expr)
    }

    /// Evaluate against a context.
    pub fn eval(&self, ctx: &FilterContext) -> bool {
        match self {
            Self::True => true,
            Self::False => false,
            Self::Missing(Fact::Metadata) => !ctx.has_metadata,
            Self::Missing(Fact::AnyMedia) => {
                ctx.configured_kinds.iter().any(|&kind| !ctx.has_media(kind))
            }
            Self::Missing(Fact::Media(kind)) => !ctx.has_media(*kind),
            Self::Not(inner) => !inner.eval(ctx),
            Self::And(a, b) => a.eval(ctx) && b.eval(ctx),
            Self::Or(a, b) => a.eval(ctx) || b.eval(ctx),
        }
    }
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Token {
    text: String,
    offset: usize,
}

fn tokenize(input: &str) -> Result<Vec<Token>, FilterParseError> {
    let mut tokens = Vec::new();
    let bytes = input.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if c == '(' || c == ')' {
            tokens.push(Token {
                text: c.to_string(),
                offset: i,
            });
            i += 1;
            continue;
        }
        if c.is_ascii_alphabetic() || c == '_' {
            // A word, or a dotted identifier path.
            let start = i;
            while i < bytes.len() {
                let c = bytes[i] as char;
                if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                    i += 1;
                } else {
                    break;
                }
            }
            tokens.push(Token {
                text: input[start..i].to_string(),
                offset: start,
            });
            continue;
        }
        return Err(FilterParseError::new(i, format!("unexpected character '{c}'")));
    }

    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, word: &str) -> bool {
        if self.peek().map(|t| t.text == word).unwrap_or(false) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<FilterExpr, FilterParseError> {
        let mut left = self.parse_and()?;
        while self.eat("or") {
            let right = self.parse_and()?;
            left = FilterExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<FilterExpr, FilterParseError> {
        let mut left = self.parse_not()?;
        while self.eat("and") {
            let right = self.parse_not()?;
            left = FilterExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<FilterExpr, FilterParseError> {
        if self.eat("not") {
            let inner = self.parse_not()?;
            return Ok(FilterExpr::Not(Box::new(inner)));
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<FilterExpr, FilterParseError> {
        let token = self
            .next()
            .ok_or_else(|| FilterParseError::new(usize::MAX, "unexpected end of expression"))?;

        match token.text.as_str() {
            "true" => Ok(FilterExpr::True),
            "false" => Ok(FilterExpr::False),
            "(" => {
                let expr = self.parse_or()?;
                let closing = self.next().ok_or_else(|| {
                    FilterParseError::new(token.offset, "unclosed '('")
                })?;
                if closing.text != ")" {
                    return Err(FilterParseError::new(
                        closing.offset,
                        format!("expected ')', found '{}'", closing.text),
                    ));
                }
                Ok(expr)
            }
            _ => resolve_path(&token),
        }
    }
}

/// Resolve an identifier path into a fact.
fn resolve_path(token: &Token) -> Result<FilterExpr, FilterParseError> {
    let parts: Vec<&str> = token.text.split('.').collect();
    match parts.as_slice() {
        ["missing", "metadata"] => Ok(FilterExpr::Missing(Fact::Metadata)),
        ["missing", "media"] => Ok(FilterExpr::Missing(Fact::AnyMedia)),
        ["missing", kind_name] => match MediaKind::from_name(kind_name) {
            Some(kind) => Ok(FilterExpr::Missing(Fact::Media(kind))),
            None => Err(FilterParseError::new(
                token.offset,
                format!("unknown media kind '{kind_name}'"),
            )),
        },
        _ => Err(FilterParseError::new(
            token.offset,
            format!("unknown identifier '{}'", token.text),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(has_metadata: bool, present: &[MediaKind]) -> FilterContext {
        let configured = vec![MediaKind::Cover, MediaKind::Video];
        let mut has_media = HashMap::new();
        for &kind in MediaKind::all() {
            has_media.insert(kind, present.contains(&kind));
        }
        FilterContext {
            base_name: "game".to_string(),
            has_metadata,
            has_media,
            configured_kinds: configured,
        }
    }

    #[test]
    fn default_true_admits_everything() {
        let expr = FilterExpr::parse("true").unwrap();
        assert!(expr.eval(&ctx(true, &[MediaKind::Cover, MediaKind::Video])));
    }

    #[test]
    fn missing_metadata() {
        let expr = FilterExpr::parse("missing.metadata").unwrap();
        assert!(expr.eval(&ctx(false, &[])));
        assert!(!expr.eval(&ctx(true, &[])));
    }

    #[test]
    fn missing_specific_kind() {
        let expr = FilterExpr::parse("missing.covers").unwrap();
        assert!(expr.eval(&ctx(true, &[])));
        assert!(!expr.eval(&ctx(true, &[MediaKind::Cover])));
    }

    #[test]
    fn missing_media_quantifies_over_configured_kinds() {
        let expr = FilterExpr::parse("missing.media").unwrap();
        // Covers present but videos (configured) absent.
        assert!(expr.eval(&ctx(true, &[MediaKind::Cover])));
        // All configured kinds present; other kinds don't matter.
        assert!(!expr.eval(&ctx(true, &[MediaKind::Cover, MediaKind::Video])));
    }

    #[test]
    fn boolean_operators_and_precedence() {
        // 'or' binds looser than 'and'.
        let expr = FilterExpr::parse("missing.metadata or missing.covers and missing.videos")
            .unwrap();
        assert!(expr.eval(&ctx(false, &[MediaKind::Cover, MediaKind::Video])));
        assert!(!expr.eval(&ctx(true, &[MediaKind::Cover])));
        assert!(expr.eval(&ctx(true, &[])));
    }

    #[test]
    fn not_and_parens() {
        let expr = FilterExpr::parse("not (missing.metadata or missing.covers)").unwrap();
        assert!(expr.eval(&ctx(true, &[MediaKind::Cover])));
        assert!(!expr.eval(&ctx(false, &[MediaKind::Cover])));

        let expr = FilterExpr::parse("not not true").unwrap();
        assert!(expr.eval(&ctx(false, &[])));
    }

    #[test]
    fn unknown_identifier_points_at_token() {
        let err = FilterExpr::parse("true or missing.sculptures").unwrap_err();
        assert_eq!(err.offset, 8);
        assert!(err.message.contains("sculptures"));
    }

    #[test]
    fn unknown_path_root_is_rejected() {
        let err = FilterExpr::parse("present.metadata").unwrap_err();
        assert!(err.message.contains("present.metadata"));
    }

    #[test]
    fn unclosed_paren_is_rejected() {
        assert!(FilterExpr::parse("(true or false").is_err());
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        let err = FilterExpr::parse("true false").unwrap_err();
        assert_eq!(err.offset, 5);
    }

    #[test]
    fn stray_character_is_rejected() {
        let err = FilterExpr::parse("true && false").unwrap_err();
        assert_eq!(err.offset, 5);
    }

    #[test]
    fn empty_expression_is_rejected() {
        assert!(FilterExpr::parse("").is_err());
        assert!(FilterExpr::parse("   ").is_err());
    }
}
