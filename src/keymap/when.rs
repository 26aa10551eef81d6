//! `when` guard expressions
//!
//! A small boolean language over context keys:
//!
//! ```text
//! editorTextFocus && !editorReadonly
//! resourceLangId == rust || resourceLangId == toml
//! !(terminalFocus && panelVisible)
//! ```
//!
//! `||` binds weaker than `&&`. And/Or nodes are kept flattened, sorted and
//! deduplicated, so two guards that differ only in operand order compare
//! equal.

use std::fmt;
use std::str::FromStr;

use super::config::KeymapError;
use super::context::{KeyContext, WhenClause};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WhenExpr {
    False,
    True,
    /// Key is truthy
    Has(String),
    /// Key is falsy or missing
    Not(String),
    Equals(String, String),
    NotEquals(String, String),
    And(Vec<WhenExpr>),
    Or(Vec<WhenExpr>),
}

impl WhenExpr {
    pub fn has(key: impl Into<String>) -> Self {
        WhenExpr::Has(key.into())
    }

    pub fn not(key: impl Into<String>) -> Self {
        WhenExpr::Not(key.into())
    }

    pub fn key_equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        WhenExpr::Equals(key.into(), value.into())
    }

    pub fn key_not_equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        WhenExpr::NotEquals(key.into(), value.into())
    }

    /// Conjunction in canonical form
    pub fn and(exprs: Vec<WhenExpr>) -> Self {
        let mut terms = Vec::with_capacity(exprs.len());
        for expr in exprs {
            match expr {
                WhenExpr::True => {}
                WhenExpr::False => return WhenExpr::False,
                WhenExpr::And(inner) => terms.extend(inner),
                other => terms.push(other),
            }
        }
        terms.sort();
        terms.dedup();

        match terms.len() {
            0 => WhenExpr::True,
            1 => terms.remove(0),
            _ => WhenExpr::And(terms),
        }
    }

    /// Disjunction in canonical form
    pub fn or(exprs: Vec<WhenExpr>) -> Self {
        let mut terms = Vec::with_capacity(exprs.len());
        for expr in exprs {
            match expr {
                WhenExpr::False => {}
                WhenExpr::True => return WhenExpr::True,
                WhenExpr::Or(inner) => terms.extend(inner),
                other => terms.push(other),
            }
        }
        terms.sort();
        terms.dedup();

        match terms.len() {
            0 => WhenExpr::False,
            1 => terms.remove(0),
            _ => WhenExpr::Or(terms),
        }
    }

    fn write_operand(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WhenExpr::Or(_) => write!(f, "({})", self),
            _ => write!(f, "{}", self),
        }
    }
}

impl WhenClause for WhenExpr {
    type Context = KeyContext;

    fn evaluate(&self, context: &KeyContext) -> bool {
        match self {
            WhenExpr::False => false,
            WhenExpr::True => true,
            WhenExpr::Has(key) => context.is_truthy(key),
            WhenExpr::Not(key) => !context.is_truthy(key),
            WhenExpr::Equals(key, value) => context
                .get(key)
                .is_some_and(|v| v.matches_literal(value)),
            WhenExpr::NotEquals(key, value) => !context
                .get(key)
                .is_some_and(|v| v.matches_literal(value)),
            WhenExpr::And(terms) => terms.iter().all(|t| t.evaluate(context)),
            WhenExpr::Or(terms) => terms.iter().any(|t| t.evaluate(context)),
        }
    }

    fn negate(&self) -> Self {
        match self {
            WhenExpr::False => WhenExpr::True,
            WhenExpr::True => WhenExpr::False,
            WhenExpr::Has(key) => WhenExpr::Not(key.clone()),
            WhenExpr::Not(key) => WhenExpr::Has(key.clone()),
            WhenExpr::Equals(key, value) => WhenExpr::NotEquals(key.clone(), value.clone()),
            WhenExpr::NotEquals(key, value) => WhenExpr::Equals(key.clone(), value.clone()),
            WhenExpr::And(terms) => WhenExpr::or(terms.iter().map(WhenClause::negate).collect()),
            WhenExpr::Or(terms) => WhenExpr::and(terms.iter().map(WhenClause::negate).collect()),
        }
    }

    fn equals(&self, other: &Self) -> bool {
        self == other
    }

    fn serialize(&self) -> String {
        self.to_string()
    }

    fn disjuncts(&self) -> Option<&[Self]> {
        match self {
            WhenExpr::Or(terms) => Some(terms),
            _ => None,
        }
    }

    fn is_always_false(&self) -> bool {
        matches!(self, WhenExpr::False)
    }
}

impl fmt::Display for WhenExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WhenExpr::False => write!(f, "false"),
            WhenExpr::True => write!(f, "true"),
            WhenExpr::Has(key) => write!(f, "{}", key),
            WhenExpr::Not(key) => write!(f, "!{}", key),
            WhenExpr::Equals(key, value) => write!(f, "{} == {}", key, value),
            WhenExpr::NotEquals(key, value) => write!(f, "{} != {}", key, value),
            WhenExpr::And(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        write!(f, " && ")?;
                    }
                    term.write_operand(f)?;
                }
                Ok(())
            }
            WhenExpr::Or(terms) => {
                let joined = terms
                    .iter()
                    .map(|t| t.to_string())
                    .collect::<Vec<_>>()
                    .join(" || ");
                write!(f, "{}", joined)
            }
        }
    }
}

impl FromStr for WhenExpr {
    type Err = KeymapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_when(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    And,
    Or,
    Bang,
    Eq,
    NotEq,
    LParen,
    RParen,
    Word(String),
}

fn tokenize(input: &str) -> Result<Vec<Token>, KeymapError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '&' | '|' | '=' => {
                chars.next();
                match chars.next() {
                    Some((_, next)) if next == c => tokens.push(match c {
                        '&' => Token::And,
                        '|' => Token::Or,
                        _ => Token::Eq,
                    }),
                    _ => {
                        return Err(KeymapError::InvalidWhen(format!(
                            "expected '{c}{c}' at offset {pos} in {input:?}"
                        )))
                    }
                }
            }
            '!' => {
                chars.next();
                if chars.next_if(|&(_, n)| n == '=').is_some() {
                    tokens.push(Token::NotEq);
                } else {
                    tokens.push(Token::Bang);
                }
            }
            '\'' | '"' => {
                chars.next();
                let mut word = String::new();
                loop {
                    match chars.next() {
                        Some((_, q)) if q == c => break,
                        Some((_, ch)) => word.push(ch),
                        None => {
                            return Err(KeymapError::InvalidWhen(format!(
                                "unterminated string at offset {pos} in {input:?}"
                            )))
                        }
                    }
                }
                tokens.push(Token::Word(word));
            }
            _ => {
                let mut word = String::new();
                while let Some((_, ch)) =
                    chars.next_if(|&(_, ch)| !ch.is_whitespace() && !"()&|=!'\"".contains(ch))
                {
                    word.push(ch);
                }
                tokens.push(Token::Word(word));
            }
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, what: &str) -> KeymapError {
        KeymapError::InvalidWhen(format!("{} in {:?}", what, self.input))
    }

    fn parse_or(&mut self) -> Result<WhenExpr, KeymapError> {
        let mut terms = vec![self.parse_and()?];
        while self.eat(&Token::Or) {
            terms.push(self.parse_and()?);
        }
        Ok(WhenExpr::or(terms))
    }

    fn parse_and(&mut self) -> Result<WhenExpr, KeymapError> {
        let mut terms = vec![self.parse_unary()?];
        while self.eat(&Token::And) {
            terms.push(self.parse_unary()?);
        }
        Ok(WhenExpr::and(terms))
    }

    fn parse_unary(&mut self) -> Result<WhenExpr, KeymapError> {
        if self.eat(&Token::Bang) {
            return Ok(self.parse_unary()?.negate());
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<WhenExpr, KeymapError> {
        match self.advance() {
            Some(Token::LParen) => {
                let expr = self.parse_or()?;
                if !self.eat(&Token::RParen) {
                    return Err(self.error("expected ')'"));
                }
                Ok(expr)
            }
            Some(Token::Word(key)) => {
                let negated = if self.eat(&Token::Eq) {
                    false
                } else if self.eat(&Token::NotEq) {
                    true
                } else {
                    return Ok(match key.as_str() {
                        "true" => WhenExpr::True,
                        "false" => WhenExpr::False,
                        _ => WhenExpr::Has(key),
                    });
                };

                match self.advance() {
                    Some(Token::Word(value)) if negated => Ok(WhenExpr::NotEquals(key, value)),
                    Some(Token::Word(value)) => Ok(WhenExpr::Equals(key, value)),
                    _ => Err(self.error(&format!("expected a value after '{}'", key))),
                }
            }
            Some(token) => Err(self.error(&format!("unexpected {:?}", token))),
            None => Err(self.error("unexpected end of expression")),
        }
    }
}

/// Parse a `when` string into an expression
pub fn parse_when(input: &str) -> Result<WhenExpr, KeymapError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(KeymapError::InvalidWhen("empty expression".to_string()));
    }

    let mut parser = Parser {
        input,
        tokens,
        pos: 0,
    };
    let expr = parser.parse_or()?;

    if parser.pos < parser.tokens.len() {
        return Err(parser.error("trailing input"));
    }
    Ok(expr)
}
