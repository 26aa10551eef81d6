//! Context system for conditional keybindings
//!
//! A binding's `when` guard is evaluated against a [`KeyContext`], a flat
//! snapshot of named context keys such as `editorTextFocus` or
//! `resourceLangId`. The resolver only talks to guards through
//! [`WhenClause`], so any expression representation can be plugged in.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;

/// A single context value
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    Bool(bool),
    Number(f64),
    Str(String),
}

impl ContextValue {
    /// Truthiness used by bare-key guards (`editorTextFocus`)
    pub fn is_truthy(&self) -> bool {
        match self {
            ContextValue::Bool(b) => *b,
            ContextValue::Number(n) => *n != 0.0,
            ContextValue::Str(s) => !s.is_empty(),
        }
    }

    /// Read a value typed on a command line: booleans, then numbers, else text
    pub fn from_literal(literal: &str) -> Self {
        if let Ok(b) = literal.parse::<bool>() {
            ContextValue::Bool(b)
        } else if let Ok(n) = literal.parse::<f64>() {
            ContextValue::Number(n)
        } else {
            ContextValue::Str(literal.to_string())
        }
    }

    /// Compare against a literal as written in a guard (`resourceLangId == rust`)
    pub fn matches_literal(&self, literal: &str) -> bool {
        match self {
            ContextValue::Bool(b) => literal.parse::<bool>().map(|l| l == *b).unwrap_or(false),
            ContextValue::Number(n) => literal.parse::<f64>().map(|l| l == *n).unwrap_or(false),
            ContextValue::Str(s) => s == literal,
        }
    }
}

impl fmt::Display for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextValue::Bool(b) => write!(f, "{}", b),
            ContextValue::Number(n) => write!(f, "{}", n),
            ContextValue::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for ContextValue {
    fn from(value: bool) -> Self {
        ContextValue::Bool(value)
    }
}

impl From<f64> for ContextValue {
    fn from(value: f64) -> Self {
        ContextValue::Number(value)
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        ContextValue::Str(value.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        ContextValue::Str(value)
    }
}

/// Snapshot of the host's context keys at the time of a key press
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct KeyContext {
    values: HashMap<String, ContextValue>,
}

impl KeyContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ContextValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<ContextValue> {
        self.values.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.values.get(key)
    }

    /// Missing keys are falsy
    pub fn is_truthy(&self, key: &str) -> bool {
        self.get(key).is_some_and(ContextValue::is_truthy)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Capability the resolver needs from a guard expression
///
/// Implementations decide their own AST and evaluation rules. `equals` is
/// structural equality, and `disjuncts` exposes the children of an Or node
/// (returning `None` for every other node).
pub trait WhenClause: Sized {
    type Context;

    fn evaluate(&self, context: &Self::Context) -> bool;

    fn negate(&self) -> Self;

    fn equals(&self, other: &Self) -> bool;

    /// Human-readable form used in diagnostics
    fn serialize(&self) -> String;

    fn disjuncts(&self) -> Option<&[Self]>;

    /// True for the statically-false expression; such rules are never indexed
    fn is_always_false(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_context_is_empty() {
        let ctx = KeyContext::default();
        assert!(ctx.is_empty());
        assert!(!ctx.is_truthy("editorTextFocus"));
    }

    #[test]
    fn test_truthiness() {
        let ctx = KeyContext::new()
            .with("focused", true)
            .with("count", 0.0)
            .with("lang", "rust")
            .with("empty", "");

        assert!(ctx.is_truthy("focused"));
        assert!(!ctx.is_truthy("count"));
        assert!(ctx.is_truthy("lang"));
        assert!(!ctx.is_truthy("empty"));
        assert!(!ctx.is_truthy("missing"));
    }

    #[test]
    fn test_from_literal() {
        assert_eq!(ContextValue::from_literal("true"), ContextValue::Bool(true));
        assert_eq!(ContextValue::from_literal("2"), ContextValue::Number(2.0));
        assert_eq!(
            ContextValue::from_literal("rust"),
            ContextValue::Str("rust".to_string())
        );
    }

    #[test]
    fn test_matches_literal() {
        assert!(ContextValue::from("rust").matches_literal("rust"));
        assert!(!ContextValue::from("rust").matches_literal("go"));
        assert!(ContextValue::from(true).matches_literal("true"));
        assert!(!ContextValue::from(true).matches_literal("yes"));
        assert!(ContextValue::from(2.0).matches_literal("2"));
    }

    #[test]
    fn test_deserialize_flat_map() {
        let ctx: KeyContext =
            serde_yaml::from_str("editorTextFocus: true\nresourceLangId: rust\ncount: 3\n")
                .unwrap();
        assert_eq!(ctx.len(), 3);
        assert!(ctx.is_truthy("editorTextFocus"));
        assert_eq!(ctx.get("resourceLangId"), Some(&ContextValue::from("rust")));
        assert_eq!(ctx.get("count"), Some(&ContextValue::Number(3.0)));
    }

    #[test]
    fn test_remove_key() {
        let mut ctx = KeyContext::new().with("a", true);
        assert!(ctx.remove("a").is_some());
        assert!(!ctx.is_truthy("a"));
    }
}
