//! Symbolic identifiers
//!
//! Every named object in a netlist (module, wire, cell, parameter,
//! attribute) is keyed by an [`IdString`]. The first character carries the
//! scope: a leading `\` marks a user-scoped name taken from source code, a
//! leading `$` marks an auto-generated name owned by the toolchain.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An interned-by-value symbolic name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdString(String);

impl IdString {
    /// Wrap a raw name. The caller is responsible for the scope sigil.
    pub fn new(name: impl Into<String>) -> Self {
        IdString(name.into())
    }

    /// Escape a plain name into user scope. Names that already carry a `\`
    /// or `$` sigil are passed through unchanged.
    pub fn escape(name: &str) -> Self {
        match name.chars().next() {
            Some('\\') | Some('$') => IdString(name.to_string()),
            _ => IdString(format!("\\{}", name)),
        }
    }

    /// The raw name including the scope sigil.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for names taken from user source (leading `\`).
    pub fn is_user_scoped(&self) -> bool {
        self.0.starts_with('\\')
    }

    /// True for auto-generated names (leading `$`).
    pub fn is_autogen(&self) -> bool {
        self.0.starts_with('$')
    }

    /// The name without its scope sigil.
    pub fn tail(&self) -> &str {
        match self.0.chars().next() {
            Some('\\') | Some('$') => &self.0[1..],
            _ => &self.0,
        }
    }
}

impl fmt::Display for IdString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for IdString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdString({})", self.0)
    }
}

impl From<&str> for IdString {
    fn from(name: &str) -> Self {
        IdString::new(name)
    }
}

impl From<String> for IdString {
    fn from(name: String) -> Self {
        IdString::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_adds_user_sigil() {
        assert_eq!(IdString::escape("foo").as_str(), "\\foo");
        assert_eq!(IdString::escape("\\foo").as_str(), "\\foo");
        assert_eq!(IdString::escape("$and").as_str(), "$and");
    }

    #[test]
    fn scope_queries() {
        assert!(IdString::new("\\top").is_user_scoped());
        assert!(!IdString::new("\\top").is_autogen());
        assert!(IdString::new("$techmap1.x").is_autogen());
        assert_eq!(IdString::new("\\top").tail(), "top");
        assert_eq!(IdString::new("$x").tail(), "x");
    }
}
