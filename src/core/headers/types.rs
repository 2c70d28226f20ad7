//! Header rule types

use crate::core::rules::RuleExpr;
use reqwest::header::{HeaderName, HeaderValue};
use std::fmt;

/// Header name matcher
///
/// A trailing `*` matches any header starting with the preceding text, a lone
/// `*` matches every header. Everything else is an exact, case-insensitive
/// name. No other wildcard forms are recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderPattern {
    Exact(HeaderName),
    /// Lowercased prefix
    Prefix(String),
}

impl HeaderPattern {
    /// Whether the pattern matches a header name
    pub fn matches(&self, name: &HeaderName) -> bool {
        match self {
            HeaderPattern::Exact(exact) => exact == name,
            // HeaderName is always lowercase
            HeaderPattern::Prefix(prefix) => name.as_str().starts_with(prefix.as_str()),
        }
    }
}

impl fmt::Display for HeaderPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderPattern::Exact(name) => write!(f, "{}", name),
            HeaderPattern::Prefix(prefix) => write!(f, "{}*", prefix),
        }
    }
}

/// One parsed header directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderRule {
    /// `Add(name, value)`: append a value regardless of existing ones
    Add { name: HeaderName, value: HeaderValue },
    /// `Remove(pattern)`: delete every matching header from the target
    Remove { pattern: HeaderPattern },
    /// `Forward(pattern)`: copy matching headers from the source unmodified
    Forward { pattern: HeaderPattern },
    /// `Append(pattern, suffix)`: join `suffix` onto matching values with `,`
    Append {
        pattern: HeaderPattern,
        suffix: String,
    },
    /// `Copy(pattern, prefix)`: copy matching source headers under a new prefix
    Copy {
        pattern: HeaderPattern,
        prefix: String,
    },
    /// `Modify(pattern, from, to)`: replace text inside matching target values
    Modify {
        pattern: HeaderPattern,
        from: String,
        to: String,
    },
}

/// A rule with the request condition it is guarded by
///
/// `Forward`, `Copy`, `Append` and `Modify` accept a rule expression as an
/// extra trailing argument; the rule then only runs for matching requests.
#[derive(Debug, Clone)]
pub struct Directive {
    pub rule: HeaderRule,
    pub condition: Option<RuleExpr>,
}

impl From<HeaderRule> for Directive {
    fn from(rule: HeaderRule) -> Self {
        Self {
            rule,
            condition: None,
        }
    }
}

/// Error raised for a malformed directive string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid header directive '{directive}': {reason}")]
pub struct HeaderRuleError {
    pub directive: String,
    pub reason: String,
}

impl HeaderRuleError {
    pub(super) fn new(directive: &str, reason: impl Into<String>) -> Self {
        Self {
            directive: directive.to_string(),
            reason: reason.into(),
        }
    }
}
