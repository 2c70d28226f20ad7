//! Request rule types

use crate::core::types::GatewayRequest;
use regex::Regex;
use reqwest::header::HeaderName;

/// Part of the request a predicate looks at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    /// First value of a request header
    Header(HeaderName),
    /// First value of a decoded query parameter
    Query(String),
    /// Request path
    Path,
    /// Host the client addressed, without the port
    Host,
}

/// How the subject's value is compared
#[derive(Debug, Clone)]
pub enum Matcher {
    Exact(String),
    Prefix(String),
    /// Must match the whole value
    Regex(Regex),
}

impl Matcher {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Matcher::Exact(expected) => value == expected,
            Matcher::Prefix(prefix) => value.starts_with(prefix.as_str()),
            Matcher::Regex(regex) => regex.is_match(value),
        }
    }
}

/// A single test such as `HeaderPrefix('User-Agent', 'Mozilla')`
#[derive(Debug, Clone)]
pub struct Predicate {
    pub subject: Subject,
    pub matcher: Matcher,
}

impl Predicate {
    /// A missing header, parameter or host never matches
    pub fn evaluate(&self, request: &GatewayRequest) -> bool {
        match &self.subject {
            Subject::Header(name) => request
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| self.matcher.matches(v)),
            Subject::Query(name) => request
                .query
                .as_deref()
                .and_then(|query| {
                    url::form_urlencoded::parse(query.as_bytes())
                        .find(|(key, _)| key == name.as_str())
                        .map(|(_, value)| value.into_owned())
                })
                .is_some_and(|v| self.matcher.matches(&v)),
            Subject::Path => self.matcher.matches(&request.path),
            Subject::Host => request_host(request).is_some_and(|h| self.matcher.matches(h)),
        }
    }
}

fn request_host(request: &GatewayRequest) -> Option<&str> {
    let host = request
        .headers
        .get(reqwest::header::HOST)
        .and_then(|v| v.to_str().ok())?;
    // keep bracketed IPv6 literals intact
    match host.rfind(':') {
        Some(i) if !host[i..].contains(']') => Some(&host[..i]),
        _ => Some(host),
    }
}

/// Boolean combination of predicates, parsed once at load time
#[derive(Debug, Clone)]
pub enum RuleExpr {
    Predicate(Predicate),
    All(Vec<RuleExpr>),
    Any(Vec<RuleExpr>),
}

impl RuleExpr {
    pub fn evaluate(&self, request: &GatewayRequest) -> bool {
        match self {
            RuleExpr::Predicate(predicate) => predicate.evaluate(request),
            RuleExpr::All(rules) => rules.iter().all(|r| r.evaluate(request)),
            RuleExpr::Any(rules) => rules.iter().any(|r| r.evaluate(request)),
        }
    }
}

/// Error raised for a malformed rule expression
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid rule '{rule}' at offset {offset}: {reason}")]
pub struct RuleError {
    pub rule: String,
    pub offset: usize,
    pub reason: String,
}
