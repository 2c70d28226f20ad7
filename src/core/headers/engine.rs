//! Rule application

use super::parser::parse_rules;
use super::types::{Directive, HeaderPattern, HeaderRule, HeaderRuleError};
use crate::core::types::GatewayRequest;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;

/// An ordered, immutable list of header rules, parsed once at load time
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Arc<[Directive]>,
}

impl RuleSet {
    /// Parse a directive string; an empty string yields an empty set
    pub fn parse(directives: &str) -> Result<Self, HeaderRuleError> {
        Ok(Self {
            rules: parse_rules(directives)?.into(),
        })
    }

    /// Build a set from already parsed rules
    pub fn from_rules(rules: Vec<HeaderRule>) -> Self {
        Self {
            rules: rules.into_iter().map(Directive::from).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn directives(&self) -> &[Directive] {
        &self.rules
    }

    /// Apply the rules in order
    ///
    /// `source` is the header set `Forward` and `Copy` read from; every other
    /// action works on `target`, so later rules see the effect of earlier ones.
    /// Conditions are evaluated against the inbound `request`.
    pub fn apply(&self, request: &GatewayRequest, source: &HeaderMap, target: &mut HeaderMap) {
        for directive in self.rules.iter() {
            if let Some(condition) = &directive.condition {
                if !condition.evaluate(request) {
                    continue;
                }
            }
            apply_rule(&directive.rule, source, target);
        }
    }
}

fn apply_rule(rule: &HeaderRule, source: &HeaderMap, target: &mut HeaderMap) {
    match rule {
        HeaderRule::Add { name, value } => {
            target.append(name.clone(), value.clone());
        }
        HeaderRule::Remove { pattern } => {
            for name in matching_names(target, pattern) {
                target.remove(&name);
            }
        }
        HeaderRule::Forward { pattern } => {
            for name in matching_names(source, pattern) {
                target.remove(&name);
                for value in source.get_all(&name) {
                    target.append(name.clone(), value.clone());
                }
            }
        }
        HeaderRule::Append { pattern, suffix } => {
            let names = matching_names(target, pattern);
            if names.is_empty() {
                if let HeaderPattern::Exact(name) = pattern {
                    set_value(target, name.clone(), suffix);
                }
                return;
            }
            for name in names {
                let joined = joined_value(target, &name);
                let value = if joined.is_empty() {
                    suffix.clone()
                } else {
                    format!("{},{}", joined, suffix)
                };
                set_value(target, name, &value);
            }
        }
        HeaderRule::Copy { pattern, prefix } => {
            for name in matching_names(source, pattern) {
                let Ok(renamed) = HeaderName::from_bytes(format!("{}{}", prefix, name).as_bytes())
                else {
                    continue;
                };
                target.remove(&renamed);
                for value in source.get_all(&name) {
                    target.append(renamed.clone(), value.clone());
                }
            }
        }
        HeaderRule::Modify { pattern, from, to } => {
            for name in matching_names(target, pattern) {
                let rewritten: Vec<HeaderValue> = target
                    .get_all(&name)
                    .iter()
                    .filter_map(|v| v.to_str().ok())
                    .filter_map(|v| HeaderValue::from_str(&v.replace(from.as_str(), to)).ok())
                    .collect();
                target.remove(&name);
                for value in rewritten {
                    target.append(name.clone(), value);
                }
            }
        }
    }
}

/// Distinct header names in `headers` matching the pattern
fn matching_names(headers: &HeaderMap, pattern: &HeaderPattern) -> Vec<HeaderName> {
    match pattern {
        HeaderPattern::Exact(name) if headers.contains_key(name) => vec![name.clone()],
        HeaderPattern::Exact(_) => Vec::new(),
        HeaderPattern::Prefix(_) => headers
            .keys()
            .filter(|name| pattern.matches(name))
            .cloned()
            .collect(),
    }
}

/// All values of a header joined as an HTTP list
fn joined_value(headers: &HeaderMap, name: &HeaderName) -> String {
    headers
        .get_all(name)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

fn set_value(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}
