//! Header rule engine
//!
//! Directive strings such as `Remove(Authorization);Add(X-Gateway,1)` are
//! parsed once into a [`RuleSet`] when configuration is compiled and applied
//! per request to the backend request, the forward-auth request and the
//! response returned to the client. Most actions can be guarded by a
//! request rule expression.

mod engine;
mod parser;
mod types;

pub use engine::RuleSet;
pub use parser::{parse_pattern, parse_rule, parse_rules};
pub use types::{Directive, HeaderPattern, HeaderRule, HeaderRuleError};
