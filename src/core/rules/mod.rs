//! Request rule expressions
//!
//! Expressions such as `Header('X-Tenant', 'b') && PathPrefix('/v2')` are
//! parsed once when configuration is compiled. They gate routes, pick the
//! service a route forwards to, and make header directives conditional.

mod parser;
mod types;

pub use parser::{looks_like_rule, parse_rule_expr};
pub use types::{Matcher, Predicate, RuleError, RuleExpr, Subject};

impl RuleExpr {
    pub fn parse(input: &str) -> Result<Self, RuleError> {
        parse_rule_expr(input)
    }
}
