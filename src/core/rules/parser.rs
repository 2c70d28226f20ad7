//! Rule expression parser
//!
//! Grammar:
//!
//! ```text
//! expr      := all ( "||" all )*
//! all       := primary ( "&&" primary )*
//! primary   := "(" expr ")" | predicate
//! predicate := NAME "(" arg ( "," arg )* ")"
//! arg       := 'quoted' | "quoted" | bare text up to "," or ")"
//! ```
//!
//! Predicate names are case-insensitive. `Header*` and `Query*` take a name
//! and a value, `Path*` and `Host*` take a value.

use super::types::{Matcher, Predicate, RuleError, RuleExpr, Subject};
use regex::Regex;
use reqwest::header::HeaderName;

type ParseResult<T> = std::result::Result<T, RuleError>;

/// Parse a rule expression such as `Header('X-Tenant', 'b') || PathPrefix('/beta')`
pub fn parse_rule_expr(input: &str) -> ParseResult<RuleExpr> {
    let mut parser = Parser { input, pos: 0 };
    parser.skip_ws();
    if parser.at_end() {
        return Err(parser.error("rule is empty"));
    }
    let expr = parser.expr()?;
    parser.skip_ws();
    if !parser.at_end() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(expr)
}

/// Whether `input` starts like a rule expression rather than plain text
pub fn looks_like_rule(input: &str) -> bool {
    let trimmed = input.trim_start();
    if trimmed.starts_with('(') {
        return true;
    }
    let name: String = trimmed
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    predicate_kind(&name).is_some() && trimmed[name.len()..].trim_start().starts_with('(')
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Exact,
    Prefix,
    Regex,
}

#[derive(Debug, Clone, Copy)]
enum Target {
    Header,
    Query,
    Path,
    Host,
}

fn predicate_kind(name: &str) -> Option<(Target, Kind)> {
    let lower = name.to_ascii_lowercase();
    let (target, rest) = ["header", "query", "path", "host"]
        .iter()
        .find_map(|t| lower.strip_prefix(t).map(|rest| (*t, rest)))?;
    let target = match target {
        "header" => Target::Header,
        "query" => Target::Query,
        "path" => Target::Path,
        _ => Target::Host,
    };
    let kind = match rest {
        "" => Kind::Exact,
        "prefix" => Kind::Prefix,
        "regex" => Kind::Regex,
        _ => return None,
    };
    Some((target, kind))
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, reason: impl Into<String>) -> RuleError {
        RuleError {
            rule: self.input.to_string(),
            offset: self.pos,
            reason: reason.into(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.input.len() - trimmed.len();
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &str) -> ParseResult<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", token)))
        }
    }

    fn expr(&mut self) -> ParseResult<RuleExpr> {
        let mut any = vec![self.all()?];
        while self.eat("||") {
            any.push(self.all()?);
        }
        Ok(flatten(any, RuleExpr::Any))
    }

    fn all(&mut self) -> ParseResult<RuleExpr> {
        let mut all = vec![self.primary()?];
        while self.eat("&&") {
            all.push(self.primary()?);
        }
        Ok(flatten(all, RuleExpr::All))
    }

    fn primary(&mut self) -> ParseResult<RuleExpr> {
        if self.eat("(") {
            let expr = self.expr()?;
            self.expect(")")?;
            return Ok(expr);
        }
        self.predicate().map(RuleExpr::Predicate)
    }

    fn predicate(&mut self) -> ParseResult<Predicate> {
        self.skip_ws();
        let start = self.pos;
        let name: &str = {
            let len = self
                .rest()
                .find(|c: char| !c.is_ascii_alphabetic())
                .unwrap_or(self.rest().len());
            &self.input[start..start + len]
        };
        if name.is_empty() {
            return Err(self.error("expected a predicate"));
        }
        let (target, kind) = predicate_kind(name)
            .ok_or_else(|| self.error(format!("unknown predicate '{}'", name)))?;
        self.pos += name.len();

        self.expect("(")?;
        let mut args = vec![self.arg()?];
        while self.eat(",") {
            args.push(self.arg()?);
        }
        self.expect(")")?;

        let (subject, value) = match (target, args.as_slice()) {
            (Target::Header, [header, value]) => {
                let header = HeaderName::from_bytes(header.as_bytes())
                    .map_err(|_| self.error(format!("invalid header name '{}'", header)))?;
                (Subject::Header(header), value.clone())
            }
            (Target::Query, [param, value]) => (Subject::Query(param.clone()), value.clone()),
            (Target::Path, [value]) => (Subject::Path, value.clone()),
            (Target::Host, [value]) => (Subject::Host, value.clone()),
            (Target::Header | Target::Query, _) => {
                return Err(self.error(format!("'{}' expects a name and a value", name)));
            }
            (Target::Path | Target::Host, _) => {
                return Err(self.error(format!("'{}' expects a single value", name)));
            }
        };

        let matcher = match kind {
            Kind::Exact => Matcher::Exact(value),
            Kind::Prefix => Matcher::Prefix(value),
            Kind::Regex => Matcher::Regex(
                Regex::new(&format!("^(?:{})$", value))
                    .map_err(|e| self.error(format!("invalid regex: {}", e)))?,
            ),
        };
        Ok(Predicate { subject, matcher })
    }

    fn arg(&mut self) -> ParseResult<String> {
        self.skip_ws();
        match self.rest().chars().next() {
            Some(quote @ ('\'' | '"')) => {
                self.pos += 1;
                let mut value = String::new();
                let mut chars = self.rest().char_indices();
                while let Some((i, c)) = chars.next() {
                    match c {
                        // only the quote and the backslash itself are escapes,
                        // so regex classes like `\d` pass through
                        '\\' => match self.rest()[i + 1..].chars().next() {
                            Some(next) if next == quote || next == '\\' => {
                                chars.next();
                                value.push(next);
                            }
                            _ => value.push('\\'),
                        },
                        c if c == quote => {
                            self.pos += i + 1;
                            return Ok(value);
                        }
                        c => value.push(c),
                    }
                }
                self.pos = self.input.len();
                Err(self.error("unterminated string"))
            }
            Some(_) => {
                let len = self
                    .rest()
                    .find([',', ')'])
                    .unwrap_or(self.rest().len());
                let value = self.rest()[..len].trim().to_string();
                self.pos += len;
                if value.is_empty() {
                    return Err(self.error("empty argument"));
                }
                Ok(value)
            }
            None => Err(self.error("expected an argument")),
        }
    }
}

fn flatten(mut rules: Vec<RuleExpr>, combine: fn(Vec<RuleExpr>) -> RuleExpr) -> RuleExpr {
    if rules.len() == 1 {
        rules.remove(0)
    } else {
        combine(rules)
    }
}
