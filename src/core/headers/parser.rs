//! Directive string parser
//!
//! Grammar: `Action(arg, ...)` directives separated by `;`. Action names are
//! case-insensitive, arguments are trimmed. The last argument of `Add`,
//! `Append` and `Modify` takes the rest of the argument list, so values may
//! contain commas.
//!
//! `Forward`, `Copy`, `Append` and `Modify` take an optional trailing rule
//! expression, e.g. `Forward(X-Debug-*, Query('debug', 'true'))`. Directives
//! are split on `;` outside quotes, so conditions may quote a `;`.

use super::types::{Directive, HeaderPattern, HeaderRule, HeaderRuleError};
use crate::core::rules::{RuleExpr, looks_like_rule};
use reqwest::header::{HeaderName, HeaderValue};

type ParseResult<T> = std::result::Result<T, HeaderRuleError>;

/// Parse a full directive string, in declaration order
pub fn parse_rules(directives: &str) -> ParseResult<Vec<Directive>> {
    split_directives(directives)
        .into_iter()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(parse_rule)
        .collect()
}

fn split_directives(directives: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut quote = None;
    let mut start = 0;
    for (i, c) in directives.char_indices() {
        match (quote, c) {
            (None, '\'' | '"') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, ';') => {
                out.push(&directives[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&directives[start..]);
    out
}

/// Parse a single directive such as `Add(X-Gateway, 1)`
pub fn parse_rule(directive: &str) -> ParseResult<Directive> {
    let open = directive
        .find('(')
        .ok_or_else(|| HeaderRuleError::new(directive, "expected Action(arguments)"))?;
    if !directive.ends_with(')') {
        return Err(HeaderRuleError::new(directive, "missing closing parenthesis"));
    }

    let action = directive[..open].trim().to_ascii_lowercase();
    let args = &directive[open + 1..directive.len() - 1];

    let (args, condition) = match action.as_str() {
        "forward" => split_condition(directive, args, 1)?,
        "copy" | "append" => split_condition(directive, args, 2)?,
        "modify" => split_condition(directive, args, 3)?,
        _ => (args, None),
    };
    Ok(Directive {
        rule: parse_action(directive, &action, args)?,
        condition,
    })
}

/// Detach a trailing rule expression that follows at least `required` arguments
fn split_condition<'a>(
    directive: &str,
    args: &'a str,
    required: usize,
) -> ParseResult<(&'a str, Option<RuleExpr>)> {
    let split = args
        .match_indices(',')
        .skip(required - 1)
        .map(|(i, _)| i)
        .find(|i| looks_like_rule(&args[i + 1..]));
    match split {
        Some(i) => {
            let rule = RuleExpr::parse(args[i + 1..].trim())
                .map_err(|e| HeaderRuleError::new(directive, e.to_string()))?;
            Ok((&args[..i], Some(rule)))
        }
        None => Ok((args, None)),
    }
}

fn parse_action(directive: &str, action: &str, args: &str) -> ParseResult<HeaderRule> {
    match action {
        "add" => {
            let [name, value] = split_args::<2>(directive, args)?;
            Ok(HeaderRule::Add {
                name: header_name(directive, name)?,
                value: HeaderValue::from_str(value)
                    .map_err(|_| HeaderRuleError::new(directive, "invalid header value"))?,
            })
        }
        "remove" => Ok(HeaderRule::Remove {
            pattern: parse_pattern(directive, single_arg(directive, args)?)?,
        }),
        "forward" => Ok(HeaderRule::Forward {
            pattern: parse_pattern(directive, single_arg(directive, args)?)?,
        }),
        "append" => {
            let [pattern, suffix] = split_args::<2>(directive, args)?;
            Ok(HeaderRule::Append {
                pattern: parse_pattern(directive, pattern)?,
                suffix: visible_text(directive, suffix)?,
            })
        }
        "copy" => {
            let [pattern, prefix] = split_args::<2>(directive, args)?;
            // the prefix must itself be a valid header name fragment
            header_name(directive, &format!("{}x", prefix))?;
            Ok(HeaderRule::Copy {
                pattern: parse_pattern(directive, pattern)?,
                prefix: prefix.to_ascii_lowercase(),
            })
        }
        "modify" => {
            let [pattern, from, to] = split_args::<3>(directive, args)?;
            if from.is_empty() {
                return Err(HeaderRuleError::new(directive, "search text cannot be empty"));
            }
            Ok(HeaderRule::Modify {
                pattern: parse_pattern(directive, pattern)?,
                from: from.to_string(),
                to: visible_text(directive, to)?,
            })
        }
        other => Err(HeaderRuleError::new(
            directive,
            format!("unknown action '{}'", other),
        )),
    }
}

/// Parse a header name pattern
pub fn parse_pattern(directive: &str, raw: &str) -> ParseResult<HeaderPattern> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(HeaderRuleError::new(directive, "header pattern cannot be empty"));
    }

    match raw.strip_suffix('*') {
        Some(prefix) => {
            if prefix.contains('*') {
                return Err(HeaderRuleError::new(
                    directive,
                    "'*' is only supported as the last character",
                ));
            }
            if !prefix.is_empty() {
                header_name(directive, prefix)?;
            }
            Ok(HeaderPattern::Prefix(prefix.to_ascii_lowercase()))
        }
        None => Ok(HeaderPattern::Exact(header_name(directive, raw)?)),
    }
}

fn header_name(directive: &str, raw: &str) -> ParseResult<HeaderName> {
    HeaderName::from_bytes(raw.trim().as_bytes())
        .map_err(|_| HeaderRuleError::new(directive, format!("invalid header name '{}'", raw)))
}

fn visible_text(directive: &str, raw: &str) -> ParseResult<String> {
    HeaderValue::from_str(raw)
        .map(|_| raw.to_string())
        .map_err(|_| HeaderRuleError::new(directive, "invalid header value"))
}

fn single_arg<'a>(directive: &str, args: &'a str) -> ParseResult<&'a str> {
    let [arg] = split_args::<1>(directive, args)?;
    if arg.contains(',') {
        return Err(HeaderRuleError::new(directive, "expected a single argument"));
    }
    Ok(arg)
}

/// Split into exactly `N` trimmed arguments; the last one keeps any commas
fn split_args<'a, const N: usize>(directive: &str, args: &'a str) -> ParseResult<[&'a str; N]> {
    let mut out = [""; N];
    let mut parts = args.splitn(N, ',');
    for slot in out.iter_mut() {
        *slot = parts
            .next()
            .map(str::trim)
            .ok_or_else(|| HeaderRuleError::new(directive, format!("expected {} arguments", N)))?;
    }
    Ok(out)
}
