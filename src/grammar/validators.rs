//! Built-in high-level validators for `@` rows
//!
//! A validator cell holds one or more rules separated by `;`, for example
//! `range(1,100)` or `len(,16); regex(^[a-z_]+$)`.

use std::sync::Arc;

use regex::Regex;

use crate::error::GrammarError;
use crate::model::Value;

use super::{Validator, ValidatorFactory};

/// Factory for the rules below
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinValidators;

impl ValidatorFactory for BuiltinValidators {
    fn build(&self, spec: &str) -> Result<Arc<dyn Validator>, GrammarError> {
        let rules = split_rules(spec)
            .into_iter()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(Rule::parse)
            .collect::<Result<Vec<_>, _>>()?;
        if rules.is_empty() {
            return Err(GrammarError::new("no validation rule"));
        }
        Ok(Arc::new(RuleSet {
            spec: spec.trim().to_string(),
            rules,
        }))
    }
}

#[derive(Debug)]
enum Rule {
    Range { min: Option<f64>, max: Option<f64> },
    Len { min: Option<usize>, max: Option<usize> },
    Pattern(Regex),
    OneOf(Vec<String>),
    NonEmpty,
}

#[derive(Debug)]
struct RuleSet {
    spec: String,
    rules: Vec<Rule>,
}

impl Validator for RuleSet {
    fn check(&self, value: &Value) -> Result<(), String> {
        self.rules.iter().try_for_each(|rule| rule.check(value))
    }

    fn spec(&self) -> &str {
        &self.spec
    }
}

impl Rule {
    fn parse(text: &str) -> Result<Rule, GrammarError> {
        let (name, args) = match text.find('(') {
            Some(open) => {
                let args = text[open + 1..]
                    .strip_suffix(')')
                    .ok_or_else(|| GrammarError::new(format!("unclosed \"(\" in \"{}\"", text)))?;
                (text[..open].trim(), Some(args))
            }
            None => (text, None),
        };

        match (name.to_ascii_lowercase().as_str(), args) {
            ("range", Some(args)) => {
                let (min, max) = bounds(args, |s| s.parse::<f64>().ok())?;
                Ok(Rule::Range { min, max })
            }
            ("len", Some(args)) => {
                let (min, max) = bounds(args, |s| s.parse::<usize>().ok())?;
                Ok(Rule::Len { min, max })
            }
            ("regex", Some(pattern)) => Regex::new(pattern)
                .map(Rule::Pattern)
                .map_err(|e| GrammarError::new(format!("bad regex: {}", e))),
            ("oneof", Some(args)) => Ok(Rule::OneOf(
                args.split('|').map(|s| s.trim().to_string()).collect(),
            )),
            ("nonempty", None) => Ok(Rule::NonEmpty),
            _ => Err(GrammarError::new(format!("unknown rule \"{}\"", text))),
        }
    }

    fn check(&self, value: &Value) -> Result<(), String> {
        // Element-wise rules look inside arrays
        if let Value::Array(items) = value {
            if !matches!(self, Rule::Len { .. } | Rule::NonEmpty) {
                return items.iter().try_for_each(|v| self.check(v));
            }
        }

        match self {
            Rule::Range { min, max } => {
                let n = value
                    .as_f64()
                    .ok_or_else(|| format!("\"{}\" is not numeric", value))?;
                if min.is_some_and(|m| n < m) || max.is_some_and(|m| n > m) {
                    return Err(format!("{} out of range", n));
                }
                Ok(())
            }
            Rule::Len { min, max } => {
                let len = match value {
                    Value::String(s) => s.chars().count(),
                    Value::Array(items) => items.len(),
                    _ => return Err(format!("\"{}\" has no length", value)),
                };
                if min.is_some_and(|m| len < m) || max.is_some_and(|m| len > m) {
                    return Err(format!("length {} out of range", len));
                }
                Ok(())
            }
            Rule::Pattern(re) => {
                let text = value.display();
                if re.is_match(&text) {
                    Ok(())
                } else {
                    Err(format!("\"{}\" does not match /{}/", text, re.as_str()))
                }
            }
            Rule::OneOf(options) => {
                let text = value.display();
                if options.iter().any(|o| o.as_str() == text) {
                    Ok(())
                } else {
                    Err(format!("\"{}\" is not one of {}", text, options.join("|")))
                }
            }
            Rule::NonEmpty => match value {
                Value::String(s) if s.is_empty() => Err("empty string".to_string()),
                Value::Array(items) if items.is_empty() => Err("empty array".to_string()),
                _ => Ok(()),
            },
        }
    }
}

fn bounds<T>(
    args: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<(Option<T>, Option<T>), GrammarError> {
    let (lo, hi) = args
        .split_once(',')
        .ok_or_else(|| GrammarError::new(format!("expected \"min,max\", got \"{}\"", args)))?;
    let bound = |s: &str| -> Result<Option<T>, GrammarError> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(None);
        }
        parse(s)
            .map(Some)
            .ok_or_else(|| GrammarError::new(format!("bad bound \"{}\"", s)))
    };
    Ok((bound(lo)?, bound(hi)?))
}

/// Split on `;` outside parentheses so regex rules may contain semicolons
fn split_rules(spec: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, ch) in spec.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            ';' if depth <= 0 => {
                parts.push(&spec[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&spec[start..]);
    parts
}
