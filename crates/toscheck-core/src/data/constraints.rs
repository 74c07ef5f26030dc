//! Constraint clauses: `- greater_or_equal: 1`, `- valid_values: [a, b]`, ...

use regex::Regex;
use serde_yaml::{Sequence, Value};
use std::cmp::Ordering;

use super::{scalar, version_text, CoreType};
use crate::checker::CheckContext;
use crate::value::{describe, single_entry};

/// Operators understood in a `constraints` list.
pub const OPERATORS: &[&str] = &[
    "equal",
    "greater_than",
    "greater_or_equal",
    "less_than",
    "less_or_equal",
    "in_range",
    "valid_values",
    "length",
    "min_length",
    "max_length",
    "pattern",
];

/// Checks `expr` against every clause; one error per violated clause.
pub fn evaluate(expr: &Value, constraints: &Sequence, core: CoreType, ctx: &mut CheckContext) -> bool {
    let mut ok = true;
    for constraint in constraints {
        let Some((operator, operand)) = single_entry(constraint) else {
            ctx.add_error(format!("Invalid constraint: {}", describe(constraint)));
            ok = false;
            continue;
        };
        match satisfies(operator, operand, expr, core) {
            Ok(true) => {}
            Ok(false) => {
                ctx.add_error(format!(
                    "Value {} does not satisfy constraint {}: {}",
                    describe(expr),
                    operator,
                    describe(operand)
                ));
                ok = false;
            }
            Err(problem) => {
                ctx.add_error(problem);
                ok = false;
            }
        }
    }
    ok
}

fn satisfies(operator: &str, operand: &Value, expr: &Value, core: CoreType) -> Result<bool, String> {
    match operator {
        "equal" => Ok(equals(expr, operand, core)),
        "greater_than" => Ok(compare(expr, operand, core)? == Ordering::Greater),
        "greater_or_equal" => Ok(compare(expr, operand, core)? != Ordering::Less),
        "less_than" => Ok(compare(expr, operand, core)? == Ordering::Less),
        "less_or_equal" => Ok(compare(expr, operand, core)? != Ordering::Greater),
        "in_range" => {
            let Some([lower, upper]) = operand.as_sequence().map(Vec::as_slice) else {
                return Err(format!(
                    "in_range expects a list of two bounds, got {}",
                    describe(operand)
                ));
            };
            let above = compare(expr, lower, core)? != Ordering::Less;
            let below = upper.as_str() == Some(super::UNBOUNDED) || compare(expr, upper, core)? != Ordering::Greater;
            Ok(above && below)
        }
        "valid_values" => {
            let values = operand
                .as_sequence()
                .ok_or_else(|| format!("valid_values expects a list, got {}", describe(operand)))?;
            Ok(values.iter().any(|v| equals(expr, v, core)))
        }
        "length" | "min_length" | "max_length" => {
            let expected = operand
                .as_u64()
                .ok_or_else(|| format!("{} expects a non-negative integer, got {}", operator, describe(operand)))?;
            let actual = length(expr)
                .ok_or_else(|| format!("{} applies to strings, lists and maps, not {}", operator, describe(expr)))?;
            Ok(match operator {
                "length" => actual == expected,
                "min_length" => actual >= expected,
                _ => actual <= expected,
            })
        }
        "pattern" => {
            let pattern = operand
                .as_str()
                .ok_or_else(|| format!("pattern expects a regular expression, got {}", describe(operand)))?;
            let text = expr
                .as_str()
                .ok_or_else(|| format!("pattern applies to strings, not {}", describe(expr)))?;
            let re = Regex::new(&format!("^(?:{})$", pattern))
                .map_err(|e| format!("Invalid pattern {}: {}", pattern, e))?;
            Ok(re.is_match(text))
        }
        other => Err(format!("Unknown constraint operator: {}", other)),
    }
}

fn length(value: &Value) -> Option<u64> {
    let len = match value {
        Value::String(s) => s.chars().count(),
        Value::Sequence(s) => s.len(),
        Value::Mapping(m) => m.len(),
        _ => return None,
    };
    u64::try_from(len).ok()
}

#[derive(Debug, PartialEq, PartialOrd)]
enum Comparable {
    Number(f64),
    Version(Vec<u64>),
    Text(String),
}

fn comparable(value: &Value, core: CoreType) -> Option<Comparable> {
    if let Some(kind) = core.scalar_kind() {
        return scalar::parse(kind, value).map(Comparable::Number);
    }
    if core == CoreType::Version {
        let text = version_text(value)?;
        let parts: Vec<u64> = text.split('.').map_while(|p| p.parse().ok()).collect();
        return Some(Comparable::Version(parts));
    }
    match value {
        Value::Number(n) => n.as_f64().map(Comparable::Number),
        Value::String(s) => Some(Comparable::Text(s.clone())),
        _ => None,
    }
}

fn compare(left: &Value, right: &Value, core: CoreType) -> Result<Ordering, String> {
    let incomparable = || format!("Cannot compare {} with {}", describe(left), describe(right));
    let (Some(l), Some(r)) = (comparable(left, core), comparable(right, core)) else {
        return Err(incomparable());
    };
    match (&l, &r) {
        (Comparable::Number(_), Comparable::Number(_))
        | (Comparable::Version(_), Comparable::Version(_))
        | (Comparable::Text(_), Comparable::Text(_)) => l.partial_cmp(&r).ok_or_else(incomparable),
        _ => Err(incomparable()),
    }
}

fn equals(left: &Value, right: &Value, core: CoreType) -> bool {
    match compare(left, right, core) {
        Ok(ordering) => ordering == Ordering::Equal,
        Err(_) => left == right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    fn check(operator: &str, operand: &str, expr: &str, core: CoreType) -> Result<bool, String> {
        satisfies(operator, &yaml(operand), &yaml(expr), core)
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(check("greater_than", "1", "2", CoreType::Integer), Ok(true));
        assert_eq!(check("greater_or_equal", "2", "2", CoreType::Integer), Ok(true));
        assert_eq!(check("less_than", "2", "2", CoreType::Integer), Ok(false));
        assert_eq!(check("in_range", "[1, 65535]", "80", CoreType::Integer), Ok(true));
        assert_eq!(check("in_range", "[1, 65535]", "0", CoreType::Integer), Ok(false));
        assert_eq!(check("in_range", "[1, UNBOUNDED]", "7", CoreType::Integer), Ok(true));
        assert!(check("greater_than", "abc", "2", CoreType::Integer).is_err());
    }

    #[test]
    fn test_scalar_units_normalize() {
        assert_eq!(check("greater_or_equal", "512 MB", "1 GB", CoreType::ScalarUnitSize), Ok(true));
        assert_eq!(check("less_than", "1 m", "90 s", CoreType::ScalarUnitTime), Ok(false));
        assert_eq!(check("equal", "1000 kHz", "1 MHz", CoreType::ScalarUnitFrequency), Ok(true));
    }

    #[test]
    fn test_versions_compare_numerically() {
        assert_eq!(check("greater_than", "'1.9'", "'1.10'", CoreType::Version), Ok(true));
    }

    #[test]
    fn test_valid_values_and_lengths() {
        assert_eq!(check("valid_values", "[tcp, udp]", "udp", CoreType::String), Ok(true));
        assert_eq!(check("valid_values", "[tcp, udp]", "icmp", CoreType::String), Ok(false));
        assert_eq!(check("min_length", "2", "[a]", CoreType::List), Ok(false));
        assert_eq!(check("max_length", "3", "abc", CoreType::String), Ok(true));
        assert_eq!(check("length", "2", "{a: 1, b: 2}", CoreType::Map), Ok(true));
    }

    #[test]
    fn test_pattern_is_anchored() {
        assert_eq!(check("pattern", "'[a-z]+'", "abc", CoreType::String), Ok(true));
        assert_eq!(check("pattern", "'[a-z]+'", "abc1", CoreType::String), Ok(false));
        assert!(check("pattern", "'('", "abc", CoreType::String).is_err());
    }

    #[test]
    fn test_unknown_operator() {
        assert!(check("roughly", "1", "1", CoreType::Integer).is_err());
    }
}
