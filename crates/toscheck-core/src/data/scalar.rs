//! Scalar-unit values such as `512 MB`, `10 s` or `2.4 GHz`.

use regex::Regex;
use serde_yaml::Value;
use std::sync::OnceLock;

const SCALAR_PATTERN: &str = r"^\s*([+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?)\s*([A-Za-z]+)\s*$";

/// Unit family of a scalar-unit type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Size,
    Time,
    Frequency,
}

impl ScalarKind {
    /// Multiplier bringing a unit to the family's base unit (bytes, seconds, hertz).
    fn factor(self, unit: &str) -> Option<f64> {
        let unit = unit.to_ascii_lowercase();
        let factor = match self {
            ScalarKind::Size => match unit.as_str() {
                "b" => 1.0,
                "kb" => 1e3,
                "kib" => 1024.0,
                "mb" => 1e6,
                "mib" => 1024.0 * 1024.0,
                "gb" => 1e9,
                "gib" => 1024.0 * 1024.0 * 1024.0,
                "tb" => 1e12,
                "tib" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
                _ => return None,
            },
            ScalarKind::Time => match unit.as_str() {
                "d" => 86_400.0,
                "h" => 3_600.0,
                "m" => 60.0,
                "s" => 1.0,
                "ms" => 1e-3,
                "us" => 1e-6,
                "ns" => 1e-9,
                _ => return None,
            },
            ScalarKind::Frequency => match unit.as_str() {
                "hz" => 1.0,
                "khz" => 1e3,
                "mhz" => 1e6,
                "ghz" => 1e9,
                _ => return None,
            },
        };
        Some(factor)
    }
}

fn scalar_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(SCALAR_PATTERN).ok()).as_ref()
}

/// Parses a scalar-unit string and normalizes it to the base unit.
pub fn parse(kind: ScalarKind, value: &Value) -> Option<f64> {
    let text = value.as_str()?;
    let captures = scalar_pattern()?.captures(text)?;
    let number: f64 = captures.get(1)?.as_str().parse().ok()?;
    let factor = kind.factor(captures.get(2)?.as_str())?;
    Some(number * factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> Value {
        Value::String(text.to_string())
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse(ScalarKind::Size, &s("1 kB")), Some(1000.0));
        assert_eq!(parse(ScalarKind::Size, &s("2 KiB")), Some(2048.0));
        assert_eq!(parse(ScalarKind::Size, &s("0.5GB")), Some(5e8));
        assert_eq!(parse(ScalarKind::Size, &s("10 parsecs")), None);
        assert_eq!(parse(ScalarKind::Size, &Value::from(10)), None);
    }

    #[test]
    fn test_parse_time_and_frequency() {
        assert_eq!(parse(ScalarKind::Time, &s("2 m")), Some(120.0));
        let ms = parse(ScalarKind::Time, &s("5 ms")).unwrap();
        assert!((ms - 5e-3).abs() < 1e-12);
        let ghz = parse(ScalarKind::Frequency, &s("2.4 GHz")).unwrap();
        assert!((ghz - 2.4e9).abs() < 1.0);
        assert_eq!(parse(ScalarKind::Frequency, &s("2.4 GB")), None);
    }
}
