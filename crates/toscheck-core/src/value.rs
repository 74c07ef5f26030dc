//! Accessors over the untyped document model.
//!
//! Type and template definitions are plain `serde_yaml::Value` trees. All
//! key lookups go through these helpers so that shape mismatches degrade to
//! `None` instead of panics.

use serde_yaml::{Mapping, Sequence, Value};

/// Looks up a string field of a mapping value.
pub fn get_str<'v>(value: &'v Value, key: &str) -> Option<&'v str> {
    value.get(key).and_then(Value::as_str)
}

/// Looks up a mapping field of a mapping value.
pub fn get_map<'v>(value: &'v Value, key: &str) -> Option<&'v Mapping> {
    value.get(key).and_then(Value::as_mapping)
}

/// Looks up a sequence field of a mapping value.
pub fn get_seq<'v>(value: &'v Value, key: &str) -> Option<&'v Sequence> {
    value.get(key).and_then(Value::as_sequence)
}

/// Iterates the string-keyed entries of a mapping, in document order.
///
/// Entries with non-string keys are skipped.
pub fn entries(map: &Mapping) -> impl Iterator<Item = (&str, &Value)> {
    map.iter().filter_map(|(k, v)| k.as_str().map(|k| (k, v)))
}

/// Iterates the entries of `value` if it is a mapping; yields nothing otherwise.
pub fn map_entries(value: &Value) -> impl Iterator<Item = (&str, &Value)> {
    value.as_mapping().into_iter().flat_map(entries)
}

/// Iterates the entries of the mapping stored under `key`.
pub fn field_entries<'v>(value: &'v Value, key: &str) -> impl Iterator<Item = (&'v str, &'v Value)> {
    get_map(value, key).into_iter().flat_map(entries)
}

/// Returns the only entry of a single-entry mapping.
///
/// Requirements, policies and imports are written as sequences of these.
pub fn single_entry(value: &Value) -> Option<(&str, &Value)> {
    let map = value.as_mapping()?;
    if map.len() != 1 {
        return None;
    }
    entries(map).next()
}

/// Collects the string items of the sequence stored under `key`.
pub fn str_list<'v>(value: &'v Value, key: &str) -> Vec<&'v str> {
    get_seq(value, key)
        .map(|seq| seq.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// Returns true if `value` is null, an empty mapping or an empty sequence.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Mapping(m) => m.is_empty(),
        Value::Sequence(s) => s.is_empty(),
        _ => false,
    }
}

/// Builds a string key.
pub fn key(name: &str) -> Value {
    Value::String(name.to_string())
}

/// Builds a single-field mapping, the canonical form of most short-hand notations.
pub fn singleton(field: &str, value: Value) -> Value {
    let mut map = Mapping::new();
    map.insert(key(field), value);
    Value::Mapping(map)
}

/// Renders a value on one line for diagnostics.
pub fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Sequence(seq) => {
            let items: Vec<String> = seq.iter().map(describe).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Mapping(map) => {
            let items: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", describe(k), describe(v)))
                .collect();
            format!("{{{}}}", items.join(", "))
        }
        Value::Tagged(tagged) => format!("{} {}", tagged.tag, describe(&tagged.value)),
    }
}

/// Fills every field missing from `target` with the one from `source`.
///
/// Existing fields of `target` are never overwritten.
pub fn merge_absent(target: &mut Mapping, source: &Mapping) {
    for (k, v) in source {
        if !target.contains_key(k) {
            target.insert(k.clone(), v.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn test_field_access() {
        let v = yaml("type: integer\nconstraints: [a, b]\nproperties: {x: 1}");
        assert_eq!(get_str(&v, "type"), Some("integer"));
        assert_eq!(get_seq(&v, "constraints").map(|s| s.len()), Some(2));
        assert_eq!(get_map(&v, "properties").map(|m| m.len()), Some(1));
        assert_eq!(get_str(&v, "properties"), None);
        assert_eq!(get_str(&v, "missing"), None);
    }

    #[test]
    fn test_single_entry() {
        let v = yaml("host: {node: compute}");
        let (name, def) = single_entry(&v).unwrap();
        assert_eq!(name, "host");
        assert_eq!(get_str(def, "node"), Some("compute"));

        assert!(single_entry(&yaml("{a: 1, b: 2}")).is_none());
        assert!(single_entry(&yaml("[a]")).is_none());
    }

    #[test]
    fn test_describe() {
        let v = yaml("{a: [1, x], b: null}");
        assert_eq!(describe(&v), "{a: [1, x], b: null}");
    }

    #[test]
    fn test_merge_absent_keeps_existing() {
        let mut target = yaml("{type: string, default: a}").as_mapping().cloned().unwrap();
        let source = yaml("{type: integer, description: d}").as_mapping().cloned().unwrap();
        merge_absent(&mut target, &source);
        assert_eq!(target.get("type").and_then(Value::as_str), Some("string"));
        assert_eq!(target.get("description").and_then(Value::as_str), Some("d"));
        assert_eq!(target.get("default").and_then(Value::as_str), Some("a"));
    }
}
