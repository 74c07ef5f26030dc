use serde_yaml::Value;
use std::collections::HashMap;

/// Name-keyed definitions kept in insertion order.
///
/// Hierarchy traversal depends on the order in which types were registered,
/// so lookups by name are backed by a position index.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<(String, Value)>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Adds a definition; returns false and leaves the registry untouched if
    /// the name is already present.
    pub fn insert(&mut self, name: &str, definition: Value) -> bool {
        if self.index.contains_key(name) {
            return false;
        }
        self.index.insert(name.to_string(), self.entries.len());
        self.entries.push((name.to_string(), definition));
        true
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.index.get(name).map(|&i| &self.entries[i].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Registration position of `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn get_index(&self, i: usize) -> Option<(&str, &Value)> {
        self.entries.get(i).map(|(n, d)| (n.as_str(), d))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, d)| (n.as_str(), d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_first() {
        let mut registry = Registry::default();
        assert!(registry.insert("a", Value::from(1)));
        assert!(registry.insert("b", Value::from(2)));
        assert!(!registry.insert("a", Value::from(3)));

        assert_eq!(registry.get("a"), Some(&Value::from(1)));
        assert_eq!(registry.position("b"), Some(1));
        assert_eq!(registry.len(), 2);
        let names: Vec<&str> = registry.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
