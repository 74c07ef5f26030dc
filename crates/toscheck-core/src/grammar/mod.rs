//! Structural validation of documents, selected by TOSCA version.
//!
//! A grammar checks the shape of a parsed document and records, for every
//! short-form notation it meets, the canonical form to patch in. Patches are
//! only applied to documents that validated cleanly, so that every later stage
//! reads one uniform shape.

use serde_yaml::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

mod simple;

pub use simple::SimpleProfileGrammar;

/// Key holding the version that selects the grammar.
pub const VERSION_KEY: &str = "tosca_definitions_version";

/// A document grammar for one or more TOSCA versions.
pub trait Grammar: Send + Sync {
    /// Human-readable grammar name.
    fn name(&self) -> &'static str;

    /// Values of `tosca_definitions_version` this grammar handles.
    fn versions(&self) -> &[&'static str];

    /// Validates a document, recording violations and canonical-form patches.
    fn validate(&self, document: &Value) -> Validation;
}

/// One step into a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => f.write_str(key),
            Segment::Index(index) => write!(f, "{}", index),
        }
    }
}

/// Renders a segment path the way diagnostics show it, e.g. `/node_types/A`.
pub fn render_path(path: &[Segment]) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    path.iter().map(|s| format!("/{}", s)).collect()
}

/// A structural violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

/// Replacement of the value at `path` with its canonical form.
#[derive(Debug, Clone, PartialEq)]
pub struct Canonical {
    pub path: Vec<Segment>,
    pub value: Value,
}

impl Canonical {
    /// Patches `document`. Returns false if the path no longer exists.
    pub fn apply(&self, document: &mut Value) -> bool {
        let mut node = document;
        for segment in &self.path {
            let next = match segment {
                Segment::Key(key) => node.get_mut(key.as_str()),
                Segment::Index(index) => node.get_mut(*index),
            };
            let Some(next) = next else {
                return false;
            };
            node = next;
        }
        *node = self.value.clone();
        true
    }
}

/// Outcome of validating one document.
#[derive(Debug, Clone, Default)]
pub struct Validation {
    pub violations: Vec<Violation>,
    pub canonicals: Vec<Canonical>,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Applies every recorded patch, in recording order.
    ///
    /// Patches of nested values are recorded before the patch of an enclosing
    /// value would be, so an enclosing rewrite always sees canonical children.
    pub fn apply(&self, document: &mut Value) -> usize {
        self.canonicals.iter().filter(|c| c.apply(document)).count()
    }
}

/// Grammars by version.
///
/// Documents with a missing or unknown version go to the fallback grammar,
/// which reports the version problem along with any other violation.
pub struct GrammarRegistry {
    grammars: HashMap<String, Arc<dyn Grammar>>,
    fallback: Arc<dyn Grammar>,
}

impl GrammarRegistry {
    /// Creates a registry with the built-in grammars.
    pub fn new() -> Self {
        let simple: Arc<dyn Grammar> = Arc::new(SimpleProfileGrammar::new());
        let mut registry = Self {
            grammars: HashMap::new(),
            fallback: Arc::clone(&simple),
        };
        registry.register(simple);
        registry
    }

    /// Registers a grammar for all of its versions.
    pub fn register(&mut self, grammar: Arc<dyn Grammar>) {
        for version in grammar.versions() {
            self.grammars.insert(version.to_string(), Arc::clone(&grammar));
        }
    }

    pub fn grammar_for(&self, version: &str) -> Option<Arc<dyn Grammar>> {
        self.grammars.get(version).cloned()
    }

    /// The grammar a document declares through its version.
    pub fn select(&self, document: &Value) -> Arc<dyn Grammar> {
        document
            .get(VERSION_KEY)
            .and_then(Value::as_str)
            .and_then(|version| self.grammar_for(version))
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }

    /// Supported versions, sorted.
    pub fn versions(&self) -> Vec<&str> {
        let mut versions: Vec<&str> = self.grammars.keys().map(String::as_str).collect();
        versions.sort_unstable();
        versions
    }
}

impl Default for GrammarRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GrammarRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrammarRegistry")
            .field("versions", &self.versions())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_versions() {
        let registry = GrammarRegistry::new();
        assert!(registry.grammar_for("tosca_simple_yaml_1_0").is_some());
        assert!(registry.grammar_for("tosca_simple_yaml_1_1").is_some());
        assert!(registry.grammar_for("tosca_simple_yaml_2_0").is_none());
        assert_eq!(registry.versions().len(), 4);
    }

    #[test]
    fn test_select_falls_back() {
        let registry = GrammarRegistry::new();
        let document: Value = serde_yaml::from_str("node_types: {}").unwrap();
        let validation = registry.select(&document).validate(&document);
        assert!(!validation.is_valid());
    }

    #[test]
    fn test_canonical_apply() {
        let mut doc: Value = serde_yaml::from_str("imports: [a.yaml, {b: b.yaml}]").unwrap();
        let canonical = Canonical {
            path: vec![Segment::Key("imports".into()), Segment::Index(0)],
            value: serde_yaml::from_str("{a.yaml: {file: a.yaml}}").unwrap(),
        };
        assert!(canonical.apply(&mut doc));
        assert_eq!(doc["imports"][0]["a.yaml"]["file"].as_str(), Some("a.yaml"));

        let stale = Canonical {
            path: vec![Segment::Key("node_types".into())],
            value: Value::Null,
        };
        assert!(!stale.apply(&mut doc));
    }

    #[test]
    fn test_render_path() {
        assert_eq!(render_path(&[]), "/");
        assert_eq!(
            render_path(&[Segment::Key("imports".into()), Segment::Index(2)]),
            "/imports/2"
        );
    }
}
