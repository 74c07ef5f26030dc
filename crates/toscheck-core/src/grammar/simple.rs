//! Grammar of the TOSCA Simple Profile in YAML, versions 1.0 and 1.1.

use serde_yaml::Value;

use super::{render_path, Canonical, Grammar, Segment, Validation, Violation, VERSION_KEY};
use crate::data::constraints::OPERATORS;
use crate::data::UNBOUNDED;
use crate::value::{describe, entries, single_entry, singleton};

const VERSIONS: &[&str] = &[
    "tosca_simple_yaml_1_0",
    "tosca_simple_yaml_1_0_0",
    "tosca_simple_yaml_1_1",
    "tosca_simple_yaml_1_1_0",
];

const TOP_LEVEL_KEYS: &[&str] = &[
    VERSION_KEY,
    "namespace",
    "metadata",
    "description",
    "dsl_definitions",
    "repositories",
    "template_name",
    "template_author",
    "template_version",
];

const INTERFACE_TYPE_KEYS: &[&str] = &["derived_from", "version", "metadata", "description", "inputs"];

const INTERFACE_KEYS: &[&str] = &["type", "description", "inputs"];

/// Type definition checker, one per `*_types` section.
type TypeRule = fn(&mut Walker, &Value);

/// The Simple Profile grammar.
#[derive(Debug, Clone, Default)]
pub struct SimpleProfileGrammar;

impl SimpleProfileGrammar {
    pub fn new() -> Self {
        Self
    }
}

impl Grammar for SimpleProfileGrammar {
    fn name(&self) -> &'static str {
        "TOSCA Simple Profile in YAML"
    }

    fn versions(&self) -> &[&'static str] {
        VERSIONS
    }

    fn validate(&self, document: &Value) -> Validation {
        let mut walker = Walker::default();
        walker.document(document);
        walker.validation
    }
}

#[derive(Default)]
struct Walker {
    path: Vec<Segment>,
    validation: Validation,
}

impl Walker {
    fn within(&mut self, key: &str, f: impl FnOnce(&mut Self)) {
        self.path.push(Segment::Key(key.to_string()));
        f(self);
        self.path.pop();
    }

    fn within_index(&mut self, index: usize, f: impl FnOnce(&mut Self)) {
        self.path.push(Segment::Index(index));
        f(self);
        self.path.pop();
    }

    fn violation(&mut self, message: impl Into<String>) {
        self.validation.violations.push(Violation {
            path: render_path(&self.path),
            message: message.into(),
        });
    }

    fn canonical(&mut self, value: Value) {
        self.validation.canonicals.push(Canonical {
            path: self.path.clone(),
            value,
        });
    }

    fn document(&mut self, document: &Value) {
        let Some(map) = document.as_mapping() else {
            self.violation("Document is not a map");
            return;
        };

        match document.get(VERSION_KEY) {
            None => self.violation(format!("Missing {}", VERSION_KEY)),
            Some(version) if version.as_str().is_some_and(|v| VERSIONS.contains(&v)) => {}
            Some(version) => self.within(VERSION_KEY, |w| {
                w.violation(format!("Unsupported version {}", describe(version)))
            }),
        }

        for (key, value) in map {
            let Some(key) = key.as_str() else {
                self.violation("Entry names must be strings");
                continue;
            };
            self.within(key, |w| match key {
                "imports" => w.imports(value),
                "data_types" => w.types(value, Walker::data_type),
                "artifact_types" => w.types(value, Walker::type_common),
                "capability_types" => w.types(value, Walker::capability_type),
                "interface_types" => w.types(value, Walker::interface_type),
                "relationship_types" => w.types(value, Walker::relationship_type),
                "node_types" => w.types(value, Walker::node_type),
                "group_types" => w.types(value, Walker::group_type),
                "policy_types" => w.types(value, Walker::policy_type),
                "topology_template" => w.topology(value),
                known if TOP_LEVEL_KEYS.contains(&known) => {}
                unknown => w.violation(format!("Unknown entry '{}'", unknown)),
            });
        }
    }

    // ------------------------------------------------------------------
    // Imports
    // ------------------------------------------------------------------

    fn imports(&mut self, value: &Value) {
        let Some(items) = value.as_sequence() else {
            if !value.is_null() {
                self.violation("Expected a list of imports");
            }
            return;
        };
        for (index, item) in items.iter().enumerate() {
            self.within_index(index, |w| w.import(item));
        }
    }

    fn import(&mut self, item: &Value) {
        match item {
            Value::String(file) => self.canonical(singleton(file, singleton("file", item.clone()))),
            Value::Mapping(map) if map.contains_key("file") => match item.get("file").and_then(Value::as_str) {
                Some(file) => self.canonical(singleton(file, item.clone())),
                None => self.violation("Import file must be a string"),
            },
            Value::Mapping(_) => match single_entry(item) {
                Some((name, file)) if file.is_string() => {
                    self.canonical(singleton(name, singleton("file", file.clone())))
                }
                Some((name, def)) => {
                    if def.get("file").and_then(Value::as_str).is_none() {
                        self.within(name, |w| w.violation("Missing import file"));
                    }
                }
                None => self.violation("Expected a single-entry map"),
            },
            _ => self.violation("Invalid import"),
        }
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    fn types(&mut self, section: &Value, rule: TypeRule) {
        let Some(map) = section.as_mapping() else {
            if !section.is_null() {
                self.violation("Expected a map of type definitions");
            }
            return;
        };
        for (name, def) in entries(map) {
            self.within(name, |w| {
                if def.is_null() {
                    return;
                }
                if !def.is_mapping() {
                    w.violation("Type definition must be a map");
                    return;
                }
                rule(w, def);
            });
        }
    }

    fn type_common(&mut self, def: &Value) {
        if def.get("derived_from").is_some_and(|d| !d.is_string()) {
            self.within("derived_from", |w| w.violation("Expected a type name"));
        }
    }

    fn data_type(&mut self, def: &Value) {
        self.type_common(def);
        self.field(def, "properties", Walker::property_definitions);
        self.field(def, "constraints", Walker::constraints);
        self.field(def, "entry_schema", Walker::entry_schema);
    }

    fn capability_type(&mut self, def: &Value) {
        self.type_common(def);
        self.field(def, "properties", Walker::property_definitions);
        self.field(def, "attributes", Walker::property_definitions);
        self.field(def, "valid_source_types", Walker::name_list);
    }

    fn interface_type(&mut self, def: &Value) {
        self.type_common(def);
        self.field(def, "inputs", Walker::property_definitions);
        self.operations(def, INTERFACE_TYPE_KEYS);
    }

    fn relationship_type(&mut self, def: &Value) {
        self.type_common(def);
        self.field(def, "properties", Walker::property_definitions);
        self.field(def, "attributes", Walker::property_definitions);
        self.field(def, "interfaces", Walker::interfaces);
        self.field(def, "valid_target_types", Walker::name_list);
    }

    fn node_type(&mut self, def: &Value) {
        self.type_common(def);
        self.field(def, "properties", Walker::property_definitions);
        self.field(def, "attributes", Walker::property_definitions);
        self.field(def, "requirements", Walker::requirement_definitions);
        self.field(def, "capabilities", Walker::capability_definitions);
        self.field(def, "interfaces", Walker::interfaces);
        self.field(def, "artifacts", Walker::artifacts);
    }

    fn group_type(&mut self, def: &Value) {
        self.type_common(def);
        self.field(def, "properties", Walker::property_definitions);
        self.field(def, "targets", Walker::name_list);
        self.field(def, "members", Walker::name_list);
        self.field(def, "interfaces", Walker::interfaces);
    }

    fn policy_type(&mut self, def: &Value) {
        self.type_common(def);
        self.field(def, "properties", Walker::property_definitions);
        self.field(def, "targets", Walker::name_list);
    }

    /// Runs `rule` on `def[key]` when present.
    fn field(&mut self, def: &Value, key: &str, rule: fn(&mut Walker, &Value)) {
        if let Some(value) = def.get(key) {
            self.within(key, |w| rule(w, value));
        }
    }

    fn name_list(&mut self, value: &Value) {
        let is_names = value
            .as_sequence()
            .is_some_and(|items| items.iter().all(Value::is_string));
        if !is_names {
            self.violation("Expected a list of type names");
        }
    }

    fn property_definitions(&mut self, value: &Value) {
        let Some(map) = value.as_mapping() else {
            if !value.is_null() {
                self.violation("Expected a map of definitions");
            }
            return;
        };
        for (name, def) in entries(map) {
            self.within(name, |w| w.property_definition(def));
        }
    }

    fn property_definition(&mut self, def: &Value) {
        if def.is_null() {
            return;
        }
        if !def.is_mapping() {
            self.violation("Expected a property definition");
            return;
        }
        if def.get("type").is_some_and(|t| !t.is_string()) {
            self.within("type", |w| w.violation("Expected a type name"));
        }
        if def.get("required").is_some_and(|r| !r.is_bool()) {
            self.within("required", |w| w.violation("Expected a boolean"));
        }
        self.field(def, "constraints", Walker::constraints);
        self.field(def, "entry_schema", Walker::entry_schema);
    }

    fn constraints(&mut self, value: &Value) {
        let Some(items) = value.as_sequence() else {
            self.violation("Expected a list of constraints");
            return;
        };
        for (index, item) in items.iter().enumerate() {
            self.within_index(index, |w| match single_entry(item) {
                Some((operator, _)) if OPERATORS.contains(&operator) => {}
                Some((operator, _)) => w.violation(format!("Unknown constraint operator '{}'", operator)),
                None => w.violation("Expected a single-entry map"),
            });
        }
    }

    fn entry_schema(&mut self, value: &Value) {
        match value {
            Value::String(_) => self.canonical(singleton("type", value.clone())),
            Value::Mapping(_) => {
                if value.get("type").is_some_and(|t| !t.is_string()) {
                    self.within("type", |w| w.violation("Expected a type name"));
                }
                self.field(value, "constraints", Walker::constraints);
            }
            _ => self.violation("Expected an entry schema"),
        }
    }

    fn occurrences(&mut self, value: &Value) {
        let valid = match value.as_sequence().map(Vec::as_slice) {
            Some([lower, upper]) => match (lower.as_u64(), upper) {
                (Some(_), Value::String(s)) => s == UNBOUNDED,
                (Some(lower), upper) => upper.as_u64().is_some_and(|upper| lower <= upper),
                (None, _) => false,
            },
            _ => false,
        };
        if !valid {
            self.violation("Invalid occurrences range, expecting [lower, upper] with lower <= upper");
        }
    }

    fn capability_definitions(&mut self, value: &Value) {
        let Some(map) = value.as_mapping() else {
            self.violation("Expected a map of capability definitions");
            return;
        };
        for (name, def) in entries(map) {
            self.within(name, |w| match def {
                Value::String(_) => w.canonical(singleton("type", def.clone())),
                Value::Mapping(_) => {
                    w.field(def, "occurrences", Walker::occurrences);
                    w.field(def, "valid_source_types", Walker::name_list);
                    w.field(def, "properties", Walker::property_definitions);
                    w.field(def, "attributes", Walker::property_definitions);
                }
                Value::Null => {}
                _ => w.violation("Expected a capability definition"),
            });
        }
    }

    fn requirement_definitions(&mut self, value: &Value) {
        let Some(items) = value.as_sequence() else {
            self.violation("Expected a list of requirement definitions");
            return;
        };
        for (index, item) in items.iter().enumerate() {
            self.within_index(index, |w| {
                let Some((name, def)) = single_entry(item) else {
                    w.violation("Expected a single-entry map");
                    return;
                };
                w.within(name, |w| match def {
                    Value::String(_) => w.canonical(singleton("capability", def.clone())),
                    Value::Mapping(_) => {
                        w.field(def, "occurrences", Walker::occurrences);
                        w.field(def, "relationship", Walker::relationship);
                        if def.get("capability").is_some_and(|c| !c.is_string()) {
                            w.within("capability", |w| w.violation("Expected a type name"));
                        }
                    }
                    Value::Null => {}
                    _ => w.violation("Expected a requirement definition"),
                });
            });
        }
    }

    fn relationship(&mut self, value: &Value) {
        match value {
            Value::String(_) => self.canonical(singleton("type", value.clone())),
            Value::Mapping(_) => {
                if value.get("type").is_some_and(|t| !t.is_string()) {
                    self.within("type", |w| w.violation("Expected a type name"));
                }
                self.field(value, "interfaces", Walker::interfaces);
            }
            _ => self.violation("Expected a relationship type or definition"),
        }
    }

    fn interfaces(&mut self, value: &Value) {
        let Some(map) = value.as_mapping() else {
            self.violation("Expected a map of interfaces");
            return;
        };
        for (name, def) in entries(map) {
            self.within(name, |w| {
                if def.is_null() {
                    return;
                }
                if !def.is_mapping() {
                    w.violation("Expected an interface definition");
                    return;
                }
                w.operations(def, INTERFACE_KEYS);
            });
        }
    }

    /// Entries of an interface other than `reserved` are operations.
    fn operations(&mut self, def: &Value, reserved: &[&str]) {
        for (name, operation) in def.as_mapping().into_iter().flat_map(entries) {
            if reserved.contains(&name) {
                continue;
            }
            self.within(name, |w| match operation {
                Value::String(_) => w.canonical(singleton("implementation", operation.clone())),
                Value::Mapping(_) | Value::Null => {}
                _ => w.violation("Expected an operation definition"),
            });
        }
    }

    fn artifacts(&mut self, value: &Value) {
        let Some(map) = value.as_mapping() else {
            self.violation("Expected a map of artifacts");
            return;
        };
        for (name, def) in entries(map) {
            self.within(name, |w| match def {
                Value::String(_) => w.canonical(singleton("file", def.clone())),
                Value::Mapping(_) => {}
                _ => w.violation("Expected an artifact definition"),
            });
        }
    }

    // ------------------------------------------------------------------
    // Topology
    // ------------------------------------------------------------------

    fn topology(&mut self, value: &Value) {
        let Some(map) = value.as_mapping() else {
            if !value.is_null() {
                self.violation("Expected a topology template");
            }
            return;
        };
        for (key, section) in entries(map) {
            self.within(key, |w| match key {
                "description" => {}
                "inputs" => w.property_definitions(section),
                "node_templates" => w.templates(section, Walker::node_template),
                "relationship_templates" => w.templates(section, Walker::relationship_template),
                "groups" => w.templates(section, Walker::group_template),
                "policies" => w.policies(section),
                "outputs" | "substitution_mappings" | "workflows" => w.map_or_null(section),
                unknown => w.violation(format!("Unknown entry '{}'", unknown)),
            });
        }
    }

    fn map_or_null(&mut self, value: &Value) {
        if !value.is_mapping() && !value.is_null() {
            self.violation("Expected a map");
        }
    }

    fn templates(&mut self, section: &Value, rule: TypeRule) {
        let Some(map) = section.as_mapping() else {
            if !section.is_null() {
                self.violation("Expected a map of templates");
            }
            return;
        };
        for (name, def) in entries(map) {
            self.within(name, |w| match def {
                Value::Mapping(_) => rule(w, def),
                Value::Null => {}
                _ => w.violation("Template must be a map"),
            });
        }
    }

    fn node_template(&mut self, def: &Value) {
        self.field(def, "requirements", Walker::requirement_assignments);
        self.field(def, "capabilities", Walker::capability_assignments);
        self.field(def, "interfaces", Walker::interfaces);
        self.field(def, "artifacts", Walker::artifacts);
    }

    fn relationship_template(&mut self, def: &Value) {
        self.field(def, "interfaces", Walker::interfaces);
    }

    fn group_template(&mut self, def: &Value) {
        self.field(def, "members", Walker::name_list);
        self.field(def, "targets", Walker::name_list);
        self.field(def, "interfaces", Walker::interfaces);
    }

    fn requirement_assignments(&mut self, value: &Value) {
        let Some(items) = value.as_sequence() else {
            self.violation("Expected a list of requirement assignments");
            return;
        };
        for (index, item) in items.iter().enumerate() {
            self.within_index(index, |w| {
                let Some((name, assignment)) = single_entry(item) else {
                    w.violation("Expected a single-entry map");
                    return;
                };
                w.within(name, |w| match assignment {
                    Value::String(_) => w.canonical(singleton("node", assignment.clone())),
                    Value::Mapping(_) => {
                        w.field(assignment, "relationship", Walker::relationship);
                        w.field(assignment, "occurrences", Walker::occurrences);
                    }
                    _ => w.violation("Expected a requirement assignment"),
                });
            });
        }
    }

    fn capability_assignments(&mut self, value: &Value) {
        let Some(map) = value.as_mapping() else {
            self.violation("Expected a map of capability assignments");
            return;
        };
        for (name, assignment) in entries(map) {
            if !assignment.is_mapping() && !assignment.is_null() {
                self.within(name, |w| w.violation("Expected a capability assignment"));
            }
        }
    }

    fn policies(&mut self, value: &Value) {
        let Some(items) = value.as_sequence() else {
            if !value.is_null() {
                self.violation("Expected a list of policies");
            }
            return;
        };
        for (index, item) in items.iter().enumerate() {
            self.within_index(index, |w| match single_entry(item) {
                Some((_, Value::Mapping(_))) | Some((_, Value::Null)) => {}
                Some((name, _)) => w.within(name, |w| w.violation("Policy must be a map")),
                None => w.violation("Expected a single-entry map"),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(text: &str) -> (Value, Validation) {
        let mut doc: Value = serde_yaml::from_str(text).unwrap();
        let validation = SimpleProfileGrammar::new().validate(&doc);
        if validation.is_valid() {
            validation.apply(&mut doc);
        }
        (doc, validation)
    }

    fn messages(validation: &Validation) -> Vec<String> {
        validation
            .violations
            .iter()
            .map(|v| format!("{}: {}", v.path, v.message))
            .collect()
    }

    #[test]
    fn test_missing_and_unknown_version() {
        let (_, validation) = validate("node_types: {}");
        assert_eq!(messages(&validation), vec!["/: Missing tosca_definitions_version"]);

        let (_, validation) = validate("tosca_definitions_version: tosca_simple_yaml_9");
        assert_eq!(validation.violations.len(), 1);
        assert_eq!(validation.violations[0].path, "/tosca_definitions_version");
    }

    #[test]
    fn test_unknown_entries() {
        let (_, validation) = validate(
            "tosca_definitions_version: tosca_simple_yaml_1_1\nnode_type: {}\ntopology_template: {nodes: {}}",
        );
        assert_eq!(
            messages(&validation),
            vec![
                "/node_type: Unknown entry 'node_type'",
                "/topology_template/nodes: Unknown entry 'nodes'",
            ]
        );
    }

    #[test]
    fn test_short_forms_are_canonicalized() {
        let (doc, validation) = validate(
            r#"
tosca_definitions_version: tosca_simple_yaml_1_0
imports:
  - common.yaml
  - extra: extra.yaml
node_types:
  Server:
    properties:
      tags: {type: list, entry_schema: string}
    capabilities:
      host: tosca.capabilities.Container
    requirements:
      - storage: tosca.capabilities.Attachment
      - host:
          capability: tosca.capabilities.Container
          relationship: tosca.relationships.HostedOn
    interfaces:
      Standard:
        create: scripts/create.sh
    artifacts:
      image: images/server.qcow2
topology_template:
  node_templates:
    web:
      type: Server
      requirements:
        - storage: disk
        - host:
            node: server
            relationship: tosca.relationships.HostedOn
"#,
        );
        assert!(validation.is_valid(), "{:?}", messages(&validation));
        assert_eq!(doc["imports"][0]["common.yaml"]["file"].as_str(), Some("common.yaml"));
        assert_eq!(doc["imports"][1]["extra"]["file"].as_str(), Some("extra.yaml"));

        let server = &doc["node_types"]["Server"];
        assert_eq!(server["properties"]["tags"]["entry_schema"]["type"].as_str(), Some("string"));
        assert_eq!(server["capabilities"]["host"]["type"].as_str(), Some("tosca.capabilities.Container"));
        assert_eq!(
            server["requirements"][0]["storage"]["capability"].as_str(),
            Some("tosca.capabilities.Attachment")
        );
        assert_eq!(
            server["interfaces"]["Standard"]["create"]["implementation"].as_str(),
            Some("scripts/create.sh")
        );
        assert_eq!(server["artifacts"]["image"]["file"].as_str(), Some("images/server.qcow2"));
        assert_eq!(
            server["requirements"][1]["host"]["relationship"]["type"].as_str(),
            Some("tosca.relationships.HostedOn")
        );

        let web = &doc["topology_template"]["node_templates"]["web"];
        assert_eq!(web["requirements"][0]["storage"]["node"].as_str(), Some("disk"));
        assert_eq!(
            web["requirements"][1]["host"]["relationship"]["type"].as_str(),
            Some("tosca.relationships.HostedOn")
        );
    }

    #[test]
    fn test_occurrences_and_shapes() {
        let (_, validation) = validate(
            r#"
tosca_definitions_version: tosca_simple_yaml_1_1
node_types:
  A:
    requirements:
      - ok: {capability: C, occurrences: [0, UNBOUNDED]}
      - bad: {capability: C, occurrences: [2, 1]}
      - {one: C, two: D}
topology_template:
  policies:
    p: {type: P}
"#,
        );
        assert_eq!(
            messages(&validation),
            vec![
                "/node_types/A/requirements/1/bad/occurrences: Invalid occurrences range, expecting [lower, upper] with lower <= upper",
                "/node_types/A/requirements/2: Expected a single-entry map",
                "/topology_template/policies: Expected a list of policies",
            ]
        );
    }

    #[test]
    fn test_unknown_constraint_operator() {
        let (_, validation) = validate(
            r#"
tosca_definitions_version: tosca_simple_yaml_1_1
data_types:
  Port:
    derived_from: integer
    constraints:
      - in_range: [1, 65535]
      - roughly: 80
"#,
        );
        assert_eq!(
            messages(&validation),
            vec!["/data_types/Port/constraints/1: Unknown constraint operator 'roughly'"]
        );
    }
}
