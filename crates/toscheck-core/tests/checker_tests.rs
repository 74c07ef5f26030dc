use std::fs;
use tempfile::TempDir;
use toscheck_core::{Catalog, Checker, CheckerConfig, CheckerError, Construct, Location, TargetId, TargetState};

fn checker() -> Checker {
    let config = CheckerConfig {
        use_commons: false,
        ..CheckerConfig::default()
    };
    Checker::with_config(&config).unwrap()
}

fn check(checker: &mut Checker, source: &str) -> (Catalog, TargetId) {
    let mut catalog = checker.new_catalog();
    let id = checker.check_source("service.yaml", source, &mut catalog).unwrap();
    (catalog, id)
}

fn messages(catalog: &Catalog, id: TargetId) -> Vec<String> {
    catalog.target(id).report().iter().map(|e| e.message.clone()).collect()
}

const DERIVED: &str = r#"
tosca_definitions_version: tosca_simple_yaml_1_0
node_types:
  A: {}
  B:
    derived_from: A
topology_template:
  node_templates:
    x:
      type: B
"#;

#[test]
fn test_derived_type_checks_clean() {
    let (catalog, id) = check(&mut checker(), DERIVED);
    assert!(messages(&catalog, id).is_empty(), "{}", catalog.target(id).report());
    assert_eq!(catalog.target(id).state(), TargetState::Checked);
    assert!(catalog.is_derived_from(Construct::Node, "B", "A"));
    assert!(catalog.has_template(id, Construct::Node, "x"));
}

#[test]
fn test_undeclared_supertype_reported_once() {
    let source = DERIVED.replace("derived_from: A", "derived_from: Z");
    let (catalog, id) = check(&mut checker(), &source);
    assert_eq!(
        messages(&catalog, id),
        vec!["Node type B indicates a supertype that has not (yet) been declared: Z"]
    );
    assert_eq!(catalog.target(id).report().errors()[0].path, "/node_types/B");
}

#[test]
fn test_unknown_capability_property() {
    let source = r#"
tosca_definitions_version: tosca_simple_yaml_1_0
capability_types:
  Port:
    properties:
      num:
        type: integer
        default: 80
node_types:
  Server:
    capabilities:
      endpoint: Port
topology_template:
  node_templates:
    web:
      type: Server
      capabilities:
        endpoint:
          properties:
            bogus: 1
"#;
    let (catalog, id) = check(&mut checker(), source);
    let found = messages(&catalog, id);
    assert_eq!(found.len(), 1, "{:?}", found);
    assert!(found[0].contains("Unknown capability property 'bogus'"));
}

const SOURCES: &str = r#"
tosca_definitions_version: tosca_simple_yaml_1_0
capability_types:
  Feature:
    valid_source_types: [Client]
  Open: {}
node_types:
  Client: {}
  Provider:
    capabilities:
      feature: Feature
      open: Open
  Intruder:
    requirements:
      - uses:
          capability: Feature
          node: Provider
"#;

#[test]
fn test_valid_source_types_mismatch() {
    let (catalog, id) = check(&mut checker(), SOURCES);
    let found = messages(&catalog, id);
    assert_eq!(found.len(), 1, "{:?}", found);
    assert!(found[0].contains("Intruder"));
    assert!(found[0].contains("Feature"));
    assert_eq!(
        catalog.target(id).report().errors()[0].path,
        "/node_types/Intruder/requirements/uses"
    );
}

#[test]
fn test_unrestricted_capability_is_permissive() {
    let source = SOURCES.replace("capability: Feature", "capability: Open");
    let (catalog, id) = check(&mut checker(), &source);
    assert!(messages(&catalog, id).is_empty(), "{}", catalog.target(id).report());
}

const TARGETS: &str = r#"
tosca_definitions_version: tosca_simple_yaml_1_0
capability_types:
  Container: {}
  Endpoint: {}
relationship_types:
  HostedOn:
    valid_target_types: [Container]
node_types:
  Host:
    capabilities:
      host: Container
      endpoint: Endpoint
  App:
    requirements:
      - host:
          capability: CAPABILITY
          node: Host
          relationship: RELATIONSHIP
"#;

fn hosted(capability: &str, relationship: &str) -> Vec<String> {
    let source = TARGETS
        .replace("CAPABILITY", capability)
        .replace("RELATIONSHIP", relationship);
    let (catalog, id) = check(&mut checker(), &source);
    let report = catalog.target(id).report();
    assert!(report.iter().all(|e| e.path == "/node_types/App/requirements/host"), "{}", report);
    messages(&catalog, id)
}

#[test]
fn test_valid_target_types_in_both_relationship_forms() {
    for relationship in ["{type: HostedOn}", "HostedOn"] {
        assert!(hosted("Container", relationship).is_empty(), "{}", relationship);

        let found = hosted("Endpoint", relationship);
        assert_eq!(found.len(), 1, "{}: {:?}", relationship, found);
        assert!(found[0].starts_with("Capability type Endpoint not compatible with any of the valid_target_types"));
        assert!(found[0].ends_with("relationship type HostedOn"));
    }
}

#[test]
fn test_unknown_relationship_type_in_both_forms() {
    for relationship in ["{type: Nope}", "Nope"] {
        assert_eq!(
            hosted("Endpoint", relationship),
            vec!["Reference to Relationship type 'Nope' points to unknown type"],
            "{}",
            relationship
        );
    }
}

#[test]
fn test_redefinition_needs_a_type() {
    let source = r#"
tosca_definitions_version: tosca_simple_yaml_1_0
node_types:
  A:
    properties:
      p:
        type: string
        default: a
  B:
    derived_from: A
    properties:
      p:
        default: b
"#;
    let (catalog, id) = check(&mut checker(), source);
    let found: Vec<(&str, &str)> = catalog
        .target(id)
        .report()
        .iter()
        .map(|e| (e.path.as_str(), e.message.as_str()))
        .collect();
    assert_eq!(found, vec![("/node_types/B/properties/p", "Missing type specification")]);
}

#[test]
fn test_template_errors() {
    let source = r#"
tosca_definitions_version: tosca_simple_yaml_1_1
node_types:
  Db:
    properties:
      port:
        type: integer
      name:
        type: string
topology_template:
  inputs:
    db_port:
      type: integer
  node_templates:
    db:
      type: Db
      properties:
        port: { get_input: db_port }
        name: orders
    cache:
      type: Db
      properties:
        port: fast
        name: { get_input: cache_name }
    queue:
      type: Queue
"#;
    let (catalog, id) = check(&mut checker(), source);
    assert_eq!(
        messages(&catalog, id),
        vec![
            "Value fast is not a valid integer",
            "get_input: no input named 'cache_name' was declared",
            "Unknown Node type: Queue",
        ]
    );
}

#[test]
fn test_grammar_failure_stops_pipeline() {
    let (catalog, id) = check(&mut checker(), "node_types:\n  A: {}\n");
    assert_eq!(catalog.target(id).state(), TargetState::Failed);
    assert!(catalog.target(id).report().has_errors());
    assert!(!catalog.has_type(Construct::Node, "A"));

    let (catalog, id) = check(&mut checker(), "node_types: [unclosed");
    assert_eq!(catalog.target(id).state(), TargetState::Failed);
    assert_eq!(messages(&catalog, id), vec!["Failed to parse document"]);
}

#[test]
fn test_multi_document_stream() {
    let source = r#"
tosca_definitions_version: tosca_simple_yaml_1_0
node_types:
  Base: {}
---
tosca_definitions_version: tosca_simple_yaml_1_0
node_types:
  Derived:
    derived_from: Base
"#;
    let (catalog, id) = check(&mut checker(), source);
    assert_eq!(catalog.imports_of(id).count(), 2);
    let documents: Vec<_> = catalog.targets().filter(|(part, _)| *part != id).collect();
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[1].1.location().fragment(), Some("1"));
    assert!(documents.iter().all(|(_, t)| t.state() == TargetState::Checked && !t.report().has_errors()));
    assert_eq!(catalog.target(id).state(), TargetState::Parsed);
}

fn write(dir: &TempDir, name: &str, content: &str) {
    fs::write(dir.path().join(name), content).unwrap();
}

#[test]
fn test_imports_are_cataloged_and_checked() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "types.yaml",
        "tosca_definitions_version: tosca_simple_yaml_1_0\nnode_types:\n  Server: {}\n  Broken:\n    properties:\n      p:\n        type: Unknown\n",
    );
    write(
        &dir,
        "service.yaml",
        "tosca_definitions_version: tosca_simple_yaml_1_0\nimports:\n  - types.yaml\ntopology_template:\n  node_templates:\n    web:\n      type: Server\n",
    );

    let mut checker = checker();
    let catalog = checker.check_path(&dir.path().join("service.yaml")).unwrap();
    let service = catalog
        .find_target(&Location::from_path(&dir.path().join("service.yaml")))
        .unwrap();
    let types = catalog
        .find_target(&Location::from_path(&dir.path().join("types.yaml")))
        .unwrap();

    assert!(!catalog.target(service).report().has_errors(), "{}", catalog.target(service).report());
    assert_eq!(catalog.target(types).state(), TargetState::Checked);
    assert_eq!(messages(&catalog, types), vec!["Unknown Data type: Unknown"]);
    assert_eq!(catalog.sorted_targets().unwrap(), vec![types, service]);
    assert!(catalog.import_string(types).contains("service.yaml"));
}

#[test]
fn test_unresolved_import() {
    let source = "tosca_definitions_version: tosca_simple_yaml_1_0\nimports:\n  - missing: nowhere/types.yaml\n";
    let (catalog, id) = check(&mut checker(), source);
    assert_eq!(
        messages(&catalog, id),
        vec!["Failure to resolve import 'nowhere/types.yaml'"]
    );
    assert_eq!(catalog.target(id).report().errors()[0].path, "/imports/0/missing");
}

#[test]
fn test_relative_import_prefers_importer_directory() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let service = "tosca_definitions_version: tosca_simple_yaml_1_0\nimports:\n  - types.yaml\n";
    write(&first, "service.yaml", service);
    write(&first, "types.yaml", "tosca_definitions_version: tosca_simple_yaml_1_0\nnode_types:\n  First: {}\n");
    write(&second, "service.yaml", service);
    write(&second, "types.yaml", "tosca_definitions_version: tosca_simple_yaml_1_0\nnode_types:\n  Second: {}\n");

    let mut checker = checker();
    let catalog = checker.check_path(&first.path().join("service.yaml")).unwrap();
    assert!(catalog.has_type(Construct::Node, "First"));

    // the first directory is still a search path
    let catalog = checker.check_path(&second.path().join("service.yaml")).unwrap();
    assert!(catalog.has_type(Construct::Node, "Second"));
    assert!(!catalog.has_type(Construct::Node, "First"));
}

#[test]
fn test_import_cycle_terminates() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "a.yaml",
        "tosca_definitions_version: tosca_simple_yaml_1_0\nimports:\n  - b.yaml\nnode_types:\n  A: {}\n",
    );
    write(
        &dir,
        "b.yaml",
        "tosca_definitions_version: tosca_simple_yaml_1_0\nimports:\n  - a.yaml\nnode_types:\n  B: {}\n",
    );

    let mut checker = checker();
    let catalog = checker.check_path(&dir.path().join("a.yaml")).unwrap();
    assert_eq!(catalog.targets().count(), 2);
    assert!(catalog.targets().all(|(_, t)| t.state() == TargetState::Checked));

    let b = catalog.find_target(&Location::from_path(&dir.path().join("b.yaml"))).unwrap();
    let found = messages(&catalog, b);
    assert_eq!(found.len(), 1);
    assert!(found[0].starts_with("Cyclic import between"));
    assert!(catalog.sorted_targets().is_err());
}

#[test]
fn test_directory_checks_every_yaml_file() {
    // hidden directories are skipped by the walk
    let dir = tempfile::Builder::new().prefix("toscheck").tempdir().unwrap();
    write(&dir, "one.yaml", "tosca_definitions_version: tosca_simple_yaml_1_0\nnode_types:\n  One: {}\n");
    write(&dir, "two.yml", "tosca_definitions_version: tosca_simple_yaml_1_0\nnode_types:\n  Two: {}\n");
    write(&dir, "notes.txt", "not a template");

    let catalog = checker().check_path(dir.path()).unwrap();
    assert_eq!(catalog.targets().count(), 2);
    assert!(catalog.has_type(Construct::Node, "One"));
    assert!(catalog.has_type(Construct::Node, "Two"));

    let missing = checker().check_path(&dir.path().join("absent.yaml"));
    assert!(matches!(missing, Err(CheckerError::TargetNotFound(_))));
}

#[test]
fn test_common_types_load_clean() {
    let mut checker = Checker::new().unwrap();
    assert!(checker.base_catalog().has_type(Construct::Node, "tosca.nodes.Compute"));
    assert!(checker.base_catalog().has_type(Construct::Data, "scalar-unit.size"));

    let source = r#"
tosca_definitions_version: tosca_simple_yaml_1_0
topology_template:
  node_templates:
    server:
      type: tosca.nodes.Compute
    app:
      type: tosca.nodes.SoftwareComponent
      requirements:
        - host: server
"#;
    let (catalog, id) = check(&mut checker, source);
    assert!(messages(&catalog, id).is_empty(), "{}", catalog.target(id).report());
    assert!(catalog.is_derived_from(Construct::Node, "tosca.nodes.WebServer", "tosca.nodes.Root"));
}

#[test]
fn test_missing_commons_is_fatal() {
    let config = CheckerConfig {
        commons: vec!["tosca/no-such-types.yaml".to_string()],
        ..CheckerConfig::default()
    };
    assert!(matches!(Checker::with_config(&config), Err(CheckerError::Commons(_))));
}
