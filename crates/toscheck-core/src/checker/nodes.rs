//! Node types and node templates.

use serde_yaml::Value;

use super::common::{check_definition, check_entries, check_type, hierarchy_resolved, type_preamble};
use super::facets::{check_facet, check_type_construct_facet};
use super::{capabilities, interfaces, properties, requirements, CheckContext, Checker};
use crate::catalog::Catalog;
use crate::construct::{Construct, Facet};
use crate::value::{get_str, map_entries};

pub(crate) fn check_node_types(_: &Checker, section: &Value, ctx: &mut CheckContext, catalog: &mut Catalog) {
    check_entries("node_types", section, ctx, catalog, check_node_type_definition);
}

fn check_node_type_definition(name: &str, definition: &Value, ctx: &mut CheckContext, catalog: &Catalog) {
    let mut ctx = ctx.enter_construct(name, Construct::Node);
    if !type_preamble(Construct::Node, name, definition, &mut ctx, catalog) {
        return;
    }

    if let Some(props) = definition.get("properties") {
        properties::check_properties(props, &mut ctx, catalog);
        check_type_construct_facet(Construct::Node, name, definition, Facet::Properties, &mut ctx, catalog);
    }
    if let Some(attrs) = definition.get("attributes") {
        properties::check_attributes(attrs, &mut ctx, catalog);
        check_type_construct_facet(Construct::Node, name, definition, Facet::Attributes, &mut ctx, catalog);
    }
    if let Some(reqs) = definition.get("requirements") {
        requirements::check_requirement_definitions(reqs, &mut ctx, catalog);
    }
    if let Some(caps) = definition.get("capabilities") {
        capabilities::check_capability_definitions(caps, &mut ctx, catalog);
        check_type_construct_facet(Construct::Node, name, definition, Facet::Capabilities, &mut ctx, catalog);
    }
    if let Some(defs) = definition.get("interfaces") {
        interfaces::check_interface_definitions(defs, &mut ctx, catalog);
        check_type_construct_facet(Construct::Node, name, definition, Facet::Interfaces, &mut ctx, catalog);
    }
    if let Some(artifacts) = definition.get("artifacts") {
        check_artifacts(artifacts, &mut ctx, catalog);
        check_type_construct_facet(Construct::Node, name, definition, Facet::Artifacts, &mut ctx, catalog);
    }
}

pub(crate) fn check_node_templates(_: &Checker, section: &Value, ctx: &mut CheckContext, catalog: &mut Catalog) {
    check_entries("node_templates", section, ctx, catalog, check_node_template_definition);
}

fn check_node_template_definition(name: &str, definition: &Value, ctx: &mut CheckContext, catalog: &Catalog) {
    let mut ctx = ctx.enter_construct(name, Construct::Node);
    if !check_definition(name, definition, &mut ctx) {
        return;
    }
    if !check_type(Construct::Node, definition, &mut ctx, catalog) {
        return;
    }
    let Some(node_type) = get_str(definition, "type") else {
        return;
    };
    // an unresolved supertype was reported while cataloging
    if !hierarchy_resolved(Construct::Node, node_type, catalog) {
        return;
    }

    if let Some(copy) = get_str(definition, "copy") {
        if !catalog.has_template(ctx.target(), Construct::Node, copy) {
            ctx.add_error(format!(
                "The 'copy' reference {} does not point to a known node template",
                copy
            ));
        }
    }

    check_facet(Construct::Node, definition, node_type, Facet::Properties, &mut ctx, catalog);
    check_facet(Construct::Node, definition, node_type, Facet::Attributes, &mut ctx, catalog);

    if let Some(reqs) = definition.get("requirements") {
        requirements::check_requirement_assignments(node_type, reqs, &mut ctx, catalog);
    }
    if let Some(caps) = definition.get("capabilities") {
        capabilities::check_capability_assignments(node_type, caps, &mut ctx, catalog);
    }
    if let Some(defs) = definition.get("interfaces") {
        interfaces::check_template_interfaces(Construct::Node, node_type, defs, &mut ctx, catalog);
    }
    if let Some(artifacts) = definition.get("artifacts") {
        check_artifacts(artifacts, &mut ctx, catalog);
    }
}

/// Artifacts look the same in types and templates: a file, and optionally
/// the artifact type.
fn check_artifacts(artifacts: &Value, ctx: &mut CheckContext, catalog: &Catalog) {
    let mut ctx = ctx.enter("artifacts");
    if !check_definition("artifacts", artifacts, &mut ctx) {
        return;
    }
    for (name, artifact) in map_entries(artifacts) {
        let mut ctx = ctx.enter(name);
        if artifact.get("type").is_some() {
            check_type(Construct::Artifact, artifact, &mut ctx, catalog);
        }
        if get_str(artifact, "file").is_none() {
            ctx.add_error(format!("Missing file for artifact {}", name));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{Location, Target};

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    fn setup() -> (Catalog, CheckContext) {
        let mut catalog = Catalog::new();
        for core in ["string", "integer"] {
            catalog.add_type(Construct::Data, core, yaml("{}"));
        }
        catalog.add_type(Construct::Artifact, "Deployment", yaml("{}"));
        catalog.add_type(
            Construct::Node,
            "Db",
            yaml("properties: {name: {type: string}, port: {type: integer, default: 5432}}"),
        );
        let location = Location::builtin("nodes.yaml");
        let (id, _) = catalog.add_target(Target::new("nodes", location.clone()), None);
        (catalog, CheckContext::new(id, location))
    }

    fn messages(ctx: &CheckContext) -> Vec<&str> {
        ctx.errors().iter().map(|e| e.message.as_str()).collect()
    }

    #[test]
    fn test_node_template() {
        let (catalog, mut ctx) = setup();
        let template = yaml(
            r#"
type: Db
copy: origin
properties: {name: orders}
artifacts:
  image: {type: Deployment, file: db.tar}
  script: {type: Script, file: run.sh}
  broken: {type: Deployment}
"#,
        );
        check_node_template_definition("db", &template, &mut ctx, &catalog);
        assert_eq!(
            messages(&ctx),
            vec![
                "The 'copy' reference origin does not point to a known node template",
                "Unknown Artifact type: Script",
                "Missing file for artifact broken",
            ]
        );
    }

    #[test]
    fn test_node_template_skips_unresolved_type() {
        let (mut catalog, mut ctx) = setup();
        catalog.add_type(Construct::Node, "B", yaml("derived_from: Z"));
        check_node_template_definition("x", &yaml("type: B\nproperties: {bogus: 1}"), &mut ctx, &catalog);
        check_node_template_definition("y", &yaml("type: Missing"), &mut ctx, &catalog);
        assert_eq!(messages(&ctx), vec!["Unknown Node type: Missing"]);
    }

    #[test]
    fn test_node_type_definition() {
        let (mut catalog, mut ctx) = setup();
        let definition = yaml("derived_from: Db\nproperties: {port: {type: string}}\nattributes: {state: {type: State}}");
        catalog.add_type(Construct::Node, "Replica", definition.clone());
        check_node_type_definition("Replica", &definition, &mut ctx, &catalog);
        let found = messages(&ctx);
        assert_eq!(found.len(), 2);
        assert!(found[0].contains("redefinition changed its type"));
        assert_eq!(found[1], "Unknown Data type: State");
    }
}
