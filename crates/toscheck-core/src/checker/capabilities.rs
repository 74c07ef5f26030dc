//! Capability types, capability definitions inside node types, and
//! capability assignments inside node templates.

use serde_yaml::Value;

use super::common::{check_definition, check_entries, check_type, check_type_reference, type_preamble};
use super::facets::{check_facet, check_facet_augmentation, check_type_construct_facet};
use super::{properties, CheckContext, Checker};
use crate::catalog::Catalog;
use crate::construct::{Construct, Facet};
use crate::value::{get_str, map_entries, str_list};

pub(crate) fn check_capability_types(_: &Checker, section: &Value, ctx: &mut CheckContext, catalog: &mut Catalog) {
    check_entries("capability_types", section, ctx, catalog, check_capability_type_definition);
}

fn check_capability_type_definition(name: &str, definition: &Value, ctx: &mut CheckContext, catalog: &Catalog) {
    let mut ctx = ctx.enter_construct(name, Construct::Capability);
    if !type_preamble(Construct::Capability, name, definition, &mut ctx, catalog) {
        return;
    }

    if let Some(props) = definition.get("properties") {
        properties::check_properties(props, &mut ctx, catalog);
        check_type_construct_facet(Construct::Capability, name, definition, Facet::Properties, &mut ctx, catalog);
    }
    if let Some(attrs) = definition.get("attributes") {
        properties::check_attributes(attrs, &mut ctx, catalog);
        check_type_construct_facet(Construct::Capability, name, definition, Facet::Attributes, &mut ctx, catalog);
    }
    check_valid_source_types(definition, &mut ctx, catalog);
}

fn check_valid_source_types(definition: &Value, ctx: &mut CheckContext, catalog: &Catalog) {
    if definition.get("valid_source_types").is_none() {
        return;
    }
    let sources = str_list(definition, "valid_source_types");
    let mut ctx = ctx.enter("valid_source_types");
    check_type_reference(Construct::Node, &sources, &mut ctx, catalog);
}

/// Checks the `capabilities` of a node type.
pub(crate) fn check_capability_definitions(definitions: &Value, ctx: &mut CheckContext, catalog: &Catalog) {
    let mut ctx = ctx.enter("capabilities");
    if !check_definition("capabilities", definitions, &mut ctx) {
        return;
    }
    for (name, definition) in map_entries(definitions) {
        check_capability_definition(name, definition, &mut ctx, catalog);
    }
}

/// A capability definition names a capability type and may only augment
/// the properties and attributes that type declares.
fn check_capability_definition(name: &str, definition: &Value, ctx: &mut CheckContext, catalog: &Catalog) {
    let mut ctx = ctx.enter_construct(name, Construct::Capability);
    if !check_definition(name, definition, &mut ctx) {
        return;
    }
    if !check_type(Construct::Capability, definition, &mut ctx, catalog) {
        return;
    }
    if !check_facet_augmentation(Construct::Capability, definition, Facet::Properties, &mut ctx, catalog) {
        return;
    }
    if !check_facet_augmentation(Construct::Capability, definition, Facet::Attributes, &mut ctx, catalog) {
        return;
    }
    check_valid_source_types(definition, &mut ctx, catalog);
}

/// Checks the capability assignments of a node template of type `node_type`
/// against the capability types the node type declares.
pub(crate) fn check_capability_assignments(
    node_type: &str,
    assignments: &Value,
    ctx: &mut CheckContext,
    catalog: &Catalog,
) {
    let mut ctx = ctx.enter("capabilities");
    if !check_definition("capabilities", assignments, &mut ctx) {
        return;
    }
    for (name, assignment) in map_entries(assignments) {
        let Some(definition) = catalog.get_facet_definition(Construct::Node, node_type, Facet::Capabilities, name)
        else {
            ctx.add_error(format!(
                "No capability {} was defined for the node type {}",
                name, node_type
            ));
            continue;
        };
        let Some(capability_type) = get_str(&definition, "type") else {
            continue;
        };

        let mut ctx = ctx.enter_construct(name, Construct::Capability);
        check_facet(
            Construct::Capability,
            assignment,
            capability_type,
            Facet::Properties,
            &mut ctx,
            catalog,
        );
        check_facet(
            Construct::Capability,
            assignment,
            capability_type,
            Facet::Attributes,
            &mut ctx,
            catalog,
        );
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
        catalog.add_type(
            Construct::Capability,
            "Port",
            yaml("properties: {num: {type: integer, default: 80}}"),
        );
        catalog.add_type(Construct::Node, "Server", yaml("capabilities: {endpoint: {type: Port}}"));
        let location = Location::builtin("capabilities.yaml");
        let (id, _) = catalog.add_target(Target::new("capabilities", location.clone()), None);
        (catalog, CheckContext::new(id, location))
    }

    #[test]
    fn test_unknown_capability_property() {
        let (catalog, mut ctx) = setup();
        let assignments = yaml("{endpoint: {properties: {bogus: 1}}}");
        check_capability_assignments("Server", &assignments, &mut ctx, &catalog);
        assert_eq!(ctx.errors().len(), 1);
        assert_eq!(
            ctx.errors()[0].message,
            "Unknown capability property 'bogus' (not declared by the type Port)"
        );
        assert_eq!(ctx.errors()[0].path, "/capabilities/endpoint/properties/bogus");
    }

    #[test]
    fn test_undeclared_capability() {
        let (catalog, mut ctx) = setup();
        let assignments = yaml("{admin: {properties: {num: 1}}, endpoint: {properties: {num: 8080}}}");
        check_capability_assignments("Server", &assignments, &mut ctx, &catalog);
        assert_eq!(ctx.errors().len(), 1);
        assert_eq!(ctx.errors()[0].message, "No capability admin was defined for the node type Server");
    }

    #[test]
    fn test_capability_definitions() {
        let (catalog, mut ctx) = setup();
        let definitions = yaml(
            r#"
api: {type: Port, properties: {num: {default: 8080}}, valid_source_types: [Server, Client]}
db: {type: Db}
"#,
        );
        check_capability_definitions(&definitions, &mut ctx, &catalog);
        let messages: Vec<&str> = ctx.errors().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Reference to Node type 'Client' points to unknown type",
                "Unknown Capability type: Db",
            ]
        );
    }
}
