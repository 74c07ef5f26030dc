//! Property, attribute, input and output definitions.

use serde_yaml::Value;

use super::common::check_definition;
use super::{CheckContext, Checker};
use crate::catalog::Catalog;
use crate::data;
use crate::value::map_entries;

/// Checks the `properties` of a type.
pub(crate) fn check_properties(definitions: &Value, ctx: &mut CheckContext, catalog: &Catalog) {
    let mut ctx = ctx.enter("properties");
    check_property_definitions("properties", definitions, &mut ctx, catalog);
}

/// Checks the `attributes` of a type. Attribute definitions share the shape
/// of property definitions.
pub(crate) fn check_attributes(definitions: &Value, ctx: &mut CheckContext, catalog: &Catalog) {
    let mut ctx = ctx.enter("attributes");
    check_property_definitions("attributes", definitions, &mut ctx, catalog);
}

pub(crate) fn check_property_definitions(
    section: &str,
    definitions: &Value,
    ctx: &mut CheckContext,
    catalog: &Catalog,
) {
    if !check_definition(section, definitions, ctx) {
        return;
    }
    for (name, definition) in map_entries(definitions) {
        check_property_definition(name, definition, ctx, catalog);
    }
}

/// A property definition names a known data type, and its default, if
/// any, is a valid value of that type.
pub(crate) fn check_property_definition(
    name: &str,
    definition: &Value,
    ctx: &mut CheckContext,
    catalog: &Catalog,
) -> bool {
    let mut ctx = ctx.enter(name);
    if !check_definition(name, definition, &mut ctx) {
        return false;
    }
    if !data::check_data_type(definition, &mut ctx, catalog) {
        return false;
    }
    match definition.get("default") {
        Some(default) => data::check_data_valuation(default, definition, &mut ctx, catalog),
        None => true,
    }
}

/// Topology inputs are property definitions; get_input calls resolve
/// against them.
pub(crate) fn check_inputs(_: &Checker, section: &Value, ctx: &mut CheckContext, catalog: &mut Catalog) {
    check_property_definitions("inputs", section, ctx, catalog);
}

pub(crate) fn check_outputs(_: &Checker, section: &Value, ctx: &mut CheckContext, catalog: &mut Catalog) {
    if !check_definition("outputs", section, ctx) {
        return;
    }
    for (name, definition) in map_entries(section) {
        let mut ctx = ctx.enter(name);
        if !check_definition(name, definition, &mut ctx) {
            continue;
        }
        match definition.get("value") {
            Some(value) => {
                data::check_data_valuation(value, definition, &mut ctx, catalog);
            }
            None => ctx.add_error(format!("Output {} has no value", name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construct::Construct;
    use crate::target::{Location, Target};

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    fn setup() -> (Catalog, CheckContext) {
        let mut catalog = Catalog::new();
        for core in ["string", "integer", "list"] {
            catalog.add_type(Construct::Data, core, yaml("{}"));
        }
        let location = Location::builtin("properties.yaml");
        let (id, _) = catalog.add_target(Target::new("properties", location.clone()), None);
        (catalog, CheckContext::new(id, location))
    }

    #[test]
    fn test_property_definitions() {
        let (catalog, mut ctx) = setup();
        let definitions = yaml(
            r#"
name: {type: string}
port: {type: integer, default: http}
ports: {type: list, entry_schema: {type: port}}
other: {type: Other}
"#,
        );
        check_properties(&definitions, &mut ctx, &catalog);
        let found: Vec<String> = ctx.errors().iter().map(|e| format!("{}: {}", e.path, e.message)).collect();
        assert_eq!(
            found,
            vec![
                "/properties/port: Value http is not a valid integer",
                "/properties/ports: Unknown entry_schema type: {type: port}",
                "/properties/other: Unknown Data type: Other",
            ]
        );
    }

    #[test]
    fn test_empty_properties() {
        let (catalog, mut ctx) = setup();
        check_attributes(&yaml("{}"), &mut ctx, &catalog);
        assert_eq!(ctx.errors().len(), 1);
        assert_eq!(ctx.errors()[0].message, "Empty definition for attributes");
    }
}
