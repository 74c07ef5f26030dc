//! Interface types, interface definitions inside types, and interface
//! assignments inside templates.

use serde_yaml::Value;

use super::common::{check_definition, check_entries, check_type, type_preamble};
use super::facets::check_facet;
use super::properties::{check_property_definition, check_property_definitions};
use super::{CheckContext, Checker};
use crate::catalog::Catalog;
use crate::construct::{Construct, Facet};
use crate::data;
use crate::value::{get_str, map_entries};

pub(crate) fn check_interface_types(_: &Checker, section: &Value, ctx: &mut CheckContext, catalog: &mut Catalog) {
    check_entries("interface_types", section, ctx, catalog, check_interface_type_definition);
}

fn check_interface_type_definition(name: &str, definition: &Value, ctx: &mut CheckContext, catalog: &Catalog) {
    let mut ctx = ctx.enter_construct(name, Construct::Interface);
    if !type_preamble(Construct::Interface, name, definition, &mut ctx, catalog) {
        return;
    }
    if let Some(inputs) = definition.get("inputs") {
        let mut ctx = ctx.enter("inputs");
        check_property_definitions("inputs", inputs, &mut ctx, catalog);
    }
}

/// Checks the `interfaces` of a node, relationship or group type.
pub(crate) fn check_interface_definitions(definitions: &Value, ctx: &mut CheckContext, catalog: &Catalog) {
    let mut ctx = ctx.enter("interfaces");
    for (name, definition) in map_entries(definitions) {
        let mut ctx = ctx.enter(name);
        if !check_definition(name, definition, &mut ctx) {
            continue;
        }
        if !check_type(Construct::Interface, definition, &mut ctx, catalog) {
            continue;
        }
        let Some(interface_type) = get_str(definition, "type") else {
            continue;
        };
        if let Some(inputs) = definition.get("inputs") {
            let mut ctx = ctx.enter("inputs");
            check_type_interface_inputs(interface_type, inputs, &mut ctx, catalog);
        }
    }
}

/// Inputs inside a type may either define new inputs or give values to the
/// ones of the interface type.
fn check_type_interface_inputs(interface_type: &str, inputs: &Value, ctx: &mut CheckContext, catalog: &Catalog) {
    for (name, input) in map_entries(inputs) {
        if input.get("type").is_some() {
            check_property_definition(name, input, ctx, catalog);
            continue;
        }
        if let Some(definition) = catalog.get_facet_definition(Construct::Interface, interface_type, Facet::Inputs, name)
        {
            let mut ctx = ctx.enter(name);
            data::check_data_valuation(input, &definition, &mut ctx, catalog);
        }
    }
}

/// Checks the interface assignments of a template of type `spec_type`.
///
/// Each assigned interface must be declared by the type, and its inputs
/// must be known to the interface type.
pub(crate) fn check_template_interfaces(
    construct: Construct,
    spec_type: &str,
    interfaces: &Value,
    ctx: &mut CheckContext,
    catalog: &Catalog,
) {
    let mut ctx = ctx.enter("interfaces");
    if !check_definition("interfaces", interfaces, &mut ctx) {
        return;
    }
    for (name, assignment) in map_entries(interfaces) {
        let Some(definition) = catalog.get_facet_definition(construct, spec_type, Facet::Interfaces, name) else {
            ctx.add_error(format!(
                "No interface {} was defined for the {} type {}",
                name,
                construct.display_name(),
                spec_type
            ));
            continue;
        };
        let Some(interface_type) = get_str(&definition, "type") else {
            continue;
        };
        let mut ctx = ctx.enter_construct(name, Construct::Interface);
        check_facet(Construct::Interface, assignment, interface_type, Facet::Inputs, &mut ctx, catalog);
    }
}
