//! Relationship types and relationship templates.

use serde_yaml::Value;

use super::common::{
    check_definition, check_entries, check_type, check_type_reference, hierarchy_resolved, type_preamble,
};
use super::facets::{check_facet, check_type_construct_facet};
use super::{interfaces, properties, CheckContext, Checker};
use crate::catalog::Catalog;
use crate::construct::{Construct, Facet};
use crate::value::{get_str, str_list};

pub(crate) fn check_relationship_types(_: &Checker, section: &Value, ctx: &mut CheckContext, catalog: &mut Catalog) {
    check_entries("relationship_types", section, ctx, catalog, check_relationship_type_definition);
}

fn check_relationship_type_definition(name: &str, definition: &Value, ctx: &mut CheckContext, catalog: &Catalog) {
    let mut ctx = ctx.enter_construct(name, Construct::Relationship);
    if !type_preamble(Construct::Relationship, name, definition, &mut ctx, catalog) {
        return;
    }

    if let Some(props) = definition.get("properties") {
        properties::check_properties(props, &mut ctx, catalog);
        check_type_construct_facet(Construct::Relationship, name, definition, Facet::Properties, &mut ctx, catalog);
    }
    if let Some(attrs) = definition.get("attributes") {
        properties::check_attributes(attrs, &mut ctx, catalog);
        check_type_construct_facet(Construct::Relationship, name, definition, Facet::Attributes, &mut ctx, catalog);
    }
    if let Some(defs) = definition.get("interfaces") {
        interfaces::check_interface_definitions(defs, &mut ctx, catalog);
        check_type_construct_facet(Construct::Relationship, name, definition, Facet::Interfaces, &mut ctx, catalog);
    }
    if definition.get("valid_target_types").is_some() {
        let targets = str_list(definition, "valid_target_types");
        let mut ctx = ctx.enter("valid_target_types");
        check_type_reference(Construct::Capability, &targets, &mut ctx, catalog);
    }
}

pub(crate) fn check_relationship_templates(
    _: &Checker,
    section: &Value,
    ctx: &mut CheckContext,
    catalog: &mut Catalog,
) {
    check_entries("relationship_templates", section, ctx, catalog, check_relationship_template_definition);
}

fn check_relationship_template_definition(
    name: &str,
    definition: &Value,
    ctx: &mut CheckContext,
    catalog: &Catalog,
) {
    let mut ctx = ctx.enter_construct(name, Construct::Relationship);
    if !check_definition(name, definition, &mut ctx) {
        return;
    }
    if !check_type(Construct::Relationship, definition, &mut ctx, catalog) {
        return;
    }
    let Some(relationship_type) = get_str(definition, "type") else {
        return;
    };
    if !hierarchy_resolved(Construct::Relationship, relationship_type, catalog) {
        return;
    }

    check_facet(Construct::Relationship, definition, relationship_type, Facet::Properties, &mut ctx, catalog);
    check_facet(Construct::Relationship, definition, relationship_type, Facet::Attributes, &mut ctx, catalog);
    if let Some(defs) = definition.get("interfaces") {
        interfaces::check_template_interfaces(Construct::Relationship, relationship_type, defs, &mut ctx, catalog);
    }
}
