//! Cataloging of every `*_types` section, and the checks of the type
//! constructs that carry little beyond properties.

use serde_yaml::Value;

use super::common::{self, catalog_types, check_entries, type_preamble};
use super::facets::check_type_construct_facet;
use super::{interfaces, properties, CheckContext, Checker};
use crate::catalog::Catalog;
use crate::construct::{Construct, Facet};
use crate::value::str_list;

pub(crate) fn catalog_data_types(_: &Checker, section: &Value, ctx: &mut CheckContext, catalog: &mut Catalog) {
    catalog_types(Construct::Data, section, ctx, catalog);
}

pub(crate) fn catalog_capability_types(_: &Checker, section: &Value, ctx: &mut CheckContext, catalog: &mut Catalog) {
    catalog_types(Construct::Capability, section, ctx, catalog);
}

pub(crate) fn catalog_relationship_types(
    _: &Checker,
    section: &Value,
    ctx: &mut CheckContext,
    catalog: &mut Catalog,
) {
    catalog_types(Construct::Relationship, section, ctx, catalog);
}

pub(crate) fn catalog_artifact_types(_: &Checker, section: &Value, ctx: &mut CheckContext, catalog: &mut Catalog) {
    catalog_types(Construct::Artifact, section, ctx, catalog);
}

pub(crate) fn catalog_interface_types(_: &Checker, section: &Value, ctx: &mut CheckContext, catalog: &mut Catalog) {
    catalog_types(Construct::Interface, section, ctx, catalog);
}

pub(crate) fn catalog_node_types(_: &Checker, section: &Value, ctx: &mut CheckContext, catalog: &mut Catalog) {
    catalog_types(Construct::Node, section, ctx, catalog);
}

pub(crate) fn catalog_group_types(_: &Checker, section: &Value, ctx: &mut CheckContext, catalog: &mut Catalog) {
    catalog_types(Construct::Group, section, ctx, catalog);
}

pub(crate) fn catalog_policy_types(_: &Checker, section: &Value, ctx: &mut CheckContext, catalog: &mut Catalog) {
    catalog_types(Construct::Policy, section, ctx, catalog);
}

// ----------------------------------------------------------------------
// Data types
// ----------------------------------------------------------------------

pub(crate) fn check_data_types(_: &Checker, section: &Value, ctx: &mut CheckContext, catalog: &mut Catalog) {
    check_entries("data_types", section, ctx, catalog, check_data_type_definition);
}

fn check_data_type_definition(name: &str, definition: &Value, ctx: &mut CheckContext, catalog: &Catalog) {
    let mut ctx = ctx.enter_construct(name, Construct::Data);
    if !type_preamble(Construct::Data, name, definition, &mut ctx, catalog) {
        return;
    }

    if let Some(props) = definition.get("properties") {
        properties::check_properties(props, &mut ctx, catalog);
        check_type_construct_facet(Construct::Data, name, definition, Facet::Properties, &mut ctx, catalog);
    }
}

// ----------------------------------------------------------------------
// Artifact types
// ----------------------------------------------------------------------

pub(crate) fn check_artifact_types(_: &Checker, section: &Value, ctx: &mut CheckContext, catalog: &mut Catalog) {
    check_entries("artifact_types", section, ctx, catalog, check_artifact_type_definition);
}

fn check_artifact_type_definition(name: &str, definition: &Value, ctx: &mut CheckContext, catalog: &Catalog) {
    let mut ctx = ctx.enter_construct(name, Construct::Artifact);
    if !type_preamble(Construct::Artifact, name, definition, &mut ctx, catalog) {
        return;
    }
    if let Some(props) = definition.get("properties") {
        properties::check_properties(props, &mut ctx, catalog);
        check_type_construct_facet(Construct::Artifact, name, definition, Facet::Properties, &mut ctx, catalog);
    }
}

// ----------------------------------------------------------------------
// Group types
// ----------------------------------------------------------------------

pub(crate) fn check_group_types(_: &Checker, section: &Value, ctx: &mut CheckContext, catalog: &mut Catalog) {
    check_entries("group_types", section, ctx, catalog, check_group_type_definition);
}

/// The node types a group type admits as members; `members` is accepted as
/// an older spelling of `targets`.
pub(crate) fn group_targets(definition: &Value) -> Vec<&str> {
    let targets = str_list(definition, "targets");
    if targets.is_empty() {
        str_list(definition, "members")
    } else {
        targets
    }
}

fn check_group_type_definition(name: &str, definition: &Value, ctx: &mut CheckContext, catalog: &Catalog) {
    let mut ctx = ctx.enter_construct(name, Construct::Group);
    if !type_preamble(Construct::Group, name, definition, &mut ctx, catalog) {
        return;
    }

    if let Some(props) = definition.get("properties") {
        properties::check_properties(props, &mut ctx, catalog);
        check_type_construct_facet(Construct::Group, name, definition, Facet::Properties, &mut ctx, catalog);
    }

    let targets = group_targets(definition);
    if !targets.is_empty() {
        let mut ctx = ctx.enter("targets");
        common::check_type_reference(Construct::Node, &targets, &mut ctx, catalog);
    }

    if let Some(defs) = definition.get("interfaces") {
        interfaces::check_interface_definitions(defs, &mut ctx, catalog);
        check_type_construct_facet(Construct::Group, name, definition, Facet::Interfaces, &mut ctx, catalog);
    }
}

// ----------------------------------------------------------------------
// Policy types
// ----------------------------------------------------------------------

pub(crate) fn check_policy_types(_: &Checker, section: &Value, ctx: &mut CheckContext, catalog: &mut Catalog) {
    check_entries("policy_types", section, ctx, catalog, check_policy_type_definition);
}

fn check_policy_type_definition(name: &str, definition: &Value, ctx: &mut CheckContext, catalog: &Catalog) {
    let mut ctx = ctx.enter_construct(name, Construct::Policy);
    if !type_preamble(Construct::Policy, name, definition, &mut ctx, catalog) {
        return;
    }

    if let Some(props) = definition.get("properties") {
        properties::check_properties(props, &mut ctx, catalog);
        check_type_construct_facet(Construct::Policy, name, definition, Facet::Properties, &mut ctx, catalog);
    }

    let targets = str_list(definition, "targets");
    if !targets.is_empty() {
        let mut ctx = ctx.enter("targets");
        for target in targets {
            if !catalog.has_type(Construct::Node, target) && !catalog.has_type(Construct::Group, target) {
                ctx.add_error(format!(
                    "The 'targets' entry must contain a reference to a node type or group type, '{}' is none of those",
                    target
                ));
            }
        }
    }
}
