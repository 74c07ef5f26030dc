//! Requirement definitions inside node types and requirement assignments
//! inside node templates.
//!
//! A requirement definition is cross-checked against the capabilities it may
//! be fulfilled by: when those capabilities restrict their sources through
//! `valid_source_types`, the node type declaring the requirement must be one
//! of them. An assignment must stay within what its definition allows.

use serde_yaml::Value;

use super::common::{check_definition, check_type, check_type_reference};
use super::facets::find_type_facet_by_type;
use super::CheckContext;
use crate::catalog::Catalog;
use crate::construct::{Construct, Facet};
use crate::value::{describe, get_seq, get_str, map_entries, single_entry, str_list};

/// Checks the `requirements` sequence of a node type.
pub(crate) fn check_requirement_definitions(definitions: &Value, ctx: &mut CheckContext, catalog: &Catalog) {
    let mut ctx = ctx.enter("requirements");
    if !check_definition("requirements", definitions, &mut ctx) {
        return;
    }
    for (name, definition) in definitions.as_sequence().into_iter().flatten().filter_map(single_entry) {
        check_requirement_definition(name, definition, &mut ctx, catalog);
    }
}

fn check_requirement_definition(name: &str, definition: &Value, ctx: &mut CheckContext, catalog: &Catalog) {
    let mut ctx = ctx.enter_construct(name, Construct::Requirement);
    if !check_definition(name, definition, &mut ctx) {
        return;
    }

    let capability = get_str(definition, "capability");
    let mut resolved = true;
    if let Some(capability) = capability {
        resolved &= check_type_reference(Construct::Capability, &[capability], &mut ctx, catalog);
    }
    let node = get_str(definition, "node");
    if let Some(node) = node {
        resolved &= check_type_reference(Construct::Node, &[node], &mut ctx, catalog);
    }

    let mut relationship_type = None;
    if let Some(relationship) = definition.get("relationship") {
        relationship_type = get_str(relationship, "type");
        if let Some(relationship_type) = relationship_type {
            resolved &= check_type_reference(Construct::Relationship, &[relationship_type], &mut ctx, catalog);
        }
        // interfaces here augment those of the relationship type
        if let Some(interfaces) = relationship.get("interfaces") {
            let mut ctx = ctx.enter("relationship");
            let mut ctx = ctx.enter("interfaces");
            for (interface, interface_def) in map_entries(interfaces) {
                let mut ctx = ctx.enter(interface);
                check_type(Construct::Interface, interface_def, &mut ctx, catalog);
            }
        }
    }

    let Some(capability) = capability.filter(|_| resolved) else {
        return;
    };
    check_valid_source_types(capability, node, &mut ctx, catalog);
    if let Some(relationship_type) = relationship_type {
        check_valid_target_types(capability, relationship_type, &mut ctx, catalog);
    }
}

/// Collects the capability definitions that could fulfill the requirement and
/// that restrict their sources. A single candidate without restriction makes
/// the requirement acceptable for any source.
fn source_restrictions<'c>(
    capability: &'c str,
    node: Option<&'c str>,
    ctx: &mut CheckContext,
    catalog: &'c Catalog,
) -> Vec<&'c Value> {
    let Some(node) = node else {
        return catalog
            .get_type_definition(Construct::Capability, capability)
            .filter(|def| def.get("valid_source_types").is_some())
            .into_iter()
            .collect();
    };

    let exposed = find_type_facet_by_type(catalog, Construct::Node, node, Facet::Capabilities, capability);
    if exposed.is_empty() {
        ctx.add_error(format!(
            "The node type {} does not appear to expose a capability of a type compatible with {}",
            node, capability
        ));
        return Vec::new();
    }

    let mut restrictions = Vec::new();
    for (_, capability_def) in exposed {
        if capability_def.get("valid_source_types").is_some() {
            restrictions.push(capability_def);
            continue;
        }
        // without a restriction of its own the capability falls back on its type's
        let type_def = get_str(capability_def, "type")
            .and_then(|capability_type| catalog.get_type_definition(Construct::Capability, capability_type));
        match type_def {
            Some(type_def) if type_def.get("valid_source_types").is_some() => restrictions.push(type_def),
            _ => return Vec::new(),
        }
    }
    restrictions
}

fn check_valid_source_types(capability: &str, node: Option<&str>, ctx: &mut CheckContext, catalog: &Catalog) {
    let restrictions = source_restrictions(capability, node, ctx, catalog);
    if restrictions.is_empty() {
        return;
    }
    let Some(source) = ctx.enclosing_construct(Construct::Node).map(str::to_string) else {
        return;
    };

    let compatible = restrictions.iter().any(|def| {
        str_list(def, "valid_source_types")
            .into_iter()
            .any(|source_type| catalog.is_derived_from(Construct::Node, &source, source_type))
    });
    if !compatible {
        ctx.add_error(format!(
            "Node type {} not compatible with any of the valid_source_types provided in the definition of compatible capabilities of type {}",
            source, capability
        ));
    }
}

fn check_valid_target_types(capability: &str, relationship_type: &str, ctx: &mut CheckContext, catalog: &Catalog) {
    let Some(relationship_def) = catalog.get_type_definition(Construct::Relationship, relationship_type) else {
        return;
    };
    let Some(targets) = get_seq(relationship_def, "valid_target_types") else {
        return;
    };
    let compatible = targets
        .iter()
        .filter_map(Value::as_str)
        .any(|target_type| catalog.is_derived_from(Construct::Capability, capability, target_type));
    if !compatible {
        ctx.add_error(format!(
            "Capability type {} not compatible with any of the valid_target_types {} provided in the definition of relationship type {}",
            capability,
            describe(&Value::Sequence(targets.clone())),
            relationship_type
        ));
    }
}

/// Checks the requirement assignments of a node template of type `node_type`.
pub(crate) fn check_requirement_assignments(
    node_type: &str,
    assignments: &Value,
    ctx: &mut CheckContext,
    catalog: &Catalog,
) {
    let mut ctx = ctx.enter("requirements");
    if !check_definition("requirements", assignments, &mut ctx) {
        return;
    }
    for (name, assignment) in assignments.as_sequence().into_iter().flatten().filter_map(single_entry) {
        let Some(definition) = catalog.get_requirement_definition(Construct::Node, node_type, name) else {
            ctx.add_error(format!(
                "No requirement {} was defined for the node type {}",
                name, node_type
            ));
            continue;
        };
        check_requirement_assignment(name, assignment, definition, &mut ctx, catalog);
    }
}

/// What a requirement assignment points at.
struct Fulfillment<'c> {
    /// A node template or node type name.
    node: Option<&'c str>,
    /// The type of the target node.
    node_type: Option<&'c str>,
    /// A capability type, or a capability name of the target node.
    capability: Option<&'c str>,
    capability_is_type: bool,
}

fn check_requirement_assignment(
    name: &str,
    assignment: &Value,
    definition: &Value,
    ctx: &mut CheckContext,
    catalog: &Catalog,
) {
    let mut ctx = ctx.enter_construct(name, Construct::Requirement);
    let Some(fulfillment) = resolve_fulfillment(assignment, definition, &mut ctx, catalog) else {
        return;
    };
    if let Some(filter) = assignment.get("node_filter") {
        let mut ctx = ctx.enter("node_filter");
        check_node_filter(filter, &fulfillment, &mut ctx, catalog);
    }
}

fn resolve_fulfillment<'c>(
    assignment: &'c Value,
    definition: &'c Value,
    ctx: &mut CheckContext,
    catalog: &'c Catalog,
) -> Option<Fulfillment<'c>> {
    let target = ctx.target();
    let template_type =
        |node: &str| -> Option<&'c str> { catalog.get_template(target, Construct::Node, node).and_then(|t| get_str(t, "type")) };

    let defined_node = get_str(definition, "node");
    let (node, node_is_template) = match get_str(assignment, "node") {
        None => (defined_node, false),
        Some(node) => {
            let is_template = catalog.has_template(target, Construct::Node, node);
            if !is_template && !catalog.has_type(Construct::Node, node) {
                ctx.add_error(format!(
                    "The 'node' entry must contain a reference to a node template or node type, '{}' is none of those",
                    node
                ));
                return None;
            }
            if let Some(defined_node) = defined_node {
                if is_template {
                    let node_type = template_type(node).unwrap_or_default();
                    if !catalog.is_derived_from(Construct::Node, node_type, defined_node) {
                        ctx.add_error(format!(
                            "The required target node type '{}' of target node {} is not compatible with the target node type found in the requirement definition: {}",
                            node_type, node, defined_node
                        ));
                        return None;
                    }
                } else if !catalog.is_derived_from(Construct::Node, node, defined_node) {
                    ctx.add_error(format!(
                        "The required target node type '{}' is not compatible with the target node type found in the requirement definition: {}",
                        node, defined_node
                    ));
                    return None;
                }
            }
            (Some(node), is_template)
        }
    };
    let node_type = if node_is_template { node.and_then(template_type) } else { node };

    let defined_capability = get_str(definition, "capability");
    let (capability, capability_is_type) = match get_str(assignment, "capability") {
        None => (defined_capability, true),
        Some(capability) => {
            let is_type = catalog.has_type(Construct::Capability, capability);
            if let Some(defined_capability) = defined_capability {
                if is_type {
                    if !catalog.is_derived_from(Construct::Capability, capability, defined_capability) {
                        ctx.add_error(format!(
                            "The required target capability type '{}' is not compatible with the target capability type found in the requirement definition: {}",
                            capability, defined_capability
                        ));
                        return None;
                    }
                } else {
                    check_named_capability(capability, defined_capability, node, node_is_template, node_type, ctx, catalog)?;
                }
            }
            (Some(capability), is_type)
        }
    };

    Some(Fulfillment {
        node,
        node_type,
        capability,
        capability_is_type,
    })
}

/// A capability given by name must be one of the target node template's,
/// with a type compatible with the one the definition requires.
fn check_named_capability(
    capability: &str,
    defined_capability: &str,
    node: Option<&str>,
    node_is_template: bool,
    node_type: Option<&str>,
    ctx: &mut CheckContext,
    catalog: &Catalog,
) -> Option<()> {
    let Some(node) = node else {
        ctx.add_error(format!(
            "The capability '{}' is not a capability type, hence it has to be a capability of the node template indicated in 'node', which was not specified",
            capability
        ));
        return None;
    };
    if !node_is_template {
        ctx.add_error(format!(
            "The capability '{}' is not a capability type, hence it has to be a capability of the node template indicated in 'node', but there you specified a node type",
            capability
        ));
        return None;
    }
    let node_type = node_type.unwrap_or_default();
    let capability_type = catalog
        .get_facet_definition(Construct::Node, node_type, Facet::Capabilities, capability)
        .and_then(|def| get_str(&def, "type").map(str::to_string));
    let Some(capability_type) = capability_type else {
        ctx.add_error(format!(
            "No capability '{}' was specified in the node {} of type {}",
            capability, node, node_type
        ));
        return None;
    };
    if !catalog.is_derived_from(Construct::Capability, &capability_type, defined_capability) {
        ctx.add_error(format!(
            "The required target capability type '{}' is not compatible with the type {} of capability {} of target node {}",
            defined_capability, capability_type, capability, node
        ));
        return None;
    }
    Some(())
}

/// Property and capability filters must refer to what the target node (or
/// target capability type) actually declares.
fn check_node_filter(filter: &Value, fulfillment: &Fulfillment<'_>, ctx: &mut CheckContext, catalog: &Catalog) {
    let target_node = fulfillment.node.zip(fulfillment.node_type);

    if let Some((node, node_type)) = target_node {
        for property_filter in get_seq(filter, "properties").into_iter().flatten() {
            for (property, _) in map_entries(property_filter) {
                if catalog
                    .get_facet_definition(Construct::Node, node_type, Facet::Properties, property)
                    .is_none()
                {
                    ctx.add_error(format!(
                        "The node_filter property {} is invalid: requirement target node {} does not have such a property",
                        property, node
                    ));
                }
            }
        }
    }

    for (filter_capability, capability_filter) in get_seq(filter, "capabilities")
        .into_iter()
        .flatten()
        .filter_map(single_entry)
    {
        let capability_type = match target_node {
            Some((_, node_type)) => filter_capability_type(filter_capability, node_type, catalog),
            None => fulfillment
                .capability
                .filter(|_| fulfillment.capability_is_type)
                .map(str::to_string),
        };
        let Some(capability_type) = capability_type else {
            let of_node = fulfillment
                .node_type
                .map(|t| format!(" of node type {}", t))
                .unwrap_or_default();
            ctx.add_error(format!(
                "Capability (name or type) {} is invalid: not a known capability (type){}",
                filter_capability, of_node
            ));
            continue;
        };

        for property_filter in get_seq(capability_filter, "properties").into_iter().flatten() {
            for (property, _) in map_entries(property_filter) {
                if catalog
                    .get_facet_definition(Construct::Capability, &capability_type, Facet::Properties, property)
                    .is_none()
                {
                    ctx.add_error(format!(
                        "The capability filter {} property {} is invalid: target capability {} does not have such a property",
                        filter_capability, property, capability_type
                    ));
                }
            }
        }
    }
}

/// A capability filter names either a capability of the target node, or a
/// capability type the target node exposes.
fn filter_capability_type(filter_capability: &str, node_type: &str, catalog: &Catalog) -> Option<String> {
    if let Some(def) = catalog.get_facet_definition(Construct::Node, node_type, Facet::Capabilities, filter_capability) {
        return get_str(&def, "type").map(str::to_string);
    }
    let exposed = find_type_facet_by_type(catalog, Construct::Node, node_type, Facet::Capabilities, filter_capability);
    if exposed.is_empty() {
        return None;
    }
    Some(filter_capability.to_string())
}
