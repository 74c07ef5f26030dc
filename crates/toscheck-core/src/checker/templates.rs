//! Groups and policies of a topology.

use serde_yaml::Value;

use super::common::{check_definition, check_entries, check_type, hierarchy_resolved};
use super::facets::check_facet;
use super::types::group_targets;
use super::{interfaces, CheckContext, Checker};
use crate::catalog::Catalog;
use crate::construct::{Construct, Facet};
use crate::value::{get_str, single_entry, str_list};

pub(crate) fn check_groups(_: &Checker, section: &Value, ctx: &mut CheckContext, catalog: &mut Catalog) {
    check_entries("groups", section, ctx, catalog, check_group_definition);
}

fn check_group_definition(name: &str, definition: &Value, ctx: &mut CheckContext, catalog: &Catalog) {
    let mut ctx = ctx.enter_construct(name, Construct::Group);
    if !check_definition(name, definition, &mut ctx) {
        return;
    }
    if !check_type(Construct::Group, definition, &mut ctx, catalog) {
        return;
    }
    let Some(group_type) = get_str(definition, "type") else {
        return;
    };
    if !hierarchy_resolved(Construct::Group, group_type, catalog) {
        return;
    }

    check_facet(Construct::Group, definition, group_type, Facet::Properties, &mut ctx, catalog);
    if let Some(defs) = definition.get("interfaces") {
        interfaces::check_template_interfaces(Construct::Group, group_type, defs, &mut ctx, catalog);
    }

    let members = group_targets(definition);
    if members.is_empty() {
        return;
    }
    let allowed = allowed_targets(Construct::Group, group_type, catalog);
    let mut ctx = ctx.enter("targets");
    for member in members {
        let Some(member_type) = template_type(Construct::Node, member, &ctx, catalog) else {
            ctx.add_error(format!(
                "The 'targets' entry must contain a reference to a node template, '{}' is not one",
                member
            ));
            continue;
        };
        if !is_compatible(Construct::Node, member_type, &allowed, catalog) {
            ctx.add_error(format!(
                "The 'targets' entry '{}' is not type compatible with any of types specified in group type targets",
                member
            ));
        }
    }
}

/// Policies are a sequence of single-entry maps.
pub(crate) fn check_policies(_: &Checker, section: &Value, ctx: &mut CheckContext, catalog: &mut Catalog) {
    if !check_definition("policies", section, ctx) {
        return;
    }
    for (name, definition) in section.as_sequence().into_iter().flatten().filter_map(single_entry) {
        check_policy_definition(name, definition, ctx, catalog);
    }
}

fn check_policy_definition(name: &str, definition: &Value, ctx: &mut CheckContext, catalog: &Catalog) {
    let mut ctx = ctx.enter_construct(name, Construct::Policy);
    if !check_definition(name, definition, &mut ctx) {
        return;
    }
    if !check_type(Construct::Policy, definition, &mut ctx, catalog) {
        return;
    }
    let Some(policy_type) = get_str(definition, "type") else {
        return;
    };
    if !hierarchy_resolved(Construct::Policy, policy_type, catalog) {
        return;
    }

    check_facet(Construct::Policy, definition, policy_type, Facet::Properties, &mut ctx, catalog);

    let targets = str_list(definition, "targets");
    if targets.is_empty() {
        return;
    }
    let allowed = allowed_targets(Construct::Policy, policy_type, catalog);
    let mut ctx = ctx.enter("targets");
    for target in targets {
        let resolved = [Construct::Group, Construct::Node]
            .into_iter()
            .find_map(|construct| template_type(construct, target, &ctx, catalog).map(|t| (construct, t)));
        let Some((construct, target_type)) = resolved else {
            ctx.add_error(format!(
                "The 'targets' entry must contain a reference to a node template or group template, '{}' is none of those",
                target
            ));
            continue;
        };
        if !is_compatible(construct, target_type, &allowed, catalog) {
            ctx.add_error(format!(
                "The 'targets' {} entry '{}' is not type compatible with any of types specified in policy type targets",
                construct.display_name(),
                target
            ));
        }
    }
}

/// The `targets` restriction of a group or policy type, taken from the most
/// specialized type in its hierarchy that declares one.
fn allowed_targets<'c>(construct: Construct, type_name: &'c str, catalog: &'c Catalog) -> Vec<&'c str> {
    catalog
        .hierarchy(construct, type_name)
        .map(|(_, def)| {
            if construct == Construct::Group {
                group_targets(def)
            } else {
                str_list(def, "targets")
            }
        })
        .find(|targets| !targets.is_empty())
        .unwrap_or_default()
}

fn template_type<'c>(construct: Construct, name: &str, ctx: &CheckContext, catalog: &'c Catalog) -> Option<&'c str> {
    catalog
        .get_template(ctx.target(), construct, name)
        .and_then(|template| get_str(template, "type"))
}

/// No restriction admits any type.
fn is_compatible(construct: Construct, type_name: &str, allowed: &[&str], catalog: &Catalog) -> bool {
    allowed.is_empty() || allowed.iter().any(|a| catalog.is_derived_from(construct, type_name, a))
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
        catalog.add_type(Construct::Node, "Root", yaml("{}"));
        catalog.add_type(Construct::Node, "Compute", yaml("derived_from: Root"));
        catalog.add_type(Construct::Node, "Storage", yaml("derived_from: Root"));
        catalog.add_type(Construct::Group, "Servers", yaml("targets: [Compute]"));
        catalog.add_type(Construct::Group, "Legacy", yaml("members: [Storage]"));
        catalog.add_type(Construct::Policy, "Placement", yaml("targets: [Compute, Servers]"));
        let location = Location::builtin("templates.yaml");
        let (id, _) = catalog.add_target(Target::new("templates", location.clone()), None);
        catalog.add_template(id, Construct::Node, "vm", yaml("type: Compute")).unwrap();
        catalog.add_template(id, Construct::Node, "disk", yaml("type: Storage")).unwrap();
        catalog.add_template(id, Construct::Group, "pool", yaml("type: Servers")).unwrap();
        (catalog, CheckContext::new(id, location))
    }

    fn messages(ctx: &CheckContext) -> Vec<&str> {
        ctx.errors().iter().map(|e| e.message.as_str()).collect()
    }

    #[test]
    fn test_group_members() {
        let (catalog, mut ctx) = setup();
        check_group_definition("pool", &yaml("type: Servers\ntargets: [vm, disk, ghost]"), &mut ctx, &catalog);
        check_group_definition("old", &yaml("type: Legacy\nmembers: [disk]"), &mut ctx, &catalog);
        assert_eq!(
            messages(&ctx),
            vec![
                "The 'targets' entry 'disk' is not type compatible with any of types specified in group type targets",
                "The 'targets' entry must contain a reference to a node template, 'ghost' is not one",
            ]
        );
    }

    #[test]
    fn test_policy_targets() {
        let (catalog, mut ctx) = setup();
        let policies = yaml("[{spread: {type: Placement, targets: [vm, pool, disk, ghost]}}]");
        for (name, definition) in policies.as_sequence().unwrap().iter().filter_map(single_entry) {
            check_policy_definition(name, definition, &mut ctx, &catalog);
        }
        assert_eq!(
            messages(&ctx),
            vec![
                "The 'targets' node entry 'disk' is not type compatible with any of types specified in policy type targets",
                "The 'targets' entry must contain a reference to a node template or group template, 'ghost' is none of those",
            ]
        );
    }
}
