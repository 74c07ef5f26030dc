//! The topology template: cataloging of its templates, substitution
//! mappings and workflows.

use serde_yaml::{Mapping, Value};

use super::common::{catalog_template, catalog_templates, check_definition, check_type_reference};
use super::properties::check_property_definitions;
use super::{CheckContext, Checker, Pass};
use crate::catalog::Catalog;
use crate::construct::{Construct, Facet};
use crate::value::{describe, entries, get_map, get_seq, get_str, map_entries, single_entry};

/// The topology's sections have rules of their own.
pub(crate) fn catalog_topology(checker: &Checker, section: &Value, ctx: &mut CheckContext, catalog: &mut Catalog) {
    checker.dispatch(Pass::Catalog, section, ctx, catalog);
}

/// Inputs are cataloged as data templates, for get_input to resolve.
pub(crate) fn catalog_inputs(_: &Checker, section: &Value, ctx: &mut CheckContext, catalog: &mut Catalog) {
    catalog_templates(Construct::Data, section, ctx, catalog);
}

pub(crate) fn catalog_node_templates(_: &Checker, section: &Value, ctx: &mut CheckContext, catalog: &mut Catalog) {
    catalog_templates(Construct::Node, section, ctx, catalog);
}

pub(crate) fn catalog_relationship_templates(
    _: &Checker,
    section: &Value,
    ctx: &mut CheckContext,
    catalog: &mut Catalog,
) {
    catalog_templates(Construct::Relationship, section, ctx, catalog);
}

pub(crate) fn catalog_groups(_: &Checker, section: &Value, ctx: &mut CheckContext, catalog: &mut Catalog) {
    catalog_templates(Construct::Group, section, ctx, catalog);
}

pub(crate) fn catalog_policies(_: &Checker, section: &Value, ctx: &mut CheckContext, catalog: &mut Catalog) {
    for (name, definition) in section.as_sequence().into_iter().flatten().filter_map(single_entry) {
        catalog_template(Construct::Policy, name, definition, ctx, catalog);
    }
}

pub(crate) fn check_topology(checker: &Checker, section: &Value, ctx: &mut CheckContext, catalog: &mut Catalog) {
    checker.dispatch(Pass::Check, section, ctx, catalog);
}

// ----------------------------------------------------------------------
// Substitution mappings
// ----------------------------------------------------------------------

/// The mapped node type must exist and declare every mapped capability and
/// requirement; each mapping points at an entry of a local node template.
pub(crate) fn check_substitution_mappings(
    _: &Checker,
    section: &Value,
    ctx: &mut CheckContext,
    catalog: &mut Catalog,
) {
    let Some(node_type) = get_str(section, "node_type") else {
        ctx.add_error("Missing node_type in substitution mappings");
        return;
    };
    if !check_type_reference(Construct::Node, &[node_type], ctx, catalog) {
        return;
    }

    if let Some(capabilities) = get_map(section, "capabilities") {
        let mut ctx = ctx.enter("capabilities");
        for (name, mapping) in entries(capabilities) {
            let mut ctx = ctx.enter(name);
            if catalog
                .get_facet_definition(Construct::Node, node_type, Facet::Capabilities, name)
                .is_none()
            {
                ctx.add_error(format!("Unknown node type capability: {}, type {}", name, node_type));
            }
            let Some((template, template_type, capability)) = mapping_target("capability", mapping, &mut ctx, catalog)
            else {
                continue;
            };
            if catalog
                .get_facet_definition(Construct::Node, template_type, Facet::Capabilities, capability)
                .is_none()
            {
                ctx.add_error(format!(
                    "Invalid capability mapping capability: {}. No such capability found for node template {}, of type {}",
                    capability, template, template_type
                ));
            }
        }
    }

    if let Some(requirements) = get_map(section, "requirements") {
        let mut ctx = ctx.enter("requirements");
        for (name, mapping) in entries(requirements) {
            let mut ctx = ctx.enter(name);
            if catalog.get_requirement_definition(Construct::Node, node_type, name).is_none() {
                ctx.add_error(format!("Unknown node type requirement: {}, type {}", name, node_type));
            }
            let Some((template, template_type, requirement)) =
                mapping_target("requirement", mapping, &mut ctx, catalog)
            else {
                continue;
            };
            if catalog
                .get_requirement_definition(Construct::Node, template_type, requirement)
                .is_none()
            {
                ctx.add_error(format!(
                    "Invalid requirement mapping requirement: {}. No such requirement found for node template {}, of type {}",
                    requirement, template, template_type
                ));
            }
        }
    }
}

/// Resolves a `[node_template, entry]` mapping to the template, its type
/// and the entry name.
fn mapping_target<'v>(
    kind: &str,
    mapping: &'v Value,
    ctx: &mut CheckContext,
    catalog: &'v Catalog,
) -> Option<(&'v str, &'v str, &'v str)> {
    let pair = mapping
        .as_sequence()
        .filter(|items| items.len() == 2)
        .and_then(|items| Some((items[0].as_str()?, items[1].as_str()?)));
    let Some((template, entry)) = pair else {
        ctx.add_error(format!(
            "Invalid {} mapping: {}, expecting 2 elements",
            kind,
            describe(mapping)
        ));
        return None;
    };
    let template_type = catalog
        .get_template(ctx.target(), Construct::Node, template)
        .and_then(|t| get_str(t, "type"));
    let Some(template_type) = template_type else {
        ctx.add_error(format!("Invalid {} mapping node template: {}", kind, template));
        return None;
    };
    Some((template, template_type, entry))
}

// ----------------------------------------------------------------------
// Workflows
// ----------------------------------------------------------------------

pub(crate) fn check_workflows(_: &Checker, section: &Value, ctx: &mut CheckContext, catalog: &mut Catalog) {
    if !check_definition("workflows", section, ctx) {
        return;
    }
    for (name, workflow) in map_entries(section) {
        check_workflow(name, workflow, ctx, catalog);
    }
}

fn check_workflow(name: &str, workflow: &Value, ctx: &mut CheckContext, catalog: &Catalog) {
    let mut ctx = ctx.enter_construct(name, Construct::Workflow);

    if let Some(inputs) = workflow.get("inputs") {
        let mut ctx = ctx.enter("inputs");
        check_property_definitions("inputs", inputs, &mut ctx, catalog);
    }

    if let Some(preconditions) = get_seq(workflow, "preconditions") {
        let mut ctx = ctx.enter("preconditions");
        for (index, precondition) in preconditions.iter().enumerate() {
            let Some(target) = get_str(precondition, "target") else {
                continue;
            };
            let mut ctx = ctx.enter(&index.to_string());
            check_workflow_target(target, &mut ctx, catalog);
        }
    }

    if let Some(steps) = get_map(workflow, "steps") {
        let mut ctx = ctx.enter("steps");
        for (step, definition) in entries(steps) {
            let mut ctx = ctx.enter(step);
            check_workflow_step(definition, steps, &mut ctx, catalog);
        }
    }
}

fn check_workflow_step(step: &Value, steps: &Mapping, ctx: &mut CheckContext, catalog: &Catalog) {
    let Some(target) = get_str(step, "target") else {
        ctx.add_error("Missing workflow step target");
        return;
    };
    let target_construct = check_workflow_target(target, ctx, catalog);

    if let (Some(Construct::Node), Some(relationship)) = (target_construct, get_str(step, "target_relationship")) {
        let target_type = catalog
            .get_template(ctx.target(), Construct::Node, target)
            .and_then(|t| get_str(t, "type"));
        if let Some(target_type) = target_type {
            if catalog
                .get_requirement_definition(Construct::Node, target_type, relationship)
                .is_none()
            {
                ctx.add_error(format!(
                    "The 'target_relationship' {} is not a requirement of the node template {}",
                    relationship, target
                ));
            }
        }
    }

    for transition in ["on_success", "on_failure"] {
        let next: Vec<&str> = match step.get(transition) {
            Some(Value::String(name)) => vec![name.as_str()],
            Some(Value::Sequence(names)) => names.iter().filter_map(Value::as_str).collect(),
            _ => continue,
        };
        for name in next {
            if !steps.contains_key(name) {
                ctx.add_error(format!("The '{}' step {} is not a step of this workflow", transition, name));
            }
        }
    }
}

/// A workflow target is a group or node template. Returns which one.
fn check_workflow_target(target: &str, ctx: &mut CheckContext, catalog: &Catalog) -> Option<Construct> {
    let construct = [Construct::Group, Construct::Node]
        .into_iter()
        .find(|construct| catalog.has_template(ctx.target(), *construct, target));
    if construct.is_none() {
        ctx.add_error(format!(
            "The 'target' entry must contain a reference to a node template or group template, '{}' is none of those",
            target
        ));
    }
    construct
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckerConfig;
    use crate::target::{Location, Target};

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    fn checker() -> Checker {
        let config = CheckerConfig {
            use_commons: false,
            ..CheckerConfig::default()
        };
        Checker::with_config(&config).unwrap()
    }

    fn setup() -> (Catalog, CheckContext) {
        let mut catalog = Catalog::new();
        catalog.add_type(Construct::Capability, "Endpoint", yaml("{}"));
        catalog.add_type(
            Construct::Node,
            "Server",
            yaml("capabilities: {api: {type: Endpoint}}\nrequirements: [{db: {capability: Endpoint}}]"),
        );
        catalog.add_type(
            Construct::Node,
            "Service",
            yaml("capabilities: {public: {type: Endpoint}}\nrequirements: [{backend: {capability: Endpoint}}]"),
        );
        let location = Location::builtin("topology.yaml");
        let (id, _) = catalog.add_target(Target::new("topology", location.clone()), None);
        catalog.add_template(id, Construct::Node, "web", yaml("type: Server")).unwrap();
        (catalog, CheckContext::new(id, location))
    }

    fn messages(ctx: &CheckContext) -> Vec<&str> {
        ctx.errors().iter().map(|e| e.message.as_str()).collect()
    }

    #[test]
    fn test_substitution_mappings() {
        let (mut catalog, mut ctx) = setup();
        let mappings = yaml(
            r#"
node_type: Service
capabilities:
  public: [web, api]
  private: [web, admin]
requirements:
  backend: [web]
"#,
        );
        check_substitution_mappings(&checker(), &mappings, &mut ctx, &mut catalog);
        assert_eq!(
            messages(&ctx),
            vec![
                "Unknown node type capability: private, type Service",
                "Invalid capability mapping capability: admin. No such capability found for node template web, of type Server",
                "Invalid requirement mapping: [web], expecting 2 elements",
            ]
        );
    }

    #[test]
    fn test_workflows() {
        let (mut catalog, mut ctx) = setup();
        let workflows = yaml(
            r#"
deploy:
  preconditions:
    - target: ghost
  steps:
    start:
      target: web
      target_relationship: db
      on_success: [configure]
    configure:
      target: web
      target_relationship: cache
      on_failure: rollback
"#,
        );
        check_workflows(&checker(), &workflows, &mut ctx, &mut catalog);
        assert_eq!(
            messages(&ctx),
            vec![
                "The 'target' entry must contain a reference to a node template or group template, 'ghost' is none of those",
                "The 'target_relationship' cache is not a requirement of the node template web",
                "The 'on_failure' step rollback is not a step of this workflow",
            ]
        );
        assert_eq!(ctx.errors()[0].path, "/deploy/preconditions/0");
    }

    #[test]
    fn test_topology_dispatch_catalogs_templates() {
        let (mut catalog, mut ctx) = setup();
        let topology = yaml(
            r#"
inputs: {port: {type: integer}}
node_templates: {db: {type: Server}}
policies: [{spread: {type: Placement}}]
"#,
        );
        let mut ctx = ctx.enter("topology_template");
        catalog_topology(&checker(), &topology, &mut ctx, &mut catalog);
        let id = ctx.target();
        assert!(catalog.has_template(id, Construct::Data, "port"));
        assert!(catalog.has_template(id, Construct::Node, "db"));
        assert!(catalog.has_template(id, Construct::Policy, "spread"));
        assert!(ctx.errors().is_empty());
    }
}
