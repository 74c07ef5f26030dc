//! Intrinsic functions that may stand in for a value.

use serde_yaml::Value;
use std::fmt;

use crate::catalog::Catalog;
use crate::checker::CheckContext;
use crate::construct::{Construct, Facet};
use crate::value::{describe, get_str, single_entry};

/// Entity keywords accepted in place of a template name.
const KEYWORDS: &[&str] = &["SELF", "SOURCE", "TARGET", "HOST"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    GetInput,
    GetProperty,
    GetAttribute,
    GetOperationOutput,
    GetNodesOfType,
    GetArtifact,
    Concat,
    Token,
}

impl Function {
    pub const ALL: [Function; 8] = [
        Function::GetInput,
        Function::GetProperty,
        Function::GetAttribute,
        Function::GetOperationOutput,
        Function::GetNodesOfType,
        Function::GetArtifact,
        Function::Concat,
        Function::Token,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Function::GetInput => "get_input",
            Function::GetProperty => "get_property",
            Function::GetAttribute => "get_attribute",
            Function::GetOperationOutput => "get_operation_output",
            Function::GetNodesOfType => "get_nodes_of_type",
            Function::GetArtifact => "get_artifact",
            Function::Concat => "concat",
            Function::Token => "token",
        }
    }

    pub fn by_name(name: &str) -> Option<Function> {
        Function::ALL.iter().copied().find(|f| f.name() == name)
    }

    /// Recognizes a function call: a single-entry map keyed by a function name.
    pub fn recognize(expr: &Value) -> Option<(Function, &Value)> {
        let (name, args) = single_entry(expr)?;
        Function::by_name(name).map(|f| (f, args))
    }

    /// Checks the arguments of a call. `definition` is what the call's result
    /// is assigned to.
    pub fn evaluate(self, args: &Value, definition: &Value, ctx: &mut CheckContext, catalog: &Catalog) -> bool {
        let outcome = match self {
            Function::GetInput => get_input(args, ctx, catalog),
            Function::GetProperty => get_entity_facet(self, &[Facet::Properties], args, ctx, catalog),
            Function::GetAttribute => {
                get_entity_facet(self, &[Facet::Attributes, Facet::Properties], args, ctx, catalog)
            }
            Function::GetOperationOutput => arity(args, 4, 4).and_then(|items| all_strings(&items)),
            Function::GetNodesOfType => get_nodes_of_type(args, catalog),
            Function::GetArtifact => get_artifact(args, ctx, catalog),
            Function::Concat => concat(args, definition, ctx, catalog),
            Function::Token => token(args, definition, ctx, catalog),
        };
        match outcome {
            Ok(()) => true,
            Err(problem) => {
                ctx.add_error(format!("{}: {}", self, problem));
                false
            }
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn arity(args: &Value, min: usize, max: usize) -> Result<Vec<&Value>, String> {
    let items = args
        .as_sequence()
        .ok_or_else(|| format!("expected a list of arguments, got {}", describe(args)))?;
    if items.len() < min || items.len() > max {
        return Err(if min == max {
            format!("expected {} arguments, got {}", min, items.len())
        } else {
            format!("expected {} to {} arguments, got {}", min, max, items.len())
        });
    }
    Ok(items.iter().collect())
}

fn all_strings(items: &[&Value]) -> Result<(), String> {
    match items.iter().find(|v| !v.is_string()) {
        Some(v) => Err(format!("argument {} is not a string", describe(v))),
        None => Ok(()),
    }
}

fn get_input(args: &Value, ctx: &CheckContext, catalog: &Catalog) -> Result<(), String> {
    let name = args
        .as_str()
        .or_else(|| args.as_sequence().and_then(|s| s.first()).and_then(Value::as_str))
        .ok_or_else(|| format!("expected an input name, got {}", describe(args)))?;
    // outside a topology there are no inputs to resolve against
    if ctx.in_topology() && !catalog.has_template(ctx.target(), Construct::Data, name) {
        return Err(format!("no input named '{}' was declared", name));
    }
    Ok(())
}

/// Finds which template `name` refers to and what type it has.
fn find_template<'c>(name: &str, ctx: &CheckContext, catalog: &'c Catalog) -> Option<(Construct, &'c str)> {
    [Construct::Node, Construct::Relationship, Construct::Group, Construct::Policy]
        .into_iter()
        .find_map(|construct| {
            let template = catalog.get_template(ctx.target(), construct, name)?;
            get_str(template, "type").map(|t| (construct, t))
        })
}

fn get_entity_facet(
    function: Function,
    facets: &[Facet],
    args: &Value,
    ctx: &CheckContext,
    catalog: &Catalog,
) -> Result<(), String> {
    let items = arity(args, 2, usize::MAX)?;
    let entity = items[0]
        .as_str()
        .ok_or_else(|| format!("expected an entity name, got {}", describe(items[0])))?;
    if KEYWORDS.contains(&entity) || !ctx.in_topology() {
        return Ok(());
    }

    let Some((construct, type_name)) = find_template(entity, ctx, catalog) else {
        return Err(format!("unknown template '{}'", entity));
    };
    let declares = |construct: Construct, type_name: &str, entry: &str| {
        facets.iter().any(|facet| {
            catalog
                .facets(construct, *facet, type_name)
                .any(|(name, _)| name == entry)
        })
    };
    let entry_kind = if function == Function::GetProperty { "property" } else { "attribute" };

    let first = items[1]
        .as_str()
        .ok_or_else(|| format!("expected a name, got {}", describe(items[1])))?;
    if items.len() == 2 || construct != Construct::Node {
        if !declares(construct, type_name, first) {
            return Err(format!(
                "template '{}' of type {} has no {} '{}'",
                entity, type_name, entry_kind, first
            ));
        }
        return Ok(());
    }

    // [node, capability_or_requirement, name, ...]
    if let Some(capability) = catalog.get_facet_definition(Construct::Node, type_name, Facet::Capabilities, first) {
        let Some(capability_type) = get_str(&capability, "type") else {
            return Ok(());
        };
        let Some(second) = items[2].as_str() else {
            return Err(format!("expected a name, got {}", describe(items[2])));
        };
        if !declares(Construct::Capability, capability_type, second) && !declares(construct, type_name, first) {
            return Err(format!(
                "capability '{}' of template '{}' has no {} '{}'",
                first, entity, entry_kind, second
            ));
        }
        return Ok(());
    }
    if catalog
        .get_requirement_definition(Construct::Node, type_name, first)
        .is_some()
        || declares(construct, type_name, first)
    {
        // a requirement or a nested property path
        return Ok(());
    }
    Err(format!(
        "template '{}' of type {} has no capability, requirement or {} '{}'",
        entity, type_name, entry_kind, first
    ))
}

fn get_nodes_of_type(args: &Value, catalog: &Catalog) -> Result<(), String> {
    let node_type = args
        .as_str()
        .ok_or_else(|| format!("expected a node type name, got {}", describe(args)))?;
    if !catalog.has_type(Construct::Node, node_type) {
        return Err(format!("unknown node type '{}'", node_type));
    }
    Ok(())
}

fn get_artifact(args: &Value, ctx: &CheckContext, catalog: &Catalog) -> Result<(), String> {
    let items = arity(args, 2, 4)?;
    all_strings(&items[..2])?;
    let entity = items[0].as_str().unwrap_or_default();
    if KEYWORDS.contains(&entity) || !ctx.in_topology() {
        return Ok(());
    }
    if !catalog.has_template(ctx.target(), Construct::Node, entity) {
        return Err(format!("unknown node template '{}'", entity));
    }
    Ok(())
}

fn concat(args: &Value, definition: &Value, ctx: &mut CheckContext, catalog: &Catalog) -> Result<(), String> {
    let items = arity(args, 1, usize::MAX)?;
    let mut nested_ok = true;
    for item in items {
        if let Some((function, nested)) = Function::recognize(item) {
            nested_ok &= function.evaluate(nested, definition, ctx, catalog);
        } else if item.is_mapping() || item.is_sequence() {
            return Err(format!("arguments must be strings or functions, got {}", describe(item)));
        }
    }
    if nested_ok {
        Ok(())
    } else {
        Err("invalid nested function".to_string())
    }
}

fn token(args: &Value, definition: &Value, ctx: &mut CheckContext, catalog: &Catalog) -> Result<(), String> {
    let items = arity(args, 3, 3)?;
    if let Some((function, nested)) = Function::recognize(items[0]) {
        if !function.evaluate(nested, definition, ctx, catalog) {
            return Err("invalid nested function".to_string());
        }
    } else if !items[0].is_string() {
        return Err(format!("expected a string to tokenize, got {}", describe(items[0])));
    }
    if !items[1].is_string() {
        return Err(format!("expected separator characters, got {}", describe(items[1])));
    }
    if items[2].as_u64().is_none() {
        return Err(format!("expected a substring index, got {}", describe(items[2])));
    }
    Ok(())
}
