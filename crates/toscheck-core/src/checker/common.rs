//! Checks shared by the construct-specific rules.

use serde_yaml::Value;

use super::CheckContext;
use crate::catalog::Catalog;
use crate::construct::Construct;
use crate::value::{get_str, is_empty, map_entries};

/// Checks that a section or template has a non-empty definition.
pub(crate) fn check_definition(name: &str, definition: &Value, ctx: &mut CheckContext) -> bool {
    if definition.is_null() {
        ctx.add_error(format!("Missing definition for {}", name));
        return false;
    }
    if is_empty(definition) {
        ctx.add_error(format!("Empty definition for {}", name));
        return false;
    }
    true
}

/// Checks that a type has a definition. `A: {}` is a complete type.
pub(crate) fn check_type_definition(name: &str, definition: &Value, ctx: &mut CheckContext) -> bool {
    if definition.is_null() {
        ctx.add_error(format!("Missing definition for {}", name));
        return false;
    }
    true
}

/// Checks the `type` of a template or facet definition.
pub fn check_type(construct: Construct, spec: &Value, ctx: &mut CheckContext, catalog: &Catalog) -> bool {
    let Some(type_name) = get_str(spec, "type") else {
        ctx.add_error("Missing type specification");
        return false;
    };
    if !catalog.has_type(construct, type_name) {
        ctx.add_error(format!("Unknown {} type: {}", construct, type_name));
        return false;
    }
    true
}

pub(crate) fn check_type_reference(
    construct: Construct,
    names: &[&str],
    ctx: &mut CheckContext,
    catalog: &Catalog,
) -> bool {
    let mut ok = true;
    for name in names {
        if !catalog.has_type(construct, name) {
            ctx.add_error(format!(
                "Reference to {} type '{}' points to unknown type",
                construct, name
            ));
            ok = false;
        }
    }
    ok
}

/// True if the walk from `type_name` reaches a root type, i.e. every
/// `derived_from` along the way names a type that was declared in time.
pub(crate) fn hierarchy_resolved(construct: Construct, type_name: &str, catalog: &Catalog) -> bool {
    catalog
        .hierarchy(construct, type_name)
        .last()
        .is_some_and(|(_, def)| get_str(def, "derived_from").is_none())
}

/// Catalogs every entry of a `*_types` section.
pub(crate) fn catalog_types(construct: Construct, section: &Value, ctx: &mut CheckContext, catalog: &mut Catalog) {
    for (name, definition) in map_entries(section) {
        catalog_type(construct, name, definition, ctx, catalog);
    }
}

/// Registers one type and checks that its supertype is already known.
pub(crate) fn catalog_type(
    construct: Construct,
    name: &str,
    definition: &Value,
    ctx: &mut CheckContext,
    catalog: &mut Catalog,
) -> bool {
    let mut ctx = ctx.enter_construct(name, construct);
    if !catalog.add_type(construct, name, definition.clone()) {
        ctx.add_error(format!("{} type {} re-declaration", construct, name));
        return false;
    }

    let Some(supertype) = get_str(definition, "derived_from") else {
        return true;
    };
    if !catalog.has_type(construct, supertype) {
        ctx.add_error(format!(
            "{} type {} indicates a supertype that has not (yet) been declared: {}",
            construct, name, supertype
        ));
        return false;
    }
    if let Err(err) = catalog.check_hierarchy(construct, name) {
        ctx.add_error(err.to_string());
        return false;
    }
    true
}

/// Catalogs every entry of a template section.
pub(crate) fn catalog_templates(
    construct: Construct,
    section: &Value,
    ctx: &mut CheckContext,
    catalog: &mut Catalog,
) {
    for (name, definition) in map_entries(section) {
        catalog_template(construct, name, definition, ctx, catalog);
    }
}

pub(crate) fn catalog_template(
    construct: Construct,
    name: &str,
    definition: &Value,
    ctx: &mut CheckContext,
    catalog: &mut Catalog,
) {
    if let Err(err) = catalog.add_template(ctx.target(), construct, name, definition.clone()) {
        let mut ctx = ctx.enter(name);
        ctx.add_error(err.to_string());
    }
}

/// Checks a type definition section entry by entry.
pub(crate) fn check_entries(
    section: &str,
    definitions: &Value,
    ctx: &mut CheckContext,
    catalog: &Catalog,
    check: fn(&str, &Value, &mut CheckContext, &Catalog),
) {
    if !check_definition(section, definitions, ctx) {
        return;
    }
    for (name, definition) in map_entries(definitions) {
        check(name, definition, ctx, catalog);
    }
}

/// Opening steps shared by every type definition check: the definition is
/// present and its hierarchy resolved when it was cataloged.
pub(crate) fn type_preamble(
    construct: Construct,
    name: &str,
    definition: &Value,
    ctx: &mut CheckContext,
    catalog: &Catalog,
) -> bool {
    if !check_type_definition(name, definition, ctx) {
        return false;
    }
    // unresolved supertypes were reported while cataloging
    hierarchy_resolved(construct, name, catalog)
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
        let location = Location::builtin("common.yaml");
        let (id, _) = catalog.add_target(Target::new("common", location.clone()), None);
        (catalog, CheckContext::new(id, location))
    }

    #[test]
    fn test_catalog_type_reports_undeclared_supertype() {
        let (mut catalog, mut ctx) = setup();
        assert!(catalog_type(Construct::Node, "A", &yaml("{}"), &mut ctx, &mut catalog));
        assert!(!catalog_type(Construct::Node, "B", &yaml("derived_from: Z"), &mut ctx, &mut catalog));
        assert!(!catalog_type(Construct::Node, "A", &yaml("{}"), &mut ctx, &mut catalog));

        let messages: Vec<&str> = ctx.errors().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Node type B indicates a supertype that has not (yet) been declared: Z",
                "Node type A re-declaration",
            ]
        );
        assert_eq!(ctx.errors()[0].path, "/B");
        assert!(hierarchy_resolved(Construct::Node, "A", &catalog));
        assert!(!hierarchy_resolved(Construct::Node, "B", &catalog));
    }

    #[test]
    fn test_check_type() {
        let (mut catalog, mut ctx) = setup();
        catalog.add_type(Construct::Node, "A", yaml("{}"));
        assert!(check_type(Construct::Node, &yaml("type: A"), &mut ctx, &catalog));
        assert!(!check_type(Construct::Node, &yaml("type: B"), &mut ctx, &catalog));
        assert!(!check_type(Construct::Node, &yaml("properties: {}"), &mut ctx, &catalog));
        let messages: Vec<&str> = ctx.errors().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["Unknown Node type: B", "Missing type specification"]);
    }

    #[test]
    fn test_check_definition() {
        let (_, mut ctx) = setup();
        assert!(check_definition("inputs", &yaml("{a: 1}"), &mut ctx));
        assert!(!check_definition("inputs", &yaml("{}"), &mut ctx));
        assert!(!check_definition("inputs", &Value::Null, &mut ctx));
        assert!(check_type_definition("A", &yaml("{}"), &mut ctx));
        assert_eq!(ctx.errors().len(), 2);
    }
}
