//! Hierarchy-aware checks of facet definitions and assignments.
//!
//! A facet is a named collection carried by a construct: properties,
//! attributes, capabilities, interfaces, and so on. Types declare facet
//! entries, subtypes may redefine them, and instances (templates, or
//! capability definitions inside a node type) assign or augment them.

use serde_yaml::{Mapping, Value};
use std::collections::HashSet;

use super::CheckContext;
use crate::catalog::Catalog;
use crate::construct::{Construct, Facet};
use crate::data::{self, is_required};
use crate::value::{entries, get_map, get_str, merge_absent};

/// Facet entries, across the hierarchy of `type_name`, whose own type is
/// derived from `facet_type`. The most specialized entry of each name wins.
pub(crate) fn find_type_facet_by_type<'c>(
    catalog: &'c Catalog,
    construct: Construct,
    type_name: &'c str,
    facet: Facet,
    facet_type: &str,
) -> Vec<(&'c str, &'c Value)> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();
    for (_, def) in catalog.hierarchy(construct, type_name) {
        for (name, entry) in get_map(def, facet.key()).into_iter().flat_map(entries) {
            let Some(entry_type) = get_str(entry, "type") else {
                continue;
            };
            if catalog.is_derived_from(facet.construct(), entry_type, facet_type) && seen.insert(name) {
                found.push((name, entry));
            }
        }
    }
    found
}

/// Checks that facet entries redefined by type `type_name` keep a type
/// compatible with the one given by each ancestor.
pub(crate) fn check_type_construct_facet(
    construct: Construct,
    type_name: &str,
    definition: &Value,
    facet: Facet,
    ctx: &mut CheckContext,
    catalog: &Catalog,
) -> bool {
    let Some(defs) = get_map(definition, facet.key()) else {
        return true;
    };

    let mut hierarchy = catalog.hierarchy(construct, type_name);
    if hierarchy.next().is_none() {
        ctx.add_error(format!(
            "The {} type {} needs to be cataloged before its {} can be checked",
            construct.display_name(),
            type_name,
            facet
        ));
        return false;
    }

    let mut ok = true;
    for (super_name, super_def) in hierarchy {
        let Some(super_defs) = get_map(super_def, facet.key()) else {
            continue;
        };
        for (entry, def) in entries(defs) {
            let Some(super_entry) = super_defs.get(entry) else {
                continue;
            };
            if super_entry == def {
                continue;
            }
            // an entry without a type is reported by the definition checks
            let (Some(entry_type), Some(super_type)) = (get_str(def, "type"), get_str(super_entry, "type")) else {
                continue;
            };
            if !catalog.is_derived_from(facet.construct(), entry_type, super_type) {
                ctx.add_error(format!(
                    "{} type {}, {} redefinition changed its type: {} has been re-defined between the {} types {} and {} in an incompatible manner",
                    construct, type_name, facet, entry, construct.display_name(), super_name, type_name
                ));
                ok = false;
            }
        }
    }
    ok
}

/// Checks a facet augmentation: `spec` (e.g. a capability definition inside a
/// node type) re-declares entries already defined by its own type.
pub(crate) fn check_facet_augmentation(
    construct: Construct,
    spec: &Value,
    facet: Facet,
    ctx: &mut CheckContext,
    catalog: &Catalog,
) -> bool {
    let Some(augmentations) = get_map(spec, facet.key()) else {
        return true;
    };
    let Some(spec_type) = get_str(spec, "type") else {
        ctx.add_error("No specification type available");
        return false;
    };

    let mut ok = true;
    let mut ctx = ctx.enter(facet.key());
    for (name, augmentation) in entries(augmentations) {
        let mut ctx = ctx.enter(name);
        let Some(definition) = catalog.get_facet_definition(construct, spec_type, facet, name) else {
            ctx.add_error(format!(
                "Unknown {} {} '{}' (not declared by the type {})",
                construct.display_name(),
                facet.singular(),
                name,
                spec_type
            ));
            ok = false;
            continue;
        };

        let augmented_type = get_str(augmentation, "type");
        let defined_type = get_str(&definition, "type");
        if augmented_type.is_some() && augmented_type != defined_type {
            ctx.add_error(format!(
                "{} {} {} has a different type than its definition: {} instead of {}",
                construct,
                facet.singular(),
                name,
                augmented_type.unwrap_or_default(),
                defined_type.unwrap_or("none")
            ));
            ok = false;
            continue;
        }

        if let Some(default) = augmentation.get("default") {
            let mut merged = augmentation.as_mapping().cloned().unwrap_or_default();
            if let Some(base) = definition.as_mapping() {
                merge_absent(&mut merged, base);
            }
            ok &= data::check_data_valuation(default, &Value::Mapping(merged), &mut ctx, catalog);
        }
    }
    ok
}

/// Checks the assignments of `facet` in `spec` against the definitions the
/// type `spec_type` accumulates over its hierarchy.
///
/// Unknown entries are errors; known ones are evaluated against their
/// definition. For properties, entries the type requires and that carry no
/// default must be assigned.
pub(crate) fn check_facet(
    construct: Construct,
    spec: &Value,
    spec_type: &str,
    facet: Facet,
    ctx: &mut CheckContext,
    catalog: &Catalog,
) -> bool {
    let empty = Mapping::new();
    let assignments = get_map(spec, facet.key()).unwrap_or(&empty);

    let mut ok = true;
    let mut ctx = ctx.enter(facet.key());
    for (name, value) in entries(assignments) {
        let mut ctx = ctx.enter(name);
        match catalog.get_facet_definition(construct, spec_type, facet, name) {
            Some(definition) => ok &= data::check_data_valuation(value, &definition, &mut ctx, catalog),
            None => {
                ctx.add_error(format!(
                    "Unknown {} {} '{}' (not declared by the type {})",
                    construct.display_name(),
                    facet.singular(),
                    name,
                    spec_type
                ));
                ok = false;
            }
        }
    }

    if facet == Facet::Properties {
        let missing: Vec<&str> = catalog
            .facets(construct, facet, spec_type)
            .filter(|(name, def)| {
                is_required(def) && def.get("default").is_none() && !assignments.contains_key(*name)
            })
            .map(|(name, _)| name)
            .collect();
        if !missing.is_empty() {
            ctx.add_error(format!(
                "{} {} missing required values for: [{}]",
                construct,
                facet,
                missing.join(", ")
            ));
            ok = false;
        }
    }
    ok
}
