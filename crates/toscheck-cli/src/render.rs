//! Printing of check results.

use color_eyre::eyre::Result;
use serde::Serialize;
use toscheck_core::{Catalog, Report, TargetId, TargetState};

#[derive(Serialize)]
struct TargetOutput<'c> {
    name: &'c str,
    location: &'c str,
    state: TargetState,
    imported_from: Vec<&'c str>,
    errors: &'c Report,
}

#[derive(Serialize)]
struct CheckOutput<'c> {
    targets: Vec<TargetOutput<'c>>,
    /// Dependency-first order; empty when the imports form a cycle.
    order: Vec<&'c str>,
    errors: usize,
}

fn shown(catalog: &Catalog, show_imports: bool) -> Vec<TargetId> {
    catalog
        .targets()
        .map(|(id, _)| id)
        .filter(|id| show_imports || catalog.importers_of(*id).next().is_none())
        .collect()
}

fn error_count(catalog: &Catalog) -> usize {
    catalog.targets().map(|(_, target)| target.report().len()).sum()
}

/// Prints each target with its import chain and report, then the target
/// order. Returns true if no target has errors.
pub fn print_text(catalog: &Catalog, show_imports: bool) -> bool {
    for id in shown(catalog, show_imports) {
        let target = catalog.target(id);
        println!("{} [{}]", target.location(), target.state().display_name());
        print!("{}", catalog.import_string(id));
        for line in target.report().to_string().lines() {
            println!("  {}", line);
        }
    }

    match catalog.sorted_targets() {
        Ok(order) => {
            println!("Target order:");
            for id in order {
                println!("  {}", catalog.target(id).location());
            }
        }
        Err(err) => println!("No target order: {}", err),
    }

    let errors = error_count(catalog);
    if errors > 0 {
        println!("{} error(s) found", errors);
    }
    errors == 0
}

/// Prints the same content as one JSON document.
pub fn print_json(catalog: &Catalog, show_imports: bool) -> Result<bool> {
    let targets = shown(catalog, show_imports)
        .into_iter()
        .map(|id| {
            let target = catalog.target(id);
            TargetOutput {
                name: target.name(),
                location: target.location().as_str(),
                state: target.state(),
                imported_from: catalog
                    .importers_of(id)
                    .map(|importer| catalog.target(importer).location().as_str())
                    .collect(),
                errors: target.report(),
            }
        })
        .collect();
    let order = catalog
        .sorted_targets()
        .map(|ids| ids.into_iter().map(|id| catalog.target(id).location().as_str()).collect())
        .unwrap_or_default();
    let errors = error_count(catalog);

    let output = CheckOutput { targets, order, errors };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(errors == 0)
}
