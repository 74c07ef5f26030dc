//! JSON projection of a checked catalog.

use serde::Serialize;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

use super::{Output, ProcessBuilder, Processor, ProcessorError};
use crate::catalog::{Catalog, TargetId};
use crate::construct::Construct;
use crate::target::{Report, TargetError, TargetState};

type ByConstruct<'c> = BTreeMap<&'static str, BTreeMap<&'c str, &'c Value>>;

/// Writes the catalog's types, and each target's templates, as JSON.
///
/// Options: `output=<file>` (default stdout), `pretty=true|false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportProcessor;

impl Processor for ExportProcessor {
    fn name(&self) -> &'static str {
        "export"
    }

    fn description(&self) -> &'static str {
        "Export types and templates as JSON"
    }

    fn process<'c>(&self, catalog: &'c Catalog) -> Box<dyn ProcessBuilder + 'c> {
        Box::new(ExportBuilder {
            catalog,
            output: Output::default(),
            pretty: true,
        })
    }
}

struct ExportBuilder<'c> {
    catalog: &'c Catalog,
    output: Output,
    pretty: bool,
}

#[derive(Debug, Serialize)]
struct CatalogExport<'c> {
    types: ByConstruct<'c>,
    targets: Vec<TargetExport<'c>>,
}

#[derive(Debug, Serialize)]
struct TargetExport<'c> {
    name: &'c str,
    location: &'c str,
    state: TargetState,
    imports: Vec<&'c str>,
    templates: ByConstruct<'c>,
    errors: &'c Report,
}

impl ProcessBuilder for ExportBuilder<'_> {
    fn with(&mut self, option: &str, value: &str) -> Result<(), ProcessorError> {
        match option {
            "output" => self.output = Output::File(PathBuf::from(value)),
            "pretty" => {
                self.pretty = value.parse().map_err(|_| ProcessorError::InvalidOption {
                    processor: "export".to_string(),
                    option: format!("{}={}", option, value),
                })?
            }
            _ => {
                return Err(ProcessorError::InvalidOption {
                    processor: "export".to_string(),
                    option: option.to_string(),
                })
            }
        }
        Ok(())
    }

    fn run(self: Box<Self>) -> Result<Report, ProcessorError> {
        let catalog = self.catalog;
        let mut report = Report::new();

        // an import cycle leaves admission order, which is still complete
        let order: Vec<TargetId> = catalog
            .sorted_targets()
            .unwrap_or_else(|_| catalog.targets().map(|(id, _)| id).collect());

        let mut targets = Vec::with_capacity(order.len());
        for id in order {
            let target = catalog.target(id);
            if target.state() == TargetState::Failed {
                report.add(TargetError::new(
                    target.location(),
                    "/",
                    format!("Target {} failed to validate, its templates are not exported", target.name()),
                ));
            }
            targets.push(TargetExport {
                name: target.name(),
                location: target.location().as_str(),
                state: target.state(),
                imports: catalog
                    .imports_of(id)
                    .map(|import| catalog.target(import).location().as_str())
                    .collect(),
                templates: by_construct(|construct| catalog.templates(id, construct)),
                errors: target.report(),
            });
        }

        let export = CatalogExport {
            types: by_construct(|construct| catalog.types(construct)),
            targets,
        };
        let mut text = if self.pretty {
            serde_json::to_string_pretty(&export)?
        } else {
            serde_json::to_string(&export)?
        };
        text.push('\n');
        self.output.write(&text)?;
        debug!(targets = export.targets.len(), "Exported catalog");
        Ok(report)
    }
}

/// Collects non-empty registries, keyed by construct name.
fn by_construct<'c, I>(entries: impl Fn(Construct) -> I) -> ByConstruct<'c>
where
    I: Iterator<Item = (&'c str, &'c Value)>,
{
    Construct::ALL
        .into_iter()
        .map(|construct| (construct.display_name(), entries(construct).collect::<BTreeMap<_, _>>()))
        .filter(|(_, registry)| !registry.is_empty())
        .collect()
}
