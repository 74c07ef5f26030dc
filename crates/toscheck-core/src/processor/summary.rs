//! Per-target template counts.

use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;

use super::{Output, ProcessBuilder, Processor, ProcessorError};
use crate::catalog::Catalog;
use crate::construct::Construct;
use crate::target::{Report, TargetState};

/// Counts each target's templates per construct.
///
/// Options: `output=<file>` (default stdout), `format=text|json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryProcessor;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstructCount {
    pub construct: Construct,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetSummary {
    pub location: String,
    pub state: TargetState,
    pub errors: usize,
    pub templates: Vec<ConstructCount>,
}

impl SummaryProcessor {
    /// Summaries of every target, in admission order.
    pub fn summarize(catalog: &Catalog) -> Vec<TargetSummary> {
        catalog
            .targets()
            .map(|(id, target)| TargetSummary {
                location: target.location().to_string(),
                state: target.state(),
                errors: target.report().len(),
                templates: Construct::ALL
                    .into_iter()
                    .map(|construct| ConstructCount {
                        construct,
                        count: catalog.templates(id, construct).count(),
                    })
                    .filter(|c| c.count > 0)
                    .collect(),
            })
            .collect()
    }
}

impl Processor for SummaryProcessor {
    fn name(&self) -> &'static str {
        "summary"
    }

    fn description(&self) -> &'static str {
        "Count templates per construct in each target"
    }

    fn process<'c>(&self, catalog: &'c Catalog) -> Box<dyn ProcessBuilder + 'c> {
        Box::new(SummaryBuilder {
            catalog,
            output: Output::default(),
            json: false,
        })
    }
}

struct SummaryBuilder<'c> {
    catalog: &'c Catalog,
    output: Output,
    json: bool,
}

impl ProcessBuilder for SummaryBuilder<'_> {
    fn with(&mut self, option: &str, value: &str) -> Result<(), ProcessorError> {
        match (option, value) {
            ("output", file) => self.output = Output::File(PathBuf::from(file)),
            ("format", "json") => self.json = true,
            ("format", "text") => self.json = false,
            _ => {
                return Err(ProcessorError::InvalidOption {
                    processor: "summary".to_string(),
                    option: format!("{}={}", option, value),
                })
            }
        }
        Ok(())
    }

    fn run(self: Box<Self>) -> Result<Report, ProcessorError> {
        let summaries = SummaryProcessor::summarize(self.catalog);
        let text = if self.json {
            let mut json = serde_json::to_string_pretty(&summaries)?;
            json.push('\n');
            json
        } else {
            render(&summaries)
        };
        self.output.write(&text)?;
        Ok(Report::new())
    }
}

fn render(summaries: &[TargetSummary]) -> String {
    let mut out = String::new();
    for summary in summaries {
        let _ = writeln!(
            out,
            "{} [{}] {} error(s)",
            summary.location,
            summary.state.display_name(),
            summary.errors
        );
        for count in &summary.templates {
            let _ = writeln!(out, "  {} templates: {}", count.construct.display_name(), count.count);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{Location, Target};
    use serde_yaml::Value;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn test_summarize() {
        let mut catalog = Catalog::new();
        let (id, _) = catalog.add_target(Target::new("main", Location::builtin("main.yaml")), None);
        catalog.add_template(id, Construct::Node, "web", yaml("type: Server")).unwrap();
        catalog.add_template(id, Construct::Node, "db", yaml("type: Database")).unwrap();
        catalog.add_template(id, Construct::Group, "tier", yaml("type: Tier")).unwrap();
        catalog.target_mut(id).report_error("/", "Unknown Node type: Tier");

        let summaries = SummaryProcessor::summarize(&catalog);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].errors, 1);
        assert_eq!(
            summaries[0].templates,
            vec![
                ConstructCount { construct: Construct::Node, count: 2 },
                ConstructCount { construct: Construct::Group, count: 1 },
            ]
        );

        let text = render(&summaries);
        assert!(text.starts_with("builtin:main.yaml [Unparsed] 1 error(s)"));
        assert!(text.contains("  node templates: 2"));
    }
}
