//! Post-check processing of a catalog.
//!
//! A processor is looked up by name, configured with `key=value` options and
//! run over a fully checked catalog. Problems it finds come back as a
//! [`Report`]; only failures to produce its output are errors.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

mod export;
mod summary;

pub use export::ExportProcessor;
pub use summary::{ConstructCount, SummaryProcessor, TargetSummary};

use crate::catalog::Catalog;
use crate::error::CheckerError;
use crate::target::Report;

/// Processor errors.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// An option the processor does not understand, or a bad value for one.
    #[error("Invalid option '{option}' for processor {processor}")]
    InvalidOption { processor: String, option: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A named operation over a checked catalog.
pub trait Processor: Send + Sync {
    fn name(&self) -> &'static str;

    /// One-line description for help output.
    fn description(&self) -> &'static str;

    /// Starts configuring a run over `catalog`.
    fn process<'c>(&self, catalog: &'c Catalog) -> Box<dyn ProcessBuilder + 'c>;
}

/// One configured processor run.
pub trait ProcessBuilder {
    /// Sets an option; unknown options are rejected.
    fn with(&mut self, option: &str, value: &str) -> Result<(), ProcessorError>;

    /// Runs the processor, consuming the builder.
    fn run(self: Box<Self>) -> Result<Report, ProcessorError>;
}

/// A processor invocation as written on the command line:
/// `name[:key=value,...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub name: String,
    pub options: Vec<(String, String)>,
}

impl std::str::FromStr for Invocation {
    type Err = ProcessorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, rest) = match s.split_once(':') {
            Some((name, rest)) => (name, Some(rest)),
            None => (s, None),
        };
        let mut options = Vec::new();
        for option in rest.into_iter().flat_map(|r| r.split(',')).filter(|o| !o.is_empty()) {
            let Some((key, value)) = option.split_once('=') else {
                return Err(ProcessorError::InvalidOption {
                    processor: name.to_string(),
                    option: option.to_string(),
                });
            };
            options.push((key.trim().to_string(), value.trim().to_string()));
        }
        Ok(Self {
            name: name.trim().to_string(),
            options,
        })
    }
}

/// Registry of processors, keyed by name.
///
/// Registers the built-in processors on creation.
pub struct ProcessorRegistry {
    processors: BTreeMap<&'static str, Arc<dyn Processor>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            processors: BTreeMap::new(),
        };
        registry.register(Arc::new(ExportProcessor));
        registry.register(Arc::new(SummaryProcessor));
        registry
    }

    /// Registers a processor, replacing any of the same name.
    pub fn register(&mut self, processor: Arc<dyn Processor>) {
        self.processors.insert(processor.name(), processor);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Processor>> {
        self.processors.get(name).cloned()
    }

    /// Registered processors, sorted by name.
    pub fn list(&self) -> impl Iterator<Item = &dyn Processor> {
        self.processors.values().map(|p| p.as_ref())
    }

    /// Configures and runs one invocation.
    pub fn run(&self, invocation: &Invocation, catalog: &Catalog) -> Result<Report, CheckerError> {
        let processor = self
            .get(&invocation.name)
            .ok_or_else(|| CheckerError::UnknownProcessor(invocation.name.clone()))?;
        let mut builder = processor.process(catalog);
        for (option, value) in &invocation.options {
            builder.with(option, value)?;
        }
        Ok(builder.run()?)
    }
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Where a processor writes: stdout unless an `output` file is set.
#[derive(Debug, Clone, Default)]
pub(crate) enum Output {
    #[default]
    Stdout,
    File(PathBuf),
}

impl Output {
    pub(crate) fn write(&self, text: &str) -> Result<(), ProcessorError> {
        match self {
            Output::Stdout => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(text.as_bytes())?;
                stdout.flush()?;
            }
            Output::File(path) => std::fs::write(path, text)?,
        }
        Ok(())
    }
}
