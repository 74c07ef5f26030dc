//! TOSCA type catalog and consistency checker.
//!
//! A [`Checker`] takes TOSCA service templates through parsing, grammar
//! validation, cataloging and checking. Everything the documents declare
//! lands in a [`Catalog`]; everything wrong with them lands in each
//! [`Target`]'s [`Report`].

pub mod catalog;
pub mod checker;
pub mod config;
pub mod construct;
pub mod data;
pub mod error;
pub mod grammar;
pub mod processor;
pub mod resources;
pub mod target;
pub mod value;

pub use catalog::{Catalog, CatalogError, TargetId};
pub use checker::{CheckContext, Checker};
pub use config::{CheckerConfig, Config, ConfigError, OutputFormat};
pub use construct::{Construct, Facet};
pub use error::CheckerError;
pub use grammar::{Grammar, GrammarRegistry};
pub use processor::{Invocation, ProcessBuilder, Processor, ProcessorError, ProcessorRegistry};
pub use target::{CommonLocator, Location, Report, Target, TargetError, TargetLocator, TargetState};
