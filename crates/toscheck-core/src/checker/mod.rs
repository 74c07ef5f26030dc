//! The checking pipeline.
//!
//! Every target goes through parse, grammar validation, cataloging and
//! checking. Imports are resolved and cataloged eagerly while their importer
//! is validated, so that the importer's checks see every imported type;
//! their own check pass runs later, from the importer's `/imports` rule.

use ignore::WalkBuilder;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

mod capabilities;
pub mod common;
mod context;
mod facets;
mod imports;
mod interfaces;
mod nodes;
mod properties;
mod relationships;
mod requirements;
mod rules;
mod templates;
mod topology;
mod types;

pub use context::{CheckContext, Scope};
pub use rules::Pass;

use crate::catalog::{Catalog, CatalogError, TargetId};
use crate::config::CheckerConfig;
use crate::construct::Construct;
use crate::data::CoreType;
use crate::error::CheckerError;
use crate::grammar::GrammarRegistry;
use crate::target::{CommonLocator, Location, Target, TargetError, TargetLocator, TargetState};
use crate::value::{get_seq, get_str, key, single_entry};
use rules::Rules;

const YAML_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// Parses, validates, catalogs and checks TOSCA documents.
///
/// A checker owns the locator used to resolve imports and a catalog of base
/// types (the core data types plus the configured common types) which every
/// catalog it creates uses as its parent.
pub struct Checker {
    locator: Box<dyn TargetLocator>,
    grammars: GrammarRegistry,
    rules: Rules,
    base: Arc<Catalog>,
}

impl Checker {
    /// Creates a checker with the default configuration.
    pub fn new() -> Result<Self, CheckerError> {
        Self::with_config(&CheckerConfig::default())
    }

    pub fn with_config(config: &CheckerConfig) -> Result<Self, CheckerError> {
        let locator = CommonLocator::with_search_paths(config.search_paths.iter().map(PathBuf::from));
        Self::with_locator(Box::new(locator), config)
    }

    /// Creates a checker resolving references through `locator`.
    ///
    /// Fails if a common types document cannot be found or is not clean.
    pub fn with_locator(locator: Box<dyn TargetLocator>, config: &CheckerConfig) -> Result<Self, CheckerError> {
        let mut checker = Self {
            locator,
            grammars: GrammarRegistry::new(),
            rules: Rules::new(),
            base: Arc::new(Catalog::new()),
        };
        let commons: &[String] = if config.use_commons { &config.commons } else { &[] };
        let base = checker.load_base(commons)?;
        checker.base = Arc::new(base);
        Ok(checker)
    }

    fn load_base(&mut self, commons: &[String]) -> Result<Catalog, CheckerError> {
        let mut catalog = Catalog::new();
        for core in CoreType::ALL {
            catalog.add_type(Construct::Data, core.name(), Value::Mapping(Mapping::new()));
        }

        for name in commons {
            let target = self
                .locator
                .resolve(name)
                .ok_or_else(|| CheckerError::Commons(format!("Unable to locate {}", name)))?;
            self.check(target, &mut catalog)?;
        }

        let failures: Vec<String> = catalog
            .targets()
            .filter(|(_, target)| target.report().has_errors())
            .map(|(_, target)| format!("{}: {}", target.location(), target.report()))
            .collect();
        if !failures.is_empty() {
            return Err(CheckerError::Commons(failures.join("\n")));
        }
        debug!(targets = catalog.targets().count(), "Loaded base types");
        Ok(catalog)
    }

    /// The catalog of base types.
    pub fn base_catalog(&self) -> &Catalog {
        &self.base
    }

    /// A fresh catalog for one run, layered over the base types.
    pub fn new_catalog(&self) -> Catalog {
        Catalog::with_parent(Arc::clone(&self.base))
    }

    pub fn locator(&self) -> &dyn TargetLocator {
        self.locator.as_ref()
    }

    pub fn locator_mut(&mut self) -> &mut dyn TargetLocator {
        self.locator.as_mut()
    }

    /// Checks a file, or every YAML file below a directory, in a new catalog.
    pub fn check_path(&mut self, path: &Path) -> Result<Catalog, CheckerError> {
        let mut catalog = self.new_catalog();
        if path.is_dir() {
            let walker = WalkBuilder::new(path).hidden(true).git_ignore(true).build();
            let mut files: Vec<PathBuf> = walker
                .flatten()
                .map(|entry| entry.into_path())
                .filter(|file| file.is_file() && is_yaml(file))
                .collect();
            files.sort();
            for file in files {
                self.check(Target::from_path(&file), &mut catalog)?;
            }
        } else if path.is_file() {
            self.check(Target::from_path(path), &mut catalog)?;
        } else {
            return Err(CheckerError::TargetNotFound(path.display().to_string()));
        }
        Ok(catalog)
    }

    /// Checks a document given as text.
    pub fn check_source(&mut self, name: &str, source: &str, catalog: &mut Catalog) -> Result<TargetId, CheckerError> {
        self.check(Target::inline(name, source), catalog)
    }

    /// Runs the whole pipeline on `target` and on everything it imports.
    ///
    /// A target whose location the catalog already holds is not processed
    /// again. Problems in the documents end up in their reports; only a
    /// target that cannot be read at all is an error here.
    pub fn check(&mut self, target: Target, catalog: &mut Catalog) -> Result<TargetId, CheckerError> {
        let (id, added) = catalog.add_target(target, None);
        if !added {
            debug!(location = %catalog.target(id).location(), "Target already processed");
            return Ok(id);
        }

        for document in self.parse_target(id, catalog)? {
            if self.validate_target(document, catalog)? {
                self.catalog_target(document, catalog);
                self.check_target(document, catalog);
            }
        }

        let target = catalog.target(id);
        info!(location = %target.location(), errors = target.report().len(), "Checked target");
        Ok(id)
    }

    /// Reads and parses a target.
    ///
    /// Returns the targets holding the parsed documents: the target itself,
    /// or for a stream of several documents one new target per document.
    fn parse_target(&self, id: TargetId, catalog: &mut Catalog) -> Result<Vec<TargetId>, CheckerError> {
        let text = catalog.target(id).open()?;
        let location = catalog.target(id).location().clone();

        let mut documents = match parse_documents(&text) {
            Ok(documents) => documents,
            Err(err) => {
                let target = catalog.target_mut(id);
                target
                    .report_mut()
                    .add(TargetError::new(&location, "/", "Failed to parse document").with_cause(err));
                target.set_state(TargetState::Failed);
                return Ok(Vec::new());
            }
        };
        debug!(%location, documents = documents.len(), "Parsed target");

        if documents.len() <= 1 {
            let target = catalog.target_mut(id);
            target.set_document(documents.pop().unwrap_or(Value::Null));
            target.set_state(TargetState::Parsed);
            return Ok(vec![id]);
        }

        let name = catalog.target(id).name().to_string();
        catalog.target_mut(id).set_state(TargetState::Parsed);
        let mut parsed = Vec::with_capacity(documents.len());
        for (index, document) in documents.into_iter().enumerate() {
            let mut part = Target::new(format!("{}#{}", name, index), location.with_fragment(index));
            part.set_document(document);
            part.set_state(TargetState::Parsed);
            let (part_id, _) = catalog.add_target(part, Some(id));
            parsed.push(part_id);
        }
        Ok(parsed)
    }

    /// Grammar validation, then import processing.
    ///
    /// Returns false if the target failed validation.
    fn validate_target(&mut self, id: TargetId, catalog: &mut Catalog) -> Result<bool, CheckerError> {
        let Some(document) = catalog.target(id).document() else {
            return Ok(false);
        };
        let grammar = self.grammars.select(document);
        let validation = grammar.validate(document);

        let target = catalog.target_mut(id);
        if !validation.is_valid() {
            debug!(location = %target.location(), violations = validation.violations.len(), "Grammar violations");
            for violation in validation.violations {
                target.report_error(violation.path, violation.message);
            }
            target.set_state(TargetState::Failed);
            return Ok(false);
        }
        if let Some(document) = target.document_mut() {
            validation.apply(document);
        }

        self.process_imports(id, catalog)?;
        catalog.target_mut(id).set_state(TargetState::Validated);
        Ok(true)
    }

    fn process_imports(&mut self, id: TargetId, catalog: &mut Catalog) -> Result<(), CheckerError> {
        let location = catalog.target(id).location().clone();
        let directory = location.directory();
        if let Some(directory) = &directory {
            self.locator.add_search_path(directory.clone());
        }

        let imports: Vec<(usize, String, String)> = catalog
            .target(id)
            .document()
            .and_then(|document| get_seq(document, "imports"))
            .into_iter()
            .flatten()
            .enumerate()
            .filter_map(|(index, import)| {
                let (name, definition) = single_entry(import)?;
                let file = get_str(definition, "file")?;
                Some((index, name.to_string(), file.to_string()))
            })
            .collect();

        for (index, name, file) in imports {
            let path = format!("/imports/{}/{}", index, name);
            let Some(import) = self.locator.resolve_from(&file, directory.as_deref()) else {
                warn!(%location, file, "Failure to resolve import");
                catalog
                    .target_mut(id)
                    .report_error(path, format!("Failure to resolve import '{}'", file));
                continue;
            };

            let import_location = import.location().clone();
            rewrite_import(catalog.target_mut(id), index, &name, &import_location);

            let (import_id, added) = catalog.add_target(import, Some(id));
            if added {
                self.load_import(id, import_id, &path, &file, catalog)?;
            } else if matches!(
                catalog.target(import_id).state(),
                TargetState::Unparsed | TargetState::Parsed
            ) {
                let cycle = CatalogError::CyclicImport {
                    targets: vec![location.to_string(), import_location.to_string()],
                };
                catalog.target_mut(id).report_error(path, cycle.to_string());
            }
        }
        Ok(())
    }

    /// Parses, validates and catalogs a newly seen import of `importer`.
    fn load_import(
        &mut self,
        importer: TargetId,
        id: TargetId,
        path: &str,
        file: &str,
        catalog: &mut Catalog,
    ) -> Result<(), CheckerError> {
        let location = catalog.target(importer).location().clone();
        let parsed = match self.parse_target(id, catalog) {
            Ok(parsed) => parsed,
            Err(err) => {
                catalog.target_mut(id).set_state(TargetState::Failed);
                let error = TargetError::new(&location, path, format!("Failure parsing import '{}'", file))
                    .with_cause(err);
                catalog.target_mut(importer).report_mut().add(error);
                return Ok(());
            }
        };

        let document = match parsed.as_slice() {
            [] => {
                catalog
                    .target_mut(importer)
                    .report_error(path, format!("Failure parsing import '{}'", file));
                return Ok(());
            }
            [document] => *document,
            _ => {
                catalog.target_mut(importer).report_error(
                    path,
                    format!("Import '{}' holds multiple documents", file),
                );
                return Ok(());
            }
        };

        if !self.validate_target(document, catalog)? {
            catalog
                .target_mut(importer)
                .report_error(path, format!("Failure validating import '{}'", file));
            return Ok(());
        }
        self.catalog_target(document, catalog);
        Ok(())
    }

    /// Pass 1: registers the target's types and templates.
    fn catalog_target(&self, id: TargetId, catalog: &mut Catalog) {
        let Some(document) = catalog.target(id).document().cloned() else {
            return;
        };
        let mut ctx = CheckContext::new(id, catalog.target(id).location().clone());
        self.dispatch(Pass::Catalog, &document, &mut ctx, catalog);

        let target = catalog.target_mut(id);
        target.report_mut().extend(ctx.take_errors());
        target.set_state(TargetState::Cataloged);
        debug!(location = %target.location(), "Cataloged target");
    }

    /// Pass 2: runs the consistency checks. Only cataloged targets are
    /// checked, and each at most once.
    pub(crate) fn check_target(&self, id: TargetId, catalog: &mut Catalog) {
        if catalog.target(id).state() != TargetState::Cataloged {
            return;
        }
        catalog.target_mut(id).set_state(TargetState::Checked);

        let Some(document) = catalog.target(id).document().cloned() else {
            return;
        };
        let mut ctx = CheckContext::new(id, catalog.target(id).location().clone());
        self.dispatch(Pass::Check, &document, &mut ctx, catalog);
        catalog.target_mut(id).report_mut().extend(ctx.take_errors());
    }

    /// Runs the rules registered for `pass` on each section of `value`.
    ///
    /// Sections without a rule are skipped.
    pub(crate) fn dispatch(&self, pass: Pass, value: &Value, ctx: &mut CheckContext, catalog: &mut Catalog) {
        for (section, content) in value.as_mapping().into_iter().flatten() {
            let Some(section) = section.as_str() else {
                continue;
            };
            let mut ctx = ctx.enter(section);
            if let Some(rule) = self.rules.get(pass, &ctx.path()) {
                rule(self, content, &mut ctx, catalog);
            }
        }
    }
}

impl std::fmt::Debug for Checker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checker")
            .field("search_paths", &self.locator.search_paths())
            .field("grammars", &self.grammars)
            .finish()
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| YAML_EXTENSIONS.contains(&ext))
}

fn parse_documents(text: &str) -> Result<Vec<Value>, serde_yaml::Error> {
    serde_yaml::Deserializer::from_str(text)
        .map(Value::deserialize)
        .collect()
}

/// Points an import at the location it resolved to.
fn rewrite_import(importer: &mut Target, index: usize, name: &str, resolved: &Location) {
    let definition = importer
        .document_mut()
        .and_then(|document| document.get_mut("imports"))
        .and_then(|imports| imports.get_mut(index))
        .and_then(|import| import.get_mut(name))
        .and_then(Value::as_mapping_mut);
    if let Some(definition) = definition {
        definition.insert(key("file"), Value::String(resolved.to_string()));
    }
}
