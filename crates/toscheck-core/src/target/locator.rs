//! Resolution of textual document references to targets.

use std::path::{Path, PathBuf};
use tracing::debug;

use super::{Location, Target};
use crate::resources;

/// Turns a reference (an import `file`, a command line argument) into a target.
pub trait TargetLocator {
    /// Adds a directory to search for relative references.
    ///
    /// Returns false if the directory was already registered.
    fn add_search_path(&mut self, path: PathBuf) -> bool;

    /// Registered search directories, in lookup order.
    fn search_paths(&self) -> &[PathBuf];

    /// Resolves a reference; the first successful strategy wins.
    fn resolve(&self, name: &str) -> Option<Target> {
        self.resolve_from(name, None)
    }

    /// Resolves a reference made by a document in `base`. Relative names are
    /// looked up in `base` before the search paths.
    fn resolve_from(&self, name: &str, base: Option<&Path>) -> Option<Target>;
}

/// Locator trying embedded resources, then absolute locations, then each
/// search path in order.
#[derive(Debug, Clone, Default)]
pub struct CommonLocator {
    search_paths: Vec<PathBuf>,
}

impl CommonLocator {
    /// Creates a locator with no search paths.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a locator searching the given directories.
    pub fn with_search_paths(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        let mut locator = Self::new();
        for path in paths {
            locator.add_search_path(path.into());
        }
        locator
    }

    fn resolve_builtin(&self, name: &str) -> Option<Target> {
        let resource = name.strip_prefix("builtin:").unwrap_or(name);
        resources::lookup(resource)?;
        Some(Target::new(name, Location::builtin(resource)))
    }

    fn resolve_absolute(&self, name: &str) -> Option<Target> {
        let path = Path::new(name.strip_prefix("file://").unwrap_or(name));
        if path.is_absolute() && path.is_file() {
            return Some(Target::new(name, Location::from_path(path)));
        }
        None
    }

    fn resolve_relative(&self, name: &str, base: Option<&Path>) -> Option<Target> {
        base.into_iter().chain(self.search_paths.iter().map(PathBuf::as_path)).find_map(|dir| {
            let candidate = dir.join(name);
            if candidate.is_file() {
                Some(Target::new(name, Location::from_path(&candidate)))
            } else {
                None
            }
        })
    }
}

impl TargetLocator for CommonLocator {
    fn add_search_path(&mut self, path: PathBuf) -> bool {
        if self.search_paths.contains(&path) {
            return false;
        }
        debug!(path = %path.display(), "Adding search path");
        self.search_paths.push(path);
        true
    }

    fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    fn resolve_from(&self, name: &str, base: Option<&Path>) -> Option<Target> {
        let target = self
            .resolve_builtin(name)
            .or_else(|| self.resolve_absolute(name))
            .or_else(|| self.resolve_relative(name, base));
        if target.is_none() {
            debug!(name, "Unable to resolve target");
        }
        target
    }
}
