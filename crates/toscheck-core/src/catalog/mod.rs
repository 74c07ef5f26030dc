//! The type and template catalog.
//!
//! A catalog indexes every type declared by the targets of a run, every
//! template declared by each target, and the import graph between targets.
//! Catalogs nest: a lookup that misses locally falls through to the parent,
//! which is how the common base types are shared between runs.

use serde_yaml::{Mapping, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

mod error;
mod hierarchy;
mod registry;

pub use error::CatalogError;
pub use hierarchy::Hierarchy;
pub use registry::Registry;

use crate::construct::{Construct, Facet};
use crate::target::{Location, Target};
use crate::value::{self, field_entries, get_seq, get_str, single_entry};

/// Handle to a target owned by a [`Catalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(usize);

impl TargetId {
    pub fn index(self) -> usize {
        self.0
    }
}

type ConstructRegistries = [Registry; Construct::COUNT];

fn registries() -> ConstructRegistries {
    std::array::from_fn(|_| Registry::default())
}

/// Index of types, templates and targets.
#[derive(Debug, Default)]
pub struct Catalog {
    parent: Option<Arc<Catalog>>,
    types: ConstructRegistries,
    targets: Vec<Target>,
    locations: HashMap<Location, TargetId>,
    /// Edges `(importer, imported)`, in the order they were first seen.
    imports: Vec<(TargetId, TargetId)>,
    templates: HashMap<TargetId, ConstructRegistries>,
}

impl Catalog {
    /// Creates an empty catalog with no parent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty catalog delegating missed type lookups to `parent`.
    pub fn with_parent(parent: Arc<Catalog>) -> Self {
        Self {
            parent: Some(parent),
            ..Self::default()
        }
    }

    pub fn parent(&self) -> Option<&Catalog> {
        self.parent.as_deref()
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    /// Registers a type at this level.
    ///
    /// Returns false, leaving the existing definition in place, if this level
    /// already holds a type of that name. A parent's type of the same name is
    /// shadowed, not a conflict.
    pub fn add_type(&mut self, construct: Construct, name: &str, definition: Value) -> bool {
        self.types[construct.index()].insert(name, definition)
    }

    /// Finds a type definition here or in an ancestor catalog.
    pub fn get_type_definition(&self, construct: Construct, name: &str) -> Option<&Value> {
        self.types[construct.index()]
            .get(name)
            .or_else(|| self.parent().and_then(|p| p.get_type_definition(construct, name)))
    }

    pub fn has_type(&self, construct: Construct, name: &str) -> bool {
        self.get_type_definition(construct, name).is_some()
    }

    /// Types registered at this level, in registration order.
    pub fn types(&self, construct: Construct) -> impl Iterator<Item = (&str, &Value)> {
        self.types[construct.index()].iter()
    }

    /// The chain from `name` up through its `derived_from` ancestors.
    pub fn hierarchy<'a>(&'a self, construct: Construct, name: &'a str) -> Hierarchy<'a> {
        Hierarchy::new(self, construct, name)
    }

    /// True if `base` appears in the hierarchy of `name`. Every type is derived
    /// from itself.
    pub fn is_derived_from(&self, construct: Construct, name: &str, base: &str) -> bool {
        self.hierarchy(construct, name).any(|(n, _)| n == base)
    }

    /// Follows `derived_from` by name and fails if a type is met twice.
    pub fn check_hierarchy(&self, construct: Construct, name: &str) -> Result<(), CatalogError> {
        let mut visited = HashSet::new();
        let mut current = Some(name);
        while let Some(n) = current {
            if !visited.insert(n) {
                return Err(CatalogError::CyclicHierarchy {
                    construct,
                    name: name.to_string(),
                });
            }
            current = self
                .get_type_definition(construct, n)
                .and_then(|def| get_str(def, "derived_from"));
        }
        Ok(())
    }

    /// The entries of a facet across the hierarchy of `name`.
    ///
    /// An entry redeclared by a subtype hides the ancestor's entry of the same
    /// name; the fields of the two are not merged.
    pub fn facets<'a>(
        &'a self,
        construct: Construct,
        facet: Facet,
        name: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a Value)> + 'a {
        let mut seen = HashSet::new();
        self.hierarchy(construct, name)
            .flat_map(move |(_, def)| field_entries(def, facet.key()))
            .filter(move |(entry, _)| seen.insert(*entry))
    }

    /// The definition of one facet entry, merged across the hierarchy.
    ///
    /// Walking from `name` towards the root, fields missing from the more
    /// specialized definitions are filled in from the ancestors.
    pub fn get_facet_definition(
        &self,
        construct: Construct,
        name: &str,
        facet: Facet,
        entry: &str,
    ) -> Option<Value> {
        let mut merged: Option<Mapping> = None;
        for (_, def) in self.hierarchy(construct, name) {
            let Some(increment) = def.get(facet.key()).and_then(|f| f.get(entry)) else {
                continue;
            };
            let Some(map) = increment.as_mapping() else {
                if merged.is_none() {
                    return Some(increment.clone());
                }
                continue;
            };
            if let Some(acc) = merged.as_mut() {
                value::merge_absent(acc, map);
            } else {
                merged = Some(map.clone());
            }
        }
        merged.map(Value::Mapping)
    }

    /// Requirement definitions across the hierarchy of a node type; the most
    /// specialized definition of each name wins.
    pub fn requirements<'a>(&'a self, name: &'a str) -> impl Iterator<Item = (&'a str, &'a Value)> + 'a {
        let mut seen = HashSet::new();
        self.hierarchy(Construct::Node, name)
            .flat_map(|(_, def)| get_seq(def, "requirements").into_iter().flatten())
            .filter_map(single_entry)
            .filter(move |(req, _)| seen.insert(*req))
    }

    /// Finds a requirement definition by name, scanning each level's
    /// `requirements` sequence from the most specialized type up.
    pub fn get_requirement_definition<'a>(
        &'a self,
        construct: Construct,
        name: &'a str,
        requirement: &str,
    ) -> Option<&'a Value> {
        self.hierarchy(construct, name).find_map(move |(_, def)| {
            get_seq(def, "requirements")?
                .iter()
                .filter_map(single_entry)
                .find(|(req, _)| *req == requirement)
                .map(|(_, req_def)| req_def)
        })
    }

    // ------------------------------------------------------------------
    // Templates
    // ------------------------------------------------------------------

    /// Registers a template of `target`.
    pub fn add_template(
        &mut self,
        target: TargetId,
        construct: Construct,
        name: &str,
        definition: Value,
    ) -> Result<(), CatalogError> {
        let registries = self.templates.entry(target).or_insert_with(registries);
        if registries[construct.index()].insert(name, definition) {
            Ok(())
        } else {
            Err(CatalogError::DuplicateTemplate {
                construct,
                name: name.to_string(),
            })
        }
    }

    pub fn get_template(&self, target: TargetId, construct: Construct, name: &str) -> Option<&Value> {
        self.templates
            .get(&target)
            .and_then(|r| r[construct.index()].get(name))
    }

    pub fn has_template(&self, target: TargetId, construct: Construct, name: &str) -> bool {
        self.get_template(target, construct, name).is_some()
    }

    /// Templates of one construct declared by `target`, in declaration order.
    pub fn templates(&self, target: TargetId, construct: Construct) -> impl Iterator<Item = (&str, &Value)> {
        self.templates
            .get(&target)
            .into_iter()
            .flat_map(move |r| r[construct.index()].iter())
    }

    // ------------------------------------------------------------------
    // Targets and imports
    // ------------------------------------------------------------------

    /// Admits a target, keyed by location, and records the import edge from
    /// `importer` when one is given.
    ///
    /// Returns the target's id and whether it was newly added; a target that
    /// was seen before is dropped in favour of the existing one.
    pub fn add_target(&mut self, target: Target, importer: Option<TargetId>) -> (TargetId, bool) {
        let (id, added) = match self.locations.get(target.location()) {
            Some(&id) => (id, false),
            None => {
                let id = TargetId(self.targets.len());
                self.locations.insert(target.location().clone(), id);
                self.targets.push(target);
                (id, true)
            }
        };
        if let Some(importer) = importer {
            if !self.imports.contains(&(importer, id)) {
                self.imports.push((importer, id));
            }
        }
        (id, added)
    }

    pub fn target(&self, id: TargetId) -> &Target {
        &self.targets[id.0]
    }

    pub fn target_mut(&mut self, id: TargetId) -> &mut Target {
        &mut self.targets[id.0]
    }

    /// Checked access for ids coming from outside this catalog.
    pub fn get_target(&self, id: TargetId) -> Result<&Target, CatalogError> {
        self.targets.get(id.0).ok_or(CatalogError::NoSuchTarget(id.0))
    }

    pub fn find_target(&self, location: &Location) -> Option<TargetId> {
        self.locations.get(location).copied()
    }

    /// All targets, in the order they were admitted.
    pub fn targets(&self) -> impl Iterator<Item = (TargetId, &Target)> {
        self.targets.iter().enumerate().map(|(i, t)| (TargetId(i), t))
    }

    /// Targets imported by `id`.
    pub fn imports_of(&self, id: TargetId) -> impl Iterator<Item = TargetId> + '_ {
        self.imports.iter().filter(move |(from, _)| *from == id).map(|(_, to)| *to)
    }

    /// Targets importing `id`.
    pub fn importers_of(&self, id: TargetId) -> impl Iterator<Item = TargetId> + '_ {
        self.imports.iter().filter(move |(_, to)| *to == id).map(|(from, _)| *from)
    }

    /// Targets nobody imports: the entry points of the import forest.
    pub fn top_targets(&self) -> Vec<TargetId> {
        let imported: HashSet<TargetId> = self.imports.iter().map(|(_, to)| *to).collect();
        self.targets()
            .map(|(id, _)| id)
            .filter(|id| !imported.contains(id))
            .collect()
    }

    /// All targets ordered so that every target comes after the targets it
    /// imports. Ties keep admission order.
    pub fn sorted_targets(&self) -> Result<Vec<TargetId>, CatalogError> {
        let count = self.targets.len();
        let mut pending = vec![0usize; count];
        let mut importers: Vec<Vec<TargetId>> = vec![Vec::new(); count];
        for &(from, to) in &self.imports {
            pending[from.0] += 1;
            importers[to.0].push(from);
        }

        let mut ready: VecDeque<TargetId> = (0..count)
            .filter(|&i| pending[i] == 0)
            .map(TargetId)
            .collect();
        let mut sorted = Vec::with_capacity(count);
        while let Some(id) = ready.pop_front() {
            sorted.push(id);
            for &importer in &importers[id.0] {
                pending[importer.0] -= 1;
                if pending[importer.0] == 0 {
                    ready.push_back(importer);
                }
            }
        }

        if sorted.len() < count {
            let targets = (0..count)
                .filter(|&i| pending[i] > 0)
                .map(|i| self.targets[i].location().to_string())
                .collect();
            return Err(CatalogError::CyclicImport { targets });
        }
        Ok(sorted)
    }

    /// Describes how `id` was reached, one `from <location>` line per importer,
    /// indented by import depth.
    pub fn import_string(&self, id: TargetId) -> String {
        let mut out = String::new();
        let mut visited = HashSet::from([id]);
        self.import_chain(id, 1, &mut visited, &mut out);
        out
    }

    fn import_chain(&self, id: TargetId, depth: usize, visited: &mut HashSet<TargetId>, out: &mut String) {
        let importers: Vec<TargetId> = self.importers_of(id).collect();
        for importer in importers {
            if !visited.insert(importer) {
                continue;
            }
            out.push_str(&"  ".repeat(depth));
            out.push_str("from ");
            out.push_str(self.targets[importer.0].location().as_str());
            out.push('\n');
            self.import_chain(importer, depth + 1, visited, out);
        }
    }
}
