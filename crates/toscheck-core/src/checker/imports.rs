//! The check pass of imported targets.
//!
//! Imports were parsed, validated and cataloged while their importer was
//! validated, and each import's `file` now holds the location it resolved
//! to. What remains is running their checks, once the importer is
//! cataloged too.

use serde_yaml::Value;
use tracing::debug;

use super::{CheckContext, Checker};
use crate::catalog::Catalog;
use crate::target::Location;
use crate::value::{get_str, single_entry};

pub(crate) fn check_imports(checker: &Checker, section: &Value, ctx: &mut CheckContext, catalog: &mut Catalog) {
    for (name, definition) in section.as_sequence().into_iter().flatten().filter_map(single_entry) {
        let Some(file) = get_str(definition, "file") else {
            continue;
        };
        // unresolved imports were reported while validating
        let Some(id) = catalog.find_target(&Location::from(file)) else {
            debug!(import = name, file, "Import was not resolved");
            continue;
        };
        if id == ctx.target() {
            continue;
        }
        checker.check_target(id, catalog);
    }
}
