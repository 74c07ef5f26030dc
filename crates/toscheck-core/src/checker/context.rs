//! Traversal state carried through the rules while one target is checked.

use std::ops::{Deref, DerefMut};
use tracing::trace;

use crate::catalog::TargetId;
use crate::construct::Construct;
use crate::target::{Location, TargetError};

/// Where the checker currently is inside a target document.
///
/// Keeps a stack of section names (rendered as a slash-delimited path in
/// diagnostics) and, in parallel, which construct each name stands for, so
/// that nested rules can ask for the enclosing node template or type.
/// Errors are collected here and moved into the target's report once the
/// pass is over.
#[derive(Debug)]
pub struct CheckContext {
    target: TargetId,
    location: Location,
    elems: Vec<String>,
    constructs: Vec<Option<Construct>>,
    errors: Vec<TargetError>,
}

impl CheckContext {
    pub fn new(target: TargetId, location: Location) -> Self {
        Self {
            target,
            location,
            elems: Vec::new(),
            constructs: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// The target being checked.
    pub fn target(&self) -> TargetId {
        self.target
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Enters a plain section; leaving happens when the returned scope drops.
    pub fn enter(&mut self, name: &str) -> Scope<'_> {
        self.push(name, None)
    }

    /// Enters a section that names an instance of `construct`.
    pub fn enter_construct(&mut self, name: &str, construct: Construct) -> Scope<'_> {
        self.push(name, Some(construct))
    }

    fn push(&mut self, name: &str, construct: Option<Construct>) -> Scope<'_> {
        self.elems.push(name.to_string());
        self.constructs.push(construct);
        trace!(path = %self.path(), "Entering");
        Scope { ctx: self }
    }

    fn pop(&mut self) {
        trace!(path = %self.path(), "Leaving");
        self.elems.pop();
        self.constructs.pop();
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.elems.len()
    }

    /// Slash-delimited path of the current position, e.g. `/node_types/A`.
    pub fn path(&self) -> String {
        let mut path = String::new();
        for elem in &self.elems {
            path.push('/');
            path.push_str(elem);
        }
        if path.is_empty() {
            path.push('/');
        }
        path
    }

    /// Name of the innermost enclosing section standing for `construct`.
    pub fn enclosing_construct(&self, construct: Construct) -> Option<&str> {
        self.constructs
            .iter()
            .zip(&self.elems)
            .rev()
            .find(|(c, _)| **c == Some(construct))
            .map(|(_, name)| name.as_str())
    }

    /// Returns true if the current position is inside `topology_template`.
    pub fn in_topology(&self) -> bool {
        self.elems.first().map(String::as_str) == Some("topology_template")
    }

    /// Records an error at the current path.
    pub fn add_error(&mut self, message: impl Into<String>) {
        let error = TargetError::new(&self.location, self.path(), message);
        self.errors.push(error);
    }

    /// Records an error at the current path, with its underlying cause.
    pub fn add_error_with_cause(&mut self, message: impl Into<String>, cause: impl std::fmt::Display) {
        let error = TargetError::new(&self.location, self.path(), message).with_cause(cause);
        self.errors.push(error);
    }

    pub fn errors(&self) -> &[TargetError] {
        &self.errors
    }

    /// Takes the collected errors, leaving none behind.
    pub fn take_errors(&mut self) -> Vec<TargetError> {
        std::mem::take(&mut self.errors)
    }
}

/// One entered section. Dropping it leaves the section, so enter and exit
/// always pair up, early returns included.
#[derive(Debug)]
pub struct Scope<'c> {
    ctx: &'c mut CheckContext,
}

impl Deref for Scope<'_> {
    type Target = CheckContext;

    fn deref(&self) -> &CheckContext {
        self.ctx
    }
}

impl DerefMut for Scope<'_> {
    fn deref_mut(&mut self) -> &mut CheckContext {
        self.ctx
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        self.ctx.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::target::Target;

    fn context() -> CheckContext {
        let mut catalog = Catalog::new();
        let location = Location::builtin("ctx.yaml");
        let (id, _) = catalog.add_target(Target::new("ctx", location.clone()), None);
        CheckContext::new(id, location)
    }

    #[test]
    fn test_path_and_balance() {
        let mut ctx = context();
        assert_eq!(ctx.path(), "/");
        {
            let mut types = ctx.enter("node_types");
            let mut node = types.enter_construct("A", Construct::Node);
            assert_eq!(node.path(), "/node_types/A");
            node.add_error("boom");
        }
        assert_eq!(ctx.depth(), 0);
        assert_eq!(ctx.errors()[0].path, "/node_types/A");
    }

    #[test]
    fn test_early_return_leaves_scope() {
        fn nested(ctx: &mut CheckContext) -> Option<()> {
            let mut scope = ctx.enter("capabilities");
            let _inner = scope.enter("endpoint");
            let missing: Option<()> = None;
            missing?;
            Some(())
        }

        let mut ctx = context();
        assert!(nested(&mut ctx).is_none());
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn test_enclosing_construct() {
        let mut ctx = context();
        let mut templates = ctx.enter("topology_template");
        let mut nodes = templates.enter("node_templates");
        let mut node = nodes.enter_construct("server", Construct::Node);
        let mut caps = node.enter("capabilities");
        let cap = caps.enter_construct("host", Construct::Capability);

        assert_eq!(cap.enclosing_construct(Construct::Node), Some("server"));
        assert_eq!(cap.enclosing_construct(Construct::Capability), Some("host"));
        assert_eq!(cap.enclosing_construct(Construct::Group), None);
        assert!(cap.in_topology());
    }
}
