use serde_yaml::Value;

use super::Catalog;
use crate::construct::Construct;
use crate::value::get_str;

/// Lazy walk from a type up through its `derived_from` ancestors.
///
/// Each catalog level is searched from the most recently registered type
/// backwards; an ancestor must have been registered before its subtype at the
/// same level, otherwise the search continues in the parent catalog. Every
/// step moves strictly backwards within a level or up one level, so the walk
/// ends even when the declarations loop.
#[derive(Debug, Clone)]
pub struct Hierarchy<'a> {
    level: Option<&'a Catalog>,
    construct: Construct,
    /// Only registry positions below this one are still eligible at `level`.
    limit: usize,
    next: Option<&'a str>,
}

impl<'a> Hierarchy<'a> {
    pub(super) fn new(catalog: &'a Catalog, construct: Construct, name: &'a str) -> Self {
        Self {
            level: Some(catalog),
            construct,
            limit: catalog.types[construct.index()].len(),
            next: Some(name),
        }
    }
}

impl<'a> Iterator for Hierarchy<'a> {
    type Item = (&'a str, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let wanted = self.next?;
            let level = self.level?;
            let registry = &level.types[self.construct.index()];

            match registry.position(wanted) {
                Some(pos) if pos < self.limit => {
                    let (name, def) = registry.get_index(pos)?;
                    self.limit = pos;
                    self.next = get_str(def, "derived_from");
                    return Some((name, def));
                }
                _ => {
                    self.level = level.parent();
                    self.limit = self
                        .level
                        .map(|p| p.types[self.construct.index()].len())
                        .unwrap_or(0);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    fn names<'a>(h: Hierarchy<'a>) -> Vec<&'a str> {
        h.map(|(n, _)| n).collect()
    }

    #[test]
    fn test_walks_into_parent() {
        let mut base = Catalog::new();
        base.add_type(Construct::Node, "Root", yaml("{}"));
        base.add_type(Construct::Node, "Compute", yaml("derived_from: Root"));

        let mut child = Catalog::with_parent(Arc::new(base));
        child.add_type(Construct::Node, "Server", yaml("derived_from: Compute"));
        child.add_type(Construct::Node, "WebServer", yaml("derived_from: Server"));

        assert_eq!(
            names(child.hierarchy(Construct::Node, "WebServer")),
            vec!["WebServer", "Server", "Compute", "Root"]
        );
    }

    #[test]
    fn test_forward_reference_is_not_followed() {
        let mut catalog = Catalog::new();
        catalog.add_type(Construct::Node, "B", yaml("derived_from: A"));
        catalog.add_type(Construct::Node, "A", yaml("{}"));
        assert_eq!(names(catalog.hierarchy(Construct::Node, "B")), vec!["B"]);
    }

    #[test]
    fn test_shadowed_ancestor_comes_from_parent() {
        let mut base = Catalog::new();
        base.add_type(Construct::Node, "Root", yaml("{}"));
        base.add_type(Construct::Node, "Compute", yaml("derived_from: Root"));

        let mut child = Catalog::with_parent(Arc::new(base));
        child.add_type(Construct::Node, "Root", yaml("derived_from: Compute"));

        // child Root -> parent Compute -> parent Root, then stop
        let walked: Vec<_> = child.hierarchy(Construct::Node, "Root").collect();
        assert_eq!(walked.len(), 3);
        assert_eq!(get_str(walked[0].1, "derived_from"), Some("Compute"));
        assert_eq!(walked[2].0, "Root");
    }

    #[test]
    fn test_unknown_type_yields_nothing() {
        let catalog = Catalog::new();
        assert_eq!(catalog.hierarchy(Construct::Data, "nope").count(), 0);
    }
}
