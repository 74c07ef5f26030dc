use thiserror::Error;

use crate::construct::Construct;

/// Errors raised by catalog operations.
///
/// The checker turns these into target errors; they only abort a run while
/// the common types are loading.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// A template name was declared twice in the same target.
    #[error("{construct} template '{name}' re-declaration")]
    DuplicateTemplate { construct: Construct, name: String },

    /// Following `derived_from` from a type leads back to it.
    #[error("{construct} type '{name}' is part of a derivation cycle")]
    CyclicHierarchy { construct: Construct, name: String },

    /// The import graph has a cycle, so there is no dependency-first order.
    #[error("Cyclic import between: {}", targets.join(", "))]
    CyclicImport { targets: Vec<String> },

    /// A target id that this catalog never handed out.
    #[error("No such target: {0}")]
    NoSuchTarget(usize),
}
