//! The closed taxonomy of TOSCA element kinds and the facets they carry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A category of TOSCA element.
///
/// Every type registry and template registry in the catalog is keyed by one
/// of these. `Requirement` and `Workflow` never carry a type set of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Construct {
    Data,
    Requirement,
    Capability,
    Relationship,
    Artifact,
    Interface,
    Node,
    Group,
    Policy,
    Workflow,
}

impl Construct {
    /// Number of constructs; sizes the per-construct registries.
    pub const COUNT: usize = 10;

    /// All constructs in declaration order.
    pub const ALL: [Construct; Construct::COUNT] = [
        Construct::Data,
        Construct::Requirement,
        Construct::Capability,
        Construct::Relationship,
        Construct::Artifact,
        Construct::Interface,
        Construct::Node,
        Construct::Group,
        Construct::Policy,
        Construct::Workflow,
    ];

    /// Position of this construct in [`Construct::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Returns true if documents may declare types of this construct.
    pub fn has_types(self) -> bool {
        !matches!(self, Construct::Requirement | Construct::Workflow)
    }

    /// The top-level document section holding type declarations, if any.
    pub fn types_section(self) -> Option<&'static str> {
        match self {
            Construct::Data => Some("data_types"),
            Construct::Capability => Some("capability_types"),
            Construct::Relationship => Some("relationship_types"),
            Construct::Artifact => Some("artifact_types"),
            Construct::Interface => Some("interface_types"),
            Construct::Node => Some("node_types"),
            Construct::Group => Some("group_types"),
            Construct::Policy => Some("policy_types"),
            Construct::Requirement | Construct::Workflow => None,
        }
    }

    /// Lowercase name used in diagnostics and serialized output.
    pub fn display_name(self) -> &'static str {
        match self {
            Construct::Data => "data",
            Construct::Requirement => "requirement",
            Construct::Capability => "capability",
            Construct::Relationship => "relationship",
            Construct::Artifact => "artifact",
            Construct::Interface => "interface",
            Construct::Node => "node",
            Construct::Group => "group",
            Construct::Policy => "policy",
            Construct::Workflow => "workflow",
        }
    }
}

impl fmt::Display for Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Construct::Data => "Data",
            Construct::Requirement => "Requirement",
            Construct::Capability => "Capability",
            Construct::Relationship => "Relationship",
            Construct::Artifact => "Artifact",
            Construct::Interface => "Interface",
            Construct::Node => "Node",
            Construct::Group => "Group",
            Construct::Policy => "Policy",
            Construct::Workflow => "Workflow",
        };
        f.write_str(name)
    }
}

impl FromStr for Construct {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Construct::ALL
            .iter()
            .copied()
            .find(|c| c.display_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown construct: {}", s))
    }
}

/// A named sub-collection of a type or template definition.
///
/// Each facet yields entries of a specific construct: `capabilities` entries
/// are capabilities, `properties` entries are data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facet {
    Inputs,
    Outputs,
    Properties,
    Attributes,
    Capabilities,
    Artifacts,
    Interfaces,
}

impl Facet {
    /// The construct this facet's entries resolve to.
    pub fn construct(self) -> Construct {
        match self {
            Facet::Inputs | Facet::Outputs | Facet::Properties | Facet::Attributes => {
                Construct::Data
            }
            Facet::Capabilities => Construct::Capability,
            Facet::Artifacts => Construct::Artifact,
            Facet::Interfaces => Construct::Interface,
        }
    }

    /// The key under which this facet appears in a definition.
    pub fn key(self) -> &'static str {
        match self {
            Facet::Inputs => "inputs",
            Facet::Outputs => "outputs",
            Facet::Properties => "properties",
            Facet::Attributes => "attributes",
            Facet::Capabilities => "capabilities",
            Facet::Artifacts => "artifacts",
            Facet::Interfaces => "interfaces",
        }
    }

    /// Singular form, for messages about one entry.
    pub fn singular(self) -> &'static str {
        match self {
            Facet::Inputs => "input",
            Facet::Outputs => "output",
            Facet::Properties => "property",
            Facet::Attributes => "attribute",
            Facet::Capabilities => "capability",
            Facet::Artifacts => "artifact",
            Facet::Interfaces => "interface",
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
