//! Registration of the catalog and check rules by document path.

use serde_yaml::Value;
use std::collections::HashMap;

use super::{
    capabilities, imports, interfaces, nodes, properties, relationships, templates, topology, types,
    CheckContext, Checker,
};
use crate::catalog::Catalog;

/// A rule receives the value found at the path it is registered under.
pub(crate) type Rule = fn(&Checker, &Value, &mut CheckContext, &mut Catalog);

/// The two passes made over every target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    /// Registers types and templates.
    Catalog,
    /// Runs the consistency checks, with everything registered.
    Check,
}

/// Rules by pass and path. A path has at most one rule per pass.
pub(crate) struct Rules {
    catalog: HashMap<&'static str, Rule>,
    check: HashMap<&'static str, Rule>,
}

impl Rules {
    pub(crate) fn new() -> Self {
        let mut rules = Self {
            catalog: HashMap::new(),
            check: HashMap::new(),
        };

        rules.register(Pass::Catalog, "/data_types", types::catalog_data_types);
        rules.register(Pass::Catalog, "/capability_types", types::catalog_capability_types);
        rules.register(Pass::Catalog, "/relationship_types", types::catalog_relationship_types);
        rules.register(Pass::Catalog, "/artifact_types", types::catalog_artifact_types);
        rules.register(Pass::Catalog, "/interface_types", types::catalog_interface_types);
        rules.register(Pass::Catalog, "/node_types", types::catalog_node_types);
        rules.register(Pass::Catalog, "/group_types", types::catalog_group_types);
        rules.register(Pass::Catalog, "/policy_types", types::catalog_policy_types);
        rules.register(Pass::Catalog, "/topology_template", topology::catalog_topology);
        rules.register(Pass::Catalog, "/topology_template/inputs", topology::catalog_inputs);
        rules.register(
            Pass::Catalog,
            "/topology_template/node_templates",
            topology::catalog_node_templates,
        );
        rules.register(
            Pass::Catalog,
            "/topology_template/relationship_templates",
            topology::catalog_relationship_templates,
        );
        rules.register(Pass::Catalog, "/topology_template/groups", topology::catalog_groups);
        rules.register(Pass::Catalog, "/topology_template/policies", topology::catalog_policies);

        rules.register(Pass::Check, "/imports", imports::check_imports);
        rules.register(Pass::Check, "/data_types", types::check_data_types);
        rules.register(Pass::Check, "/artifact_types", types::check_artifact_types);
        rules.register(Pass::Check, "/capability_types", capabilities::check_capability_types);
        rules.register(Pass::Check, "/interface_types", interfaces::check_interface_types);
        rules.register(Pass::Check, "/relationship_types", relationships::check_relationship_types);
        rules.register(Pass::Check, "/node_types", nodes::check_node_types);
        rules.register(Pass::Check, "/group_types", types::check_group_types);
        rules.register(Pass::Check, "/policy_types", types::check_policy_types);
        rules.register(Pass::Check, "/topology_template", topology::check_topology);
        rules.register(Pass::Check, "/topology_template/inputs", properties::check_inputs);
        rules.register(Pass::Check, "/topology_template/outputs", properties::check_outputs);
        rules.register(
            Pass::Check,
            "/topology_template/node_templates",
            nodes::check_node_templates,
        );
        rules.register(
            Pass::Check,
            "/topology_template/relationship_templates",
            relationships::check_relationship_templates,
        );
        rules.register(Pass::Check, "/topology_template/groups", templates::check_groups);
        rules.register(Pass::Check, "/topology_template/policies", templates::check_policies);
        rules.register(
            Pass::Check,
            "/topology_template/substitution_mappings",
            topology::check_substitution_mappings,
        );
        rules.register(Pass::Check, "/topology_template/workflows", topology::check_workflows);

        rules
    }

    fn table(&self, pass: Pass) -> &HashMap<&'static str, Rule> {
        match pass {
            Pass::Catalog => &self.catalog,
            Pass::Check => &self.check,
        }
    }

    /// Registers a rule, replacing any rule already at `path` for `pass`.
    pub(crate) fn register(&mut self, pass: Pass, path: &'static str, rule: Rule) {
        let table = match pass {
            Pass::Catalog => &mut self.catalog,
            Pass::Check => &mut self.check,
        };
        table.insert(path, rule);
    }

    pub(crate) fn get(&self, pass: Pass, path: &str) -> Option<Rule> {
        self.table(pass).get(path).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_type_section_is_cataloged_and_checked() {
        let rules = Rules::new();
        for construct in crate::construct::Construct::ALL {
            let Some(section) = construct.types_section() else {
                continue;
            };
            let path = format!("/{}", section);
            assert!(rules.get(Pass::Catalog, &path).is_some(), "{}", path);
            assert!(rules.get(Pass::Check, &path).is_some(), "{}", path);
        }
    }

    #[test]
    fn test_unregistered_path() {
        let rules = Rules::new();
        assert!(rules.get(Pass::Check, "/metadata").is_none());
        assert!(rules.get(Pass::Catalog, "/imports").is_none());
        assert!(rules.get(Pass::Check, "/topology_template/workflows").is_some());
    }
}
