//! Documents embedded in the library.

/// Resource name of the normative TOSCA types.
pub const COMMON_TYPES: &str = "tosca/tosca-common-types.yaml";

const RESOURCES: &[(&str, &str)] = &[(
    COMMON_TYPES,
    include_str!("../resources/tosca/tosca-common-types.yaml"),
)];

/// Returns the text of an embedded resource.
pub fn lookup(name: &str) -> Option<&'static str> {
    RESOURCES
        .iter()
        .find(|(resource, _)| *resource == name)
        .map(|(_, text)| *text)
}

/// Names of all embedded resources.
pub fn names() -> impl Iterator<Item = &'static str> {
    RESOURCES.iter().map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let text = lookup(COMMON_TYPES).unwrap();
        assert!(text.starts_with("tosca_definitions_version"));
        assert!(lookup("tosca/missing.yaml").is_none());
        assert_eq!(names().count(), 1);
    }
}
