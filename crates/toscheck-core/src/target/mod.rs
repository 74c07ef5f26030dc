//! Documents under check and where they come from.

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::fmt;
use std::path::{Path, PathBuf};

mod locator;
mod report;

pub use locator::{CommonLocator, TargetLocator};
pub use report::{Report, TargetError};

use crate::error::CheckerError;
use crate::resources;

const FILE_SCHEME: &str = "file://";
const BUILTIN_SCHEME: &str = "builtin:";
const INLINE_SCHEME: &str = "inline:";

/// Stable identity of a target.
///
/// `file://<absolute path>` for documents on disk, `builtin:<resource>` for
/// embedded resources, `inline:<name>` for text handed over directly. The
/// n-th document of a multi-document stream carries a `#n` fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Location(String);

impl Location {
    /// Location of a file on disk. Relative paths are made absolute.
    pub fn from_path(path: &Path) -> Self {
        let absolute = path
            .canonicalize()
            .or_else(|_| std::env::current_dir().map(|cwd| cwd.join(path)))
            .unwrap_or_else(|_| path.to_path_buf());
        Location(format!("{}{}", FILE_SCHEME, absolute.display()))
    }

    /// Location of an embedded resource.
    pub fn builtin(resource: &str) -> Self {
        Location(format!("{}{}", BUILTIN_SCHEME, resource))
    }

    /// Location of a document given as text rather than read from anywhere.
    pub fn inline(name: &str) -> Self {
        Location(format!("{}{}", INLINE_SCHEME, name))
    }

    pub fn is_inline(&self) -> bool {
        self.0.starts_with(INLINE_SCHEME)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The location without its fragment.
    pub fn base(&self) -> &str {
        match self.0.split_once('#') {
            Some((base, _)) => base,
            None => &self.0,
        }
    }

    pub fn fragment(&self) -> Option<&str> {
        self.0.split_once('#').map(|(_, fragment)| fragment)
    }

    /// Same document, different fragment.
    pub fn with_fragment(&self, fragment: impl fmt::Display) -> Self {
        Location(format!("{}#{}", self.base(), fragment))
    }

    /// Filesystem path, for `file://` locations.
    pub fn path(&self) -> Option<PathBuf> {
        self.base().strip_prefix(FILE_SCHEME).map(PathBuf::from)
    }

    /// Resource name, for `builtin:` locations.
    pub fn resource(&self) -> Option<&str> {
        self.base().strip_prefix(BUILTIN_SCHEME)
    }

    /// Directory containing the document, for `file://` locations.
    pub fn directory(&self) -> Option<PathBuf> {
        self.path().and_then(|p| p.parent().map(Path::to_path_buf))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Location {
    fn from(s: &str) -> Self {
        Location(s.to_string())
    }
}

/// Processing stage reached by a target.
///
/// Unparsed → Parsed → Validated → Cataloged → Checked; a parse or grammar
/// failure moves the target to Failed and it goes no further.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetState {
    #[default]
    Unparsed,
    Parsed,
    Validated,
    Cataloged,
    Checked,
    Failed,
}

impl TargetState {
    /// Returns the next state on the success path.
    pub fn next(&self) -> Option<TargetState> {
        match self {
            TargetState::Unparsed => Some(TargetState::Parsed),
            TargetState::Parsed => Some(TargetState::Validated),
            TargetState::Validated => Some(TargetState::Cataloged),
            TargetState::Cataloged => Some(TargetState::Checked),
            TargetState::Checked | TargetState::Failed => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TargetState::Unparsed => "Unparsed",
            TargetState::Parsed => "Parsed",
            TargetState::Validated => "Validated",
            TargetState::Cataloged => "Cataloged",
            TargetState::Checked => "Checked",
            TargetState::Failed => "Failed",
        }
    }
}

/// One document under check.
#[derive(Debug, Clone)]
pub struct Target {
    name: String,
    location: Location,
    source: Option<String>,
    document: Option<Value>,
    report: Report,
    state: TargetState,
}

impl Target {
    pub fn new(name: impl Into<String>, location: Location) -> Self {
        Self {
            name: name.into(),
            location,
            source: None,
            document: None,
            report: Report::new(),
            state: TargetState::Unparsed,
        }
    }

    /// A target for a file on disk, named after the file.
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self::new(name, Location::from_path(path))
    }

    /// A target whose text is already in memory.
    pub fn inline(name: impl Into<String>, source: impl Into<String>) -> Self {
        let name = name.into();
        let location = Location::inline(&name);
        Self {
            source: Some(source.into()),
            ..Self::new(name, location)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// The parsed (and, once validated, canonicalized) document.
    pub fn document(&self) -> Option<&Value> {
        self.document.as_ref()
    }

    pub fn document_mut(&mut self) -> Option<&mut Value> {
        self.document.as_mut()
    }

    pub fn set_document(&mut self, document: Value) {
        self.document = Some(document);
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn report_mut(&mut self) -> &mut Report {
        &mut self.report
    }

    /// Records an error against this target.
    pub fn report_error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        let error = TargetError::new(&self.location, path, message);
        self.report.add(error);
    }

    pub fn state(&self) -> TargetState {
        self.state
    }

    pub fn set_state(&mut self, state: TargetState) {
        self.state = state;
    }

    /// Reads the raw document text.
    pub fn open(&self) -> Result<String, CheckerError> {
        if let Some(source) = &self.source {
            return Ok(source.clone());
        }
        if let Some(resource) = self.location.resource() {
            return resources::lookup(resource)
                .map(str::to_string)
                .ok_or_else(|| CheckerError::TargetNotFound(self.location.to_string()));
        }
        let path = self
            .location
            .path()
            .ok_or_else(|| CheckerError::TargetNotFound(self.location.to_string()))?;
        std::fs::read_to_string(&path).map_err(|e| CheckerError::io(self.location.to_string(), e))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_fragment() {
        let location = Location::from("file:///tmp/a.yaml");
        let second = location.with_fragment(1);
        assert_eq!(second.as_str(), "file:///tmp/a.yaml#1");
        assert_eq!(second.fragment(), Some("1"));
        assert_eq!(second.with_fragment(2).as_str(), "file:///tmp/a.yaml#2");
        assert_eq!(second.path(), Some(PathBuf::from("/tmp/a.yaml")));
        assert_eq!(second.directory(), Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_builtin_location() {
        let location = Location::builtin("tosca/x.yaml");
        assert_eq!(location.resource(), Some("tosca/x.yaml"));
        assert_eq!(location.path(), None);
    }

    #[test]
    fn test_state_progression() {
        let mut state = TargetState::Unparsed;
        let mut seen = vec![state];
        while let Some(next) = state.next() {
            state = next;
            seen.push(state);
        }
        assert_eq!(seen.last(), Some(&TargetState::Checked));
        assert_eq!(seen.len(), 5);
        assert_eq!(TargetState::Failed.next(), None);
    }

    #[test]
    fn test_inline_target() {
        let target = Target::inline("snippet", "a: 1");
        assert!(target.location().is_inline());
        assert_eq!(target.location().as_str(), "inline:snippet");
        assert_eq!(target.open().unwrap(), "a: 1");
        assert_eq!(target.location().directory(), None);
    }

    #[test]
    fn test_open_missing_builtin() {
        let target = Target::new("nope", Location::builtin("nope.yaml"));
        assert!(matches!(target.open(), Err(CheckerError::TargetNotFound(_))));
    }
}
