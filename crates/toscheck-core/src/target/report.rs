//! Per-target error reports.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use super::Location;

/// One problem found in a target document.
///
/// Target errors are recorded in a [`Report`], never propagated: a run
/// keeps going after them so that a single pass surfaces every problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{message}")]
pub struct TargetError {
    /// Location of the offending document.
    pub target: String,
    /// Slash-delimited path of the offending section, e.g. `/node_types/A`.
    pub path: String,
    /// Human readable description.
    pub message: String,
    /// Underlying cause, when the error wraps a lower-level failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl TargetError {
    pub fn new(target: &Location, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            target: target.to_string(),
            path: path.into(),
            message: message.into(),
            cause: None,
        }
    }

    /// Attaches the underlying cause.
    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }
}

/// Ordered list of the errors found in one target (or produced by a processor).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Report {
    errors: Vec<TargetError>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, error: TargetError) {
        self.errors.push(error);
    }

    pub fn extend(&mut self, errors: impl IntoIterator<Item = TargetError>) {
        self.errors.extend(errors);
    }

    /// Returns true if anything went wrong; callers should not trust catalog
    /// content contributed by a target whose report has errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TargetError> {
        self.errors.iter()
    }

    pub fn errors(&self) -> &[TargetError] {
        &self.errors
    }
}

impl<'a> IntoIterator for &'a Report {
    type Item = &'a TargetError;
    type IntoIter = std::slice::Iter<'a, TargetError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            return writeln!(f, "No errors");
        }
        let noun = if self.errors.len() == 1 { "error" } else { "errors" };
        writeln!(f, "{} {}", self.errors.len(), noun)?;
        for error in &self.errors {
            let path = if error.path.is_empty() { "/" } else { error.path.as_str() };
            writeln!(f, "  [{}] {}: {}", error.target, path, error.message)?;
            if let Some(cause) = &error.cause {
                writeln!(f, "      caused by: {}", cause)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report() {
        let report = Report::new();
        assert!(!report.has_errors());
        assert_eq!(report.to_string(), "No errors\n");
    }

    #[test]
    fn test_report_display() {
        let location = Location::builtin("a.yaml");
        let mut report = Report::new();
        report.add(TargetError::new(&location, "/node_types/A", "Unknown Node type: B"));
        report.add(TargetError::new(&location, "", "Failed to parse").with_cause("bad indent"));

        let text = report.to_string();
        assert!(report.has_errors());
        assert_eq!(report.len(), 2);
        assert!(text.starts_with("2 errors"));
        assert!(text.contains("[builtin:a.yaml] /node_types/A: Unknown Node type: B"));
        assert!(text.contains("caused by: bad indent"));
    }
}
