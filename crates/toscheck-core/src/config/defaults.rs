//! Default values for toscheck configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// Checker Defaults
// ============================================================================

/// Directories searched for relative imports, before the importer's own.
pub const DEFAULT_SEARCH_PATHS: &[&str] = &["."];

/// Common type documents loaded into the base catalog.
pub const DEFAULT_COMMONS: &[&str] = &[crate::resources::COMMON_TYPES];

/// Whether the common types are loaded at all.
pub const DEFAULT_USE_COMMONS: bool = true;

// ============================================================================
// Logging Defaults
// ============================================================================

/// Log level used when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

// ============================================================================
// Report Defaults
// ============================================================================

/// Default report format: "text" or "json".
pub const DEFAULT_REPORT_FORMAT: &str = "text";

/// Whether imported targets' reports are printed along with the checked ones.
pub const DEFAULT_SHOW_IMPORTS: bool = true;

// ============================================================================
// File Locations
// ============================================================================

/// Project-local config file name.
pub const PROJECT_CONFIG_FILE: &str = "toscheck.toml";

/// Subdirectory of the user config directory.
pub const USER_CONFIG_DIR: &str = "toscheck";

/// User config file name.
pub const USER_CONFIG_FILE: &str = "config.toml";

// ============================================================================
// Environment Variables
// ============================================================================

/// Extra search paths, `:`-separated.
pub const ENV_SEARCH_PATH: &str = "TOSCHECK_SEARCH_PATH";

/// Disables the common types when set to anything.
pub const ENV_NO_COMMONS: &str = "TOSCHECK_NO_COMMONS";

pub const ENV_LOG: &str = "TOSCHECK_LOG";

pub const ENV_REPORT_FORMAT: &str = "TOSCHECK_REPORT_FORMAT";
