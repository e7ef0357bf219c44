//! Error code catalog and lookup.
//!
//! This module provides access to the centralized error catalog, which maps
//! error codes (like "BT-2-1") to their metadata (subsystem, title, message
//! template).

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata for an error code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorCodeInfo {
    /// Subsystem name (e.g., "template", "parameters", "expression")
    pub subsystem: String,

    /// Short title for the error
    pub title: String,

    /// Default message used when a diagnostic has no problem statement
    pub message_template: String,

    /// When this error was introduced (version)
    pub since_version: String,
}

/// Global error catalog, embedded at compile time.
///
/// # Panics
///
/// Panics if the embedded JSON is invalid. This should only happen during
/// development if someone manually edits the catalog incorrectly.
pub static ERROR_CATALOG: Lazy<HashMap<String, ErrorCodeInfo>> = Lazy::new(|| {
    let json_data = include_str!("../error_catalog.json");
    serde_json::from_str(json_data).expect("Invalid error catalog JSON - this is a bug")
});

/// Look up error code information.
///
/// Returns `None` if the error code is not found in the catalog.
///
/// # Example
///
/// ```
/// use batch_error_reporting::catalog::get_error_info;
///
/// let info = get_error_info("BT-3-2").unwrap();
/// assert_eq!(info.title, "Unknown Function");
/// ```
pub fn get_error_info(code: &str) -> Option<&ErrorCodeInfo> {
    ERROR_CATALOG.get(code)
}

/// Get the subsystem name for an error code.
pub fn get_subsystem(code: &str) -> Option<&str> {
    ERROR_CATALOG.get(code).map(|info| info.subsystem.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_loads() {
        assert!(!ERROR_CATALOG.is_empty());
    }

    #[test]
    fn test_command_error_exists() {
        let info = get_error_info("BT-0-1").unwrap();
        assert_eq!(info.subsystem, "cli");
        assert_eq!(info.title, "Command Failed");
    }

    #[test]
    fn test_codes_match_their_subsystem_number() {
        let subsystems = [
            ("0", "cli"),
            ("1", "template"),
            ("2", "parameters"),
            ("3", "expression"),
            ("4", "packages"),
        ];
        for (code, info) in ERROR_CATALOG.iter() {
            let number = code.split('-').nth(1).unwrap();
            let expected = subsystems
                .iter()
                .find(|(n, _)| *n == number)
                .map(|(_, s)| *s)
                .unwrap_or_else(|| panic!("unexpected subsystem number in {}", code));
            assert_eq!(info.subsystem, expected, "subsystem mismatch for {}", code);
        }
    }

    #[test]
    fn test_get_subsystem() {
        assert_eq!(get_subsystem("BT-2-3"), Some("parameters"));
        assert_eq!(get_subsystem("BT-999-999"), None);
    }
}
