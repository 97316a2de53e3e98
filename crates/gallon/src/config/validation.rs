//! Configuration validation.

use std::collections::HashSet;

use tracing::warn;

use super::Config;
use crate::error::{GallonError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Input validation
    if config.input.r#type != "file" {
        return Err(GallonError::Config(format!(
            "input.type must be 'file', got '{}'",
            config.input.r#type
        )));
    }
    if config.input.path.as_os_str().is_empty() {
        return Err(GallonError::Config("input.path is required".into()));
    }

    // Output validation
    if config.output.r#type != "file" {
        return Err(GallonError::Config(format!(
            "output.type must be 'file', got '{}'",
            config.output.r#type
        )));
    }
    if config.output.path.as_os_str().is_empty() {
        return Err(GallonError::Config("output.path is required".into()));
    }

    // Reading and truncating the same file would lose the input
    if config.input.path == config.output.path {
        return Err(GallonError::Config(
            "input and output cannot be the same file".into(),
        ));
    }

    // Field validation
    if config.fields.is_empty() {
        return Err(GallonError::Config("fields must list at least one field".into()));
    }
    let mut seen = HashSet::new();
    for field in &config.fields {
        if field.name.is_empty() {
            return Err(GallonError::Config("fields[].name is required".into()));
        }
        if !seen.insert(field.name.as_str()) {
            return Err(GallonError::Config(format!(
                "field '{}' is listed more than once",
                field.name
            )));
        }
    }

    let suffix = config.output.compression.extension_suffix();
    if !suffix.is_empty() && !config.output.path.to_string_lossy().ends_with(suffix) {
        warn!(
            "output.path {:?} is {}-compressed but does not end in {}",
            config.output.path, config.output.compression, suffix
        );
    }

    Ok(())
}
