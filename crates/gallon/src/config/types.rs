//! Configuration type definitions.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::codec::FieldSpec;
use crate::input::{FileInputConfig, InputFormat};
use crate::output::{Compression, FileOutputConfig, OutputFormat};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where records come from.
    pub input: InputConfig,

    /// Where records go.
    pub output: OutputConfig,

    /// Record layout shared by the input decoder and the output encoder.
    pub fields: Vec<FieldSpec>,
}

/// Input plugin configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Plugin type (only "file" for now).
    #[serde(default = "default_file")]
    pub r#type: String,

    /// Input file path.
    pub path: PathBuf,

    /// Input layout (default: jsonl).
    #[serde(default)]
    pub format: InputFormat,
}

/// Output plugin configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Plugin type (only "file" for now).
    #[serde(default = "default_file")]
    pub r#type: String,

    /// Output file path.
    pub path: PathBuf,

    /// Output layout (default: jsonl).
    #[serde(default)]
    pub format: OutputFormat,

    /// Output compression (default: none).
    #[serde(default)]
    pub compression: Compression,
}

impl InputConfig {
    pub fn file_config(&self) -> FileInputConfig {
        FileInputConfig {
            path: self.path.clone(),
            format: self.format,
        }
    }
}

impl OutputConfig {
    pub fn file_config(&self) -> FileOutputConfig {
        FileOutputConfig {
            path: self.path.clone(),
            format: self.format,
            compression: self.compression,
        }
    }
}

fn default_file() -> String {
    "file".to_string()
}
