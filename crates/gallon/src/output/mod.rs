//! Output plugins.

mod file;

pub use file::{Compression, FileOutput, FileOutputConfig, OutputFormat};
