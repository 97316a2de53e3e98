//! Error types for the pipeline library.

use thiserror::Error;

/// Control-flow signals raised by the pipe itself.
///
/// Neither variant is a failure: `Closed` tells a producer to stop writing,
/// `EndOfStream` tells a consumer the stream is drained.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeError {
    /// A write was attempted on (or was pending when closing) a closed pipe.
    #[error("pipe is closed")]
    Closed,

    /// The pipe is closed and no record is pending.
    #[error("end of stream")]
    EndOfStream,
}

/// Main error type for pipeline operations.
#[derive(Error, Debug)]
pub enum GallonError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A plugin failed to start (destination not creatable, store unreachable).
    #[error("Failed to connect {plugin}: {message}")]
    Connect { plugin: String, message: String },

    /// A raw item could not be turned into a record.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A record could not be turned into raw bytes.
    #[error("Encode error: {0}")]
    Encode(String),

    /// Fetching a page from a paginated source failed.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// The other end closed the pipe while a plugin still had work to do.
    #[error("Pipe error: {0}")]
    Pipe(#[from] PipeError),

    /// A plugin task panicked or was aborted.
    #[error("Task error: {0}")]
    Task(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Run was cancelled (SIGINT, etc.)
    #[error("Run cancelled")]
    Cancelled,
}

impl GallonError {
    /// Create a Connect error naming the plugin that failed.
    pub fn connect(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        GallonError::Connect {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    /// Create a Decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        GallonError::Decode(message.into())
    }

    /// Create an Encode error.
    pub fn encode(message: impl Into<String>) -> Self {
        GallonError::Encode(message.into())
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            GallonError::Config(_) | GallonError::Yaml(_) => 1,
            GallonError::Connect { .. } => 2,
            GallonError::Decode(_) | GallonError::Encode(_) | GallonError::Json(_) => 3,
            GallonError::Fetch(_) => 4,
            GallonError::Pipe(_) | GallonError::Task(_) => 5,
            GallonError::Cancelled => 6,
            GallonError::Io(_) => 7,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, GallonError>;
