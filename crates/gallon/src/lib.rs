//! # gallon
//!
//! Moves a stream of records from one data source to one data sink.
//!
//! The library is built around a few small pieces:
//!
//! - **Record** ([`Record`], [`Value`]): the positional interchange type
//! - **Pipe** ([`Pipe`]): a single-slot channel with an idempotent close,
//!   giving natural backpressure between producer and consumer
//! - **Plugins** ([`InputPlugin`], [`OutputPlugin`]): the two ends of a
//!   pipeline, each starting its own task in `connect`
//! - **Orchestrator** ([`Gallon`]): connects the output, then the input
//!
//! Ready-made plugins read JSON-lines files ([`FileInput`]), walk paginated
//! stores ([`PagedInput`]) and write JSON-lines or JSON-array files with
//! optional gzip compression ([`FileOutput`]).
//!
//! ## Example
//!
//! ```rust,no_run
//! use gallon::codec::{object_decoder, object_encoder, FieldSpec};
//! use gallon::{FileInput, FileInputConfig, FileOutput, FileOutputConfig, Gallon, ValueKind};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> gallon::Result<()> {
//!     let fields = vec![
//!         FieldSpec::new("id", ValueKind::String),
//!         FieldSpec::new("age", ValueKind::Int),
//!     ];
//!     let gallon = Gallon::new(
//!         FileInput::new(FileInputConfig::jsonl("users.jsonl"), object_decoder(fields.clone())),
//!         FileOutput::new(FileOutputConfig::jsonl("copy.jsonl"), object_encoder(fields)),
//!     );
//!
//!     let summary = gallon.run_to_completion(CancellationToken::new()).await?;
//!     println!("Copied {} records", summary.output.records);
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod core;
pub mod error;
pub mod input;
pub mod orchestrator;
pub mod output;
pub mod pipe;
pub mod plugin;

// Re-exports for convenient access
pub use config::Config;
pub use core::{Decoder, Encoder, Record, Value, ValueKind};
pub use error::{GallonError, PipeError, Result};
pub use input::{FileInput, FileInputConfig, PageFetcher, PagedInput, PagedInputConfig};
pub use orchestrator::{Gallon, RunHandle, RunSummary};
pub use output::{Compression, FileOutput, FileOutputConfig, OutputFormat};
pub use pipe::{Pipe, PipeReader, PipeWriter};
pub use plugin::{
    InputPlugin, OutputPlugin, PluginTask, SharedObserver, Stage, TracingObserver,
    TransferObserver, TransferStats,
};
