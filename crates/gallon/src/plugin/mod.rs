//! Plugin contract for the two ends of a pipeline.
//!
//! - [`InputPlugin`]: retrieves raw items, decodes them and writes records
//!   into a [`PipeWriter`]
//! - [`OutputPlugin`]: reads records from a [`PipeReader`], encodes and
//!   persists them
//!
//! # Connect semantics
//!
//! `connect` does the setup synchronously (open the file, probe the store)
//! and returns its error directly. It then spawns the transfer loop and
//! hands back a [`PluginTask`]. Errors inside that loop never reach the
//! caller through `connect`; per-item failures and fatal task errors go to
//! the plugin's [`TransferObserver`].
//!
//! Whatever way the loop ends, the plugin's pipe handle is closed, so the
//! other side never waits on a peer that has gone away.

mod observer;
mod task;

pub use observer::{SharedObserver, Stage, TracingObserver, TransferObserver};
pub use task::{PluginTask, TransferStats};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::pipe::{PipeReader, PipeWriter};

/// Produces records into a pipe.
#[async_trait]
pub trait InputPlugin: Send + Sync {
    /// Short identifier used in logs and errors (e.g., "file-input").
    fn name(&self) -> &str;

    /// Start producing into `writer`.
    ///
    /// The spawned task writes records in retrieval order and closes the
    /// pipe exactly once when the source is exhausted, a configured limit is
    /// reached, `cancel` fires, or the reader goes away.
    async fn connect(&self, cancel: CancellationToken, writer: PipeWriter) -> Result<PluginTask>;
}

/// Consumes records from a pipe.
#[async_trait]
pub trait OutputPlugin: Send + Sync {
    /// Short identifier used in logs and errors (e.g., "file-output").
    fn name(&self) -> &str;

    /// Start consuming from `reader`.
    ///
    /// The spawned task reads until end of stream or until `cancel` fires,
    /// then releases its destination.
    async fn connect(&self, cancel: CancellationToken, reader: PipeReader) -> Result<PluginTask>;
}
