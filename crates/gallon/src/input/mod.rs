//! Input plugins.
//!
//! - [`FileInput`]: one raw item per line of a JSON-lines file
//! - [`PagedInput`]: a paginated scan over any [`PageFetcher`]
//!
//! Both drive the same [`Producer`] loop body: decode one raw item, skip it
//! on failure, otherwise write it into the pipe.

mod file;
mod paged;

pub use file::{FileInput, FileInputConfig, InputFormat};
pub use paged::{Page, PageFetcher, PageRequest, PagedInput, PagedInputConfig};

use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::Decoder;
use crate::error::GallonError;
use crate::pipe::PipeWriter;
use crate::plugin::{SharedObserver, Stage, TransferStats};

/// Whether a producer loop should keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Stop,
}

/// Producer half of an input task: owns the pipe writer for the task's lifetime.
pub(crate) struct Producer {
    name: &'static str,
    writer: PipeWriter,
    decoder: Decoder,
    observer: SharedObserver,
    cancel: CancellationToken,
    stats: TransferStats,
    position: u64,
    started: Instant,
}

impl Producer {
    pub(crate) fn new(
        name: &'static str,
        writer: PipeWriter,
        decoder: Decoder,
        observer: SharedObserver,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            name,
            writer,
            decoder,
            observer,
            cancel,
            stats: TransferStats::default(),
            position: 0,
            started: Instant::now(),
        }
    }

    pub(crate) fn cancel(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Decode one raw item and write the record.
    ///
    /// A decode failure is reported and skipped. Stops when the pipe has
    /// been closed by the reader or the run is cancelled.
    pub(crate) async fn push(&mut self, raw: &[u8]) -> Flow {
        self.position += 1;

        let record = match (self.decoder)(raw) {
            Ok(record) => record,
            Err(e) => {
                self.stats.skipped += 1;
                self.observer
                    .item_skipped(self.name, Stage::Decode, self.position, &e);
                return Flow::Continue;
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!("{}: cancelled while writing item {}", self.name, self.position);
                Flow::Stop
            }
            written = self.writer.write(record) => match written {
                Ok(()) => {
                    self.stats.records += 1;
                    Flow::Continue
                }
                Err(e) => {
                    if self.cancel.is_cancelled() {
                        debug!("{}: stopping at item {}: {}", self.name, self.position, e);
                    } else {
                        // The consumer went away before the source was exhausted.
                        self.fail(Stage::Write, &GallonError::from(e));
                    }
                    Flow::Stop
                }
            },
        }
    }

    /// Report a fatal error for this task.
    pub(crate) fn fail(&self, stage: Stage, error: &GallonError) {
        self.observer.task_failed(self.name, stage, error);
    }

    /// Close the pipe and produce the final counters.
    pub(crate) fn finish(self, completed: bool) -> TransferStats {
        self.writer.close();
        let stats = self.stats.finish(self.started, completed);
        self.observer.task_finished(self.name, &stats);
        stats
    }
}
