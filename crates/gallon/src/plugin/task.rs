//! Handles for the background work a plugin starts in `connect`.

use std::future::Future;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::error::{GallonError, Result};

/// Counters reported by one side of a pipeline once its task ends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferStats {
    /// Records written into (input) or persisted from (output) the pipe.
    pub records: u64,

    /// Items dropped after a per-item failure.
    pub skipped: u64,

    /// Whether the task reached the natural end of its stream, as opposed
    /// to stopping on cancellation or a fatal error.
    pub completed: bool,

    /// Wall-clock time the task ran for.
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

impl TransferStats {
    pub(crate) fn finish(mut self, started: Instant, completed: bool) -> Self {
        self.elapsed = started.elapsed();
        self.completed = completed;
        self
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs.max(0.0)).map_err(serde::de::Error::custom)
    }
}

/// A running plugin task.
///
/// Returned by `connect`; the caller may await it with [`PluginTask::join`]
/// or stop it with [`PluginTask::abort`]. Dropping the handle detaches the
/// task without stopping it.
#[derive(Debug)]
pub struct PluginTask {
    name: String,
    handle: JoinHandle<TransferStats>,
}

impl PluginTask {
    /// Spawn `work` on the current tokio runtime.
    pub fn spawn<F>(name: impl Into<String>, work: F) -> Self
    where
        F: Future<Output = TransferStats> + Send + 'static,
    {
        Self {
            name: name.into(),
            handle: tokio::spawn(work),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the task at its next suspension point. Its pipe handle is
    /// dropped with it, which closes the pipe.
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Wait for the task to end.
    pub async fn join(self) -> Result<TransferStats> {
        self.handle.await.map_err(|e| {
            if e.is_cancelled() {
                GallonError::Task(format!("{} task was aborted", self.name))
            } else {
                GallonError::Task(format!("{} task panicked", self.name))
            }
        })
    }
}
