//! Reporting hooks for failures that happen after `connect` has returned.
//!
//! Inputs and outputs receive an observer at construction and report every
//! skipped item and every fatal task error through it.

use std::sync::Arc;

use tracing::{error, info, warn};

use super::task::TransferStats;
use crate::error::GallonError;

/// Where in a plugin's loop an item failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Pulling raw items from the backing store.
    Fetch,
    /// Raw item to record.
    Decode,
    /// Record into the pipe.
    Write,
    /// Record to raw bytes.
    Encode,
    /// Raw bytes into the destination.
    Persist,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Decode => "decode",
            Stage::Write => "write",
            Stage::Encode => "encode",
            Stage::Persist => "persist",
        };
        f.write_str(name)
    }
}

/// Receives per-item and task-level events from running plugins.
pub trait TransferObserver: Send + Sync {
    /// An item was dropped and the stream continues. `position` is the
    /// 1-based index of the item within the plugin's stream.
    fn item_skipped(&self, plugin: &str, stage: Stage, position: u64, error: &GallonError);

    /// The plugin's task hit an unrecoverable error and stopped early.
    fn task_failed(&self, plugin: &str, stage: Stage, error: &GallonError);

    fn task_finished(&self, _plugin: &str, _stats: &TransferStats) {}
}

/// Shared handle to an observer.
pub type SharedObserver = Arc<dyn TransferObserver>;

/// Forwards every event to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TracingObserver {
    pub fn shared() -> SharedObserver {
        Arc::new(Self)
    }
}

impl TransferObserver for TracingObserver {
    fn item_skipped(&self, plugin: &str, stage: Stage, position: u64, error: &GallonError) {
        warn!(plugin, %stage, position, "skipping item: {}", error);
    }

    fn task_failed(&self, plugin: &str, stage: Stage, error: &GallonError) {
        error!(plugin, %stage, "task stopped: {}", error);
    }

    fn task_finished(&self, plugin: &str, stats: &TransferStats) {
        info!(
            plugin,
            records = stats.records,
            skipped = stats.skipped,
            completed = stats.completed,
            "task finished"
        );
    }
}
