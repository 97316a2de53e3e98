//! Pipeline orchestrator - wires one input to one output through a pipe.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::codec::{object_decoder, object_encoder};
use crate::config::Config;
use crate::error::Result;
use crate::input::FileInput;
use crate::output::FileOutput;
use crate::pipe::Pipe;
use crate::plugin::{InputPlugin, OutputPlugin, PluginTask, SharedObserver, TransferStats};

/// Connects an input plugin to an output plugin.
pub struct Gallon {
    input: Box<dyn InputPlugin>,
    output: Box<dyn OutputPlugin>,
}

/// Result of a finished pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status: "completed", "cancelled" or "failed".
    pub status: String,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When both tasks had ended.
    pub completed_at: DateTime<Utc>,

    /// Producer-side counters.
    pub input: TransferStats,

    /// Consumer-side counters.
    pub output: TransferStats,

    /// Average throughput (records persisted per second).
    pub records_per_second: i64,
}

impl RunSummary {
    /// Serialize the summary as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }
}

/// A pipeline whose two tasks have been started.
///
/// Returned by [`Gallon::run`] as soon as both sides are connected; the
/// transfer itself is still in progress.
#[derive(Debug)]
pub struct RunHandle {
    run_id: String,
    started_at: DateTime<Utc>,
    started: Instant,
    cancel: CancellationToken,
    input: PluginTask,
    output: PluginTask,
}

impl RunHandle {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Ask both tasks to stop. The input closes the pipe and the output
    /// releases its destination; call [`RunHandle::wait`] to observe the end.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Stop both tasks immediately without letting them flush.
    pub fn abort(&self) {
        self.input.abort();
        self.output.abort();
    }

    /// Wait until both tasks have ended.
    pub async fn wait(self) -> Result<RunSummary> {
        let (input, output) = tokio::join!(self.input.join(), self.output.join());
        let input = input?;
        let output = output?;

        let completed_at = Utc::now();
        let duration = self.started.elapsed().as_secs_f64();
        let records_per_second = if duration > 0.0 {
            (output.records as f64 / duration) as i64
        } else {
            0
        };

        let status = if self.cancel.is_cancelled() && !(input.completed && output.completed) {
            "cancelled"
        } else if input.completed && output.completed {
            "completed"
        } else {
            "failed"
        };

        let summary = RunSummary {
            run_id: self.run_id,
            status: status.to_string(),
            duration_seconds: duration,
            started_at: self.started_at,
            completed_at,
            input,
            output,
            records_per_second,
        };

        info!(
            "Run {} {}: {} records read, {} written, {} skipped in {:.1}s ({} records/s)",
            summary.run_id,
            summary.status,
            summary.input.records,
            summary.output.records,
            summary.input.skipped + summary.output.skipped,
            summary.duration_seconds,
            summary.records_per_second
        );

        Ok(summary)
    }
}

impl Gallon {
    pub fn new(input: impl InputPlugin + 'static, output: impl OutputPlugin + 'static) -> Self {
        Self {
            input: Box::new(input),
            output: Box::new(output),
        }
    }

    /// Build the file-to-file pipeline described by `config`, using the
    /// JSON object codecs over `config.fields`.
    pub fn from_config(config: &Config, observer: SharedObserver) -> Result<Self> {
        config.validate()?;

        let input = FileInput::new(
            config.input.file_config(),
            object_decoder(config.fields.clone()),
        )
        .with_observer(observer.clone());
        let output = FileOutput::new(
            config.output.file_config(),
            object_encoder(config.fields.clone()),
        )
        .with_observer(observer);

        Ok(Self::new(input, output))
    }

    /// Start the pipeline.
    ///
    /// Creates the pipe, connects the output first so a reader is waiting
    /// before the first write, then connects the input. Returns the first
    /// connect error, or a [`RunHandle`] once both sides are running. The
    /// transfer is not awaited.
    pub async fn run(&self, cancel: CancellationToken) -> Result<RunHandle> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let started = Instant::now();
        let cancel = cancel.child_token();

        let (writer, reader) = Pipe::new().split();
        debug!(
            "Run {}: connecting {} -> {}",
            run_id,
            self.input.name(),
            self.output.name()
        );

        let output = self.output.connect(cancel.clone(), reader).await?;

        let input = match self.input.connect(cancel.clone(), writer).await {
            Ok(task) => task,
            Err(e) => {
                // The writer was dropped with the failed connect, so the
                // output sees end of stream and finishes on its own.
                warn!("Run {}: {} failed to connect: {}", run_id, self.input.name(), e);
                if let Err(join_err) = output.join().await {
                    warn!("Run {}: {}", run_id, join_err);
                }
                return Err(e);
            }
        };

        info!(
            "Run {} started: {} -> {}",
            run_id,
            self.input.name(),
            self.output.name()
        );

        Ok(RunHandle {
            run_id,
            started_at,
            started,
            cancel,
            input,
            output,
        })
    }

    /// Start the pipeline and wait for it to finish.
    pub async fn run_to_completion(&self, cancel: CancellationToken) -> Result<RunSummary> {
        self.run(cancel).await?.wait().await
    }
}

impl std::fmt::Debug for Gallon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gallon")
            .field("input", &self.input.name())
            .field("output", &self.output.name())
            .finish()
    }
}
