//! File output with optional gzip compression.
//!
//! Records are encoded one at a time and appended either as JSON lines or as
//! elements of a single JSON array. With gzip enabled the encoder works on an
//! in-memory buffer and only the compressed bytes go to the file.

use std::io::Write as _;
use std::path::PathBuf;
use std::time::Instant;

use async_trait::async_trait;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::Encoder;
use crate::error::{GallonError, Result};
use crate::pipe::PipeReader;
use crate::plugin::{
    OutputPlugin, PluginTask, SharedObserver, Stage, TracingObserver, TransferStats,
};

const NAME: &str = "file-output";

/// Layout of the output file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One encoded record per line.
    #[default]
    Jsonl,
    /// A single JSON array whose elements are the encoded records.
    Json,
}

/// Compression applied to the whole output file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    /// Gzip compression (.gz)
    Gzip,
}

impl Compression {
    /// File name suffix expected for this compression.
    pub fn extension_suffix(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Gzip => ".gz",
        }
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Gzip => write!(f, "gzip"),
        }
    }
}

/// File output configuration.
#[derive(Debug, Clone)]
pub struct FileOutputConfig {
    pub path: PathBuf,
    pub format: OutputFormat,
    pub compression: Compression,
}

impl FileOutputConfig {
    pub fn jsonl(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            format: OutputFormat::Jsonl,
            compression: Compression::None,
        }
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }
}

/// Writes every record it reads to one file.
pub struct FileOutput {
    config: FileOutputConfig,
    encoder: Encoder,
    observer: SharedObserver,
}

impl FileOutput {
    pub fn new(config: FileOutputConfig, encoder: Encoder) -> Self {
        Self {
            config,
            encoder,
            observer: TracingObserver::shared(),
        }
    }

    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }
}

#[async_trait]
impl OutputPlugin for FileOutput {
    fn name(&self) -> &str {
        NAME
    }

    async fn connect(&self, cancel: CancellationToken, reader: PipeReader) -> Result<PluginTask> {
        let path = &self.config.path;
        let file = File::create(path)
            .await
            .map_err(|e| GallonError::connect(NAME, format!("{}: {}", path.display(), e)))?;

        info!(
            "Writing {:?} (format: {:?}, compression: {})",
            path, self.config.format, self.config.compression
        );

        let destination = Destination::new(file, self.config.compression);
        let consumer = Consumer {
            reader,
            encoder: self.encoder.clone(),
            observer: self.observer.clone(),
            format: self.config.format,
        };
        Ok(PluginTask::spawn(NAME, consumer.run(destination, cancel)))
    }
}

/// Open output file plus the compression state in front of it.
struct Destination {
    file: BufWriter<File>,
    gzip: Option<GzEncoder<Vec<u8>>>,
}

impl Destination {
    fn new(file: File, compression: Compression) -> Self {
        let gzip = match compression {
            Compression::None => None,
            Compression::Gzip => Some(GzEncoder::new(Vec::new(), flate2::Compression::default())),
        };
        Self {
            file: BufWriter::new(file),
            gzip,
        }
    }

    async fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        match &mut self.gzip {
            Some(encoder) => {
                encoder.write_all(bytes)?;
                let compressed = std::mem::take(encoder.get_mut());
                if !compressed.is_empty() {
                    self.file.write_all(&compressed).await?;
                }
                Ok(())
            }
            None => self.file.write_all(bytes).await,
        }
    }

    async fn finish(mut self) -> std::io::Result<()> {
        if let Some(encoder) = self.gzip.take() {
            let trailer = encoder.finish()?;
            self.file.write_all(&trailer).await?;
        }
        self.file.flush().await?;
        self.file.into_inner().sync_all().await
    }
}

struct Consumer {
    reader: PipeReader,
    encoder: Encoder,
    observer: SharedObserver,
    format: OutputFormat,
}

impl Consumer {
    async fn run(mut self, mut destination: Destination, cancel: CancellationToken) -> TransferStats {
        let started = Instant::now();
        let mut stats = TransferStats::default();
        let mut completed = match self.write_header(&mut destination).await {
            Ok(()) => {
                let drained = self
                    .consume(&mut destination, &cancel, &mut stats)
                    .await;
                // A cancelled run still leaves a well-formed file behind.
                match self.write_footer(&mut destination).await {
                    Ok(()) => drained,
                    Err(e) => {
                        self.observer.task_failed(NAME, Stage::Persist, &e.into());
                        false
                    }
                }
            }
            Err(e) => {
                self.observer.task_failed(NAME, Stage::Persist, &e.into());
                false
            }
        };
        // Stop the producer before flushing so it does not wait on us.
        self.reader.close();

        if let Err(e) = destination.finish().await {
            self.observer.task_failed(NAME, Stage::Persist, &e.into());
            completed = false;
        }

        let stats = stats.finish(started, completed);
        self.observer.task_finished(NAME, &stats);
        stats
    }

    /// Read until end of stream. Returns false when cancelled.
    async fn consume(
        &mut self,
        destination: &mut Destination,
        cancel: &CancellationToken,
        stats: &mut TransferStats,
    ) -> bool {
        let mut position = 0u64;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("{}: cancelled after {} records", NAME, stats.records);
                    return false;
                }
                next = self.reader.read() => next,
            };
            let Ok(record) = next else {
                return true;
            };
            position += 1;

            let encoded = match (self.encoder)(&record) {
                Ok(bytes) => bytes,
                Err(e) => {
                    stats.skipped += 1;
                    self.observer.item_skipped(NAME, Stage::Encode, position, &e);
                    continue;
                }
            };

            let chunk = self.frame(encoded, stats.records == 0);
            match destination.write_all(&chunk).await {
                Ok(()) => stats.records += 1,
                Err(e) => {
                    stats.skipped += 1;
                    self.observer
                        .item_skipped(NAME, Stage::Persist, position, &e.into());
                }
            }
        }
    }

    fn frame(&self, mut encoded: Vec<u8>, first: bool) -> Vec<u8> {
        match self.format {
            OutputFormat::Jsonl => {
                encoded.push(b'\n');
                encoded
            }
            OutputFormat::Json if first => encoded,
            OutputFormat::Json => {
                let mut framed = Vec::with_capacity(encoded.len() + 1);
                framed.push(b',');
                framed.extend_from_slice(&encoded);
                framed
            }
        }
    }

    async fn write_header(&self, destination: &mut Destination) -> std::io::Result<()> {
        match self.format {
            OutputFormat::Jsonl => Ok(()),
            OutputFormat::Json => destination.write_all(b"[").await,
        }
    }

    async fn write_footer(&self, destination: &mut Destination) -> std::io::Result<()> {
        match self.format {
            OutputFormat::Jsonl => Ok(()),
            OutputFormat::Json => destination.write_all(b"]\n").await,
        }
    }
}
