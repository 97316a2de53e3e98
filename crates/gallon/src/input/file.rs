//! JSON-lines file input.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{Flow, Producer};
use crate::core::Decoder;
use crate::error::{GallonError, Result};
use crate::pipe::PipeWriter;
use crate::plugin::{
    InputPlugin, PluginTask, SharedObserver, Stage, TracingObserver, TransferStats,
};

const NAME: &str = "file-input";

/// How raw items are laid out in the input file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// One item per line.
    #[default]
    Jsonl,
}

/// File input configuration.
#[derive(Debug, Clone)]
pub struct FileInputConfig {
    pub path: PathBuf,
    pub format: InputFormat,
}

impl FileInputConfig {
    pub fn jsonl(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            format: InputFormat::Jsonl,
        }
    }
}

/// Reads a file line by line and hands each line to the decoder.
///
/// Blank lines are ignored; they do not count as items.
pub struct FileInput {
    config: FileInputConfig,
    decoder: Decoder,
    observer: SharedObserver,
}

impl FileInput {
    pub fn new(config: FileInputConfig, decoder: Decoder) -> Self {
        Self {
            config,
            decoder,
            observer: TracingObserver::shared(),
        }
    }

    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }
}

#[async_trait]
impl InputPlugin for FileInput {
    fn name(&self) -> &str {
        NAME
    }

    async fn connect(&self, cancel: CancellationToken, writer: PipeWriter) -> Result<PluginTask> {
        let path = &self.config.path;
        let file = File::open(path)
            .await
            .map_err(|e| GallonError::connect(NAME, format!("{}: {}", path.display(), e)))?;

        info!("Reading {:?} ({:?})", path, self.config.format);

        let producer = Producer::new(
            NAME,
            writer,
            self.decoder.clone(),
            self.observer.clone(),
            cancel,
        );
        let task = match self.config.format {
            InputFormat::Jsonl => produce_lines(BufReader::new(file), producer),
        };
        Ok(PluginTask::spawn(NAME, task))
    }
}

async fn produce_lines<R>(reader: R, mut producer: Producer) -> TransferStats
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.split(b'\n');

    let completed = loop {
        let next = tokio::select! {
            biased;
            _ = producer.cancel().cancelled() => break false,
            next = lines.next_segment() => next,
        };

        match next {
            Ok(Some(mut line)) => {
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                if producer.push(&line).await == Flow::Stop {
                    break false;
                }
            }
            Ok(None) => break true,
            Err(e) => {
                producer.fail(Stage::Fetch, &e.into());
                break false;
            }
        }
    };

    producer.finish(completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::json::{object_decoder, FieldSpec};
    use crate::core::ValueKind;
    use crate::error::PipeError;
    use crate::pipe::Pipe;
    use std::io::Write;
    use std::sync::Arc;

    fn decoder() -> Decoder {
        object_decoder(vec![
            FieldSpec::new("id", ValueKind::String),
            FieldSpec::new("v", ValueKind::Int),
        ])
    }

    #[tokio::test]
    async fn test_missing_file_is_connect_error() {
        let input = FileInput::new(FileInputConfig::jsonl("/nonexistent/input.jsonl"), decoder());
        let (writer, mut reader) = Pipe::new().split();

        let err = input
            .connect(CancellationToken::new(), writer)
            .await
            .unwrap_err();
        assert!(matches!(err, GallonError::Connect { .. }));
        // The writer went down with the failed connect.
        assert_eq!(reader.read().await, Err(PipeError::EndOfStream));
    }

    #[tokio::test]
    async fn test_reads_lines_and_skips_blank_and_crlf() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"id\":\"a\",\"v\":1}}\r\n\n{{\"id\":\"b\",\"v\":2}}").unwrap();

        let input = FileInput::new(FileInputConfig::jsonl(file.path()), decoder());
        let (writer, mut reader) = Pipe::new().split();
        let task = input.connect(CancellationToken::new(), writer).await.unwrap();

        assert_eq!(reader.read().await.unwrap(), crate::record!["a", 1i64]);
        assert_eq!(reader.read().await.unwrap(), crate::record!["b", 2i64]);
        assert_eq!(reader.read().await, Err(PipeError::EndOfStream));

        let stats = task.join().await.unwrap();
        assert_eq!(stats.records, 2);
        assert_eq!(stats.skipped, 0);
        assert!(stats.completed);
    }

    #[tokio::test]
    async fn test_cancel_closes_pipe() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for i in 0..100 {
            writeln!(file, "{{\"id\":\"r{}\",\"v\":{}}}", i, i).unwrap();
        }

        let cancel = CancellationToken::new();
        let input = FileInput::new(FileInputConfig::jsonl(file.path()), decoder())
            .with_observer(Arc::new(TracingObserver));
        let (writer, mut reader) = Pipe::new().split();
        let task = input.connect(cancel.clone(), writer).await.unwrap();

        assert!(reader.read().await.is_ok());
        cancel.cancel();

        let stats = task.join().await.unwrap();
        assert!(!stats.completed);
        assert!(stats.records < 100);
        while reader.read().await.is_ok() {}
        assert_eq!(reader.read().await, Err(PipeError::EndOfStream));
    }

    #[derive(Default)]
    struct Failures(std::sync::Mutex<Vec<(Stage, String)>>);

    impl crate::plugin::TransferObserver for Failures {
        fn item_skipped(&self, _: &str, _: Stage, _: u64, _: &GallonError) {}

        fn task_failed(&self, _plugin: &str, stage: Stage, error: &GallonError) {
            self.0.lock().unwrap().push((stage, error.to_string()));
        }
    }

    #[tokio::test]
    async fn test_reader_close_stops_input_and_reports_write_failure() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for i in 0..100 {
            writeln!(file, "{{\"id\":\"r{}\",\"v\":{}}}", i, i).unwrap();
        }

        let failures = Arc::new(Failures::default());
        let input = FileInput::new(FileInputConfig::jsonl(file.path()), decoder())
            .with_observer(failures.clone());
        let (writer, mut reader) = Pipe::new().split();
        let task = input.connect(CancellationToken::new(), writer).await.unwrap();

        assert!(reader.read().await.is_ok());
        reader.close();

        let stats = task.join().await.unwrap();
        assert!(!stats.completed);
        assert!(stats.records < 100);

        let failures = failures.0.lock().unwrap().clone();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, Stage::Write);
        assert!(failures[0].1.contains("pipe is closed"));
    }
}
