//! End-to-end pipeline tests: file input through the pipe into file output.

use std::io::Read;
use std::sync::{Arc, Mutex};

use flate2::read::GzDecoder;
use gallon::codec::{object_decoder, object_encoder, FieldSpec};
use gallon::{
    Compression, Config, FileInput, FileInputConfig, FileOutput, FileOutputConfig, Gallon,
    GallonError, OutputFormat, Stage, TransferObserver, TransferStats, ValueKind,
};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct Collected {
    skipped: Mutex<Vec<(String, Stage, u64)>>,
    failed: Mutex<Vec<String>>,
}

impl TransferObserver for Collected {
    fn item_skipped(&self, plugin: &str, stage: Stage, position: u64, _error: &GallonError) {
        self.skipped
            .lock()
            .unwrap()
            .push((plugin.to_string(), stage, position));
    }

    fn task_failed(&self, plugin: &str, _stage: Stage, _error: &GallonError) {
        self.failed.lock().unwrap().push(plugin.to_string());
    }

    fn task_finished(&self, _plugin: &str, _stats: &TransferStats) {}
}

fn fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("id", ValueKind::String),
        FieldSpec::new("v", ValueKind::Int),
    ]
}

const THREE_LINES: &str = "{\"id\":\"a\",\"v\":1}\n{\"id\":\"b\",\"v\":2}\n{\"id\":\"c\",\"v\":3}\n";

#[tokio::test]
async fn test_jsonl_to_jsonl_preserves_order() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.jsonl");
    let output = dir.path().join("out.jsonl");
    std::fs::write(&input, THREE_LINES).unwrap();

    let gallon = Gallon::new(
        FileInput::new(FileInputConfig::jsonl(&input), object_decoder(fields())),
        FileOutput::new(FileOutputConfig::jsonl(&output), object_encoder(fields())),
    );
    let summary = gallon
        .run_to_completion(CancellationToken::new())
        .await
        .unwrap();

    assert!(summary.is_completed());
    assert_eq!(summary.input.records, 3);
    assert_eq!(summary.output.records, 3);
    assert_eq!(std::fs::read_to_string(&output).unwrap(), THREE_LINES);
}

#[tokio::test]
async fn test_malformed_line_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.jsonl");
    let output = dir.path().join("out.jsonl");
    std::fs::write(
        &input,
        "{\"id\":\"a\",\"v\":1}\n{\"id\":\"b\",\n{\"id\":\"c\",\"v\":\"three\"}\n{\"id\":\"d\",\"v\":4}\n",
    )
    .unwrap();

    let observer = Arc::new(Collected::default());
    let gallon = Gallon::new(
        FileInput::new(FileInputConfig::jsonl(&input), object_decoder(fields()))
            .with_observer(observer.clone()),
        FileOutput::new(FileOutputConfig::jsonl(&output), object_encoder(fields()))
            .with_observer(observer.clone()),
    );
    let summary = gallon
        .run_to_completion(CancellationToken::new())
        .await
        .unwrap();

    assert!(summary.is_completed());
    assert_eq!(summary.input.records, 2);
    assert_eq!(summary.input.skipped, 2);
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "{\"id\":\"a\",\"v\":1}\n{\"id\":\"d\",\"v\":4}\n"
    );

    let skipped = observer.skipped.lock().unwrap().clone();
    assert_eq!(
        skipped,
        vec![
            ("file-input".to_string(), Stage::Decode, 2),
            ("file-input".to_string(), Stage::Decode, 3),
        ]
    );
    assert!(observer.failed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_gzip_json_array_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.jsonl");
    let output = dir.path().join("out.json.gz");
    std::fs::write(&input, THREE_LINES).unwrap();

    let gallon = Gallon::new(
        FileInput::new(FileInputConfig::jsonl(&input), object_decoder(fields())),
        FileOutput::new(
            FileOutputConfig::jsonl(&output)
                .with_format(OutputFormat::Json)
                .with_compression(Compression::Gzip),
            object_encoder(fields()),
        ),
    );
    let summary = gallon
        .run_to_completion(CancellationToken::new())
        .await
        .unwrap();
    assert!(summary.is_completed());

    let mut text = String::new();
    GzDecoder::new(std::fs::File::open(&output).unwrap())
        .read_to_string(&mut text)
        .unwrap();
    let array: serde_json::Value = serde_json::from_str(&text).unwrap();
    let ids: Vec<&str> = array
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["a", "b", "c"]);
}

#[tokio::test]
async fn test_from_config_runs_file_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.jsonl");
    let output = dir.path().join("out.jsonl");
    std::fs::write(&input, THREE_LINES).unwrap();

    let yaml = format!(
        "input:\n  path: {}\noutput:\n  path: {}\nfields:\n  - name: id\n    type: string\n  - name: v\n",
        input.display(),
        output.display()
    );
    let config = Config::from_yaml(&yaml).unwrap();
    let observer = Arc::new(Collected::default());

    let summary = Gallon::from_config(&config, observer)
        .unwrap()
        .run_to_completion(CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.status, "completed");
    assert_eq!(std::fs::read_to_string(&output).unwrap(), THREE_LINES);
}

#[tokio::test]
async fn test_missing_input_is_connect_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.jsonl");

    let gallon = Gallon::new(
        FileInput::new(
            FileInputConfig::jsonl(dir.path().join("missing.jsonl")),
            object_decoder(fields()),
        ),
        FileOutput::new(FileOutputConfig::jsonl(&output), object_encoder(fields())),
    );
    let err = gallon.run(CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, GallonError::Connect { ref plugin, .. } if plugin == "file-input"));
    // The output was connected first and finished cleanly with nothing written.
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "");
}
