//! gallon CLI - stream records from one file to another.

use clap::{Parser, Subcommand};
use gallon::{Config, Gallon, GallonError, RunSummary, TracingObserver};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "gallon")]
#[command(about = "Stream records from a data source into a data sink")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "gallon.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the configured pipeline
    Run,

    /// Validate the configuration file
    Validate,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), GallonError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Run => {
            let cancel_token = setup_signal_handler();
            let gallon = Gallon::from_config(&config, TracingObserver::shared())?;
            let summary = gallon.run_to_completion(cancel_token).await?;

            if cli.output_json {
                println!("{}", summary.to_json()?);
            } else {
                print_summary(&summary);
            }

            match summary.status.as_str() {
                "completed" => {}
                "cancelled" => return Err(GallonError::Cancelled),
                _ => {
                    return Err(GallonError::Task(format!(
                        "run {} did not complete",
                        summary.run_id
                    )))
                }
            }
        }

        Commands::Validate => {
            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Configuration is valid");
                println!("  Input: {:?} ({} fields)", config.input.path, config.fields.len());
                println!(
                    "  Output: {:?} (compression: {})",
                    config.output.path, config.output.compression
                );
            }
        }
    }

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("\nRun {}!", summary.status);
    println!("  Run ID: {}", summary.run_id);
    println!("  Duration: {:.2}s", summary.duration_seconds);
    println!(
        "  Records: {} read, {} written",
        summary.input.records, summary.output.records
    );
    let skipped = summary.input.skipped + summary.output.skipped;
    if skipped > 0 {
        println!("  Skipped: {}", skipped);
    }
    println!("  Throughput: {} records/sec", summary.records_per_second);
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so --output-json stays parseable.
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Cancel the returned token on SIGINT (Ctrl-C) or SIGTERM.
#[cfg(unix)]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();

    for (kind, name) in [
        (SignalKind::interrupt(), "SIGINT"),
        (SignalKind::terminate(), "SIGTERM"),
    ] {
        let token = cancel_token.clone();
        tokio::spawn(async move {
            match signal(kind) {
                Ok(mut stream) => {
                    stream.recv().await;
                    eprintln!("\nReceived {}. Shutting down gracefully...", name);
                    token.cancel();
                }
                Err(e) => warn!("Failed to install {} handler: {}", name, e),
            }
        });
    }

    cancel_token
}

/// Cancel the returned token on Ctrl-C.
#[cfg(not(unix))]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                eprintln!("\nReceived Ctrl-C. Shutting down gracefully...");
                token.cancel();
            }
            Err(e) => warn!("Failed to install Ctrl-C handler: {}", e),
        }
    });

    cancel_token
}
