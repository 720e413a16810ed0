//! # STREAMRUN
//!
//! Headless driver for a single stream session.
//!
//! ```bash
//! # Defaults, generated run id
//! ./streamrun
//!
//! # From a config file, with worker logs
//! RUST_LOG=debug ./streamrun stream.toml
//! ```

use std::io::IsTerminal;
use std::process::ExitCode;

use streamrun::core::{RunId, RunMetadata};
use streamrun::{Error, Record, Stream, StreamConfig, StreamStats};
use tracing_subscriber::EnvFilter;

/// Records submitted once the run is bound.
const RECORDS: u64 = 8;

const DEFAULT_LOG_LEVEL: &str = "info";

fn main() -> ExitCode {
    init_tracing();

    match run_session(std::env::args().nth(1)) {
        Ok(stats) => {
            println!(
                "processed: {}  rejected before run: {}",
                stats.processed, stats.rejected_unbound
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_LEVEL))
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL)),
        )
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_session(config_path: Option<String>) -> Result<StreamStats, Error> {
    let config = match config_path {
        Some(path) => StreamConfig::load(path)?,
        None => StreamConfig::default(),
    };

    let run = config
        .run
        .clone()
        .unwrap_or_else(|| RunMetadata::new(RunId::generate()));

    let mut stream = Stream::new(config)?;
    stream.spawn_workers()?;
    stream.init_run(run)?;

    let outputs = stream.outputs();
    for step in 0..RECORDS {
        stream.submit(Record::new(step, format!("heartbeat {step}")))?;
    }

    let stats = stream.shutdown()?;
    for stamped in outputs.iter() {
        println!(
            "{} [{}] step {}: {}",
            stamped.run_id,
            stamped.project.as_deref().unwrap_or("-"),
            stamped.step,
            stamped.payload
        );
    }

    Ok(stats)
}
