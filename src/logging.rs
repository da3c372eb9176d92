//! Structured logging for reconciliation runs.
//!
//! Console plus a daily rotating file, pretty or JSON, with a run id logged
//! at startup so one run's lines can be found in the file.
//!
//! Environment variables:
//! - LOG_FORMAT=pretty|json (default: pretty)
//! - LOG_DIR=/path/to/logs (default: ./logs)
//! - RUN_ID=<uuid> (default: auto-generated)
//! - RUST_LOG=level (default: info)

use std::io;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};
use uuid::Uuid;

const LOG_FILE_NAME: &str = "fixture_reconcile.log";
const DEFAULT_FILTER: &str = "info,fixture_reconcile=info,hyper=warn,reqwest=warn";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    pub log_dir: String,
    pub run_id: Uuid,
    pub filter: String,
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self {
            format: LogFormat::from_env(),
            log_dir: std::env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string()),
            run_id: get_run_id(),
            filter: std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.to_string()),
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.filter).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Install the global subscriber from environment settings.
///
/// Returns the file writer's guard and the run id stamped on the startup
/// line. The guard flushes on drop; keep it alive until the run is over.
///
/// # Example
/// ```no_run
/// use fixture_reconcile::logging;
///
/// let (_guard, run_id) = logging::init_logging();
/// tracing::info!(%run_id, "reconciling");
/// ```
pub fn init_logging() -> (WorkerGuard, Uuid) {
    init_with(LogConfig::from_env())
}

pub fn init_with(config: LogConfig) -> (WorkerGuard, Uuid) {
    if let Err(e) = std::fs::create_dir_all(&config.log_dir) {
        eprintln!("Failed to create log directory: {}", e);
    }

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_NAME);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let (console, file): (BoxedLayer, BoxedLayer) = match config.format {
        LogFormat::Pretty => (
            fmt::layer()
                .with_writer(io::stdout)
                .with_target(false)
                .with_ansi(true)
                .pretty()
                .with_filter(config.env_filter())
                .boxed(),
            // file keeps one line per event
            fmt::layer()
                .with_writer(non_blocking_file)
                .with_target(true)
                .with_line_number(true)
                .with_ansi(false)
                .compact()
                .with_filter(config.env_filter())
                .boxed(),
        ),
        LogFormat::Json => (
            fmt::layer()
                .with_writer(io::stdout)
                .with_target(true)
                .with_ansi(false)
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(false)
                .with_filter(config.env_filter())
                .boxed(),
            fmt::layer()
                .with_writer(non_blocking_file)
                .with_target(true)
                .with_line_number(true)
                .with_ansi(false)
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(false)
                .with_filter(config.env_filter())
                .boxed(),
        ),
    };

    if let Err(e) = tracing_subscriber::registry().with(vec![console, file]).try_init() {
        eprintln!("Logging already initialized: {}", e);
    }

    tracing::info!(
        run_id = %config.run_id,
        log_format = ?config.format,
        log_dir = %config.log_dir,
        filter = %config.filter,
        "Logging initialized"
    );

    (guard, config.run_id)
}

/// Run id from `RUN_ID`, or a fresh one.
pub fn get_run_id() -> Uuid {
    std::env::var("RUN_ID")
        .ok()
        .and_then(|s| Uuid::parse_str(&s).ok())
        .unwrap_or_else(Uuid::new_v4)
}
