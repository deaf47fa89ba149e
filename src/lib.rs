pub mod models;
pub mod services;

use services::retention::prune_oldest;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_PREFIX: &str = "leadframe_";
const LOGS_KEPT: usize = 30;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Logging switches read from the environment.
struct LogSettings {
    file_log: bool,
    cleanup: bool,
    dir: PathBuf,
}

impl LogSettings {
    fn from_env() -> Self {
        let flag = |key: &str| matches!(std::env::var(key).as_deref(), Ok("1") | Ok("true") | Ok("TRUE"));
        let dir = std::env::var("LEADFRAME_LOG_DIR")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_logs_dir);

        Self {
            file_log: !flag("LEADFRAME_DISABLE_FILE_LOG"),
            cleanup: !flag("LEADFRAME_DISABLE_LOG_CLEANUP"),
            dir,
        }
    }
}

fn default_logs_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("leadframe").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

fn is_run_log(name: &str) -> bool {
    name.starts_with(LOG_PREFIX) && name.ends_with(".log")
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

// stdout carries the report summary, so console logs go to stderr.
fn console_only() {
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(cfg!(debug_assertions))
        .with_target(true);
    let _ = tracing_subscriber::registry().with(env_filter()).with(console).try_init();
}

/// Install the global subscriber: one log file per run plus stderr.
///
/// Only the first call has any effect. Falls back to stderr alone when file logging is
/// disabled or the log directory cannot be created.
pub fn init_logging() {
    static INIT: OnceLock<()> = OnceLock::new();
    if INIT.set(()).is_err() {
        return;
    }

    let settings = LogSettings::from_env();
    if !settings.file_log {
        console_only();
        info!("file logging disabled via LEADFRAME_DISABLE_FILE_LOG");
        return;
    }

    if let Err(e) = fs::create_dir_all(&settings.dir) {
        console_only();
        warn!(dir = %settings.dir.display(), error = %e, "log dir not writable, logging to stderr only");
        return;
    }

    let log_name = format!("{}{}.log", LOG_PREFIX, chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let (writer, guard) = tracing_appender::non_blocking(rolling::never(&settings.dir, &log_name));
    let _ = LOG_GUARD.set(guard);

    let file = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(cfg!(debug_assertions))
        .with_target(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(file)
        .with(console)
        .try_init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        log_file = %settings.dir.join(&log_name).display(),
        "leadframe.started"
    );

    if settings.cleanup {
        match prune_oldest(&settings.dir, LOGS_KEPT, is_run_log) {
            Ok(0) => {}
            Ok(n) => info!(removed = n, "logs.pruned"),
            Err(e) => warn!(error = %e, "logs.prune_failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_log_names() {
        assert!(is_run_log("leadframe_20240101_000000.log"));
        assert!(!is_run_log("leadframe_20240101_000000.txt"));
        assert!(!is_run_log("other.log"));
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        std::env::set_var("LEADFRAME_DISABLE_FILE_LOG", "1");
        init_logging();
        init_logging();
    }
}
