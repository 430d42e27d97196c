use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::config::schema::LoggingConfig;

/// Rolling log files are named `cbt-assistant.log.YYYY-MM-DD`.
const LOG_FILE_PREFIX: &str = "cbt-assistant.log";

/// Days a rolled log file is kept before start-up cleanup removes it.
const LOG_RETENTION_DAYS: u64 = 7;

/// Initialize the logging system.
///
/// `RUST_LOG` and `LOG_FORMAT` take precedence over the configured level and
/// format. The returned guard must be held for the life of the process so the
/// file writer flushes.
pub fn init_logging(config: &LoggingConfig) -> WorkerGuard {
    let filter = build_filter(config);
    let is_json = log_format(config).eq_ignore_ascii_case("json");

    let file_appender = tracing_appender::rolling::daily(&config.dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let stdout_layer = if is_json {
        fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    };

    let file_layer = if is_json {
        fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    };

    // A second init (e.g. in tests) is not fatal.
    let _ = Registry::default()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init();

    if let Err(e) = cleanup_old_logs(Path::new(&config.dir), LOG_RETENTION_DAYS) {
        eprintln!("Failed to clean up old logs: {}", e);
    }

    guard
}

fn log_format(config: &LoggingConfig) -> String {
    std::env::var("LOG_FORMAT").unwrap_or_else(|_| config.format.clone())
}

fn build_filter(config: &LoggingConfig) -> EnvFilter {
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    for (module, level) in &config.overrides {
        match format!("{}={}", module, level).parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(_) => eprintln!("Invalid log directive: {}={}", module, level),
        }
    }

    filter
}

/// Remove rolled log files older than `days` days from `dir`.
fn cleanup_old_logs(dir: &Path, days: u64) -> std::io::Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let now = SystemTime::now();
    let threshold = Duration::from_secs(days * 24 * 3600);
    let mut removed = 0;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX));
        if !is_log {
            continue;
        }

        let age = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());

        if matches!(age, Some(age) if age > threshold) {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => eprintln!("Failed to remove old log file {:?}: {}", path, e),
            }
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cleanup_missing_dir_is_noop() {
        let removed = cleanup_old_logs(Path::new("/definitely/not/here"), 7).unwrap();
        assert_eq!(removed, 0);
    }

    #[test]
    fn test_cleanup_keeps_fresh_and_foreign_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("cbt-assistant.log.2026-01-01"), "x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let removed = cleanup_old_logs(dir.path(), 7).unwrap();
        assert_eq!(removed, 0);
        assert!(dir.path().join("cbt-assistant.log.2026-01-01").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_cleanup_zero_retention_removes_only_logs() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("cbt-assistant.log.2026-01-01"), "x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        std::thread::sleep(Duration::from_millis(20));

        let removed = cleanup_old_logs(dir.path(), 0).unwrap();
        assert_eq!(removed, 1);
        assert!(dir.path().join("notes.txt").exists());
    }
}
