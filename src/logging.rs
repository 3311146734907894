use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Daily CSV audit trail (`logs-YYYY-MM-DD.csv`), one row per event.
///
/// Every record is mirrored to `tracing` so console output and the file
/// agree.
#[derive(Debug, Clone)]
pub struct AuditLog {
    dir: PathBuf,
}

impl AuditLog {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn file_for_today(&self) -> PathBuf {
        let date_str = Utc::now().format("%Y-%m-%d").to_string();
        self.dir.join(format!("logs-{}.csv", date_str))
    }

    pub fn info(&self, message: &str) {
        self.record(Level::INFO, message);
    }

    pub fn warn(&self, message: &str) {
        self.record(Level::WARN, message);
    }

    pub fn error(&self, message: &str) {
        self.record(Level::ERROR, message);
    }

    pub fn record(&self, level: Level, message: &str) {
        if level == Level::ERROR {
            tracing::error!("{}", message);
        } else if level == Level::WARN {
            tracing::warn!("{}", message);
        } else if level == Level::INFO {
            tracing::info!("{}", message);
        } else {
            tracing::debug!("{}", message);
        }

        let now = Utc::now();
        let path = self.file_for_today();
        let file = match OpenOptions::new().append(true).create(true).open(&path) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not open audit log");
                return;
            }
        };

        let mut writer = csv::Writer::from_writer(file);
        let written = writer
            .write_record([now.to_rfc3339().as_str(), level.as_str(), message])
            .and_then(|_| writer.flush().map_err(csv::Error::from));
        if let Err(e) = written {
            tracing::warn!(path = %path.display(), error = %e, "could not write audit log");
        }
    }
}

/// Installs the stderr fmt subscriber. `RUST_LOG` wins, `info` otherwise.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn appends_rows_to_daily_file() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let log = AuditLog::new(dir.path());

        log.info("punch in submitted");
        log.error("punch out failed: timeout");

        let content = std::fs::read_to_string(log.file_for_today()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(",INFO,punch in submitted"));
        assert!(lines[1].contains(",ERROR,"));
        assert!(lines[1].contains("timeout"));
    }

    #[test]
    fn messages_with_commas_are_quoted() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let log = AuditLog::new(dir.path());

        log.warn("note: late, traffic");

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(log.file_for_today())
            .unwrap();
        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[1], "WARN");
        assert_eq!(&row[2], "note: late, traffic");
    }

    #[test]
    fn level_column_uses_tracing_names() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let log = AuditLog::new(dir.path());

        log.record(Level::DEBUG, "ticket dropped");

        let content = std::fs::read_to_string(log.file_for_today()).unwrap();
        assert!(content.trim_end().ends_with(",DEBUG,ticket dropped"));
    }

    #[test]
    fn missing_directory_does_not_panic() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let log = AuditLog::new(dir.path().join("does/not/exist"));
        log.error("dropped");
    }
}
