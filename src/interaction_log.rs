use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::warn;

/// Plain-text, append-only record of a conversation.
///
/// Each entry is one `timestamp [kind] text` line; multi-line text is written as-is.
#[derive(Debug)]
pub struct InteractionLog {
    path: PathBuf,
    file: File,
}

impl InteractionLog {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&mut self, kind: &str, text: &str) -> io::Result<()> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(self.file, "{} [{}] {}", timestamp, kind, text)?;
        self.file.flush()
    }

    /// Like [`record`](Self::record) but only warns on failure; a broken log never ends a turn.
    pub fn record_or_warn(&mut self, kind: &str, text: &str) {
        if let Err(e) = self.record(kind, text) {
            warn!(path = %self.path.display(), error = %e, "Failed to write interaction log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_creates_file_if_not_exists() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("interactions.log");
        assert!(!log_path.exists());

        let mut log = InteractionLog::open(&log_path).unwrap();
        log.record("user", "First entry").unwrap();

        let contents = fs::read_to_string(&log_path).unwrap();
        assert!(contents.trim_end().ends_with("[user] First entry"));
        assert_eq!(log.path(), log_path.as_path());
    }

    #[test]
    fn test_appends_across_sessions() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("interactions.log");
        fs::write(&log_path, "existing line\n").unwrap();

        {
            let mut log = InteractionLog::open(&log_path).unwrap();
            log.record("user", "Session 1").unwrap();
        }
        {
            let mut log = InteractionLog::open(&log_path).unwrap();
            log.record_or_warn("assistant", "Session 2");
        }

        let contents = fs::read_to_string(&log_path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "existing line");
        assert!(lines[1].ends_with("[user] Session 1"));
        assert!(lines[2].ends_with("[assistant] Session 2"));
    }

    #[test]
    fn test_open_fails_for_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        assert!(InteractionLog::open(temp_dir.path().join("nope").join("x.log")).is_err());
    }
}
