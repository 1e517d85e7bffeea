//! Append-only diagnostic journal.
//!
//! Every inbound uplink is dumped as text to a date-stamped file, plus a
//! one-time dump of the loaded route table at startup. This is a side
//! channel for debugging, not a machine-readable contract: write failures
//! are logged and never affect message processing.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::warn;

/// Append-only, date-stamped diagnostic log file.
///
/// The file is opened, appended, and closed per write, under a mutex so
/// concurrent handler invocations serialize. The date stamp is computed
/// per append, so the file rolls over at midnight.
pub struct Journal {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl Journal {
    /// Create a journal writing into `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of today's journal file.
    pub fn file_path(&self) -> PathBuf {
        let stamp = chrono::Local::now().format("%Y%m%d");
        self.dir.join(format!("{}_bridge.log", stamp))
    }

    /// Append one line of text.
    pub fn append(&self, text: &str) {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = self.try_append(text) {
            warn!(error = %e, dir = %self.dir.display(), "failed to write journal entry");
        }
    }

    fn try_append(&self, text: &str) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.file_path())?;
        writeln!(file, "{}", text)
    }
}
