//! Append-only text log
//!
//! Only construction can fail. Once the file is open, write errors are
//! reported through `tracing` and counted, never returned.

use parking_lot::Mutex;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::error;

use super::status::{StatusFormat, StatusLine};
use crate::error::LoggerError;

/// UTF-8 byte-order mark written at the start of every log
pub const BYTE_ORDER_MARK: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Text log shared by all worker threads
pub struct TextLogger {
    path: PathBuf,
    format: StatusFormat,
    file: Mutex<File>,
    write_failures: AtomicU64,
}

impl TextLogger {
    /// Create (or truncate) the log file and write the byte-order mark
    pub fn create(path: impl AsRef<Path>, format: StatusFormat) -> Result<Self, LoggerError> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::create(&path).map_err(|source| LoggerError::Create {
            path: path.clone(),
            source,
        })?;
        file.write_all(BYTE_ORDER_MARK)
            .map_err(|source| LoggerError::Write {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            format,
            file: Mutex::new(file),
            write_failures: AtomicU64::new(0),
        })
    }

    pub fn log_message(&self, message: &str) {
        self.write_line(message);
    }

    pub fn log_error(&self, message: &str) {
        self.write_line(message);
    }

    /// Write the column legend (console format only)
    pub fn log_legend(&self) {
        if let Some(legend) = StatusLine::legend(self.format) {
            self.write_raw(&legend);
        }
    }

    pub fn log_header(&self) {
        self.write_raw(&StatusLine::header(self.format));
    }

    pub fn log_status(&self, status: &StatusLine) {
        self.write_raw(&status.render(self.format));
    }

    pub fn is_csv(&self) -> bool {
        self.format == StatusFormat::Csv
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes that failed since creation
    pub fn write_failures(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }

    fn write_line(&self, message: &str) {
        if message.ends_with('\n') {
            self.write_raw(message);
        } else {
            self.write_raw(&format!("{message}\n"));
        }
    }

    fn write_raw(&self, text: &str) {
        let mut file = self.file.lock();
        if let Err(e) = file.write_all(text.as_bytes()) {
            drop(file);
            self.write_failures.fetch_add(1, Ordering::Relaxed);
            error!(error = %e, path = ?self.path, "Text log write failed");
        }
    }
}

impl std::fmt::Debug for TextLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextLogger")
            .field("path", &self.path)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}
