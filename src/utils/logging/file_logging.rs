use super::entry::LogEntry;
use crate::utils::error::Result;
use chrono::NaiveDate;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Appends JSON lines to `<prefix>-YYYY-MM-DD.log`, switching files at midnight UTC
pub struct DailyFileWriter {
    dir: PathBuf,
    prefix: String,
    current: Mutex<Option<(NaiveDate, BufWriter<File>)>>,
}

impl DailyFileWriter {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            prefix: prefix.into(),
            current: Mutex::new(None),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_path(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{}-{}.log", self.prefix, date.format("%Y-%m-%d")))
    }

    pub fn write(&self, entry: &LogEntry) -> Result<()> {
        let line = serde_json::to_string(entry)?;
        let date = entry.timestamp.date_naive();

        let mut current = self.current.lock();
        let stale = !matches!(current.as_ref(), Some((open_date, _)) if *open_date == date);
        if stale {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.file_path(date))?;
            *current = Some((date, BufWriter::new(file)));
        }

        if let Some((_, writer)) = current.as_mut() {
            writeln!(writer, "{}", line)?;
            writer.flush()?;
        }
        Ok(())
    }

    /// Delete log files last modified more than `days_to_keep` days ago
    pub fn cleanup(&self, days_to_keep: u64) -> Result<Vec<PathBuf>> {
        let cutoff = SystemTime::now()
            .checked_sub(Duration::from_secs(days_to_keep * 24 * 60 * 60))
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let open_path = self
            .current
            .lock()
            .as_ref()
            .map(|(date, _)| self.file_path(*date));

        let mut removed = Vec::new();
        for dir_entry in fs::read_dir(&self.dir)? {
            let path = dir_entry?.path();
            if !path.is_file() || open_path.as_ref() == Some(&path) {
                continue;
            }
            let modified = fs::metadata(&path)?.modified()?;
            if modified < cutoff {
                fs::remove_file(&path)?;
                removed.push(path);
            }
        }
        Ok(removed)
    }
}
