// Append-only JSON lines store for conversation history
// Author: kelexine (https://github.com/kelexine)

use crate::cache::models::{HistoryRead, Record, SkippedLine};
use crate::error::Result;
use crate::utils::atomic_write::atomic_write;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Number of lines `drop_first` removes when the caller has no better idea.
/// Two user/assistant exchanges.
pub const DEFAULT_DROP_COUNT: usize = 4;

/// Newline-delimited JSON file holding one [`Record`] per line.
///
/// Not locked: one writer per file at a time.
#[derive(Debug, Clone)]
pub struct LineRecordStore {
    path: PathBuf,
}

impl LineRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create an empty backing file if it does not exist yet. Existing
    /// content is never touched.
    pub fn ensure_exists(&self) -> Result<()> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        Ok(())
    }

    /// Read every record in file order, reporting undecodable lines.
    pub fn read_all(&self) -> Result<HistoryRead> {
        let lines = self.read_lines()?;
        Ok(self.parse_lines(&lines))
    }

    /// Read the last `n` records. Asking for more than the file holds
    /// returns everything.
    pub fn read_last(&self, n: usize) -> Result<HistoryRead> {
        let lines = self.read_lines()?;
        let start = lines.len().saturating_sub(n);
        Ok(self.parse_lines(&lines[start..]))
    }

    /// Append `records` as one write.
    ///
    /// The batch is serialized up front, so a record that fails to serialize
    /// leaves the file untouched. A torn final line from an earlier crash is
    /// terminated first so new records start on a line of their own.
    pub fn append_batch(&self, records: &[Record]) -> Result<()> {
        if records.is_empty() {
            return self.ensure_exists();
        }

        let mut buffer = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buffer, record)?;
            buffer.push(b'\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;

        if Self::ends_without_newline(&mut file)? {
            buffer.insert(0, b'\n');
        }

        file.write_all(&buffer)?;
        file.sync_data()?;

        debug!(
            "Appended {} records to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Remove the first `n` lines and keep the rest in order.
    pub fn drop_first(&self, n: usize) -> Result<()> {
        self.ensure_exists()?;
        let content = fs::read(&self.path)?;

        let remainder: Vec<u8> = content
            .split_inclusive(|b| *b == b'\n')
            .skip(n)
            .flatten()
            .copied()
            .collect();

        atomic_write(&self.path, &remainder)?;
        debug!("Dropped first {} lines of {}", n, self.path.display());
        Ok(())
    }

    /// Empty the history.
    pub fn truncate(&self) -> Result<()> {
        File::create(&self.path)?;
        debug!("Truncated {}", self.path.display());
        Ok(())
    }

    /// Non-blank lines with their 1-based line numbers.
    fn read_lines(&self) -> Result<Vec<(usize, Vec<u8>)>> {
        self.ensure_exists()?;
        let content = fs::read(&self.path)?;

        Ok(content
            .split(|b| *b == b'\n')
            .enumerate()
            .filter(|(_, line)| !line.iter().all(u8::is_ascii_whitespace))
            .map(|(i, line)| (i + 1, line.strip_suffix(b"\r").unwrap_or(line).to_vec()))
            .collect())
    }

    fn parse_lines(&self, lines: &[(usize, Vec<u8>)]) -> HistoryRead {
        let mut read = HistoryRead::default();

        for (line_number, line) in lines {
            match serde_json::from_slice::<Record>(line) {
                Ok(record) => read.records.push(record),
                Err(e) => {
                    warn!(
                        "{}:{}: skipping malformed history line: {}",
                        self.path.display(),
                        line_number,
                        e
                    );
                    read.skipped.push(SkippedLine {
                        line_number: *line_number,
                        error: e.to_string(),
                    });
                }
            }
        }

        read
    }

    fn ends_without_newline(file: &mut File) -> std::io::Result<bool> {
        if file.metadata()?.len() == 0 {
            return Ok(false);
        }
        let mut last = [0u8; 1];
        file.seek(SeekFrom::End(-1))?;
        file.read_exact(&mut last)?;
        Ok(last[0] != b'\n')
    }
}
