use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::StorageError;
use crate::models::UrlRecord;

/// What replay does with a line that is not a valid record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayMode {
    /// Log the line number and keep going.
    #[default]
    Lenient,
    /// Stop and report [`StorageError::CorruptLog`].
    Strict,
}

/// Append-only newline-delimited JSON log of [`UrlRecord`]s.
///
/// Appends are serialized by an async mutex so every record lands as one
/// contiguous line. A failed append is rolled back to the previous end of
/// file, so a half-written record never stays in front of the next one.
#[derive(Debug)]
pub struct AppendLog {
    path: PathBuf,
    writer: Mutex<Option<LogWriter>>,
    sync: bool,
}

impl AppendLog {
    /// Open (or create) the log for appending.
    ///
    /// If a previous process died mid-append the file ends without a
    /// newline; one is added so the next record starts on a fresh line.
    pub fn open<P: AsRef<Path>>(path: P, sync: bool) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)?;
        terminate_torn_tail(&mut file)?;

        Ok(Self {
            path,
            writer: Mutex::new(Some(LogWriter::new(tokio::fs::File::from_std(file)))),
            sync,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. The line is encoded up front and written while the
    /// lock is held, then flushed (and fsynced when `sync` is set).
    pub async fn append(&self, record: &UrlRecord) -> Result<(), StorageError> {
        self.append_after(record, || ()).await
    }

    /// Like [`append`](Self::append), but runs `apply` once the append lock
    /// is held and before anything is written. Callers that mirror the log
    /// in memory use this so memory sees updates in log order. `apply` runs
    /// even if the write then fails.
    pub async fn append_after<F>(&self, record: &UrlRecord, apply: F) -> Result<(), StorageError>
    where
        F: FnOnce(),
    {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut guard = self.writer.lock().await;
        apply();
        let writer = guard.as_mut().ok_or(StorageError::Closed)?;
        writer.append_line(&line, self.sync).await
    }

    /// Flush and release the file handle. Later appends fail with
    /// [`StorageError::Closed`]; closing twice is a no-op.
    pub async fn close(&self) -> Result<(), StorageError> {
        let mut guard = self.writer.lock().await;
        if let Some(mut writer) = guard.take() {
            writer.file.flush().await?;
            writer.file.sync_all().await?;
        }
        Ok(())
    }

    /// Make the next write stop after `written` bytes and fail.
    #[cfg(test)]
    async fn inject_fault(&self, fault: Fault) {
        if let Some(writer) = self.writer.lock().await.as_mut() {
            writer.fault = Some(fault);
        }
    }
}

/// Simulated partial write used by tests.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
struct Fault {
    written: usize,
    /// Also fail the rollback truncation.
    block_rollback: bool,
}

#[derive(Debug)]
struct LogWriter {
    file: tokio::fs::File,
    /// Set when a failed append could not be rolled back: the file then ends
    /// in a fragment and the next append must start a fresh line.
    torn: bool,
    #[cfg(test)]
    fault: Option<Fault>,
}

impl LogWriter {
    fn new(file: tokio::fs::File) -> Self {
        Self {
            file,
            torn: false,
            #[cfg(test)]
            fault: None,
        }
    }

    async fn append_line(&mut self, line: &[u8], sync: bool) -> Result<(), StorageError> {
        let start = self.file.metadata().await?.len();

        let result = if self.torn {
            let mut repaired = Vec::with_capacity(line.len() + 1);
            repaired.push(b'\n');
            repaired.extend_from_slice(line);
            self.write(&repaired, sync).await
        } else {
            self.write(line, sync).await
        };

        match result {
            Ok(()) => {
                self.torn = false;
                Ok(())
            }
            Err(e) => {
                self.roll_back(start).await;
                Err(e.into())
            }
        }
    }

    async fn write(&mut self, bytes: &[u8], sync: bool) -> io::Result<()> {
        #[cfg(test)]
        if let Some(fault) = self.fault {
            let written = fault.written.min(bytes.len());
            self.file.write_all(&bytes[..written]).await?;
            self.file.flush().await?;
            return Err(io::Error::new(io::ErrorKind::Other, "injected write failure"));
        }

        self.file.write_all(bytes).await?;
        self.file.flush().await?;
        if sync {
            self.file.sync_data().await?;
        }
        Ok(())
    }

    /// Truncate back to `len`. If that fails too, remember the torn tail.
    async fn roll_back(&mut self, len: u64) {
        #[cfg(test)]
        if let Some(fault) = self.fault.take() {
            if fault.block_rollback {
                tracing::warn!("could not roll back failed append: injected");
                self.torn = true;
                return;
            }
        }

        if let Err(e) = self.file.set_len(len).await {
            tracing::warn!("could not roll back failed append: {}", e);
            self.torn = true;
        }
    }
}

fn terminate_torn_tail(file: &mut File) -> io::Result<()> {
    if file.metadata()?.len() == 0 {
        return Ok(());
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    if last[0] != b'\n' {
        tracing::warn!("log does not end with a newline, terminating torn record");
        // Append mode: always lands at the end regardless of the seek above.
        file.write_all(b"\n")?;
    }
    Ok(())
}

/// Open the log at `path` for replay, creating an empty file if needed.
pub fn replay<P: AsRef<Path>>(path: P, mode: ReplayMode) -> Result<Replay<File>, StorageError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .read(true)
        .open(path)?;
    Ok(Replay::from_reader(file, mode))
}

/// Lazy iterator over the records of a log, in on-disk order.
///
/// Blank lines are ignored. I/O errors and (in strict mode) corrupt lines end
/// the iteration after being yielded once.
pub struct Replay<R: Read> {
    lines: io::Split<BufReader<R>>,
    mode: ReplayMode,
    line_no: usize,
    skipped: usize,
    done: bool,
}

impl<R: Read> Replay<R> {
    pub fn from_reader(reader: R, mode: ReplayMode) -> Self {
        Self {
            lines: BufReader::new(reader).split(b'\n'),
            mode,
            line_no: 0,
            skipped: 0,
            done: false,
        }
    }

    /// Number of malformed lines skipped so far (lenient mode only).
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<R: Read> Iterator for Replay<R> {
    type Item = Result<UrlRecord, StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            };
            self.line_no += 1;

            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            match serde_json::from_slice::<UrlRecord>(&line) {
                Ok(record) => return Some(Ok(record)),
                Err(source) => match self.mode {
                    ReplayMode::Lenient => {
                        tracing::warn!("skipping malformed log line {}: {}", self.line_no, source);
                        self.skipped += 1;
                    }
                    ReplayMode::Strict => {
                        self.done = true;
                        return Some(Err(StorageError::CorruptLog {
                            line: self.line_no,
                            source,
                        }));
                    }
                },
            }
        }
    }
}
