use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{EnvFilter, fmt};

pub const MAX_LOG_LINES: usize = 2250;
pub const TRIM_TO_LINES: usize = 1250;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Installs the global subscriber. Runs before `Settings` is built so that
/// configuration warnings reach the log.
pub fn setup_tracing(log_path: &Path, debug: bool) {
    let default = if debug {
        "cc_notifier=debug,warn"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(LogFile::new(log_path))
        .with_ansi(false)
        .with_target(false)
        .with_timer(ChronoLocal::new(TIMESTAMP_FORMAT.to_string()))
        .try_init();
}

#[derive(Debug, Clone)]
pub struct LogFile {
    path: PathBuf,
}

impl LogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, entry: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;
        file.lock_exclusive()?;
        let result = file.write_all(entry).and_then(|_| trim_locked(&mut file));
        let _ = file.unlock();
        result
    }
}

/// Buffers one formatted event and appends it when dropped.
pub struct EntryWriter {
    log: LogFile,
    buf: Vec<u8>,
}

impl Write for EntryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for EntryWriter {
    fn drop(&mut self) {
        if !self.buf.is_empty() {
            let _ = self.log.append(&self.buf);
        }
    }
}

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = EntryWriter;

    fn make_writer(&'a self) -> Self::Writer {
        EntryWriter {
            log: self.clone(),
            buf: Vec::new(),
        }
    }
}

fn trim_locked(file: &mut File) -> io::Result<()> {
    file.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    let contents = String::from_utf8_lossy(&bytes);
    let lines: Vec<&str> = contents.lines().collect();
    if lines.len() <= MAX_LOG_LINES {
        return Ok(());
    }

    let mut kept = lines[lines.len() - TRIM_TO_LINES..].join("\n");
    kept.push('\n');
    // Append mode: after truncation the write lands at offset 0.
    file.set_len(0)?;
    file.write_all(kept.as_bytes())
}
