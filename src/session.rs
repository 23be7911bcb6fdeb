// One plain-text file per session: `<window_id>\n<last_notified_at>`, where
// the timestamp is fractional Unix seconds (`0` right after `init`).

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::debug;

use crate::error::{NotifierError, Result};

const MAX_SESSION_ID_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn parse(raw: &str) -> Result<Self> {
        let reject = |reason| {
            Err(NotifierError::InvalidSessionId {
                id: raw.to_string(),
                reason,
            })
        };

        if raw.is_empty() {
            return reject("empty");
        }
        if raw.len() > MAX_SESSION_ID_LEN {
            return reject("too long");
        }
        if raw.starts_with('.') {
            return reject("leading dot");
        }
        if !raw
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
        {
            return reject("unsupported character");
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub window_id: String,
    pub last_notified_at: f64,
}

impl SessionRecord {
    pub fn new(window_id: impl Into<String>) -> Self {
        Self {
            window_id: window_id.into(),
            last_notified_at: 0.0,
        }
    }

    pub fn encode(&self) -> String {
        format!("{}\n{}", self.window_id, self.last_notified_at)
    }

    /// Decodes the two-line layout. A missing timestamp line reads as `0`.
    pub fn decode(raw: &str) -> std::result::Result<Self, String> {
        let mut lines = raw.trim().lines();
        let window_id = lines
            .next()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .ok_or_else(|| "missing window id".to_string())?;

        let last_notified_at = match lines.next().map(str::trim) {
            None | Some("") => 0.0,
            Some(value) => value
                .parse::<f64>()
                .ok()
                .filter(|ts| ts.is_finite())
                .ok_or_else(|| format!("invalid timestamp {value:?}"))?,
        };

        if lines.next().is_some() {
            return Err("unexpected trailing lines".to_string());
        }

        Ok(Self {
            window_id: window_id.to_string(),
            last_notified_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Touch {
    Proceed(SessionRecord),
    Duplicate(DuplicateReason),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DuplicateReason {
    LockContended,
    WithinThreshold { elapsed: f64 },
}

impl Touch {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: &SessionId) -> PathBuf {
        self.dir.join(id.as_str())
    }

    pub fn create(&self, id: &SessionId, window_id: &str) -> Result<()> {
        if window_id.trim().is_empty() || window_id.contains(['\n', '\r']) {
            return Err(NotifierError::InvalidInput(format!(
                "window id {window_id:?} cannot be stored"
            )));
        }

        fs::create_dir_all(&self.dir).map_err(|err| {
            NotifierError::io(
                format!("failed to create session directory {}", self.dir.display()),
                err,
            )
        })?;

        let path = self.path_for(id);
        let record = SessionRecord::new(window_id.trim());
        fs::write(&path, record.encode()).map_err(|err| {
            NotifierError::io(format!("failed to write {}", path.display()), err)
        })?;
        debug!(session = %id, window_id = %record.window_id, path = %path.display(), "session initialized");
        Ok(())
    }

    pub fn read(&self, id: &SessionId) -> Result<SessionRecord> {
        let path = self.path_for(id);
        let mut file = self.open(id, &path, false)?;
        read_record(&mut file, &path)
    }

    /// Lock-guarded read-modify-write of the dedup timestamp. Contention is a
    /// duplicate and leaves the file untouched.
    pub fn compare_and_touch(&self, id: &SessionId, now: f64, threshold: f64) -> Result<Touch> {
        let Some(mut locked) = self.try_lock(id)? else {
            return Ok(Touch::Duplicate(DuplicateReason::LockContended));
        };

        let mut record = locked.read()?;
        let elapsed = now - record.last_notified_at;
        if elapsed < threshold {
            return Ok(Touch::Duplicate(DuplicateReason::WithinThreshold { elapsed }));
        }

        record.last_notified_at = now;
        locked.rewrite(&record)?;
        Ok(Touch::Proceed(record))
    }

    pub fn try_lock(&self, id: &SessionId) -> Result<Option<SessionLock>> {
        let path = self.path_for(id);
        let file = self.open(id, &path, true)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(SessionLock { file, path })),
            Err(err) if err.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(err) => Err(NotifierError::io(
                format!("failed to lock {}", path.display()),
                err,
            )),
        }
    }

    fn open(&self, id: &SessionId, path: &Path, write: bool) -> Result<File> {
        OpenOptions::new()
            .read(true)
            .write(write)
            .open(path)
            .map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => NotifierError::MissingSession {
                    session_id: id.to_string(),
                    path: path.to_path_buf(),
                },
                _ => NotifierError::io(format!("failed to open {}", path.display()), err),
            })
    }
}

pub struct SessionLock {
    file: File,
    path: PathBuf,
}

impl SessionLock {
    pub fn read(&mut self) -> Result<SessionRecord> {
        read_record(&mut self.file, &self.path)
    }

    pub fn rewrite(&mut self, record: &SessionRecord) -> Result<()> {
        let write = |file: &mut File| -> io::Result<()> {
            file.seek(SeekFrom::Start(0))?;
            file.set_len(0)?;
            file.write_all(record.encode().as_bytes())?;
            file.flush()
        };
        write(&mut self.file)
            .map_err(|err| NotifierError::io(format!("failed to rewrite {}", self.path.display()), err))
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn read_record(file: &mut File, path: &Path) -> Result<SessionRecord> {
    let mut bytes = Vec::new();
    file.seek(SeekFrom::Start(0))
        .and_then(|_| file.read_to_end(&mut bytes))
        .map_err(|err| NotifierError::io(format!("failed to read {}", path.display()), err))?;

    let corrupt = |reason: String| NotifierError::CorruptRecord {
        path: path.to_path_buf(),
        reason,
    };
    let raw = String::from_utf8(bytes).map_err(|_| corrupt("not valid UTF-8".to_string()))?;
    SessionRecord::decode(&raw).map_err(corrupt)
}
