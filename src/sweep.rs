use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub failed: usize,
}

/// Deletes regular files directly inside `dir` whose modification time is
/// strictly older than `now - retention`. Age is the only criterion; a file
/// that cannot be inspected or removed is skipped.
pub fn sweep(dir: &Path, now: SystemTime, retention: Duration) -> SweepReport {
    let mut report = SweepReport::default();
    let Some(cutoff) = now.checked_sub(retention) else {
        return report;
    };

    let entries = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file());

    for entry in entries {
        let Some(modified) = entry.metadata().ok().and_then(|meta| meta.modified().ok()) else {
            continue;
        };
        if modified >= cutoff {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => report.removed += 1,
            Err(err) => {
                debug!(path = %entry.path().display(), error = %err, "failed to remove stale session file");
                report.failed += 1;
            }
        }
    }

    debug!(
        dir = %dir.display(),
        removed = report.removed,
        failed = report.failed,
        "session cleanup completed"
    );
    report
}
