//! Raw session transcripts on disk, for debugging marker handling.

use std::env;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;

/// Append-only log of raw turn transcripts. Disabled by default; when
/// enabled, each entry records the full transcript with markers intact.
pub struct SessionLog {
    file: Option<File>,
    path: Option<PathBuf>,
}

impl SessionLog {
    pub fn disabled() -> Self {
        SessionLog {
            file: None,
            path: None,
        }
    }

    /// Create a timestamped log file under the per-project log directory.
    pub fn create() -> Result<Self> {
        let dir = log_directory();
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

        let timestamp = Utc::now().format("%Y%m%d-%H%M%S").to_string();
        let path = dir.join(format!("{}.log", timestamp));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening {}", path.display()))?;

        Ok(SessionLog {
            file: Some(file),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Record one labeled entry. Logging failures are swallowed; the log is
    /// a debugging aid, never part of the exchange.
    pub fn record(&mut self, label: &str, text: &str) {
        if let Some(file) = self.file.as_mut() {
            let stamp = Utc::now().format("%H:%M:%S");
            let _ = writeln!(file, "[{} {}]\n{}\n", stamp, label, text);
        }
    }
}

/// `$TMPDIR/tangent/logs/<project>`, where `<project>` is the name of the
/// current working directory.
pub fn log_directory() -> PathBuf {
    let base = env::var_os("TMPDIR")
        .or_else(|| env::var_os("XDG_RUNTIME_DIR"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"));

    let project = env::current_dir()
        .ok()
        .and_then(|cwd| cwd.file_name().map(|name| name.to_os_string()))
        .unwrap_or_else(|| "unknown".into());

    base.join("tangent").join("logs").join(project)
}
