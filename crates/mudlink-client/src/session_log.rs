//! Plain-text session logs.
//!
//! One file per logging run, append-only raw text, no rotation. The file is
//! created on the caller's thread so a bad path is reported immediately;
//! writes happen on a background task in arrival order.

use std::path::{Path, PathBuf};

use chrono::Local;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use mudlink_core::error::{MudError, MudResult};

/// An open log file.
#[derive(Debug)]
pub struct SessionLog {
    path: PathBuf,
    tx: Option<mpsc::UnboundedSender<String>>,
    handle: Option<JoinHandle<()>>,
}

impl SessionLog {
    /// Create (or append to) `path` and write the header line.
    pub fn open(path: impl Into<PathBuf>, label: &str) -> MudResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| MudError::InvalidInput(format!("{}: {e}", path.display())))?;

        let header = format!(
            "--- log started {} for {label} ---\n",
            Local::now().to_rfc3339()
        );

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let task_path = path.clone();
        let handle = tokio::spawn(async move {
            let mut file = tokio::fs::File::from_std(file);
            if let Err(e) = file.write_all(header.as_bytes()).await {
                error!(path = %task_path.display(), error = %e, "failed to write log header");
                return;
            }
            while let Some(text) = rx.recv().await {
                if let Err(e) = file.write_all(text.as_bytes()).await {
                    error!(path = %task_path.display(), error = %e, "failed to write log");
                    return;
                }
            }
            if let Err(e) = file.flush().await {
                error!(path = %task_path.display(), error = %e, "failed to flush log");
            }
            debug!(path = %task_path.display(), "log closed");
        });

        debug!(path = %path.display(), "log opened");
        Ok(Self {
            path,
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.tx.is_some()
    }

    /// Queue raw text. Best effort: failures are logged by the writer task.
    pub fn write(&self, text: &str) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(text.to_string());
        }
    }

    /// Stop accepting text. Already-queued text is still written.
    pub fn close(&mut self) {
        self.tx = None;
    }

    /// Close and wait until everything queued is on disk.
    pub async fn finish(mut self) {
        self.close();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

/// `<dir>/<label>-<YYYYmmdd-HHMMSS>.log`, with path-hostile characters in the
/// label replaced by `_`.
pub fn default_log_path(dir: &Path, label: &str) -> PathBuf {
    let stem: String = label
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '@') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    dir.join(format!("{stem}-{stamp}.log"))
}
