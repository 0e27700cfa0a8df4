//! Inbox directory watcher.
//!
//! Watches a directory for PDF files and emits an event once a file is
//! stable (size unchanged for the stability delay, so partially copied
//! files are never uploaded). Files are deduplicated by content hash
//! for the lifetime of the watcher.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Utc};
use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Errors that can occur with the inbox watcher
#[derive(Debug, Error)]
pub enum InboxError {
    #[error("inbox directory does not exist: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration for the inbox watcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxConfig {
    /// Directory to watch for new PDFs
    pub watch_path: PathBuf,

    /// How long a file's size must be unchanged before upload (seconds)
    pub stability_delay_secs: u64,
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            watch_path: Self::default_inbox_path(),
            stability_delay_secs: 2,
        }
    }
}

impl InboxConfig {
    /// Default inbox location (~/legalens-inbox)
    pub fn default_inbox_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("legalens-inbox")
    }

    /// Check that the watch path exists
    pub fn validate(&self) -> Result<(), InboxError> {
        if !self.watch_path.exists() {
            return Err(InboxError::DirectoryNotFound(self.watch_path.clone()));
        }
        Ok(())
    }
}

/// Event emitted when a PDF is detected and stable
#[derive(Debug, Clone)]
pub struct PdfFileEvent {
    /// Path to the PDF
    pub path: PathBuf,

    /// SHA256 content hash (12 chars)
    pub hash: String,

    /// File size in bytes
    pub size: u64,

    /// When the file was detected
    pub detected_at: DateTime<Utc>,
}

/// Inbox watcher with stability checking and content-hash dedupe
pub struct InboxWatcher {
    config: InboxConfig,
}

impl InboxWatcher {
    pub fn new() -> Self {
        Self {
            config: InboxConfig::default(),
        }
    }

    pub fn with_config(config: InboxConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InboxConfig {
        &self.config
    }

    /// Scan the directory once, returning an event for every PDF not
    /// seen before. `seen` accumulates hashes across calls.
    pub async fn scan_once(&self, seen: &mut HashSet<String>) -> Result<Vec<PdfFileEvent>, InboxError> {
        self.config.validate()?;

        let mut events = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.config.watch_path).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();

            if !is_pdf(&path) {
                continue;
            }

            let metadata = match tokio::fs::metadata(&path).await {
                Ok(m) if m.is_file() => m,
                _ => continue,
            };

            match compute_file_hash(&path).await {
                Ok(hash) => {
                    if !seen.insert(hash.clone()) {
                        debug!(path = %path.display(), "already seen, skipping");
                        continue;
                    }
                    events.push(PdfFileEvent {
                        path,
                        hash,
                        size: metadata.len(),
                        detected_at: Utc::now(),
                    });
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to hash file");
                }
            }
        }

        Ok(events)
    }

    /// Watch the directory and emit events for new stable PDFs.
    /// Runs until stopped via the returned handle.
    pub fn watch(
        &self,
        seen: HashSet<String>,
    ) -> Result<(mpsc::Receiver<PdfFileEvent>, WatchHandle), InboxError> {
        self.config.validate()?;

        let (event_tx, event_rx) = mpsc::channel::<PdfFileEvent>(100);
        let (stop_tx, stop_rx) = mpsc::channel::<()>(1);

        let config = self.config.clone();

        let task = tokio::spawn(async move {
            if let Err(e) = run_watcher(config, seen, event_tx, stop_rx).await {
                tracing::error!("inbox watcher error: {}", e);
            }
        });

        Ok((event_rx, WatchHandle { stop_tx, task }))
    }
}

impl Default for InboxWatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to stop the watcher
pub struct WatchHandle {
    stop_tx: mpsc::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl WatchHandle {
    pub async fn stop(self) -> Result<()> {
        let _ = self.stop_tx.send(()).await;
        self.task.await?;
        Ok(())
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Internal watcher loop
async fn run_watcher(
    config: InboxConfig,
    mut seen: HashSet<String>,
    event_tx: mpsc::Sender<PdfFileEvent>,
    mut stop_rx: mpsc::Receiver<()>,
) -> Result<()> {
    // Files waiting to stabilize (path -> (size, last change))
    let mut pending: HashMap<PathBuf, (u64, Instant)> = HashMap::new();

    let (tx, rx) = std::sync::mpsc::channel();
    let mut debouncer = new_debouncer(Duration::from_millis(500), tx)?;
    debouncer
        .watcher()
        .watch(&config.watch_path, RecursiveMode::NonRecursive)?;

    let stability_delay = Duration::from_secs(config.stability_delay_secs);

    info!("watching {} for PDFs", config.watch_path.display());

    loop {
        if stop_rx.try_recv().is_ok() {
            info!("inbox watcher stopping");
            break;
        }

        // Collect debounced filesystem events without blocking the runtime
        match rx.try_recv() {
            Ok(Ok(events)) => {
                for event in events {
                    let path = event.path;
                    if !is_pdf(&path) {
                        continue;
                    }
                    if let Ok(metadata) = std::fs::metadata(&path) {
                        if metadata.is_file() {
                            pending.insert(path, (metadata.len(), Instant::now()));
                        }
                    }
                }
            }
            Ok(Err(e)) => {
                warn!("inbox watch error: {:?}", e);
            }
            Err(std::sync::mpsc::TryRecvError::Empty) => {}
            Err(std::sync::mpsc::TryRecvError::Disconnected) => {
                warn!("inbox watch channel disconnected");
                break;
            }
        }

        // Promote files whose size has held still long enough
        let now = Instant::now();
        let mut stable = Vec::new();
        for (path, (last_size, last_seen)) in pending.iter_mut() {
            if now.duration_since(*last_seen) < stability_delay {
                continue;
            }
            match std::fs::metadata(path) {
                Ok(metadata) if metadata.len() == *last_size && metadata.len() > 0 => {
                    stable.push((path.clone(), metadata.len()));
                }
                Ok(metadata) => {
                    // Still growing, restart the stability clock
                    *last_size = metadata.len();
                    *last_seen = now;
                }
                Err(_) => {
                    stable.push((path.clone(), 0));
                }
            }
        }

        for (path, size) in stable {
            pending.remove(&path);
            if size == 0 {
                continue;
            }

            match compute_file_hash(&path).await {
                Ok(hash) => {
                    if !seen.insert(hash.clone()) {
                        debug!(path = %path.display(), "duplicate content, skipping");
                        continue;
                    }
                    info!(path = %path.display(), %hash, "new PDF in inbox");
                    let event = PdfFileEvent {
                        path,
                        hash,
                        size,
                        detected_at: Utc::now(),
                    };
                    if event_tx.send(event).await.is_err() {
                        return Ok(());
                    }
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to hash file");
                }
            }
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    Ok(())
}

/// SHA256 hash of file content, first 12 hex characters
pub async fn compute_file_hash(path: &Path) -> Result<String, std::io::Error> {
    let content = tokio::fs::read(path).await?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    let digest = hasher.finalize();

    Ok(format!("{:x}", digest)[..12].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_pdf_by_extension() {
        assert!(is_pdf(Path::new("/inbox/contract.pdf")));
        assert!(is_pdf(Path::new("/inbox/CONTRACT.PDF")));
        assert!(!is_pdf(Path::new("/inbox/notes.txt")));
        assert!(!is_pdf(Path::new("/inbox/no-extension")));
    }

    #[tokio::test]
    async fn test_scan_once_finds_only_new_pdfs() {
        let temp = TempDir::new().unwrap();
        tokio::fs::write(temp.path().join("a.pdf"), b"%PDF a").await.unwrap();
        tokio::fs::write(temp.path().join("b.pdf"), b"%PDF b").await.unwrap();
        tokio::fs::write(temp.path().join("skip.txt"), b"not a pdf").await.unwrap();

        let watcher = InboxWatcher::with_config(InboxConfig {
            watch_path: temp.path().to_path_buf(),
            stability_delay_secs: 1,
        });

        let mut seen = HashSet::new();
        let events = watcher.scan_once(&mut seen).await.unwrap();
        assert_eq!(events.len(), 2);

        // Second scan sees nothing new
        let events = watcher.scan_once(&mut seen).await.unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_scan_once_dedupes_identical_content() {
        let temp = TempDir::new().unwrap();
        tokio::fs::write(temp.path().join("one.pdf"), b"%PDF same").await.unwrap();
        tokio::fs::write(temp.path().join("copy.pdf"), b"%PDF same").await.unwrap();

        let watcher = InboxWatcher::with_config(InboxConfig {
            watch_path: temp.path().to_path_buf(),
            stability_delay_secs: 1,
        });

        let mut seen = HashSet::new();
        let events = watcher.scan_once(&mut seen).await.unwrap();
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_directory_rejected() {
        let watcher = InboxWatcher::with_config(InboxConfig {
            watch_path: PathBuf::from("/nope/never/here"),
            stability_delay_secs: 1,
        });

        let mut seen = HashSet::new();
        assert!(matches!(
            watcher.scan_once(&mut seen).await,
            Err(InboxError::DirectoryNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_compute_file_hash_is_stable() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("doc.pdf");
        tokio::fs::write(&path, b"%PDF content").await.unwrap();

        let h1 = compute_file_hash(&path).await.unwrap();
        let h2 = compute_file_hash(&path).await.unwrap();

        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 12);
    }
}
