// ─── Concurrent Downloader ───
// Bounded parallel task pool with validate-or-fetch semantics and mirror
// failover. Files already valid on disk cost no network I/O; everything
// fetched is re-validated before it counts as done.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::core::archive::extract_archive;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::EventBus;
use crate::core::files::validate_file;
use crate::core::http::HttpClient;
use crate::core::mirror::mirror_candidates;

/// Pool width for general launch-time batches.
pub const DEFAULT_CONCURRENCY: usize = 32;
/// Pool width for managed Java runtime installs.
pub const JAVA_INSTALL_CONCURRENCY: usize = 16;

/// A single file to materialise on disk.
///
/// Invariant: when the task completes successfully, `dest` exists and
/// satisfies `validate_file(dest, size, sha1)`.
#[derive(Debug, Clone)]
pub struct DownloadTask {
    pub url: String,
    pub dest: PathBuf,
    pub size: Option<u64>,
    pub sha1: Option<String>,
    /// Extract the archive into this directory after validation.
    pub extract_to: Option<PathBuf>,
}

impl DownloadTask {
    pub fn new(url: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            dest: dest.into(),
            size: None,
            sha1: None,
            extract_to: None,
        }
    }

    pub fn with_checksum(mut self, size: Option<u64>, sha1: Option<String>) -> Self {
        self.size = size;
        self.sha1 = sha1.filter(|s| !s.is_empty());
        self
    }

    pub fn with_extract_to(mut self, target: impl Into<PathBuf>) -> Self {
        self.extract_to = Some(target.into());
        self
    }
}

/// Invoked with `(completed, total)` for every completed task index that
/// is the last one or a multiple of 5.
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Concurrent, SHA-1 validated downloader with mirror failover.
pub struct Downloader {
    http: Arc<HttpClient>,
    events: Arc<EventBus>,
}

impl Downloader {
    pub fn new(http: Arc<HttpClient>, events: Arc<EventBus>) -> Self {
        Self { http, events }
    }

    /// Run all tasks to completion through a pool of `concurrency`
    /// workers. A failed task never short-circuits the batch; the result
    /// is the logical AND over per-task success.
    pub async fn batch_download(
        &self,
        tasks: Vec<DownloadTask>,
        concurrency: usize,
        progress: Option<ProgressCallback>,
    ) -> bool {
        let total = tasks.len();
        if total == 0 {
            return true;
        }
        info!(
            "Starting batch download: {} tasks, concurrency={}",
            total, concurrency
        );

        let completed = Arc::new(AtomicUsize::new(0));
        let last_reported = Arc::new(Mutex::new(0usize));

        let results: Vec<bool> = stream::iter(tasks)
            .map(|task| {
                let completed = completed.clone();
                let last_reported = last_reported.clone();
                let progress = progress.clone();
                async move {
                    let ok = match self.run_task(&task).await {
                        Ok(()) => true,
                        Err(err) => {
                            warn!("Task failed for {}: {}", task.url, err);
                            false
                        }
                    };

                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if done == total || done % 5 == 0 {
                        // Commit under a try-acquire so completed counts
                        // reach the callback in non-decreasing order; the
                        // callback itself runs with no lock held.
                        let mut fire = false;
                        if let Ok(mut last) = last_reported.try_lock() {
                            if done > *last {
                                *last = done;
                                fire = true;
                            }
                        }
                        if fire {
                            if let Some(callback) = &progress {
                                callback(done, total);
                            }
                        }
                    }

                    ok
                }
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        let failed = results.iter().filter(|ok| !**ok).count();
        if failed > 0 {
            warn!("Batch finished with {}/{} failed tasks", failed, total);
        }
        failed == 0
    }

    /// Validate-or-fetch one task, walking the mirror candidate chain.
    async fn run_task(&self, task: &DownloadTask) -> LauncherResult<()> {
        if is_valid(&task.dest, task.size, task.sha1.clone()).await {
            debug!("Skipping {:?} (already valid)", task.dest);
            self.maybe_extract(task).await?;
            return Ok(());
        }

        if let Some(parent) = task.dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| LauncherError::io(parent, source))?;
        }

        let mut last_error = None;
        for candidate in mirror_candidates(&task.url) {
            let bytes = match self.http.get(&candidate).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    last_error = Some(err);
                    continue;
                }
            };

            write_atomic(&task.dest, &bytes).await?;

            if is_valid(&task.dest, task.size, task.sha1.clone()).await {
                self.maybe_extract(task).await?;
                return Ok(());
            }

            self.events.launch_log(format!(
                "Corrupt download from {candidate}, trying next source"
            ));
            let _ = tokio::fs::remove_file(&task.dest).await;
            last_error = Some(LauncherError::Sha1Mismatch {
                path: task.dest.clone(),
                expected: task.sha1.clone().unwrap_or_default(),
                actual: "<mismatch>".into(),
            });
        }

        Err(last_error.unwrap_or_else(|| {
            LauncherError::Other(format!("no download candidates for {}", task.url))
        }))
    }

    async fn maybe_extract(&self, task: &DownloadTask) -> LauncherResult<()> {
        let Some(target) = task.extract_to.clone() else {
            return Ok(());
        };
        let archive = task.dest.clone();
        tokio::task::spawn_blocking(move || extract_archive(&archive, &target))
            .await
            .map_err(|err| LauncherError::Other(format!("extract worker panicked: {err}")))?
    }
}

/// Atomic materialisation: write to a sibling temp file, then rename. A
/// crash mid-write leaves a file that fails the next validator check.
async fn write_atomic(dest: &Path, bytes: &[u8]) -> LauncherResult<()> {
    let file_name = dest
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "download".into());
    let tmp = dest.with_file_name(format!("{file_name}.part"));

    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|source| LauncherError::io(&tmp, source))?;
    tokio::fs::rename(&tmp, dest)
        .await
        .map_err(|source| LauncherError::io(dest, source))?;
    Ok(())
}

/// Validator on a blocking worker: hashing a client jar is CPU-bound.
async fn is_valid(path: &Path, size: Option<u64>, sha1: Option<String>) -> bool {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || validate_file(&path, size, sha1.as_deref()))
        .await
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_SHA1: &str = "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d";

    fn downloader() -> Downloader {
        Downloader::new(
            Arc::new(HttpClient::new().unwrap()),
            Arc::new(EventBus::new()),
        )
    }

    #[tokio::test]
    async fn valid_local_file_is_skipped_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("lib.jar");
        std::fs::write(&dest, b"hello").unwrap();

        // The URL is unreachable; success proves no network I/O happened.
        let task = DownloadTask::new("http://127.0.0.1:9/lib.jar", &dest)
            .with_checksum(Some(5), Some(HELLO_SHA1.into()));

        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = calls.clone();
        let ok = downloader()
            .batch_download(
                vec![task],
                4,
                Some(Arc::new(move |done, total| {
                    sink.lock().unwrap().push((done, total));
                })),
            )
            .await;

        assert!(ok);
        assert_eq!(calls.lock().unwrap().as_slice(), &[(1, 1)]);
    }

    #[tokio::test]
    async fn unreachable_task_fails_batch_but_runs_to_completion() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.bin");
        std::fs::write(&good, b"hello").unwrap();

        let tasks = vec![
            DownloadTask::new("http://127.0.0.1:9/missing.bin", dir.path().join("missing.bin")),
            DownloadTask::new("http://127.0.0.1:9/good.bin", &good)
                .with_checksum(Some(5), Some(HELLO_SHA1.into())),
        ];

        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = calls.clone();
        let ok = downloader()
            .batch_download(
                tasks,
                2,
                Some(Arc::new(move |done, total| {
                    sink.lock().unwrap().push((done, total));
                })),
            )
            .await;

        assert!(!ok);
        // Both tasks completed: the final callback reports 2/2.
        assert_eq!(calls.lock().unwrap().last(), Some(&(2, 2)));
    }

    #[tokio::test]
    async fn empty_batch_succeeds() {
        assert!(downloader().batch_download(Vec::new(), 8, None).await);
    }

    #[tokio::test]
    async fn valid_archive_task_with_extract_target_is_unpacked() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("native.jar");
        let file = std::fs::File::create(&archive).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file("payload.dll", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"dll bytes").unwrap();
        zip.finish().unwrap();

        let target = dir.path().join("extracted");
        let task = DownloadTask::new("http://127.0.0.1:9/native.jar", &archive)
            .with_extract_to(&target);

        assert!(downloader().batch_download(vec![task], 1, None).await);
        assert_eq!(std::fs::read(target.join("payload.dll")).unwrap(), b"dll bytes");
    }

    #[test]
    fn checksum_builder_drops_empty_sha1() {
        let task = DownloadTask::new("https://example.com/a", "/tmp/a")
            .with_checksum(Some(1), Some(String::new()));
        assert!(task.sha1.is_none());
    }
}
