// ─── Java Installer ───
// Three-phase managed runtime provisioning driven by the piston-meta
// runtime index: list files, batch-download them, then probe and
// register the result. Any failure removes the whole component
// directory so a partial install can never be indexed as valid.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::downloader::{DownloadTask, Downloader, JAVA_INSTALL_CONCURRENCY};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::{
    EventBus, LauncherEvent, JAVA_PHASE_DOWNLOAD, JAVA_PHASE_FILE_LIST, JAVA_PHASE_REGISTER,
};
use crate::core::http::HttpClient;
use crate::core::java::index::JavaIndex;
use crate::core::java::scan::scan_dir_for_java;
use crate::core::workspace::Workspace;

/// Index of every Mojang-managed Java runtime, per platform.
pub const JAVA_RUNTIME_INDEX_URL: &str = "https://launchermeta.mojang.com/v1/products/java-runtime/2ec0cc96c44e5a76b9c8b7c39df7210883d12871/all.json";

/// Mutable install snapshot published to observers.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaStatus {
    pub installing: bool,
    pub progress: u8,
    pub message: String,
    pub success: bool,
    pub error: String,
}

/// Closed major-version → runtime component table.
pub fn component_for_major(major: u32) -> LauncherResult<&'static str> {
    match major {
        8 => Ok("jre-legacy"),
        16 => Ok("java-runtime-alpha"),
        17 => Ok("java-runtime-gamma"),
        21 => Ok("java-runtime-delta"),
        25 => Ok("java-runtime-epsilon"),
        other => Err(LauncherError::JavaInstall(format!(
            "no managed runtime component for Java {other}"
        ))),
    }
}

/// Platform key used by the runtime index.
pub fn current_platform_key() -> &'static str {
    if cfg!(target_os = "windows") {
        if cfg!(target_arch = "aarch64") {
            "windows-arm64"
        } else if cfg!(target_pointer_width = "32") {
            "windows-x86"
        } else {
            "windows-x64"
        }
    } else if cfg!(target_os = "macos") {
        if cfg!(target_arch = "aarch64") {
            "mac-os-arm64"
        } else {
            "mac-os"
        }
    } else if cfg!(target_arch = "aarch64") {
        "linux-arm64"
    } else {
        "linux"
    }
}

// ─── Component manifest model ───

#[derive(Debug, Deserialize)]
struct RuntimeManifest {
    files: std::collections::HashMap<String, RuntimeFile>,
}

#[derive(Debug, Deserialize)]
struct RuntimeFile {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    executable: bool,
    #[serde(default)]
    downloads: Option<RuntimeDownloads>,
}

#[derive(Debug, Deserialize)]
struct RuntimeDownloads {
    raw: Option<RawDownload>,
}

#[derive(Debug, Deserialize)]
struct RawDownload {
    url: String,
    #[serde(default)]
    sha1: Option<String>,
    #[serde(default)]
    size: Option<u64>,
}

struct PlannedFile {
    relative: String,
    url: String,
    sha1: Option<String>,
    size: Option<u64>,
    executable: bool,
}

/// Owns only cloneable handles; the worker captures a clone of the whole
/// installer and never a reference back into the core.
#[derive(Clone)]
pub struct JavaInstaller {
    http: Arc<HttpClient>,
    downloader: Arc<Downloader>,
    index: Arc<JavaIndex>,
    workspace: Workspace,
    status: Arc<Mutex<JavaStatus>>,
    events: Arc<EventBus>,
}

impl JavaInstaller {
    pub fn new(
        http: Arc<HttpClient>,
        downloader: Arc<Downloader>,
        index: Arc<JavaIndex>,
        workspace: Workspace,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            http,
            downloader,
            index,
            workspace,
            status: Arc::new(Mutex::new(JavaStatus::default())),
            events,
        }
    }

    pub fn status(&self) -> JavaStatus {
        self.status.lock().expect("java status poisoned").clone()
    }

    /// Kick off an install on a worker; returns immediately. A second
    /// call while one is running is ignored.
    pub fn install(&self, major: u32) {
        {
            let mut status = self.status.lock().expect("java status poisoned");
            if status.installing {
                warn!("Java install already running, ignoring request for {}", major);
                return;
            }
            *status = JavaStatus {
                installing: true,
                progress: 0,
                message: format!("Preparing Java {major} install"),
                success: false,
                error: String::new(),
            };
        }

        let worker = self.clone();
        tokio::spawn(async move {
            worker.run(major).await;
        });
    }

    async fn run(self, major: u32) {
        let component_dir = component_for_major(major)
            .ok()
            .map(|c| self.workspace.runtime_component_dir(c));

        match self.run_phases(major).await {
            Ok(()) => {
                {
                    let mut status = self.status.lock().expect("java status poisoned");
                    status.installing = false;
                    status.success = true;
                }
                self.events.publish(LauncherEvent::JavaFinished {
                    success: true,
                    error: None,
                });
            }
            Err(err) => {
                let message = err.to_string();
                warn!("Java {} install failed: {}", major, message);
                if let Some(dir) = component_dir {
                    let _ = std::fs::remove_dir_all(&dir);
                    self.index.remove_under(&dir);
                }
                {
                    let mut status = self.status.lock().expect("java status poisoned");
                    status.installing = false;
                    status.success = false;
                    status.error = message.clone();
                }
                self.events.publish(LauncherEvent::JavaFinished {
                    success: false,
                    error: Some(message),
                });
            }
        }
    }

    async fn run_phases(&self, major: u32) -> LauncherResult<()> {
        let component = component_for_major(major)?;
        let target: PathBuf = self.workspace.runtime_component_dir(component);

        // ── Phase 1: file list ──
        self.set_phase(JAVA_PHASE_FILE_LIST, "FileList");
        self.set_progress(0, "Fetching runtime index".into());

        let index_bytes = self.http.get_with_mirrors(JAVA_RUNTIME_INDEX_URL).await?;
        let index: serde_json::Value = serde_json::from_slice(&index_bytes)
            .map_err(|err| LauncherError::JavaInstall(format!("bad runtime index: {err}")))?;

        let platform = current_platform_key();
        let manifest_url = index
            .get(platform)
            .and_then(|p| p.get(component))
            .and_then(|c| c.get(0))
            .and_then(|first| first.get("manifest"))
            .and_then(|m| m.get("url"))
            .and_then(|u| u.as_str())
            .ok_or_else(|| {
                LauncherError::JavaInstall(format!(
                    "runtime index has no {component} entry for {platform}"
                ))
            })?
            .to_string();

        self.set_progress(3, "Fetching component manifest".into());
        let manifest_bytes = self.http.get_with_mirrors(&manifest_url).await?;
        let manifest: RuntimeManifest = serde_json::from_slice(&manifest_bytes)
            .map_err(|err| LauncherError::JavaInstall(format!("bad component manifest: {err}")))?;

        let files = plan_files(manifest);
        if files.is_empty() {
            return Err(LauncherError::JavaInstall(format!(
                "component manifest for {component} lists no files"
            )));
        }
        self.set_progress(5, format!("{} runtime files to verify", files.len()));

        // ── Phase 2: download ──
        self.set_phase(JAVA_PHASE_DOWNLOAD, "Download");

        let total = files.len();
        let tasks: Vec<DownloadTask> = files
            .iter()
            .map(|file| {
                DownloadTask::new(file.url.clone(), target.join(&file.relative))
                    .with_checksum(file.size, file.sha1.clone())
            })
            .collect();

        let progress_self = self.clone();
        let ok = self
            .downloader
            .batch_download(
                tasks,
                JAVA_INSTALL_CONCURRENCY,
                Some(Arc::new(move |done, _| {
                    let percent = phase2_percent(done, total);
                    progress_self
                        .set_progress(percent, format!("Downloaded {done}/{total} files"));
                })),
            )
            .await;
        if !ok {
            return Err(LauncherError::JavaInstall(
                "one or more runtime files failed to download".into(),
            ));
        }

        #[cfg(unix)]
        set_executable_bits(&target, &files);

        self.set_progress(92, "Runtime files complete".into());

        // ── Phase 3: register ──
        self.set_phase(JAVA_PHASE_REGISTER, "Register");

        let scan_target = target.clone();
        let found = tokio::task::spawn_blocking(move || {
            let mut out = Vec::new();
            scan_dir_for_java(&scan_target, true, &mut out);
            out
        })
        .await
        .map_err(|err| LauncherError::JavaInstall(format!("scan worker panicked: {err}")))?;

        let entry = found
            .into_iter()
            .find(|e| e.is_valid && e.major_version == major)
            .ok_or_else(|| {
                LauncherError::JavaInstall(format!(
                    "no Java {major} binary found under {}",
                    target.display()
                ))
            })?;

        info!("Registered managed Java {} at {:?}", major, entry.path);
        self.index.register(entry);
        self.set_progress(97, "Runtime registered".into());

        // Full rescan in the background so the rest of the list catches
        // up; the shell hears about it through `JavaListReady`.
        let index = self.index.clone();
        let workspace = self.workspace.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let entries =
                tokio::task::spawn_blocking(move || index.refresh_sync(&workspace))
                    .await
                    .unwrap_or_default();
            events.publish(LauncherEvent::JavaListReady { entries });
        });

        self.set_progress(100, format!("Java {major} installed"));
        Ok(())
    }

    /// Phase transitions are published strictly before any progress
    /// event of the new phase.
    fn set_phase(&self, phase: u8, name: &str) {
        self.events.publish(LauncherEvent::JavaPhaseChanged {
            phase,
            name: name.to_string(),
        });
    }

    fn set_progress(&self, percent: u8, message: String) {
        {
            let mut status = self.status.lock().expect("java status poisoned");
            status.progress = percent;
            status.message = message.clone();
        }
        self.events
            .publish(LauncherEvent::JavaProgress { percent, message });
    }
}

fn plan_files(manifest: RuntimeManifest) -> Vec<PlannedFile> {
    let mut files: Vec<PlannedFile> = manifest
        .files
        .into_iter()
        .filter(|(_, file)| file.kind == "file")
        .filter_map(|(relative, file)| {
            let raw = file.downloads?.raw?;
            Some(PlannedFile {
                relative,
                url: raw.url,
                sha1: raw.sha1,
                size: raw.size,
                executable: file.executable,
            })
        })
        .collect();
    // Deterministic order keeps progress reporting stable.
    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    files
}

/// Phase 2 envelope: 5 % at start, 90 % when every file is done.
fn phase2_percent(done: usize, total: usize) -> u8 {
    let total = total.max(1);
    (5 + done * 85 / total) as u8
}

#[cfg(unix)]
fn set_executable_bits(target: &std::path::Path, files: &[PlannedFile]) {
    use std::os::unix::fs::PermissionsExt;
    for file in files.iter().filter(|f| f.executable) {
        let path = target.join(&file.relative);
        if let Err(err) = std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)) {
            warn!("Cannot mark {:?} executable: {}", path, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_table_is_closed() {
        assert_eq!(component_for_major(8).unwrap(), "jre-legacy");
        assert_eq!(component_for_major(16).unwrap(), "java-runtime-alpha");
        assert_eq!(component_for_major(17).unwrap(), "java-runtime-gamma");
        assert_eq!(component_for_major(21).unwrap(), "java-runtime-delta");
        assert_eq!(component_for_major(25).unwrap(), "java-runtime-epsilon");
        assert!(component_for_major(11).is_err());
    }

    #[test]
    fn platform_key_matches_host() {
        let key = current_platform_key();
        assert!([
            "windows-x64",
            "windows-x86",
            "windows-arm64",
            "linux",
            "linux-arm64",
            "mac-os",
            "mac-os-arm64",
        ]
        .contains(&key));
    }

    #[test]
    fn phase2_progress_stays_inside_envelope() {
        assert_eq!(phase2_percent(0, 100), 5);
        assert_eq!(phase2_percent(50, 100), 47);
        assert_eq!(phase2_percent(100, 100), 90);
        assert_eq!(phase2_percent(0, 0), 5);
    }

    #[test]
    fn plan_files_keeps_only_raw_file_entries() {
        let manifest: RuntimeManifest = serde_json::from_str(
            r#"{
                "files": {
                    "bin": {"type": "directory"},
                    "bin/java": {
                        "type": "file",
                        "executable": true,
                        "downloads": {"raw": {"url": "https://piston-data.mojang.com/j", "sha1": "ab", "size": 10}}
                    },
                    "legal/LICENSE": {
                        "type": "file",
                        "downloads": {"raw": {"url": "https://piston-data.mojang.com/l", "sha1": "cd", "size": 20}}
                    },
                    "lib/src.zip": {"type": "link"}
                }
            }"#,
        )
        .unwrap();

        let files = plan_files(manifest);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].relative, "bin/java");
        assert!(files[0].executable);
        assert_eq!(files[1].relative, "legal/LICENSE");
        assert!(!files[1].executable);
    }
}
