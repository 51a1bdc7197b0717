// ─── Launch Pipeline ───
// Eight ordered steps from a version id to a running game process:
// check Java, materialise files, extract natives, build arguments,
// pre-run tweaks, custom hook, spawn, watch. Steps 1–7 serialise and
// short-circuit on fatal failure; step 8 races the game process.

pub mod args;
pub mod natives;
pub mod prerun;
pub mod watch;

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::core::downloader::{DownloadTask, Downloader, DEFAULT_CONCURRENCY};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::{EventBus, LauncherEvent};
use crate::core::java::{JavaEntry, JavaIndex};
use crate::core::version::manifest::LibraryArtifact;
use crate::core::version::{VersionCatalogue, VersionManifest};
use crate::core::workspace::Workspace;

pub use watch::ProcessPriority;

const RESOURCES_URL: &str = "https://resources.download.minecraft.net";

/// Deadline for the user-supplied pre-launch command.
const CUSTOM_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Inputs of one `launch()` call.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub version_id: String,
    pub username: String,
    pub memory_mb: u32,
    pub custom_command: Option<String>,
    pub priority: ProcessPriority,
}

impl LaunchOptions {
    pub fn new(version_id: impl Into<String>, username: impl Into<String>, memory_mb: u32) -> Self {
        Self {
            version_id: version_id.into(),
            username: username.into(),
            memory_mb,
            custom_command: None,
            priority: ProcessPriority::Normal,
        }
    }
}

/// Terminal state of a pipeline run that did not error.
#[derive(Debug)]
pub enum LaunchOutcome {
    Started { pid: u32 },
    /// No compatible Java; the shell should offer an install of
    /// `required_major`.
    JavaMissing { required_major: u32 },
}

/// Transient per-launch state threaded through the steps.
struct LaunchContext {
    options: LaunchOptions,
    manifest: Option<VersionManifest>,
    java: Option<JavaEntry>,
    natives_dir: PathBuf,
    classpath: String,
    native_jars: Vec<LibraryArtifact>,
    args: Vec<String>,
}

impl LaunchContext {
    fn new(options: LaunchOptions) -> Self {
        Self {
            options,
            manifest: None,
            java: None,
            natives_dir: PathBuf::new(),
            classpath: String::new(),
            native_jars: Vec::new(),
            args: Vec::new(),
        }
    }

    fn manifest(&self) -> &VersionManifest {
        self.manifest.as_ref().expect("manifest resolved in step 1")
    }

    fn java(&self) -> &JavaEntry {
        self.java.as_ref().expect("java resolved in step 1")
    }
}

// ─── Asset index model ───

#[derive(Debug, Deserialize)]
struct AssetIndex {
    objects: HashMap<String, AssetObject>,
}

#[derive(Debug, Deserialize)]
struct AssetObject {
    hash: String,
    size: u64,
}

/// One pipeline run. Holds only cloneable service handles so spawned
/// watchers never reference back into the core.
pub struct LaunchPipeline {
    workspace: Workspace,
    downloader: Arc<Downloader>,
    catalogue: Arc<VersionCatalogue>,
    java_index: Arc<JavaIndex>,
    events: Arc<EventBus>,
}

impl LaunchPipeline {
    pub fn new(
        workspace: Workspace,
        downloader: Arc<Downloader>,
        catalogue: Arc<VersionCatalogue>,
        java_index: Arc<JavaIndex>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            workspace,
            downloader,
            catalogue,
            java_index,
            events,
        }
    }

    pub async fn run(&self, options: LaunchOptions) -> LauncherResult<LaunchOutcome> {
        self.events.launch_log(format!(
            "Launching {} for {}",
            options.version_id, options.username
        ));
        let mut ctx = LaunchContext::new(options);

        if let Some(missing) = self.step_check_java(&mut ctx).await? {
            return Ok(missing);
        }
        self.step_fix_files(&mut ctx).await?;
        self.step_extract_natives(&mut ctx).await?;
        self.step_construct_arguments(&mut ctx);
        self.step_pre_run(&ctx);
        self.step_custom_commands(&ctx).await;
        let (child, pid) = self.step_launch(&ctx)?;
        self.step_watch(child, pid);

        Ok(LaunchOutcome::Started { pid })
    }

    /// Step 1: resolve the manifest and a compatible Java binary.
    async fn step_check_java(
        &self,
        ctx: &mut LaunchContext,
    ) -> LauncherResult<Option<LaunchOutcome>> {
        let manifest = self.catalogue.get_manifest(&ctx.options.version_id).await?;
        let required = manifest.required_java_major();
        ctx.manifest = Some(manifest);

        if self.java_index.is_empty() {
            self.events.launch_log("Scanning for Java installations");
            let index = self.java_index.clone();
            let workspace = self.workspace.clone();
            tokio::task::spawn_blocking(move || index.refresh_sync(&workspace))
                .await
                .map_err(|err| LauncherError::Other(format!("java scan panicked: {err}")))?;
        }

        let java = self.java_index.find_best(required);
        if !java.is_valid {
            self.events
                .launch_log(format!("No Java {required} available"));
            return Ok(Some(LaunchOutcome::JavaMissing {
                required_major: required,
            }));
        }

        self.events
            .launch_log(format!("Using Java {} at {:?}", java.major_version, java.path));
        ctx.java = Some(java);
        Ok(None)
    }

    /// Step 2: build the classpath in manifest order and materialise
    /// libraries, natives, the client jar, the asset index and every
    /// asset object.
    async fn step_fix_files(&self, ctx: &mut LaunchContext) -> LauncherResult<()> {
        let manifest = ctx.manifest();
        let separator = if cfg!(windows) { ";" } else { ":" };

        let mut tasks = Vec::new();
        let mut classpath_entries: Vec<String> = Vec::new();
        let mut native_jars = Vec::new();

        for library in &manifest.libraries {
            if !library.is_allowed() {
                debug!("Skipping library (rules): {}", library.name);
                continue;
            }
            let Some(downloads) = &library.downloads else {
                continue;
            };

            if let Some(artifact) = &downloads.artifact {
                let dest = self.workspace.library(&artifact.path);
                tasks.push(
                    DownloadTask::new(artifact.url.clone(), &dest)
                        .with_checksum(artifact.size, artifact.sha1.clone()),
                );
                classpath_entries.push(dest.display().to_string());
            }

            if let Some(native) = library.native_classifier() {
                tasks.push(
                    DownloadTask::new(
                        native.url.clone(),
                        self.workspace.library(&native.path),
                    )
                    .with_checksum(native.size, native.sha1.clone()),
                );
                native_jars.push(native.clone());
            }
        }

        let client_jar = self.workspace.version_jar(&ctx.options.version_id);
        if let Some(client) = manifest.downloads.as_ref().and_then(|d| d.client.as_ref()) {
            tasks.push(
                DownloadTask::new(client.url.clone(), &client_jar)
                    .with_checksum(client.size, client.sha1.clone()),
            );
        }
        classpath_entries.push(client_jar.display().to_string());

        let asset_index_path = manifest.asset_index.as_ref().map(|info| {
            let id = info.id.clone().unwrap_or_else(|| manifest.asset_index_id().to_string());
            let dest = self.workspace.asset_index(&id);
            tasks.push(
                DownloadTask::new(info.url.clone(), &dest)
                    .with_checksum(info.size, info.sha1.clone()),
            );
            dest
        });

        self.events
            .launch_log(format!("Verifying {} files", tasks.len()));
        let events = self.events.clone();
        let ok = self
            .downloader
            .batch_download(
                tasks,
                DEFAULT_CONCURRENCY,
                Some(Arc::new(move |done, total| {
                    events.launch_log(format!("Materialised {done}/{total} files"));
                })),
            )
            .await;
        if !ok {
            return Err(LauncherError::Other(
                "failed to materialise libraries or client jar".into(),
            ));
        }

        if let Some(index_path) = asset_index_path {
            self.download_assets(&index_path).await?;
        }

        ctx.classpath = classpath_entries.join(separator);
        ctx.native_jars = native_jars;
        Ok(())
    }

    /// Asset objects live content-addressed under `objects/<aa>/<hash>`
    /// and download from the canonical resources host (the mirror chain
    /// keys off that URL).
    async fn download_assets(&self, index_path: &std::path::Path) -> LauncherResult<()> {
        let raw = tokio::fs::read(index_path)
            .await
            .map_err(|source| LauncherError::io(index_path, source))?;
        let index: AssetIndex = serde_json::from_slice(&raw)
            .map_err(|err| LauncherError::manifest("asset index", err.to_string()))?;

        // Many logical names share one content hash; one task per hash.
        let mut seen = std::collections::HashSet::new();
        let tasks: Vec<DownloadTask> = index
            .objects
            .values()
            .filter(|object| seen.insert(object.hash.clone()))
            .map(|object| {
                let shard = &object.hash[..2];
                DownloadTask::new(
                    format!("{RESOURCES_URL}/{shard}/{}", object.hash),
                    self.workspace.asset_object(&object.hash),
                )
                .with_checksum(Some(object.size), Some(object.hash.clone()))
            })
            .collect();

        self.events
            .launch_log(format!("Verifying {} asset objects", tasks.len()));
        let events = self.events.clone();
        let ok = self
            .downloader
            .batch_download(
                tasks,
                DEFAULT_CONCURRENCY,
                Some(Arc::new(move |done, total| {
                    if done == total {
                        events.launch_log(format!("Assets complete ({total} objects)"));
                    }
                })),
            )
            .await;
        if !ok {
            return Err(LauncherError::Other("failed to materialise assets".into()));
        }
        Ok(())
    }

    /// Step 3: extract platform natives. Failures are warnings; files
    /// may be locked by another running game.
    async fn step_extract_natives(&self, ctx: &mut LaunchContext) -> LauncherResult<()> {
        let workspace = self.workspace.clone();
        let version_id = ctx.options.version_id.clone();
        let jars = ctx.native_jars.clone();

        let natives_dir = tokio::task::spawn_blocking(move || {
            natives::extract_natives(&workspace, &version_id, &jars)
        })
        .await
        .map_err(|err| LauncherError::Other(format!("natives worker panicked: {err}")))??;

        self.events
            .launch_log(format!("Natives ready in {:?}", natives_dir));
        ctx.natives_dir = natives_dir;
        Ok(())
    }

    /// Step 4: assemble the full argument vector.
    fn step_construct_arguments(&self, ctx: &mut LaunchContext) {
        let assembled = args::build_arguments(&args::ArgumentInputs {
            manifest: ctx.manifest(),
            username: &ctx.options.username,
            root: self.workspace.root(),
            natives_dir: &ctx.natives_dir,
            classpath: &ctx.classpath,
            memory_mb: ctx.options.memory_mb,
        });
        self.events
            .launch_log(format!("Arguments assembled ({} tokens)", assembled.len()));
        ctx.args = assembled;
    }

    /// Step 5: best-effort workspace tweaks; never fatal.
    fn step_pre_run(&self, ctx: &LaunchContext) {
        let root = self.workspace.root();
        if let Err(err) = prerun::fix_options_lang(root) {
            warn!("options.txt tweak failed: {}", err);
        }
        if let Err(err) = prerun::upsert_launcher_profiles(root, &ctx.options.version_id) {
            warn!("launcher_profiles.json upsert failed: {}", err);
        }
        if let Err(err) = prerun::prefer_discrete_gpu(&ctx.java().path) {
            warn!("GPU preference tweak failed: {}", err);
        }
    }

    /// Step 6: optional user hook through the platform shell; non-zero
    /// exit and timeouts are warnings.
    async fn step_custom_commands(&self, ctx: &LaunchContext) {
        let Some(command) = ctx
            .options
            .custom_command
            .as_deref()
            .filter(|c| !c.trim().is_empty())
        else {
            return;
        };
        self.events
            .launch_log(format!("Running pre-launch command: {command}"));

        let mut shell = if cfg!(windows) {
            let mut c = tokio::process::Command::new("cmd");
            c.arg("/C").arg(command);
            c
        } else {
            let mut c = tokio::process::Command::new("/bin/sh");
            c.arg("-c").arg(command);
            c
        };
        shell.current_dir(self.workspace.root());

        match shell.spawn() {
            Ok(mut child) => match tokio::time::timeout(CUSTOM_COMMAND_TIMEOUT, child.wait()).await
            {
                Ok(Ok(status)) if status.success() => {}
                Ok(Ok(status)) => {
                    warn!("Pre-launch command exited with {:?}", status.code());
                }
                Ok(Err(err)) => warn!("Pre-launch command failed: {}", err),
                Err(_) => {
                    let _ = child.start_kill();
                    warn!("Pre-launch command killed after 30s");
                }
            },
            Err(err) => warn!("Cannot start pre-launch command: {}", err),
        }
    }

    /// Step 7: spawn the JVM with the workspace as its world.
    fn step_launch(&self, ctx: &LaunchContext) -> LauncherResult<(std::process::Child, u32)> {
        let java = ctx.java();
        let root = self.workspace.root();

        let mut command = std::process::Command::new(&java.path);
        command
            .args(&ctx.args)
            .current_dir(root)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // The JVM looks for its own DLLs relative to PATH; APPDATA keeps
        // the game's writes inside the workspace.
        if let Some(bin_dir) = java.path.parent() {
            let mut paths = vec![bin_dir.to_path_buf()];
            if let Some(existing) = std::env::var_os("PATH") {
                paths.extend(std::env::split_paths(&existing));
            }
            if let Ok(joined) = std::env::join_paths(paths) {
                command.env("PATH", joined);
            }
        }
        command.env("APPDATA", root);

        let mut child = command
            .spawn()
            .map_err(|err| LauncherError::Spawn(err.to_string()))?;
        let pid = child.id();

        if let Some(stdout) = child.stdout.take() {
            watch::relay_output(stdout, "[MC]", self.events.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            watch::relay_output(stderr, "[MC-ERR]", self.events.clone());
        }

        self.events.publish(LauncherEvent::GameStarted);
        self.events
            .launch_log(format!("Game process started (PID {pid})"));
        watch::set_process_priority(pid, ctx.options.priority);

        Ok((child, pid))
    }

    /// Step 8: exit and window watchers race the game in the background;
    /// they never re-enter the pipeline.
    fn step_watch(&self, child: std::process::Child, pid: u32) {
        watch::watch_process_exit(child, self.events.clone());
        watch::watch_game_window(pid, self.events.clone());
    }
}
