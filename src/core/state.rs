// ─── Launcher Core ───
// The single owned value every shell talks to. Constructed once by
// `init`; owns the workspace, the HTTP client, the Java index, the
// installer and the event bus. No global singletons.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::core::downloader::Downloader;
use crate::core::error::LauncherResult;
use crate::core::events::{EventBus, LauncherEvent};
use crate::core::http::HttpClient;
use crate::core::java::{JavaEntry, JavaIndex, JavaInstaller, JavaStatus};
use crate::core::launch::{LaunchOptions, LaunchOutcome, LaunchPipeline};
use crate::core::version::{VersionCatalogue, VersionDescriptor};
use crate::core::workspace::Workspace;

/// Return codes of `launch` as seen by the shell.
pub const LAUNCH_OK: i32 = 0;
pub const LAUNCH_ERROR: i32 = 1;
pub const LAUNCH_JAVA_MISSING: i32 = 2;

pub struct LauncherCore {
    workspace: Workspace,
    downloader: Arc<Downloader>,
    catalogue: Arc<VersionCatalogue>,
    java_index: Arc<JavaIndex>,
    installer: JavaInstaller,
    events: Arc<EventBus>,
}

impl LauncherCore {
    /// Create the workspace skeleton under `root` and wire up every
    /// component.
    pub fn init(root: impl AsRef<Path>) -> LauncherResult<Self> {
        let workspace = Workspace::new(root.as_ref());
        workspace.ensure()?;
        info!("Workspace initialised at {:?}", workspace.root());

        let http = Arc::new(HttpClient::new()?);
        let events = Arc::new(EventBus::new());
        let downloader = Arc::new(Downloader::new(http.clone(), events.clone()));
        let catalogue = Arc::new(VersionCatalogue::new(http.clone(), workspace.clone()));
        let java_index = Arc::new(JavaIndex::new());
        let installer = JavaInstaller::new(
            http,
            downloader.clone(),
            java_index.clone(),
            workspace.clone(),
            events.clone(),
        );

        Ok(Self {
            workspace,
            downloader,
            catalogue,
            java_index,
            installer,
            events,
        })
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Attach an event handler. Handlers run synchronously on the
    /// publishing thread.
    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(&LauncherEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(handler);
    }

    // ── Version list ────────────────────────────────────

    pub async fn list_versions(&self) -> LauncherResult<Vec<VersionDescriptor>> {
        self.catalogue.get_versions().await
    }

    /// Java major version the given Minecraft version wants; 8 when the
    /// manifest does not say (or cannot be resolved).
    pub async fn recommended_java(&self, version_id: &str) -> u32 {
        match self.catalogue.get_manifest(version_id).await {
            Ok(manifest) => manifest.required_java_major(),
            Err(err) => {
                warn!("Cannot resolve manifest for {}: {}", version_id, err);
                8
            }
        }
    }

    // ── Game launch ─────────────────────────────────────

    /// Run the launch pipeline, reporting the shell-facing return code:
    /// 0 ok, 1 generic error, 2 Java missing.
    pub async fn launch(&self, options: LaunchOptions) -> i32 {
        match self.try_launch(options).await {
            Ok(LaunchOutcome::Started { pid }) => {
                info!("Game started with PID {}", pid);
                LAUNCH_OK
            }
            Ok(LaunchOutcome::JavaMissing { required_major }) => {
                warn!("Launch blocked: Java {} missing", required_major);
                LAUNCH_JAVA_MISSING
            }
            Err(err) => {
                error!("Launch failed ({}): {}", err.kind(), err);
                self.events.launch_log(format!("Launch failed: {err}"));
                LAUNCH_ERROR
            }
        }
    }

    /// Pipeline entry point for callers that want the typed outcome.
    pub async fn try_launch(&self, options: LaunchOptions) -> LauncherResult<LaunchOutcome> {
        let pipeline = LaunchPipeline::new(
            self.workspace.clone(),
            self.downloader.clone(),
            self.catalogue.clone(),
            self.java_index.clone(),
            self.events.clone(),
        );
        pipeline.run(options).await
    }

    // ── Java management ─────────────────────────────────

    pub fn java_status(&self) -> JavaStatus {
        self.installer.status()
    }

    /// Start a managed runtime install for `major`; returns immediately.
    /// Progress arrives through events or `java_status()` polling.
    pub fn install_java(&self, major: u32) {
        self.installer.install(major);
    }

    /// Blocking full rescan; returns the fresh snapshot.
    pub fn refresh_java_list_sync(&self) -> Vec<JavaEntry> {
        self.java_index.refresh_sync(&self.workspace)
    }

    /// Rescan on a worker; `JavaListReady` fires when done.
    pub fn refresh_java_list(&self) {
        let index = self.java_index.clone();
        let workspace = self.workspace.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let entries = tokio::task::spawn_blocking(move || index.refresh_sync(&workspace))
                .await
                .unwrap_or_default();
            events.publish(LauncherEvent::JavaListReady { entries });
        });
    }

    /// Snapshot of the last completed scan.
    pub fn java_list(&self) -> Vec<JavaEntry> {
        self.java_index.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn init_creates_the_workspace_skeleton() {
        let dir = tempfile::tempdir().unwrap();
        let core = LauncherCore::init(dir.path()).unwrap();

        assert!(dir.path().join("versions").is_dir());
        assert!(dir.path().join("libraries").is_dir());
        assert!(dir.path().join("assets").is_dir());
        assert!(dir.path().join("runtime").is_dir());
        assert!(core.java_list().is_empty());
    }

    #[tokio::test]
    async fn java_status_starts_idle() {
        let dir = tempfile::tempdir().unwrap();
        let core = LauncherCore::init(dir.path()).unwrap();

        let status = core.java_status();
        assert!(!status.installing);
        assert!(!status.success);
        assert!(status.error.is_empty());
    }

    #[tokio::test]
    async fn recommended_java_defaults_to_8_without_java_version_field() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(dir.path());
        workspace.ensure().unwrap();

        // A cached legacy manifest with no javaVersion field.
        std::fs::create_dir_all(workspace.version_dir("1.7.10")).unwrap();
        std::fs::write(
            workspace.version_json("1.7.10"),
            br#"{"id": "1.7.10", "type": "release", "mainClass": "net.minecraft.client.main.Main"}"#,
        )
        .unwrap();

        let core = LauncherCore::init(dir.path()).unwrap();
        assert_eq!(core.recommended_java("1.7.10").await, 8);
    }
}
