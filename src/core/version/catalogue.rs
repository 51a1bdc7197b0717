// ─── Version Catalogue ───
// Aggregates the upstream version list with locally-cached versions and
// resolves per-version manifests through the on-disk cache.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::HttpClient;
use crate::core::version::manifest::VersionManifest;
use crate::core::workspace::Workspace;

pub const VERSION_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest.json";

/// One entry of the aggregated version list. Locally-cached versions
/// missing from the upstream index carry an empty `manifest_url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionDescriptor {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    #[serde(rename = "url", default)]
    pub manifest_url: String,
}

#[derive(Debug, Deserialize)]
struct ManifestIndex {
    versions: Vec<VersionDescriptor>,
}

pub struct VersionCatalogue {
    http: Arc<HttpClient>,
    workspace: Workspace,
    index_url: String,
    /// Fetched list, cached for the lifetime of the core.
    cached: Mutex<Option<Vec<VersionDescriptor>>>,
}

impl VersionCatalogue {
    pub fn new(http: Arc<HttpClient>, workspace: Workspace) -> Self {
        Self {
            http,
            workspace,
            index_url: VERSION_MANIFEST_URL.to_string(),
            cached: Mutex::new(None),
        }
    }

    #[cfg(test)]
    fn with_index_url(mut self, url: impl Into<String>) -> Self {
        self.index_url = url.into();
        self
    }

    /// Upstream list (mirror-preferred) augmented with local-only
    /// versions found under `versions/`.
    pub async fn get_versions(&self) -> LauncherResult<Vec<VersionDescriptor>> {
        let mut cached = self.cached.lock().await;
        if let Some(versions) = cached.as_ref() {
            return Ok(versions.clone());
        }

        let mut versions = match self.http.get_with_mirrors(&self.index_url).await {
            Ok(bytes) => {
                let index: ManifestIndex = serde_json::from_slice(&bytes)
                    .map_err(|err| LauncherError::manifest("version index", err.to_string()))?;
                index.versions
            }
            // Offline is survivable: locally-cached versions stay
            // launchable.
            Err(err) => {
                warn!("Version index unavailable: {}", err);
                Vec::new()
            }
        };

        for local in self.local_versions() {
            if !versions.iter().any(|v| v.id == local.id) {
                versions.push(local);
            }
        }

        info!("Version catalogue holds {} entries", versions.len());
        *cached = Some(versions.clone());
        Ok(versions)
    }

    /// Version ids with a readable, parseable `<id>.json` under
    /// `versions/<id>/`.
    fn local_versions(&self) -> Vec<VersionDescriptor> {
        let mut found = Vec::new();
        let Ok(entries) = std::fs::read_dir(self.workspace.versions_dir()) else {
            return found;
        };
        for entry in entries.flatten() {
            let id = entry.file_name().to_string_lossy().to_string();
            let json_path = self.workspace.version_json(&id);
            let Ok(raw) = std::fs::read(&json_path) else {
                continue;
            };
            let Ok(value) = serde_json::from_slice::<serde_json::Value>(&raw) else {
                continue;
            };
            let version_type = value
                .get("type")
                .and_then(|t| t.as_str())
                .unwrap_or("release")
                .to_string();
            found.push(VersionDescriptor {
                id,
                version_type,
                manifest_url: String::new(),
            });
        }
        found
    }

    /// Cached manifest when present and parseable, otherwise fetch via
    /// the recorded URL, persist, and return.
    pub async fn get_manifest(&self, id: &str) -> LauncherResult<VersionManifest> {
        let cache_path = self.workspace.version_json(id);
        if let Ok(raw) = tokio::fs::read(&cache_path).await {
            match VersionManifest::parse(&raw, id) {
                Ok(manifest) => return Ok(manifest),
                Err(err) => warn!("Cached manifest for {} unusable, refetching: {}", id, err),
            }
        }

        let versions = self.get_versions().await?;
        let descriptor = versions
            .iter()
            .find(|v| v.id == id)
            .ok_or_else(|| LauncherError::VersionNotFound(id.to_string()))?;
        if descriptor.manifest_url.is_empty() {
            return Err(LauncherError::manifest(
                id,
                "local-only version has no manifest URL and its cache is unreadable",
            ));
        }

        let bytes = self.http.get_with_mirrors(&descriptor.manifest_url).await?;
        let manifest = VersionManifest::parse(&bytes, id)?;

        if let Some(parent) = cache_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| LauncherError::io(parent, source))?;
        }
        tokio::fs::write(&cache_path, &bytes)
            .await
            .map_err(|source| LauncherError::io(&cache_path, source))?;

        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_MANIFEST: &str = r#"{
        "id": "1.20.1",
        "type": "release",
        "mainClass": "net.minecraft.client.main.Main"
    }"#;

    fn offline_catalogue(root: &std::path::Path) -> VersionCatalogue {
        VersionCatalogue::new(
            Arc::new(HttpClient::new().unwrap()),
            Workspace::new(root),
        )
        .with_index_url("http://127.0.0.1:9/version_manifest.json")
    }

    #[tokio::test]
    async fn local_cache_augments_an_unreachable_index() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(dir.path());
        workspace.ensure().unwrap();
        std::fs::create_dir_all(workspace.version_dir("1.20.1")).unwrap();
        std::fs::write(workspace.version_json("1.20.1"), MINIMAL_MANIFEST).unwrap();

        let catalogue = offline_catalogue(dir.path());
        let versions = catalogue.get_versions().await.unwrap();

        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].id, "1.20.1");
        assert_eq!(versions[0].version_type, "release");
        assert!(versions[0].manifest_url.is_empty());
    }

    #[tokio::test]
    async fn cached_manifest_is_served_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(dir.path());
        workspace.ensure().unwrap();
        std::fs::create_dir_all(workspace.version_dir("1.20.1")).unwrap();
        std::fs::write(workspace.version_json("1.20.1"), MINIMAL_MANIFEST).unwrap();

        let catalogue = offline_catalogue(dir.path());
        let manifest = catalogue.get_manifest("1.20.1").await.unwrap();
        assert_eq!(manifest.id, "1.20.1");
        assert_eq!(manifest.main_class, "net.minecraft.client.main.Main");
    }

    #[tokio::test]
    async fn unknown_version_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        Workspace::new(dir.path()).ensure().unwrap();

        let catalogue = offline_catalogue(dir.path());
        let err = catalogue.get_manifest("9.9.9").await.unwrap_err();
        assert!(matches!(err, LauncherError::VersionNotFound(_)));
    }

    #[tokio::test]
    async fn unparseable_local_json_is_not_listed() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(dir.path());
        workspace.ensure().unwrap();
        std::fs::create_dir_all(workspace.version_dir("broken")).unwrap();
        std::fs::write(workspace.version_json("broken"), b"{ not json").unwrap();

        let catalogue = offline_catalogue(dir.path());
        let versions = catalogue.get_versions().await.unwrap();
        assert!(versions.is_empty());
    }
}
