// ─── Workspace ───
// Typed view of the on-disk layout every other component writes into.

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::{LauncherError, LauncherResult};

/// Directory skeleton created by `ensure()`.
const CANONICAL_DIRS: [&str; 6] = [
    "versions",
    "libraries",
    "assets",
    "assets/indexes",
    "assets/objects",
    "runtime",
];

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn ensure(&self) -> LauncherResult<()> {
        for dir in CANONICAL_DIRS {
            let path = self.root.join(dir);
            fs::create_dir_all(&path).map_err(|source| LauncherError::io(&path, source))?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // ── versions/ ──

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    pub fn version_dir(&self, id: &str) -> PathBuf {
        self.versions_dir().join(id)
    }

    pub fn version_json(&self, id: &str) -> PathBuf {
        self.version_dir(id).join(format!("{id}.json"))
    }

    pub fn version_jar(&self, id: &str) -> PathBuf {
        self.version_dir(id).join(format!("{id}.jar"))
    }

    pub fn natives_dir(&self, id: &str) -> PathBuf {
        self.version_dir(id).join("natives")
    }

    // ── libraries/ ──

    pub fn libraries_dir(&self) -> PathBuf {
        self.root.join("libraries")
    }

    /// Content-addressed library artifact location for a Maven-style path.
    pub fn library(&self, maven_path: &str) -> PathBuf {
        self.libraries_dir().join(maven_path)
    }

    // ── assets/ ──

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn asset_index(&self, asset_id: &str) -> PathBuf {
        self.assets_dir()
            .join("indexes")
            .join(format!("{asset_id}.json"))
    }

    /// Asset object path: first two hex chars of the hash as the shard
    /// directory.
    pub fn asset_object(&self, hash: &str) -> PathBuf {
        let shard = &hash[..hash.len().min(2)];
        self.assets_dir().join("objects").join(shard).join(hash)
    }

    // ── runtime/ ──

    pub fn runtime_dir(&self) -> PathBuf {
        self.root.join("runtime")
    }

    pub fn runtime_component_dir(&self, component: &str) -> PathBuf {
        self.runtime_dir().join(component)
    }
}
