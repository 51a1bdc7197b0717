// ─── Native Extraction ───
// Unpacks platform-classified native JARs into the per-version natives
// directory. A marker file keyed by the archive's SHA-1 prefix makes the
// step idempotent within and across launches.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::archive::extract_archive;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::files::sha1_file;
use crate::core::version::manifest::LibraryArtifact;
use crate::core::workspace::Workspace;

/// Extract each selected native archive, skipping those whose marker is
/// already present. Per-archive failures are non-fatal: the files may be
/// locked by another running game.
pub fn extract_natives(
    workspace: &Workspace,
    version_id: &str,
    natives: &[LibraryArtifact],
) -> LauncherResult<PathBuf> {
    let natives_dir = workspace.natives_dir(version_id);
    std::fs::create_dir_all(&natives_dir)
        .map_err(|source| LauncherError::io(&natives_dir, source))?;

    for artifact in natives {
        let jar = workspace.library(&artifact.path);
        let marker = match extraction_marker(&natives_dir, &jar, artifact.sha1.as_deref()) {
            Some(marker) => marker,
            None => {
                warn!("No hash for native {:?}, extracting unconditionally", jar);
                if let Err(err) = extract_archive(&jar, &natives_dir) {
                    warn!("Native extraction failed for {:?}: {}", jar, err);
                }
                continue;
            }
        };

        if marker.exists() {
            debug!("Natives already extracted for {:?}", jar);
            continue;
        }

        match extract_archive(&jar, &natives_dir) {
            Ok(()) => {
                if let Err(err) = std::fs::write(&marker, b"") {
                    warn!("Cannot write extraction marker {:?}: {}", marker, err);
                }
            }
            Err(err) => warn!("Native extraction failed for {:?}: {}", jar, err),
        }
    }

    Ok(natives_dir)
}

/// `.extracted_<sha1[0:8]>` next to the extracted files. The declared
/// manifest hash is preferred; a local digest is the fallback.
fn extraction_marker(natives_dir: &Path, jar: &Path, declared_sha1: Option<&str>) -> Option<PathBuf> {
    let digest = match declared_sha1.filter(|s| s.len() >= 8) {
        Some(declared) => declared.to_string(),
        None => sha1_file(jar).ok()?,
    };
    Some(natives_dir.join(format!(".extracted_{}", &digest[..8])))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_native_jar(path: &Path) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("liblwjgl.so", options).unwrap();
        zip.write_all(b"elf bytes").unwrap();
        zip.finish().unwrap();
    }

    fn artifact(path: &str, sha1: &str) -> LibraryArtifact {
        serde_json::from_value(serde_json::json!({
            "path": path,
            "url": "https://libraries.minecraft.net/n.jar",
            "sha1": sha1,
            "size": 0
        }))
        .unwrap()
    }

    #[test]
    fn extraction_writes_files_and_marker() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(dir.path());
        workspace.ensure().unwrap();

        let jar_rel = "org/lwjgl/lwjgl-natives.jar";
        let jar_abs = workspace.library(jar_rel);
        std::fs::create_dir_all(jar_abs.parent().unwrap()).unwrap();
        write_native_jar(&jar_abs);

        let natives =
            extract_natives(&workspace, "1.20.1", &[artifact(jar_rel, "0123456789abcdef")])
                .unwrap();

        assert!(natives.join("liblwjgl.so").is_file());
        assert!(natives.join(".extracted_01234567").is_file());
    }

    #[test]
    fn marker_prevents_re_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(dir.path());
        workspace.ensure().unwrap();

        let jar_rel = "org/lwjgl/lwjgl-natives.jar";
        let jar_abs = workspace.library(jar_rel);
        std::fs::create_dir_all(jar_abs.parent().unwrap()).unwrap();
        write_native_jar(&jar_abs);

        let jars = [artifact(jar_rel, "0123456789abcdef")];
        let natives_dir = extract_natives(&workspace, "1.20.1", &jars).unwrap();

        // Remove the payload but keep the marker: a second run must not
        // re-create the payload.
        std::fs::remove_file(natives_dir.join("liblwjgl.so")).unwrap();
        extract_natives(&workspace, "1.20.1", &jars).unwrap();
        assert!(!natives_dir.join("liblwjgl.so").exists());
    }

    #[test]
    fn missing_jar_is_a_warning_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(dir.path());
        workspace.ensure().unwrap();

        let result = extract_natives(
            &workspace,
            "1.20.1",
            &[artifact("missing/native.jar", "feedbeef00")],
        );
        assert!(result.is_ok());
    }
}
