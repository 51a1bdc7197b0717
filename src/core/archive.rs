// ─── Archive Extractor ───
// In-process ZIP/JAR extraction used for natives and managed runtimes.

use std::fs::File;
use std::path::Path;

use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};

/// Extract every regular file entry of a ZIP/JAR into `target_dir`,
/// preserving relative paths. Entries that would escape the target
/// directory are skipped.
pub fn extract_archive(archive_path: &Path, target_dir: &Path) -> LauncherResult<()> {
    let file = File::open(archive_path).map_err(|source| LauncherError::io(archive_path, source))?;
    let mut archive = zip::ZipArchive::new(file)?;

    std::fs::create_dir_all(target_dir).map_err(|source| LauncherError::io(target_dir, source))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let relative = match entry.enclosed_name() {
            Some(name) => name.to_path_buf(),
            None => {
                warn!("Skipping unsafe zip entry: {}", entry.name());
                continue;
            }
        };
        let target = target_dir.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&target)
                .map_err(|source| LauncherError::io(&target, source))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|source| LauncherError::io(parent, source))?;
        }
        let mut out = File::create(&target).map_err(|source| LauncherError::io(&target, source))?;
        std::io::copy(&mut entry, &mut out).map_err(|source| LauncherError::io(&target, source))?;
    }

    debug!("Extracted {:?} -> {:?}", archive_path, target_dir);
    Ok(())
}
