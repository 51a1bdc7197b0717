// ─── Java Index ───
// Shared snapshot of every known Java installation. Readers see either
// the pre- or post-refresh list, never a torn view; the writer side is a
// single full replace or a single prepend.

use std::path::Path;
use std::sync::RwLock;

use tracing::info;

use crate::core::java::probe::{JavaArch, JavaEntry};
use crate::core::java::scan::{scan_dir_for_java, scan_roots};
use crate::core::workspace::Workspace;

#[derive(Default)]
pub struct JavaIndex {
    entries: RwLock<Vec<JavaEntry>>,
}

impl JavaIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<JavaEntry> {
        self.entries.read().expect("java index poisoned").clone()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().expect("java index poisoned").is_empty()
    }

    /// Full rescan of every candidate location, replacing the shared
    /// list atomically. Blocking; callers off the main path wrap it in
    /// `spawn_blocking`.
    pub fn refresh_sync(&self, workspace: &Workspace) -> Vec<JavaEntry> {
        let mut found = Vec::new();
        for (root, managed) in scan_roots(workspace) {
            scan_dir_for_java(&root, managed, &mut found);
        }

        let deduped = dedupe_by_path(found);
        let sorted = sort_entries(deduped);

        info!("Java scan finished: {} entries", sorted.len());
        *self.entries.write().expect("java index poisoned") = sorted.clone();
        sorted
    }

    /// Register a freshly installed entry: any stale entry for the same
    /// path goes away, the new one is prepended.
    pub fn register(&self, entry: JavaEntry) {
        let mut entries = self.entries.write().expect("java index poisoned");
        entries.retain(|existing| existing.path != entry.path);
        entries.insert(0, entry);
    }

    /// Drop every entry rooted under `dir` (failed installs must not
    /// linger in the index).
    pub fn remove_under(&self, dir: &Path) {
        let mut entries = self.entries.write().expect("java index poisoned");
        entries.retain(|entry| !entry.path.starts_with(dir));
    }

    /// Best entry for an exact major version. Preference order:
    /// managed x64, managed, x64, anything. The sentinel `invalid()`
    /// entry signals a miss.
    pub fn find_best(&self, major: u32) -> JavaEntry {
        let entries = self.entries.read().expect("java index poisoned");
        let matching: Vec<&JavaEntry> = entries
            .iter()
            .filter(|e| e.is_valid && e.major_version == major)
            .collect();

        matching
            .iter()
            .find(|e| e.is_launcher_managed && e.arch == JavaArch::X64)
            .or_else(|| matching.iter().find(|e| e.is_launcher_managed))
            .or_else(|| matching.iter().find(|e| e.arch == JavaArch::X64))
            .or_else(|| matching.first())
            .map(|e| (**e).clone())
            .unwrap_or_else(JavaEntry::invalid)
    }
}

fn dedupe_by_path(entries: Vec<JavaEntry>) -> Vec<JavaEntry> {
    let mut seen = std::collections::HashSet::new();
    entries
        .into_iter()
        .filter(|entry| seen.insert(entry.path.clone()))
        .collect()
}

/// Managed entries first, then by descending major version.
fn sort_entries(mut entries: Vec<JavaEntry>) -> Vec<JavaEntry> {
    entries.sort_by(|a, b| {
        b.is_launcher_managed
            .cmp(&a.is_launcher_managed)
            .then(b.major_version.cmp(&a.major_version))
    });
    entries
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn entry(path: &str, major: u32, arch: JavaArch, managed: bool) -> JavaEntry {
        JavaEntry {
            path: PathBuf::from(path),
            major_version: major,
            arch,
            vendor: "Temurin".into(),
            is_launcher_managed: managed,
            is_valid: true,
        }
    }

    fn index_with(entries: Vec<JavaEntry>) -> JavaIndex {
        let index = JavaIndex::new();
        *index.entries.write().unwrap() = entries;
        index
    }

    #[test]
    fn find_best_prefers_managed_x64() {
        let index = index_with(vec![
            entry("/a", 17, JavaArch::X64, false),
            entry("/b", 17, JavaArch::X86, true),
            entry("/c", 17, JavaArch::X64, true),
        ]);
        assert_eq!(index.find_best(17).path, PathBuf::from("/c"));
    }

    #[test]
    fn find_best_falls_back_through_the_chain() {
        let index = index_with(vec![
            entry("/x86", 8, JavaArch::X86, false),
            entry("/x64", 8, JavaArch::X64, false),
        ]);
        assert_eq!(index.find_best(8).path, PathBuf::from("/x64"));

        let index = index_with(vec![entry("/only", 8, JavaArch::X86, false)]);
        assert_eq!(index.find_best(8).path, PathBuf::from("/only"));
    }

    #[test]
    fn find_best_requires_exact_major() {
        let index = index_with(vec![entry("/21", 21, JavaArch::X64, false)]);
        assert!(!index.find_best(17).is_valid);
    }

    #[test]
    fn register_removes_stale_entry_for_same_path() {
        let index = index_with(vec![entry("/runtime/bin/java", 8, JavaArch::X64, true)]);
        index.register(entry("/runtime/bin/java", 17, JavaArch::X64, true));

        let snapshot = index.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].major_version, 17);
    }

    #[test]
    fn remove_under_prunes_a_subtree() {
        let index = index_with(vec![
            entry("/work/runtime/jre-legacy/bin/java", 8, JavaArch::X64, true),
            entry("/usr/bin/java", 17, JavaArch::X64, false),
        ]);
        index.remove_under(Path::new("/work/runtime/jre-legacy"));

        let snapshot = index.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].path, PathBuf::from("/usr/bin/java"));
    }

    #[test]
    fn sort_puts_managed_first_then_major_desc() {
        let sorted = sort_entries(vec![
            entry("/a", 8, JavaArch::X64, false),
            entry("/b", 21, JavaArch::X64, false),
            entry("/c", 17, JavaArch::X64, true),
        ]);
        let paths: Vec<_> = sorted.iter().map(|e| e.path.clone()).collect();
        assert_eq!(
            paths,
            vec![PathBuf::from("/c"), PathBuf::from("/b"), PathBuf::from("/a")]
        );
    }

    #[test]
    fn no_duplicate_paths_survive_dedupe() {
        let deduped = dedupe_by_path(vec![
            entry("/same", 17, JavaArch::X64, true),
            entry("/same", 17, JavaArch::X64, false),
        ]);
        assert_eq!(deduped.len(), 1);
        assert!(deduped[0].is_launcher_managed);
    }
}
