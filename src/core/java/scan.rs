// ─── Java Discovery ───
// Walks candidate directories for Java executables, probes each, and
// feeds the index. On Windows `javaw.exe` is preferred; `java.exe` is
// only taken when no `javaw.exe` sibling exists.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::java::probe::{probe_java, JavaEntry};
use crate::core::workspace::Workspace;

/// Directory recursion ceiling; managed runtimes sit a few levels deep
/// at most and unbounded walks over Program Files are pathological.
const MAX_SCAN_DEPTH: usize = 6;

/// Recursively scan `base` for Java executables and probe every match.
/// Only valid probes are collected.
pub fn scan_dir_for_java(base: &Path, managed: bool, out: &mut Vec<JavaEntry>) {
    scan_recursive(base, managed, MAX_SCAN_DEPTH, out);
}

fn scan_recursive(dir: &Path, managed: bool, depth_left: usize, out: &mut Vec<JavaEntry>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    let mut subdirs = Vec::new();
    let mut has_javaw = false;
    let mut java_exe = None;

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
            continue;
        }
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();
        if cfg!(windows) {
            if name == "javaw.exe" {
                has_javaw = true;
                push_probed(&path, managed, out);
            } else if name == "java.exe" {
                java_exe = Some(path);
            }
        } else if name == "java" {
            push_probed(&path, managed, out);
        }
    }

    if let Some(path) = java_exe {
        if !has_javaw {
            push_probed(&path, managed, out);
        }
    }

    if depth_left > 0 {
        for sub in subdirs {
            scan_recursive(&sub, managed, depth_left - 1, out);
        }
    }
}

fn push_probed(exec: &Path, managed: bool, out: &mut Vec<JavaEntry>) {
    let entry = probe_java(exec, managed);
    if entry.is_valid {
        debug!(
            "Found Java {} ({}) at {:?}",
            entry.major_version, entry.arch, entry.path
        );
        out.push(entry);
    }
}

/// Scan roots in index order: managed runtime first, then the vanilla
/// launcher's runtime, then well-known install roots, the Windows
/// registry, and finally PATH.
pub fn scan_roots(workspace: &Workspace) -> Vec<(PathBuf, bool)> {
    let mut roots = vec![(workspace.runtime_dir(), true)];

    for dir in vanilla_launcher_runtime_dirs() {
        roots.push((dir, false));
    }
    for dir in well_known_roots() {
        roots.push((dir, false));
    }
    for dir in registry_java_homes() {
        roots.push((dir, false));
    }
    for dir in path_entries() {
        roots.push((dir, false));
    }

    roots
}

/// The standard Minecraft launcher keeps its own managed runtimes under
/// the user profile.
fn vanilla_launcher_runtime_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if cfg!(target_os = "windows") {
        if let Some(data) = dirs::data_dir() {
            dirs.push(data.join(".minecraft").join("runtime"));
        }
        if let Some(local) = dirs::data_local_dir() {
            dirs.push(
                local
                    .join("Packages")
                    .join("Microsoft.4297127D64EC6_8wekyb3d8bbwe")
                    .join("LocalCache")
                    .join("Local")
                    .join("runtime"),
            );
        }
    } else if cfg!(target_os = "macos") {
        if let Some(home) = dirs::home_dir() {
            dirs.push(
                home.join("Library")
                    .join("Application Support")
                    .join("minecraft")
                    .join("runtime"),
            );
        }
    } else if let Some(home) = dirs::home_dir() {
        dirs.push(home.join(".minecraft").join("runtime"));
    }
    dirs
}

fn well_known_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(java_home) = std::env::var("JAVA_HOME") {
        if !java_home.is_empty() {
            roots.push(PathBuf::from(java_home));
        }
    }

    if cfg!(target_os = "windows") {
        for program_files in ["C:\\Program Files", "C:\\Program Files (x86)"] {
            for vendor in [
                "Java",
                "Eclipse Adoptium",
                "BellSoft",
                "Zulu",
                "Microsoft",
                "Amazon Corretto",
            ] {
                roots.push(PathBuf::from(program_files).join(vendor));
            }
        }
    } else if cfg!(target_os = "macos") {
        roots.push(PathBuf::from("/Library/Java/JavaVirtualMachines"));
        roots.push(PathBuf::from("/opt/homebrew/opt"));
        roots.push(PathBuf::from("/usr/local/opt"));
    } else {
        roots.push(PathBuf::from("/usr/lib/jvm"));
        roots.push(PathBuf::from("/usr/local/lib/jvm"));
    }

    roots
}

/// JavaSoft registry keys, resolved through `reg query` the way the
/// launcher shells out for its other Windows integrations.
fn registry_java_homes() -> Vec<PathBuf> {
    if !cfg!(target_os = "windows") {
        return Vec::new();
    }

    const KEYS: [&str; 6] = [
        r"HKLM\SOFTWARE\JavaSoft\Java Runtime Environment",
        r"HKLM\SOFTWARE\JavaSoft\JRE",
        r"HKLM\SOFTWARE\JavaSoft\JDK",
        r"HKLM\SOFTWARE\WOW6432Node\JavaSoft\Java Runtime Environment",
        r"HKLM\SOFTWARE\WOW6432Node\JavaSoft\JRE",
        r"HKLM\SOFTWARE\WOW6432Node\JavaSoft\JDK",
    ];

    let mut homes = Vec::new();
    for key in KEYS {
        let Some(current) = reg_query_value(key, "CurrentVersion") else {
            continue;
        };
        if let Some(home) = reg_query_value(&format!(r"{key}\{current}"), "JavaHome") {
            homes.push(PathBuf::from(home));
        }
    }
    homes
}

fn reg_query_value(key: &str, value: &str) -> Option<String> {
    let output = std::process::Command::new("reg")
        .args(["query", key, "/v", value])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout);
    for line in text.lines() {
        if let Some(idx) = line.find("REG_SZ") {
            let data = line[idx + "REG_SZ".len()..].trim();
            if !data.is_empty() {
                return Some(data.to_string());
            }
        }
    }
    None
}

fn path_entries() -> Vec<PathBuf> {
    let Ok(path_var) = std::env::var("PATH") else {
        return Vec::new();
    };
    std::env::split_paths(&path_var).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_of_missing_dir_is_empty() {
        let mut out = Vec::new();
        scan_dir_for_java(Path::new("/no/such/dir"), false, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn scan_roots_lead_with_managed_runtime() {
        let workspace = Workspace::new("/work");
        let roots = scan_roots(&workspace);
        assert_eq!(roots[0], (PathBuf::from("/work/runtime"), true));
        assert!(roots[1..].iter().all(|(_, managed)| !managed));
    }
}
