// ─── Java Probe ───
// Executes a candidate binary with `-version` and parses the result into
// a JavaEntry. Probes run under a hard deadline; a hung binary is killed
// rather than stalling a scan.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

/// Hung or interactive binaries are killed after this long.
const PROBE_DEADLINE: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JavaArch {
    X64,
    X86,
    Arm64,
}

impl std::fmt::Display for JavaArch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JavaArch::X64 => write!(f, "x64"),
            JavaArch::X86 => write!(f, "x86"),
            JavaArch::Arm64 => write!(f, "arm64"),
        }
    }
}

/// A probed Java installation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaEntry {
    pub path: PathBuf,
    pub major_version: u32,
    pub arch: JavaArch,
    pub vendor: String,
    /// Lives under the workspace's `runtime/` directory.
    pub is_launcher_managed: bool,
    /// False when the `-version` probe failed or did not parse.
    pub is_valid: bool,
}

impl JavaEntry {
    /// Sentinel for "nothing found"; `is_valid` is false.
    pub fn invalid() -> Self {
        Self {
            path: PathBuf::new(),
            major_version: 0,
            arch: JavaArch::X86,
            vendor: "Unknown".into(),
            is_launcher_managed: false,
            is_valid: false,
        }
    }
}

/// Known vendor markers, checked in order; the first substring hit wins.
const VENDOR_TABLE: [&str; 11] = [
    "Temurin",
    "GraalVM",
    "Oracle",
    "OpenJDK",
    "Liberica",
    "Azul",
    "Microsoft",
    "Corretto",
    "Dragonwell",
    "SapMachine",
    "Zulu",
];

/// Probe one executable. Never fails hard: a broken candidate comes back
/// with `is_valid == false`.
pub fn probe_java(exec: &Path, managed: bool) -> JavaEntry {
    let mut entry = JavaEntry {
        path: exec.to_path_buf(),
        is_launcher_managed: managed,
        ..JavaEntry::invalid()
    };

    let output = match run_version_probe(exec) {
        Ok(output) => output,
        Err(err) => {
            debug!("Probe failed for {:?}: {}", exec, err);
            return entry;
        }
    };

    // `java -version` historically writes to stderr; some builds use
    // stdout instead.
    let text = if output.stderr.trim().is_empty() {
        output.stdout
    } else {
        output.stderr
    };

    match parse_major_version(&text) {
        Some(major) => {
            entry.major_version = major;
            entry.is_valid = true;
        }
        None => {
            debug!("No version string in probe output for {:?}", exec);
            return entry;
        }
    }
    entry.arch = parse_arch(&text);
    entry.vendor = parse_vendor(&text).to_string();
    entry
}

struct ProbeOutput {
    stdout: String,
    stderr: String,
}

fn run_version_probe(exec: &Path) -> std::io::Result<ProbeOutput> {
    let mut child = Command::new(exec)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let deadline = Instant::now() + PROBE_DEADLINE;
    loop {
        match child.try_wait()? {
            Some(_) => break,
            None if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "probe deadline exceeded",
                ));
            }
            None => std::thread::sleep(Duration::from_millis(50)),
        }
    }

    // The probe output is tiny, far below pipe capacity, so reading
    // after exit cannot deadlock.
    let mut stdout = String::new();
    let mut stderr = String::new();
    if let Some(mut pipe) = child.stdout.take() {
        let mut raw = Vec::new();
        pipe.read_to_end(&mut raw)?;
        stdout = String::from_utf8_lossy(&raw).into_owned();
    }
    if let Some(mut pipe) = child.stderr.take() {
        let mut raw = Vec::new();
        pipe.read_to_end(&mut raw)?;
        stderr = String::from_utf8_lossy(&raw).into_owned();
    }
    Ok(ProbeOutput { stdout, stderr })
}

/// Extract the major version from a `version "N[.M…]"` banner line.
/// Legacy `1.x` schemes map to their minor (`1.8.0_402` → 8).
fn parse_major_version(text: &str) -> Option<u32> {
    for line in text.lines() {
        if let Some(major) = parse_version_line(line) {
            return Some(major);
        }
    }
    None
}

fn parse_version_line(line: &str) -> Option<u32> {
    let idx = line.find("version")?;
    let rest = line[idx + "version".len()..].trim_start();
    let quoted = rest.strip_prefix('"')?;
    let end = quoted.find('"')?;
    let version = &quoted[..end];

    let mut parts = version.split(|c: char| !c.is_ascii_digit());
    let first: u32 = parts.next()?.parse().ok()?;
    if first == 1 {
        parts.next().and_then(|minor| minor.parse().ok())
    } else {
        Some(first)
    }
}

fn parse_arch(text: &str) -> JavaArch {
    if text.contains("aarch64") || text.contains("arm64") {
        JavaArch::Arm64
    } else if text.contains("64-Bit") {
        JavaArch::X64
    } else {
        JavaArch::X86
    }
}

fn parse_vendor(text: &str) -> &'static str {
    VENDOR_TABLE
        .iter()
        .find(|vendor| text.contains(**vendor))
        .copied()
        .unwrap_or("Unknown")
}
