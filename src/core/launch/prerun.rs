// ─── Pre-Run Tweaks ───
// Best-effort workspace fixups applied just before spawning the game.
// Every failure here is a warning; the launch continues.

use std::path::Path;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::{LAUNCHER_BRAND, PROFILE_KEY};

/// The game lowercased its locale codes in 1.11; an `options.txt`
/// carrying the old `zh_CN` spelling silently falls back to English.
pub fn fix_options_lang(root: &Path) -> LauncherResult<()> {
    let options = root.join("options.txt");
    let Ok(contents) = std::fs::read_to_string(&options) else {
        return Ok(());
    };

    if !contents.contains("lang:zh_CN") {
        return Ok(());
    }

    let fixed = contents.replace("lang:zh_CN", "lang:zh_cn");
    std::fs::write(&options, fixed).map_err(|source| LauncherError::io(&options, source))?;
    debug!("Rewrote options.txt language to zh_cn");
    Ok(())
}

/// Upsert our profile into `launcher_profiles.json`. Mod installers read
/// this file to locate a target profile, so it must exist and parse even
/// though the core itself never reads it back. Unrelated profiles and
/// top-level fields are preserved.
pub fn upsert_launcher_profiles(root: &Path, version_id: &str) -> LauncherResult<()> {
    let path = root.join("launcher_profiles.json");

    let mut document = std::fs::read(&path)
        .ok()
        .and_then(|raw| serde_json::from_slice::<Value>(&raw).ok())
        .and_then(|value| match value {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .unwrap_or_default();

    let now = Utc::now().to_rfc3339();
    let profile = json!({
        "name": LAUNCHER_BRAND,
        "type": "latest-release",
        "lastVersionId": version_id,
        "created": now,
        "lastUsed": now,
    });

    let profiles = document.entry("profiles").or_insert_with(|| json!({}));
    match profiles.as_object_mut() {
        Some(profiles) => {
            profiles.insert(PROFILE_KEY.to_string(), profile);
        }
        None => *profiles = json!({ PROFILE_KEY: profile }),
    }
    document
        .entry("authenticationDatabase")
        .or_insert_with(|| json!({}));
    document.insert("selectedProfile".into(), json!(PROFILE_KEY));

    let raw = serde_json::to_vec_pretty(&Value::Object(document))?;
    std::fs::write(&path, raw).map_err(|source| LauncherError::io(&path, source))?;
    Ok(())
}

/// Ask Windows to schedule the JVM on the discrete GPU. Written through
/// `reg add` like the rest of our Windows integrations.
pub fn prefer_discrete_gpu(java_path: &Path) -> LauncherResult<()> {
    if !cfg!(target_os = "windows") {
        return Ok(());
    }

    let status = std::process::Command::new("reg")
        .arg("add")
        .arg(r"HKCU\Software\Microsoft\DirectX\UserGpuPreferences")
        .arg("/v")
        .arg(java_path.as_os_str())
        .arg("/t")
        .arg("REG_SZ")
        .arg("/d")
        .arg("GpuPreference=2;")
        .arg("/f")
        .status()
        .map_err(|source| LauncherError::io(java_path, source))?;

    if !status.success() {
        warn!("reg add for GPU preference exited with {:?}", status.code());
    }
    Ok(())
}
