// ─── Argument Construction ───
// Turns a version manifest plus launch inputs into the final JVM/game
// argument vector: placeholder substitution, memory sizing, standard
// flags, and tweak-class de-duplication.

use std::path::Path;

use tracing::info;

use crate::core::version::manifest::VersionManifest;
use crate::core::{LAUNCHER_BRAND, LAUNCHER_VERSION};

/// Offline-mode authentication placeholders.
pub const OFFLINE_UUID: &str = "00000000-0000-0000-0000-000000000000";
pub const OFFLINE_ACCESS_TOKEN: &str = "0";
pub const OFFLINE_USER_TYPE: &str = "mojang";

/// Flags every launch gets, appended after the manifest's own JVM args.
const STANDARD_JVM_FLAGS: [&str; 5] = [
    "-Dlog4j2.formatMsgNoLookups=true",
    "-Dfile.encoding=UTF-8",
    "-XX:+UseG1GC",
    "-XX:-UseAdaptiveSizePolicy",
    "-XX:-OmitStackTraceInFastThrow",
];

pub struct ArgumentInputs<'a> {
    pub manifest: &'a VersionManifest,
    pub username: &'a str,
    pub root: &'a Path,
    pub natives_dir: &'a Path,
    pub classpath: &'a str,
    pub memory_mb: u32,
}

/// Young-generation size: an eighth of the heap, clamped to [64, 512] MB.
pub fn xmn_megabytes(max_memory_mb: u32) -> u32 {
    (max_memory_mb / 8).clamp(64, 512)
}

/// The complete argument vector in order: JVM args, main class, game
/// args.
pub fn build_arguments(inputs: &ArgumentInputs<'_>) -> Vec<String> {
    let values = placeholder_values(inputs);
    let mut args = Vec::new();

    // ── JVM arguments ──
    match &inputs.manifest.arguments {
        Some(arguments) => {
            let mut raw = Vec::new();
            for entry in &arguments.jvm {
                entry.resolve(&mut raw);
            }
            args.extend(raw.iter().map(|token| substitute(token, &values)));
        }
        None => {
            // Legacy manifests predate declarative JVM args.
            args.push(format!(
                "-Djava.library.path={}",
                inputs.natives_dir.display()
            ));
            args.push(format!("-Dminecraft.launcher.brand={LAUNCHER_BRAND}"));
            args.push(format!("-Dminecraft.launcher.version={LAUNCHER_VERSION}"));
            args.push("-cp".into());
            args.push(inputs.classpath.to_string());
        }
    }

    args.push(format!("-Xmx{}M", inputs.memory_mb));
    args.push(format!("-Xmn{}M", xmn_megabytes(inputs.memory_mb)));
    args.extend(STANDARD_JVM_FLAGS.iter().map(|flag| flag.to_string()));

    args.push(inputs.manifest.main_class.clone());

    // ── Game arguments ──
    let mut game = Vec::new();
    match &inputs.manifest.arguments {
        Some(arguments) => {
            let mut raw = Vec::new();
            for entry in &arguments.game {
                entry.resolve(&mut raw);
            }
            game.extend(raw.iter().map(|token| substitute(token, &values)));
        }
        None => {
            if let Some(legacy) = &inputs.manifest.minecraft_arguments {
                game.extend(
                    legacy
                        .split_whitespace()
                        .map(|token| substitute(token, &values)),
                );
            }
        }
    }
    dedupe_tweak_classes(&mut game);
    args.extend(game);

    args
}

fn placeholder_values(inputs: &ArgumentInputs<'_>) -> Vec<(&'static str, String)> {
    let assets_root = inputs.root.join("assets").display().to_string();
    vec![
        ("${auth_player_name}", inputs.username.to_string()),
        ("${auth_uuid}", OFFLINE_UUID.to_string()),
        ("${auth_access_token}", OFFLINE_ACCESS_TOKEN.to_string()),
        ("${user_type}", OFFLINE_USER_TYPE.to_string()),
        ("${user_properties}", "{}".to_string()),
        ("${version_name}", inputs.manifest.id.clone()),
        ("${version_type}", inputs.manifest.version_type.clone()),
        ("${game_directory}", inputs.root.display().to_string()),
        ("${assets_root}", assets_root.clone()),
        ("${game_assets}", assets_root),
        (
            "${assets_index_name}",
            inputs.manifest.asset_index_id().to_string(),
        ),
        (
            "${natives_directory}",
            inputs.natives_dir.display().to_string(),
        ),
        ("${launcher_name}", LAUNCHER_BRAND.to_string()),
        ("${launcher_version}", LAUNCHER_VERSION.to_string()),
        ("${classpath}", inputs.classpath.to_string()),
    ]
}

/// Replace every known `${placeholder}` occurrence inside one token.
/// Unknown placeholders pass through untouched.
fn substitute(token: &str, values: &[(&'static str, String)]) -> String {
    if !token.contains("${") {
        return token.to_string();
    }
    let mut out = token.to_string();
    for (name, value) in values {
        if out.contains(name) {
            out = out.replace(name, value);
        }
    }
    out
}

/// Forge and OptiFine both inject `--tweakClass`; when both are present
/// only the Forge tweaker may survive, or the game refuses to boot.
pub fn dedupe_tweak_classes(args: &mut Vec<String>) {
    let mut has_fml = false;
    let mut has_optifine = false;
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--tweakClass" && i + 1 < args.len() {
            has_fml |= args[i + 1].contains("FMLTweaker");
            has_optifine |= args[i + 1].contains("OptiFine");
            i += 2;
        } else {
            i += 1;
        }
    }
    if !(has_fml && has_optifine) {
        return;
    }

    info!("Both Forge and OptiFine tweakers present, dropping the OptiFine pair");
    let old = std::mem::take(args);
    let mut i = 0;
    while i < old.len() {
        if old[i] == "--tweakClass" && i + 1 < old.len() && old[i + 1].contains("OptiFine") {
            i += 2;
            continue;
        }
        args.push(old[i].clone());
        i += 1;
    }
}
