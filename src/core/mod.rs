// ─── Launcher Core ───
// Engine of a Minecraft client bootstrapper: resolves a version's
// dependency graph, materialises every artifact with content-verified
// downloads, provisions a compatible Java runtime, assembles the
// argument vector and spawns the game.
//
// Architecture:
//   core/
//     workspace   — on-disk layout (versions/, libraries/, assets/, runtime/)
//     files       — SHA-1 hashing + size/hash validity predicate
//     archive     — in-process ZIP/JAR extraction
//     mirror      — canonical-URL → mirror failover candidates
//     http        — HTTP/1.1 client with inactivity watchdog
//     downloader/ — concurrent validate-or-fetch task pool
//     version/    — version catalogue + manifest model + rules
//     java/       — probe, discovery index, managed runtime installer
//     launch/     — eight-step launch pipeline
//     events      — progress/log/lifecycle event bus
//     state       — the LauncherCore value shells embed

pub mod archive;
pub mod downloader;
pub mod error;
pub mod events;
pub mod files;
pub mod http;
pub mod java;
pub mod launch;
pub mod mirror;
pub mod state;
pub mod version;
pub mod workspace;

/// Brand reported via `${launcher_name}` and the profile we own in
/// `launcher_profiles.json`.
pub const LAUNCHER_BRAND: &str = "PCL2-Qt";
pub const LAUNCHER_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PROFILE_KEY: &str = "PCL2-Qt";
