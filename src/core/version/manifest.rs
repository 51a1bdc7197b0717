// ─── Version Manifest ───
// Typed model of a Mojang per-version JSON, plus OS/arch/feature rule
// evaluation. The schema is variant (new `arguments` vs legacy
// `minecraftArguments`, optional fields, string-or-array values);
// unknown fields pass through silently, missing required fields fail
// the parse.

use std::collections::HashMap;

use serde::Deserialize;

use crate::core::error::{LauncherError, LauncherResult};

/// A fully parsed version manifest.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionManifest {
    pub id: String,
    #[serde(rename = "type", default)]
    pub version_type: String,
    pub main_class: String,
    /// Asset index id; `legacy` when absent.
    #[serde(default)]
    pub assets: Option<String>,
    #[serde(default)]
    pub java_version: Option<JavaVersionInfo>,
    #[serde(default)]
    pub downloads: Option<VersionDownloads>,
    #[serde(default)]
    pub asset_index: Option<AssetIndexInfo>,
    #[serde(default)]
    pub libraries: Vec<LibraryEntry>,
    /// New-format (1.13+) argument lists.
    #[serde(default)]
    pub arguments: Option<Arguments>,
    /// Legacy pre-1.13 argument string.
    #[serde(default)]
    pub minecraft_arguments: Option<String>,
}

impl VersionManifest {
    pub fn parse(bytes: &[u8], context: &str) -> LauncherResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|err| LauncherError::manifest(context, err.to_string()))
    }

    /// Required Java major version; old manifests without `javaVersion`
    /// ran on Java 8.
    pub fn required_java_major(&self) -> u32 {
        self.java_version
            .as_ref()
            .map(|j| j.major_version)
            .unwrap_or(8)
    }

    pub fn asset_index_id(&self) -> &str {
        self.assets.as_deref().unwrap_or("legacy")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersionInfo {
    pub major_version: u32,
}

#[derive(Debug, Deserialize)]
pub struct VersionDownloads {
    pub client: Option<DownloadArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadArtifact {
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetIndexInfo {
    #[serde(default)]
    pub id: Option<String>,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

// ─── Libraries ───

#[derive(Debug, Deserialize)]
pub struct LibraryEntry {
    pub name: String,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
}

#[derive(Debug, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default)]
    pub artifact: Option<LibraryArtifact>,
    #[serde(default)]
    pub classifiers: Option<HashMap<String, LibraryArtifact>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryArtifact {
    pub path: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

impl LibraryEntry {
    /// Whether this library applies on the current host.
    pub fn is_allowed(&self) -> bool {
        evaluate_rules(&self.rules)
    }

    /// Native classifier for the current platform: `natives-<os>`, then
    /// `natives-<os>-<archSuffix>`.
    pub fn native_classifier(&self) -> Option<&LibraryArtifact> {
        let classifiers = self.downloads.as_ref()?.classifiers.as_ref()?;
        let os = current_os_name();
        classifiers
            .get(&format!("natives-{os}"))
            .or_else(|| classifiers.get(&format!("natives-{os}-{}", current_arch_suffix())))
    }
}

// ─── Rules ───

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub action: RuleAction,
    #[serde(default)]
    pub os: Option<OsRule>,
    /// Feature gates. The core advertises no features, so presence of
    /// this map forces a non-match (forward-compatible policy).
    #[serde(default)]
    pub features: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsRule {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Mojang rule semantics: rules run left-to-right, the last matching
/// rule's action wins, and a non-empty list where nothing matches denies.
/// An empty list allows.
pub fn evaluate_rules(rules: &[Rule]) -> bool {
    if rules.is_empty() {
        return true;
    }
    let mut decision = RuleAction::Disallow;
    for rule in rules {
        if rule_matches(rule) {
            decision = rule.action;
        }
    }
    decision == RuleAction::Allow
}

fn rule_matches(rule: &Rule) -> bool {
    if rule.features.is_some() {
        return false;
    }
    if let Some(os) = &rule.os {
        if let Some(name) = &os.name {
            if name != current_os_name() {
                return false;
            }
        }
        if os.arch.as_deref() == Some("x86") && cfg!(target_pointer_width = "64") {
            return false;
        }
    }
    true
}

/// Mojang OS tag for the current platform.
pub fn current_os_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "osx"
    } else {
        "linux"
    }
}

/// Arch suffix used by native classifier keys.
pub fn current_arch_suffix() -> &'static str {
    if cfg!(target_arch = "aarch64") {
        "arm64"
    } else if cfg!(target_pointer_width = "64") {
        "64"
    } else {
        "32"
    }
}

// ─── Arguments ───

#[derive(Debug, Default, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<ArgumentEntry>,
    #[serde(default)]
    pub jvm: Vec<ArgumentEntry>,
}

/// One element of `arguments.jvm` / `arguments.game`: either a bare
/// string or a rule-gated value.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ArgumentEntry {
    Plain(String),
    Conditional(ConditionalArgument),
}

#[derive(Debug, Deserialize)]
pub struct ConditionalArgument {
    #[serde(default)]
    pub rules: Vec<Rule>,
    pub value: ArgumentValue,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    Single(String),
    Many(Vec<String>),
}

impl ArgumentEntry {
    /// Tokens this entry contributes on the current host. Conditional
    /// entries contribute nothing when their rules deny.
    pub fn resolve(&self, out: &mut Vec<String>) {
        match self {
            ArgumentEntry::Plain(token) => out.push(token.clone()),
            ArgumentEntry::Conditional(conditional) => {
                if evaluate_rules(&conditional.rules) {
                    match &conditional.value {
                        ArgumentValue::Single(token) => out.push(token.clone()),
                        ArgumentValue::Many(tokens) => out.extend(tokens.iter().cloned()),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_rules_means_allowed() {
        assert!(evaluate_rules(&[]));
    }

    #[test]
    fn last_matching_rule_wins() {
        let rules = vec![
            Rule {
                action: RuleAction::Allow,
                os: None,
                features: None,
            },
            Rule {
                action: RuleAction::Disallow,
                os: Some(OsRule {
                    name: Some(current_os_name().to_string()),
                    arch: None,
                    version: None,
                }),
                features: None,
            },
        ];
        assert!(!evaluate_rules(&rules));
    }

    #[test]
    fn unmatched_rules_default_to_deny() {
        let rules = vec![Rule {
            action: RuleAction::Allow,
            os: Some(OsRule {
                name: Some("amigaos".into()),
                arch: None,
                version: None,
            }),
            features: None,
        }];
        assert!(!evaluate_rules(&rules));
    }

    #[test]
    fn features_force_non_match() {
        let mut features = serde_json::Map::new();
        features.insert("is_demo_user".into(), serde_json::Value::Bool(true));
        let rules = vec![Rule {
            action: RuleAction::Allow,
            os: None,
            features: Some(features),
        }];
        assert!(!evaluate_rules(&rules));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn x86_arch_rule_does_not_match_64bit_host() {
        let rules = vec![Rule {
            action: RuleAction::Allow,
            os: Some(OsRule {
                name: None,
                arch: Some("x86".into()),
                version: None,
            }),
            features: None,
        }];
        assert!(!evaluate_rules(&rules));
    }

    #[test]
    fn parses_new_format_manifest() {
        let json = r#"{
            "id": "1.20.1",
            "type": "release",
            "mainClass": "net.minecraft.client.main.Main",
            "assets": "5",
            "javaVersion": {"component": "java-runtime-gamma", "majorVersion": 17},
            "downloads": {"client": {"url": "https://piston-data.mojang.com/c.jar", "sha1": "ab", "size": 12}},
            "assetIndex": {"id": "5", "url": "https://piston-meta.mojang.com/5.json", "sha1": "cd", "size": 34},
            "libraries": [{
                "name": "org.lwjgl:lwjgl:3.3.1",
                "downloads": {"artifact": {"path": "org/lwjgl/lwjgl.jar", "url": "https://libraries.minecraft.net/l.jar", "sha1": "ef", "size": 56}}
            }],
            "arguments": {
                "jvm": ["-Djava.library.path=${natives_directory}",
                        {"rules": [{"action": "allow", "os": {"name": "windows"}}], "value": "-XstartOnFirstThread"}],
                "game": ["--username", "${auth_player_name}",
                         {"rules": [{"action": "allow", "features": {"is_demo_user": true}}], "value": ["--demo"]}]
            }
        }"#;
        let manifest = VersionManifest::parse(json.as_bytes(), "1.20.1").unwrap();
        assert_eq!(manifest.id, "1.20.1");
        assert_eq!(manifest.required_java_major(), 17);
        assert_eq!(manifest.asset_index_id(), "5");
        assert_eq!(manifest.libraries.len(), 1);

        let args = manifest.arguments.unwrap();
        let mut game = Vec::new();
        for entry in &args.game {
            entry.resolve(&mut game);
        }
        // The demo-feature argument must not be emitted.
        assert_eq!(game, vec!["--username", "${auth_player_name}"]);
    }

    #[test]
    fn parses_legacy_manifest_and_defaults_java_to_8() {
        let json = r#"{
            "id": "1.7.10",
            "type": "release",
            "mainClass": "net.minecraft.client.main.Main",
            "minecraftArguments": "--username ${auth_player_name} --version ${version_name}"
        }"#;
        let manifest = VersionManifest::parse(json.as_bytes(), "1.7.10").unwrap();
        assert_eq!(manifest.required_java_major(), 8);
        assert_eq!(manifest.asset_index_id(), "legacy");
        assert!(manifest.minecraft_arguments.is_some());
    }

    #[test]
    fn missing_main_class_is_a_manifest_error() {
        let err = VersionManifest::parse(br#"{"id": "broken"}"#, "broken").unwrap_err();
        assert_eq!(err.kind(), "manifest");
    }

    #[test]
    fn conditional_value_may_be_string_or_array() {
        let json = r#"{"rules": [], "value": ["-a", "-b"]}"#;
        let entry: ArgumentEntry = serde_json::from_str(json).unwrap();
        let mut out = Vec::new();
        entry.resolve(&mut out);
        assert_eq!(out, vec!["-a", "-b"]);
    }
}
