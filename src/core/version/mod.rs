pub mod catalogue;
pub mod manifest;

pub use catalogue::{VersionCatalogue, VersionDescriptor};
pub use manifest::{
    evaluate_rules, ArgumentEntry, Arguments, AssetIndexInfo, LibraryArtifact, LibraryEntry,
    OsRule, Rule, RuleAction, VersionManifest,
};
