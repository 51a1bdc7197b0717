// ─── Mirror Resolver ───
// Rewrites canonical Mojang URLs into an ordered failover sequence of
// mirror candidates. Mirrors serve bitwise-identical content; the SHA-1
// validation downstream is what actually guarantees integrity.

/// Closed substitution table: (upstream host substring, mirror hosts).
/// For each recognised origin the mirrors come first, the original last.
const MIRROR_TABLE: [(&str, &[&str]); 6] = [
    (
        "piston-data.mojang.com",
        &["bmclapi2.bangbang93.com", "download.mcbbs.net"],
    ),
    ("launchermeta.mojang.com", &["bmclapi2.bangbang93.com"]),
    ("launcher.mojang.com", &["bmclapi2.bangbang93.com"]),
    ("piston-meta.mojang.com", &["bmclapi2.bangbang93.com"]),
    (
        "resources.download.minecraft.net",
        &["bmclapi2.bangbang93.com/assets"],
    ),
    (
        "libraries.minecraft.net",
        &["bmclapi2.bangbang93.com/maven"],
    ),
];

/// Ordered candidate list for `url`: mirror URLs first, the original
/// last, duplicates suppressed. Unrecognised hosts pass through as a
/// single-element list.
pub fn mirror_candidates(url: &str) -> Vec<String> {
    let mut candidates = Vec::new();

    for (origin, mirrors) in MIRROR_TABLE {
        if url.contains(origin) {
            for mirror in mirrors {
                candidates.push(url.replace(origin, mirror));
            }
            break;
        }
    }

    candidates.push(url.to_string());
    dedupe(candidates)
}

fn dedupe(urls: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    urls.into_iter()
        .filter(|url| !url.is_empty() && seen.insert(url.clone()))
        .collect()
}
