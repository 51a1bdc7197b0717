// ─── Hash & File Validator ───
// SHA-1 of on-disk files plus the size+hash validity predicate every
// download decision goes through.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha1::{Digest, Sha1};
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};

/// Streaming SHA-1 of a file, lowercase hex.
///
/// Client jars run to hundreds of MB, so this reads in chunks instead of
/// buffering the whole file.
pub fn sha1_file(path: &Path) -> LauncherResult<String> {
    let mut file = File::open(path).map_err(|source| LauncherError::io(path, source))?;
    let mut hasher = Sha1::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let read = file
            .read(&mut buf)
            .map_err(|source| LauncherError::io(path, source))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// True iff `path` exists, matches `size` (when known) and `sha1` (when
/// known). Size is checked before hash.
pub fn validate_file(path: &Path, size: Option<u64>, sha1: Option<&str>) -> bool {
    let metadata = match std::fs::metadata(path) {
        Ok(m) if m.is_file() => m,
        _ => return false,
    };

    if let Some(expected) = size {
        if metadata.len() != expected {
            debug!("Size mismatch for {:?}: {} != {}", path, metadata.len(), expected);
            return false;
        }
    }

    if let Some(expected) = sha1.filter(|s| !s.is_empty()) {
        match sha1_file(path) {
            Ok(actual) if actual.eq_ignore_ascii_case(expected) => {}
            Ok(actual) => {
                debug!("SHA-1 mismatch for {:?}: {} != {}", path, actual, expected);
                return false;
            }
            Err(_) => return false,
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    // SHA-1 of the ASCII string "hello".
    const HELLO_SHA1: &str = "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d";

    #[test]
    fn sha1_of_known_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, b"hello").unwrap();
        assert_eq!(sha1_file(&path).unwrap(), HELLO_SHA1);
    }

    #[test]
    fn validate_checks_existence_size_and_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"hello").unwrap();

        assert!(validate_file(&path, Some(5), Some(HELLO_SHA1)));
        assert!(validate_file(&path, None, Some(HELLO_SHA1)));
        assert!(validate_file(&path, Some(5), None));
        // Empty hash means "unknown", not "must be empty".
        assert!(validate_file(&path, Some(5), Some("")));

        assert!(!validate_file(&path, Some(4), Some(HELLO_SHA1)));
        assert!(!validate_file(&path, Some(5), Some("deadbeef")));
        assert!(!validate_file(&dir.path().join("missing"), None, None));
    }

    #[test]
    fn validate_round_trips_with_sha1_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob");
        std::fs::write(&path, b"some library bytes").unwrap();
        let digest = sha1_file(&path).unwrap();
        assert!(validate_file(&path, Some(18), Some(&digest)));
    }
}
