// SHA-256 verification of downloaded installer artifacts.

use crate::schemas::errors::InstallError;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::Path;

/// Streams `path` through SHA-256 and returns the lowercase hex digest.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Compares the artifact's digest with the pinned one (case-insensitive).
pub fn verify_sha256(path: &Path, expected: &str) -> Result<(), InstallError> {
    let actual = sha256_file(path).map_err(|source| InstallError::Io {
        context: format!("failed to hash {}", path.display()),
        source,
    })?;
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(InstallError::ChecksumMismatch {
            file: path.display().to_string(),
            expected: expected.trim().to_ascii_lowercase(),
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // sha256("abc")
    const ABC: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    #[test]
    fn matches_known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("setup.exe");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(sha256_file(&path).unwrap(), ABC);
        assert!(verify_sha256(&path, &ABC.to_ascii_uppercase()).is_ok());
    }

    #[test]
    fn mismatch_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("setup.exe");
        std::fs::write(&path, b"abd").unwrap();
        let err = verify_sha256(&path, ABC).unwrap_err();
        assert!(matches!(err, InstallError::ChecksumMismatch { .. }));
        assert_eq!(err.kind(), "ChecksumMismatch");
    }
}
