//! File-system resource helpers.
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::path::Path;

/// Hex characters kept by [`short_digest`].
const SHORT_DIGEST_LEN: usize = 12;

/// Read `path`, returning `None` when it does not exist.
///
/// # Errors
///
/// Returns any I/O error other than `NotFound`.
pub fn read_if_exists(path: &Path) -> std::io::Result<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Whether `path` is a directory itself rather than a symlink to one.
#[must_use]
pub fn is_real_dir(path: &Path) -> bool {
    path.symlink_metadata().is_ok_and(|m| m.is_dir())
}

/// Abbreviated SHA-256 of `bytes`, for state messages.
#[must_use]
pub fn short_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = String::with_capacity(SHORT_DIGEST_LEN);
    for byte in digest.iter().take(SHORT_DIGEST_LEN / 2) {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}
