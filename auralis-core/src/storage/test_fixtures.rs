//! Test fixtures for asset storage.
//!
//! Provides a temporary media directory with deterministic clip contents so
//! streaming tests can compare response bodies byte for byte.

use std::path::PathBuf;

/// Deterministic clip contents of `len` bytes.
pub fn clip_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 256) as u8).collect()
}

/// Creates a temporary media directory containing the named clips.
///
/// Each entry is `(relative file name, size in bytes)`; contents come from
/// [`clip_bytes`].
///
/// # Panics
///
/// Panics if the temporary directory or a clip cannot be written. This is
/// acceptable in test fixtures where failures indicate environment issues.
pub fn create_media_dir(clips: &[(&str, usize)]) -> (tempfile::TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().unwrap();
    let media_dir = temp_dir.path().join("audios");
    std::fs::create_dir_all(&media_dir).unwrap();

    for (name, len) in clips {
        let path = media_dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, clip_bytes(*len)).unwrap();
    }

    (temp_dir, media_dir)
}
