//! Content hashing for deduplication.
//!
//! A track's identity is the SHA-256 of its bytes, so renaming or retagging a
//! file in the player does not make it look new.

use anyhow::{Context, Result};
use log::warn;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

const BUFFER_SIZE: usize = 64 * 1024;

/// Compute the lowercase hex SHA-256 of the file at `path`.
///
/// Returns `Ok(None)` (and logs a warning) when the file does not exist.
/// Read failures on an existing file are errors.
pub fn hash_file(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        warn!("Cannot hash missing file {}", path.display());
        return Ok(None);
    }

    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(Some(hex::encode(hasher.finalize())))
}

/// SHA-256 of an in-memory buffer, same encoding as [`hash_file`].
pub fn hash_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_hash_known_content() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("abc.mp3");
        std::fs::write(&path, b"abc")?;

        assert_eq!(
            hash_file(&path)?.as_deref(),
            Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
        Ok(())
    }

    #[test]
    fn test_hash_matches_in_memory_digest() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("big.flac");
        // Spans several buffer fills.
        let content: Vec<u8> = (0..(3 * BUFFER_SIZE + 17)).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &content)?;

        assert_eq!(hash_file(&path)?, Some(hash_bytes(&content)));
        Ok(())
    }

    #[test]
    fn test_missing_file_has_no_hash() -> Result<()> {
        let temp_dir = TempDir::new()?;
        assert_eq!(hash_file(&temp_dir.path().join("gone.ogg"))?, None);
        Ok(())
    }

    #[test]
    fn test_empty_file() {
        assert_eq!(
            hash_bytes(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
