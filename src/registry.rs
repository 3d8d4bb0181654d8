//! # Dedup Registry
//!
//! Remembers the content hash of every file already exported, so a later run
//! does not copy it again.
//!
//! ## File Format
//!
//! Plain UTF-8 text, one lowercase hex digest per line, newline-terminated,
//! no header. The file is only ever appended to.
//!
//! ## Durability
//!
//! [`Registry::add`] writes and syncs the line *before* the hash becomes
//! visible in memory. A crash can lose the export in progress but never an
//! entry that was reported as added.

use anyhow::{Context, Result};
use log::debug;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Registry location used when nothing else is configured, relative to the
/// working directory.
pub const DEFAULT_REGISTRY_PATH: &str = "hashes.txt";

/// Persisted set of exported content hashes.
#[derive(Debug)]
pub struct Registry {
    path: PathBuf,
    hashes: HashSet<String>,
}

impl Registry {
    /// Load the registry stored at `path`.
    ///
    /// Blank lines are ignored and surrounding whitespace trimmed. A missing
    /// file is an empty registry; the file is created on the first add.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let file = match fs::File::open(&path) {
            Ok(file) => Some(file),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to open registry {}", path.display()))
            }
        };

        let mut hashes = HashSet::new();
        if let Some(file) = file {
            for line in BufReader::new(file).lines() {
                let line =
                    line.with_context(|| format!("Failed to read registry {}", path.display()))?;
                let hash = line.trim();
                if !hash.is_empty() {
                    hashes.insert(hash.to_string());
                }
            }
        }
        debug!("Loaded {} hashes from {}", hashes.len(), path.display());

        Ok(Self { path, hashes })
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.hashes.contains(hash)
    }

    /// Record `hash`, appending it to the file.
    ///
    /// Returns `false` without touching the file if the hash was already
    /// known, so every hash is stored at most once.
    pub fn add(&mut self, hash: &str) -> Result<bool> {
        if self.contains(hash) {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create registry directory {}", parent.display())
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open registry {} for append", self.path.display()))?;
        writeln!(file, "{hash}")
            .and_then(|()| file.flush())
            .and_then(|()| file.sync_data())
            .with_context(|| format!("Failed to append to registry {}", self.path.display()))?;

        self.hashes.insert(hash.to_string());
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HASH_A: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
    const HASH_B: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn test_missing_file_is_empty_registry() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let registry = Registry::open(temp_dir.path().join("hashes.txt"))?;

        assert!(registry.is_empty());
        assert!(!registry.path().exists(), "open must not create the file");
        Ok(())
    }

    #[test]
    fn test_add_is_visible_and_persisted() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("hashes.txt");

        let mut registry = Registry::open(&path)?;
        assert!(registry.add(HASH_A)?);
        assert!(registry.contains(HASH_A));
        assert!(!registry.contains(HASH_B));

        let reopened = Registry::open(&path)?;
        assert!(reopened.contains(HASH_A));
        assert_eq!(reopened.len(), 1);
        assert_eq!(fs::read_to_string(&path)?, format!("{HASH_A}\n"));
        Ok(())
    }

    #[test]
    fn test_duplicate_add_writes_once() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("hashes.txt");

        let mut registry = Registry::open(&path)?;
        assert!(registry.add(HASH_A)?);
        assert!(!registry.add(HASH_A)?);
        assert!(registry.contains(HASH_A));

        assert_eq!(fs::read_to_string(&path)?.lines().count(), 1);
        Ok(())
    }

    #[test]
    fn test_blank_lines_and_whitespace_are_ignored() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("hashes.txt");
        fs::write(&path, format!("\n{HASH_A}\r\n   \n  {HASH_B}  \n\n"))?;

        let registry = Registry::open(&path)?;
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(HASH_A));
        assert!(registry.contains(HASH_B));
        Ok(())
    }

    #[test]
    fn test_add_appends_after_existing_entries() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("nested").join("hashes.txt");

        Registry::open(&path)?.add(HASH_A)?;
        Registry::open(&path)?.add(HASH_B)?;

        assert_eq!(fs::read_to_string(&path)?, format!("{HASH_A}\n{HASH_B}\n"));
        Ok(())
    }
}
