//! In-memory storage implementation. Not used by the CLI; exists so unit and property tests can
//! exercise the validator and object-root scanner without touching the filesystem.

use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::sync::RwLock;

use crate::ocfl::error::{Result, VaultflError};
use crate::ocfl::store::{Listing, Storage};
use crate::ocfl::util;

/// A [`Storage`] implementation backed by an in-process map of path to bytes, guarded by an
/// `RwLock`. Paths are normalized to have no leading or trailing `/`.
#[derive(Debug, Default)]
pub struct MemStorage {
    files: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self {
            files: RwLock::new(BTreeMap::new()),
        }
    }

    /// Inserts or overwrites a file's bytes.
    pub fn put_file(&self, path: &str, bytes: Vec<u8>) {
        self.files
            .write()
            .unwrap()
            .insert(util::trim_slashes(path).to_string(), bytes);
    }

    /// Removes a file. A no-op if the file does not exist.
    pub fn remove_file(&self, path: &str) {
        self.files.write().unwrap().remove(util::trim_slashes(path));
    }

    /// Returns true if a file exists at the specified path.
    pub fn contains_file(&self, path: &str) -> bool {
        self.files
            .read()
            .unwrap()
            .contains_key(util::trim_slashes(path))
    }
}

impl Storage for MemStorage {
    fn read<W: Write>(&self, path: &str, sink: &mut W) -> Result<()> {
        let path = util::trim_slashes(path);
        let files = self.files.read().unwrap();

        match files.get(path) {
            Some(bytes) => {
                sink.write_all(bytes)?;
                Ok(())
            }
            None => Err(VaultflError::NotFound(format!(
                "No file exists at path {}",
                path
            ))),
        }
    }

    fn list(&self, path: &str, recursive: bool) -> Result<Vec<Listing>> {
        let prefix = util::trim_slashes(path);
        let search_prefix = if prefix.is_empty() {
            String::new()
        } else {
            format!("{}/", prefix)
        };

        let files = self.files.read().unwrap();
        let mut listings = Vec::new();

        if recursive {
            // An in-memory store has no notion of an empty directory, so recursive listings
            // only ever surface files.
            for key in files.keys() {
                if let Some(relative) = key.strip_prefix(&search_prefix) {
                    if !relative.is_empty() {
                        listings.push(Listing::file_owned(relative.to_string()));
                    }
                }
            }

            return Ok(listings);
        }

        let mut seen_dirs = HashSet::new();

        for key in files.keys() {
            let relative = match key.strip_prefix(&search_prefix) {
                Some(relative) if !relative.is_empty() => relative,
                _ => continue,
            };

            match relative.find('/') {
                None => listings.push(Listing::file_owned(relative.to_string())),
                Some(slash) => {
                    let dir = &relative[..slash];
                    if seen_dirs.insert(dir.to_string()) {
                        listings.push(Listing::dir_owned(dir.to_string()));
                    }
                }
            }
        }

        Ok(listings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_returns_not_found_for_missing_file() {
        let storage = MemStorage::new();
        let mut sink = Vec::new();
        assert!(storage.read("missing.txt", &mut sink).is_err());
    }

    #[test]
    fn read_returns_stored_bytes() {
        let storage = MemStorage::new();
        storage.put_file("/object/inventory.json", b"hello".to_vec());

        let mut sink = Vec::new();
        storage.read("object/inventory.json", &mut sink).unwrap();
        assert_eq!(sink, b"hello");
    }

    #[test]
    fn list_non_recursive_groups_by_direct_children() {
        let storage = MemStorage::new();
        storage.put_file("object/v1/content/a.txt", b"a".to_vec());
        storage.put_file("object/v1/inventory.json", b"{}".to_vec());
        storage.put_file("object/v2/inventory.json", b"{}".to_vec());

        let mut listing = storage.list("object", false).unwrap();
        listing.sort_by(|a, b| a.path().cmp(b.path()));

        assert_eq!(
            listing,
            vec![Listing::dir_owned("v1".to_string()), Listing::dir_owned("v2".to_string())]
        );
    }

    #[test]
    fn list_recursive_returns_every_file() {
        let storage = MemStorage::new();
        storage.put_file("object/v1/content/a.txt", b"a".to_vec());
        storage.put_file("object/v1/inventory.json", b"{}".to_vec());

        let mut listing = storage.list("object", true).unwrap();
        listing.sort_by(|a, b| a.path().cmp(b.path()));

        assert_eq!(
            listing,
            vec![
                Listing::file_owned("v1/content/a.txt".to_string()),
                Listing::file_owned("v1/inventory.json".to_string()),
            ]
        );
    }

    #[test]
    fn remove_file_deletes_entry() {
        let storage = MemStorage::new();
        storage.put_file("a.txt", b"a".to_vec());
        storage.remove_file("a.txt");
        assert!(!storage.contains_file("a.txt"));
    }
}
