//! Classifies the contents of an OCFL object root (or a candidate directory that may turn out to
//! be one), so that both the storage-root walk and single-object validation work from the same
//! understanding of what's in the directory.

use crate::ocfl::consts::{
    EXTENSIONS_DIR, INVENTORY_FILE, INVENTORY_SIDECAR_PREFIX, OBJECT_NAMASTE_FILE_PREFIX,
};
use crate::ocfl::store::Listing;
use crate::ocfl::{DigestAlgorithm, VersionNum};

/// The classified contents of a single directory listing within an OCFL storage hierarchy.
///
/// A directory that turns out not to be an object root (no namaste file) is still useful to
/// classify: its subdirectories become the next directories to scan when walking a storage root.
#[derive(Debug, Default)]
pub struct ObjectRoot {
    /// Every `0=ocfl_object_*` file found, in listing order. An object root should have exactly
    /// one; zero or multiple are validation errors the caller reports.
    pub namaste_files: Vec<String>,
    /// Whether an `inventory.json` file is present.
    pub has_inventory: bool,
    /// The digest algorithms advertised by `inventory.json.<algorithm>` sidecar files present.
    pub sidecar_algorithms: Vec<DigestAlgorithm>,
    /// Whether an `extensions` directory is present.
    pub has_extensions: bool,
    /// Subdirectories whose names parse as version directories (`v1`, `v0002`, ...), in listing
    /// order.
    pub version_dirs: Vec<(String, VersionNum)>,
    /// Every other directory entry — candidates for further recursion when walking a storage
    /// root, or unexpected content when validating a known object root.
    pub non_conform: Vec<String>,
}

impl ObjectRoot {
    /// Classifies a non-recursive directory listing of `dir`.
    pub fn scan(listing: &[Listing]) -> Self {
        let mut root = ObjectRoot::default();

        for entry in listing {
            match entry {
                Listing::File(name) => {
                    if name.starts_with(OBJECT_NAMASTE_FILE_PREFIX) {
                        root.namaste_files.push(name.to_string());
                    } else if name.as_ref() == INVENTORY_FILE {
                        root.has_inventory = true;
                    } else if let Some(algorithm) = name.strip_prefix(INVENTORY_SIDECAR_PREFIX) {
                        if let Ok(algorithm) = algorithm.parse() {
                            root.sidecar_algorithms.push(algorithm);
                        } else {
                            root.non_conform.push(name.to_string());
                        }
                    } else {
                        root.non_conform.push(name.to_string());
                    }
                }
                Listing::Directory(name) => {
                    if name.as_ref() == EXTENSIONS_DIR {
                        root.has_extensions = true;
                    } else if let Ok(version_num) = VersionNum::try_from(name.as_ref()) {
                        root.version_dirs.push((name.to_string(), version_num));
                    } else {
                        root.non_conform.push(name.to_string());
                    }
                }
                Listing::Other(name) => root.non_conform.push(name.to_string()),
            }
        }

        root
    }

    /// Whether this directory has exactly one namaste file and is therefore an object root.
    pub fn is_object_root(&self) -> bool {
        self.namaste_files.len() == 1
    }

    /// Whether this directory has at least one namaste file, meaning it's declared itself to be
    /// an object root even if the declaration is otherwise invalid (e.g. duplicated).
    pub fn has_namaste(&self) -> bool {
        !self.namaste_files.is_empty()
    }

    /// Directories that are neither `extensions` nor version directories. Used when walking a
    /// storage root to find the next candidates to recurse into.
    pub fn other_dirs(&self) -> impl Iterator<Item = &str> {
        self.non_conform.iter().map(|s| s.as_str())
    }

    /// All subdirectories other than `extensions`. Used while walking the storage hierarchy,
    /// before it's known whether a directory is an object root: a storage-hierarchy shard
    /// directory could coincidentally have a name that parses as a version directory.
    pub fn all_dirs(&self) -> impl Iterator<Item = &str> {
        self.version_dirs
            .iter()
            .map(|(name, _)| name.as_str())
            .chain(self.non_conform.iter().map(|s| s.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_classifies_a_well_formed_object_root() {
        let listing = vec![
            Listing::file("0=ocfl_object_1.0"),
            Listing::file("inventory.json"),
            Listing::file("inventory.json.sha512"),
            Listing::dir("v1"),
            Listing::dir("v2"),
            Listing::dir("extensions"),
        ];

        let root = ObjectRoot::scan(&listing);

        assert!(root.is_object_root());
        assert!(root.has_inventory);
        assert!(root.has_extensions);
        assert_eq!(root.sidecar_algorithms, vec![DigestAlgorithm::Sha512]);
        assert_eq!(root.version_dirs.len(), 2);
        assert!(root.non_conform.is_empty());
    }

    #[test]
    fn scan_reports_multiple_namaste_files() {
        let listing = vec![
            Listing::file("0=ocfl_object_1.0"),
            Listing::file("0=ocfl_object_1.1"),
        ];

        let root = ObjectRoot::scan(&listing);

        assert!(!root.is_object_root());
        assert!(root.has_namaste());
        assert_eq!(root.namaste_files.len(), 2);
    }

    #[test]
    fn scan_puts_unrecognized_entries_in_non_conform() {
        let listing = vec![Listing::file("README.md"), Listing::dir("random")];

        let root = ObjectRoot::scan(&listing);

        assert!(!root.has_namaste());
        assert_eq!(root.non_conform, vec!["README.md", "random"]);
        assert_eq!(root.other_dirs().collect::<Vec<_>>(), vec!["random"]);
    }
}
