//! `vaultfl` is a library and command line tool for reading, writing, and validating
//! [OCFL](https://ocfl.io/) (Oxford Common File Layout) repositories.
//!
//! An OCFL object is a self-describing, versioned directory tree: a namaste declaration file,
//! a chain of immutable version directories, and an inventory that maps logical paths to
//! content-addressed digests. A storage root groups many such objects under a configurable
//! id-to-path layout.
//!
//! The [`ocfl`] module is the core: it models inventories and their invariants, executes
//! crash-safe and resumable object updates, and abstracts over storage backends (local
//! filesystem and S3). The [`cmd`] and [`config`] modules are a thin CLI client built on top of
//! it.
//!
//! ```rust,no_run
//! use vaultfl::ocfl::OcflRepo;
//!
//! let repo = OcflRepo::fs_repo("path/to/ocfl/storage/root")?;
//! # Ok::<(), vaultfl::ocfl::VaultflError>(())
//! ```

pub mod cmd;
pub mod config;
pub mod ocfl;
