use core::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::{error, io};

#[cfg(feature = "s3")]
use rusoto_core::region::ParseRegionError;
#[cfg(feature = "s3")]
use rusoto_core::RusotoError;
use thiserror::Error;

use crate::ocfl::{LogicalPath, VersionNum};

pub type Result<T, E = VaultflError> = core::result::Result<T, E>;

/// Application errors
#[derive(Error)]
pub enum VaultflError {
    #[error("Object {object_id} is corrupt: {message}")]
    CorruptObject { object_id: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("{0}")]
    General(String),

    #[error("File already exists at {0}. Use the force flag if you wish to overwrite.")]
    AlreadyExists(LogicalPath),

    #[error("One or more copy/move operations failed:\n{0}")]
    CopyMoveError(MultiError),

    #[error("Failed to acquire lock on object {0} at {1}")]
    LockAcquire(String, String),

    #[error("The repository is closed")]
    Closed,

    #[error("{0}")]
    Io(io::Error),

    #[error("{0}")]
    Wrapped(Box<dyn error::Error>),
}

/// Wraps a collection of error messages produced by an operation that may partially fail,
/// such as a bulk copy or move, so that the caller sees every failure instead of only the first.
#[derive(Debug)]
pub struct MultiError(pub Vec<String>);

impl Display for MultiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, message) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", message)?;
        }
        Ok(())
    }
}

/// Constructs a `VaultflError::NotFound` error
pub fn not_found(object_id: &str, version_num: Option<VersionNum>) -> VaultflError {
    match version_num {
        Some(version) => VaultflError::NotFound(format!("Object {} version {}", object_id, version)),
        None => VaultflError::NotFound(format!("Object {}", object_id)),
    }
}

/// Constructs a `VaultflError::NotFound` error for a logical path missing from a specific version
pub fn not_found_path(object_id: &str, version_num: VersionNum, path: &LogicalPath) -> VaultflError {
    VaultflError::NotFound(format!(
        "Path {} not found in object {} version {}",
        path, object_id, version_num
    ))
}

impl Debug for VaultflError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl From<io::Error> for VaultflError {
    fn from(e: io::Error) -> Self {
        VaultflError::Io(e)
    }
}

impl From<globset::Error> for VaultflError {
    fn from(e: globset::Error) -> Self {
        VaultflError::Wrapped(Box::new(e))
    }
}

impl From<serde_json::Error> for VaultflError {
    fn from(e: serde_json::Error) -> Self {
        VaultflError::Wrapped(Box::new(e))
    }
}

impl From<walkdir::Error> for VaultflError {
    fn from(e: walkdir::Error) -> Self {
        VaultflError::Wrapped(Box::new(e))
    }
}

#[cfg(feature = "s3")]
impl From<ParseRegionError> for VaultflError {
    fn from(e: ParseRegionError) -> Self {
        VaultflError::Wrapped(Box::new(e))
    }
}

#[cfg(feature = "s3")]
impl<T: error::Error + 'static> From<RusotoError<T>> for VaultflError {
    fn from(e: RusotoError<T>) -> Self {
        VaultflError::Wrapped(Box::new(e))
    }
}
