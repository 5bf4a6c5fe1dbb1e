use std::borrow::Cow;
use std::cell::RefCell;

use log::info;

use once_cell::sync::Lazy;
use regex::Regex;
use strum_macros::Display as EnumDisplay;

use crate::ocfl::consts::{INVENTORY_FILE, OCFL_LAYOUT_FILE, REPO_NAMASTE_FILE_PREFIX};
use crate::ocfl::digest::{HexDigest, MultiDigestWriter};
use crate::ocfl::error::{Result, VaultflError};
use crate::ocfl::inventory::Inventory;
use crate::ocfl::store::{Listing, Storage};
use crate::ocfl::{paths, DigestAlgorithm, SpecVersion, VersionNum};

mod object_root;
mod serde;

pub use object_root::ObjectRoot;

static SIDECAR_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[\t ]+"#).unwrap());

/// Validates OCFL objects and repositories against the rules of the specification.
///
/// `Validator` is generic over the `Storage` implementation so that the same validation logic
/// runs unmodified against both the local filesystem and S3.
pub struct Validator<S: Storage> {
    storage: S,
}

#[derive(Debug)]
enum ParseResult {
    Ok(ParseValidationResult, Inventory),
    Error(ParseValidationResult),
}

#[derive(Debug)]
struct ParseValidationResult {
    errors: RefCell<Vec<ValidationError>>,
    warnings: RefCell<Vec<ValidationWarning>>,
}

/// Where in an object or repository a validation problem was found.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ProblemLocation {
    ObjectRoot,
    ObjectVersion(VersionNum),
    StorageRoot,
    StorageHierarchy,
}

impl std::fmt::Display for ProblemLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ObjectRoot => write!(f, "root"),
            Self::ObjectVersion(num) => write!(f, "{}", num),
            Self::StorageRoot => write!(f, "storage-root"),
            Self::StorageHierarchy => write!(f, "hierarchy"),
        }
    }
}

/// Common behavior shared by the different shapes of validation result -- one per object, one
/// for the storage root, and one for the storage hierarchy as a whole.
pub trait ValidationResult {
    fn errors(&self) -> &[ValidationError];
    fn warnings(&self) -> &[ValidationWarning];
    fn errors_mut(&mut self) -> &mut Vec<ValidationError>;
    fn warnings_mut(&mut self) -> &mut Vec<ValidationWarning>;

    fn has_errors(&self) -> bool {
        !self.errors().is_empty()
    }

    fn has_warnings(&self) -> bool {
        !self.warnings().is_empty()
    }

    fn has_errors_or_warnings(&self) -> bool {
        self.has_errors() || self.has_warnings()
    }
}

/// The result of validating a single OCFL object.
#[derive(Debug)]
pub struct ObjectValidationResult {
    pub object_id: Option<String>,
    errors: Vec<ValidationError>,
    warnings: Vec<ValidationWarning>,
}

impl Default for ObjectValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectValidationResult {
    pub fn new() -> Self {
        Self {
            object_id: None,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn with_id(object_id: &str) -> Self {
        Self {
            object_id: Some(object_id.to_string()),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn add_parse_result(&mut self, location: ProblemLocation, result: ParseValidationResult) {
        self.errors
            .extend(result.errors.take().into_iter().map(|mut e| {
                e.location = location;
                e
            }));
        self.warnings
            .extend(result.warnings.take().into_iter().map(|mut w| {
                w.location = location;
                w
            }));
    }

    pub fn error(&mut self, location: ProblemLocation, code: ErrorCode, message: String) {
        self.errors.push(ValidationError::new(location, code, message));
    }

    pub fn warn(&mut self, location: ProblemLocation, code: WarnCode, message: String) {
        self.warnings.push(ValidationWarning::new(location, code, message));
    }
}

impl ValidationResult for ObjectValidationResult {
    fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    fn warnings(&self) -> &[ValidationWarning] {
        &self.warnings
    }

    fn errors_mut(&mut self) -> &mut Vec<ValidationError> {
        &mut self.errors
    }

    fn warnings_mut(&mut self) -> &mut Vec<ValidationWarning> {
        &mut self.warnings
    }
}

/// The result of validating a storage root or storage hierarchy, neither of which are tied to
/// a single object.
#[derive(Debug, Default)]
pub struct StorageValidationResult {
    errors: Vec<ValidationError>,
    warnings: Vec<ValidationWarning>,
}

impl StorageValidationResult {
    fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, location: ProblemLocation, code: ErrorCode, message: String) {
        self.errors.push(ValidationError::new(location, code, message));
    }

    pub fn warn(&mut self, location: ProblemLocation, code: WarnCode, message: String) {
        self.warnings.push(ValidationWarning::new(location, code, message));
    }
}

impl ValidationResult for StorageValidationResult {
    fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    fn warnings(&self) -> &[ValidationWarning] {
        &self.warnings
    }

    fn errors_mut(&mut self) -> &mut Vec<ValidationError> {
        &mut self.errors
    }

    fn warnings_mut(&mut self) -> &mut Vec<ValidationWarning> {
        &mut self.warnings
    }
}

#[derive(Debug)]
pub struct ValidationError {
    pub location: ProblemLocation,
    pub code: ErrorCode,
    pub text: String,
}

impl ValidationError {
    pub fn new(location: ProblemLocation, code: ErrorCode, text: String) -> Self {
        Self {
            location,
            code,
            text,
        }
    }
}

#[derive(Debug)]
pub struct ValidationWarning {
    pub location: ProblemLocation,
    pub code: WarnCode,
    pub text: String,
}

impl ValidationWarning {
    pub fn new(location: ProblemLocation, code: WarnCode, text: String) -> Self {
        Self {
            location,
            code,
            text,
        }
    }
}

#[allow(dead_code)]
#[derive(Debug, EnumDisplay, Copy, Clone, PartialEq)]
pub enum ErrorCode {
    E001,
    E002,
    E003,
    E004,
    E005,
    E006,
    E007,
    E008,
    E009,
    E010,
    E011,
    E012,
    E013,
    E014,
    E015,
    E016,
    E017,
    E018,
    E019,
    E020,
    E021,
    E022,
    E023,
    E024,
    E025,
    E026,
    E027,
    E028,
    E029,
    E030,
    E031,
    E032,
    E033,
    E034,
    E035,
    E036,
    E037,
    E038,
    E039,
    E040,
    E041,
    E042,
    E043,
    E044,
    E045,
    E046,
    E047,
    E048,
    E049,
    E050,
    E051,
    E052,
    E053,
    E054,
    E055,
    E056,
    E057,
    E058,
    E059,
    E060,
    E061,
    E062,
    E063,
    E064,
    E066,
    E067,
    E068,
    E069,
    E070,
    E071,
    E072,
    E073,
    E074,
    E075,
    E076,
    E077,
    E078,
    E079,
    E080,
    E081,
    E082,
    E083,
    E084,
    E085,
    E086,
    E087,
    E088,
    E089,
    E090,
    E091,
    E092,
    E093,
    E094,
    E095,
    E096,
    E097,
    E098,
    E099,
    E100,
    E101,
    E102,
}

#[allow(dead_code)]
#[derive(Debug, EnumDisplay, Copy, Clone, PartialEq)]
pub enum WarnCode {
    W001,
    W002,
    W003,
    W004,
    W005,
    W006,
    W007,
    W008,
    W009,
    W010,
    W011,
    W012,
    W013,
    W014,
    W015,
}

/// A lazily-evaluated walk over every object in a repository, discovering object roots as it
/// goes. The storage root and storage hierarchy are validated eagerly, before the first object
/// is produced; each `next()` call validates and returns exactly one more object.
///
/// Iteration is cooperative: dropping the iterator after only partially consuming it simply
/// abandons the remaining walk, no cleanup is required.
pub trait IncrementalValidator: Iterator<Item = Result<ObjectValidationResult>> {
    fn storage_root_result(&self) -> &StorageValidationResult;

    fn storage_hierarchy_result(&self) -> &StorageValidationResult;

    fn storage_hierarchy_result_mut(&mut self) -> &mut StorageValidationResult;
}

/// Default `IncrementalValidator` implementation, generic over the storage backend.
pub struct IncrementalValidatorImpl<'a, S: Storage> {
    validator: &'a Validator<S>,
    fixity_check: bool,
    storage_root_result: StorageValidationResult,
    storage_hierarchy_result: StorageValidationResult,
    pending_dirs: Vec<String>,
}

impl<'a, S: Storage> IncrementalValidatorImpl<'a, S> {
    fn new(validator: &'a Validator<S>, fixity_check: bool) -> Result<Self> {
        let mut storage_root_result = StorageValidationResult::new();
        let mut storage_hierarchy_result = StorageValidationResult::new();

        let root_listing = validator.storage.list("", false)?;

        let has_root_namaste = root_listing.iter().any(|entry| {
            matches!(entry, Listing::File(name) if name.starts_with(REPO_NAMASTE_FILE_PREFIX))
        });

        if !has_root_namaste {
            storage_root_result.error(
                ProblemLocation::StorageRoot,
                ErrorCode::E003,
                "Storage root declaration does not exist".to_string(),
            );
        }

        if !root_listing
            .iter()
            .any(|entry| matches!(entry, Listing::File(name) if name.as_ref() == OCFL_LAYOUT_FILE))
        {
            storage_hierarchy_result.warn(
                ProblemLocation::StorageRoot,
                WarnCode::W001,
                "Storage root does not contain an ocfl_layout.json file".to_string(),
            );
        }

        let root = ObjectRoot::scan(&root_listing);
        let pending_dirs = root.all_dirs().map(|d| d.to_string()).collect();

        Ok(Self {
            validator,
            fixity_check,
            storage_root_result,
            storage_hierarchy_result,
            pending_dirs,
        })
    }
}

impl<'a, S: Storage> Iterator for IncrementalValidatorImpl<'a, S> {
    type Item = Result<ObjectValidationResult>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let dir = self.pending_dirs.pop()?;

            let listing = match self.validator.storage.list(&dir, false) {
                Ok(listing) => listing,
                Err(e) => return Some(Err(e)),
            };

            let root = ObjectRoot::scan(&listing);

            if root.has_namaste() {
                return Some(
                    self.validator
                        .validate_object(None, &dir, None, self.fixity_check),
                );
            }

            for name in root.all_dirs() {
                self.pending_dirs.push(paths::join(&dir, name));
            }
        }
    }
}

impl<'a, S: Storage> IncrementalValidator for IncrementalValidatorImpl<'a, S> {
    fn storage_root_result(&self) -> &StorageValidationResult {
        &self.storage_root_result
    }

    fn storage_hierarchy_result(&self) -> &StorageValidationResult {
        &self.storage_hierarchy_result
    }

    fn storage_hierarchy_result_mut(&mut self) -> &mut StorageValidationResult {
        &mut self.storage_hierarchy_result
    }
}

impl<S: Storage> Validator<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Validates the object rooted at `object_root`. If `object_id` is provided, it's compared
    /// against the ID found in the inventory. If `expected_version` is provided, it's compared
    /// against the inventory's head version.
    pub fn validate_object(
        &self,
        object_id: Option<&str>,
        object_root: &str,
        expected_version: Option<VersionNum>,
        fixity_check: bool,
    ) -> Result<ObjectValidationResult> {
        let mut result = ObjectValidationResult::new();
        if let Some(id) = object_id {
            result.object_id = Some(id.to_string());
        }

        let root_listing = self.storage.list(object_root, false)?;
        let root = ObjectRoot::scan(&root_listing);

        match root.namaste_files.as_slice() {
            [] => {
                result.error(
                    ProblemLocation::ObjectRoot,
                    ErrorCode::E003,
                    "Object version declaration does not exist".to_string(),
                );
            }
            [namaste_file] => {
                self.validate_object_namaste(object_root, namaste_file, &mut result);
            }
            multiple => {
                result.error(
                    ProblemLocation::ObjectRoot,
                    ErrorCode::E003,
                    "Multiple object version declarations found".to_string(),
                );
                self.validate_object_namaste(object_root, &multiple[0], &mut result);
            }
        }

        if root.has_inventory {
            let algorithms = &root.sidecar_algorithms;

            let (inventory, digest) = self.validate_inventory(
                &paths::join(object_root, INVENTORY_FILE),
                ProblemLocation::ObjectRoot,
                expected_version,
                &algorithms,
                &mut result,
            )?;

            if let Some(inventory) = &inventory {
                if result.object_id.is_none() {
                    result.object_id = Some(inventory.id.clone());
                } else if let Some(expected_id) = object_id {
                    if expected_id != inventory.id {
                        result.error(
                            ProblemLocation::ObjectRoot,
                            ErrorCode::E083,
                            format!(
                                "Inventory field 'id' should be '{}'. Found: {}",
                                expected_id, inventory.id
                            ),
                        );
                    }
                }
            }

            let algorithm = match &inventory {
                Some(inventory) => Some(inventory.digest_algorithm),
                None => {
                    if algorithms.len() == 1 {
                        Some(algorithms[0])
                    } else {
                        None
                    }
                }
            };

            if let Some(algorithm) = algorithm {
                let sidecar_file = format!("{}.{}", INVENTORY_FILE, algorithm);
                if root_listing
                    .iter()
                    .any(|entry| matches!(entry, Listing::File(name) if name.as_ref() == sidecar_file))
                {
                    if let Some(digest) = digest {
                        self.validate_sidecar(
                            &paths::join(object_root, &sidecar_file),
                            ProblemLocation::ObjectRoot,
                            &digest,
                            &mut result,
                        )?;
                    }
                } else {
                    result.error(
                        ProblemLocation::ObjectRoot,
                        ErrorCode::E058,
                        format!("Inventory sidecar {} does not exist", sidecar_file),
                    );
                }
            }
        } else {
            result.error(
                ProblemLocation::ObjectRoot,
                ErrorCode::E063,
                "Inventory does not exist".to_string(),
            );
        }

        Ok(result)
    }

    /// Validates the storage root and returns an incremental validator that lazily validates
    /// each object underneath it.
    pub fn validate_repo(&self, fixity_check: bool) -> Result<IncrementalValidatorImpl<'_, S>> {
        IncrementalValidatorImpl::new(self, fixity_check)
    }

    /// Instructs the validator's backing storage to gracefully stop any in-flight work.
    pub fn close(&self) {}

    fn validate_object_namaste(
        &self,
        object_root: &str,
        namaste_file: &str,
        result: &mut ObjectValidationResult,
    ) {
        let path = paths::join(object_root, namaste_file);
        let mut bytes: Vec<u8> = Vec::new();

        match self.storage.read(&path, &mut bytes) {
            Ok(_) => match String::from_utf8(bytes) {
                Ok(contents) => match SpecVersion::try_from_namaste_filename(namaste_file) {
                    Ok(version) => {
                        let expected = version.object_namaste().content;
                        if contents != expected {
                            result.error(
                                ProblemLocation::ObjectRoot,
                                ErrorCode::E007,
                                format!(
                                    "Object version declaration is invalid. Expected: {}; Found: {}",
                                    expected, contents
                                ),
                            );
                        }
                    }
                    Err(_) => {
                        result.error(
                            ProblemLocation::ObjectRoot,
                            ErrorCode::E004,
                            format!("Unrecognized object declaration file: {}", namaste_file),
                        );
                    }
                },
                Err(_) => {
                    result.error(
                        ProblemLocation::ObjectRoot,
                        ErrorCode::E007,
                        "Object version declaration contains invalid UTF-8 content".to_string(),
                    );
                }
            },
            Err(_) => {
                result.error(
                    ProblemLocation::ObjectRoot,
                    ErrorCode::E003,
                    "Object version declaration does not exist".to_string(),
                );
            }
        }
    }

    fn validate_inventory(
        &self,
        inventory_path: &str,
        location: ProblemLocation,
        expected_version: Option<VersionNum>,
        algorithms: &[DigestAlgorithm],
        result: &mut ObjectValidationResult,
    ) -> Result<(Option<Inventory>, Option<HexDigest>)> {
        let mut inventory = None;
        let mut digest = None;

        let mut writer = MultiDigestWriter::new(algorithms, Vec::new());

        self.storage.read(inventory_path, &mut writer)?;

        match serde_json::from_slice::<ParseResult>(writer.inner()) {
            Ok(parse_result) => match parse_result {
                ParseResult::Ok(parse_result, inv) => {
                    if SpecVersion::try_from_inventory_type(&inv.type_declaration).is_err() {
                        parse_result.error(
                            ErrorCode::E038,
                            format!("Inventory field 'type' is not a recognized OCFL spec version URI. Found: {}", inv.type_declaration),
                        );
                    }

                    if let Some(expected_version) = expected_version {
                        if inv.head != expected_version {
                            parse_result.error(
                                ErrorCode::E040,
                                format!(
                                    "Inventory field 'head' must equal '{}'. Found: {}",
                                    expected_version, inv.head
                                ),
                            );
                        }
                    }

                    let has_errors = parse_result.has_errors();

                    result.add_parse_result(location, parse_result);

                    digest = writer.finalize_hex().remove(&inv.digest_algorithm);
                    if !has_errors {
                        inventory = Some(inv);
                    }
                }
                ParseResult::Error(parse_result) => result.add_parse_result(location, parse_result),
            },
            Err(_) => {
                result.error(
                    location,
                    ErrorCode::E033,
                    "Inventory could not be parsed".to_string(),
                );
            }
        }

        Ok((inventory, digest))
    }

    fn validate_sidecar(
        &self,
        sidecar_path: &str,
        location: ProblemLocation,
        digest: &HexDigest,
        result: &mut ObjectValidationResult,
    ) -> Result<()> {
        let mut bytes = Vec::new();
        self.storage.read(sidecar_path, &mut bytes)?;
        match String::from_utf8(bytes) {
            Ok(contents) => {
                let parts: Vec<&str> = SIDECAR_SPLIT.split(&contents).collect();
                if parts.len() != 2 || parts[1].trim_end() != INVENTORY_FILE {
                    result.error(
                        location,
                        ErrorCode::E061,
                        "Inventory sidecar is invalid".to_string(),
                    )
                } else {
                    let expected_digest = HexDigest::from(parts[0]);
                    if expected_digest != *digest {
                        result.error(
                            location,
                            ErrorCode::E060,
                            format!(
                                "Inventory does not match expected digest. Expected: {}; Found: {}",
                                expected_digest, digest
                            ),
                        );
                    }
                }
            }
            Err(_) => result.error(
                location,
                ErrorCode::E061,
                "Inventory sidecar is invalid".to_string(),
            ),
        }

        Ok(())
    }
}

impl ParseValidationResult {
    pub fn new() -> Self {
        Self {
            errors: RefCell::new(Vec::new()),
            warnings: RefCell::new(Vec::new()),
        }
    }

    pub fn error(&self, code: ErrorCode, message: String) {
        self.errors
            .borrow_mut()
            .push(ValidationError::new(ProblemLocation::ObjectRoot, code, message));
    }

    pub fn warn(&self, code: WarnCode, message: String) {
        self.warnings
            .borrow_mut()
            .push(ValidationWarning::new(ProblemLocation::ObjectRoot, code, message));
    }

    pub fn has_errors(&self) -> bool {
        self.errors.borrow().len() > 0
    }
}

pub fn validate_object_id(object_id: &str) -> Result<()> {
    if object_id.is_empty() {
        return Err(VaultflError::InvalidValue(
            "Object IDs may not be blank".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_digest_algorithm(digest_algorithm: DigestAlgorithm) -> Result<()> {
    if digest_algorithm != DigestAlgorithm::Sha512 && digest_algorithm != DigestAlgorithm::Sha256 {
        return Err(VaultflError::InvalidValue(format!(
            "The inventory digest algorithm must be sha512 or sha256. Found: {}",
            digest_algorithm
        )));
    }
    Ok(())
}

pub fn validate_content_dir(content_dir: &str) -> Result<()> {
    if content_dir.eq(".") || content_dir.eq("..") || content_dir.contains('/') {
        return Err(VaultflError::InvalidValue(format!(
            "The content directory cannot equal '.' or '..' and cannot contain a '/'. Found: {}",
            content_dir
        )));
    }
    Ok(())
}
