#![allow(dead_code)]

use std::convert::TryFrom;
use std::rc::Rc;

use assert_fs::fixture::ChildPath;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use vaultfl::ocfl::{
    ErrorCode, InventoryPath, ObjectValidationResult, ProblemLocation, StorageValidationResult,
    ValidationError, ValidationResult, ValidationWarning, VersionNum, WarnCode,
};

pub fn create_dirs(temp: &TempDir, path: &str) -> ChildPath {
    let child = resolve_child(temp, path);
    child.create_dir_all().unwrap();
    child
}

pub fn create_file(temp: &TempDir, path: &str, content: &str) -> ChildPath {
    let child = resolve_child(temp, path);
    child.write_str(content).unwrap();
    child
}

pub fn resolve_child(temp: &TempDir, path: &str) -> ChildPath {
    let mut child: Option<ChildPath> = None;
    for part in path.split('/') {
        child = match child {
            Some(child) => Some(child.child(part)),
            None => Some(temp.child(part)),
        };
    }
    child.unwrap()
}

pub fn path(path: &str) -> InventoryPath {
    InventoryPath::try_from(path).unwrap()
}

pub fn path_rc(path: &str) -> Rc<InventoryPath> {
    Rc::new(InventoryPath::try_from(path).unwrap())
}

pub fn root_error(code: ErrorCode, text: &str) -> ValidationError {
    ValidationError::new(ProblemLocation::ObjectRoot, code, text.to_string())
}

pub fn root_warning(code: WarnCode, text: &str) -> ValidationWarning {
    ValidationWarning::new(ProblemLocation::ObjectRoot, code, text.to_string())
}

pub fn version_error(version: &str, code: ErrorCode, text: &str) -> ValidationError {
    ValidationError::new(
        ProblemLocation::ObjectVersion(VersionNum::try_from(version).unwrap()),
        code,
        text.to_string(),
    )
}

pub fn version_warning(version: &str, code: WarnCode, text: &str) -> ValidationWarning {
    ValidationWarning::new(
        ProblemLocation::ObjectVersion(VersionNum::try_from(version).unwrap()),
        code,
        text.to_string(),
    )
}

fn error_key(e: &ValidationError) -> String {
    format!("{}|{}|{}", e.location, e.code, e.text)
}

fn warning_key(w: &ValidationWarning) -> String {
    format!("{}|{}|{}", w.location, w.code, w.text)
}

fn assert_errors_match(actual: &[ValidationError], expected: &[ValidationError]) {
    let mut actual_keys: Vec<String> = actual.iter().map(error_key).collect();
    let mut expected_keys: Vec<String> = expected.iter().map(error_key).collect();
    actual_keys.sort();
    expected_keys.sort();
    assert_eq!(
        actual_keys, expected_keys,
        "errors did not match.\nactual: {:#?}\nexpected: {:#?}",
        actual, expected
    );
}

fn assert_warnings_match(actual: &[ValidationWarning], expected: &[ValidationWarning]) {
    let mut actual_keys: Vec<String> = actual.iter().map(warning_key).collect();
    let mut expected_keys: Vec<String> = expected.iter().map(warning_key).collect();
    actual_keys.sort();
    expected_keys.sort();
    assert_eq!(
        actual_keys, expected_keys,
        "warnings did not match.\nactual: {:#?}\nexpected: {:#?}",
        actual, expected
    );
}

pub fn has_errors(result: &ObjectValidationResult, expected: &[ValidationError]) {
    assert_errors_match(result.errors(), expected);
}

pub fn has_warnings(result: &ObjectValidationResult, expected: &[ValidationWarning]) {
    assert_warnings_match(result.warnings(), expected);
}

pub fn no_errors(result: &ObjectValidationResult) {
    assert!(
        result.errors().is_empty(),
        "expected no errors, found: {:#?}",
        result.errors()
    );
}

pub fn no_warnings(result: &ObjectValidationResult) {
    assert!(
        result.warnings().is_empty(),
        "expected no warnings, found: {:#?}",
        result.warnings()
    );
}

pub fn has_errors_storage(result: &StorageValidationResult, expected: &[ValidationError]) {
    assert_errors_match(result.errors(), expected);
}

pub fn has_warnings_storage(result: &StorageValidationResult, expected: &[ValidationWarning]) {
    assert_warnings_match(result.warnings(), expected);
}

pub fn no_errors_storage(result: &StorageValidationResult) {
    assert!(
        result.errors().is_empty(),
        "expected no errors, found: {:#?}",
        result.errors()
    );
}

pub fn no_warnings_storage(result: &StorageValidationResult) {
    assert!(
        result.warnings().is_empty(),
        "expected no warnings, found: {:#?}",
        result.warnings()
    );
}

pub fn error_count(count: usize, result: &ObjectValidationResult) {
    assert_eq!(
        result.errors().len(),
        count,
        "expected {} errors, found: {:#?}",
        count,
        result.errors()
    );
}

pub fn warning_count(count: usize, result: &ObjectValidationResult) {
    assert_eq!(
        result.warnings().len(),
        count,
        "expected {} warnings, found: {:#?}",
        count,
        result.warnings()
    );
}
