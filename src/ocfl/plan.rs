//! Resumable, crash-safe execution of an object update.
//!
//! An [`UpdatePlan`] is the ordered list of [`PlanStep`]s needed to transform an object's
//! on-disk state from an old inventory (or nothing, for a brand-new object) to a new one.
//! Every step knows how to run itself and how to compensate for having run, so a plan can be
//! persisted after any step completes and resumed -- or reverted -- later, even from a
//! different process.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ocfl::consts::INVENTORY_FILE;
use crate::ocfl::digest::{DigestAlgorithm, HexDigest};
use crate::ocfl::error::{Result, VaultflError};
use crate::ocfl::paths;
use crate::ocfl::util;
use crate::ocfl::{ContentPath, InventoryPath, SpecVersion, VersionNum};

/// Supplies the bytes for a content-addressed digest that is being introduced by an update.
///
/// Implementations resolve a digest to wherever the new content currently lives -- staged
/// files on local disk, a buffer already in memory, or (for a future backend) an object
/// already durable in remote storage.
pub trait ContentSource: Sync {
    /// Returns a path to a readable file containing the bytes for `digest`.
    fn get_content(&self, digest: &HexDigest) -> Result<PathBuf>;
}

/// A [`ContentSource`] backed by a fixed digest-to-path map, typically files staged on local
/// disk ahead of a commit.
#[derive(Debug, Default)]
pub struct FsContentSource {
    paths: std::collections::HashMap<HexDigest, PathBuf>,
}

impl FsContentSource {
    pub fn new(paths: std::collections::HashMap<HexDigest, PathBuf>) -> Self {
        Self { paths }
    }
}

impl ContentSource for FsContentSource {
    fn get_content(&self, digest: &HexDigest) -> Result<PathBuf> {
        self.paths.get(digest).cloned().ok_or_else(|| {
            VaultflError::NotFound(format!("Content source has no entry for digest {}", digest))
        })
    }
}

/// base64 encoding of raw byte blobs, used because JSON has no native byte-string type and the
/// rest of the crate's on-disk structures are plain `serde_json`.
mod b64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        STANDARD.encode(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

mod b64_opt {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        bytes: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        bytes.as_ref().map(|b| STANDARD.encode(b)).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        match encoded {
            Some(encoded) => Ok(Some(
                STANDARD
                    .decode(encoded.as_bytes())
                    .map_err(serde::de::Error::custom)?,
            )),
            None => Ok(None),
        }
    }
}

/// A single, independently resumable unit of work within an [`UpdatePlan`].
///
/// Each variant's forward action and compensating revert action are implemented as methods
/// rather than stored closures so that a plan -- steps and all -- can be serialized verbatim
/// and reconstructed later without having to rebuild any captured state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PlanStep {
    /// Does nothing when run. Used as a sequencing placeholder.
    Noop { name: String },
    /// Forward action is a no-op. Reverting deletes the directory at `path`, if it exists.
    ///
    /// Used for the object-root and version-directory anchors: a single revert of this step
    /// collapses cleanup of everything written underneath it.
    RemoveDirAll { name: String, path: PathBuf },
    /// Writes `bytes` to `path`, creating parent directories as needed. Reverting restores
    /// `previous` if it was captured, otherwise deletes the file.
    WriteFile {
        name: String,
        path: PathBuf,
        #[serde(with = "b64")]
        bytes: Vec<u8>,
        #[serde(with = "b64_opt")]
        previous: Option<Vec<u8>>,
    },
    /// Deletes the file at `path`. Reverting rewrites `restore` if it was captured, otherwise
    /// does nothing.
    RemoveFile {
        name: String,
        path: PathBuf,
        #[serde(with = "b64_opt")]
        restore: Option<Vec<u8>>,
    },
    /// Copies the content addressed by `digest`, resolved through a [`ContentSource`], to
    /// `dst_path`. Reverting deletes `dst_path`; a missing file on revert is not an error.
    CopyContent {
        name: String,
        digest: HexDigest,
        dst_path: PathBuf,
    },
    /// Writes an object namaste declaration file. Reverting deletes it.
    WriteNamaste {
        name: String,
        path: PathBuf,
        content: String,
    },
    /// Deletes an object namaste declaration file. Reverting rewrites `content`.
    RemoveNamaste {
        name: String,
        path: PathBuf,
        content: String,
    },
}

impl PlanStep {
    pub fn name(&self) -> &str {
        match self {
            PlanStep::Noop { name }
            | PlanStep::RemoveDirAll { name, .. }
            | PlanStep::WriteFile { name, .. }
            | PlanStep::RemoveFile { name, .. }
            | PlanStep::CopyContent { name, .. }
            | PlanStep::WriteNamaste { name, .. }
            | PlanStep::RemoveNamaste { name, .. } => name,
        }
    }

    /// The digest this step introduces, if any. Used to cross-check a resumed plan against a
    /// freshly rebuilt one.
    pub fn content_digest(&self) -> Option<&HexDigest> {
        match self {
            PlanStep::CopyContent { digest, .. } => Some(digest),
            _ => None,
        }
    }

    /// Consecutive async steps execute concurrently, bounded by the executor's concurrency
    /// limit. Every other step is a barrier: the executor waits for any in-flight async group
    /// to finish before running it.
    pub fn is_async(&self) -> bool {
        matches!(self, PlanStep::CopyContent { .. })
    }

    fn run(&self, content_source: &dyn ContentSource) -> Result<Option<u64>> {
        match self {
            PlanStep::Noop { .. } => Ok(None),
            PlanStep::RemoveDirAll { .. } => Ok(None),
            PlanStep::WriteFile { path, bytes, .. } => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(path, bytes)?;
                Ok(Some(bytes.len() as u64))
            }
            PlanStep::RemoveFile { path, .. } => {
                util::remove_file_ignore_not_found(path)?;
                Ok(None)
            }
            PlanStep::CopyContent { digest, dst_path, .. } => {
                let src = content_source.get_content(digest)?;
                if let Some(parent) = dst_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                let size = fs::copy(src, dst_path)?;
                Ok(Some(size))
            }
            PlanStep::WriteNamaste { path, content, .. } => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(path, content)?;
                Ok(Some(content.len() as u64))
            }
            PlanStep::RemoveNamaste { path, .. } => {
                util::remove_file_ignore_not_found(path)?;
                Ok(None)
            }
        }
    }

    fn revert(&self) -> Result<()> {
        match self {
            PlanStep::Noop { .. } => Ok(()),
            PlanStep::RemoveDirAll { path, .. } => {
                if path.exists() {
                    fs::remove_dir_all(path)?;
                }
                Ok(())
            }
            PlanStep::WriteFile { path, previous, .. } => {
                match previous {
                    Some(bytes) => fs::write(path, bytes)?,
                    None => util::remove_file_ignore_not_found(path)?,
                }
                Ok(())
            }
            PlanStep::RemoveFile { path, restore, .. } => {
                if let Some(bytes) = restore {
                    fs::write(path, bytes)?;
                }
                Ok(())
            }
            PlanStep::CopyContent { dst_path, .. } => {
                util::remove_file_ignore_not_found(dst_path)?;
                Ok(())
            }
            PlanStep::WriteNamaste { path, .. } => {
                util::remove_file_ignore_not_found(path)?;
                Ok(())
            }
            PlanStep::RemoveNamaste { path, content, .. } => {
                fs::write(path, content)?;
                Ok(())
            }
        }
    }
}

/// The persisted execution record for a single [`PlanStep`].
///
/// `Run` is a no-op if `completed` is already true; `Revert` is a no-op if it's already false.
/// A successful run sets `completed = true` and clears `err`; a successful revert clears
/// `completed` and `revert_err`. A step marked `completed` with a non-empty `err` is an
/// inconsistency that should never occur outside of a bug.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepState {
    pub name: String,
    pub content_digest: Option<HexDigest>,
    pub completed: bool,
    pub err: Option<String>,
    pub revert_err: Option<String>,
    pub size: Option<u64>,
}

impl StepState {
    fn for_step(step: &PlanStep) -> Self {
        Self {
            name: step.name().to_string(),
            content_digest: step.content_digest().cloned(),
            completed: false,
            err: None,
            revert_err: None,
            size: None,
        }
    }
}

/// The ordered, resumable unit of work that carries an object from its current state to a new
/// one.
///
/// A plan, including its steps and their execution state, can be serialized at any point and
/// resumed later: `execute()` skips any step already marked `completed`, and `revert()` walks
/// completed steps in reverse undoing each one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePlan {
    object_id: String,
    object_root: PathBuf,
    #[serde(with = "b64_opt")]
    old_inventory: Option<Vec<u8>>,
    #[serde(with = "b64")]
    new_inventory: Vec<u8>,
    steps: Vec<PlanStep>,
    states: Vec<StepState>,
}

/// The inputs needed to build the canonical 9-step plan for an object update.
pub struct PlanInput {
    pub object_id: String,
    pub object_root: PathBuf,
    pub new_version: VersionNum,
    pub is_new_object: bool,
    pub old_spec: Option<SpecVersion>,
    pub new_spec: SpecVersion,
    /// Content paths that are new in this version and must be copied in from `content_source`.
    pub new_content: Vec<(HexDigest, ContentPath)>,
    pub new_inventory_bytes: Vec<u8>,
    pub old_inventory_bytes: Option<Vec<u8>>,
    pub digest_algorithm: DigestAlgorithm,
    pub old_digest_algorithm: Option<DigestAlgorithm>,
}

impl PlanInput {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        object_id: String,
        object_root: PathBuf,
        new_version: VersionNum,
        is_new_object: bool,
        old_spec: Option<SpecVersion>,
        new_spec: SpecVersion,
        new_content: Vec<(HexDigest, ContentPath)>,
        new_inventory_bytes: Vec<u8>,
        old_inventory_bytes: Option<Vec<u8>>,
        digest_algorithm: DigestAlgorithm,
        old_digest_algorithm: Option<DigestAlgorithm>,
    ) -> Self {
        Self {
            object_id,
            object_root,
            new_version,
            is_new_object,
            old_spec,
            new_spec,
            new_content,
            new_inventory_bytes,
            old_inventory_bytes,
            digest_algorithm,
            old_digest_algorithm,
        }
    }
}

fn sidecar_content(algorithm: DigestAlgorithm, bytes: &[u8]) -> Result<String> {
    let digest = algorithm.hash_hex(&mut &bytes[..])?;
    Ok(format!("{} {}\n", digest, INVENTORY_FILE))
}

impl UpdatePlan {
    /// Builds the canonical update plan for `input`: object/version anchors, namaste
    /// transitions, content copies, and the inventory/sidecar writes, in the order described
    /// by the module documentation.
    pub fn build(input: PlanInput) -> Result<Self> {
        let mut steps = Vec::new();

        if input.is_new_object {
            steps.push(PlanStep::RemoveDirAll {
                name: "object-root-anchor".to_string(),
                path: input.object_root.clone(),
            });
        }

        let namaste_changed = input.old_spec != Some(input.new_spec);

        if namaste_changed {
            let namaste = input.new_spec.object_namaste();
            steps.push(PlanStep::WriteNamaste {
                name: "write-new-namaste".to_string(),
                path: paths::object_namaste_path(&input.object_root, input.new_spec),
                content: namaste.content,
            });

            if let Some(old_spec) = input.old_spec {
                let old_namaste = old_spec.object_namaste();
                steps.push(PlanStep::RemoveNamaste {
                    name: "remove-old-namaste".to_string(),
                    path: paths::object_namaste_path(&input.object_root, old_spec),
                    content: old_namaste.content,
                });
            }
        }

        let version_dir = paths::version_path(&input.object_root, input.new_version);

        steps.push(PlanStep::RemoveDirAll {
            name: "version-dir-anchor".to_string(),
            path: version_dir.clone(),
        });

        for (digest, content_path) in &input.new_content {
            let dst_path = input.object_root.join(content_path.as_path());
            steps.push(PlanStep::CopyContent {
                name: format!("copy-content:{}", content_path.as_str()),
                digest: digest.clone(),
                dst_path,
            });
        }

        let version_inventory_path = paths::inventory_path(&version_dir);
        steps.push(PlanStep::WriteFile {
            name: "write-version-inventory".to_string(),
            path: version_inventory_path,
            bytes: input.new_inventory_bytes.clone(),
            previous: None,
        });

        let version_sidecar_content =
            sidecar_content(input.digest_algorithm, &input.new_inventory_bytes)?;
        steps.push(PlanStep::WriteFile {
            name: "write-version-sidecar".to_string(),
            path: paths::sidecar_path(&version_dir, input.digest_algorithm),
            bytes: version_sidecar_content.clone().into_bytes(),
            previous: None,
        });

        let root_inventory_path = paths::inventory_path(&input.object_root);
        steps.push(PlanStep::WriteFile {
            name: "write-root-inventory".to_string(),
            path: root_inventory_path,
            bytes: input.new_inventory_bytes.clone(),
            previous: input.old_inventory_bytes.clone(),
        });

        let algorithm_changed = input
            .old_digest_algorithm
            .map(|old| old != input.digest_algorithm)
            .unwrap_or(false);

        let root_sidecar_previous = if !algorithm_changed && input.old_inventory_bytes.is_some() {
            input.old_digest_algorithm.map(|old| {
                sidecar_content(old, input.old_inventory_bytes.as_ref().unwrap())
                    .map(|s| s.into_bytes())
            })
        } else {
            None
        }
        .transpose()?;

        steps.push(PlanStep::WriteFile {
            name: "write-root-sidecar".to_string(),
            path: paths::sidecar_path(&input.object_root, input.digest_algorithm),
            bytes: version_sidecar_content.into_bytes(),
            previous: root_sidecar_previous,
        });

        if algorithm_changed {
            if let Some(old_algorithm) = input.old_digest_algorithm {
                let restore = input
                    .old_inventory_bytes
                    .as_ref()
                    .map(|bytes| sidecar_content(old_algorithm, bytes).map(|s| s.into_bytes()))
                    .transpose()?;

                steps.push(PlanStep::RemoveFile {
                    name: "remove-stale-root-sidecar".to_string(),
                    path: paths::sidecar_path(&input.object_root, old_algorithm),
                    restore,
                });
            }
        }

        let states = steps.iter().map(StepState::for_step).collect();

        Ok(Self {
            object_id: input.object_id,
            object_root: input.object_root,
            old_inventory: input.old_inventory_bytes,
            new_inventory: input.new_inventory_bytes,
            steps,
            states,
        })
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    pub fn object_root(&self) -> &Path {
        &self.object_root
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn states(&self) -> &[StepState] {
        &self.states
    }

    pub fn is_completed(&self) -> bool {
        !self.states.is_empty() && self.states.iter().all(|s| s.completed)
    }

    /// Runs every step not already marked completed, in order. Consecutive async steps
    /// (currently only [`PlanStep::CopyContent`]) run concurrently, bounded by
    /// `max_concurrency`; every other step is a barrier.
    ///
    /// Stops at the first failing step. The caller may fix the fault and call `execute` again
    /// -- the already-completed prefix is skipped -- or call [`UpdatePlan::revert`].
    pub fn execute(&mut self, content_source: &dyn ContentSource, max_concurrency: usize) -> Result<()> {
        let mut i = 0;

        while i < self.steps.len() {
            if self.states[i].completed {
                i += 1;
                continue;
            }

            if self.steps[i].is_async() {
                let mut j = i;
                while j < self.steps.len() && self.steps[j].is_async() {
                    j += 1;
                }
                self.run_async_group(i, j, content_source, max_concurrency)?;
                i = j;
            } else {
                self.run_one(i, content_source)?;
                i += 1;
            }
        }

        Ok(())
    }

    fn run_one(&mut self, idx: usize, content_source: &dyn ContentSource) -> Result<()> {
        if self.states[idx].completed {
            return Ok(());
        }

        match self.steps[idx].run(content_source) {
            Ok(size) => {
                self.states[idx].completed = true;
                self.states[idx].err = None;
                self.states[idx].size = size;
                Ok(())
            }
            Err(e) => {
                self.states[idx].err = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn run_async_group(
        &mut self,
        start: usize,
        end: usize,
        content_source: &dyn ContentSource,
        max_concurrency: usize,
    ) -> Result<()> {
        let pending: Vec<usize> = (start..end).filter(|&i| !self.states[i].completed).collect();

        if pending.is_empty() {
            return Ok(());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(max_concurrency.max(1))
            .build()
            .map_err(|e| VaultflError::General(e.to_string()))?;

        let steps = &self.steps;
        let results: Vec<(usize, Option<u64>, Option<String>)> = pool.install(|| {
            pending
                .par_iter()
                .map(|&i| match steps[i].run(content_source) {
                    Ok(size) => (i, size, None),
                    Err(e) => (i, None, Some(e.to_string())),
                })
                .collect()
        });

        let mut first_err = None;

        for (i, size, err) in results {
            match err {
                None => {
                    self.states[i].completed = true;
                    self.states[i].err = None;
                    self.states[i].size = size;
                }
                Some(message) => {
                    self.states[i].err = Some(message.clone());
                    if first_err.is_none() {
                        first_err = Some(message);
                    }
                }
            }
        }

        match first_err {
            Some(message) => Err(VaultflError::General(message)),
            None => Ok(()),
        }
    }

    /// Undoes every completed step, in reverse order. Returns an error without changing any
    /// state if the plan has already been fully applied -- at that point the update is
    /// committed, and undoing it is semantically a new version, not a revert.
    pub fn revert(&mut self) -> Result<()> {
        if self.is_completed() {
            return Err(VaultflError::IllegalState(format!(
                "Cannot revert the update plan for object {} because it has already been fully applied.",
                self.object_id
            )));
        }

        for i in (0..self.steps.len()).rev() {
            if !self.states[i].completed {
                continue;
            }

            match self.steps[i].revert() {
                Ok(()) => {
                    self.states[i].completed = false;
                    self.states[i].revert_err = None;
                }
                Err(e) => {
                    self.states[i].revert_err = Some(e.to_string());
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    /// Serializes the plan, including every step's persisted state and the raw old/new
    /// inventory bytes, to JSON.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Deserializes a plan previously produced by [`UpdatePlan::to_json`].
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Cross-checks a resumed plan against one freshly rebuilt from the current inventories.
    /// Names and content digests of every step must line up in order; a mismatch means the
    /// persisted plan no longer reflects the update it claims to perform.
    pub fn verify_matches(&self, rebuilt: &UpdatePlan) -> Result<()> {
        if self.steps.len() != rebuilt.steps.len() {
            return Err(mismatch_error(&self.object_id));
        }

        for (ours, theirs) in self.steps.iter().zip(rebuilt.steps.iter()) {
            if ours.name() != theirs.name() || ours.content_digest() != theirs.content_digest() {
                return Err(mismatch_error(&self.object_id));
            }
        }

        Ok(())
    }
}

fn mismatch_error(object_id: &str) -> VaultflError {
    VaultflError::IllegalState(format!(
        "Previous update log for object {} doesn't reflect the current update plan.",
        object_id
    ))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::TempDir;

    use super::*;

    fn write_staged(dir: &TempDir, name: &str, contents: &[u8]) -> (HexDigest, PathBuf) {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        let digest = DigestAlgorithm::Sha512
            .hash_hex(&mut &contents[..])
            .unwrap();
        (digest, path)
    }

    fn simple_input(object_root: PathBuf, digest: HexDigest, content_path: &str) -> PlanInput {
        let new_inventory_bytes = br#"{"id":"test"}"#.to_vec();

        PlanInput::new(
            "test-object".to_string(),
            object_root,
            VersionNum::try_from(1u32).unwrap(),
            true,
            None,
            SpecVersion::Ocfl1_1,
            vec![(digest, ContentPath::try_from(content_path).unwrap())],
            new_inventory_bytes,
            None,
            DigestAlgorithm::Sha512,
            None,
        )
    }

    #[test]
    fn execute_writes_every_file_and_marks_steps_completed() {
        let staging = TempDir::new().unwrap();
        let storage = TempDir::new().unwrap();

        let (digest, staged_path) = write_staged(&staging, "file.txt", b"hello world");
        let object_root = storage.path().join("test-object");

        let mut sources = HashMap::new();
        sources.insert(digest.clone(), staged_path);
        let content_source = FsContentSource::new(sources);

        let input = simple_input(object_root.clone(), digest, "v1/content/file.txt");
        let mut plan = UpdatePlan::build(input).unwrap();

        plan.execute(&content_source, 2).unwrap();

        assert!(plan.is_completed());
        assert!(object_root.join("inventory.json").exists());
        assert!(object_root
            .join("inventory.json.sha512")
            .exists());
        assert!(object_root.join("v1/inventory.json").exists());
        assert!(object_root.join("v1/content/file.txt").exists());
        assert_eq!(
            fs::read(object_root.join("v1/content/file.txt")).unwrap(),
            b"hello world"
        );
    }

    #[test]
    fn revert_after_partial_failure_removes_object_root() {
        let staging = TempDir::new().unwrap();
        let storage = TempDir::new().unwrap();

        let (digest, staged_path) = write_staged(&staging, "file.txt", b"hello world");
        let object_root = storage.path().join("test-object");

        // Content source with no entries: the copy step will fail.
        let content_source = FsContentSource::new(HashMap::new());
        let _ = staged_path;

        let input = simple_input(object_root.clone(), digest, "v1/content/file.txt");
        let mut plan = UpdatePlan::build(input).unwrap();

        let result = plan.execute(&content_source, 2);
        assert!(result.is_err());
        assert!(!plan.is_completed());

        plan.revert().unwrap();

        assert!(!object_root.exists());
    }

    #[test]
    fn revert_is_rejected_once_plan_is_fully_applied() {
        let staging = TempDir::new().unwrap();
        let storage = TempDir::new().unwrap();

        let (digest, staged_path) = write_staged(&staging, "file.txt", b"hello world");
        let object_root = storage.path().join("test-object");

        let mut sources = HashMap::new();
        sources.insert(digest.clone(), staged_path);
        let content_source = FsContentSource::new(sources);

        let input = simple_input(object_root, digest, "v1/content/file.txt");
        let mut plan = UpdatePlan::build(input).unwrap();

        plan.execute(&content_source, 2).unwrap();

        assert!(plan.revert().is_err());
    }

    #[test]
    fn persisted_plan_round_trips_and_cross_checks() {
        let storage = TempDir::new().unwrap();
        let object_root = storage.path().join("test-object");

        let digest = DigestAlgorithm::Sha512.hash_hex(&mut &b"hello world"[..]).unwrap();
        let input = simple_input(object_root.clone(), digest.clone(), "v1/content/file.txt");
        let plan = UpdatePlan::build(input).unwrap();

        let bytes = plan.to_json().unwrap();
        let reloaded = UpdatePlan::from_json(&bytes).unwrap();

        let rebuilt_input = simple_input(object_root, digest, "v1/content/file.txt");
        let rebuilt = UpdatePlan::build(rebuilt_input).unwrap();

        reloaded.verify_matches(&rebuilt).unwrap();
    }
}
