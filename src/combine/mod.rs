//! Patch-chain combiner
//!
//! Builds one verified resource version from a base tree and a patch tree. The
//! pipeline is linear and never retries:
//!
//! `Start -> Precheck -> ValidateSignature -> ValidateHash -> Merge -> Done`
//!
//! and any failing stage moves straight to `Failed`. The patch's sidecar record is
//! untrusted; the caller's `signature_before` (taken from chain state) is the anchor.
//!
//! Callers must serialize combines of the same resource (see
//! [`crate::resource::ResourceLocks`]); the combiner itself holds no locks.

pub mod cleanup;
pub mod scope;

pub use scope::ScopedCombine;

use crate::error::CombineError;
use crate::patch::{PatchMetadata, TreeMerger};
use crate::sandbox::{PathPolicy, WorkArea};
use crate::tree::Digest;
use crate::types::Signature;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Inputs of one combine
#[derive(Debug, Clone)]
pub struct CombineRequest {
    pub path_before: PathBuf,
    pub path_after: PathBuf,
    /// Signature of the predecessor version according to the caller's chain state
    pub signature_before: Option<Signature>,
}

impl CombineRequest {
    pub fn new(path_before: PathBuf, path_after: PathBuf, signature_before: Signature) -> Self {
        Self {
            path_before,
            path_after,
            signature_before: Some(signature_before),
        }
    }
}

/// Pipeline position, recorded for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineStage {
    Start,
    Precheck,
    ValidateSignature,
    ValidateHash,
    Merge,
    Done,
    Failed,
}

/// Validates and merges one base/patch pair
pub struct Combiner<'a> {
    request: CombineRequest,
    policy: &'a dyn PathPolicy,
    merger: TreeMerger,
    stage: CombineStage,
    final_path: Option<PathBuf>,
    released: bool,
}

impl<'a> Combiner<'a> {
    /// Combiner allocating results in `work_area`'s merge root and releasing inputs
    /// under its containment policy
    pub fn new(request: CombineRequest, work_area: &'a WorkArea) -> Self {
        Self::with_policy(request, work_area.merge_root(), work_area)
    }

    pub fn with_policy(
        request: CombineRequest,
        merge_root: PathBuf,
        policy: &'a dyn PathPolicy,
    ) -> Self {
        Self {
            request,
            policy,
            merger: TreeMerger::new(merge_root),
            stage: CombineStage::Start,
            final_path: None,
            released: false,
        }
    }

    pub fn request(&self) -> &CombineRequest {
        &self.request
    }

    pub fn stage(&self) -> CombineStage {
        self.stage
    }

    /// Path of the merged tree, available only after a successful combine
    pub fn final_path(&self) -> Option<&Path> {
        self.final_path.as_deref()
    }

    /// Run the validate-then-merge pipeline
    ///
    /// Does not release the inputs; call [`Combiner::cleanup`] afterwards or run the
    /// combiner inside a [`ScopedCombine`].
    #[instrument(skip_all, fields(
        before = %self.request.path_before.display(),
        after = %self.request.path_after.display()
    ))]
    pub fn combine(&mut self) -> Result<&Path, CombineError> {
        if self.stage != CombineStage::Start {
            return Err(CombineError::InvalidState(format!(
                "combiner already ran (stage {:?})",
                self.stage
            )));
        }

        let start = Instant::now();
        match self.run_pipeline() {
            Ok(final_path) => {
                self.stage = CombineStage::Done;
                info!(
                    path = %final_path.display(),
                    duration_ms = start.elapsed().as_millis(),
                    "Combine completed"
                );
                Ok(self.final_path.insert(final_path).as_path())
            }
            Err(e) => {
                warn!(stage = ?self.stage, error = %e, "Combine failed");
                self.stage = CombineStage::Failed;
                Err(e)
            }
        }
    }

    fn run_pipeline(&mut self) -> Result<PathBuf, CombineError> {
        self.enter(CombineStage::Precheck);
        self.precheck()?;

        self.enter(CombineStage::ValidateSignature);
        let expected = self.request.signature_before.ok_or_else(|| {
            CombineError::MissingSignature(
                "No previous signature passed to the combiner".to_string(),
            )
        })?;
        let metadata = PatchMetadata::read(&self.request.path_after)?;
        Self::validate_previous_signature(&expected, &metadata)?;

        self.enter(CombineStage::ValidateHash);
        self.validate_previous_hash(&metadata)?;

        self.enter(CombineStage::Merge);
        self.merger
            .merge_with(&self.request.path_before, &self.request.path_after, &metadata)
    }

    fn enter(&mut self, stage: CombineStage) {
        debug!(?stage, "Entering combine stage");
        self.stage = stage;
    }

    fn precheck(&self) -> Result<(), CombineError> {
        let CombineRequest {
            path_before,
            path_after,
            ..
        } = &self.request;
        if path_before.as_os_str().is_empty() || path_after.as_os_str().is_empty() {
            return Err(CombineError::InvalidState(
                "No paths available to build patch".to_string(),
            ));
        }
        if !path_before.exists() || !path_after.exists() {
            return Err(CombineError::InvalidState(
                "Unable to combine because at least one path doesn't exist".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_previous_signature(
        expected: &Signature,
        metadata: &PatchMetadata,
    ) -> Result<(), CombineError> {
        let declared = metadata.previous_signature().ok_or_else(|| {
            CombineError::MissingSignature(
                "Unable to extract previous signature from patch metadata".to_string(),
            )
        })?;

        if declared.as_bytes() != expected.as_bytes() {
            return Err(CombineError::SignatureMismatch {
                expected: expected.to_hex(),
                declared: declared.to_hex(),
            });
        }
        Ok(())
    }

    fn validate_previous_hash(&self, metadata: &PatchMetadata) -> Result<(), CombineError> {
        let declared = metadata.previous_hash().ok_or(CombineError::MissingHash)?;

        let actual = Digest::compute(&self.request.path_before)?;
        if !actual.is_valid(declared.as_bytes()) {
            return Err(CombineError::HashMismatch {
                declared: declared.to_hex(),
                actual: actual.to_hex(),
            });
        }
        debug!(digest = %actual, "Previous state hash verified");
        Ok(())
    }

    /// Release both input trees, at most once
    ///
    /// Never fails; see [`cleanup::release_path`] for the containment rule.
    #[instrument(skip_all, fields(
        before = %self.request.path_before.display(),
        after = %self.request.path_after.display()
    ))]
    pub fn cleanup(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        cleanup::release_path(self.policy, &self.request.path_before);
        cleanup::release_path(self.policy, &self.request.path_after);
    }
}
