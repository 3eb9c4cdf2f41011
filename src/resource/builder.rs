//! Rebuild the latest version of a resource from its layer chain

use crate::combine::{CombineRequest, ScopedCombine};
use crate::error::CombineError;
use crate::resource::{ResourceId, ResourceLocks};
use crate::sandbox::WorkArea;
use crate::types::Signature;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, instrument};

/// How a layer was published
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerKind {
    /// Complete tree of one version
    Snapshot,
    /// Changes relative to the previous layer
    Patch,
}

/// One on-chain version, already materialized on disk
#[derive(Debug, Clone)]
pub struct Layer {
    pub kind: LayerKind,
    /// Signature of the transaction that published this layer
    pub signature: Signature,
    pub path: PathBuf,
}

impl Layer {
    pub fn snapshot(signature: Signature, path: PathBuf) -> Self {
        Self {
            kind: LayerKind::Snapshot,
            signature,
            path,
        }
    }

    pub fn patch(signature: Signature, path: PathBuf) -> Self {
        Self {
            kind: LayerKind::Patch,
            signature,
            path,
        }
    }
}

/// Folds a snapshot and its following patches into one tree
pub struct LayerChainBuilder<'a> {
    work_area: &'a WorkArea,
    locks: &'a ResourceLocks,
}

impl<'a> LayerChainBuilder<'a> {
    pub fn new(work_area: &'a WorkArea, locks: &'a ResourceLocks) -> Self {
        Self { work_area, locks }
    }

    /// Build the newest version of `resource` from `layers`, oldest first
    ///
    /// The first layer must be a snapshot and every later one a patch. Each patch is
    /// combined onto the running tree with the previous layer's signature as the
    /// trusted predecessor; every consumed input is released inside the work area.
    /// Returns the path of the final tree, which the caller now owns.
    #[instrument(skip_all, fields(resource = %resource, layers = layers.len()))]
    pub fn build(&self, resource: &ResourceId, layers: &[Layer]) -> Result<PathBuf, CombineError> {
        let (first, rest) = layers.split_first().ok_or_else(|| {
            CombineError::InvalidState(format!("no layers to build {}", resource))
        })?;
        if first.kind != LayerKind::Snapshot {
            return Err(CombineError::InvalidState(format!(
                "layer chain for {} does not start with a snapshot",
                resource
            )));
        }
        if let Some(position) = rest.iter().position(|l| l.kind != LayerKind::Patch) {
            return Err(CombineError::InvalidState(format!(
                "layer {} of {} is a snapshot after the first layer",
                position + 1,
                resource
            )));
        }

        let _guard = self.locks.lock(resource);
        debug!("Acquired resource lock");

        let mut current = first.path.clone();
        let mut previous_signature = first.signature;
        for layer in rest {
            let request = CombineRequest::new(current, layer.path.clone(), previous_signature);
            current = ScopedCombine::from_request(request, self.work_area).run()?;
            previous_signature = layer.signature;
        }

        info!(path = %current.display(), "Built resource");
        Ok(current)
    }
}
