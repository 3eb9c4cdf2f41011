//! Guaranteed release of combine inputs

use crate::combine::{CombineRequest, Combiner};
use crate::error::CombineError;
use crate::sandbox::WorkArea;
use std::path::PathBuf;

/// Owns a [`Combiner`] and releases its inputs when the scope ends
///
/// Release happens exactly once on every exit path: after `run` returns, on early
/// return, or while unwinding. The inputs live as long as the owner does, so a caller
/// that stops waiting on a worker running this combine cannot cause them to be deleted
/// before the merge has actually finished reading them.
pub struct ScopedCombine<'a> {
    combiner: Combiner<'a>,
}

impl<'a> ScopedCombine<'a> {
    pub fn new(combiner: Combiner<'a>) -> Self {
        Self { combiner }
    }

    pub fn from_request(request: CombineRequest, work_area: &'a WorkArea) -> Self {
        Self::new(Combiner::new(request, work_area))
    }

    /// Combine, release both inputs, and hand the merged tree to the caller
    pub fn run(mut self) -> Result<PathBuf, CombineError> {
        let result = self.combiner.combine().map(|p| p.to_path_buf());
        self.combiner.cleanup();
        result
    }
}

impl Drop for ScopedCombine<'_> {
    fn drop(&mut self) {
        self.combiner.cleanup();
    }
}
