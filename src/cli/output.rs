//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::{ApiError, CombineError};

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::Combine(inner) if inner.is_integrity_failure() => {
            format!("Patch rejected: {}", inner)
        }
        _ => e.to_string(),
    }
}

/// Process exit code: 2 for usage and configuration problems, 3 for a patch that
/// failed validation, 1 otherwise.
pub fn exit_code(e: &ApiError) -> i32 {
    match e {
        ApiError::ConfigError(_) | ApiError::InvalidArgument(_) => 2,
        ApiError::Combine(inner) if inner.is_integrity_failure() => 3,
        ApiError::Combine(CombineError::MergeConflict(_)) => 3,
        _ => 1,
    }
}
