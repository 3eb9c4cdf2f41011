//! Config composition: defaults, source precedence, deserialization.

pub(crate) mod merge_policy;
pub(crate) mod service;
