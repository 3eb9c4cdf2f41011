//! Resources and per-resource serialization
//!
//! Combines of the same resource must not run concurrently: two of them could race to
//! produce conflicting trees or release directories the other still reads. The combiner
//! does not guard against this; callers take the resource's lock first.

pub mod builder;

pub use builder::{Layer, LayerChainBuilder, LayerKind};

use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Identity of a versioned off-chain resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    /// Registered name that owns the resource
    pub name: String,
    /// Service type, e.g. `WEBSITE`
    pub service: String,
    pub identifier: Option<String>,
}

impl ResourceId {
    pub fn new(name: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            service: service.into(),
            identifier: None,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.identifier {
            Some(id) => write!(f, "{}/{}/{}", self.service, self.name, id),
            None => write!(f, "{}/{}", self.service, self.name),
        }
    }
}

/// Held while a resource is being rebuilt; dropping it lets the next caller in
pub type ResourceGuard = ArcMutexGuard<RawMutex, ()>;

/// One lock per resource, created on first use
///
/// Shared by reference between worker threads. Locks for different resources never
/// contend with each other.
#[derive(Default)]
pub struct ResourceLocks {
    locks: Mutex<HashMap<ResourceId, Arc<Mutex<()>>>>,
}

impl ResourceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until `resource` is free and return its guard
    pub fn lock(&self, resource: &ResourceId) -> ResourceGuard {
        self.entry(resource).lock_arc()
    }

    /// Take the guard only if nobody holds it
    pub fn try_lock(&self, resource: &ResourceId) -> Option<ResourceGuard> {
        self.entry(resource).try_lock_arc()
    }

    /// Drop lock entries nobody is holding or waiting on
    pub fn prune(&self) {
        self.locks.lock().retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, resource: &ResourceId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(
            locks
                .entry(resource.clone())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }
}
