//! In-flight pack bookkeeping
//!
//! A session usually juggles several packs at once. [`PackRegistry`] keys
//! packs by id behind a mutex so the session driver can route declaration
//! and fragment packets without owning each pack directly. Each pack still
//! owns its buffer and bitmap exclusively; the registry only serializes map
//! access.

use crate::error::{PackError, Result};
use crate::pack::Pack;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Thread-safe map of in-flight packs keyed by pack id.
#[derive(Debug, Default, Clone)]
pub struct PackRegistry {
    packs: Arc<Mutex<HashMap<Uuid, Pack>>>,
}

impl PackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a pack; replaces any previous pack with the same id.
    pub fn register(&self, pack: Pack) {
        let id = *pack.id();
        if self.packs.lock().insert(id, pack).is_some() {
            warn!("Replaced an in-flight pack with id {}", id);
        }
    }

    /// Declare the total size for a tracked pack.
    pub fn declare_size(&self, id: &Uuid, length: u32, max_fragment_size: u32) -> Result<()> {
        let mut packs = self.packs.lock();
        let pack = packs.get_mut(id).ok_or(PackError::UnknownPack(*id))?;
        pack.declare_size(length, max_fragment_size)
    }

    /// Route a fragment to its pack.
    ///
    /// A fatal pipeline error discards the pack (it is removed from the
    /// registry) and the error is returned to the caller.
    pub fn submit_fragment(&self, id: &Uuid, index: u32, data: &[u8]) -> Result<bool> {
        let mut packs = self.packs.lock();
        let pack = packs.get_mut(id).ok_or(PackError::UnknownPack(*id))?;
        match pack.submit_fragment(index, data) {
            Ok(done) => Ok(done),
            Err(err) => {
                warn!("Pack {} discarded after pipeline failure: {}", id, err);
                packs.remove(id);
                Err(err)
            }
        }
    }

    /// Remove and return a pack, typically once its contents are complete.
    pub fn take(&self, id: &Uuid) -> Option<Pack> {
        self.packs.lock().remove(id)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.packs.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.packs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.packs.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_pack_is_an_error() {
        let registry = PackRegistry::new();
        let id = Uuid::new_v4();
        assert!(matches!(
            registry.declare_size(&id, 10, 5),
            Err(PackError::UnknownPack(_))
        ));
        assert!(matches!(
            registry.submit_fragment(&id, 0, b"x"),
            Err(PackError::UnknownPack(_))
        ));
    }

    #[test]
    fn test_register_take_lifecycle() {
        let registry = PackRegistry::new();
        let id = Uuid::new_v4();
        registry.register(Pack::new(id, "1.0.0", ""));
        assert!(registry.contains(&id));
        assert_eq!(registry.len(), 1);
        assert!(registry.take(&id).is_some());
        assert!(registry.is_empty());
    }
}
