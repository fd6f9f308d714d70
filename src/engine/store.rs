//! Object store collaborator.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;

use crate::protocol::{Error, InstanceLayout, MAX_PAYLOAD_LENGTH, Result};

/// Live object data the engine reads snapshots from and writes updates to.
///
/// Implementations must not call back into the engine: every method is
/// invoked while the engine holds its state lock.
pub trait ObjectStore: Send + Sync {
    /// Packed snapshot of one object instance.
    fn get(&self, object_id: u32, instance_id: u16) -> Result<Bytes>;

    /// Replace one object instance with a packed snapshot.
    fn set(&self, object_id: u32, instance_id: u16, data: &[u8]) -> Result<()>;

    /// Whether frames for `object_id` carry an instance id.
    fn is_multi_instance(&self, object_id: u32) -> bool;

    /// Concrete instance ids currently known for `object_id`.
    fn list_instances(&self, object_id: u32) -> Result<Vec<u16>>;
}

/// Instance layout backed by an object store.
pub(crate) struct StoreLayout<'a>(pub(crate) &'a dyn ObjectStore);

impl InstanceLayout for StoreLayout<'_> {
    fn is_multi_instance(&self, object_id: u32) -> bool {
        self.0.is_multi_instance(object_id)
    }
}

#[derive(Debug)]
struct ObjectEntry {
    size: usize,
    multi_instance: bool,
    instances: BTreeMap<u16, Bytes>,
}

/// Thread-safe in-memory object store.
///
/// Objects are registered with a fixed packed size. Writing an unseen
/// instance of a multi-instance object creates it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<u32, ObjectEntry>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an object type with a zeroed instance 0.
    pub fn register(&self, object_id: u32, size: usize, multi_instance: bool) -> Result<()> {
        if size > MAX_PAYLOAD_LENGTH {
            return Err(Error::PayloadTooLarge {
                size,
                max: MAX_PAYLOAD_LENGTH,
            });
        }
        let mut instances = BTreeMap::new();
        instances.insert(0, Bytes::from(vec![0u8; size]));
        self.lock().insert(
            object_id,
            ObjectEntry {
                size,
                multi_instance,
                instances,
            },
        );
        Ok(())
    }

    /// Drop an instance of a multi-instance object.
    pub fn remove_instance(&self, object_id: u32, instance_id: u16) -> Result<()> {
        let mut objects = self.lock();
        let entry = objects
            .get_mut(&object_id)
            .ok_or(Error::UnknownObject { object_id })?;
        entry
            .instances
            .remove(&instance_id)
            .map(|_| ())
            .ok_or(Error::UnknownInstance {
                object_id,
                instance_id,
            })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u32, ObjectEntry>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ObjectStore for MemoryStore {
    fn get(&self, object_id: u32, instance_id: u16) -> Result<Bytes> {
        let objects = self.lock();
        let entry = objects
            .get(&object_id)
            .ok_or(Error::UnknownObject { object_id })?;
        entry
            .instances
            .get(&instance_id)
            .cloned()
            .ok_or(Error::UnknownInstance {
                object_id,
                instance_id,
            })
    }

    fn set(&self, object_id: u32, instance_id: u16, data: &[u8]) -> Result<()> {
        let mut objects = self.lock();
        let entry = objects
            .get_mut(&object_id)
            .ok_or(Error::UnknownObject { object_id })?;
        if data.len() != entry.size {
            return Err(Error::SizeMismatch {
                object_id,
                expected: entry.size,
                found: data.len(),
            });
        }
        if !entry.multi_instance && instance_id != 0 {
            return Err(Error::UnknownInstance {
                object_id,
                instance_id,
            });
        }
        entry
            .instances
            .insert(instance_id, Bytes::copy_from_slice(data));
        Ok(())
    }

    fn is_multi_instance(&self, object_id: u32) -> bool {
        self.lock()
            .get(&object_id)
            .is_some_and(|entry| entry.multi_instance)
    }

    fn list_instances(&self, object_id: u32) -> Result<Vec<u16>> {
        let objects = self.lock();
        let entry = objects
            .get(&object_id)
            .ok_or(Error::UnknownObject { object_id })?;
        Ok(entry.instances.keys().copied().collect())
    }
}
