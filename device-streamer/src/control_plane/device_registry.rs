//! Registry of live devices.

use crate::device::device_object::Device;
use crate::device::lifecycle::LifecycleState;
use crate::device::packet::DeviceId;
use crate::error::DeviceError;
use crate::observability::events;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const COMPONENT: &str = "device_registry";

pub(crate) type DeviceRegistryContainer = Mutex<BTreeMap<DeviceId, Arc<Device>>>;

/// The authoritative set of live devices behind one lock.
///
/// Insert and remove are the only structural mutations. Every operation takes the
/// lock for its own duration only; `snapshot` copies handles out so callers never
/// iterate under the lock.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: DeviceRegistryContainer,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a device that is still `Starting`.
    pub async fn insert(&self, device: Arc<Device>) -> Result<(), DeviceError> {
        let id = device.id();
        let state = device.state();
        if state != LifecycleState::Starting {
            return Err(DeviceError::InvalidTransition {
                device: id,
                from: state,
                to: LifecycleState::Running,
            });
        }

        let mut devices = self.devices.lock().await;
        if devices.contains_key(&id) {
            return Err(DeviceError::DuplicateDevice(id));
        }
        devices.insert(id, device);
        debug!(
            event = events::REGISTRY_INSERT,
            component = COMPONENT,
            device_id = %id,
            live = devices.len(),
            "device registered"
        );
        Ok(())
    }

    /// Removes `id` and hands back its handle. Unknown ids are a no-op returning `None`.
    pub async fn remove(&self, id: DeviceId) -> Option<Arc<Device>> {
        let mut devices = self.devices.lock().await;
        let removed = devices.remove(&id);
        match &removed {
            Some(_) => debug!(
                event = events::REGISTRY_REMOVE,
                component = COMPONENT,
                device_id = %id,
                live = devices.len(),
                "device deregistered"
            ),
            None => warn!(
                event = events::REGISTRY_REMOVE_MISSING,
                component = COMPONENT,
                device_id = %id,
                "no such device to remove"
            ),
        }
        removed
    }

    pub async fn find(&self, id: DeviceId) -> Option<Arc<Device>> {
        self.devices.lock().await.get(&id).cloned()
    }

    pub async fn contains(&self, id: DeviceId) -> bool {
        self.devices.lock().await.contains_key(&id)
    }

    /// Handles of every live device, ordered by id.
    pub async fn snapshot(&self) -> Vec<Arc<Device>> {
        self.devices.lock().await.values().cloned().collect()
    }

    /// Ids of every live device, ordered.
    pub async fn ids(&self) -> Vec<DeviceId> {
        self.devices.lock().await.keys().copied().collect()
    }

    pub async fn len(&self) -> usize {
        self.devices.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.devices.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::DeviceRegistry;
    use crate::device::device_object::Device;
    use crate::device::lifecycle::LifecycleState;
    use crate::device::packet::DeviceId;
    use crate::error::DeviceError;
    use std::sync::Arc;

    fn device(id: u64) -> Arc<Device> {
        let (device, _inbox) = Device::new(DeviceId(id), 4);
        Arc::new(device)
    }

    #[tokio::test]
    async fn insert_find_and_snapshot_in_id_order() {
        let registry = DeviceRegistry::new();
        for id in [3, 1, 2] {
            registry.insert(device(id)).await.expect("insert");
        }

        assert_eq!(
            registry.ids().await,
            vec![DeviceId(1), DeviceId(2), DeviceId(3)]
        );
        assert_eq!(registry.snapshot().await.len(), 3);
        assert_eq!(
            registry.find(DeviceId(2)).await.map(|d| d.id()),
            Some(DeviceId(2))
        );
        assert!(registry.find(DeviceId(9)).await.is_none());
    }

    #[tokio::test]
    async fn duplicate_insert_keeps_the_original() {
        let registry = DeviceRegistry::new();
        let original = device(1);
        registry.insert(original.clone()).await.expect("first insert");

        let err = registry
            .insert(device(1))
            .await
            .expect_err("duplicate must fail");
        assert!(matches!(err, DeviceError::DuplicateDevice(DeviceId(1))));

        let found = registry.find(DeviceId(1)).await.expect("still registered");
        assert!(Arc::ptr_eq(&found, &original));
    }

    #[tokio::test]
    async fn double_remove_is_a_noop_and_leaves_others_intact() {
        let registry = DeviceRegistry::new();
        registry.insert(device(1)).await.expect("insert 1");
        registry.insert(device(2)).await.expect("insert 2");

        assert!(registry.remove(DeviceId(1)).await.is_some());
        assert!(registry.remove(DeviceId(1)).await.is_none());
        assert!(registry.remove(DeviceId(42)).await.is_none());

        assert_eq!(registry.ids().await, vec![DeviceId(2)]);
    }

    #[tokio::test]
    async fn refuses_device_past_starting() {
        let registry = DeviceRegistry::new();
        let running = device(5);
        running
            .transition(LifecycleState::Starting, LifecycleState::Running)
            .expect("start");

        let err = registry
            .insert(running)
            .await
            .expect_err("running device must be refused");
        assert!(matches!(err, DeviceError::InvalidTransition { .. }));
        assert!(registry.is_empty().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_inserts_and_removes_keep_the_set_consistent() {
        let registry = Arc::new(DeviceRegistry::new());

        let tasks: Vec<_> = (0..64u64)
            .map(|id| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    registry.insert(device(id)).await.expect("insert");
                    if id % 2 == 0 {
                        assert!(registry.remove(DeviceId(id)).await.is_some());
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.expect("task");
        }

        let expected: Vec<DeviceId> = (0..64u64).filter(|id| id % 2 == 1).map(DeviceId).collect();
        assert_eq!(registry.ids().await, expected);
        assert_eq!(registry.len().await, 32);
    }
}
