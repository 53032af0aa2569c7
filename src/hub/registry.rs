use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::store::MessageStore;

use super::{ConnectionId, Member, RoomHub};

#[derive(Debug, Clone, Copy)]
pub struct HubConfig {
    /// Bound of each member's outbound queue.
    pub outbound_capacity: usize,
    /// Drop a hub from the registry once its last member leaves.
    pub evict_empty: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            outbound_capacity: 256,
            evict_empty: true,
        }
    }
}

/// Process-wide map from room id to its [`RoomHub`].
///
/// Lock order is registry first, then hub. Connections go through
/// [`HubRegistry::join`] and [`HubRegistry::leave`] so that eviction of an
/// empty hub can never strand a member that is joining at the same time.
pub struct HubRegistry {
    store: Arc<dyn MessageStore>,
    config: HubConfig,
    hubs: Mutex<HashMap<String, Arc<RoomHub>>>,
}

impl HubRegistry {
    pub fn new(store: Arc<dyn MessageStore>, config: HubConfig) -> Self {
        Self {
            store,
            config,
            hubs: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<RoomHub>>> {
        self.hubs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve_locked(&self, hubs: &mut HashMap<String, Arc<RoomHub>>, room_id: &str) -> Arc<RoomHub> {
        if let Some(hub) = hubs.get(room_id) {
            return hub.clone();
        }

        let hub = Arc::new(RoomHub::new(
            room_id,
            self.store.clone(),
            self.config.outbound_capacity,
        ));
        hubs.insert(room_id.to_owned(), hub.clone());
        tracing::info!(room_id, hubs = hubs.len(), "hub created");
        hub
    }

    /// Returns the hub for `room_id`, creating it if there is none. Every
    /// concurrent caller for the same id gets the same instance.
    pub fn resolve(&self, room_id: &str) -> Arc<RoomHub> {
        let mut hubs = self.lock();
        self.resolve_locked(&mut hubs, room_id)
    }

    pub fn get(&self, room_id: &str) -> Option<Arc<RoomHub>> {
        self.lock().get(room_id).cloned()
    }

    /// Resolves the hub and registers a new member in one step.
    pub fn join(&self, room_id: &str, user: &str) -> (Arc<RoomHub>, Member) {
        let mut hubs = self.lock();
        let hub = self.resolve_locked(&mut hubs, room_id);
        let member = hub.join(user);
        (hub, member)
    }

    /// Removes the member from `hub` and, when eviction is on, forgets the
    /// hub if that left it empty. Safe to call more than once.
    pub fn leave(&self, hub: &Arc<RoomHub>, id: ConnectionId) -> bool {
        let mut hubs = self.lock();
        let left = hub.leave(id);

        if self.config.evict_empty && hub.is_empty() {
            let current = hubs
                .get(hub.room_id())
                .is_some_and(|current| Arc::ptr_eq(current, hub));
            if current {
                hubs.remove(hub.room_id());
                tracing::info!(room_id = hub.room_id(), hubs = hubs.len(), "hub evicted");
            }
        }

        left
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn room_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl std::fmt::Debug for HubRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("HubRegistry")
            .field("config", &self.config)
            .field("hubs", &self.len())
            .finish()
    }
}
