use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::{Mutex, MutexGuard};

use crate::state::{room::RoomState, room_id::RoomId};

/// Registry entry owning one room's authoritative state.
pub struct Room {
    id: RoomId,
    state: Mutex<RoomState>,
    evicted: AtomicBool,
}

/// Shared handle to a registered room.
pub type RoomHandle = Arc<Room>;

impl Room {
    fn new(id: RoomId) -> Self {
        Self {
            state: Mutex::new(RoomState::new(id.clone())),
            id,
            evicted: AtomicBool::new(false),
        }
    }

    /// Identifier of the room.
    pub fn id(&self) -> &RoomId {
        &self.id
    }

    /// Lock the room for a transition; transitions on one room never interleave.
    pub async fn lock(&self) -> MutexGuard<'_, RoomState> {
        self.state.lock().await
    }

    /// Whether the room was removed from the registry.
    ///
    /// Only meaningful while holding [`Room::lock`]: eviction flips the flag under the
    /// same lock, so a caller that sees `false` can safely apply a transition.
    pub fn is_evicted(&self) -> bool {
        self.evicted.load(Ordering::Acquire)
    }
}

/// Process-wide keyed store of active rooms.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<RoomId, RoomHandle>,
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a room.
    pub fn get(&self, id: &RoomId) -> Option<RoomHandle> {
        self.rooms.get(id).map(|entry| entry.value().clone())
    }

    /// Look up a room, creating it on first reference.
    ///
    /// Concurrent calls for the same unseen id all receive the same instance.
    pub fn get_or_create(&self, id: RoomId) -> RoomHandle {
        self.rooms
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Room::new(id)))
            .value()
            .clone()
    }

    /// Register a new room, returning `None` when the id is already taken.
    pub fn create(&self, id: RoomId) -> Option<RoomHandle> {
        match self.rooms.entry(id.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => Some(slot.insert(Arc::new(Room::new(id))).value().clone()),
        }
    }

    /// Remove a room unconditionally.
    ///
    /// `on_delete` runs before the id can be registered again, as in [`Self::evict_idle`].
    pub async fn delete(
        &self,
        id: &RoomId,
        on_delete: impl FnOnce(&RoomId),
    ) -> Option<RoomHandle> {
        let room = match self.rooms.entry(id.clone()) {
            Entry::Occupied(entry) => {
                on_delete(id);
                entry.remove()
            }
            Entry::Vacant(_) => return None,
        };
        let _guard = room.lock().await;
        room.evicted.store(true, Ordering::Release);
        Some(room.clone())
    }

    /// Number of registered rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Whether no room is registered.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Remove every room that has been empty for at least `grace`, returning their ids.
    ///
    /// `on_evict` runs for each removed room before the id can be registered again.
    /// Rooms busy with a transition are skipped until the next sweep.
    pub fn evict_idle(
        &self,
        grace: Duration,
        now: Instant,
        mut on_evict: impl FnMut(&RoomId),
    ) -> Vec<RoomId> {
        let mut evicted = Vec::new();
        self.rooms.retain(|id, room| {
            let Ok(state) = room.state.try_lock() else {
                return true;
            };
            if !state.idle_for(grace, now) {
                return true;
            }
            room.evicted.store(true, Ordering::Release);
            on_evict(id);
            evicted.push(id.clone());
            false
        });
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{room::RoomEvent, room_id::RoomIdScheme};

    fn code(raw: &str) -> RoomId {
        RoomId::parse(RoomIdScheme::ShortCode, raw).unwrap()
    }

    #[tokio::test]
    async fn get_or_create_returns_a_single_instance() {
        let registry = Arc::new(RoomRegistry::new());
        let mut tasks = Vec::new();
        for _ in 0..16 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                registry.get_or_create(code("ABCDEF"))
            }));
        }

        let mut handles = Vec::new();
        for task in tasks {
            handles.push(task.await.unwrap());
        }
        assert_eq!(registry.len(), 1);
        assert!(handles.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    }

    #[tokio::test]
    async fn lookup_is_case_insensitive_for_short_codes() {
        let registry = RoomRegistry::new();
        let created = registry.create(code("XYZ234")).unwrap();
        let found = registry.get(&code("xyz234")).unwrap();
        assert!(Arc::ptr_eq(&created, &found));
    }

    #[tokio::test]
    async fn create_refuses_taken_ids() {
        let registry = RoomRegistry::new();
        assert!(registry.create(code("ABCDEF")).is_some());
        assert!(registry.create(code("ABCDEF")).is_none());
    }

    #[tokio::test]
    async fn delete_marks_room_evicted() {
        let registry = RoomRegistry::new();
        let room = registry.create(code("ABCDEF")).unwrap();
        let mut deleted = None;
        registry
            .delete(room.id(), |id| deleted = Some(id.clone()))
            .await
            .unwrap();

        assert_eq!(deleted, Some(code("ABCDEF")));
        assert!(registry.get(&code("ABCDEF")).is_none());
        assert!(room.is_evicted());
        assert!(registry.delete(&code("ABCDEF"), |_| unreachable!()).await.is_none());
    }

    #[tokio::test]
    async fn eviction_respects_grace_and_membership() {
        let registry = RoomRegistry::new();
        let grace = Duration::from_secs(300);

        let populated = registry.create(code("AAAAAA")).unwrap();
        populated.lock().await.apply(RoomEvent::Join {
            participant_id: "p1".into(),
            name: "Ada".into(),
        });
        registry.create(code("BBBBBB")).unwrap();

        assert!(registry.evict_idle(grace, Instant::now(), |_| {}).is_empty());
        assert_eq!(registry.len(), 2);

        let mut closed = Vec::new();
        let evicted = registry.evict_idle(grace, Instant::now() + grace, |id| {
            closed.push(id.clone())
        });
        assert_eq!(evicted, [code("BBBBBB")]);
        assert_eq!(closed, evicted);
        assert!(registry.get(&code("AAAAAA")).is_some());
        assert!(!populated.is_evicted());
    }

    #[tokio::test]
    async fn busy_rooms_are_skipped() {
        let registry = RoomRegistry::new();
        let room = registry.create(code("CCCCCC")).unwrap();
        let guard = room.lock().await;

        assert!(registry.evict_idle(Duration::ZERO, Instant::now(), |_| {}).is_empty());
        drop(guard);
        assert_eq!(
            registry.evict_idle(Duration::ZERO, Instant::now(), |_| {}),
            [code("CCCCCC")]
        );
    }
}
