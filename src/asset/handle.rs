use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, TryLockError};

/// Where a handle's backing resource currently stands.
pub enum ResourceState<T> {
    /// Nothing requested yet, or the last load failed. Readers use the placeholder.
    Placeholder,
    /// A load is in flight. Readers still use the placeholder.
    Pending,
    Ready(Arc<T>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleStatus {
    Placeholder,
    Pending,
    Ready,
}

impl<T> ResourceState<T> {
    fn status(&self) -> HandleStatus {
        match self {
            Self::Placeholder => HandleStatus::Placeholder,
            Self::Pending => HandleStatus::Pending,
            Self::Ready(_) => HandleStatus::Ready,
        }
    }
}

struct Slot<T> {
    name: String,
    state: RwLock<ResourceState<T>>,
}

/// Shared, named reference to a resource that may not exist yet.
///
/// Clones share one slot, so a handle handed out before a load finishes sees the
/// published resource afterwards. Publishing happens on the main thread; reads
/// never block.
pub struct ResourceHandle<T> {
    slot: Arc<Slot<T>>,
}

impl<T> Clone for ResourceHandle<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> fmt::Debug for ResourceHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("name", &self.slot.name)
            .field("status", &self.status())
            .finish()
    }
}

impl<T> ResourceHandle<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_state(name, ResourceState::Placeholder)
    }

    pub fn ready(name: impl Into<String>, resource: T) -> Self {
        Self::with_state(name, ResourceState::Ready(Arc::new(resource)))
    }

    fn with_state(name: impl Into<String>, state: ResourceState<T>) -> Self {
        Self {
            slot: Arc::new(Slot {
                name: name.into(),
                state: RwLock::new(state),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.slot.name
    }

    /// The published resource, or `None` while the placeholder applies.
    /// Returns `None` instead of waiting if a publish is in progress.
    pub fn try_get(&self) -> Option<Arc<T>> {
        match self.slot.state.try_read() {
            Ok(state) => Self::ready_of(&state),
            Err(TryLockError::Poisoned(poisoned)) => Self::ready_of(&poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    fn ready_of(state: &ResourceState<T>) -> Option<Arc<T>> {
        match state {
            ResourceState::Ready(resource) => Some(Arc::clone(resource)),
            _ => None,
        }
    }

    pub fn status(&self) -> HandleStatus {
        match self.slot.state.try_read() {
            Ok(state) => state.status(),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().status(),
            // A writer is mid-publish; it has not become visible yet.
            Err(TryLockError::WouldBlock) => HandleStatus::Pending,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status() == HandleStatus::Ready
    }

    /// Move `Placeholder -> Pending`. Returns false when a load is already in
    /// flight or the resource is ready, so callers schedule at most one load.
    pub fn mark_pending(&self) -> bool {
        let mut state = self.write();
        if matches!(*state, ResourceState::Placeholder) {
            *state = ResourceState::Pending;
            true
        } else {
            false
        }
    }

    /// Make `resource` visible to every clone of this handle.
    pub fn publish(&self, resource: T) -> Arc<T> {
        let resource = Arc::new(resource);
        let previous = std::mem::replace(&mut *self.write(), ResourceState::Ready(Arc::clone(&resource)));
        if matches!(previous, ResourceState::Ready(_)) {
            log::debug!("Republished resource '{}'", self.slot.name);
        }
        resource
    }

    /// Back to the placeholder after a failed load. A ready resource is kept.
    pub fn revert_to_placeholder(&self) {
        let mut state = self.write();
        if matches!(*state, ResourceState::Pending) {
            *state = ResourceState::Placeholder;
        }
    }

    /// Remove and return the published resource, leaving the placeholder.
    pub fn take(&self) -> Option<Arc<T>> {
        match std::mem::replace(&mut *self.write(), ResourceState::Placeholder) {
            ResourceState::Ready(resource) => Some(resource),
            _ => None,
        }
    }

    /// Whether both handles share one slot.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, ResourceState<T>> {
        self.slot
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_handle_is_placeholder() {
        let handle: ResourceHandle<u32> = ResourceHandle::new("tex");
        assert_eq!(handle.status(), HandleStatus::Placeholder);
        assert!(handle.try_get().is_none());
    }

    #[test]
    fn publish_is_visible_through_clones() {
        let handle = ResourceHandle::new("tex");
        let clone = handle.clone();
        assert!(handle.mark_pending());
        assert!(clone.try_get().is_none());

        handle.publish(7u32);
        assert_eq!(clone.try_get().as_deref(), Some(&7));
        assert!(clone.ptr_eq(&handle));
    }

    #[test]
    fn only_one_pending_transition() {
        let handle: ResourceHandle<u32> = ResourceHandle::new("tex");
        assert!(handle.mark_pending());
        assert!(!handle.mark_pending());
        handle.revert_to_placeholder();
        assert_eq!(handle.status(), HandleStatus::Placeholder);
        assert!(handle.mark_pending());
    }

    #[test]
    fn revert_keeps_ready_resource() {
        let handle = ResourceHandle::ready("tex", 1u32);
        handle.revert_to_placeholder();
        assert!(handle.is_ready());
        assert_eq!(handle.take().as_deref(), Some(&1));
        assert_eq!(handle.status(), HandleStatus::Placeholder);
    }

    #[test]
    fn handle_can_cross_threads() {
        let handle = ResourceHandle::new("tex");
        let reader = handle.clone();
        handle.publish(String::from("ready"));
        let seen = std::thread::spawn(move || reader.try_get().map(|s| s.len()))
            .join()
            .unwrap();
        assert_eq!(seen, Some(5));
    }
}
