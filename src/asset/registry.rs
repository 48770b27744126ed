use std::collections::HashMap;
use std::sync::Arc;

use super::ResourceHandle;

/// Name-keyed handles plus the placeholder every unresolved handle falls back to.
pub struct ResourceRegistry<T> {
    handles: HashMap<String, ResourceHandle<T>>,
    placeholder: Arc<T>,
}

impl<T> ResourceRegistry<T> {
    pub fn new(placeholder: T) -> Self {
        Self {
            handles: HashMap::new(),
            placeholder: Arc::new(placeholder),
        }
    }

    pub fn placeholder(&self) -> &Arc<T> {
        &self.placeholder
    }

    pub fn get(&self, name: &str) -> Option<&ResourceHandle<T>> {
        self.handles.get(name)
    }

    /// Returns the handle registered under `name`, creating a placeholder one
    /// if needed. Repeated calls share the same slot.
    pub fn get_or_create(&mut self, name: &str) -> ResourceHandle<T> {
        self.handles
            .entry(name.to_string())
            .or_insert_with(|| ResourceHandle::new(name))
            .clone()
    }

    pub fn insert_ready(&mut self, name: &str, resource: T) -> ResourceHandle<T> {
        let handle = self.get_or_create(name);
        handle.publish(resource);
        handle
    }

    /// The resource to draw with right now: the loaded one if it is ready,
    /// the placeholder otherwise.
    pub fn resolve(&self, handle: Option<&ResourceHandle<T>>) -> Arc<T> {
        handle
            .and_then(ResourceHandle::try_get)
            .unwrap_or_else(|| self.placeholder.clone())
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResourceHandle<T>)> {
        self.handles.iter().map(|(name, handle)| (name.as_str(), handle))
    }

    /// Empty every handle and return the loaded resources so the caller can
    /// release them. Handles still held elsewhere read as placeholders afterwards.
    pub fn drain_loaded(&mut self) -> Vec<Arc<T>> {
        self.handles
            .drain()
            .filter_map(|(_, handle)| handle.take())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::HandleStatus;

    #[test]
    fn get_or_create_shares_one_slot() {
        let mut registry = ResourceRegistry::new(0u32);
        let a = registry.get_or_create("grass");
        let b = registry.get_or_create("grass");
        assert!(a.ptr_eq(&b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn resolve_falls_back_to_placeholder() {
        let mut registry = ResourceRegistry::new(7u32);
        let handle = registry.get_or_create("stone");
        assert_eq!(*registry.resolve(Some(&handle)), 7);
        assert_eq!(*registry.resolve(None), 7);

        handle.publish(42);
        assert_eq!(*registry.resolve(Some(&handle)), 42);
    }

    #[test]
    fn drain_loaded_returns_only_ready_resources() {
        let mut registry = ResourceRegistry::new(0u32);
        let ready = registry.insert_ready("a", 1);
        registry.get_or_create("b");

        let drained = registry.drain_loaded();
        assert_eq!(drained.len(), 1);
        assert!(registry.is_empty());
        assert_eq!(ready.status(), HandleStatus::Placeholder);
    }
}
