//! Hook Store - positional state cells per component instance.
//!
//! Each rendered component instance owns an ordered list of hook boxes
//! and a cursor that is reset every time the instance renders:
//! - First render appends a box per hook call
//! - Later renders hand back the box at the cursor
//! - The box count is frozen after the first render; any change is a
//!   hook-order error
//!
//! Instances are keyed by their fiber's position in the tree. A different
//! component showing up at the same position starts a fresh instance.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use crate::error::{FiberError, Result};

// =============================================================================
// Instance Key
// =============================================================================

/// Identity of a component instance: its positional path from the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceKey {
    path: Vec<u32>,
}

impl InstanceKey {
    pub fn new(path: Vec<u32>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &[u32] {
        &self.path
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("/")?;
        let parts: Vec<String> = self.path.iter().map(u32::to_string).collect();
        f.write_str(&parts.join("/"))
    }
}

// =============================================================================
// Instance Hooks
// =============================================================================

struct InstanceHooks {
    component: usize,
    name: String,
    boxes: Vec<Box<dyn Any>>,
    cursor: usize,
    mounted: bool,
    last_rendered: u64,
}

impl InstanceHooks {
    fn new(component: usize, name: &str) -> Self {
        Self {
            component,
            name: name.to_string(),
            boxes: Vec::new(),
            cursor: 0,
            mounted: false,
            last_rendered: 0,
        }
    }

    fn label(&self, key: &InstanceKey) -> String {
        format!("{} at {}", self.name, key)
    }
}

/// Where a hook call landed.
pub(crate) enum Slot<'a> {
    /// First render: the caller must push a new box.
    Mount(&'a mut Vec<Box<dyn Any>>),
    /// Re-render: the existing box at this position.
    Existing(&'a dyn Any, usize),
}

// =============================================================================
// Hook Store
// =============================================================================

/// All hook state of one scheduler.
#[derive(Default)]
pub struct HookStore {
    instances: HashMap<InstanceKey, InstanceHooks>,
}

impl HookStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start rendering an instance: reset its cursor.
    ///
    /// A different component at `key` replaces the old instance. An
    /// instance whose first render never finished starts over.
    pub(crate) fn begin_render(&mut self, key: &InstanceKey, component: usize, name: &str, generation: u64) {
        let hooks = self
            .instances
            .entry(key.clone())
            .or_insert_with(|| InstanceHooks::new(component, name));
        if hooks.component != component {
            *hooks = InstanceHooks::new(component, name);
        }
        if !hooks.mounted {
            hooks.boxes.clear();
        }
        hooks.cursor = 0;
        hooks.last_rendered = generation;
    }

    /// Resolve the next hook position of the rendering instance.
    pub(crate) fn next_slot(&mut self, key: &InstanceKey) -> Result<Slot<'_>> {
        let hooks = self.instances.get_mut(key).ok_or(FiberError::HookOutsideRender)?;
        let index = hooks.cursor;
        hooks.cursor += 1;

        if !hooks.mounted {
            return Ok(Slot::Mount(&mut hooks.boxes));
        }
        if index >= hooks.boxes.len() {
            return Err(FiberError::HookOrder {
                instance: hooks.label(key),
                expected: hooks.boxes.len(),
                found: index + 1,
            });
        }
        Ok(Slot::Existing(hooks.boxes[index].as_ref(), index))
    }

    /// Finish rendering an instance. Checks the hook count on re-renders.
    pub(crate) fn end_render(&mut self, key: &InstanceKey) -> Result<()> {
        let Some(hooks) = self.instances.get_mut(key) else {
            return Ok(());
        };
        if hooks.mounted && hooks.cursor != hooks.boxes.len() {
            return Err(FiberError::HookOrder {
                instance: hooks.label(key),
                expected: hooks.boxes.len(),
                found: hooks.cursor,
            });
        }
        hooks.mounted = true;
        Ok(())
    }

    /// Label for error messages.
    pub(crate) fn describe(&self, key: &InstanceKey) -> String {
        self.instances
            .get(key)
            .map(|hooks| hooks.label(key))
            .unwrap_or_else(|| key.to_string())
    }

    /// Drop instances that did not render in `generation`.
    pub fn retain_rendered(&mut self, generation: u64) -> usize {
        let before = self.instances.len();
        self.instances.retain(|_, hooks| hooks.last_rendered == generation);
        before - self.instances.len()
    }

    /// Number of hook boxes held by an instance.
    pub fn hook_count(&self, key: &InstanceKey) -> Option<usize> {
        self.instances.get(key).map(|hooks| hooks.boxes.len())
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn instances(&self) -> impl Iterator<Item = &InstanceKey> {
        self.instances.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(path: &[u32]) -> InstanceKey {
        InstanceKey::new(path.to_vec())
    }

    fn mount_boxes(store: &mut HookStore, k: &InstanceKey, count: usize) {
        store.begin_render(k, 1, "Counter", 1);
        for i in 0..count {
            match store.next_slot(k).unwrap() {
                Slot::Mount(boxes) => boxes.push(Box::new(i)),
                Slot::Existing(..) => panic!("expected mount"),
            }
        }
        store.end_render(k).unwrap();
    }

    #[test]
    fn test_rerender_returns_existing_boxes() {
        let mut store = HookStore::new();
        let k = key(&[0, 1]);
        mount_boxes(&mut store, &k, 2);
        assert_eq!(store.hook_count(&k), Some(2));

        store.begin_render(&k, 1, "Counter", 2);
        for expected in 0..2usize {
            match store.next_slot(&k).unwrap() {
                Slot::Existing(value, index) => {
                    assert_eq!(index, expected);
                    assert_eq!(value.downcast_ref::<usize>(), Some(&expected));
                }
                Slot::Mount(_) => panic!("expected existing"),
            }
        }
        store.end_render(&k).unwrap();
    }

    #[test]
    fn test_extra_hook_is_order_error() {
        let mut store = HookStore::new();
        let k = key(&[0]);
        mount_boxes(&mut store, &k, 1);

        store.begin_render(&k, 1, "Counter", 2);
        assert!(store.next_slot(&k).is_ok());
        let err = store.next_slot(&k).err().unwrap();
        assert!(matches!(err, FiberError::HookOrder { expected: 1, found: 2, .. }));
    }

    #[test]
    fn test_missing_hook_is_order_error() {
        let mut store = HookStore::new();
        let k = key(&[0]);
        mount_boxes(&mut store, &k, 2);

        store.begin_render(&k, 1, "Counter", 2);
        assert!(store.next_slot(&k).is_ok());
        let err = store.end_render(&k).unwrap_err();
        assert!(matches!(err, FiberError::HookOrder { expected: 2, found: 1, .. }));
    }

    #[test]
    fn test_component_swap_resets_instance() {
        let mut store = HookStore::new();
        let k = key(&[0]);
        mount_boxes(&mut store, &k, 2);

        store.begin_render(&k, 99, "Other", 2);
        assert!(matches!(store.next_slot(&k).unwrap(), Slot::Mount(_)));
    }

    #[test]
    fn test_retain_rendered() {
        let mut store = HookStore::new();
        mount_boxes(&mut store, &key(&[0]), 1);
        store.begin_render(&key(&[1]), 1, "Counter", 2);
        store.end_render(&key(&[1])).unwrap();

        assert_eq!(store.retain_rendered(2), 1);
        assert_eq!(store.instance_count(), 1);
        assert_eq!(store.hook_count(&key(&[0])), None);
    }

    #[test]
    fn test_instance_key_display() {
        assert_eq!(key(&[0, 2, 1]).to_string(), "/0/2/1");
    }
}
