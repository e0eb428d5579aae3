//! Context propagation without prop drilling.
//!
//! A [`Context`] is only a typed handle: an id plus a default value. The values
//! themselves live in a [`ContextStore`] owned by each root, so independent
//! roots never observe each other's providers.

use alloc::{collections::BTreeSet, rc::Rc, vec::Vec};
use core::{
    any::{Any, type_name},
    fmt,
    marker::PhantomData,
    sync::atomic::{AtomicU64, Ordering},
};
use std::collections::HashMap;

use crate::runtime::InstanceId;

static NEXT_CONTEXT: AtomicU64 = AtomicU64::new(1);

/// Process-wide identity of a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

/// Typed handle to a context value.
pub struct Context<T> {
    id: ContextId,
    default: Rc<T>,
    _marker: PhantomData<T>,
}

impl<T> Clone for Context<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            default: self.default.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Context<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl<T: 'static> Context<T> {
    /// Returns the identity of this context.
    #[must_use]
    pub const fn id(&self) -> ContextId {
        self.id
    }

    /// Returns the value seen by consumers outside any provider.
    #[must_use]
    pub fn default_value(&self) -> &T {
        &self.default
    }
}

/// Creates a new context with a default value.
pub fn create_context<T: 'static>(default: T) -> Context<T> {
    Context {
        id: ContextId(NEXT_CONTEXT.fetch_add(1, Ordering::Relaxed)),
        default: Rc::new(default),
        _marker: PhantomData,
    }
}

type Value = Rc<dyn Any>;

#[derive(Default)]
struct ContextEntry {
    root: Option<Value>,
    stack: Vec<Value>,
    subscribers: BTreeSet<InstanceId>,
}

/// Per-root registry of context values and subscribers.
#[derive(Default)]
pub(crate) struct ContextStore {
    entries: HashMap<ContextId, ContextEntry>,
    provided: HashMap<(InstanceId, ContextId), Value>,
}

impl fmt::Debug for ContextStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextStore")
            .field("contexts", &self.entries.len())
            .field("providers", &self.provided.len())
            .finish()
    }
}

impl ContextStore {
    /// Returns the value a consumer would read right now.
    pub fn current<T: Clone + 'static>(&self, context: &Context<T>) -> T {
        self.entries
            .get(&context.id)
            .and_then(|entry| entry.stack.last().or(entry.root.as_ref()))
            .and_then(|value| value.downcast_ref::<T>())
            .map_or_else(|| context.default_value().clone(), Clone::clone)
    }

    /// Records `instance` as a subscriber of `id`.
    pub fn subscribe(&mut self, id: ContextId, instance: InstanceId) {
        self.entries.entry(id).or_default().subscribers.insert(instance);
    }

    /// Removes `instance` from the subscriber sets of `contexts`.
    pub fn unsubscribe(&mut self, instance: InstanceId, contexts: &[ContextId]) {
        for id in contexts {
            if let Some(entry) = self.entries.get_mut(id) {
                entry.subscribers.remove(&instance);
            }
        }
    }

    /// Drops every trace of an unmounted instance.
    pub fn prune(&mut self, instance: InstanceId) {
        for entry in self.entries.values_mut() {
            entry.subscribers.remove(&instance);
        }
        self.provided.retain(|(provider, _), _| *provider != instance);
    }

    /// Returns the current subscribers of `id`.
    pub fn subscribers(&self, id: ContextId) -> Vec<InstanceId> {
        self.entries
            .get(&id)
            .map(|entry| entry.subscribers.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Records the value `provider` supplies for `context` this pass.
    ///
    /// Returns `true` when it differs from what the same provider supplied on
    /// the previous pass.
    pub fn record_provided<T: PartialEq + 'static>(
        &mut self,
        provider: InstanceId,
        context: &Context<T>,
        value: Rc<T>,
    ) -> bool {
        let previous = self.provided.insert((provider, context.id), value.clone());
        previous
            .and_then(|previous| previous.downcast::<T>().ok())
            .is_some_and(|previous| *previous != *value)
    }

    /// Pushes a provider value for the duration of its subtree.
    pub fn push(&mut self, id: ContextId, value: Value) {
        self.entries.entry(id).or_default().stack.push(value);
    }

    /// Pops the innermost provider value.
    pub fn pop(&mut self, id: ContextId) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.stack.pop();
        }
    }

    /// Sets the root-level value. Returns `true` if it changed.
    pub fn set_root<T: PartialEq + 'static>(&mut self, context: &Context<T>, value: T) -> bool {
        let entry = self.entries.entry(context.id).or_default();
        let changed = entry
            .root
            .as_ref()
            .and_then(|current| current.downcast_ref::<T>())
            .map_or_else(|| *context.default_value() != value, |current| *current != value);
        entry.root = Some(Rc::new(value));
        changed
    }

    /// Clears provider stacks left behind by an aborted pass.
    pub fn reset_stacks(&mut self) {
        for entry in self.entries.values_mut() {
            entry.stack.clear();
        }
    }

    /// Forgets every value and subscription.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.provided.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn providers_shadow_root_and_default() {
        let theme = create_context("light");
        let mut store = ContextStore::default();
        assert_eq!(store.current(&theme), "light");

        assert!(store.set_root(&theme, "dim"));
        assert_eq!(store.current(&theme), "dim");

        store.push(theme.id(), Rc::new("dark"));
        assert_eq!(store.current(&theme), "dark");
        store.pop(theme.id());
        assert_eq!(store.current(&theme), "dim");
    }

    #[test]
    fn provider_changes_are_detected_per_provider() {
        let count = create_context(0_u32);
        let mut store = ContextStore::default();
        let provider = InstanceId::ROOT;
        assert!(!store.record_provided(provider, &count, Rc::new(1)));
        assert!(!store.record_provided(provider, &count, Rc::new(1)));
        assert!(store.record_provided(provider, &count, Rc::new(2)));
    }

    #[test]
    fn prune_removes_subscriptions() {
        let flag = create_context(false);
        let mut store = ContextStore::default();
        let instance = InstanceId::ROOT;
        store.subscribe(flag.id(), instance);
        assert_eq!(store.subscribers(flag.id()), [instance]);
        store.prune(instance);
        assert!(store.subscribers(flag.id()).is_empty());
    }
}
