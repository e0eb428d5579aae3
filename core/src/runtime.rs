//! Cross-pass state owned by one root: component instances, their hook slots,
//! pending effects and the context store.

use alloc::{boxed::Box, rc::Weak, vec::Vec};
use core::{
    any::Any,
    cell::{Cell, RefCell},
    fmt,
};
use std::{
    collections::{HashMap, HashSet},
    panic::{AssertUnwindSafe, catch_unwind},
};

use crate::{
    config::RootConfig,
    context::{ContextId, ContextStore},
    element::{Component, Key, Node, Props},
    error::RenderError,
    hooks::{Cleanup, Cx, HookKind},
    scheduler::UpdateTrigger,
};

/// Identity of a mounted component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    /// The instance of the root component.
    pub const ROOT: Self = Self(0);
}

/// Where a root is in its render cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No pass is running.
    #[default]
    Idle,
    /// Component functions are executing.
    Rendering,
    /// The reconciler is patching the host tree.
    Committing,
    /// Effects and unmount cleanups are running.
    Effects,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ChildKey {
    component: usize,
    key: Key,
}

pub(crate) struct EffectSlot {
    pub deps: Option<Box<dyn Any>>,
    pub cleanup: Option<Cleanup>,
}

pub(crate) enum Slot {
    State(alloc::rc::Rc<dyn Any>),
    Effect(EffectSlot),
    Memo {
        value: alloc::rc::Rc<dyn Any>,
        deps: Box<dyn Any>,
    },
    Context(ContextId),
}

pub(crate) struct Instance {
    pub id: InstanceId,
    pub name: &'static str,
    parent: Option<InstanceId>,
    pub slots: Vec<Slot>,
    pub kinds: Vec<HookKind>,
    pub rendered: bool,
    pub subscriptions: Vec<ContextId>,
    children: HashMap<ChildKey, InstanceId>,
}

impl Instance {
    fn new(id: InstanceId, name: &'static str, parent: Option<InstanceId>) -> Self {
        Self {
            id,
            name,
            parent,
            slots: Vec::new(),
            kinds: Vec::new(),
            rendered: false,
            subscriptions: Vec::new(),
            children: HashMap::new(),
        }
    }
}

pub(crate) struct PendingEffect {
    pub instance: InstanceId,
    pub slot: usize,
    pub deps: Box<dyn Any>,
    pub run: Box<dyn FnOnce() -> Option<Cleanup>>,
}

/// Hook and context state for one root.
pub(crate) struct Runtime {
    pub config: RootConfig,
    phase: Cell<Phase>,
    next_instance: Cell<u64>,
    pub instances: RefCell<HashMap<InstanceId, Instance>>,
    live: RefCell<HashSet<InstanceId>>,
    pub effects: RefCell<Vec<PendingEffect>>,
    pub contexts: RefCell<ContextStore>,
    pub trigger: Weak<dyn UpdateTrigger>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("phase", &self.phase.get())
            .field("instances", &self.instances.borrow().len())
            .field("pending_effects", &self.effects.borrow().len())
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(config: RootConfig, root: &'static str, trigger: Weak<dyn UpdateTrigger>) -> Self {
        let mut instances = HashMap::new();
        instances.insert(InstanceId::ROOT, Instance::new(InstanceId::ROOT, root, None));
        Self {
            config,
            phase: Cell::new(Phase::Idle),
            next_instance: Cell::new(1),
            instances: RefCell::new(instances),
            live: RefCell::new(HashSet::new()),
            effects: RefCell::new(Vec::new()),
            contexts: RefCell::new(ContextStore::default()),
            trigger,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    pub fn set_phase(&self, phase: Phase) {
        self.phase.set(phase);
    }

    pub fn ensure_rendering(&self, hook: &'static str) -> Result<(), RenderError> {
        if self.phase.get() == Phase::Rendering {
            Ok(())
        } else {
            Err(RenderError::HookMisuse { hook })
        }
    }

    pub fn instance_name(&self, id: InstanceId) -> &'static str {
        self.instances
            .borrow()
            .get(&id)
            .map_or("<unmounted>", |instance| instance.name)
    }

    /// Runs the root component and returns its tree.
    ///
    /// On failure the pass is abandoned and the runtime returns to idle.
    pub fn render_root(&self, component: Component) -> Result<Node, RenderError> {
        self.phase.set(Phase::Rendering);
        self.live.borrow_mut().clear();
        self.effects.borrow_mut().clear();
        self.contexts.borrow_mut().reset_stacks();

        let result = self.render_instance(InstanceId::ROOT, component, &Props::new());
        if result.is_err() {
            self.abort_pass();
        }
        result
    }

    /// Renders one instance with a fresh slot cursor.
    pub fn render_instance(
        &self,
        id: InstanceId,
        component: Component,
        props: &Props,
    ) -> Result<Node, RenderError> {
        self.begin_instance(id);
        let mut cx = Cx::new(self, id, component.name());
        let node = component.render(&mut cx, props)?;
        cx.finish()?;
        Ok(node)
    }

    fn begin_instance(&self, id: InstanceId) {
        self.live.borrow_mut().insert(id);
        let subscriptions = self
            .instances
            .borrow_mut()
            .get_mut(&id)
            .map(|instance| core::mem::take(&mut instance.subscriptions))
            .unwrap_or_default();
        self.contexts.borrow_mut().unsubscribe(id, &subscriptions);
    }

    /// Finds or creates the instance of `component` rendered by `parent` under `key`.
    pub fn child_instance(
        &self,
        parent: InstanceId,
        component: Component,
        key: Key,
    ) -> InstanceId {
        let child_key = ChildKey {
            component: component.id(),
            key,
        };
        let mut instances = self.instances.borrow_mut();
        if let Some(id) = instances
            .get(&parent)
            .and_then(|instance| instance.children.get(&child_key))
        {
            return *id;
        }

        let id = InstanceId(self.next_instance.get());
        self.next_instance.set(id.0 + 1);
        instances.insert(id, Instance::new(id, component.name(), Some(parent)));
        if let Some(parent) = instances.get_mut(&parent) {
            parent.children.insert(child_key, id);
        }
        tracing::trace!(instance = id.0, component = component.name(), "mounted instance");
        id
    }

    /// Drops pending work of a pass that will not be committed.
    pub fn abort_pass(&self) {
        self.effects.borrow_mut().clear();
        self.contexts.borrow_mut().reset_stacks();
        self.phase.set(Phase::Idle);
    }

    /// Unmounts instances that were not rendered by the pass being committed.
    pub fn sweep_unmounted(&self) {
        let removed: Vec<Instance> = {
            let live = self.live.borrow();
            let mut instances = self.instances.borrow_mut();
            let mut dead: Vec<InstanceId> = instances
                .keys()
                .filter(|id| !live.contains(id))
                .copied()
                .collect();
            dead.sort_unstable();
            let removed: Vec<Instance> = dead.iter().filter_map(|id| instances.remove(id)).collect();
            for instance in &removed {
                if let Some(parent) = instance.parent.and_then(|parent| instances.get_mut(&parent)) {
                    parent.children.retain(|_, child| *child != instance.id);
                }
            }
            removed
        };

        if removed.is_empty() {
            return;
        }
        tracing::debug!(count = removed.len(), "unmounting instances");
        self.teardown(removed);
    }

    /// Unmounts every instance, root included.
    pub fn teardown_all(&self) {
        let mut removed: Vec<Instance> = self.instances.borrow_mut().drain().map(|(_, v)| v).collect();
        removed.sort_unstable_by_key(|instance| instance.id);
        self.teardown(removed);
        self.contexts.borrow_mut().clear();
        self.effects.borrow_mut().clear();
    }

    fn teardown(&self, instances: Vec<Instance>) {
        for instance in instances {
            self.contexts.borrow_mut().prune(instance.id);
            for slot in instance.slots {
                if let Slot::Effect(EffectSlot {
                    cleanup: Some(cleanup),
                    ..
                }) = slot
                {
                    self.guard(instance.name, "cleanup", || cleanup.run());
                }
            }
        }
    }

    /// Runs the effects collected during the pass, in slot order.
    pub fn run_effects(&self) {
        let pending = core::mem::take(&mut *self.effects.borrow_mut());
        for effect in pending {
            let name = self.instance_name(effect.instance);
            let previous = self.with_effect_slot(effect.instance, effect.slot, |slot| {
                slot.cleanup.take()
            });
            if let Some(cleanup) = previous.flatten() {
                self.guard(name, "cleanup", || cleanup.run());
            }

            let cleanup = self.guard(name, "effect", effect.run).flatten();
            let deps = effect.deps;
            self.with_effect_slot(effect.instance, effect.slot, move |slot| {
                slot.deps = Some(deps);
                slot.cleanup = cleanup;
            });
        }
    }

    fn with_effect_slot<R>(
        &self,
        instance: InstanceId,
        slot: usize,
        f: impl FnOnce(&mut EffectSlot) -> R,
    ) -> Option<R> {
        let mut instances = self.instances.borrow_mut();
        match instances
            .get_mut(&instance)
            .and_then(|instance| instance.slots.get_mut(slot))
        {
            Some(Slot::Effect(effect)) => Some(f(effect)),
            _ => None,
        }
    }

    fn guard<R>(&self, component: &'static str, what: &'static str, f: impl FnOnce() -> R) -> Option<R> {
        if !self.config.isolate_effect_panics {
            return Some(f());
        }
        match catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::error!(component, what, "effect panicked; continuing with sibling effects");
                None
            }
        }
    }

    /// Requests a pass on behalf of the subscribers of `id`.
    pub fn notify_subscribers(&self, id: ContextId) {
        let subscribers = self.contexts.borrow().subscribers(id);
        if subscribers.is_empty() {
            return;
        }
        if self.phase.get() == Phase::Rendering {
            tracing::trace!(
                subscribers = subscribers.len(),
                "context changed mid-render; current pass re-renders subscribers"
            );
            return;
        }
        tracing::trace!(subscribers = subscribers.len(), "context changed");
        if let Some(trigger) = self.trigger.upgrade() {
            trigger.request_update();
        }
    }
}
