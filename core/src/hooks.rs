//! Hooks: persistent per-instance state for stateless render functions.
//!
//! Every component render receives a [`Cx`]. Hooks are methods on it and are
//! identified by call order: the first hook call of a render reads slot 0,
//! the second slot 1, and so on. A component must therefore call the same
//! hooks in the same order on every render. Divergence is reported as
//! [`RenderError::HookOrder`] instead of silently reading the wrong slot.
//!
//! ```ignore
//! fn counter(cx: &mut Cx<'_>, _props: &Props) -> Result<Node, RenderError> {
//!     let (count, set_count) = cx.use_state(0)?;
//!     cx.use_effect(count, move || {
//!         tracing::info!(count, "count changed");
//!         None
//!     })?;
//!     Ok(element(
//!         "button",
//!         Props::new().on("onClick", move |_| set_count.update(|n| n + 1)),
//!         children!["Count: ", count],
//!     ))
//! }
//! ```

use alloc::{boxed::Box, format, rc::Rc, rc::Weak, vec::Vec};
use core::{any::Any, cell::RefCell, fmt};
use std::collections::HashMap;

use crate::{
    config::SetStatePolicy,
    context::Context,
    element::{Child, Component, Event, Handler, Key, Node, Props, Tag, host_element},
    error::RenderError,
    runtime::{EffectSlot, InstanceId, PendingEffect, Runtime, Slot},
    scheduler::UpdateTrigger,
};

/// The kind of hook that owns a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    /// [`Cx::use_state`].
    State,
    /// [`Cx::use_effect`].
    Effect,
    /// [`Cx::use_memo`] and [`Cx::use_callback`].
    Memo,
    /// [`Cx::use_context`].
    Context,
}

/// Function returned by an effect to undo it.
pub struct Cleanup(Box<dyn FnOnce()>);

impl Cleanup {
    /// Wraps a closure as a cleanup.
    pub fn new(cleanup: impl FnOnce() + 'static) -> Self {
        Self(Box::new(cleanup))
    }

    pub(crate) fn run(self) {
        (self.0)();
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cleanup")
    }
}

/// Writes a state slot and schedules the next pass.
pub struct Setter<T> {
    cell: Rc<RefCell<T>>,
    trigger: Weak<dyn UpdateTrigger>,
    policy: SetStatePolicy,
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            trigger: self.trigger.clone(),
            policy: self.policy,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Setter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter")
            .field("value", &self.cell.borrow())
            .field("policy", &self.policy)
            .finish()
    }
}

impl<T: PartialEq + 'static> Setter<T> {
    /// Replaces the value.
    pub fn set(&self, value: T) {
        self.store(value);
    }

    /// Computes the next value from the latest stored one.
    ///
    /// Several updates issued before the next pass compose, unlike repeated
    /// [`Setter::set`] calls built from a value captured during render.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.cell.borrow());
        self.store(next);
    }

    /// Returns a clone of the latest stored value.
    #[must_use]
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.cell.borrow().clone()
    }

    fn store(&self, next: T) {
        let changed = {
            let mut current = self.cell.borrow_mut();
            let changed = *current != next;
            *current = next;
            changed
        };
        if !changed && self.policy == SetStatePolicy::SkipUnchanged {
            tracing::trace!("state unchanged; update skipped");
            return;
        }
        match self.trigger.upgrade() {
            Some(trigger) => trigger.request_update(),
            None => tracing::trace!("state set after root was dropped"),
        }
    }
}

/// Render scope of one component instance.
///
/// A `Cx` only exists while its root is rendering, which is what gives hooks
/// their "inside a render pass" guarantee.
pub struct Cx<'a> {
    runtime: &'a Runtime,
    instance: InstanceId,
    name: &'static str,
    cursor: usize,
    /// Unkeyed invocations seen so far, per component.
    ordinals: HashMap<usize, usize>,
    kinds: Vec<HookKind>,
}

impl fmt::Debug for Cx<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cx")
            .field("component", &self.name)
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

impl<'a> Cx<'a> {
    pub(crate) fn new(runtime: &'a Runtime, instance: InstanceId, name: &'static str) -> Self {
        Self {
            runtime,
            instance,
            name,
            cursor: 0,
            ordinals: HashMap::new(),
            kinds: Vec::new(),
        }
    }

    /// Builds an element from a host tag or a component.
    ///
    /// Children are normalised first. A component is invoked immediately with
    /// the props and children, and its output is returned in place of the
    /// component element.
    ///
    /// # Errors
    ///
    /// Propagates any error raised while rendering a component.
    pub fn build_element(
        &mut self,
        tag: impl Into<Tag>,
        mut props: Props,
        children: Vec<Child>,
    ) -> Result<Node, RenderError> {
        props.set_children(children);
        match tag.into() {
            Tag::Host(tag) => Ok(host_element(tag, props)),
            Tag::Component(component) => self.render_component(component, props),
        }
    }

    /// Renders a component without children.
    ///
    /// # Errors
    ///
    /// Propagates any error raised by the component.
    pub fn component(&mut self, component: Component, props: Props) -> Result<Node, RenderError> {
        self.render_component(component, props)
    }

    fn render_component(&mut self, component: Component, props: Props) -> Result<Node, RenderError> {
        let explicit = props.explicit_key().cloned();
        let key = match &explicit {
            Some(key) => Key::Explicit(key.clone()),
            None => {
                let ordinal = self.ordinals.entry(component.id()).or_default();
                *ordinal += 1;
                Key::Index(*ordinal - 1)
            }
        };

        let id = self.runtime.child_instance(self.instance, component, key);
        let mut node = self.runtime.render_instance(id, component, &props)?;
        if let Some(key) = &explicit {
            node.adopt_key(key);
        }
        Ok(node)
    }

    /// Returns the name of the component being rendered.
    #[must_use]
    pub const fn component_name(&self) -> &'static str {
        self.name
    }

    /// Persistent state. The first render stores `initial`; later renders read
    /// the stored value.
    ///
    /// # Errors
    ///
    /// Fails when called outside a pass or when the slot holds another hook.
    pub fn use_state<T>(&mut self, initial: T) -> Result<(T, Setter<T>), RenderError>
    where
        T: Clone + PartialEq + 'static,
    {
        let slot = self.next_slot("use_state", HookKind::State)?;
        let cell = {
            let mut instances = self.runtime.instances.borrow_mut();
            let instance = instances
                .get_mut(&self.instance)
                .ok_or_else(|| self.missing_instance())?;
            match instance.slots.get(slot) {
                Some(Slot::State(cell)) => cell
                    .clone()
                    .downcast::<RefCell<T>>()
                    .map_err(|_| self.order_error(slot, "state slot holds a different type"))?,
                Some(_) => return Err(self.order_error(slot, "slot is not a state cell")),
                None => {
                    let cell = Rc::new(RefCell::new(initial));
                    instance.slots.push(Slot::State(cell.clone()));
                    cell
                }
            }
        };

        let value = cell.borrow().clone();
        let setter = Setter {
            cell,
            trigger: self.runtime.trigger.clone(),
            policy: self.runtime.config.set_state,
        };
        Ok((value, setter))
    }

    /// Runs `effect` after the host tree reflects this pass, on the first
    /// render and whenever `deps` differs from the previous render.
    ///
    /// The cleanup returned by the previous run executes first.
    ///
    /// # Errors
    ///
    /// Fails when called outside a pass or when the slot holds another hook.
    pub fn use_effect<D, F>(&mut self, deps: D, effect: F) -> Result<(), RenderError>
    where
        D: PartialEq + 'static,
        F: FnOnce() -> Option<Cleanup> + 'static,
    {
        let slot = self.next_slot("use_effect", HookKind::Effect)?;
        let due = {
            let mut instances = self.runtime.instances.borrow_mut();
            let instance = instances
                .get_mut(&self.instance)
                .ok_or_else(|| self.missing_instance())?;
            match instance.slots.get(slot) {
                Some(Slot::Effect(existing)) => !deps_match(existing.deps.as_deref(), &deps),
                Some(_) => return Err(self.order_error(slot, "slot is not an effect")),
                None => {
                    instance.slots.push(Slot::Effect(EffectSlot {
                        deps: None,
                        cleanup: None,
                    }));
                    true
                }
            }
        };

        if due {
            self.runtime.effects.borrow_mut().push(PendingEffect {
                instance: self.instance,
                slot,
                deps: Box::new(deps),
                run: Box::new(effect),
            });
        }
        Ok(())
    }

    /// Returns the cached value while `deps` is unchanged, otherwise
    /// recomputes it with `factory`.
    ///
    /// # Errors
    ///
    /// Fails when called outside a pass or when the slot holds another hook.
    pub fn use_memo<D, T>(&mut self, deps: D, factory: impl FnOnce() -> T) -> Result<T, RenderError>
    where
        D: PartialEq + 'static,
        T: Clone + 'static,
    {
        let slot = self.next_slot("use_memo", HookKind::Memo)?;
        {
            let instances = self.runtime.instances.borrow();
            let instance = instances
                .get(&self.instance)
                .ok_or_else(|| self.missing_instance())?;
            match instance.slots.get(slot) {
                Some(Slot::Memo { value, deps: old }) => {
                    if deps_match(Some(&**old), &deps) {
                        return value
                            .downcast_ref::<T>()
                            .cloned()
                            .ok_or_else(|| self.order_error(slot, "memo slot holds a different type"));
                    }
                }
                Some(_) => return Err(self.order_error(slot, "slot is not a memo")),
                None => {}
            }
        }

        let value = factory();
        let mut instances = self.runtime.instances.borrow_mut();
        let instance = instances
            .get_mut(&self.instance)
            .ok_or_else(|| self.missing_instance())?;
        let memo = Slot::Memo {
            value: Rc::new(value.clone()),
            deps: Box::new(deps),
        };
        if slot < instance.slots.len() {
            instance.slots[slot] = memo;
        } else {
            instance.slots.push(memo);
        }
        Ok(value)
    }

    /// Memoises a handler so its identity only changes with `deps`.
    ///
    /// # Errors
    ///
    /// Fails when called outside a pass or when the slot holds another hook.
    pub fn use_callback<D>(
        &mut self,
        deps: D,
        handler: impl Fn(&Event) + 'static,
    ) -> Result<Handler, RenderError>
    where
        D: PartialEq + 'static,
    {
        self.use_memo(deps, move || Handler::new(handler))
    }

    /// Reads a context and subscribes this instance to its changes.
    ///
    /// # Errors
    ///
    /// Fails when called outside a pass or when the slot holds another hook.
    pub fn use_context<T: Clone + 'static>(&mut self, context: &Context<T>) -> Result<T, RenderError> {
        let slot = self.next_slot("use_context", HookKind::Context)?;
        {
            let mut instances = self.runtime.instances.borrow_mut();
            let instance = instances
                .get_mut(&self.instance)
                .ok_or_else(|| self.missing_instance())?;
            match instance.slots.get(slot) {
                Some(Slot::Context(id)) if *id == context.id() => {}
                Some(Slot::Context(_)) => {
                    return Err(self.order_error(slot, "slot reads a different context"));
                }
                Some(_) => return Err(self.order_error(slot, "slot is not a context read")),
                None => instance.slots.push(Slot::Context(context.id())),
            }
            instance.subscriptions.push(context.id());
        }

        let mut contexts = self.runtime.contexts.borrow_mut();
        contexts.subscribe(context.id(), self.instance);
        Ok(contexts.current(context))
    }

    /// Provides `value` for `context` to everything rendered by `render`.
    ///
    /// When the value differs from what this instance provided on the previous
    /// pass, the context's subscribers are notified.
    ///
    /// # Errors
    ///
    /// Propagates any error raised by `render`.
    pub fn provide<T, F>(&mut self, context: &Context<T>, value: T, render: F) -> Result<Node, RenderError>
    where
        T: PartialEq + 'static,
        F: FnOnce(&mut Self) -> Result<Node, RenderError>,
    {
        self.runtime.ensure_rendering("provide")?;
        let value = Rc::new(value);
        let changed = self
            .runtime
            .contexts
            .borrow_mut()
            .record_provided(self.instance, context, value.clone());
        if changed {
            self.runtime.notify_subscribers(context.id());
        }

        self.runtime.contexts.borrow_mut().push(context.id(), value);
        let result = render(self);
        self.runtime.contexts.borrow_mut().pop(context.id());
        result
    }

    fn next_slot(&mut self, hook: &'static str, kind: HookKind) -> Result<usize, RenderError> {
        self.runtime.ensure_rendering(hook)?;
        let slot = self.cursor;
        self.cursor += 1;
        self.kinds.push(kind);

        let instances = self.runtime.instances.borrow();
        let expected = instances
            .get(&self.instance)
            .and_then(|instance| instance.kinds.get(slot).copied());
        match expected {
            Some(expected) if expected != kind => Err(self.order_error(
                slot,
                &format!("expected {expected:?}, found {kind:?}"),
            )),
            _ => Ok(slot),
        }
    }

    /// Validates the hook sequence of this render and stores it.
    pub(crate) fn finish(self) -> Result<(), RenderError> {
        let mut instances = self.runtime.instances.borrow_mut();
        let instance = instances
            .get_mut(&self.instance)
            .ok_or_else(|| self.missing_instance())?;
        if instance.rendered
            && self.runtime.config.check_hook_order
            && instance.kinds.len() != self.kinds.len()
        {
            return Err(RenderError::HookOrder {
                component: instance.name,
                slot: instance.kinds.len().min(self.kinds.len()),
                detail: format!(
                    "expected {} hook calls, found {}",
                    instance.kinds.len(),
                    self.kinds.len()
                ),
            });
        }
        instance.kinds = self.kinds;
        instance.rendered = true;
        Ok(())
    }

    fn order_error(&self, slot: usize, detail: &str) -> RenderError {
        RenderError::HookOrder {
            component: self.name,
            slot,
            detail: detail.into(),
        }
    }

    fn missing_instance(&self) -> RenderError {
        RenderError::mismatch(format!("instance {:?} is not mounted", self.instance))
    }
}

fn deps_match<D: PartialEq + 'static>(previous: Option<&dyn Any>, next: &D) -> bool {
    previous
        .and_then(|previous| previous.downcast_ref::<D>())
        .is_some_and(|previous| previous == next)
}
