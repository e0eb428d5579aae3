//! Render sessions.
//!
//! A [`Root`] owns everything that survives between passes for one mounted
//! component tree: the hook slot table, the context store, the previous-tree
//! snapshot and the host. Independent roots share nothing, so several can be
//! mounted side by side.

use alloc::{boxed::Box, rc::Rc, rc::Weak};
use core::{
    cell::{Cell, Ref, RefCell},
    fmt,
};

use crate::{
    config::RootConfig,
    context::Context,
    element::{Component, Node},
    error::RenderError,
    host::Host,
    reconcile::{PatchStats, Reconciler},
    runtime::{Phase, Runtime},
    scheduler::{Defer, TickQueue, UpdateTrigger},
};

/// Mounts `component` into `container` and runs the first pass.
///
/// # Errors
///
/// Returns the error of the first pass. Nothing is mounted in that case.
pub fn mount<H: Host + 'static>(
    component: Component,
    host: H,
    container: H::Node,
    defer: impl Defer + 'static,
) -> Result<Root<H>, RenderError> {
    RootBuilder::new(component).defer(defer).mount(host, container)
}

/// Builder for a [`Root`].
pub struct RootBuilder {
    component: Component,
    config: RootConfig,
    defer: Option<Box<dyn Defer>>,
}

impl fmt::Debug for RootBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootBuilder")
            .field("component", &self.component)
            .field("config", &self.config)
            .field("defer", &self.defer.is_some())
            .finish()
    }
}

impl RootBuilder {
    /// Starts a builder for `component` with the default configuration.
    #[must_use]
    pub const fn new(component: Component) -> Self {
        Self {
            component,
            config: RootConfig::new(),
            defer: None,
        }
    }

    /// Sets the root configuration.
    #[must_use]
    pub const fn config(mut self, config: RootConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the "next tick" primitive used to coalesce updates.
    ///
    /// Without one, requested updates wait on an internal queue and only
    /// [`Root::update`] renders.
    #[must_use]
    pub fn defer(mut self, defer: impl Defer + 'static) -> Self {
        self.defer = Some(Box::new(defer));
        self
    }

    /// Creates the root and runs the first pass against an empty container.
    ///
    /// # Errors
    ///
    /// Returns the error of the first pass.
    pub fn mount<H: Host + 'static>(self, host: H, container: H::Node) -> Result<Root<H>, RenderError> {
        let defer = self.defer.unwrap_or_else(|| {
            tracing::warn!(
                component = self.component.name(),
                "no defer primitive configured; updates run only through Root::update"
            );
            Box::new(TickQueue::new())
        });

        let inner = Rc::new_cyclic(|this: &Weak<RootInner<H>>| {
            let trigger: Weak<dyn UpdateTrigger> = this.clone();
            RootInner {
                component: self.component,
                runtime: Runtime::new(self.config, self.component.name(), trigger),
                host: RefCell::new(host),
                container,
                defer,
                previous: RefCell::new(None),
                scheduled: Cell::new(false),
                mounted: Cell::new(true),
                passes: Cell::new(0),
                this: this.clone(),
            }
        });

        tracing::debug!(component = self.component.name(), "mounting root");
        inner.render_pass()?;
        Ok(Root { inner })
    }
}

struct RootInner<H: Host> {
    component: Component,
    runtime: Runtime,
    host: RefCell<H>,
    container: H::Node,
    defer: Box<dyn Defer>,
    previous: RefCell<Option<Node>>,
    scheduled: Cell<bool>,
    mounted: Cell<bool>,
    passes: Cell<u64>,
    this: Weak<Self>,
}

impl<H: Host + 'static> RootInner<H> {
    fn render_pass(&self) -> Result<PatchStats, RenderError> {
        if !self.mounted.get() {
            return Err(RenderError::Unmounted);
        }
        if self.runtime.phase() != Phase::Idle {
            return Err(RenderError::Reentrant);
        }

        let pass = self.passes.get() + 1;
        let span = tracing::debug_span!("render_pass", pass, component = self.component.name());
        let _entered = span.enter();

        self.scheduled.set(false);
        let next = self.runtime.render_root(self.component)?;

        self.runtime.set_phase(Phase::Committing);
        let stats = match self.commit(&next) {
            Ok(stats) => stats,
            Err(error) => {
                self.runtime.abort_pass();
                return Err(error);
            }
        };
        *self.previous.borrow_mut() = Some(next);

        self.runtime.set_phase(Phase::Effects);
        self.runtime.sweep_unmounted();
        self.runtime.run_effects();
        self.runtime.set_phase(Phase::Idle);
        self.passes.set(pass);

        tracing::debug!(
            created = stats.created,
            inserted = stats.inserted,
            moved = stats.moved,
            removed = stats.removed,
            attributes = stats.attributes,
            handlers = stats.handlers,
            texts = stats.texts,
            "render pass committed"
        );
        Ok(stats)
    }

    fn commit(&self, next: &Node) -> Result<PatchStats, RenderError> {
        let previous = self.previous.borrow();
        let mut host = self
            .host
            .try_borrow_mut()
            .map_err(|_| RenderError::Reentrant)?;
        let mut reconciler = Reconciler::new(&mut *host);
        reconciler.reconcile(&self.container, previous.as_ref(), Some(next), 0)?;
        Ok(reconciler.stats())
    }

    /// Entry point of a deferred pass.
    fn process_update(&self) {
        if !self.scheduled.get() {
            tracing::trace!("update already rendered; skipping deferred pass");
            return;
        }
        match self.render_pass() {
            Ok(_) => {}
            Err(RenderError::Unmounted) => {
                tracing::trace!("skipping update of unmounted root");
            }
            Err(RenderError::Reentrant) => {
                tracing::trace!("pass already running; rescheduling");
                self.scheduled.set(false);
                self.request_update();
            }
            Err(error) => {
                tracing::error!(%error, "render pass failed; keeping previous tree");
            }
        }
    }
}

impl<H: Host + 'static> UpdateTrigger for RootInner<H> {
    fn request_update(&self) {
        if !self.mounted.get() {
            tracing::trace!("update requested on unmounted root");
            return;
        }
        if self.scheduled.replace(true) {
            tracing::trace!("update already scheduled; coalesced");
            return;
        }

        tracing::trace!("scheduling render pass");
        let this = self.this.clone();
        self.defer.defer(Box::new(move || {
            if let Some(root) = this.upgrade() {
                root.process_update();
            }
        }));
    }
}

/// A mounted component tree.
///
/// Cloning a `Root` yields another handle to the same session.
pub struct Root<H: Host + 'static> {
    inner: Rc<RootInner<H>>,
}

impl<H: Host + 'static> Clone for Root<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<H: Host + 'static> fmt::Debug for Root<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Root")
            .field("component", &self.inner.component)
            .field("container", &self.inner.container)
            .field("passes", &self.inner.passes.get())
            .field("runtime", &self.inner.runtime)
            .finish_non_exhaustive()
    }
}

impl<H: Host + 'static> Root<H> {
    /// Runs a render pass now.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Reentrant`] when called from inside a pass,
    /// [`RenderError::Unmounted`] after [`Root::unmount`], and any error raised
    /// by the pass itself. A failed pass leaves the previous tree in place.
    pub fn update(&self) -> Result<PatchStats, RenderError> {
        self.inner.render_pass()
    }

    /// Schedules a pass on the next tick. Repeated requests coalesce.
    pub fn request_update(&self) {
        self.inner.request_update();
    }

    /// Returns `true` if a deferred pass is pending.
    #[must_use]
    pub fn is_update_scheduled(&self) -> bool {
        self.inner.scheduled.get()
    }

    /// Borrows the host.
    ///
    /// # Panics
    ///
    /// Panics if the host is mutably borrowed, which only happens during a
    /// commit or inside [`Root::with_host`].
    #[must_use]
    pub fn host(&self) -> Ref<'_, H> {
        self.inner.host.borrow()
    }

    /// Runs `f` with mutable access to the host.
    ///
    /// # Panics
    ///
    /// Panics if the host is already borrowed.
    pub fn with_host<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        f(&mut self.inner.host.borrow_mut())
    }

    /// Returns the container handle the root renders into.
    #[must_use]
    pub fn container(&self) -> &H::Node {
        &self.inner.container
    }

    /// Number of committed passes.
    #[must_use]
    pub fn passes(&self) -> u64 {
        self.inner.passes.get()
    }

    /// Current phase of the render cycle.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.inner.runtime.phase()
    }

    /// Returns `true` until [`Root::unmount`] is called.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.get()
    }

    /// Returns the tree committed by the last successful pass.
    #[must_use]
    pub fn previous_tree(&self) -> Option<Node> {
        self.inner.previous.borrow().clone()
    }

    /// Sets a root-level value for `context` and notifies its subscribers.
    pub fn set_context<T: PartialEq + 'static>(&self, context: &Context<T>, value: T) {
        let changed = self.inner.runtime.contexts.borrow_mut().set_root(context, value);
        if changed {
            tracing::trace!(context = ?context.id(), "root context changed");
            self.inner.runtime.notify_subscribers(context.id());
        }
    }

    /// Removes the rendered tree from the host and tears every instance down.
    ///
    /// Effect cleanups run in slot order. Pending deferred passes become no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Unmounted`] if already unmounted,
    /// [`RenderError::Reentrant`] from inside a pass, and host errors raised
    /// while detaching the tree.
    pub fn unmount(&self) -> Result<(), RenderError> {
        let inner = &self.inner;
        if !inner.mounted.get() {
            return Err(RenderError::Unmounted);
        }
        if inner.runtime.phase() != Phase::Idle {
            return Err(RenderError::Reentrant);
        }

        inner.mounted.set(false);
        inner.scheduled.set(false);
        let previous = inner.previous.borrow_mut().take();
        let detached = if previous.is_some() {
            let mut host = inner.host.borrow_mut();
            Reconciler::new(&mut *host).reconcile(&inner.container, previous.as_ref(), None, 0)
        } else {
            Ok(())
        };

        inner.runtime.set_phase(Phase::Effects);
        inner.runtime.teardown_all();
        inner.runtime.set_phase(Phase::Idle);
        tracing::debug!(component = inner.component.name(), "root unmounted");
        detached
    }
}
