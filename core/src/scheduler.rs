//! Deferral primitives used to coalesce updates.
//!
//! The engine never decides *when* the next tick happens. A root is given a
//! [`Defer`] implementation and asks it, at most once per pending batch, to run
//! the next render pass later.

use alloc::{boxed::Box, collections::VecDeque, rc::Rc};
use core::{cell::RefCell, fmt};

use futures::{executor::LocalSpawner, task::LocalSpawnExt};

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce()>;

/// External "run this on the next tick" primitive.
pub trait Defer {
    /// Queues `task` to run after the current turn of the host event loop.
    fn defer(&self, task: Task);
}

impl<D: Defer + ?Sized> Defer for Rc<D> {
    fn defer(&self, task: Task) {
        (**self).defer(task);
    }
}

impl<D: Defer + ?Sized> Defer for Box<D> {
    fn defer(&self, task: Task) {
        (**self).defer(task);
    }
}

impl Defer for LocalSpawner {
    fn defer(&self, task: Task) {
        if let Err(error) = self.spawn_local(async move { task() }) {
            tracing::warn!(%error, "local pool rejected deferred task");
        }
    }
}

/// Manually drained task queue.
///
/// Clones share the same queue, so one clone can be handed to a root while
/// another drives it.
#[derive(Clone, Default)]
pub struct TickQueue {
    tasks: Rc<RefCell<VecDeque<Task>>>,
}

impl fmt::Debug for TickQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickQueue")
            .field("pending", &self.len())
            .finish()
    }
}

impl TickQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of queued tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    /// Runs one tick: every task queued before the call.
    ///
    /// Tasks deferred while the tick runs wait for the next call.
    pub fn run_pending(&self) -> usize {
        let batch = core::mem::take(&mut *self.tasks.borrow_mut());
        let count = batch.len();
        for task in batch {
            task();
        }
        count
    }

    /// Runs ticks until the queue stays empty or `max_ticks` is reached.
    ///
    /// Returns the number of tasks executed.
    pub fn run_until_idle(&self, max_ticks: usize) -> usize {
        let mut total = 0;
        for _ in 0..max_ticks {
            let ran = self.run_pending();
            if ran == 0 {
                break;
            }
            total += ran;
        }
        total
    }
}

impl Defer for TickQueue {
    fn defer(&self, task: Task) {
        self.tasks.borrow_mut().push_back(task);
    }
}

/// Something that can be asked to schedule a render pass.
pub(crate) trait UpdateTrigger {
    fn request_update(&self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use futures::executor::LocalPool;

    #[test]
    fn tasks_deferred_during_a_tick_wait_for_the_next() {
        let queue = TickQueue::new();
        let runs = Rc::new(Cell::new(0));
        let inner = queue.clone();
        let counter = runs.clone();
        queue.defer(Box::new(move || {
            counter.set(counter.get() + 1);
            let counter = counter.clone();
            inner.defer(Box::new(move || counter.set(counter.get() + 1)));
        }));

        assert_eq!(queue.run_pending(), 1);
        assert_eq!(runs.get(), 1);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.run_until_idle(8), 1);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn local_spawner_runs_tasks_on_the_pool() {
        let mut pool = LocalPool::new();
        let spawner = pool.spawner();
        let ran = Rc::new(Cell::new(false));
        let flag = ran.clone();
        spawner.defer(Box::new(move || flag.set(true)));
        assert!(!ran.get());
        pool.run_until_stalled();
        assert!(ran.get());
    }
}
