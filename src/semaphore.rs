//! An asynchronous counting semaphore.
//!
//! See the [`Semaphore`] type's documentation for details.
use crate::{deferred, Deferred};
use alloc::{collections::VecDeque, rc::Rc};
use core::{
    cell::RefCell,
    fmt,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

#[cfg(test)]
mod tests;

/// An asynchronous counting semaphore.
///
/// A semaphore holds a count of *permits*. [`acquire`] takes one permit,
/// waiting asynchronously if none are available; [`release`] (or
/// [`add_permits`]) puts permits back, waking waiters.
///
/// # Fairness
///
/// The semaphore is fair: permits are granted to waiting tasks in the order
/// they requested them. When a permit is released and a task is waiting, the
/// permit is transferred to the first live waiter in the same synchronous
/// step, so a late-arriving [`acquire`] cannot observe an available permit
/// that is already spoken for.
///
/// # Cancellation
///
/// Dropping an [`Acquire`] future abandons the attempt. A waiter dropped
/// after the permit was transferred to it (but before it observed the grant)
/// returns the permit and the wakeup moves on to the next waiter.
///
/// `Semaphore` is a cheap handle: clones refer to the same permit count.
///
/// [`acquire`]: Self::acquire
/// [`release`]: Self::release
/// [`add_permits`]: Self::add_permits
#[derive(Clone)]
pub struct Semaphore {
    core: Rc<RefCell<Core>>,
}

/// The future returned by the [`Semaphore::acquire`] method.
#[must_use = "futures do nothing unless `.await`ed or `poll`ed"]
pub struct Acquire {
    semaphore: Semaphore,
    state: AcquireState,
}

struct Core {
    permits: usize,
    waiters: VecDeque<Deferred<()>>,
}

enum AcquireState {
    Init,
    Waiting { wait: deferred::Wait<()> },
    Done,
}

// === impl Semaphore ===

impl Semaphore {
    /// Returns a new `Semaphore` with `permits` permits available.
    #[must_use]
    pub fn new(permits: usize) -> Self {
        Self {
            core: Rc::new(RefCell::new(Core {
                permits,
                waiters: VecDeque::new(),
            })),
        }
    }

    /// Returns the number of permits currently available.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.core.borrow().permits
    }

    /// Returns `true` if no permits are currently available, i.e. the next
    /// [`acquire`](Self::acquire) would wait.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.core.borrow().permits == 0
    }

    /// Acquires one permit, waiting asynchronously until one is available.
    ///
    /// If a permit is available, the returned future resolves on its first
    /// poll and the permit count is decremented. Otherwise the caller joins
    /// a first-in-first-out wait list; a released permit is consumed on the
    /// waiter's behalf in the same synchronous step that wakes it.
    pub fn acquire(&self) -> Acquire {
        Acquire {
            semaphore: self.clone(),
            state: AcquireState::Init,
        }
    }

    /// Releases one permit back to the semaphore, waking the first live
    /// waiter if there is one.
    pub fn release(&self) {
        self.add_permits(1);
    }

    /// Adds `permits` new permits to the semaphore, waking as many waiters
    /// as the new permits can satisfy.
    pub fn add_permits(&self, permits: usize) {
        if permits == 0 {
            return;
        }
        self.core.borrow_mut().permits += permits;
        trace!(permits, "Semaphore::add_permits");
        self.wake_waiters();
    }

    /// Settles waiters while permits remain; each settled waiter's immediate
    /// callback consumes one permit before any other task runs.
    fn wake_waiters(&self) {
        loop {
            let waiter = {
                let mut core = self.core.borrow_mut();
                if core.permits == 0 {
                    return;
                }
                match core.waiters.pop_front() {
                    Some(waiter) => waiter,
                    None => return,
                }
            };
            // A cancelled waiter fails to settle and consumes nothing; move
            // on to the next one.
            if waiter.settle(()).is_ok() {
                trace!("Semaphore::wake_waiters -> granted");
            }
        }
    }
}

impl fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.core.borrow();
        f.debug_struct("Semaphore")
            .field("permits", &core.permits)
            .field("waiters", &core.waiters.len())
            .finish()
    }
}

// === impl Acquire ===

impl Future for Acquire {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        loop {
            match &mut this.state {
                AcquireState::Init => {
                    let mut core = this.semaphore.core.borrow_mut();
                    if core.permits > 0 {
                        core.permits -= 1;
                        this.state = AcquireState::Done;
                        return Poll::Ready(());
                    }
                    let waiter = Deferred::new();
                    waiter.add_immediate_callback({
                        let semaphore = this.semaphore.clone();
                        move |waiter: &Deferred<()>| {
                            if !waiter.is_cancelled() {
                                semaphore.core.borrow_mut().permits -= 1;
                            }
                        }
                    });
                    core.waiters.push_back(waiter.clone());
                    drop(core);
                    this.state = AcquireState::Waiting {
                        wait: waiter.wait(),
                    };
                }
                AcquireState::Waiting { wait } => match Pin::new(wait).poll(cx) {
                    Poll::Ready(_) => {
                        this.state = AcquireState::Done;
                        return Poll::Ready(());
                    }
                    Poll::Pending => return Poll::Pending,
                },
                AcquireState::Done => return Poll::Ready(()),
            }
        }
    }
}

impl Drop for Acquire {
    fn drop(&mut self) {
        if let AcquireState::Waiting { wait } = &self.state {
            let waiter = wait.deferred();
            if !waiter.cancel() && !waiter.is_cancelled() {
                // A permit was consumed on this waiter's behalf, but the
                // future was dropped before observing the grant; return the
                // permit and propagate the wakeup.
                self.semaphore.release();
            }
        }
    }
}

impl fmt::Debug for Acquire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            AcquireState::Init => "Init",
            AcquireState::Waiting { .. } => "Waiting",
            AcquireState::Done => "Done",
        };
        f.debug_struct("Acquire")
            .field("semaphore", &self.semaphore)
            .field("state", &state)
            .finish()
    }
}
