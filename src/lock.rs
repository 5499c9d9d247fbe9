//! An asynchronous mutual-exclusion lock with explicit hand-off.
//!
//! See the documentation on the [`Lock`] type for details.
use crate::{deferred, Deferred, InvalidState};
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

/// An asynchronous mutual-exclusion lock.
///
/// Unlike a guard-based mutex, `Lock` separates [`acquire`] and [`release`]
/// into explicit operations: whoever holds the lock is responsible for
/// releasing it, and [`release`] fails with [`InvalidState`] if the lock is
/// not held. This shape exists because the [`Condition`](crate::Condition)
/// protocol (release while suspending, reacquire before resuming) cannot
/// be expressed through a scoped guard.
///
/// # Fairness
///
/// This lock is fair: waiters acquire it in the order they began waiting.
/// Releasing a contended lock hands ownership directly to the first live
/// waiter, and the lock is never observably unlocked in between, so a late
/// arrival cannot barge ahead of the queue. At most one waiter is woken per
/// release.
///
/// # Cancellation
///
/// Dropping an [`Acquire`] future abandons the attempt. A waiter that is
/// dropped before being granted the lock is simply removed; a waiter that
/// was already granted the lock but dropped before observing it releases the
/// lock onward, so the wakeup is never lost.
///
/// `Lock` is a cheap handle: clones refer to the same lock.
///
/// [`acquire`]: Self::acquire
/// [`release`]: Self::release
#[derive(Clone)]
pub struct Lock {
    core: Rc<RefCell<Core>>,
}

/// The future returned by the [`Lock::acquire`] method.
#[must_use = "futures do nothing unless `.await`ed or `poll`ed"]
pub struct Acquire {
    lock: Lock,
    state: AcquireState,
}

struct Core {
    locked: bool,
    waiters: VecDeque<Deferred<()>>,
}

enum AcquireState {
    Init,
    Waiting { wait: deferred::Wait<()> },
    Done,
}

// === impl Lock ===

impl Lock {
    /// Returns a new `Lock` in the unlocked state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            core: Rc::new(RefCell::new(Core {
                locked: false,
                waiters: VecDeque::new(),
            })),
        }
    }

    /// Returns `true` if the lock is currently held.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.core.borrow().locked
    }

    /// Acquires the lock, waiting asynchronously until it is available.
    ///
    /// If the lock is not held, the returned future resolves on its first
    /// poll. Otherwise the caller joins a first-in-first-out wait list and
    /// the future resolves once every earlier waiter has held and released
    /// the lock. When the future resolves, the caller holds the lock and
    /// must eventually call [`release`](Self::release).
    pub fn acquire(&self) -> Acquire {
        Acquire {
            lock: self.clone(),
            state: AcquireState::Init,
        }
    }

    /// Releases the lock, handing it to the first live waiter if there is
    /// one.
    ///
    /// # Errors
    ///
    /// Fails with [`InvalidState`] if the lock is not held.
    pub fn release(&self) -> Result<(), InvalidState> {
        {
            let mut core = self.core.borrow_mut();
            if !core.locked {
                return Err(InvalidState::new("released a lock that was not held"));
            }
            core.locked = false;
        }
        trace!("Lock::release");
        self.wake_next();
        Ok(())
    }

    /// Settles the first still-pending waiter; its immediate callback marks
    /// the lock held again before any other task can observe it unlocked.
    fn wake_next(&self) {
        loop {
            let waiter = { self.core.borrow_mut().waiters.pop_front() };
            let Some(waiter) = waiter else { return };
            if waiter.settle(()).is_ok() {
                trace!("Lock::wake_next -> handed off");
                return;
            }
            // Cancelled waiter; try the next one.
        }
    }
}

impl Default for Lock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Lock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.core.borrow();
        f.debug_struct("Lock")
            .field("locked", &core.locked)
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
                    let mut core = this.lock.core.borrow_mut();
                    if !core.locked {
                        core.locked = true;
                        this.state = AcquireState::Done;
                        return Poll::Ready(());
                    }
                    let waiter = Deferred::new();
                    waiter.add_immediate_callback({
                        let lock = this.lock.clone();
                        move |waiter: &Deferred<()>| {
                            if !waiter.is_cancelled() {
                                lock.core.borrow_mut().locked = true;
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
                    // Our waiter settled, so the hand-off callback already
                    // marked the lock held on our behalf.
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
                // The lock was handed to this waiter, but the future was
                // dropped before observing it; pass the lock on so the
                // wakeup is not lost.
                let _ = self.lock.release();
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
            .field("lock", &self.lock)
            .field("state", &state)
            .finish()
    }
}
