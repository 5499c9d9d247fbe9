//! A monitor-style condition variable built on [`Lock`].
//!
//! See the [`Condition`] type's documentation for details.
use crate::{deferred, lock, Deferred, InvalidState, Lock};
use alloc::{collections::VecDeque, rc::Rc};
use core::{
    cell::RefCell,
    fmt,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};


/// A monitor-style condition variable.
///
/// A `Condition` pairs a [`Lock`] with a wait list. A task holding the lock
/// calls [`wait`], which releases the lock, suspends until another task
/// calls [`notify`] or [`notify_all`], and reacquires the lock before
/// resuming; from the waiter's perspective the predicate it re-checks is
/// protected the whole way through.
///
/// The condition either owns a fresh lock ([`new`]) or shares one with other
/// conditions ([`with_lock`]); [`acquire`], [`release`], and [`is_locked`]
/// delegate to it.
///
/// # Cancellation
///
/// Dropping the future returned by [`wait`] abandons the wait. If the waiter
/// had already been notified, the notification is passed to the next waiter
/// rather than being lost.
///
/// [`wait`]: Self::wait
/// [`notify`]: Self::notify
/// [`notify_all`]: Self::notify_all
/// [`new`]: Self::new
/// [`with_lock`]: Self::with_lock
/// [`acquire`]: Self::acquire
/// [`release`]: Self::release
/// [`is_locked`]: Self::is_locked
#[derive(Clone)]
pub struct Condition {
    lock: Lock,
    core: Rc<RefCell<Core>>,
}

/// The future returned by the [`Condition::wait`] method.
#[must_use = "futures do nothing unless `.await`ed or `poll`ed"]
pub struct Wait {
    condition: Condition,
    state: WaitState,
}

struct Core {
    waiters: VecDeque<Deferred<()>>,
}

enum WaitState {
    Init,
    Suspended { wait: deferred::Wait<()> },
    Reacquiring { acquire: lock::Acquire },
    Done,
}

// === impl Condition ===

impl Condition {
    /// Returns a new `Condition` owning a fresh, unlocked [`Lock`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_lock(&Lock::new())
    }

    /// Returns a new `Condition` sharing the provided [`Lock`].
    ///
    /// Several conditions may share one lock; each maintains its own wait
    /// list.
    #[must_use]
    pub fn with_lock(lock: &Lock) -> Self {
        Self {
            lock: lock.clone(),
            core: Rc::new(RefCell::new(Core {
                waiters: VecDeque::new(),
            })),
        }
    }

    /// Returns the [`Lock`] this condition synchronizes on.
    #[must_use]
    pub fn lock(&self) -> &Lock {
        &self.lock
    }

    /// Acquires the underlying lock. See [`Lock::acquire`].
    pub fn acquire(&self) -> lock::Acquire {
        self.lock.acquire()
    }

    /// Releases the underlying lock. See [`Lock::release`].
    ///
    /// # Errors
    ///
    /// Fails with [`InvalidState`] if the lock is not held.
    pub fn release(&self) -> Result<(), InvalidState> {
        self.lock.release()
    }

    /// Returns `true` if the underlying lock is held.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    /// Releases the lock, waits to be notified, and reacquires the lock.
    ///
    /// The returned future resolves to `Ok(())` once the caller has been
    /// notified *and* holds the lock again.
    ///
    /// # Errors
    ///
    /// Resolves to `Err(`[`InvalidState`]`)` if the lock is not held when
    /// the future is first polled.
    pub fn wait(&self) -> Wait {
        Wait {
            condition: self.clone(),
            state: WaitState::Init,
        }
    }

    /// Wakes up to `n` waiters, in the order they began waiting.
    ///
    /// Woken waiters do not resume until they reacquire the lock, which the
    /// caller typically still holds; each resumes as the lock makes its way
    /// down the line.
    ///
    /// # Errors
    ///
    /// Fails with [`InvalidState`] if the lock is not held.
    pub fn notify(&self, n: usize) -> Result<(), InvalidState> {
        if !self.lock.is_locked() {
            return Err(InvalidState::new("notified a condition without holding its lock"));
        }
        let mut remaining = n;
        while remaining > 0 {
            if !self.wake_next() {
                break;
            }
            remaining -= 1;
        }
        trace!(requested = n, woken = n - remaining, "Condition::notify");
        Ok(())
    }

    /// Wakes every current waiter.
    ///
    /// # Errors
    ///
    /// Fails with [`InvalidState`] if the lock is not held.
    pub fn notify_all(&self) -> Result<(), InvalidState> {
        let waiting = self.core.borrow().waiters.len();
        self.notify(waiting)
    }

    /// Settles the first still-pending waiter, returning whether one was
    /// found.
    fn wake_next(&self) -> bool {
        loop {
            let waiter = { self.core.borrow_mut().waiters.pop_front() };
            let Some(waiter) = waiter else { return false };
            if waiter.settle(()).is_ok() {
                return true;
            }
        }
    }
}

impl Default for Condition {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition")
            .field("lock", &self.lock)
            .field("waiters", &self.core.borrow().waiters.len())
            .finish()
    }
}

// === impl Wait ===

impl Future for Wait {
    type Output = Result<(), InvalidState>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        loop {
            match &mut this.state {
                WaitState::Init => {
                    let condition = &this.condition;
                    if !condition.lock.is_locked() {
                        this.state = WaitState::Done;
                        return Poll::Ready(Err(InvalidState::new(
                            "waited on a condition without holding its lock",
                        )));
                    }
                    let waiter = Deferred::new();
                    condition.core.borrow_mut().waiters.push_back(waiter.clone());
                    condition
                        .lock
                        .release()
                        .expect("the lock was verified to be held");
                    this.state = WaitState::Suspended {
                        wait: waiter.wait(),
                    };
                }
                WaitState::Suspended { wait } => match Pin::new(wait).poll(cx) {
                    Poll::Ready(_) => {
                        this.state = WaitState::Reacquiring {
                            acquire: this.condition.lock.acquire(),
                        };
                    }
                    Poll::Pending => return Poll::Pending,
                },
                WaitState::Reacquiring { acquire } => match Pin::new(acquire).poll(cx) {
                    Poll::Ready(()) => {
                        this.state = WaitState::Done;
                        return Poll::Ready(Ok(()));
                    }
                    Poll::Pending => return Poll::Pending,
                },
                WaitState::Done => return Poll::Ready(Ok(())),
            }
        }
    }
}

impl Drop for Wait {
    fn drop(&mut self) {
        match &self.state {
            WaitState::Suspended { wait } => {
                let waiter = wait.deferred();
                if !waiter.cancel() && !waiter.is_cancelled() {
                    // Notified but never resumed; move the notification
                    // along so it is not lost.
                    self.condition.wake_next();
                }
            }
            WaitState::Reacquiring { .. } => {
                // The notification was consumed but the waiter will never
                // resume; pass it on. Dropping the inner `Acquire` future
                // deals with the lock itself.
                self.condition.wake_next();
            }
            WaitState::Init | WaitState::Done => {}
        }
    }
}

impl fmt::Debug for Wait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            WaitState::Init => "Init",
            WaitState::Suspended { .. } => "Suspended",
            WaitState::Reacquiring { .. } => "Reacquiring",
            WaitState::Done => "Done",
        };
        f.debug_struct("Wait")
            .field("condition", &self.condition)
            .field("state", &state)
            .finish()
    }
}
