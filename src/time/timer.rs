//! A [`Timer`] tracks sleeping tasks and wakes them when their deadlines
//! pass.
use super::clock::{Clock, Ticks};
use crate::deferred::{self, Deferred};
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

/// A `Timer` tracks [`Sleep`] futures and completes them when its [`Clock`]
/// advances past their deadlines.
///
/// # Driving the timer
///
/// ⚠️ *A timer at rest will remain at rest unless acted upon by an outside
/// force!*
///
/// A `Timer` never advances on its own. The surrounding runtime must call
/// [`turn`](Self::turn) periodically (typically once per executor tick),
/// which reads the clock and fires every sleep whose deadline has passed.
/// Turning the timer more frequently fires [`Sleep`] futures with finer
/// resolution; turning it less frequently adds latency to their completion.
///
/// `Timer` is a cheap handle: clones refer to the same set of sleepers.
#[derive(Clone)]
pub struct Timer {
    clock: Clock,
    core: Rc<RefCell<Core>>,
}

/// A [`Future`] that completes after a specified number of milliseconds.
///
/// This future is returned by the [`Timer::sleep`] method. Dropping a
/// `Sleep` cancels it; the timer forgets the entry when its deadline comes
/// up.
#[must_use = "futures do nothing unless `.await`ed or `poll`ed"]
pub struct Sleep {
    deadline: Ticks,
    waiter: Deferred<()>,
    wait: deferred::Wait<()>,
}

struct Core {
    /// Sleepers ordered by deadline, earliest first. Entries whose sleep was
    /// dropped stay in place (settling them is a no-op) and are discarded
    /// when their deadline comes up.
    entries: VecDeque<Entry>,
}

struct Entry {
    deadline: Ticks,
    waiter: Deferred<()>,
}

// === impl Timer ===

impl Timer {
    /// Returns a new `Timer` reading time from the provided [`Clock`].
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            core: Rc::new(RefCell::new(Core {
                entries: VecDeque::new(),
            })),
        }
    }

    /// Returns the [`Clock`] this timer reads time from.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Returns the current timestamp according to this timer's clock.
    #[must_use]
    pub fn now(&self) -> Ticks {
        self.clock.now()
    }

    /// Returns a [`Sleep`] future that completes `ms` milliseconds from now.
    ///
    /// The future completes on the first call to [`turn`](Self::turn) whose
    /// clock reading is at or past the deadline.
    pub fn sleep(&self, ms: Ticks) -> Sleep {
        let deadline = self.clock.now().saturating_add(ms);
        let waiter = Deferred::new();
        let mut core = self.core.borrow_mut();
        let idx = core
            .entries
            .partition_point(|entry| entry.deadline <= deadline);
        core.entries.insert(
            idx,
            Entry {
                deadline,
                waiter: waiter.clone(),
            },
        );
        trace!(deadline, ms, "Timer::sleep");
        Sleep {
            deadline,
            wait: waiter.wait(),
            waiter,
        }
    }

    /// Fires every sleeper whose deadline is at or before the clock's
    /// current reading, returning the number of sleeps that completed.
    pub fn turn(&self) -> usize {
        let now = self.clock.now();
        let mut fired = 0;
        loop {
            let waiter = {
                let mut core = self.core.borrow_mut();
                match core.entries.front() {
                    Some(entry) if entry.deadline <= now => {
                        let entry = core
                            .entries
                            .pop_front()
                            .expect("front() just returned Some");
                        entry.waiter
                    }
                    _ => break,
                }
            };
            // Cancelled sleeps fail to settle; they don't count as fired.
            if waiter.settle(()).is_ok() {
                fired += 1;
            }
        }
        if fired > 0 {
            trace!(now, fired, "Timer::turn");
        }
        fired
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("clock", &self.clock)
            .field("sleeping", &self.core.borrow().entries.len())
            .finish()
    }
}

// === impl Sleep ===

impl Sleep {
    /// Returns the deadline at which this `Sleep` future will complete.
    #[must_use]
    pub fn deadline(&self) -> Ticks {
        self.deadline
    }
}

impl Future for Sleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.wait).poll(cx).map(|_| ())
    }
}

impl Drop for Sleep {
    fn drop(&mut self) {
        self.waiter.cancel();
    }
}

impl fmt::Debug for Sleep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sleep")
            .field("deadline", &self.deadline)
            .field("waiter", &self.waiter)
            .finish()
    }
}
