//! A latching event that wakes all waiters when set.
//!
//! See the [`Event`] type's documentation for details.
use crate::{deferred, Deferred};
use alloc::{rc::Rc, vec::Vec};
use core::{
    cell::RefCell,
    fmt,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};


/// A latching event.
///
/// An `Event` is a boolean flag that tasks can [`wait`] on. [`set`] latches
/// the flag and resolves every current waiter at once; this is the one
/// wake-all primitive in this crate, everything else passes wakeups one at a
/// time. While the event remains set, new waiters resolve immediately.
/// [`clear`] unlatches the flag for future waiters without revoking anything
/// already resolved.
///
/// `Event` is a cheap handle: clones refer to the same flag.
///
/// [`wait`]: Self::wait
/// [`set`]: Self::set
/// [`clear`]: Self::clear
#[derive(Clone)]
pub struct Event {
    core: Rc<RefCell<Core>>,
}

/// The future returned by the [`Event::wait`] method.
#[must_use = "futures do nothing unless `.await`ed or `poll`ed"]
pub struct Wait {
    event: Event,
    state: WaitState,
}

struct Core {
    is_set: bool,
    waiters: Vec<Deferred<()>>,
}

enum WaitState {
    Init,
    Waiting { wait: deferred::Wait<()> },
    Done,
}

// === impl Event ===

impl Event {
    /// Returns a new `Event` in the unset state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            core: Rc::new(RefCell::new(Core {
                is_set: false,
                waiters: Vec::new(),
            })),
        }
    }

    /// Latches the event, resolving every current waiter.
    ///
    /// Setting an already-set event does nothing.
    pub fn set(&self) {
        let waiters = {
            let mut core = self.core.borrow_mut();
            if core.is_set {
                return;
            }
            core.is_set = true;
            core.waiters.split_off(0)
        };
        trace!(waiters = waiters.len(), "Event::set");
        for waiter in waiters {
            // Cancelled waiters are skipped.
            let _ = waiter.settle(());
        }
    }

    /// Unlatches the event.
    ///
    /// Waiters that already resolved are unaffected; waiters registered
    /// after this call wait for the next [`set`](Self::set).
    pub fn clear(&self) {
        self.core.borrow_mut().is_set = false;
    }

    /// Returns `true` if the event is currently set.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.core.borrow().is_set
    }

    /// Returns a future that resolves once the event is set.
    ///
    /// If the event is already set, the future resolves on its first poll.
    pub fn wait(&self) -> Wait {
        Wait {
            event: self.clone(),
            state: WaitState::Init,
        }
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.core.borrow();
        f.debug_struct("Event")
            .field("is_set", &core.is_set)
            .field("waiters", &core.waiters.len())
            .finish()
    }
}

// === impl Wait ===

impl Future for Wait {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        loop {
            match &mut this.state {
                WaitState::Init => {
                    let mut core = this.event.core.borrow_mut();
                    if core.is_set {
                        this.state = WaitState::Done;
                        return Poll::Ready(());
                    }
                    let waiter = Deferred::new();
                    // Every waiter unregisters itself on resolution or
                    // cancellation, so waiters abandoned before the event
                    // is ever set cannot pile up in the list.
                    waiter.add_immediate_callback({
                        let event = this.event.clone();
                        move |_| {
                            event
                                .core
                                .borrow_mut()
                                .waiters
                                .retain(|waiter| !waiter.is_done());
                        }
                    });
                    core.waiters.push(waiter.clone());
                    drop(core);
                    this.state = WaitState::Waiting {
                        wait: waiter.wait(),
                    };
                }
                WaitState::Waiting { wait } => match Pin::new(wait).poll(cx) {
                    // Once settled, the wakeup is final: clearing the event
                    // does not revoke it.
                    Poll::Ready(_) => {
                        this.state = WaitState::Done;
                        return Poll::Ready(());
                    }
                    Poll::Pending => return Poll::Pending,
                },
                WaitState::Done => return Poll::Ready(()),
            }
        }
    }
}

impl Drop for Wait {
    fn drop(&mut self) {
        if let WaitState::Waiting { wait } = &self.state {
            // No forwarding is needed: `set` wakes every waiter, so an
            // abandoned waiter cannot have swallowed a peer's signal.
            wait.deferred().cancel();
        }
    }
}

impl fmt::Debug for Wait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            WaitState::Init => "Init",
            WaitState::Waiting { .. } => "Waiting",
            WaitState::Done => "Done",
        };
        f.debug_struct("Wait")
            .field("event", &self.event)
            .field("state", &state)
            .finish()
    }
}
