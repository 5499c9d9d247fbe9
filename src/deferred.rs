//! A one-shot, externally-completable awaitable.
//!
//! See the [`Deferred`] type's documentation for details.
use crate::{Cancelled, InvalidState};
use alloc::{boxed::Box, rc::Rc, vec::Vec};
use core::{
    cell::RefCell,
    fmt,
    future::Future,
    mem,
    pin::Pin,
    task::{Context, Poll, Waker},
};


/// A one-shot completion token that can be settled, failed, or cancelled from
/// outside the task awaiting it.
///
/// A `Deferred` starts out *pending* and makes exactly one transition: to a
/// value (via [`settle`]), to an error (via [`fail`]), or to the cancelled
/// state (via [`cancel`]). Transitions are monotonic: once a deferred has
/// completed, further transition attempts fail with [`InvalidState`] (or, for
/// [`cancel`], return `false` and do nothing).
///
/// A `Deferred` is a cheap handle: cloning it yields another handle to the
/// same completion cell, and any number of handles may be awaited
/// concurrently via [`wait`]. Awaiting observes the settled value as the
/// output, and an error or cancellation as a failure.
///
/// # Immediate callbacks
///
/// Completion notifies interested parties through two distinct channels:
///
/// - *awaiters* ([`wait`]) are woken, and their continuations run whenever
///   the executor next polls them;
/// - *immediate callbacks* ([`add_immediate_callback`]) run synchronously,
///   in registration order, inside the call that performs the transition,
///   before it returns.
///
/// The second channel exists because a primitive that grants a resource to a
/// waiter must finalize its bookkeeping (mark a lock held, consume a permit)
/// before any other task can observe an inconsistent state. A continuation
/// deferred to a later poll cannot provide that guarantee; a synchronous
/// callback can. The synchronization primitives in this crate are built on
/// exactly this distinction.
///
/// # Cancellation
///
/// [`cancel`] transitions a pending deferred to the cancelled state and runs
/// its immediate callbacks; awaiters observe `Err(Cancelled.into())`.
/// Callbacks can distinguish the two completion flavors with
/// [`is_cancelled`].
///
/// [`settle`]: Self::settle
/// [`fail`]: Self::fail
/// [`cancel`]: Self::cancel
/// [`wait`]: Self::wait
/// [`add_immediate_callback`]: Self::add_immediate_callback
/// [`is_cancelled`]: Self::is_cancelled
pub struct Deferred<T, E = Cancelled> {
    shared: Rc<RefCell<Shared<T, E>>>,
}

/// The future returned by the [`Deferred::wait`] method.
#[must_use = "futures do nothing unless `.await`ed or `poll`ed"]
pub struct Wait<T, E = Cancelled> {
    deferred: Deferred<T, E>,
    slot: Option<usize>,
}

type Callback<T, E> = Box<dyn FnOnce(&Deferred<T, E>)>;

struct Shared<T, E> {
    state: State<T, E>,
    callbacks: Vec<Callback<T, E>>,
    /// One waker slot per live [`Wait`] future.
    wakers: Vec<Option<Waker>>,
    #[cfg(feature = "std")]
    origin: Option<std::backtrace::Backtrace>,
}

enum State<T, E> {
    Pending,
    Value(T),
    Error(E),
    Cancelled,
}

// === impl Deferred ===

impl<T, E> Deferred<T, E> {
    /// Returns a new, pending `Deferred`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Rc::new(RefCell::new(Shared {
                state: State::Pending,
                callbacks: Vec::new(),
                wakers: Vec::new(),
                #[cfg(feature = "std")]
                origin: None,
            })),
        }
    }

    feature! {
        #![feature = "std"]

        /// Returns a new, pending `Deferred` that records the stack at its
        /// construction.
        ///
        /// If the last handle to a traced deferred is dropped while it is
        /// still pending, a `tracing` warning carrying the construction
        /// backtrace is emitted. This is purely a diagnostic for finding
        /// forgotten completions; it never changes observable behavior.
        #[must_use]
        pub fn traced() -> Self {
            let this = Self::new();
            this.shared.borrow_mut().origin =
                Some(std::backtrace::Backtrace::capture());
            this
        }
    }

    /// Completes this deferred with `value`, waking all awaiters.
    ///
    /// Immediate callbacks run synchronously, in registration order, before
    /// this method returns. Awaiters are woken and observe `Ok(value)` when
    /// next polled.
    ///
    /// # Errors
    ///
    /// Fails with [`InvalidState`] if the deferred has already settled,
    /// failed, or been cancelled. The outcome is unchanged in that case.
    pub fn settle(&self, value: T) -> Result<(), InvalidState> {
        self.transition(State::Value(value))
    }

    /// Completes this deferred with `error`.
    ///
    /// Behaves like [`settle`](Self::settle), except that awaiters observe
    /// `Err(error)`.
    ///
    /// # Errors
    ///
    /// Fails with [`InvalidState`] if the deferred has already completed.
    pub fn fail(&self, error: E) -> Result<(), InvalidState> {
        self.transition(State::Error(error))
    }

    /// Cancels this deferred if it is still pending.
    ///
    /// Immediate callbacks run synchronously before this method returns, and
    /// awaiters observe `Err(Cancelled.into())` when next polled. Returns
    /// `true` if this call performed the cancellation; cancelling a deferred
    /// that has already completed is a no-op returning `false`.
    pub fn cancel(&self) -> bool {
        self.transition(State::Cancelled).is_ok()
    }

    /// Returns `true` if this deferred has completed (settled, failed, or
    /// been cancelled).
    #[must_use]
    pub fn is_done(&self) -> bool {
        !matches!(self.shared.borrow().state, State::Pending)
    }

    /// Returns `true` if this deferred was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self.shared.borrow().state, State::Cancelled)
    }

    /// Returns the settled value.
    ///
    /// # Errors
    ///
    /// Fails with [`InvalidState`] while the deferred is pending, if it
    /// failed with an error, or if it was cancelled.
    pub fn result(&self) -> Result<T, InvalidState>
    where
        T: Clone,
    {
        match &self.shared.borrow().state {
            State::Value(value) => Ok(value.clone()),
            State::Error(_) => Err(InvalidState::new("deferred completed with an error")),
            State::Cancelled => Err(InvalidState::new("deferred was cancelled")),
            State::Pending => Err(InvalidState::new("deferred has not completed yet")),
        }
    }

    /// Returns the error this deferred completed with.
    ///
    /// A cancelled deferred reports `Cancelled` converted into `E`.
    ///
    /// # Errors
    ///
    /// Fails with [`InvalidState`] while the deferred is pending or if it
    /// settled with a value.
    pub fn error(&self) -> Result<E, InvalidState>
    where
        E: Clone + From<Cancelled>,
    {
        match &self.shared.borrow().state {
            State::Error(error) => Ok(error.clone()),
            State::Cancelled => Ok(E::from(Cancelled::new())),
            State::Value(_) => Err(InvalidState::new("deferred completed with a value")),
            State::Pending => Err(InvalidState::new("deferred has not completed yet")),
        }
    }

    /// Registers a callback to run synchronously when this deferred
    /// completes.
    ///
    /// If the deferred is still pending, the callback is appended and will
    /// run (in registration order, inside whichever of [`settle`],
    /// [`fail`], or [`cancel`] performs the transition) before any awaiter
    /// resumes. If the deferred has already completed, the callback is
    /// invoked synchronously before this method returns.
    ///
    /// [`settle`]: Self::settle
    /// [`fail`]: Self::fail
    /// [`cancel`]: Self::cancel
    pub fn add_immediate_callback<F>(&self, callback: F)
    where
        F: FnOnce(&Self) + 'static,
    {
        {
            let mut shared = self.shared.borrow_mut();
            if matches!(shared.state, State::Pending) {
                shared.callbacks.push(Box::new(callback));
                return;
            }
        }
        callback(self);
    }

    /// Returns a future that resolves when this deferred completes.
    ///
    /// The future's output is `Ok(value)` if the deferred settles,
    /// `Err(error)` if it fails, and `Err(Cancelled.into())` if it is
    /// cancelled. Any number of `Wait` futures may await the same deferred;
    /// each observes the outcome independently (hence the `Clone` bounds on
    /// the [`Future`] impl).
    pub fn wait(&self) -> Wait<T, E> {
        Wait {
            deferred: self.clone(),
            slot: None,
        }
    }

    fn transition(&self, next: State<T, E>) -> Result<(), InvalidState> {
        let (callbacks, wakers) = {
            let mut shared = self.shared.borrow_mut();
            if !matches!(shared.state, State::Pending) {
                return Err(InvalidState::new("deferred has already completed"));
            }
            shared.state = next;
            (
                mem::take(&mut shared.callbacks),
                mem::take(&mut shared.wakers),
            )
        };
        for callback in callbacks {
            callback(self);
        }
        for waker in wakers.into_iter().flatten() {
            waker.wake();
        }
        Ok(())
    }
}

impl<T, E> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T, E> Default for Deferred<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> fmt::Debug for Deferred<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.shared.borrow().state {
            State::Pending => "Pending",
            State::Value(_) => "Value",
            State::Error(_) => "Error",
            State::Cancelled => "Cancelled",
        };
        f.debug_struct("Deferred").field("state", &state).finish()
    }
}

impl<T, E> Drop for Deferred<T, E> {
    fn drop(&mut self) {
        if Rc::strong_count(&self.shared) != 1 {
            return;
        }
        let shared = self.shared.borrow();
        if !matches!(shared.state, State::Pending) {
            return;
        }
        #[cfg(feature = "std")]
        if let Some(origin) = &shared.origin {
            let _ = origin;
            warn!(
                backtrace = %origin,
                "deferred dropped while still pending; it will never complete",
            );
        }
    }
}

// === impl Wait ===

impl<T, E> Wait<T, E> {
    /// Returns the [`Deferred`] this future is waiting on.
    #[must_use]
    pub fn deferred(&self) -> &Deferred<T, E> {
        &self.deferred
    }
}

impl<T, E> Future for Wait<T, E>
where
    T: Clone,
    E: Clone + From<Cancelled>,
{
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let mut shared = this.deferred.shared.borrow_mut();
        let shared = &mut *shared;
        match &shared.state {
            State::Pending => {
                match this.slot {
                    Some(slot) => {
                        let registered = &mut shared.wakers[slot];
                        let current = registered
                            .as_ref()
                            .is_some_and(|waker| waker.will_wake(cx.waker()));
                        if !current {
                            *registered = Some(cx.waker().clone());
                        }
                    }
                    None => {
                        shared.wakers.push(Some(cx.waker().clone()));
                        this.slot = Some(shared.wakers.len() - 1);
                    }
                }
                Poll::Pending
            }
            State::Value(value) => Poll::Ready(Ok(value.clone())),
            State::Error(error) => Poll::Ready(Err(error.clone())),
            State::Cancelled => Poll::Ready(Err(E::from(Cancelled::new()))),
        }
    }
}

impl<T, E> Drop for Wait<T, E> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot {
            // The waker vec is drained wholesale on completion, so the slot
            // may be gone already.
            let mut shared = self.deferred.shared.borrow_mut();
            if let Some(registered) = shared.wakers.get_mut(slot) {
                *registered = None;
            }
        }
    }
}

impl<T, E> fmt::Debug for Wait<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wait")
            .field("deferred", &self.deferred)
            .field("slot", &self.slot)
            .finish()
    }
}
