//! A bounded pipeline of futures whose results are yielded in completion
//! order.
//!
//! See the [`UnorderedWorkQueue`] type's documentation for details.
use crate::{deferred, util::next_live, Deferred};
use alloc::{
    boxed::Box,
    collections::{BTreeMap, VecDeque},
    rc::Rc,
    vec::Vec,
};
use core::{
    cell::RefCell,
    fmt,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};


type BoxFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>>>>;

/// A bounded in-flight pipeline of futures whose results are yielded in the
/// order they *complete*, not the order they were submitted.
///
/// Work is submitted with [`put`] and results are claimed with [`get`] (or
/// iterated with [`next`]). The queue applies backpressure on two axes:
///
/// - **`max_pending`** bounds how many submitted futures may be in flight at
///   once;
/// - **`max_fulfilled`** bounds how many completed-but-unclaimed results may
///   accumulate.
///
/// [`put`] waits whenever either bound would be exceeded. A future that
/// completes while the fulfilled side is full leaves the pending set and its
/// result is parked until a consumer frees a slot, at which point it is
/// promoted (exactly once) into the fulfilled queue.
///
/// # Driving
///
/// The queue does not own an executor. Submitted futures are advanced
/// whenever one of the queue's own futures ([`put`], [`get`], [`next`]) is
/// polled, and a completion wakes the task that was driving, so simply
/// awaiting `get` (or a blocked `put`) is what makes the submitted work run
/// to completion.
///
/// # Errors
///
/// Each result is delivered as the submitted future's own
/// `Result<T, E>`: [`get`] hands back `Err` outcomes exactly like `Ok`
/// ones. During iteration with [`next`], an `Err` outcome ends the
/// iteration unless the queue was built with
/// [`allow_errors`](Builder::allow_errors), in which case errors are
/// yielded as ordinary items and iteration continues.
///
/// `UnorderedWorkQueue` is a cheap handle: clones refer to the same
/// pipeline.
///
/// [`put`]: Self::put
/// [`get`]: Self::get
/// [`next`]: Self::next
pub struct UnorderedWorkQueue<T, E> {
    core: Rc<RefCell<Core<T, E>>>,
}

/// Configures an [`UnorderedWorkQueue`] before it is built.
///
/// Returned by [`UnorderedWorkQueue::builder`].
#[derive(Copy, Clone, Debug, Default)]
#[must_use = "a Builder does nothing unless `build()` is called"]
pub struct Builder {
    max_pending: Option<usize>,
    max_fulfilled: Option<usize>,
    allow_errors: bool,
}

struct Core<T, E> {
    max_pending: Option<usize>,
    max_fulfilled: Option<usize>,
    allow_errors: bool,
    next_id: u64,
    /// Admitted futures that have not yet completed.
    pending: BTreeMap<u64, BoxFuture<T, E>>,
    /// Completed while the fulfilled side was full; promoted when a slot
    /// frees up.
    parked: VecDeque<Envelope<T, E>>,
    /// Completed results awaiting a consumer, in completion order.
    fulfilled: VecDeque<Envelope<T, E>>,
    getters: VecDeque<Deferred<()>>,
    putters: VecDeque<Deferred<()>>,
    /// Set when `next` delivered an error with `allow_errors` unset.
    faulted: bool,
}

/// A completed result. The outcome is kept wrapped so that a future
/// resolving to another future is never implicitly flattened in storage.
struct Envelope<T, E> {
    #[cfg_attr(not(any(test, feature = "tracing")), allow(dead_code))]
    id: u64,
    outcome: Result<T, E>,
}

// === impl Builder ===

impl Builder {
    /// Returns a builder with no bounds and `allow_errors` unset.
    pub fn new() -> Self {
        Self {
            max_pending: None,
            max_fulfilled: None,
            allow_errors: false,
        }
    }

    /// Bounds the number of submitted futures that may be in flight at
    /// once.
    ///
    /// # Panics
    ///
    /// If `limit` is zero.
    pub fn max_pending(mut self, limit: usize) -> Self {
        assert!(limit > 0, "max_pending must admit at least one future");
        self.max_pending = Some(limit);
        self
    }

    /// Bounds the number of completed-but-unclaimed results.
    ///
    /// # Panics
    ///
    /// If `limit` is zero.
    pub fn max_fulfilled(mut self, limit: usize) -> Self {
        assert!(limit > 0, "max_fulfilled must hold at least one result");
        self.max_fulfilled = Some(limit);
        self
    }

    /// Makes [`next`](UnorderedWorkQueue::next) yield `Err` outcomes as
    /// ordinary items instead of ending the iteration.
    pub fn allow_errors(mut self, allow: bool) -> Self {
        self.allow_errors = allow;
        self
    }

    /// Builds the queue.
    pub fn build<T, E>(self) -> UnorderedWorkQueue<T, E> {
        UnorderedWorkQueue {
            core: Rc::new(RefCell::new(Core {
                max_pending: self.max_pending,
                max_fulfilled: self.max_fulfilled,
                allow_errors: self.allow_errors,
                next_id: 0,
                pending: BTreeMap::new(),
                parked: VecDeque::new(),
                fulfilled: VecDeque::new(),
                getters: VecDeque::new(),
                putters: VecDeque::new(),
                faulted: false,
            })),
        }
    }
}

// === impl UnorderedWorkQueue ===

impl<T, E> UnorderedWorkQueue<T, E> {
    /// Returns a new queue with no bounds on either axis.
    #[must_use]
    pub fn new() -> Self {
        Builder::new().build()
    }

    /// Returns a [`Builder`] for configuring bounds and error handling.
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Submits a future to the pipeline, waiting while either bound is at
    /// its limit.
    ///
    /// The returned future resolves, once the work has been admitted, to
    /// the monotonically increasing id allocated for it.
    pub fn put<F>(&self, future: F) -> Put<T, E>
    where
        F: Future<Output = Result<T, E>> + 'static,
    {
        Put {
            core: self.core.clone(),
            future: Some(Box::pin(future)),
            state: PutState::Init,
        }
    }

    /// Claims the next completed result, waiting while none is available.
    ///
    /// Results are delivered strictly in the order the submitted futures
    /// completed; an `Err` outcome is delivered like any other.
    pub fn get(&self) -> Get<T, E> {
        Get {
            core: self.core.clone(),
            state: GetState::Init,
        }
    }

    /// Claims the next completed result, or `None` once nothing is in
    /// flight and nothing is unclaimed.
    ///
    /// With [`allow_errors`](Builder::allow_errors) unset, delivering an
    /// `Err` outcome ends the iteration: every later call resolves to
    /// `None`.
    pub fn next(&self) -> Next<T, E> {
        Next {
            core: self.core.clone(),
            state: GetState::Init,
        }
    }

    /// Returns the number of submitted futures still in flight.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.core.borrow().pending.len()
    }

    /// Returns the number of completed results awaiting a consumer.
    #[must_use]
    pub fn fulfilled(&self) -> usize {
        self.core.borrow().fulfilled.len()
    }
}

impl<T, E> Clone for UnorderedWorkQueue<T, E> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<T, E> Default for UnorderedWorkQueue<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> fmt::Debug for UnorderedWorkQueue<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.core.borrow();
        f.debug_struct("UnorderedWorkQueue")
            .field("pending", &core.pending.len())
            .field("parked", &core.parked.len())
            .field("fulfilled", &core.fulfilled.len())
            .field("max_pending", &core.max_pending)
            .field("max_fulfilled", &core.max_fulfilled)
            .finish()
    }
}

// === core operations ===

impl<T, E> Core<T, E> {
    fn fulfilled_full(&self) -> bool {
        self.max_fulfilled
            .is_some_and(|limit| self.fulfilled.len() >= limit)
    }

    fn can_put(&self) -> bool {
        let pending_ok = self
            .max_pending
            .map_or(true, |limit| self.pending.len() < limit);
        pending_ok && !self.fulfilled_full()
    }

    fn is_drained(&self) -> bool {
        self.pending.is_empty() && self.parked.is_empty() && self.fulfilled.is_empty()
    }
}

/// Advances every in-flight future, promoting completions.
///
/// The current task's waker is registered with each still-pending future,
/// so a later completion re-polls whichever queue future called this.
fn drive<T, E>(core_rc: &Rc<RefCell<Core<T, E>>>, cx: &mut Context<'_>) {
    let ids: Vec<u64> = core_rc.borrow().pending.keys().copied().collect();
    for id in ids {
        // The future is taken out of the map while being polled, so the
        // work item itself may freely re-enter the queue.
        let future = core_rc.borrow_mut().pending.remove(&id);
        let Some(mut future) = future else { continue };
        match future.as_mut().poll(cx) {
            Poll::Pending => {
                core_rc.borrow_mut().pending.insert(id, future);
            }
            Poll::Ready(outcome) => {
                trace!(id, "UnorderedWorkQueue::drive -> completed");
                let getter = {
                    let mut core = core_rc.borrow_mut();
                    let envelope = Envelope { id, outcome };
                    if core.fulfilled_full() {
                        core.parked.push_back(envelope);
                        None
                    } else {
                        core.fulfilled.push_back(envelope);
                        next_live(&mut core.getters)
                    }
                };
                if let Some(getter) = getter {
                    let _ = getter.settle(());
                }
                // The pending set shrank, which may have opened the gate.
                wake_putter(core_rc);
            }
        }
    }
}

/// Wakes one waiting producer if admission is currently possible.
fn wake_putter<T, E>(core_rc: &Rc<RefCell<Core<T, E>>>) {
    let putter = {
        let mut core = core_rc.borrow_mut();
        if core.can_put() {
            next_live(&mut core.putters)
        } else {
            None
        }
    };
    if let Some(putter) = putter {
        let _ = putter.settle(());
    }
}

/// Takes the next completed result, promoting a parked completion into the
/// freed slot and waking whoever can now make progress.
fn take_envelope<T, E>(core_rc: &Rc<RefCell<Core<T, E>>>) -> Option<Envelope<T, E>> {
    let (envelope, getter, drained_getters) = {
        let mut core = core_rc.borrow_mut();
        let envelope = core.fulfilled.pop_front()?;
        let getter = match core.parked.pop_front() {
            Some(parked) => {
                core.fulfilled.push_back(parked);
                next_live(&mut core.getters)
            }
            None => None,
        };
        // Once the pipeline is completely drained, every parked consumer is
        // woken so iterators can observe the end of the stream.
        let drained_getters = if core.is_drained() {
            core.getters.split_off(0)
        } else {
            VecDeque::new()
        };
        (envelope, getter, drained_getters)
    };
    if let Some(getter) = getter {
        let _ = getter.settle(());
    }
    for getter in drained_getters {
        let _ = getter.settle(());
    }
    wake_putter(core_rc);
    trace!(id = envelope.id, "UnorderedWorkQueue::take -> delivering");
    Some(envelope)
}

/// Registers a fresh consumer-side waiter.
fn park_getter<T, E>(core_rc: &Rc<RefCell<Core<T, E>>>) -> deferred::Wait<()> {
    let waiter = Deferred::new();
    core_rc.borrow_mut().getters.push_back(waiter.clone());
    waiter.wait()
}

// === futures ===

/// The future returned by the [`UnorderedWorkQueue::put`] method.
#[must_use = "futures do nothing unless `.await`ed or `poll`ed"]
pub struct Put<T, E> {
    core: Rc<RefCell<Core<T, E>>>,
    future: Option<BoxFuture<T, E>>,
    state: PutState,
}

enum PutState {
    Init,
    Waiting { wait: deferred::Wait<()> },
    Done { id: u64 },
}

/// The future returned by the [`UnorderedWorkQueue::get`] method.
#[must_use = "futures do nothing unless `.await`ed or `poll`ed"]
pub struct Get<T, E> {
    core: Rc<RefCell<Core<T, E>>>,
    state: GetState,
}

/// The future returned by the [`UnorderedWorkQueue::next`] method.
#[must_use = "futures do nothing unless `.await`ed or `poll`ed"]
pub struct Next<T, E> {
    core: Rc<RefCell<Core<T, E>>>,
    state: GetState,
}

enum GetState {
    Init,
    Waiting { wait: deferred::Wait<()> },
    Done,
}

// === impl Put ===

impl<T, E> Future for Put<T, E> {
    type Output = u64;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        loop {
            match &mut this.state {
                PutState::Init => {
                    drive(&this.core, cx);
                    let admitted = {
                        let mut core = this.core.borrow_mut();
                        if core.can_put() {
                            let id = core.next_id;
                            core.next_id += 1;
                            let future = this
                                .future
                                .take()
                                .expect("a pending Put future always holds its work item");
                            core.pending.insert(id, future);
                            Some(id)
                        } else {
                            None
                        }
                    };
                    match admitted {
                        Some(id) => {
                            trace!(id, "UnorderedWorkQueue::put -> admitted");
                            // Start the newly admitted future, so that its
                            // completion is noticed without further
                            // submissions.
                            drive(&this.core, cx);
                            this.state = PutState::Done { id };
                            return Poll::Ready(id);
                        }
                        None => {
                            let waiter = Deferred::new();
                            this.core.borrow_mut().putters.push_back(waiter.clone());
                            this.state = PutState::Waiting {
                                wait: waiter.wait(),
                            };
                        }
                    }
                }
                PutState::Waiting { wait } => {
                    // The wake may be a completion of an in-flight future
                    // rather than a settled admission ticket; promoting it
                    // is what opens the gate.
                    drive(&this.core, cx);
                    match Pin::new(wait).poll(cx) {
                        // Woken with the gate open; re-check, since another
                        // producer may have been admitted first.
                        Poll::Ready(_) => this.state = PutState::Init,
                        Poll::Pending => return Poll::Pending,
                    }
                }
                PutState::Done { id } => return Poll::Ready(*id),
            }
        }
    }
}

impl<T, E> Drop for Put<T, E> {
    fn drop(&mut self) {
        if let PutState::Waiting { wait } = &self.state {
            let waiter = wait.deferred();
            if !waiter.cancel() && !waiter.is_cancelled() {
                wake_putter(&self.core);
            }
        }
    }
}

impl<T, E> fmt::Debug for Put<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            PutState::Init => "Init",
            PutState::Waiting { .. } => "Waiting",
            PutState::Done { .. } => "Done",
        };
        f.debug_struct("Put").field("state", &state).finish()
    }
}

// === impl Get ===

impl<T, E> Future for Get<T, E> {
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        loop {
            match &mut this.state {
                GetState::Init => {
                    drive(&this.core, cx);
                    match take_envelope(&this.core) {
                        Some(envelope) => {
                            this.state = GetState::Done;
                            return Poll::Ready(envelope.outcome);
                        }
                        None => {
                            this.state = GetState::Waiting {
                                wait: park_getter(&this.core),
                            };
                        }
                    }
                }
                GetState::Waiting { wait } => {
                    // A completion wakes the driving task directly; promote
                    // it (which settles our waiter) before polling.
                    drive(&this.core, cx);
                    match Pin::new(wait).poll(cx) {
                        Poll::Ready(_) => this.state = GetState::Init,
                        Poll::Pending => return Poll::Pending,
                    }
                }
                GetState::Done => panic!("Get polled after completion"),
            }
        }
    }
}

impl<T, E> Drop for Get<T, E> {
    fn drop(&mut self) {
        if let GetState::Waiting { wait } = &self.state {
            let waiter = wait.deferred();
            if !waiter.cancel() && !waiter.is_cancelled() {
                // A result was announced to this getter but never claimed;
                // pass the announcement to the next consumer.
                let getter = {
                    let mut core = self.core.borrow_mut();
                    if core.fulfilled.is_empty() {
                        None
                    } else {
                        next_live(&mut core.getters)
                    }
                };
                if let Some(getter) = getter {
                    let _ = getter.settle(());
                }
            }
        }
    }
}

impl<T, E> fmt::Debug for Get<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            GetState::Init => "Init",
            GetState::Waiting { .. } => "Waiting",
            GetState::Done => "Done",
        };
        f.debug_struct("Get").field("state", &state).finish()
    }
}

// === impl Next ===

impl<T, E> Future for Next<T, E> {
    type Output = Option<Result<T, E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        loop {
            match &mut this.state {
                GetState::Init => {
                    drive(&this.core, cx);
                    if this.core.borrow().faulted {
                        this.state = GetState::Done;
                        return Poll::Ready(None);
                    }
                    match take_envelope(&this.core) {
                        Some(envelope) => {
                            if envelope.outcome.is_err() {
                                let mut core = this.core.borrow_mut();
                                if !core.allow_errors {
                                    core.faulted = true;
                                }
                            }
                            this.state = GetState::Done;
                            return Poll::Ready(Some(envelope.outcome));
                        }
                        None => {
                            if this.core.borrow().is_drained() {
                                this.state = GetState::Done;
                                return Poll::Ready(None);
                            }
                            this.state = GetState::Waiting {
                                wait: park_getter(&this.core),
                            };
                        }
                    }
                }
                GetState::Waiting { wait } => {
                    drive(&this.core, cx);
                    match Pin::new(wait).poll(cx) {
                        Poll::Ready(_) => this.state = GetState::Init,
                        Poll::Pending => return Poll::Pending,
                    }
                }
                GetState::Done => panic!("Next polled after completion"),
            }
        }
    }
}

impl<T, E> Drop for Next<T, E> {
    fn drop(&mut self) {
        if let GetState::Waiting { wait } = &self.state {
            let waiter = wait.deferred();
            if !waiter.cancel() && !waiter.is_cancelled() {
                let getter = {
                    let mut core = self.core.borrow_mut();
                    if core.fulfilled.is_empty() {
                        None
                    } else {
                        next_live(&mut core.getters)
                    }
                };
                if let Some(getter) = getter {
                    let _ = getter.settle(());
                }
            }
        }
    }
}

impl<T, E> fmt::Debug for Next<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            GetState::Init => "Init",
            GetState::Waiting { .. } => "Waiting",
            GetState::Done => "Done",
        };
        f.debug_struct("Next").field("state", &state).finish()
    }
}
