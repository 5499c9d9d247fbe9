//! Bounded producer/consumer queues with blocking operations and task
//! accounting.
//!
//! This module provides two handles over one queue machinery:
//!
//! - [`Queue`], with first-in-first-out ([`Queue::fifo`]) or last-in-first-out
//!   ([`Queue::lifo`]) ordering;
//! - [`PriorityQueue`], whose `put` takes an explicit priority key and whose
//!   `get` returns the lowest-keyed item first.
//!
//! The variants differ only in how the buffer stores and yields items; the
//! wait lists, bounds, and accounting are shared.
use crate::{deferred, event, util::next_live, Deferred, Event, InvalidState};
use alloc::{collections::VecDeque, rc::Rc, vec::Vec};
use core::{
    cell::RefCell,
    fmt,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

#[cfg(test)]
mod tests;

/// An asynchronous queue with first-in-first-out or last-in-first-out
/// ordering.
///
/// A `Queue` carries items from producers to consumers. It may be *bounded*
/// (a capacity greater than zero), in which case [`put`] waits while the
/// queue is full; [`get`] waits while the queue is empty. The non-waiting
/// variants [`put_nowait`] and [`get_nowait`] fail instead of waiting.
///
/// # Fairness
///
/// Waiting producers and waiting consumers each form a first-in-first-out
/// list. Inserting an item wakes the first live consumer; extracting an item
/// wakes the first live producer. A woken waiter re-checks the queue when it
/// runs and goes back to waiting if another task got there first, so
/// spurious wakeups are absorbed rather than lost. An abandoned (dropped)
/// waiter likewise passes its wakeup on.
///
/// # Task accounting
///
/// Each inserted item increments an unfinished-task counter; consumers (or
/// whoever the caller designates) call [`task_done`] once per processed
/// item, and [`join`] resolves whenever the counter is zero.
///
/// `Queue` is a cheap handle: clones refer to the same queue.
///
/// [`put`]: Self::put
/// [`get`]: Self::get
/// [`put_nowait`]: Self::put_nowait
/// [`get_nowait`]: Self::get_nowait
/// [`task_done`]: Self::task_done
/// [`join`]: Self::join
pub struct Queue<T> {
    core: Rc<RefCell<Core<T>>>,
}

/// An asynchronous queue that yields the lowest-keyed item first.
///
/// `put` takes an explicit priority key alongside the item; `get` extracts
/// the item with the smallest key, breaking ties by insertion order. In
/// every other respect (bounds, blocking, wait-list fairness, task
/// accounting) this behaves exactly like [`Queue`].
pub struct PriorityQueue<T> {
    core: Rc<RefCell<Core<T>>>,
}

/// An error indicating that [`get_nowait`](Queue::get_nowait) was called on
/// an empty queue.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct QueueEmpty(());

/// An error indicating that [`put_nowait`](Queue::put_nowait) was called on
/// a full queue.
///
/// The rejected item is handed back; reclaim it with
/// [`into_inner`](Self::into_inner).
pub struct QueueFull<T>(T);

struct Core<T> {
    buffer: Buffer<T>,
    /// Zero means unbounded.
    capacity: usize,
    getters: VecDeque<Deferred<()>>,
    putters: VecDeque<Deferred<()>>,
    unfinished: usize,
    finished: Event,
}

enum Buffer<T> {
    Fifo(VecDeque<T>),
    Lifo(Vec<T>),
    Priority {
        entries: VecDeque<PriorityEntry<T>>,
    },
}

struct PriorityEntry<T> {
    key: u64,
    item: T,
}

// === impl Buffer ===

impl<T> Buffer<T> {
    fn len(&self) -> usize {
        match self {
            Self::Fifo(items) => items.len(),
            Self::Lifo(items) => items.len(),
            Self::Priority { entries, .. } => entries.len(),
        }
    }

    fn push(&mut self, item: T, key: u64) {
        match self {
            Self::Fifo(items) => items.push_back(item),
            Self::Lifo(items) => items.push(item),
            Self::Priority { entries } => {
                let entry = PriorityEntry { key, item };
                // Keys at or past the current maximum append directly, and
                // keys below the current minimum prepend; only keys inside
                // the occupied range pay for a binary search. Appending on
                // an equal key keeps ties in insertion order.
                if entries.back().map_or(true, |back| key >= back.key) {
                    entries.push_back(entry);
                } else if entries.front().is_some_and(|front| key < front.key) {
                    entries.push_front(entry);
                } else {
                    let idx = entries.partition_point(|e| e.key <= key);
                    entries.insert(idx, entry);
                }
            }
        }
    }

    fn pop(&mut self) -> Option<T> {
        match self {
            Self::Fifo(items) => items.pop_front(),
            Self::Lifo(items) => items.pop(),
            Self::Priority { entries, .. } => entries.pop_front().map(|entry| entry.item),
        }
    }

    fn drain(&mut self) -> Vec<T> {
        match self {
            Self::Fifo(items) => items.drain(..).collect(),
            Self::Lifo(items) => {
                items.reverse();
                items.drain(..).collect()
            }
            Self::Priority { entries, .. } => {
                entries.drain(..).map(|entry| entry.item).collect()
            }
        }
    }
}

// === core operations shared by both queue flavors ===

fn try_insert<T>(core: &Rc<RefCell<Core<T>>>, item: T, key: u64) -> Result<(), QueueFull<T>> {
    let getter = {
        let mut core = core.borrow_mut();
        if core.is_full() {
            return Err(QueueFull(item));
        }
        core.buffer.push(item, key);
        core.unfinished += 1;
        core.finished.clear();
        trace!(len = core.buffer.len(), key, "queue::insert");
        next_live(&mut core.getters)
    };
    if let Some(getter) = getter {
        let _ = getter.settle(());
    }
    Ok(())
}

fn try_extract<T>(core: &Rc<RefCell<Core<T>>>) -> Result<T, QueueEmpty> {
    let (item, putter) = {
        let mut core = core.borrow_mut();
        let Some(item) = core.buffer.pop() else {
            return Err(QueueEmpty(()));
        };
        trace!(len = core.buffer.len(), "queue::extract");
        (item, next_live(&mut core.putters))
    };
    if let Some(putter) = putter {
        let _ = putter.settle(());
    }
    Ok(item)
}

fn try_drain<T>(core: &Rc<RefCell<Core<T>>>) -> Option<Vec<T>> {
    let (items, putters) = {
        let mut core = core.borrow_mut();
        if core.buffer.len() == 0 {
            return None;
        }
        let items = core.buffer.drain();
        // Each drained item frees one slot, so up to that many producers can
        // make progress.
        let mut putters = Vec::new();
        while putters.len() < items.len() {
            match next_live(&mut core.putters) {
                Some(putter) => putters.push(putter),
                None => break,
            }
        }
        (items, putters)
    };
    for putter in putters {
        let _ = putter.settle(());
    }
    Some(items)
}

fn finish_tasks<T>(core: &Rc<RefCell<Core<T>>>, count: usize) -> Result<(), InvalidState> {
    let finished = {
        let mut core = core.borrow_mut();
        if count > core.unfinished {
            return Err(InvalidState::new(
                "task_done called more times than there were queued items",
            ));
        }
        core.unfinished -= count;
        if core.unfinished == 0 {
            Some(core.finished.clone())
        } else {
            None
        }
    };
    if let Some(finished) = finished {
        finished.set();
    }
    Ok(())
}

impl<T> Core<T> {
    fn is_full(&self) -> bool {
        self.capacity != 0 && self.buffer.len() >= self.capacity
    }
}

fn new_core<T>(buffer: Buffer<T>, capacity: usize) -> Rc<RefCell<Core<T>>> {
    // With nothing queued yet there is nothing outstanding, so `join` must
    // resolve immediately.
    let finished = Event::new();
    finished.set();
    Rc::new(RefCell::new(Core {
        buffer,
        capacity,
        getters: VecDeque::new(),
        putters: VecDeque::new(),
        unfinished: 0,
        finished,
    }))
}

/// The operations shared verbatim by [`Queue`] and [`PriorityQueue`].
macro_rules! impl_queue_common {
    () => {
        /// Returns a future that extracts the next item, waiting while the
        /// queue is empty.
        ///
        /// Dropping the future abandons the wait; a wakeup it had already
        /// received is passed to the next waiting consumer, and no item is
        /// taken.
        pub fn get(&self) -> Get<T> {
            Get {
                core: self.core.clone(),
                state: GetState::Init,
            }
        }

        /// Extracts the next item without waiting.
        ///
        /// On success, the first waiting producer (if any) is woken to fill
        /// the freed slot.
        ///
        /// # Errors
        ///
        /// Fails with [`QueueEmpty`] if the queue is empty.
        pub fn get_nowait(&self) -> Result<T, QueueEmpty> {
            try_extract(&self.core)
        }

        /// Returns a future that atomically drains every item, waiting
        /// until the queue is non-empty.
        ///
        /// One waiting producer is woken per freed slot.
        pub fn get_all(&self) -> GetAll<T> {
            GetAll {
                core: self.core.clone(),
                state: GetState::Init,
            }
        }

        /// Returns a future that resolves once the queue holds at least
        /// `target` items, without consuming any of them.
        ///
        /// This is a query with suspension, not a consumption: if a wakeup
        /// arrives but another consumer drained the queue first, the waiter
        /// re-arms itself and keeps waiting until the threshold genuinely
        /// holds.
        pub fn wait_len(&self, target: usize) -> WaitLen<T> {
            WaitLen {
                core: self.core.clone(),
                target,
                state: WaitLenState::Init,
            }
        }

        /// Records that one previously-queued item has been fully
        /// processed.
        ///
        /// When the count of unfinished items reaches zero, [`join`] is
        /// released.
        ///
        /// # Errors
        ///
        /// Fails with [`InvalidState`] if called more times than there were
        /// items queued.
        ///
        /// [`join`]: Self::join
        pub fn task_done(&self) -> Result<(), InvalidState> {
            finish_tasks(&self.core, 1)
        }

        /// Records that `count` previously-queued items have been fully
        /// processed. See [`task_done`](Self::task_done).
        ///
        /// # Errors
        ///
        /// Fails with [`InvalidState`] if the count exceeds the number of
        /// unfinished items.
        pub fn task_done_n(&self, count: usize) -> Result<(), InvalidState> {
            finish_tasks(&self.core, count)
        }

        /// Returns a future that resolves once every queued item has been
        /// marked done via [`task_done`](Self::task_done).
        ///
        /// Resolves immediately if nothing is outstanding.
        pub fn join(&self) -> event::Wait {
            self.core.borrow().finished.wait()
        }

        /// Returns the number of items currently buffered.
        #[must_use]
        pub fn len(&self) -> usize {
            self.core.borrow().buffer.len()
        }

        /// Returns `true` if no items are currently buffered.
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        /// Returns `true` if the queue is bounded and at capacity.
        #[must_use]
        pub fn is_full(&self) -> bool {
            self.core.borrow().is_full()
        }

        /// Returns the queue's capacity; zero means unbounded.
        #[must_use]
        pub fn capacity(&self) -> usize {
            self.core.borrow().capacity
        }

        /// Returns the number of queued items not yet marked done.
        #[must_use]
        pub fn unfinished_tasks(&self) -> usize {
            self.core.borrow().unfinished
        }
    };
}

// === impl Queue ===

impl<T> Queue<T> {
    /// Returns a new first-in-first-out queue.
    ///
    /// A `capacity` of zero means unbounded; otherwise [`put`](Self::put)
    /// waits whenever `capacity` items are buffered.
    #[must_use]
    pub fn fifo(capacity: usize) -> Self {
        Self {
            core: new_core(Buffer::Fifo(VecDeque::new()), capacity),
        }
    }

    /// Returns a new last-in-first-out (stack-ordered) queue.
    ///
    /// A `capacity` of zero means unbounded.
    #[must_use]
    pub fn lifo(capacity: usize) -> Self {
        Self {
            core: new_core(Buffer::Lifo(Vec::new()), capacity),
        }
    }

    /// Returns a future that inserts `item`, waiting while the queue is
    /// full.
    ///
    /// Dropping the future abandons the insertion; a wakeup it had already
    /// received is passed to the next waiting producer.
    pub fn put(&self, item: T) -> Put<T> {
        Put {
            core: self.core.clone(),
            item: Some(item),
            key: 0,
            state: PutState::Init,
        }
    }

    /// Inserts `item` without waiting.
    ///
    /// On success the unfinished-task counter is incremented and the first
    /// waiting consumer (if any) is woken.
    ///
    /// # Errors
    ///
    /// Fails with [`QueueFull`], handing `item` back, if the queue is at
    /// capacity.
    pub fn put_nowait(&self, item: T) -> Result<(), QueueFull<T>> {
        try_insert(&self.core, item, 0)
    }

    impl_queue_common! {}
}

impl<T> Clone for Queue<T> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<T> fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.core.borrow();
        let ordering = match core.buffer {
            Buffer::Fifo(_) => "Fifo",
            Buffer::Lifo(_) => "Lifo",
            Buffer::Priority { .. } => "Priority",
        };
        f.debug_struct("Queue")
            .field("ordering", &ordering)
            .field("len", &core.buffer.len())
            .field("capacity", &core.capacity)
            .field("unfinished", &core.unfinished)
            .finish()
    }
}

// === impl PriorityQueue ===

impl<T> PriorityQueue<T> {
    /// Returns a new priority queue.
    ///
    /// A `capacity` of zero means unbounded.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            core: new_core(
                Buffer::Priority {
                    entries: VecDeque::new(),
                },
                capacity,
            ),
        }
    }

    /// Returns a future that inserts `item` with the given priority key,
    /// waiting while the queue is full.
    ///
    /// Lower keys are extracted first; items with equal keys are extracted
    /// in insertion order.
    pub fn put(&self, item: T, priority: u64) -> Put<T> {
        Put {
            core: self.core.clone(),
            item: Some(item),
            key: priority,
            state: PutState::Init,
        }
    }

    /// Inserts `item` with the given priority key without waiting.
    ///
    /// # Errors
    ///
    /// Fails with [`QueueFull`], handing `item` back, if the queue is at
    /// capacity.
    pub fn put_nowait(&self, item: T, priority: u64) -> Result<(), QueueFull<T>> {
        try_insert(&self.core, item, priority)
    }

    impl_queue_common! {}
}

impl<T> Clone for PriorityQueue<T> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<T> fmt::Debug for PriorityQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.core.borrow();
        f.debug_struct("PriorityQueue")
            .field("len", &core.buffer.len())
            .field("capacity", &core.capacity)
            .field("unfinished", &core.unfinished)
            .finish()
    }
}

// === futures ===

/// The future returned by [`Queue::put`] and [`PriorityQueue::put`].
#[must_use = "futures do nothing unless `.await`ed or `poll`ed"]
pub struct Put<T> {
    core: Rc<RefCell<Core<T>>>,
    item: Option<T>,
    key: u64,
    state: PutState,
}

enum PutState {
    Init,
    Waiting { wait: deferred::Wait<()> },
    Done,
}

/// The future returned by [`Queue::get`] and [`PriorityQueue::get`].
#[must_use = "futures do nothing unless `.await`ed or `poll`ed"]
pub struct Get<T> {
    core: Rc<RefCell<Core<T>>>,
    state: GetState,
}

/// The future returned by [`Queue::get_all`] and [`PriorityQueue::get_all`].
#[must_use = "futures do nothing unless `.await`ed or `poll`ed"]
pub struct GetAll<T> {
    core: Rc<RefCell<Core<T>>>,
    state: GetState,
}

enum GetState {
    Init,
    Waiting { wait: deferred::Wait<()> },
    Done,
}

/// The future returned by [`Queue::wait_len`] and
/// [`PriorityQueue::wait_len`].
#[must_use = "futures do nothing unless `.await`ed or `poll`ed"]
pub struct WaitLen<T> {
    core: Rc<RefCell<Core<T>>>,
    target: usize,
    state: WaitLenState,
}

enum WaitLenState {
    Init,
    Waiting { wait: deferred::Wait<()> },
    Done,
}

/// Registers a fresh getter-side waiter.
fn park_getter<T>(core: &Rc<RefCell<Core<T>>>) -> deferred::Wait<()> {
    let waiter = Deferred::new();
    core.borrow_mut().getters.push_back(waiter.clone());
    waiter.wait()
}

/// Hands an unconsumed getter-side wakeup to the next live getter, provided
/// there is still data to claim.
fn forward_getter_wake<T>(core: &Rc<RefCell<Core<T>>>) {
    let getter = {
        let mut core = core.borrow_mut();
        if core.buffer.len() == 0 {
            return;
        }
        next_live(&mut core.getters)
    };
    if let Some(getter) = getter {
        let _ = getter.settle(());
    }
}

/// Hands an unconsumed putter-side wakeup to the next live putter, provided
/// there is still a free slot to claim.
fn forward_putter_wake<T>(core: &Rc<RefCell<Core<T>>>) {
    let putter = {
        let mut core = core.borrow_mut();
        if core.is_full() {
            return;
        }
        next_live(&mut core.putters)
    };
    if let Some(putter) = putter {
        let _ = putter.settle(());
    }
}

// === impl Put ===

impl<T> Future for Put<T> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // SAFETY: `Put` never pin-projects `item`; no field relies on
        // structural pinning, so moving `Self` after this borrow is sound
        // regardless of `T: Unpin`.
        let this = unsafe { self.get_unchecked_mut() };
        loop {
            match &mut this.state {
                PutState::Init => {
                    let item = this
                        .item
                        .take()
                        .expect("a pending Put future always holds its item");
                    match try_insert(&this.core, item, this.key) {
                        Ok(()) => {
                            this.state = PutState::Done;
                            return Poll::Ready(());
                        }
                        Err(QueueFull(item)) => {
                            this.item = Some(item);
                            let waiter = Deferred::new();
                            this.core.borrow_mut().putters.push_back(waiter.clone());
                            this.state = PutState::Waiting {
                                wait: waiter.wait(),
                            };
                        }
                    }
                }
                PutState::Waiting { wait } => match Pin::new(wait).poll(cx) {
                    // Woken with a free slot; re-check, since another
                    // producer may have claimed it first.
                    Poll::Ready(_) => this.state = PutState::Init,
                    Poll::Pending => return Poll::Pending,
                },
                PutState::Done => return Poll::Ready(()),
            }
        }
    }
}

impl<T> Drop for Put<T> {
    fn drop(&mut self) {
        if let PutState::Waiting { wait } = &self.state {
            let waiter = wait.deferred();
            if !waiter.cancel() && !waiter.is_cancelled() {
                forward_putter_wake(&self.core);
            }
        }
    }
}

impl<T> fmt::Debug for Put<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            PutState::Init => "Init",
            PutState::Waiting { .. } => "Waiting",
            PutState::Done => "Done",
        };
        f.debug_struct("Put").field("state", &state).finish()
    }
}

// === impl Get ===

impl<T> Future for Get<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        loop {
            match &mut this.state {
                GetState::Init => match try_extract(&this.core) {
                    Ok(item) => {
                        this.state = GetState::Done;
                        return Poll::Ready(item);
                    }
                    Err(QueueEmpty(())) => {
                        this.state = GetState::Waiting {
                            wait: park_getter(&this.core),
                        };
                    }
                },
                GetState::Waiting { wait } => match Pin::new(wait).poll(cx) {
                    // Woken with data available; re-check, since another
                    // consumer may have drained the queue first.
                    Poll::Ready(_) => this.state = GetState::Init,
                    Poll::Pending => return Poll::Pending,
                },
                GetState::Done => panic!("Get polled after completion"),
            }
        }
    }
}

impl<T> Drop for Get<T> {
    fn drop(&mut self) {
        if let GetState::Waiting { wait } = &self.state {
            let waiter = wait.deferred();
            if !waiter.cancel() && !waiter.is_cancelled() {
                forward_getter_wake(&self.core);
            }
        }
    }
}

impl<T> fmt::Debug for Get<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            GetState::Init => "Init",
            GetState::Waiting { .. } => "Waiting",
            GetState::Done => "Done",
        };
        f.debug_struct("Get").field("state", &state).finish()
    }
}

// === impl GetAll ===

impl<T> Future for GetAll<T> {
    type Output = Vec<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        loop {
            match &mut this.state {
                GetState::Init => match try_drain(&this.core) {
                    Some(items) => {
                        this.state = GetState::Done;
                        return Poll::Ready(items);
                    }
                    None => {
                        this.state = GetState::Waiting {
                            wait: park_getter(&this.core),
                        };
                    }
                },
                GetState::Waiting { wait } => match Pin::new(wait).poll(cx) {
                    Poll::Ready(_) => this.state = GetState::Init,
                    Poll::Pending => return Poll::Pending,
                },
                GetState::Done => panic!("GetAll polled after completion"),
            }
        }
    }
}

impl<T> Drop for GetAll<T> {
    fn drop(&mut self) {
        if let GetState::Waiting { wait } = &self.state {
            let waiter = wait.deferred();
            if !waiter.cancel() && !waiter.is_cancelled() {
                forward_getter_wake(&self.core);
            }
        }
    }
}

impl<T> fmt::Debug for GetAll<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            GetState::Init => "Init",
            GetState::Waiting { .. } => "Waiting",
            GetState::Done => "Done",
        };
        f.debug_struct("GetAll").field("state", &state).finish()
    }
}

// === impl WaitLen ===

impl<T> Future for WaitLen<T> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        loop {
            match &mut this.state {
                WaitLenState::Init => {
                    if this.core.borrow().buffer.len() >= this.target {
                        this.state = WaitLenState::Done;
                        return Poll::Ready(());
                    }
                    this.state = WaitLenState::Waiting {
                        wait: park_getter(&this.core),
                    };
                }
                WaitLenState::Waiting { wait } => match Pin::new(wait).poll(cx) {
                    Poll::Ready(_) => {
                        if this.core.borrow().buffer.len() >= this.target {
                            this.state = WaitLenState::Done;
                            return Poll::Ready(());
                        }
                        // The wakeup reached us before the threshold was
                        // met (or a peer drained the buffer first). Pass
                        // the signal to the next getter so a
                        // smaller-threshold waiter is not starved, then
                        // re-arm behind it.
                        forward_getter_wake(&this.core);
                        this.state = WaitLenState::Waiting {
                            wait: park_getter(&this.core),
                        };
                    }
                    Poll::Pending => return Poll::Pending,
                },
                WaitLenState::Done => return Poll::Ready(()),
            }
        }
    }
}

impl<T> Drop for WaitLen<T> {
    fn drop(&mut self) {
        if let WaitLenState::Waiting { wait } = &self.state {
            let waiter = wait.deferred();
            if !waiter.cancel() && !waiter.is_cancelled() {
                forward_getter_wake(&self.core);
            }
        }
    }
}

impl<T> fmt::Debug for WaitLen<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            WaitLenState::Init => "Init",
            WaitLenState::Waiting { .. } => "Waiting",
            WaitLenState::Done => "Done",
        };
        f.debug_struct("WaitLen")
            .field("target", &self.target)
            .field("state", &state)
            .finish()
    }
}

// === impl QueueEmpty ===

impl fmt::Display for QueueEmpty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("queue is empty")
    }
}

impl core::error::Error for QueueEmpty {}

// === impl QueueFull ===

impl<T> QueueFull<T> {
    /// Returns the item that could not be inserted.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for QueueFull<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("QueueFull(..)")
    }
}

impl<T> fmt::Display for QueueFull<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("queue is full")
    }
}

impl<T> core::error::Error for QueueFull<T> {}
