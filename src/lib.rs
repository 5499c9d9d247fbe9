#![doc = include_str!("../README.md")]
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs, missing_debug_implementations)]

extern crate alloc;

#[macro_use]
mod util;

pub mod condition;
pub mod deferred;
pub mod event;
pub mod lock;
pub mod queue;
pub mod rate_limit;
pub mod semaphore;
pub mod time;
pub mod work_queue;

#[doc(inline)]
pub use self::condition::Condition;
#[doc(inline)]
pub use self::deferred::Deferred;
#[doc(inline)]
pub use self::event::Event;
#[doc(inline)]
pub use self::lock::Lock;
#[doc(inline)]
pub use self::queue::{PriorityQueue, Queue};
#[doc(inline)]
pub use self::rate_limit::{RateLimiter, RateLimiterGroup, RateLimiterRegistry};
#[doc(inline)]
pub use self::semaphore::Semaphore;
#[doc(inline)]
pub use self::time::{Clock, Timer};
#[doc(inline)]
pub use self::work_queue::UnorderedWorkQueue;

/// An error indicating that a [`Deferred`] was cancelled before it settled.
///
/// This error is observed when awaiting a [`Deferred`] whose
/// [`cancel`](Deferred::cancel) method was called, and is convertible into
/// user error types via [`From`] so that fallible pipelines can carry it
/// alongside their own failures.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Cancelled(());

/// An error indicating that an operation was performed against a primitive in
/// the wrong state.
///
/// This error is returned by [`Deferred`] transitions on an already-completed
/// deferred, by [`Lock::release`] when the lock is not held, by
/// [`Condition`] operations that require the lock, and by
/// [`task_done`](Queue::task_done) when the unfinished-task counter would go
/// negative.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct InvalidState(&'static str);

// === impl Cancelled ===

impl Cancelled {
    pub(crate) const fn new() -> Self {
        Self(())
    }
}

impl core::fmt::Display for Cancelled {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.pad("cancelled")
    }
}

impl core::error::Error for Cancelled {}

// === impl InvalidState ===

impl InvalidState {
    pub(crate) const fn new(message: &'static str) -> Self {
        Self(message)
    }

    /// Returns a human-readable description of the misuse.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        self.0
    }
}

impl core::fmt::Display for InvalidState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.pad(self.0)
    }
}

impl core::error::Error for InvalidState {}
