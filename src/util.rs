//! Internal utilities shared by the primitives in this crate.
use crate::Deferred;
use alloc::collections::VecDeque;

#[cfg(any(test, feature = "tracing"))]
macro_rules! trace {
    ($($t:tt)*) => { tracing::trace!($($t)*) }
}

#[cfg(not(any(test, feature = "tracing")))]
macro_rules! trace {
    ($($t:tt)*) => {};
}

#[cfg(any(test, feature = "tracing"))]
macro_rules! debug {
    ($($t:tt)*) => { tracing::debug!($($t)*) }
}

#[cfg(not(any(test, feature = "tracing")))]
macro_rules! debug {
    ($($t:tt)*) => {};
}

#[cfg(any(test, feature = "tracing"))]
macro_rules! warn {
    ($($t:tt)*) => { tracing::warn!($($t)*) }
}

#[cfg(not(any(test, feature = "tracing")))]
macro_rules! warn {
    ($($t:tt)*) => {};
}

macro_rules! feature {
    (
        #![$meta:meta]
        $($item:item)*
    ) => {
        $(
            #[cfg($meta)]
            $item
        )*
    }
}

/// Pops wait-list entries until a still-pending one is found.
///
/// The returned deferred has been removed from the list; the caller settles
/// it outside any borrow of the owning primitive's state.
pub(crate) fn next_live(list: &mut VecDeque<Deferred<()>>) -> Option<Deferred<()>> {
    while let Some(waiter) = list.pop_front() {
        if !waiter.is_done() {
            return Some(waiter);
        }
    }
    None
}
