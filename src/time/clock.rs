//! [`Clock`]s provide a mechanism for reading the current time.
//!
//! See the documentation for the [`Clock`] type for more details.

/// [`Clock`] timestamps are a 64-bit count of milliseconds.
pub type Ticks = u64;

/// A time-source definition.
///
/// A `Clock` wraps a function that returns the current timestamp as a number
/// of milliseconds ([`Ticks`]) since some fixed origin. The origin is
/// arbitrary; only differences between timestamps are meaningful.
///
/// # Monotonicity
///
/// Implementations of `now()` MUST be monotonically non-decreasing: a call
/// to `now()` must never return a value less than the value returned by a
/// previous call. Wall-clock sources that can be stepped backwards (NTP
/// adjustments, manual changes) are not suitable.
///
/// # Examples
///
/// ```
/// use hypha::time::Clock;
///
/// // A (pretend) function that reads a hardware or runtime tick counter.
/// fn read_tick_counter() -> u64 {
///     0
/// }
///
/// let clock = Clock::new(read_tick_counter).named("tick-counter");
/// assert_eq!(clock.now(), 0);
/// ```
#[derive(Clone, Debug)]
pub struct Clock {
    now: fn() -> Ticks,
    name: &'static str,
}

// === impl Clock ===

impl Clock {
    /// Returns a new `Clock` reading timestamps from the provided `now()`
    /// function.
    #[must_use]
    pub const fn new(now: fn() -> Ticks) -> Self {
        Self {
            now,
            name: "<unnamed clock>",
        }
    }

    /// Adds an arbitrary user-defined name to this `Clock`.
    ///
    /// This is generally used to describe the time source backing the
    /// `now()` function.
    #[must_use]
    pub const fn named(self, name: &'static str) -> Self {
        Self { name, ..self }
    }

    /// Returns the current timestamp in milliseconds.
    #[must_use]
    pub fn now(&self) -> Ticks {
        (self.now)()
    }

    /// Returns this `Clock`'s name, if it was given one using the
    /// [`Clock::named`] method.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

feature! {
    #![feature = "std"]

    fn system_now() -> Ticks {
        use std::{sync::OnceLock, time::Instant};
        static EPOCH: OnceLock<Instant> = OnceLock::new();
        let epoch = EPOCH.get_or_init(Instant::now);
        epoch.elapsed().as_millis() as Ticks
    }

    impl Clock {
        /// Returns a `Clock` backed by the operating system's monotonic
        /// clock, anchored at the first use within this process.
        #[must_use]
        pub fn system() -> Self {
            Self::new(system_now).named("system-monotonic")
        }
    }
}
