//! A sliding count-per-period rate limiter with grouping.
//!
//! See the [`RateLimiter`] type's documentation for details.
use crate::{
    time::{Clock, Ticks, Timer},
    Lock,
};
use alloc::{collections::BTreeMap, rc::Rc, string::String, vec::Vec};
use core::{cell::RefCell, fmt};
use futures_util::future::join_all;


/// How long a blocked [`RateLimiter::wait`] sleeps between re-checks of its
/// window, in milliseconds.
pub const POLL_INTERVAL: Ticks = 50;

/// A rate limit: at most `count` grants per `period` milliseconds.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Limit {
    /// The maximum number of grants per period.
    pub count: usize,
    /// The window length, in milliseconds.
    pub period: Ticks,
    /// Whether grants are additionally spread out with a minimum gap of
    /// `period / count` milliseconds between consecutive grants.
    pub spread: bool,
}

/// A rate limiter's persistent window state.
///
/// Exposed so that [`StateStore`] implementations can persist it across
/// processes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LimiterState {
    /// Incremented on each period reset, so an external store can detect
    /// stale writers.
    pub version: u64,
    /// The timestamp at which the current period began.
    pub first: Ticks,
    /// The timestamp of the most recent grant, or `None` if no grant has
    /// happened yet.
    ///
    /// The distinction matters in spread mode: with a clock anchored near
    /// zero, a `0` here would be indistinguishable from a real grant at
    /// tick 0 and would gap the very first `wait()`.
    pub last: Option<Ticks>,
    /// The number of grants in the current period.
    pub count: usize,
}

/// The storage hook backing a [`RateLimiter`]'s window state.
///
/// The default implementation, [`InMemoryStore`], keeps state in memory and
/// makes the limiter purely process-local. An implementation backed by
/// persistent storage lets several processes share one window; writes arrive
/// via [`store`](Self::store) after every reset and grant, and the state is
/// [`load`](Self::load)ed once, lazily, on the first
/// [`wait`](RateLimiter::wait).
pub trait StateStore {
    /// Returns the previously-stored state, if any.
    fn load(&self) -> Option<LimiterState>;

    /// Persists `state`.
    fn store(&self, state: &LimiterState);
}

/// The default [`StateStore`]: state lives in memory and dies with the
/// process.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RefCell<Option<LimiterState>>,
}

/// A sliding count-per-period rate limiter.
///
/// [`wait`] resolves once it is safe to proceed: within any window of
/// `period` milliseconds beginning at the window's `first` timestamp, at
/// most `count` calls are granted. When the window is exhausted, `wait`
/// polls, sleeping roughly [`POLL_INTERVAL`] milliseconds per attempt on
/// its [`Timer`], until the period expires and the window resets. Resets
/// are boundary-aligned: the new period begins at the moment of the reset,
/// not at `first + period`.
///
/// With [`Limit::spread`] set, grants are additionally separated by a
/// minimum gap of `period / count`, smoothing a burst into an even trickle.
///
/// Multiple concurrent `wait`s are safe: each successful exit consumes one
/// slot of the window synchronously, so an opening observed by many waiters
/// admits only as many of them as the window allows.
///
/// `RateLimiter` is a cheap handle: clones refer to the same window.
///
/// [`wait`]: Self::wait
#[derive(Clone)]
pub struct RateLimiter {
    inner: Rc<Inner>,
}

/// An explicit, injectable registry of labeled [`RateLimiter`] singletons.
///
/// The registry owns the [`Clock`] and [`Timer`] its limiters use and maps
/// each label to a single limiter instance: [`register`](Self::register) is
/// first-wins, so later registrations under the same label receive the
/// originally-registered instance even if they ask for a different
/// [`Limit`]. This is how independent call sites throttling the same
/// upstream share one window.
#[derive(Clone)]
pub struct RateLimiterRegistry {
    inner: Rc<RegistryInner>,
}

/// An ordered collection of [`RateLimiter`]s that are waited on together.
///
/// [`wait`](Self::wait) awaits every member concurrently and resolves once
/// all of them have granted, so the group's effective wait is the slowest
/// member's, not the sum.
pub struct RateLimiterGroup {
    registry: RateLimiterRegistry,
    members: RefCell<Vec<RateLimiter>>,
}

struct Inner {
    label: String,
    limit: Limit,
    clock: Clock,
    timer: Timer,
    store: Rc<dyn StateStore>,
    /// Serializes the lazy initial load of the window state.
    init_lock: Lock,
    state: RefCell<Option<LimiterState>>,
}

struct RegistryInner {
    clock: Clock,
    timer: Timer,
    limiters: RefCell<BTreeMap<String, RateLimiter>>,
}

// === impl Limit ===

impl Limit {
    /// Returns a limit of `count` grants per `period` milliseconds.
    ///
    /// # Panics
    ///
    /// If `count` or `period` is zero.
    #[must_use]
    pub fn new(count: usize, period: Ticks) -> Self {
        assert!(count > 0, "a rate limit must grant at least one call");
        assert!(period > 0, "a rate limit period must be non-zero");
        Self {
            count,
            period,
            spread: false,
        }
    }

    /// Additionally enforces a minimum gap of `period / count` milliseconds
    /// between consecutive grants.
    #[must_use]
    pub fn spread(self) -> Self {
        Self {
            spread: true,
            ..self
        }
    }
}

// === impl InMemoryStore ===

impl InMemoryStore {
    /// Returns an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for InMemoryStore {
    fn load(&self) -> Option<LimiterState> {
        *self.state.borrow()
    }

    fn store(&self, state: &LimiterState) {
        *self.state.borrow_mut() = Some(*state);
    }
}

// === impl RateLimiter ===

impl RateLimiter {
    /// Returns a new `RateLimiter` with in-memory state.
    ///
    /// Limiters that should be shared per label are better obtained through
    /// a [`RateLimiterRegistry`].
    #[must_use]
    pub fn new(label: &str, limit: Limit, clock: Clock, timer: Timer) -> Self {
        Self::with_store(label, limit, clock, timer, Rc::new(InMemoryStore::new()))
    }

    /// Returns a new `RateLimiter` whose window state is backed by the
    /// provided [`StateStore`].
    #[must_use]
    pub fn with_store(
        label: &str,
        limit: Limit,
        clock: Clock,
        timer: Timer,
        store: Rc<dyn StateStore>,
    ) -> Self {
        Self {
            inner: Rc::new(Inner {
                label: String::from(label),
                limit,
                clock,
                timer,
                store,
                init_lock: Lock::new(),
                state: RefCell::new(None),
            }),
        }
    }

    /// Returns this limiter's label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Returns this limiter's [`Limit`].
    #[must_use]
    pub fn limit(&self) -> Limit {
        self.inner.limit
    }

    /// Resolves once it is safe to proceed under this limiter's window.
    ///
    /// Consumes one slot of the window on return. While the window is
    /// exhausted (or, in spread mode, while the minimum inter-grant gap has
    /// not elapsed), sleeps on the limiter's [`Timer`] and re-checks after
    /// each [`POLL_INTERVAL`].
    pub async fn wait(&self) {
        self.ensure_loaded().await;
        loop {
            if self.try_grant() {
                return;
            }
            self.inner.timer.sleep(POLL_INTERVAL).await;
        }
    }

    /// Loads the window state from the store on first use. The load is
    /// serialized by the limiter's internal lock so that concurrent first
    /// waiters observe a single load.
    async fn ensure_loaded(&self) {
        if self.inner.state.borrow().is_some() {
            return;
        }
        self.inner.init_lock.acquire().await;
        if self.inner.state.borrow().is_none() {
            let loaded = self.inner.store.load().unwrap_or(LimiterState {
                version: 0,
                first: self.inner.clock.now(),
                last: None,
                count: 0,
            });
            trace!(limiter = %self.inner.label, ?loaded, "RateLimiter::ensure_loaded");
            *self.inner.state.borrow_mut() = Some(loaded);
        }
        self.inner
            .init_lock
            .release()
            .expect("the init lock is held");
    }

    /// Resets the window if its period has expired, then takes one slot of
    /// it if any remain.
    fn try_grant(&self) -> bool {
        let limit = self.inner.limit;
        let now = self.inner.clock.now();
        let (reset, grant) = {
            let mut slot = self.inner.state.borrow_mut();
            let state = slot.as_mut().expect("state is loaded before granting");
            let reset = if now.saturating_sub(state.first) > limit.period {
                state.count = 0;
                state.first = now;
                state.version += 1;
                Some(*state)
            } else {
                None
            };
            let gap = if limit.spread {
                limit.period / limit.count as Ticks
            } else {
                0
            };
            // The very first grant is never gapped; spacing only applies
            // between consecutive grants.
            let gap_elapsed = state
                .last
                .map_or(true, |last| now.saturating_sub(last) >= gap);
            let open = state.count < limit.count && (!limit.spread || gap_elapsed);
            let grant = if open {
                state.count += 1;
                state.last = Some(now);
                Some(*state)
            } else {
                None
            };
            (reset, grant)
        };
        if let Some(snapshot) = reset {
            debug!(
                limiter = %self.inner.label,
                version = snapshot.version,
                "rate limiter period reset",
            );
            self.inner.store.store(&snapshot);
        }
        match grant {
            Some(snapshot) => {
                trace!(
                    limiter = %self.inner.label,
                    count = snapshot.count,
                    "RateLimiter::wait -> granted",
                );
                self.inner.store.store(&snapshot);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("label", &self.inner.label)
            .field("limit", &self.inner.limit)
            .field("state", &self.inner.state.borrow())
            .finish()
    }
}

// === impl RateLimiterRegistry ===

impl RateLimiterRegistry {
    /// Returns an empty registry whose limiters will read time from `clock`
    /// and sleep on `timer`.
    #[must_use]
    pub fn new(clock: Clock, timer: Timer) -> Self {
        Self {
            inner: Rc::new(RegistryInner {
                clock,
                timer,
                limiters: RefCell::new(BTreeMap::new()),
            }),
        }
    }

    /// Returns the limiter registered under `label`, creating it with
    /// `limit` and in-memory state if it does not exist yet.
    ///
    /// Registration is first-wins: if `label` is already registered, the
    /// existing instance is returned and `limit` is ignored.
    pub fn register(&self, label: &str, limit: Limit) -> RateLimiter {
        self.register_inner(label, limit, None)
    }

    /// Like [`register`](Self::register), but a newly-created limiter is
    /// backed by the provided [`StateStore`].
    pub fn register_with_store(
        &self,
        label: &str,
        limit: Limit,
        store: Rc<dyn StateStore>,
    ) -> RateLimiter {
        self.register_inner(label, limit, Some(store))
    }

    /// Returns the limiter registered under `label`, if any.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<RateLimiter> {
        self.inner.limiters.borrow().get(label).cloned()
    }

    /// Returns the number of registered limiters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.limiters.borrow().len()
    }

    /// Returns `true` if no limiters are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn register_inner(
        &self,
        label: &str,
        limit: Limit,
        store: Option<Rc<dyn StateStore>>,
    ) -> RateLimiter {
        if let Some(existing) = self.get(label) {
            return existing;
        }
        let clock = self.inner.clock.clone();
        let timer = self.inner.timer.clone();
        let limiter = match store {
            Some(store) => RateLimiter::with_store(label, limit, clock, timer, store),
            None => RateLimiter::new(label, limit, clock, timer),
        };
        debug!(limiter = %label, ?limit, "RateLimiterRegistry::register");
        self.inner
            .limiters
            .borrow_mut()
            .insert(String::from(label), limiter.clone());
        limiter
    }
}

impl fmt::Debug for RateLimiterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiterRegistry")
            .field("clock", &self.inner.clock)
            .field("limiters", &self.inner.limiters.borrow().len())
            .finish()
    }
}

// === impl RateLimiterGroup ===

impl RateLimiterGroup {
    /// Returns an empty group drawing its members from `registry`.
    #[must_use]
    pub fn new(registry: &RateLimiterRegistry) -> Self {
        Self {
            registry: registry.clone(),
            members: RefCell::new(Vec::new()),
        }
    }

    /// Adds the limiter labeled `label` to the group, creating or fetching
    /// it from the registry, and returns it.
    pub fn add(&self, label: &str, limit: Limit) -> RateLimiter {
        let limiter = self.registry.register(label, limit);
        self.members.borrow_mut().push(limiter.clone());
        limiter
    }

    /// Returns the number of member limiters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.borrow().len()
    }

    /// Returns `true` if the group has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves once every member limiter has granted.
    ///
    /// Members are awaited concurrently, so the group waits for its slowest
    /// member rather than for the sum of all waits.
    pub async fn wait(&self) {
        let members: Vec<RateLimiter> = self.members.borrow().clone();
        join_all(members.iter().map(RateLimiter::wait)).await;
    }
}

impl fmt::Debug for RateLimiterGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiterGroup")
            .field("registry", &self.registry)
            .field("members", &self.members.borrow().len())
            .finish()
    }
}
