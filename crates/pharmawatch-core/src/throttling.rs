use std::num::NonZeroU32;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

use crate::provider_policy::ProviderPolicy;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Spaces upstream calls at least `spacing` apart.
///
/// Callers either wait for their slot with [`acquire`](Self::acquire) or check
/// with [`try_acquire`](Self::try_acquire), which reports how long until the
/// next slot opens.
#[derive(Clone)]
pub struct ThrottlingQueue {
    limiter: Arc<DirectRateLimiter>,
    clock: DefaultClock,
    spacing: Duration,
    waiting: Arc<AtomicUsize>,
}

impl ThrottlingQueue {
    pub fn new(spacing: Duration) -> Self {
        let spacing = spacing.max(Duration::from_millis(1));
        let quota = Quota::with_period(spacing)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
            .allow_burst(NonZeroU32::MIN);
        let clock = DefaultClock::default();

        Self {
            limiter: Arc::new(RateLimiter::direct_with_clock(quota, &clock)),
            clock,
            spacing,
            waiting: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn from_policy(policy: &ProviderPolicy) -> Option<Self> {
        policy.pacing.map(Self::new)
    }

    pub fn spacing(&self) -> Duration {
        self.spacing
    }

    /// Takes the next slot if it is open; otherwise returns the time until it opens.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        self.limiter
            .check()
            .map_err(|not_until| not_until.wait_time_from(self.clock.now()))
    }

    /// Waits until a slot opens and takes it.
    pub async fn acquire(&self) {
        let _guard = WaitingGuard::enter(&self.waiting);
        self.limiter.until_ready().await;
    }

    /// Callers currently parked in [`acquire`](Self::acquire).
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::Acquire)
    }
}

struct WaitingGuard<'a>(&'a AtomicUsize);

impl<'a> WaitingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}
