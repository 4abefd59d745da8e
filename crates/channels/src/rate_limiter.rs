//! Per-platform request admission.
//!
//! Each platform gets a GCRA limiter pacing the minute window (burst equal to
//! the per-minute limit), a log of admissions that bounds the hour and day
//! windows, an optional backoff deadline and a concurrency semaphore. A
//! [`RatePermit`] holds one concurrency slot until it is dropped.
//!
//! Only an admitted request is charged: the hour and day windows are read
//! from the log before the minute limiter is asked, and a refusal by any of
//! them leaves every window untouched.

use std::collections::{HashMap, VecDeque};
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use governor::clock::{Clock, DefaultClock};
use governor::state::{InMemoryState, NotKeyed};
use governor::Quota;
use nonzero_ext::nonzero;
use outreach_core::platform::Platform;
use outreach_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

type DirectLimiter = governor::RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Backoff applied when a provider answers 429 without further guidance.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(5 * 60);

/// Concurrent permits per platform.
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Shortest sleep between admission attempts.
const MIN_WAIT: Duration = Duration::from_millis(1);

// ---------------------------------------------------------------------------
// Limits / reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimits {
    pub per_minute: u32,
    pub per_hour: u32,
    pub per_day: u32,
}

impl RateLimits {
    /// Built-in thresholds. Platforms without their own entry use the
    /// generic limits.
    pub fn for_platform(platform: Platform) -> Self {
        let (per_minute, per_hour, per_day) = match platform {
            Platform::LinkedIn => (100, 1_000, 10_000),
            Platform::Twitter => (300, 3_000, 30_000),
            _ => (60, 1_000, 10_000),
        };
        Self { per_minute, per_hour, per_day }
    }

    fn apply(&mut self, update: &LimitUpdate) {
        if let Some(v) = update.per_minute {
            self.per_minute = v;
        }
        if let Some(v) = update.per_hour {
            self.per_hour = v;
        }
        if let Some(v) = update.per_day {
            self.per_day = v;
        }
    }
}

/// Partial replacement of a platform's thresholds.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct LimitUpdate {
    pub per_minute: Option<u32>,
    pub per_hour: Option<u32>,
    pub per_day: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WindowCounts {
    pub minute: u32,
    pub hour: u32,
    pub day: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RateLimitStatus {
    pub current_requests: WindowCounts,
    pub limits: RateLimits,
    pub in_backoff: bool,
    pub backoff_until: Option<Timestamp>,
}

/// Why a non-blocking acquire was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Throttled {
    #[error("Platform is backing off for another {0:?}")]
    Backoff(Duration),

    #[error("Rate limit reached, next request admitted in {0:?}")]
    Window(Duration),

    #[error("No free concurrency slot")]
    Busy,
}

impl Throttled {
    /// Time until the refused request could be admitted. Unknown for
    /// [`Throttled::Busy`], reported as zero.
    pub fn wait(&self) -> Duration {
        match self {
            Throttled::Backoff(d) | Throttled::Window(d) => *d,
            Throttled::Busy => Duration::ZERO,
        }
    }
}

/// A concurrency slot on one platform. Dropping it releases the slot.
#[derive(Debug)]
pub struct RatePermit {
    platform: Platform,
    _slot: OwnedSemaphorePermit,
}

impl RatePermit {
    pub fn platform(&self) -> Platform {
        self.platform
    }
}

// ---------------------------------------------------------------------------
// Per-platform state
// ---------------------------------------------------------------------------

fn quota(limit: u32, window: Duration) -> Quota {
    let burst = NonZeroU32::new(limit).unwrap_or(nonzero!(1u32));
    Quota::with_period(window / burst.get())
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}

struct PlatformState {
    limits: RateLimits,
    minute: DirectLimiter,
    log: VecDeque<Instant>,
    backoff_until: Option<(Instant, Timestamp)>,
    slots: Arc<Semaphore>,
}

impl PlatformState {
    fn new(limits: RateLimits, slots: Arc<Semaphore>) -> Self {
        Self {
            minute: DirectLimiter::direct(quota(limits.per_minute, MINUTE)),
            limits,
            log: VecDeque::new(),
            backoff_until: None,
            slots,
        }
    }

    fn backoff_remaining(&mut self, now: Instant) -> Option<Duration> {
        match self.backoff_until {
            Some((until, _)) if until > now => Some(until - now),
            Some(_) => {
                self.backoff_until = None;
                None
            }
            None => None,
        }
    }

    fn try_admit(&mut self, now: Instant, clock: &DefaultClock) -> Result<(), Throttled> {
        if let Some(wait) = self.backoff_remaining(now) {
            return Err(Throttled::Backoff(wait));
        }
        self.prune(now);
        for (window, limit) in [(DAY, self.limits.per_day), (HOUR, self.limits.per_hour)] {
            if let Some(wait) = self.window_wait(now, window, limit) {
                return Err(Throttled::Window(wait));
            }
        }
        self.minute
            .check()
            .map_err(|not_until| Throttled::Window(not_until.wait_time_from(clock.now())))?;
        self.log.push_back(now);
        Ok(())
    }

    /// Time until the trailing `window` has room again, or `None` when it
    /// already does. The log is in admission order.
    fn window_wait(&self, now: Instant, window: Duration, limit: u32) -> Option<Duration> {
        let start = self.log.partition_point(|t| now.duration_since(*t) >= window);
        let inside = self.log.len() - start;
        let limit = limit.max(1) as usize;
        if inside < limit {
            return None;
        }
        let expiring = self.log[start + inside - limit];
        Some((expiring + window).saturating_duration_since(now))
    }

    fn prune(&mut self, now: Instant) {
        while self.log.front().is_some_and(|t| now.duration_since(*t) >= DAY) {
            self.log.pop_front();
        }
    }

    fn counts(&mut self, now: Instant) -> WindowCounts {
        self.prune(now);
        let within = |window: Duration| {
            self.log.iter().filter(|t| now.duration_since(**t) < window).count() as u32
        };
        WindowCounts {
            minute: within(MINUTE),
            hour: within(HOUR),
            day: self.log.len() as u32,
        }
    }
}

// ---------------------------------------------------------------------------
// RateLimiter
// ---------------------------------------------------------------------------

pub struct RateLimiter {
    platforms: Mutex<HashMap<Platform, PlatformState>>,
    max_concurrent: usize,
    clock: DefaultClock,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_max_concurrent(DEFAULT_MAX_CONCURRENT)
    }

    pub fn with_max_concurrent(max_concurrent: usize) -> Self {
        Self {
            platforms: Mutex::new(HashMap::new()),
            max_concurrent: max_concurrent.max(1),
            clock: DefaultClock::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Platform, PlatformState>> {
        self.platforms.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_platform<R>(
        &self,
        platform: Platform,
        f: impl FnOnce(&mut PlatformState) -> R,
    ) -> R {
        let mut platforms = self.lock();
        let state = platforms.entry(platform).or_insert_with(|| {
            PlatformState::new(
                RateLimits::for_platform(platform),
                Arc::new(Semaphore::new(self.max_concurrent)),
            )
        });
        f(state)
    }

    /// Wait until every window admits a request and a concurrency slot is
    /// free. Active backoff is slept through.
    pub async fn acquire(&self, platform: Platform) -> Result<RatePermit, AcquireError> {
        loop {
            let outcome =
                self.with_platform(platform, |s| s.try_admit(Instant::now(), &self.clock));
            match outcome {
                Ok(()) => break,
                Err(throttled) => {
                    tracing::debug!(
                        platform = %platform,
                        wait_ms = throttled.wait().as_millis() as u64,
                        "Rate limited, waiting"
                    );
                    tokio::time::sleep(throttled.wait().max(MIN_WAIT)).await;
                }
            }
        }

        let slots = self.with_platform(platform, |s| Arc::clone(&s.slots));
        let slot = slots.acquire_owned().await?;
        Ok(RatePermit { platform, _slot: slot })
    }

    /// Non-blocking [`acquire`](Self::acquire).
    pub fn try_acquire(&self, platform: Platform) -> Result<RatePermit, Throttled> {
        self.with_platform(platform, |s| -> Result<RatePermit, Throttled> {
            let slot = Arc::clone(&s.slots).try_acquire_owned().map_err(|_| Throttled::Busy)?;
            s.try_admit(Instant::now(), &self.clock)?;
            Ok(RatePermit { platform, _slot: slot })
        })
    }

    /// Requests still allowed in each trailing window.
    pub fn remaining(&self, platform: Platform) -> WindowCounts {
        self.with_platform(platform, |s| {
            let used = s.counts(Instant::now());
            WindowCounts {
                minute: s.limits.per_minute.saturating_sub(used.minute),
                hour: s.limits.per_hour.saturating_sub(used.hour),
                day: s.limits.per_day.saturating_sub(used.day),
            }
        })
    }

    pub fn status(&self, platform: Platform) -> RateLimitStatus {
        self.with_platform(platform, |s| {
            let now = Instant::now();
            let in_backoff = s.backoff_remaining(now).is_some();
            RateLimitStatus {
                current_requests: s.counts(now),
                limits: s.limits,
                in_backoff,
                backoff_until: s.backoff_until.map(|(_, at)| at),
            }
        })
    }

    /// Replace some of a platform's thresholds and rebuild its minute
    /// limiter. The admission log is kept.
    pub fn update_limits(&self, platform: Platform, update: &LimitUpdate) -> RateLimits {
        self.with_platform(platform, |s| {
            s.limits.apply(update);
            s.minute = DirectLimiter::direct(quota(s.limits.per_minute, MINUTE));
            tracing::info!(
                platform = %platform,
                per_minute = s.limits.per_minute,
                per_hour = s.limits.per_hour,
                per_day = s.limits.per_day,
                "Updated rate limits"
            );
            s.limits
        })
    }

    /// Block acquisitions on `platform` for `duration`.
    pub fn trigger_backoff(&self, platform: Platform, duration: Duration) {
        let wall = chrono::Duration::from_std(duration)
            .unwrap_or_else(|_| chrono::Duration::days(365));
        self.with_platform(platform, |s| {
            s.backoff_until = Some((Instant::now() + duration, Utc::now() + wall));
        });
        tracing::warn!(
            platform = %platform,
            secs = duration.as_secs(),
            "Triggered rate limit backoff"
        );
    }

    /// Forget counts, limits and backoff for one platform, or for every
    /// platform. Concurrency slots survive so outstanding permits still
    /// count against `max_concurrent`.
    pub fn reset(&self, platform: Option<Platform>) {
        let mut platforms = self.lock();
        for (p, state) in platforms.iter_mut() {
            if platform.is_none_or(|only| only == *p) {
                *state = PlatformState::new(RateLimits::for_platform(*p), Arc::clone(&state.slots));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn default_limits_per_platform() {
        assert_eq!(RateLimits::for_platform(Platform::LinkedIn).per_minute, 100);
        assert_eq!(RateLimits::for_platform(Platform::Twitter).per_day, 30_000);
        assert_eq!(
            RateLimits::for_platform(Platform::TikTok),
            RateLimits::for_platform(Platform::Generic)
        );
    }

    #[tokio::test]
    async fn denies_request_over_the_minute_limit() {
        let limiter = RateLimiter::new();
        limiter.update_limits(
            Platform::Generic,
            &LimitUpdate { per_minute: Some(3), ..Default::default() },
        );

        for _ in 0..3 {
            limiter.try_acquire(Platform::Generic).unwrap();
        }
        let err = limiter.try_acquire(Platform::Generic).unwrap_err();
        assert_matches!(err, Throttled::Window(wait) if wait > Duration::ZERO);

        let remaining = limiter.remaining(Platform::Generic);
        assert_eq!(remaining, WindowCounts { minute: 0, hour: 997, day: 9_997 });
    }

    #[tokio::test]
    async fn partial_update_keeps_other_limits() {
        let limiter = RateLimiter::new();
        let limits = limiter.update_limits(
            Platform::LinkedIn,
            &LimitUpdate { per_hour: Some(50), ..Default::default() },
        );
        assert_eq!(limits, RateLimits { per_minute: 100, per_hour: 50, per_day: 10_000 });
    }

    #[tokio::test]
    async fn refused_requests_do_not_charge_wider_windows() {
        let limiter = RateLimiter::new();
        limiter.update_limits(
            Platform::Generic,
            &LimitUpdate { per_minute: Some(3), per_hour: Some(5), ..Default::default() },
        );

        for _ in 0..3 {
            limiter.try_acquire(Platform::Generic).unwrap();
        }
        for _ in 0..2 {
            assert_matches!(limiter.try_acquire(Platform::Generic), Err(Throttled::Window(_)));
        }
        assert_eq!(limiter.remaining(Platform::Generic).hour, 2);

        // Lift the minute limit: the hour window still has exactly two left.
        limiter.update_limits(
            Platform::Generic,
            &LimitUpdate { per_minute: Some(100), ..Default::default() },
        );
        for _ in 0..2 {
            limiter.try_acquire(Platform::Generic).unwrap();
        }
        let err = limiter.try_acquire(Platform::Generic).unwrap_err();
        assert_matches!(err, Throttled::Window(wait) if wait > Duration::from_secs(3_500));
        assert_eq!(
            limiter.remaining(Platform::Generic),
            WindowCounts { minute: 95, hour: 0, day: 9_995 }
        );
    }

    #[tokio::test]
    async fn reset_keeps_outstanding_permits_counted() {
        let limiter = RateLimiter::with_max_concurrent(1);
        let permit = limiter.try_acquire(Platform::LinkedIn).unwrap();

        limiter.reset(Some(Platform::LinkedIn));
        assert_matches!(limiter.try_acquire(Platform::LinkedIn), Err(Throttled::Busy));

        limiter.reset(None);
        assert_matches!(limiter.try_acquire(Platform::LinkedIn), Err(Throttled::Busy));

        drop(permit);
        assert!(limiter.try_acquire(Platform::LinkedIn).is_ok());
    }

    #[tokio::test]
    async fn permits_bound_concurrency() {
        let limiter = RateLimiter::with_max_concurrent(1);
        let permit = limiter.try_acquire(Platform::Reddit).unwrap();
        assert_eq!(permit.platform(), Platform::Reddit);
        assert_matches!(limiter.try_acquire(Platform::Reddit), Err(Throttled::Busy));
        // Other platforms have their own slots.
        assert!(limiter.try_acquire(Platform::Twitter).is_ok());

        drop(permit);
        assert!(limiter.try_acquire(Platform::Reddit).is_ok());
    }

    #[tokio::test]
    async fn backoff_blocks_until_expiry() {
        let limiter = RateLimiter::new();
        limiter.trigger_backoff(Platform::Twitter, Duration::from_millis(50));

        assert_matches!(limiter.try_acquire(Platform::Twitter), Err(Throttled::Backoff(_)));
        let status = limiter.status(Platform::Twitter);
        assert!(status.in_backoff);
        assert!(status.backoff_until.is_some());

        let started = Instant::now();
        limiter.acquire(Platform::Twitter).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(40));
        assert!(!limiter.status(Platform::Twitter).in_backoff);
    }

    #[tokio::test]
    async fn reset_clears_counts_and_backoff() {
        let limiter = RateLimiter::new();
        limiter.try_acquire(Platform::YouTube).unwrap();
        limiter.try_acquire(Platform::Instagram).unwrap();
        limiter.trigger_backoff(Platform::YouTube, DEFAULT_BACKOFF);

        limiter.reset(Some(Platform::YouTube));
        let status = limiter.status(Platform::YouTube);
        assert_eq!(status.current_requests, WindowCounts::default());
        assert!(!status.in_backoff);
        assert_eq!(limiter.status(Platform::Instagram).current_requests.minute, 1);

        limiter.reset(None);
        assert_eq!(limiter.status(Platform::Instagram).current_requests.minute, 0);
    }
}
