//! Dual sliding-window rate limiting for replies to other automated senders.

use std::{
    collections::VecDeque,
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use dashmap::DashMap;

use lorebot_common::types::{ChannelId, UserId};

const CLEANUP_EVERY_CHECKS: u64 = 512;

/// One bounded admission window.
#[derive(Debug, Clone, Copy)]
pub struct WindowLimit {
    pub max: usize,
    pub window: Duration,
}

/// Short + long window pair. The short window catches bursts; the long
/// window independently caps sustained senders that stay under the burst
/// limit.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub short: WindowLimit,
    pub long: WindowLimit,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            short: WindowLimit {
                max: 5,
                window: Duration::from_secs(10),
            },
            long: WindowLimit {
                max: 8,
                window: Duration::from_secs(60),
            },
        }
    }
}

#[derive(Debug, Default)]
struct PairWindows {
    short: VecDeque<Instant>,
    long: VecDeque<Instant>,
}

/// Admission control keyed by (channel, sender), applied only to senders
/// that are themselves bots.
///
/// Stale pairs are evicted on a check-count cadence so the key space stays
/// bounded; eviction never changes the admission outcome for live senders.
pub struct BotRateLimiter {
    config: RateLimitConfig,
    pairs: DashMap<(ChannelId, UserId), PairWindows>,
    checks_seen: AtomicU64,
}

impl BotRateLimiter {
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            pairs: DashMap::new(),
            checks_seen: AtomicU64::new(0),
        }
    }

    /// Decide admission for a message arriving now. `true` means admitted.
    #[must_use]
    pub fn check(&self, channel: ChannelId, sender: UserId) -> bool {
        self.check_at(channel, sender, Instant::now())
    }

    /// Admission algorithm, per window in (short, long) order: a full queue
    /// whose head is still inside the window denies outright; a full queue
    /// with an expired head frees one slot. Admission pushes onto both
    /// queues. The whole sequence runs under the pair's map entry, so two
    /// concurrent messages cannot both claim the same slot.
    fn check_at(&self, channel: ChannelId, sender: UserId, now: Instant) -> bool {
        let admitted = {
            let mut entry = self.pairs.entry((channel, sender)).or_default();
            let state = entry.value_mut();

            let short_ok = Self::advance(&mut state.short, self.config.short, now);
            let admitted = short_ok && Self::advance(&mut state.long, self.config.long, now);
            if admitted {
                state.short.push_back(now);
                state.long.push_back(now);
            }
            admitted
        };

        self.cleanup_if_needed(now);
        admitted
    }

    /// Returns `false` when the window denies; may pop one expired head.
    fn advance(queue: &mut VecDeque<Instant>, limit: WindowLimit, now: Instant) -> bool {
        if queue.len() >= limit.max {
            match queue.front() {
                Some(&head) if now.duration_since(head) < limit.window => return false,
                _ => {
                    queue.pop_front();
                },
            }
        }
        true
    }

    fn cleanup_if_needed(&self, now: Instant) {
        let seen = self.checks_seen.fetch_add(1, Ordering::Relaxed) + 1;
        if !seen.is_multiple_of(CLEANUP_EVERY_CHECKS) {
            return;
        }
        let stale_after = self.config.long.window.saturating_mul(3);
        self.pairs.retain(|_, state| {
            state
                .long
                .back()
                .is_some_and(|&newest| now.duration_since(newest) <= stale_after)
        });
    }

    /// Number of (channel, sender) pairs currently tracked.
    #[must_use]
    pub fn tracked_pairs(&self) -> usize {
        self.pairs.len()
    }
}

impl Default for BotRateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> BotRateLimiter {
        BotRateLimiter::new(RateLimitConfig::default())
    }

    #[test]
    fn burst_is_denied_then_recovers_after_window() {
        let limiter = limiter();
        let base = Instant::now();

        // 5 admissions within one second all pass
        for i in 0..5 {
            assert!(limiter.check_at(1, 2, base + Duration::from_millis(i * 200)));
        }

        // an immediate 6th is denied
        assert!(!limiter.check_at(1, 2, base + Duration::from_secs(1)));

        // 10 seconds after the first admission, a slot has freed up
        assert!(limiter.check_at(1, 2, base + Duration::from_secs(10)));
    }

    #[test]
    fn denial_does_not_consume_a_slot() {
        let limiter = limiter();
        let base = Instant::now();

        for i in 0..5 {
            assert!(limiter.check_at(1, 2, base + Duration::from_millis(i)));
        }
        // repeated denied attempts leave the queues untouched
        for i in 0..10 {
            assert!(!limiter.check_at(1, 2, base + Duration::from_secs(1) + Duration::from_millis(i)));
        }
        assert!(limiter.check_at(1, 2, base + Duration::from_secs(10)));
    }

    #[test]
    fn long_window_caps_sustained_senders() {
        let limiter = limiter();
        let base = Instant::now();

        // paced to always satisfy the short window: 5 quickly, then one
        // every time the short head expires
        let mut times: Vec<Duration> = (0..5).map(Duration::from_secs).collect();
        times.extend([10, 11, 12].map(Duration::from_secs));
        for at in &times {
            assert!(limiter.check_at(1, 2, base + *at));
        }

        // 8 admissions inside the long window; the 9th is denied even
        // though the short window would admit it
        assert!(!limiter.check_at(1, 2, base + Duration::from_secs(13)));

        // once the oldest admission leaves the long window, flow resumes
        assert!(limiter.check_at(1, 2, base + Duration::from_secs(61)));
    }

    #[test]
    fn pairs_are_independent() {
        let limiter = limiter();
        let base = Instant::now();

        for i in 0..5 {
            assert!(limiter.check_at(1, 2, base + Duration::from_millis(i)));
        }
        assert!(!limiter.check_at(1, 2, base + Duration::from_millis(5)));

        // a different sender in the same channel is unaffected
        assert!(limiter.check_at(1, 3, base + Duration::from_millis(5)));
        // the same sender in a different channel is unaffected
        assert!(limiter.check_at(9, 2, base + Duration::from_millis(5)));
    }

    #[test]
    fn stale_pairs_are_evicted() {
        let limiter = limiter();
        let base = Instant::now();

        assert!(limiter.check_at(1, 2, base));
        assert_eq!(limiter.tracked_pairs(), 1);

        // run enough checks on other keys, far in the future, to trigger a
        // cleanup pass; the original pair is long stale by then
        let later = base + Duration::from_secs(600);
        for i in 0..CLEANUP_EVERY_CHECKS {
            let _ = limiter.check_at(100 + i, 1, later);
        }
        assert!(!limiter.pairs.contains_key(&(1, 2)));

        // the evicted pair starts fresh
        assert!(limiter.check_at(1, 2, later));
    }
}
