//! Adaptive frame polling.
//!
//! Note windows cannot rely on move/resize notifications from every
//! platform, so they sample their own frame. Sampling is fast while the
//! window is being moved and slows down once it has been still for a while.

use std::time::Duration;

use crate::config::SyncConfig;
use crate::modules::board::state::Rect;

/// Picks the delay before the next frame sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollScheduler {
    pub active: Duration,
    pub idle: Duration,
    /// How long after a change polling stays fast.
    pub active_window: Duration,
}

impl Default for PollScheduler {
    fn default() -> Self { Self::from_config(&SyncConfig::default()) }
}

impl PollScheduler {
    #[must_use]
    pub const fn from_config(config: &SyncConfig) -> Self {
        Self {
            active: Duration::from_millis(config.poll_active_ms),
            idle: Duration::from_millis(config.poll_idle_ms),
            active_window: Duration::from_millis(config.active_window_ms),
        }
    }

    /// Delay before the next sample, given the time since the last observed
    /// change (`None` if nothing has changed yet).
    #[must_use]
    pub fn next_delay(&self, since_last_change: Option<Duration>) -> Duration {
        match since_last_change {
            Some(elapsed) if elapsed < self.active_window => self.active,
            _ => self.idle,
        }
    }
}

/// Which parts of the frame changed between two samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RectChange {
    pub moved: bool,
    pub resized: bool,
}

impl RectChange {
    #[must_use]
    pub const fn any(self) -> bool { self.moved || self.resized }
}

/// Edge-triggered frame comparison.
#[derive(Debug, Default, Clone)]
pub struct RectSampler {
    last: Option<Rect>,
}

impl RectSampler {
    #[must_use]
    pub const fn new() -> Self { Self { last: None } }

    /// Record a sample and report what changed since the previous one.
    ///
    /// The first sample is the baseline and reports nothing.
    pub fn observe(&mut self, rect: Rect) -> RectChange {
        let Some(previous) = self.last.replace(rect) else {
            return RectChange::default();
        };
        RectChange {
            moved: rect.position_differs(&previous),
            resized: rect.size_differs(&previous),
        }
    }

    #[must_use]
    pub const fn last(&self) -> Option<Rect> { self.last }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_polling_within_active_window() {
        let scheduler = PollScheduler::default();
        assert_eq!(scheduler.next_delay(Some(Duration::ZERO)), Duration::from_millis(100));
        assert_eq!(scheduler.next_delay(Some(Duration::from_millis(1499))), Duration::from_millis(100));
    }

    #[test]
    fn test_slow_polling_when_idle() {
        let scheduler = PollScheduler::default();
        assert_eq!(scheduler.next_delay(Some(Duration::from_millis(1500))), Duration::from_millis(450));
        assert_eq!(scheduler.next_delay(None), Duration::from_millis(450));
    }

    #[test]
    fn test_first_sample_is_baseline() {
        let mut sampler = RectSampler::new();
        assert!(!sampler.observe(Rect::new(0.0, 0.0, 100.0, 100.0)).any());
        assert_eq!(sampler.last(), Some(Rect::new(0.0, 0.0, 100.0, 100.0)));
    }

    #[test]
    fn test_move_and_resize_reported_independently() {
        let mut sampler = RectSampler::new();
        sampler.observe(Rect::new(0.0, 0.0, 100.0, 100.0));

        let change = sampler.observe(Rect::new(10.0, 0.0, 100.0, 100.0));
        assert_eq!(change, RectChange { moved: true, resized: false });

        let change = sampler.observe(Rect::new(10.0, 0.0, 120.0, 100.0));
        assert_eq!(change, RectChange { moved: false, resized: true });

        let change = sampler.observe(Rect::new(0.0, 5.0, 50.0, 50.0));
        assert_eq!(change, RectChange { moved: true, resized: true });

        assert!(!sampler.observe(Rect::new(0.0, 5.0, 50.0, 50.0)).any());
    }
}
