//! Trailing-edge debouncer.
//!
//! Holds the most recent value until no new value has arrived for the settle
//! time. The debouncer owns no timer: callers ask for [`Debouncer::deadline`]
//! and sleep until then, which keeps it usable from inside an actor loop.

use std::time::Duration;

use tokio::time::Instant;

/// A reset-on-activity debouncer holding the latest pending value.
#[derive(Debug)]
pub struct Debouncer<V> {
    pending: Option<Pending<V>>,
    settle_time: Duration,
}

#[derive(Debug)]
struct Pending<V> {
    value: V,
    last_updated: Instant,
}

impl<V> Debouncer<V> {
    /// Creates a new debouncer with the specified settle time.
    #[must_use]
    pub const fn new(settle_time: Duration) -> Self { Self { pending: None, settle_time } }

    /// Replaces the pending value and restarts the settle period.
    ///
    /// Returns `true` if nothing was pending before.
    pub fn update(&mut self, value: V, now: Instant) -> bool {
        let was_idle = self.pending.is_none();
        self.pending = Some(Pending { value, last_updated: now });
        was_idle
    }

    /// When the pending value settles, if one is pending.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.last_updated + self.settle_time)
    }

    /// Takes the pending value if it has been stable for the settle time.
    pub fn take_settled(&mut self, now: Instant) -> Option<V> {
        let deadline = self.deadline()?;
        if now < deadline {
            return None;
        }
        self.pending.take().map(|p| p.value)
    }

    /// Takes the pending value immediately, bypassing the settle time.
    pub fn flush(&mut self) -> Option<V> { self.pending.take().map(|p| p.value) }

    /// Drops the pending value without delivering it.
    pub fn cancel(&mut self) { self.pending = None; }

    #[must_use]
    pub const fn is_pending(&self) -> bool { self.pending.is_some() }

    #[must_use]
    pub const fn settle_time(&self) -> Duration { self.settle_time }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTLE: Duration = Duration::from_millis(250);

    #[test]
    fn test_value_settles_after_quiet_period() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(SETTLE);
        assert!(debouncer.update(1, start));

        assert_eq!(debouncer.take_settled(start + Duration::from_millis(100)), None);
        assert_eq!(debouncer.take_settled(start + SETTLE), Some(1));
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_activity_resets_deadline() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(SETTLE);
        debouncer.update(1, start);
        assert!(!debouncer.update(2, start + Duration::from_millis(200)));

        assert_eq!(debouncer.take_settled(start + SETTLE), None);
        assert_eq!(debouncer.deadline(), Some(start + Duration::from_millis(450)));
        assert_eq!(debouncer.take_settled(start + Duration::from_millis(450)), Some(2));
    }

    #[test]
    fn test_flush_bypasses_settle_time() {
        let mut debouncer = Debouncer::new(SETTLE);
        debouncer.update("draft", Instant::now());
        assert_eq!(debouncer.flush(), Some("draft"));
        assert_eq!(debouncer.flush(), None);
    }

    #[test]
    fn test_cancel_drops_value() {
        let now = Instant::now();
        let mut debouncer = Debouncer::new(SETTLE);
        debouncer.update(7, now);
        debouncer.cancel();
        assert_eq!(debouncer.take_settled(now + SETTLE), None);
        assert!(debouncer.deadline().is_none());
    }
}
