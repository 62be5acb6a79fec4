//! Per-note lease table.
//!
//! A lease is a `(note, kind)` marker with an optional expiry. The hub uses
//! leases to keep at most one open in flight per note, to suppress OS echoes
//! of rect changes it issued itself, and to swallow the single resize report
//! that follows a committed resize. Expired leases are cleared lazily on the
//! next lookup.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use super::state::NoteId;

/// What a lease guards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LeaseKind {
    /// An open request is in flight; further opens are de-duplicated.
    Opening,
    /// OS-origin rect reports for the note are ignored.
    EchoBlocked,
    /// The next OS resize report is swallowed once.
    ResizeAck,
}

#[derive(Debug, Default)]
pub struct LeaseTable {
    leases: HashMap<(NoteId, LeaseKind), Option<Instant>>,
}

impl LeaseTable {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Acquire a lease, returning `false` if a live one already exists.
    ///
    /// An expired lease is replaced.
    pub fn acquire(
        &mut self,
        id: &NoteId,
        kind: LeaseKind,
        ttl: Option<Duration>,
        now: Instant,
    ) -> bool {
        if self.is_held(id, kind, now) {
            return false;
        }
        self.leases.insert((id.clone(), kind), ttl.map(|ttl| now + ttl));
        true
    }

    /// Acquire or extend a lease unconditionally.
    pub fn arm(&mut self, id: &NoteId, kind: LeaseKind, ttl: Duration, now: Instant) {
        self.leases.insert((id.clone(), kind), Some(now + ttl));
    }

    /// Whether a live lease exists. Expired leases are removed.
    pub fn is_held(&mut self, id: &NoteId, kind: LeaseKind, now: Instant) -> bool {
        let key = (id.clone(), kind);
        match self.leases.get(&key) {
            None => false,
            Some(None) => true,
            Some(Some(expires_at)) if now < *expires_at => true,
            Some(Some(_)) => {
                self.leases.remove(&key);
                false
            }
        }
    }

    /// Consume a live lease. Returns `true` if one was held.
    pub fn take(&mut self, id: &NoteId, kind: LeaseKind, now: Instant) -> bool {
        let held = self.is_held(id, kind, now);
        if held {
            self.leases.remove(&(id.clone(), kind));
        }
        held
    }

    pub fn release(&mut self, id: &NoteId, kind: LeaseKind) {
        self.leases.remove(&(id.clone(), kind));
    }

    /// Drop every lease held for a note.
    pub fn release_all(&mut self, id: &NoteId) { self.leases.retain(|(note, _), _| note != id); }

    /// Remove expired leases, returning how many were dropped.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.leases.len();
        self.leases.retain(|_, expires_at| expires_at.is_none_or(|at| now < at));
        before - self.leases.len()
    }

    #[must_use]
    pub fn len(&self) -> usize { self.leases.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.leases.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> NoteId { NoteId::new(s) }

    #[test]
    fn test_acquire_is_exclusive_until_released() {
        let now = Instant::now();
        let mut table = LeaseTable::new();
        assert!(table.acquire(&id("a"), LeaseKind::Opening, None, now));
        assert!(!table.acquire(&id("a"), LeaseKind::Opening, None, now));
        assert!(table.acquire(&id("b"), LeaseKind::Opening, None, now));

        table.release(&id("a"), LeaseKind::Opening);
        assert!(table.acquire(&id("a"), LeaseKind::Opening, None, now));
    }

    #[test]
    fn test_kinds_are_independent() {
        let now = Instant::now();
        let mut table = LeaseTable::new();
        table.arm(&id("a"), LeaseKind::EchoBlocked, Duration::from_millis(300), now);
        assert!(!table.is_held(&id("a"), LeaseKind::ResizeAck, now));
        assert!(table.is_held(&id("a"), LeaseKind::EchoBlocked, now));
    }

    #[test]
    fn test_expired_lease_self_clears() {
        let now = Instant::now();
        let mut table = LeaseTable::new();
        table.arm(&id("a"), LeaseKind::EchoBlocked, Duration::from_millis(300), now);
        assert!(table.is_held(&id("a"), LeaseKind::EchoBlocked, now + Duration::from_millis(299)));
        assert!(!table.is_held(&id("a"), LeaseKind::EchoBlocked, now + Duration::from_millis(300)));
        assert!(table.is_empty());
    }

    #[test]
    fn test_take_consumes_once() {
        let now = Instant::now();
        let mut table = LeaseTable::new();
        table.arm(&id("a"), LeaseKind::ResizeAck, Duration::from_millis(300), now);
        assert!(table.take(&id("a"), LeaseKind::ResizeAck, now));
        assert!(!table.take(&id("a"), LeaseKind::ResizeAck, now));
    }

    #[test]
    fn test_release_all_and_purge() {
        let now = Instant::now();
        let mut table = LeaseTable::new();
        table.arm(&id("a"), LeaseKind::EchoBlocked, Duration::from_millis(10), now);
        table.arm(&id("a"), LeaseKind::ResizeAck, Duration::from_millis(10), now);
        table.arm(&id("b"), LeaseKind::EchoBlocked, Duration::from_millis(10), now);
        table.acquire(&id("c"), LeaseKind::Opening, None, now);

        table.release_all(&id("a"));
        assert_eq!(table.len(), 2);
        assert_eq!(table.purge_expired(now + Duration::from_millis(10)), 1);
        assert!(table.is_held(&id("c"), LeaseKind::Opening, now + Duration::from_secs(60)));
    }
}
