//! Pending-reply tracking.
//!
//! When the bridge hands a message with a correlation id to one side, it
//! remembers the id so that a later message carrying the same id from the
//! other side can be recognised as the *reply*.
//!
//! # Why a fixed array instead of a `HashSet`?
//!
//! The tracker's edge behaviour is defined by a single left-to-right scan
//! over [`PENDING_CAPACITY`] slots:
//!
//! - the first empty slot seen *before* an exact match takes the id, and
//!   any later copy of it is cleared so the id is held exactly once,
//! - an exact match seen first is cleared instead (registering the same id
//!   twice cancels tracking),
//! - when every slot is occupied and none matches, the registration is
//!   silently dropped; older entries are never evicted.
//!
//! A hash set would change both the capacity-exhaustion and the toggle
//! behaviour, so the slots are a plain `[u32; N]` where `0` marks a free slot.

use tracing::debug;

/// Maximum number of ids tracked concurrently.
pub const PENDING_CAPACITY: usize = 100;

/// Outcome of [`PendingReplySet::register`].
///
/// The protocol treats registration as fire-and-forget; the outcome exists
/// for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The id now occupies a slot.
    Tracked,
    /// The id was already tracked; its slot has been cleared.
    Cancelled,
    /// Every slot is occupied by other ids; nothing changed.
    Dropped,
    /// `0` is never a live id; nothing changed.
    Ignored,
}

/// Fixed-capacity set of in-flight correlation ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReplySet {
    slots: [u32; PENDING_CAPACITY],
}

impl PendingReplySet {
    /// Creates a tracker with every slot free.
    pub fn new() -> Self {
        Self {
            slots: [0; PENDING_CAPACITY],
        }
    }

    /// Registers `id` as awaiting a reply.
    ///
    /// Scans the slots once, left to right.  Whichever comes first wins:
    /// an empty slot takes the id ([`Registration::Tracked`]) and the scan
    /// continues to clear any later copy, or a slot already holding `id` is
    /// cleared ([`Registration::Cancelled`]).
    ///
    /// ```rust
    /// use cardlink_core::{PendingReplySet, Registration};
    ///
    /// let mut pending = PendingReplySet::new();
    /// assert_eq!(pending.register(7), Registration::Tracked);
    /// assert_eq!(pending.register(7), Registration::Cancelled);
    /// assert!(!pending.contains(7));
    /// ```
    pub fn register(&mut self, id: u32) -> Registration {
        if id == 0 {
            return Registration::Ignored;
        }
        let mut assigned = false;
        for slot in self.slots.iter_mut() {
            if *slot == id {
                *slot = 0;
                if !assigned {
                    return Registration::Cancelled;
                }
            } else if *slot == 0 && !assigned {
                *slot = id;
                assigned = true;
            }
        }
        if assigned {
            return Registration::Tracked;
        }
        debug!("pending-reply tracker full; id {id} not tracked");
        Registration::Dropped
    }

    /// Resolves `id` if it is pending.
    ///
    /// Returns `true` and frees the slot when `id` was tracked; returns
    /// `false` and changes nothing otherwise.
    pub fn claim(&mut self, id: u32) -> bool {
        if id == 0 {
            return false;
        }
        match self.slots.iter_mut().find(|slot| **slot == id) {
            Some(slot) => {
                *slot = 0;
                true
            }
            None => false,
        }
    }

    /// `true` when `id` currently occupies a slot.
    pub fn contains(&self, id: u32) -> bool {
        id != 0 && self.slots.contains(&id)
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|&&slot| slot != 0).count()
    }

    /// `true` when no id is tracked.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|&slot| slot == 0)
    }

    /// `true` when every slot is occupied.
    pub fn is_full(&self) -> bool {
        self.slots.iter().all(|&slot| slot != 0)
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        PENDING_CAPACITY
    }
}

impl Default for PendingReplySet {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_then_claim_frees_slot() {
        // Arrange
        let mut pending = PendingReplySet::new();
        pending.register(42);

        // Act
        let claimed = pending.claim(42);

        // Assert
        assert!(claimed);
        assert!(!pending.contains(42));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_claim_unknown_id_mutates_nothing() {
        // Arrange
        let mut pending = PendingReplySet::new();
        pending.register(1);
        let before = pending.clone();

        // Act
        let claimed = pending.claim(2);

        // Assert
        assert!(!claimed);
        assert_eq!(pending, before);
    }

    #[test]
    fn test_zero_is_never_tracked() {
        let mut pending = PendingReplySet::new();

        assert_eq!(pending.register(0), Registration::Ignored);
        assert!(!pending.claim(0));
        assert!(!pending.contains(0));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_duplicate_registration_toggles() {
        let mut pending = PendingReplySet::new();

        assert_eq!(pending.register(5), Registration::Tracked);
        assert_eq!(pending.register(5), Registration::Cancelled);
        assert_eq!(pending.register(5), Registration::Tracked);
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn test_empty_slot_before_match_takes_the_id() {
        // Arrange: 1 in slot 0, 2 in slot 1, then free slot 0
        let mut pending = PendingReplySet::new();
        pending.register(1);
        pending.register(2);
        pending.claim(1);

        // Act: slot 0 is empty and comes before the existing 2 in slot 1
        let outcome = pending.register(2);

        // Assert: 2 moves to slot 0 and the later copy is cleared
        assert_eq!(outcome, Registration::Tracked);
        assert_eq!(pending.len(), 1);
        assert!(pending.claim(2));
        assert!(!pending.contains(2));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_relocated_id_still_toggles_off() {
        let mut pending = PendingReplySet::new();
        pending.register(1);
        pending.register(2);
        pending.claim(1);
        pending.register(2);

        assert_eq!(pending.register(2), Registration::Cancelled);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_capacity_exhaustion_drops_new_ids() {
        // Arrange: fill every slot
        let mut pending = PendingReplySet::new();
        for id in 1..=PENDING_CAPACITY as u32 {
            assert_eq!(pending.register(id), Registration::Tracked);
        }
        assert!(pending.is_full());

        // Act
        let outcome = pending.register(1_000);

        // Assert: dropped, nothing evicted
        assert_eq!(outcome, Registration::Dropped);
        assert_eq!(pending.len(), PENDING_CAPACITY);
        assert!(pending.contains(1));
        assert!(!pending.contains(1_000));
    }

    #[test]
    fn test_full_tracker_still_toggles_existing_id() {
        let mut pending = PendingReplySet::new();
        for id in 1..=PENDING_CAPACITY as u32 {
            pending.register(id);
        }

        assert_eq!(pending.register(50), Registration::Cancelled);
        assert_eq!(pending.len(), PENDING_CAPACITY - 1);
    }

    #[test]
    fn test_freed_slot_is_reused() {
        let mut pending = PendingReplySet::new();
        for id in 1..=PENDING_CAPACITY as u32 {
            pending.register(id);
        }
        pending.claim(10);

        assert_eq!(pending.register(5_000), Registration::Tracked);
        assert!(pending.contains(5_000));
        assert!(pending.is_full());
    }

    #[test]
    fn test_capacity_is_one_hundred() {
        assert_eq!(PendingReplySet::default().capacity(), 100);
    }
}
