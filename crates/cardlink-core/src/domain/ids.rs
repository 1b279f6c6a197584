//! Unique correlation-id generation.
//!
//! # Where do ids come from?
//!
//! Every message the bridge originates carries a nonzero `id` so that a
//! reply can be matched back to it.  Ids are *time-derived* when possible:
//! when a trusted clock is available and its current value (Unix seconds) is
//! ahead of the last id handed out, that value becomes the new id.  This
//! keeps ids meaningful to the cloud side and unique across restarts.
//!
//! When there is no trusted clock, or several ids are needed within the same
//! second, the generator falls back to `last_issued + 1`.  Once the counter
//! has run ahead of the clock it keeps counting until the clock catches up.
//!
//! # Ownership
//!
//! Unlike a shared atomic counter, the generator is mutated through
//! `&mut self`: it is owned by the single bridge context, which is the only
//! code that issues ids.  The clock reading is passed in by the caller so
//! this type stays free of I/O.

/// Monotonically increasing id source.
///
/// # Examples
///
/// ```rust
/// use cardlink_core::UniqueIdGenerator;
///
/// let mut ids = UniqueIdGenerator::new();
/// assert_eq!(ids.next(Some(1_700_000_000)), 1_700_000_000);
/// assert_eq!(ids.next(Some(1_700_000_000)), 1_700_000_001); // same second
/// assert_eq!(ids.next(None), 1_700_000_002);                 // no clock
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniqueIdGenerator {
    /// The most recently issued id; `0` before the first call.
    last_issued: u32,
}

impl UniqueIdGenerator {
    /// Creates a generator that has not issued anything yet.
    pub fn new() -> Self {
        Self { last_issued: 0 }
    }

    /// Returns the next id.
    ///
    /// `trusted_now` is the current time in seconds from a trusted clock, or
    /// `None` when no such clock is available.
    ///
    /// The result is never `0` and is strictly greater than every id issued
    /// before it, with one exception: after `u32::MAX` the counter wraps to
    /// `1` (136 years of one id per second).
    pub fn next(&mut self, trusted_now: Option<u32>) -> u32 {
        if let Some(now) = trusted_now {
            if now > self.last_issued {
                self.last_issued = now;
                return now;
            }
        }
        self.last_issued = match self.last_issued.wrapping_add(1) {
            0 => 1,
            id => id,
        };
        self.last_issued
    }

    /// The most recently issued id, without issuing a new one.
    pub fn last_issued(&self) -> u32 {
        self.last_issued
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_id_without_clock_is_one() {
        // Arrange
        let mut ids = UniqueIdGenerator::new();

        // Act
        let first = ids.next(None);

        // Assert
        assert_eq!(first, 1);
    }

    #[test]
    fn test_clock_value_is_used_when_ahead() {
        let mut ids = UniqueIdGenerator::new();
        assert_eq!(ids.next(Some(1000)), 1000);
        assert_eq!(ids.next(Some(2000)), 2000);
        assert_eq!(ids.last_issued(), 2000);
    }

    #[test]
    fn test_same_second_falls_back_to_counter() {
        let mut ids = UniqueIdGenerator::new();
        assert_eq!(ids.next(Some(1000)), 1000);
        assert_eq!(ids.next(Some(1000)), 1001);
        assert_eq!(ids.next(Some(1000)), 1002);
    }

    #[test]
    fn test_clock_behind_counter_is_ignored() {
        // Arrange – counter has run ahead of the clock
        let mut ids = UniqueIdGenerator::new();
        ids.next(Some(1000));
        ids.next(Some(1000)); // 1001

        // Act – clock goes backwards
        let id = ids.next(Some(500));

        // Assert
        assert_eq!(id, 1002);
    }

    #[test]
    fn test_ids_strictly_increase_with_mixed_clock_availability() {
        // Arrange
        let mut ids = UniqueIdGenerator::new();
        let readings = [
            None,
            Some(10),
            Some(10),
            None,
            Some(5),
            Some(100),
            None,
            Some(101),
            Some(101),
        ];

        // Act
        let values: Vec<u32> = readings.iter().map(|&now| ids.next(now)).collect();

        // Assert – values must be strictly increasing and nonzero
        assert!(values.iter().all(|&v| v != 0));
        for window in values.windows(2) {
            assert!(
                window[1] > window[0],
                "ids must strictly increase: {values:?}"
            );
        }
    }

    #[test]
    fn test_counter_wraps_to_one_not_zero() {
        // Arrange – start one step before overflow
        let mut ids = UniqueIdGenerator {
            last_issued: u32::MAX,
        };

        // Act
        let wrapped = ids.next(None);

        // Assert
        assert_eq!(wrapped, 1, "generator must never return 0");
    }

    #[test]
    fn test_default_matches_new() {
        assert_eq!(UniqueIdGenerator::default(), UniqueIdGenerator::new());
    }
}
