//! Trusted time for id generation.
//!
//! The host's own clock is not used: ids must agree with the control
//! module's notion of time, and the control module's clock is network-synced.
//! At startup the bridge reads `card.time` once and anchors a
//! [`SyncedClock`] to it; from then on the clock extrapolates with the
//! monotonic [`Instant`], so wall-clock jumps on the host do not move ids
//! backwards.

use std::time::Instant;

use crate::application::ports::TimeSource;

/// Control-module time extrapolated from a single reading.
#[derive(Debug, Clone, Copy)]
pub struct SyncedClock {
    anchor: Option<(u32, Instant)>,
}

impl SyncedClock {
    /// A clock with no trusted time; every reading is `None`.
    pub fn unsynced() -> Self {
        Self { anchor: None }
    }

    /// A clock that read `unix_secs` just now.
    pub fn anchored(unix_secs: u32) -> Self {
        Self {
            anchor: Some((unix_secs, Instant::now())),
        }
    }

    /// Builds from the result of a clock sync.
    pub fn from_sync(reading: Option<u32>) -> Self {
        reading.map_or_else(Self::unsynced, Self::anchored)
    }

    pub fn is_synced(&self) -> bool {
        self.anchor.is_some()
    }
}

impl TimeSource for SyncedClock {
    fn trusted_now(&self) -> Option<u32> {
        let (base, at) = self.anchor?;
        let elapsed = u32::try_from(at.elapsed().as_secs()).unwrap_or(u32::MAX);
        Some(base.saturating_add(elapsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsynced_clock_is_untrusted() {
        let clock = SyncedClock::unsynced();
        assert!(!clock.is_synced());
        assert_eq!(clock.trusted_now(), None);
    }

    #[test]
    fn test_anchored_clock_starts_at_reading() {
        // Arrange
        let clock = SyncedClock::anchored(1_700_000_000);

        // Act
        let now = clock.trusted_now().expect("synced");

        // Assert: less than a second can have elapsed in practice
        assert!((1_700_000_000..=1_700_000_001).contains(&now));
    }

    #[test]
    fn test_from_sync_maps_option() {
        assert!(SyncedClock::from_sync(Some(5)).is_synced());
        assert!(!SyncedClock::from_sync(None).is_synced());
    }

    #[test]
    fn test_reading_never_overflows() {
        let clock = SyncedClock::anchored(u32::MAX);
        assert_eq!(clock.trusted_now(), Some(u32::MAX));
    }
}
