//! Block Height Clock
//!
//! Converts a distance in block height into a wall-clock estimate.
//! The chain has no notion of seconds, only heights.

use serde::{Deserialize, Serialize};

/// Default block time of the target chain.
pub const DEFAULT_SECONDS_PER_BLOCK: u64 = 6;

/// Height-to-seconds adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockClock {
    /// Estimated seconds per block.
    pub seconds_per_block: u64,
}

impl Default for BlockClock {
    fn default() -> Self {
        Self::new(DEFAULT_SECONDS_PER_BLOCK)
    }
}

impl BlockClock {
    /// Create a clock with the given block time.
    pub const fn new(seconds_per_block: u64) -> Self {
        Self { seconds_per_block }
    }

    /// Seconds until `deadline_height` is reached, clamped at zero.
    #[inline]
    pub fn seconds_until(&self, deadline_height: u64, current_height: u64) -> u64 {
        seconds_remaining(deadline_height, current_height, self.seconds_per_block)
    }
}

/// `max(0, (deadline - current) * seconds_per_block)`.
#[inline]
pub fn seconds_remaining(deadline_height: u64, current_height: u64, seconds_per_block: u64) -> u64 {
    deadline_height
        .saturating_sub(current_height)
        .saturating_mul(seconds_per_block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_ten_blocks_ahead() {
        let clock = BlockClock::new(6);
        assert_eq!(clock.seconds_until(110, 100), 60);
    }

    #[test]
    fn test_deadline_reached() {
        let clock = BlockClock::default();
        assert_eq!(clock.seconds_until(100, 100), 0);
        assert_eq!(clock.seconds_until(90, 100), 0);
    }

    #[test]
    fn test_no_overflow() {
        assert_eq!(seconds_remaining(u64::MAX, 0, 6), u64::MAX);
    }

    proptest! {
        #[test]
        fn prop_past_deadline_is_zero(current in 0u64..1_000_000, behind in 0u64..1_000_000, spb in 1u64..30) {
            let deadline = current.saturating_sub(behind);
            prop_assert_eq!(seconds_remaining(deadline, current, spb), 0);
        }
    }
}
