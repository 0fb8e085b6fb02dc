// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Time utilities
//!
//! Instants are milliseconds on a monotonic clock that never goes backwards
//! while the element is powered. Durations are 32-bit milliseconds, which
//! covers the longest backoff (one day) with room to spare.

use core::ops::{Add, Sub};

/// Monotonic instant in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Ticks(u64);

impl Ticks {
    /// Clock origin
    pub const ZERO: Self = Self(0);

    /// Create from a raw millisecond count
    #[must_use]
    pub const fn new(ms: u64) -> Self {
        Self(ms)
    }

    /// Get the raw millisecond count
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Milliseconds elapsed since this instant (0 if `now` is earlier)
    #[must_use]
    pub const fn elapsed(&self, now: Self) -> u64 {
        now.0.saturating_sub(self.0)
    }

    /// Time left until this instant is reached, clamped to `Millis::MAX`
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn remaining(&self, now: Self) -> Millis {
        let left = self.0.saturating_sub(now.0);
        if left > u32::MAX as u64 {
            Millis::MAX
        } else {
            Millis::new(left as u32)
        }
    }

    /// Instant `duration` after this one
    #[must_use]
    pub const fn after(&self, duration: Millis) -> Self {
        Self(self.0.saturating_add(duration.as_millis() as u64))
    }

    /// Little-endian encoding used in persisted records
    #[must_use]
    pub const fn to_le_bytes(&self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    /// Decode from the little-endian record encoding
    #[must_use]
    pub const fn from_le_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_le_bytes(bytes))
    }
}

impl From<u64> for Ticks {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Ticks> for u64 {
    fn from(value: Ticks) -> Self {
        value.0
    }
}

impl Add<Millis> for Ticks {
    type Output = Self;

    fn add(self, rhs: Millis) -> Self::Output {
        self.after(rhs)
    }
}

impl Sub<Ticks> for Ticks {
    type Output = u64;

    fn sub(self, rhs: Ticks) -> Self::Output {
        self.0.saturating_sub(rhs.0)
    }
}

/// Duration in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Millis(u32);

impl Millis {
    /// Create from milliseconds
    #[must_use]
    pub const fn new(ms: u32) -> Self {
        Self(ms)
    }

    /// Create from seconds
    #[must_use]
    pub const fn from_secs(secs: u32) -> Self {
        Self(secs.saturating_mul(1000))
    }

    /// Get as milliseconds
    #[must_use]
    pub const fn as_millis(&self) -> u32 {
        self.0
    }

    /// Get as seconds (truncated)
    #[must_use]
    pub const fn as_secs(&self) -> u32 {
        self.0 / 1000
    }

    /// Check for the zero duration
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Zero duration
    pub const ZERO: Self = Self(0);

    /// Maximum duration
    pub const MAX: Self = Self(u32::MAX);
}

impl From<u32> for Millis {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<Millis> for u32 {
    fn from(value: Millis) -> Self {
        value.0
    }
}

impl Add for Millis {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Millis {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_sub(rhs.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_counts_down() {
        let deadline = Ticks::new(1_000).after(Millis::from_secs(30));
        assert_eq!(deadline.remaining(Ticks::new(1_000)), Millis::new(30_000));
        assert_eq!(deadline.remaining(Ticks::new(30_999)), Millis::new(1));
        assert_eq!(deadline.remaining(Ticks::new(31_000)), Millis::ZERO);
        assert_eq!(deadline.remaining(Ticks::new(99_000)), Millis::ZERO);
    }

    #[test]
    fn test_remaining_clamps() {
        let far = Ticks::new(u64::MAX);
        assert_eq!(far.remaining(Ticks::ZERO), Millis::MAX);
    }

    #[test]
    fn test_saturating_arithmetic() {
        assert_eq!(Ticks::new(u64::MAX) + Millis::new(5), Ticks::new(u64::MAX));
        assert_eq!(Ticks::new(3) - Ticks::new(5), 0);
        assert_eq!(Millis::new(3) - Millis::new(5), Millis::ZERO);
        assert_eq!(Millis::MAX + Millis::new(1), Millis::MAX);
    }
}
