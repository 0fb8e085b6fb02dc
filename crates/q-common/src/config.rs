// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! System configuration
//!
//! All configuration is fixed at build or provisioning time. Each structure
//! carries a `DEFAULT` constant so it can be used in `const` contexts and
//! in statics on targets without an allocator.

use crate::errors::{Error, Result};
use crate::log::LogLevel;

/// System-wide configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemConfig {
    /// Slot throttling schedule
    pub throttle: ThrottleConfig,
    /// Lock state machine policy
    pub lock: LockConfig,
    /// Audit log configuration
    pub log: LogConfig,
}

impl SystemConfig {
    /// Default configuration
    pub const DEFAULT: Self = Self {
        throttle: ThrottleConfig::DEFAULT,
        lock: LockConfig::DEFAULT,
        log: LogConfig::DEFAULT,
    };

    /// Validate every sub-configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidData` if any section is inconsistent.
    pub const fn validate(&self) -> Result<()> {
        self.throttle.validate()
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Backoff schedule applied after consecutive wrong keys
///
/// The schedule has four bands:
///
/// ```text
/// count <  free_attempts                     0
/// count <  doubling_start                    flat_backoff_ms
/// count <  permanent_after                   flat_backoff_ms << ((count - doubling_start) / doubling_step)
/// otherwise                                  max_backoff_ms
/// ```
///
/// Every band is clamped to `max_backoff_ms`, which keeps the schedule
/// monotonic in the failure count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleConfig {
    /// Failures tolerated before any backoff applies
    pub free_attempts: u16,
    /// Backoff of the flat band, in milliseconds
    pub flat_backoff_ms: u32,
    /// Failure count at which the backoff starts doubling
    pub doubling_start: u16,
    /// Failures per doubling step
    pub doubling_step: u16,
    /// Failure count from which the maximum backoff applies
    pub permanent_after: u16,
    /// Upper bound on any backoff, in milliseconds
    pub max_backoff_ms: u32,
}

impl ThrottleConfig {
    /// Default schedule: 5 free attempts, 30 s flat, doubling every 10
    /// failures from 30, one day from 140 on
    pub const DEFAULT: Self = Self {
        free_attempts: 5,
        flat_backoff_ms: 30_000,
        doubling_start: 30,
        doubling_step: 10,
        permanent_after: 140,
        max_backoff_ms: 86_400_000,
    };

    /// Check that the bands are ordered and non-empty
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidData` when the thresholds are out of order,
    /// the doubling step is zero or the flat backoff exceeds the maximum.
    pub const fn validate(&self) -> Result<()> {
        if self.doubling_step == 0
            || self.free_attempts == 0
            || self.free_attempts > self.doubling_start
            || self.doubling_start > self.permanent_after
            || self.flat_backoff_ms > self.max_backoff_ms
        {
            return Err(Error::InvalidData);
        }
        Ok(())
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Lock state machine policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockConfig {
    /// Accept an unlock token whose nonce equals the stored nonce
    pub allow_equal_nonce: bool,
}

impl LockConfig {
    /// Default policy: equal nonces are accepted
    pub const DEFAULT: Self = Self {
        allow_equal_nonce: true,
    };

    /// Strict policy: every unlock must present a larger nonce
    pub const STRICT: Self = Self {
        allow_equal_nonce: false,
    };
}

impl Default for LockConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Audit log configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    /// Most verbose level recorded
    pub min_level: LogLevel,
}

impl LogConfig {
    /// Default log configuration
    pub const DEFAULT: Self = Self {
        min_level: LogLevel::Info,
    };

    /// Development log configuration (records debug events)
    pub const DEVELOPMENT: Self = Self {
        min_level: LogLevel::Debug,
    };
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
