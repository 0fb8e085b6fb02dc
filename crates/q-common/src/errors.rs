// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Error types for the secure-element trust anchor
//!
//! One error type is shared by the slot store, the lock state machine and the
//! boot registers. Every variant is `Copy`, carries no heap data and maps to a
//! distinct ISO 7816 style status word so the command dispatcher can answer
//! without further translation.

use core::fmt;

/// Result type alias for trust-anchor operations
pub type Result<T> = core::result::Result<T, Error>;

/// Status word returned for a successful command
pub const SW_NO_ERROR: u16 = 0x9000;

/// Unified error type
///
/// None of these errors is fatal: each one rejects a single command and
/// leaves persistent state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    // =========================================================================
    // Slot errors
    // =========================================================================
    /// Slot identifier has non-zero high bits or exceeds the slot count
    InvalidSlotId,
    /// Presented key does not match; the slot is throttled for `backoff_ms`
    WrongKey {
        /// Backoff imposed by this failure, in milliseconds
        backoff_ms: u32,
    },
    /// Slot is still inside its backoff window
    BackOff {
        /// Time left before the slot accepts another attempt, in milliseconds
        remaining_ms: u32,
    },

    // =========================================================================
    // Command errors
    // =========================================================================
    /// Key, value or output buffer has the wrong length
    WrongLength,
    /// Transition rejected by the current state
    ConditionsNotSatisfied,
    /// Caller lacks the privilege, or a signature did not verify
    SecurityStatusNotSatisfied,
    /// Payload is malformed
    InvalidData,
    /// Unknown lock selector or register index
    InvalidSelector,
    /// Offset outside the addressed storage area
    OutOfBounds,

    // =========================================================================
    // Platform errors
    // =========================================================================
    /// Persistent store read failed
    StorageReadFailed,
    /// Persistent store commit failed; previous contents are intact
    StorageWriteFailed,
    /// Persisted record failed its integrity check
    StorageCorrupted,
    /// Cryptographic primitive failed
    CryptoError,
    /// Internal error (should not occur)
    InternalError,
}

impl Error {
    /// Get the status word for this error
    ///
    /// Weaver errors keep their historic values (`0x6A85`..`0x6A87`); the rest
    /// follow ISO 7816-4.
    #[must_use]
    pub const fn status_word(&self) -> u16 {
        match self {
            Self::WrongKey { .. } => 0x6A85,
            Self::InvalidSlotId => 0x6A86,
            Self::BackOff { .. } => 0x6A87,

            Self::WrongLength => 0x6700,
            Self::SecurityStatusNotSatisfied => 0x6982,
            Self::InvalidData => 0x6984,
            Self::ConditionsNotSatisfied => 0x6985,
            Self::OutOfBounds => 0x6A84,
            Self::InvalidSelector => 0x6B00,

            Self::StorageWriteFailed => 0x6581,
            Self::StorageReadFailed => 0x6F01,
            Self::StorageCorrupted => 0x6F02,
            Self::CryptoError => 0x6F03,
            Self::InternalError => 0x6F00,
        }
    }

    /// Milliseconds the caller must wait before retrying, if any
    #[must_use]
    pub const fn backoff_ms(&self) -> Option<u32> {
        match self {
            Self::WrongKey { backoff_ms } => Some(*backoff_ms),
            Self::BackOff { remaining_ms } => Some(*remaining_ms),
            _ => None,
        }
    }

    /// Check if this error reflects a failed authentication or authorization
    #[must_use]
    pub const fn is_security_error(&self) -> bool {
        matches!(
            self,
            Self::WrongKey { .. } | Self::BackOff { .. } | Self::SecurityStatusNotSatisfied
        )
    }

    /// Get a short description of the error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::InvalidSlotId => "invalid slot id",
            Self::WrongKey { .. } => "wrong key",
            Self::BackOff { .. } => "slot throttled",
            Self::WrongLength => "wrong length",
            Self::ConditionsNotSatisfied => "conditions not satisfied",
            Self::SecurityStatusNotSatisfied => "security status not satisfied",
            Self::InvalidData => "invalid data",
            Self::InvalidSelector => "invalid selector",
            Self::OutOfBounds => "offset out of bounds",
            Self::StorageReadFailed => "storage read failed",
            Self::StorageWriteFailed => "storage write failed",
            Self::StorageCorrupted => "storage corrupted",
            Self::CryptoError => "crypto error",
            Self::InternalError => "internal error",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:04X}] {}", self.status_word(), self.description())?;
        if let Some(ms) = self.backoff_ms() {
            write!(f, " ({ms} ms)")?;
        }
        Ok(())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "[0x{:04X}] {}", self.status_word(), self.description());
    }
}
