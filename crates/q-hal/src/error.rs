// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! HAL error types

use core::fmt;

/// HAL error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    /// Record identifier outside the store
    InvalidRecord,
    /// Record does not fit in the store's record capacity
    RecordTooLarge,
    /// Backing store read failed
    ReadFailed,
    /// Backing store commit failed; the previous image is intact
    CommitFailed,
    /// Record framing or checksum mismatch
    IntegrityCheckFailed,
    /// Decoded record holds values outside their domain
    InvalidEncoding,
}

impl HalError {
    /// Get error code
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::InvalidRecord => 0x0890,
            Self::RecordTooLarge => 0x0891,
            Self::ReadFailed => 0x0892,
            Self::CommitFailed => 0x0893,
            Self::IntegrityCheckFailed => 0x08C2,
            Self::InvalidEncoding => 0x08C3,
        }
    }

    /// Get error description
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::InvalidRecord => "invalid record id",
            Self::RecordTooLarge => "record too large",
            Self::ReadFailed => "store read failed",
            Self::CommitFailed => "store commit failed",
            Self::IntegrityCheckFailed => "record integrity check failed",
            Self::InvalidEncoding => "invalid record encoding",
        }
    }
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:04X}] {}", self.code(), self.description())
    }
}

impl From<HalError> for q_common::Error {
    fn from(e: HalError) -> Self {
        match e {
            HalError::InvalidRecord | HalError::RecordTooLarge => Self::InternalError,
            HalError::ReadFailed => Self::StorageReadFailed,
            HalError::CommitFailed => Self::StorageWriteFailed,
            HalError::IntegrityCheckFailed | HalError::InvalidEncoding => Self::StorageCorrupted,
        }
    }
}

/// HAL Result type
pub type HalResult<T> = Result<T, HalError>;
