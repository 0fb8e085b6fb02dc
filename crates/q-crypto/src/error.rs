// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Cryptographic error types

use core::fmt;

/// Error type for cryptographic operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    /// Public key components are malformed or out of range
    InvalidKey,
    /// Signature verification failed
    InvalidSignature,
    /// Signature has the wrong length for the verifying key
    InvalidSignatureLength,
    /// Internal error (should not occur)
    InternalError,
}

impl CryptoError {
    /// Get error code for logging/debugging
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::InvalidKey => 0x0101,
            Self::InvalidSignature => 0x0102,
            Self::InvalidSignatureLength => 0x0103,
            Self::InternalError => 0x01FF,
        }
    }

    /// Get error description
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::InvalidKey => "invalid key",
            Self::InvalidSignature => "invalid signature",
            Self::InvalidSignatureLength => "invalid signature length",
            Self::InternalError => "internal error",
        }
    }
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:04X}] {}", self.code(), self.description())
    }
}

impl From<CryptoError> for q_common::Error {
    fn from(e: CryptoError) -> Self {
        match e {
            // A signature that does not verify is an authorization failure.
            CryptoError::InvalidSignature | CryptoError::InvalidSignatureLength => {
                Self::SecurityStatusNotSatisfied
            }
            CryptoError::InvalidKey | CryptoError::InternalError => Self::CryptoError,
        }
    }
}

/// Result type for cryptographic operations
pub type CryptoResult<T> = Result<T, CryptoError>;
