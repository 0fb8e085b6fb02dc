// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Common types
//!
//! Small value types shared by the slot store and the boot-state components.

use core::fmt;

use crate::constants::NONCE_SIZE;

/// Privilege of the caller issuing a command
///
/// The bootloader runs before the operating system and may perform
/// transitions the operating system may not (and vice versa for the device
/// lock, which only the running system may change).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Privilege {
    /// Command issued by the bootloader
    Bootloader,
    /// Command issued by the running operating system
    Os,
}

impl Privilege {
    /// Check for bootloader privilege
    #[must_use]
    pub const fn is_bootloader(&self) -> bool {
        matches!(self, Self::Bootloader)
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bootloader => write!(f, "bootloader"),
            Self::Os => write!(f, "os"),
        }
    }
}

/// Carrier unlock nonce
///
/// Transported and stored little-endian; compared as an unsigned integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Nonce(u64);

impl Nonce {
    /// Initial nonce after a reset
    pub const ZERO: Self = Self(0);

    /// Create from an integer value
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the integer value
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Decode from the 8-byte little-endian wire form
    #[must_use]
    pub const fn from_le_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(u64::from_le_bytes(bytes))
    }

    /// Encode to the 8-byte little-endian wire form
    #[must_use]
    pub const fn to_le_bytes(&self) -> [u8; NONCE_SIZE] {
        self.0.to_le_bytes()
    }
}
