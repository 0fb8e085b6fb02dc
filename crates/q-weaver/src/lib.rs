// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Qbitel Weaver Slot Store
//!
//! Rollback-protected key/value slots with exponential-backoff throttling.
//! A caller stores a 16-byte value under a 16-byte key and can only read the
//! value back by presenting the key. Wrong keys are counted per slot and
//! throttled by [`throttle::throttle`].
//!
//! # Layers
//!
//! 1. **Throttle policy**: pure failure-count to backoff mapping
//! 2. **Slot**: one key/value pair with its throttle state, updated atomically
//! 3. **Slot store**: the fixed slot table plus identifier/length validation
//!
//! # Security
//!
//! - Keys are compared in constant time
//! - The backoff window is enforced before the key is examined
//! - A wrong key is persisted before the caller learns the outcome
//! - Slot contents are zeroized when dropped and never logged

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(test)]
extern crate std;

pub mod throttle;
pub mod slot;
pub mod store;

pub use slot::{ReadOutcome, Slot, SlotId};
pub use store::SlotStore;
pub use throttle::{encode_backoff, throttle};

use q_common::Result;

/// Slot storage capability
///
/// The command dispatcher receives this capability instead of a concrete
/// store. All identifiers are the raw 32-bit values from the command.
pub trait Slots {
    /// Number of slots
    fn num_slots(&self) -> usize;

    /// Store `value` under `key` in slot `slot_id`
    ///
    /// # Errors
    ///
    /// `InvalidSlotId`, `WrongLength` or a storage error.
    fn write(&mut self, slot_id: u32, key: &[u8], value: &[u8]) -> Result<()>;

    /// Read slot `slot_id` with `key` into `out` (always 16 bytes written)
    ///
    /// # Errors
    ///
    /// `InvalidSlotId`, `WrongLength`, `BackOff`, `WrongKey` or a storage
    /// error.
    fn read(&mut self, slot_id: u32, key: &[u8], out: &mut [u8]) -> Result<()>;

    /// Erase every slot
    ///
    /// # Errors
    ///
    /// A storage error from the first slot that could not be erased.
    fn erase_all(&mut self) -> Result<()>;
}
