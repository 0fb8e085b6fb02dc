// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Qbitel Trust Anchor Boot State
//!
//! This crate holds the state the verified-boot chain trusts:
//!
//! - **Lock**: the PROVISION / CARRIER / DEVICE / BOOT lock mask
//! - **Carrier**: signed, replay-protected carrier unlock tokens
//! - **Registers**: boot configuration registers and rollback indexes
//! - **Boot Storage**: bootloader-only scratch storage
//!
//! Every component is an explicitly constructed owner of its record store.
//! Transitions are checked first and then committed as a single atomic
//! record replace, so a rejected command never changes persistent state.

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod carrier;
pub mod lock;
pub mod registers;
pub mod boot_storage;

pub use boot_storage::BootStorage;
pub use carrier::{CarrierUnlock, UnlockToken};
pub use lock::{GlobalState, LockSelector, LockState, LockStateMachine};
pub use registers::BootRegisters;

/// Default record assignment
///
/// Weaver slots occupy records `0..64`; boot state follows them.
pub mod records {
    use q_hal::RecordId;

    /// Lock mask, carrier nonce and device data
    pub const LOCK_STATE: RecordId = RecordId(64);

    /// Configuration registers and rollback indexes
    pub const BOOT_REGISTERS: RecordId = RecordId(65);

    /// Bootloader scratch storage
    pub const BOOT_STORAGE: RecordId = RecordId(66);
}
