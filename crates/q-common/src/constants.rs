// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! System-wide constants
//!
//! Sizes here are part of the external command interface and of the
//! persisted record layouts; changing any of them breaks compatibility.

// =============================================================================
// Weaver Slot Constants
// =============================================================================

/// Number of slots exposed by the slot store
pub const NUM_SLOTS: usize = 64;

/// Slot key size in bytes
pub const SLOT_KEY_SIZE: usize = 16;

/// Slot value size in bytes (also the size of every read response)
pub const SLOT_VALUE_SIZE: usize = 16;

/// Failure counter saturation value
pub const FAILURE_COUNT_MAX: u16 = 0x7FFF;

// =============================================================================
// Cryptographic Constants
// =============================================================================

/// SHA-256 output size in bytes
pub const SHA256_OUTPUT_SIZE: usize = 32;

/// RSA-2048 modulus (and PKCS#1 signature) size in bytes
pub const RSA2048_MODULUS_SIZE: usize = 256;

// =============================================================================
// Lock State Constants
// =============================================================================

/// Unlock nonce size in bytes
pub const NONCE_SIZE: usize = 8;

/// Device data digest size in bytes
pub const DEVICE_DATA_SIZE: usize = SHA256_OUTPUT_SIZE;

/// Version byte expected at the start of a carrier unlock token
pub const UNLOCK_TOKEN_VERSION: u8 = 1;

// =============================================================================
// Boot Storage Constants
// =============================================================================

/// Number of configuration registers
pub const CONFIG_REGISTER_COUNT: usize = 2;

/// Number of rollback index locations
pub const ROLLBACK_INDEX_COUNT: usize = 8;

/// Bootloader scratch storage size in bytes
pub const BOOT_STORAGE_SIZE: usize = 4096;
