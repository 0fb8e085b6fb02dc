// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Secure memory utilities
//!
//! Constant-time selection and zero checks for slot keys and values, and
//! zeroization of scratch buffers.

use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};
use zeroize::Zeroize;

/// Securely zero memory
///
/// The write cannot be elided by the optimizer even if `data` is never read
/// again.
#[inline(never)]
pub fn secure_zero(data: &mut [u8]) {
    data.zeroize();
}

/// Constant-time conditional copy
///
/// Copies `src` into `dst` when `choice` is set and leaves `dst` untouched
/// otherwise, touching every byte either way.
pub fn constant_time_copy(choice: Choice, dst: &mut [u8], src: &[u8]) {
    debug_assert_eq!(dst.len(), src.len());

    for (d, s) in dst.iter_mut().zip(src.iter()) {
        d.conditional_assign(s, choice);
    }
}

/// Check if all bytes are zero in constant time
#[must_use]
pub fn is_zero(data: &[u8]) -> bool {
    let mut acc: u8 = 0;
    for &byte in data {
        acc |= byte;
    }
    bool::from(acc.ct_eq(&0))
}
