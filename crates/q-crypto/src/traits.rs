// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Core cryptographic traits
//!
//! The state machines never name a concrete algorithm. They receive a
//! [`SignatureVerifier`] at construction and hash through [`Hash`], so the
//! trust anchor and the digest can be swapped without touching callers.

use crate::error::CryptoResult;

/// Signature verification capability
///
/// Implementations hold a single public key. Only verification is offered;
/// signing happens off-device.
pub trait SignatureVerifier {
    /// Exact signature length accepted, in bytes
    fn signature_len(&self) -> usize;

    /// Verify `signature` over `message`
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidSignatureLength` if the signature length
    /// differs from [`Self::signature_len`], and
    /// `CryptoError::InvalidSignature` if it does not verify.
    fn verify(&self, message: &[u8], signature: &[u8]) -> CryptoResult<()>;
}

impl<T: SignatureVerifier + ?Sized> SignatureVerifier for &T {
    fn signature_len(&self) -> usize {
        (**self).signature_len()
    }

    fn verify(&self, message: &[u8], signature: &[u8]) -> CryptoResult<()> {
        (**self).verify(message, signature)
    }
}

/// Hash function trait
pub trait Hash: Sized {
    /// Output size in bytes
    const OUTPUT_SIZE: usize;
    /// Block size in bytes
    const BLOCK_SIZE: usize;

    /// Output type
    type Output: AsRef<[u8]> + Clone;

    /// Hash a message in one shot
    fn hash(message: &[u8]) -> Self::Output;

    /// Create a new incremental hasher
    fn new() -> Self;

    /// Update the hasher with data
    fn update(&mut self, data: &[u8]);

    /// Finalize and return the hash
    fn finalize(self) -> Self::Output;

    /// Reset the hasher for reuse
    fn reset(&mut self);
}
