// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Hash function implementations
//!
//! SHA-256 backed by the `sha2` crate. It digests carrier device data and
//! extends the boot configuration registers.

use crate::traits::Hash;
use q_common::constants::SHA256_OUTPUT_SIZE;
use sha2::{Digest, Sha256 as Sha256Impl};

/// SHA-256 hash output
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Sha256Output([u8; SHA256_OUTPUT_SIZE]);

impl Sha256Output {
    /// Create from bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; SHA256_OUTPUT_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the digest bytes
    #[must_use]
    pub const fn to_bytes(&self) -> [u8; SHA256_OUTPUT_SIZE] {
        self.0
    }
}

impl AsRef<[u8]> for Sha256Output {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; SHA256_OUTPUT_SIZE]> for Sha256Output {
    fn from(bytes: [u8; SHA256_OUTPUT_SIZE]) -> Self {
        Self(bytes)
    }
}

impl From<Sha256Output> for [u8; SHA256_OUTPUT_SIZE] {
    fn from(output: Sha256Output) -> Self {
        output.0
    }
}

impl core::fmt::Debug for Sha256Output {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Sha256Output(")?;
        for byte in &self.0[..4] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "...)")
    }
}

/// SHA-256 hasher
#[derive(Clone)]
pub struct Sha256 {
    inner: Sha256Impl,
}

impl Sha256 {
    fn output(digest: &[u8]) -> Sha256Output {
        let mut output = [0u8; SHA256_OUTPUT_SIZE];
        output.copy_from_slice(digest);
        Sha256Output(output)
    }

    /// Hash the concatenation of two inputs
    #[must_use]
    pub fn hash_pair(first: &[u8], second: &[u8]) -> Sha256Output {
        let mut hasher = <Self as Hash>::new();
        hasher.update(first);
        hasher.update(second);
        hasher.finalize()
    }
}

impl Hash for Sha256 {
    const OUTPUT_SIZE: usize = SHA256_OUTPUT_SIZE;
    const BLOCK_SIZE: usize = 64;

    type Output = Sha256Output;

    fn hash(message: &[u8]) -> Self::Output {
        Self::output(&Sha256Impl::digest(message))
    }

    fn new() -> Self {
        Self {
            inner: Sha256Impl::new(),
        }
    }

    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.inner, data);
    }

    fn finalize(self) -> Self::Output {
        Self::output(&self.inner.finalize())
    }

    fn reset(&mut self) {
        Digest::reset(&mut self.inner);
    }
}

impl Default for Sha256 {
    fn default() -> Self {
        <Self as Hash>::new()
    }
}
