// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Carrier unlock tokens
//!
//! A carrier-locked device is bound to device data supplied at the factory.
//! Only its SHA-256 digest is kept. The carrier later releases the lock by
//! signing `nonce || digest` with the key whose public half is embedded in
//! the element.
//!
//! Token layout:
//!
//! ```text
//! +---------+-----------------+---------------------------+
//! | version | nonce (8, LE)   | signature (verifier len)  |
//! +---------+-----------------+---------------------------+
//! ```
//!
//! Verification order is fixed: layout, then signature, then nonce
//! freshness. A token with a valid signature over a stale nonce is therefore
//! reported as a replay rather than a forgery.

use q_common::config::LockConfig;
use q_common::constants::{DEVICE_DATA_SIZE, NONCE_SIZE, UNLOCK_TOKEN_VERSION};
use q_common::{Error, Nonce, Result};
use q_crypto::{Hash, Sha256, SignatureVerifier};

/// Length of the signed unlock message
pub const UNLOCK_MESSAGE_SIZE: usize = NONCE_SIZE + DEVICE_DATA_SIZE;

/// Length of the token header (version and nonce)
pub const TOKEN_HEADER_SIZE: usize = 1 + NONCE_SIZE;

/// Parsed unlock token, borrowing its signature from the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnlockToken<'a> {
    nonce: Nonce,
    signature: &'a [u8],
}

impl<'a> UnlockToken<'a> {
    /// Split `payload` into its fields
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidData` if the total length is not
    /// `1 + 8 + signature_len` or the version byte is unknown.
    pub fn parse(payload: &'a [u8], signature_len: usize) -> Result<Self> {
        if payload.len() != TOKEN_HEADER_SIZE + signature_len {
            return Err(Error::InvalidData);
        }
        let (header, signature) = payload.split_at(TOKEN_HEADER_SIZE);
        if header[0] != UNLOCK_TOKEN_VERSION {
            return Err(Error::InvalidData);
        }

        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&header[1..]);
        Ok(Self {
            nonce: Nonce::from_le_bytes(nonce),
            signature,
        })
    }

    /// Nonce carried by the token
    #[must_use]
    pub const fn nonce(&self) -> Nonce {
        self.nonce
    }

    /// Signature bytes
    #[must_use]
    pub const fn signature(&self) -> &'a [u8] {
        self.signature
    }
}

/// Message signed by the carrier: `nonce (LE) || device data digest`
#[must_use]
pub fn unlock_message(
    nonce: Nonce,
    device_data: &[u8; DEVICE_DATA_SIZE],
) -> [u8; UNLOCK_MESSAGE_SIZE] {
    let mut message = [0u8; UNLOCK_MESSAGE_SIZE];
    message[..NONCE_SIZE].copy_from_slice(&nonce.to_le_bytes());
    message[NONCE_SIZE..].copy_from_slice(device_data);
    message
}

/// Digest stored when the carrier lock is enabled
#[must_use]
pub fn device_data_digest(payload: &[u8]) -> [u8; DEVICE_DATA_SIZE] {
    Sha256::hash(payload).to_bytes()
}

/// Carrier unlock verifier
///
/// Wraps the signature verifier holding the trust anchor together with the
/// nonce policy.
pub struct CarrierUnlock<V: SignatureVerifier> {
    verifier: V,
    config: LockConfig,
}

impl<V: SignatureVerifier> CarrierUnlock<V> {
    /// Create a verifier with the given nonce policy
    pub const fn new(verifier: V, config: LockConfig) -> Self {
        Self { verifier, config }
    }

    /// Signature length expected in a token
    #[must_use]
    pub fn signature_len(&self) -> usize {
        self.verifier.signature_len()
    }

    /// Total token length expected by [`CarrierUnlock::verify`]
    #[must_use]
    pub fn token_len(&self) -> usize {
        TOKEN_HEADER_SIZE + self.signature_len()
    }

    /// Nonce policy
    #[must_use]
    pub const fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Verify `payload` against the stored nonce and device data
    ///
    /// Returns the token nonce, which becomes the new stored nonce.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidData` for a malformed token
    /// - `Error::SecurityStatusNotSatisfied` if the signature does not verify
    /// - `Error::ConditionsNotSatisfied` if the nonce is older than
    ///   `last_nonce` (or equal, under [`LockConfig::STRICT`])
    pub fn verify(
        &self,
        last_nonce: Nonce,
        device_data: &[u8; DEVICE_DATA_SIZE],
        payload: &[u8],
    ) -> Result<Nonce> {
        let token = UnlockToken::parse(payload, self.signature_len())?;

        let message = unlock_message(token.nonce(), device_data);
        self.verifier.verify(&message, token.signature())?;

        if !self.nonce_is_fresh(last_nonce, token.nonce()) {
            return Err(Error::ConditionsNotSatisfied);
        }
        Ok(token.nonce())
    }

    /// Run [`CarrierUnlock::verify`] on caller-supplied state
    ///
    /// Lets a provisioning station check that its signing key matches the
    /// embedded one without touching the lock state.
    ///
    /// # Errors
    ///
    /// `Error::WrongLength` if `last_nonce` is not 8 bytes or `device_data`
    /// not 32 bytes, otherwise as [`CarrierUnlock::verify`].
    pub fn verify_test_vector(
        &self,
        last_nonce: &[u8],
        device_data: &[u8],
        token: &[u8],
    ) -> Result<Nonce> {
        let last_nonce: [u8; NONCE_SIZE] = last_nonce.try_into().map_err(|_| Error::WrongLength)?;
        let device_data: &[u8; DEVICE_DATA_SIZE] =
            device_data.try_into().map_err(|_| Error::WrongLength)?;
        self.verify(Nonce::from_le_bytes(last_nonce), device_data, token)
    }

    fn nonce_is_fresh(&self, last: Nonce, presented: Nonce) -> bool {
        if self.config.allow_equal_nonce {
            presented >= last
        } else {
            presented > last
        }
    }
}
