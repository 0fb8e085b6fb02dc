// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! RSA PKCS#1 v1.5 signature verification with SHA-256
//!
//! Carrier unlock tokens are signed off-device with an RSA-2048 key whose
//! public half is compiled in below. Rotating the key requires a new build.

use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::signature::Verifier;
use rsa::{BigUint, RsaPublicKey};
use sha2::Sha256;

use crate::error::{CryptoError, CryptoResult};
use crate::traits::SignatureVerifier;

/// Carrier unlock trust anchor: RSA-2048 modulus, big-endian
pub const CARRIER_LOCK_MODULUS: [u8; 256] = [
    0xAA, 0x61, 0x74, 0xB8, 0x9E, 0xDD, 0x39, 0x79, 0xCA, 0x4D, 0x79, 0xD8,
    0x5B, 0xDD, 0x5F, 0xAB, 0x1D, 0xFD, 0x6C, 0x50, 0xC2, 0xFB, 0x93, 0x73,
    0x20, 0x33, 0xD9, 0x2C, 0xE9, 0x19, 0x70, 0x73, 0xCB, 0x0F, 0x51, 0x52,
    0xAD, 0xA6, 0x85, 0xFA, 0x57, 0x6F, 0xD3, 0x06, 0xE1, 0x8F, 0x96, 0xF6,
    0x9F, 0xDC, 0xC8, 0x21, 0x4C, 0xBE, 0x0A, 0x59, 0xCA, 0xD6, 0x78, 0x8F,
    0x4F, 0xEB, 0xD9, 0xBB, 0x77, 0x14, 0x92, 0xF3, 0x6C, 0x24, 0xBC, 0x74,
    0xE5, 0xFA, 0xC7, 0x59, 0x4E, 0x17, 0xEB, 0x0C, 0xDF, 0x50, 0xFE, 0x85,
    0xED, 0x8F, 0xFB, 0xAD, 0x58, 0x75, 0xAC, 0xDE, 0x02, 0xA9, 0xCD, 0xB3,
    0x08, 0xD3, 0xEF, 0xCF, 0xF8, 0xDA, 0x0F, 0xAC, 0xFA, 0xCE, 0xA7, 0xAF,
    0x2C, 0x38, 0x87, 0xCE, 0x49, 0x16, 0x2B, 0xFA, 0x1F, 0xF8, 0x9C, 0x9A,
    0x1B, 0xE4, 0xA4, 0x9D, 0x63, 0x5B, 0xBF, 0x6E, 0x6C, 0x7F, 0x29, 0x91,
    0x9A, 0x64, 0xDF, 0xE3, 0x69, 0x8D, 0xE7, 0x8E, 0x2E, 0xD3, 0x01, 0x5D,
    0xEF, 0xF9, 0x0E, 0x08, 0x6D, 0xA9, 0xF1, 0x63, 0x36, 0xB4, 0x62, 0x4B,
    0x7E, 0x83, 0xB4, 0x88, 0x93, 0x08, 0x13, 0x0C, 0x26, 0x52, 0x16, 0x33,
    0x4A, 0x4D, 0xE3, 0xA5, 0x4B, 0xCB, 0x2B, 0x63, 0x81, 0xF8, 0x31, 0xF3,
    0xBF, 0xCE, 0xAA, 0x93, 0x01, 0xD6, 0x49, 0x6D, 0x13, 0x7B, 0xFE, 0x06,
    0xA2, 0x57, 0x05, 0xDE, 0x48, 0x48, 0x8C, 0xD6, 0x2C, 0x54, 0x1F, 0xCF,
    0x24, 0x97, 0x31, 0x51, 0x9A, 0x7F, 0x1E, 0x10, 0xAE, 0xFF, 0xE3, 0x6C,
    0xC3, 0x11, 0x73, 0xD8, 0xB8, 0x5B, 0x3F, 0x98, 0x82, 0x67, 0x6D, 0x6E,
    0x2A, 0xE8, 0x08, 0x46, 0x64, 0x06, 0x84, 0x3B, 0xA7, 0x50, 0x81, 0x5C,
    0x78, 0x77, 0xC1, 0x35, 0xD7, 0x75, 0x17, 0xB3, 0x6A, 0x79, 0xA6, 0x2F,
    0x62, 0xDB, 0x87, 0x41,
];

/// Carrier unlock trust anchor: public exponent (65537), big-endian
pub const CARRIER_LOCK_EXPONENT: [u8; 3] = [0x01, 0x00, 0x01];

/// RSA-PKCS1-v1.5 / SHA-256 verifier bound to one public key
#[derive(Debug, Clone)]
pub struct RsaPkcs1Sha256Verifier {
    key: VerifyingKey<Sha256>,
    modulus_len: usize,
}

impl RsaPkcs1Sha256Verifier {
    /// Verifier for the embedded carrier unlock key
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKey` if the embedded key is rejected by
    /// the RSA backend.
    pub fn carrier_lock() -> CryptoResult<Self> {
        Self::from_components(&CARRIER_LOCK_MODULUS, &CARRIER_LOCK_EXPONENT)
    }

    /// Verifier for a big-endian modulus and public exponent
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKey` if the components do not form a
    /// valid RSA public key.
    pub fn from_components(modulus: &[u8], exponent: &[u8]) -> CryptoResult<Self> {
        let n = BigUint::from_bytes_be(modulus);
        let e = BigUint::from_bytes_be(exponent);
        let public = RsaPublicKey::new(n, e).map_err(|_| CryptoError::InvalidKey)?;
        Ok(Self::from_public_key(public))
    }

    /// Verifier for an already parsed public key
    #[must_use]
    pub fn from_public_key(public: RsaPublicKey) -> Self {
        use rsa::traits::PublicKeyParts;

        let modulus_len = public.size();
        Self {
            key: VerifyingKey::<Sha256>::new(public),
            modulus_len,
        }
    }
}

impl SignatureVerifier for RsaPkcs1Sha256Verifier {
    fn signature_len(&self) -> usize {
        self.modulus_len
    }

    fn verify(&self, message: &[u8], signature: &[u8]) -> CryptoResult<()> {
        if signature.len() != self.modulus_len {
            return Err(CryptoError::InvalidSignatureLength);
        }
        let signature =
            Signature::try_from(signature).map_err(|_| CryptoError::InvalidSignature)?;
        self.key
            .verify(message, &signature)
            .map_err(|_| CryptoError::InvalidSignature)
    }
}
