// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Qbitel Trust Anchor Cryptographic Layer
//!
//! This crate provides the primitives the trust anchor relies on:
//!
//! - **Hashing**: SHA-256 for carrier device data and boot register extends
//! - **Signatures**: RSA PKCS#1 v1.5 / SHA-256 verification of unlock tokens
//!   against the embedded carrier key
//! - **Memory hygiene**: constant-time selection and zeroization
//!
//! # Security Requirements
//!
//! All cryptographic operations in this crate:
//! - Compare secrets in constant time (no secret-dependent branching)
//! - Zeroize sensitive data after use
//! - Never log or expose key material

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core cryptographic modules
pub mod error;
pub mod traits;
pub mod zeroize_utils;

// Hash functions
pub mod hash;

// Signature verification
pub mod pkcs1;

// Re-export main traits and types
pub use error::{CryptoError, CryptoResult};
pub use traits::{Hash, SignatureVerifier};

// Re-export algorithm implementations
pub use hash::{Sha256, Sha256Output};
pub use pkcs1::{RsaPkcs1Sha256Verifier, CARRIER_LOCK_EXPONENT, CARRIER_LOCK_MODULUS};
