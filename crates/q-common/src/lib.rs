// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Qbitel Trust Anchor Common Library
//!
//! This crate provides the error type, configuration structures, audit log,
//! time units and constants shared by the slot store and the boot-state
//! components.
//!
//! # Features
//!
//! - `defmt`: Enable defmt formatting of errors for embedded debugging
//!
//! # Security
//!
//! No heap allocations are performed - all buffers use fixed-size arrays or heapless collections.
//! Secret material (slot keys and values, nonces, signatures) is never logged.

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod types;
pub mod errors;
pub mod config;
pub mod log;
pub mod constants;
pub mod time;

// Re-export commonly used items
pub use errors::{Error, Result, SW_NO_ERROR};
pub use types::{Nonce, Privilege};
pub use config::{LockConfig, LogConfig, SystemConfig, ThrottleConfig};
pub use log::{LogBuffer, LogLevel};
pub use time::{Millis, Ticks};
