// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Hardware Abstraction Layer for the Qbitel trust anchor
//!
//! The slot store and the boot-state components reach the platform only
//! through the traits defined here:
//!
//! 1. **Traits**: [`RecordStore`] (crash-atomic record replace) and
//!    [`MonotonicClock`]
//! 2. **Records**: fixed-size encoding with CRC-32 framing (`record` module)
//! 3. **Transactions**: staged copy, atomic commit, drop-to-abort
//! 4. **Simulation**: RAM-backed store and manual clock for the host
//!
//! # Security
//!
//! - Framing buffers are zeroized after every load and commit
//! - A failed commit leaves the previous record image readable

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod traits;
pub mod error;
pub mod record;
pub mod transaction;
pub mod sim;

// Re-export main traits
pub use traits::*;
pub use error::{HalError, HalResult};
pub use record::{load_record, store_record, Record};
pub use transaction::Transaction;
