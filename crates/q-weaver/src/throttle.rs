// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Throttle policy
//!
//! Maps a slot's consecutive failure count to the time the slot must refuse
//! further attempts. The mapping is pure and monotonic non-decreasing in the
//! failure count, so an attacker can never shorten the wait by failing more.

use q_common::config::ThrottleConfig;
use q_common::constants::SLOT_VALUE_SIZE;
use q_common::time::Millis;

/// Backoff imposed after `failure_count` consecutive failures
///
/// See [`ThrottleConfig`] for the shape of the schedule. A zero failure count
/// never imposes a backoff.
#[must_use]
pub fn throttle(failure_count: u16, config: &ThrottleConfig) -> Millis {
    let backoff_ms = if failure_count == 0 || failure_count < config.free_attempts {
        0
    } else if failure_count < config.doubling_start {
        u64::from(config.flat_backoff_ms)
    } else if failure_count < config.permanent_after {
        let step = config.doubling_step.max(1);
        let doublings = u32::from((failure_count - config.doubling_start) / step).min(32);
        u64::from(config.flat_backoff_ms) << doublings
    } else {
        u64::from(config.max_backoff_ms)
    };

    let clamped = backoff_ms.min(u64::from(config.max_backoff_ms));
    Millis::new(u32::try_from(clamped).unwrap_or(u32::MAX))
}

/// Response encoding of a backoff
///
/// Big-endian milliseconds in the first four bytes, zero padding after, so
/// the response is always as long as a slot value.
#[must_use]
pub fn encode_backoff(backoff: Millis) -> [u8; SLOT_VALUE_SIZE] {
    let mut encoded = [0u8; SLOT_VALUE_SIZE];
    encoded[..4].copy_from_slice(&backoff.as_millis().to_be_bytes());
    encoded
}
