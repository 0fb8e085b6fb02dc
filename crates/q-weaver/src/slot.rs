// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Weaver slot
//!
//! A slot binds a 16-byte value to a 16-byte key. Reading the value requires
//! presenting the key; every wrong key raises the slot's failure count and
//! arms a backoff deadline from the throttle policy.
//!
//! # Persistence
//!
//! Each slot is one record in the [`RecordStore`]. Every state change goes
//! through a [`Transaction`], so key, value, failure count and deadline are
//! always updated together. The in-memory copy is only replaced after the
//! commit succeeded.
//!
//! # Record Layout
//!
//! ```text
//! +--------+--------+----------------+--------------------+
//! | key 16 | val 16 | failures u16LE | deadline u64LE ms  |
//! +--------+--------+----------------+--------------------+
//! ```

use core::fmt;

use subtle::{Choice, ConstantTimeEq};
use zeroize::{Zeroize, ZeroizeOnDrop};

use q_common::config::ThrottleConfig;
use q_common::constants::{FAILURE_COUNT_MAX, NUM_SLOTS, SLOT_KEY_SIZE, SLOT_VALUE_SIZE};
use q_common::time::{Millis, Ticks};
use q_common::{Error, Result};
use q_crypto::zeroize_utils::{constant_time_copy, is_zero, secure_zero};
use q_hal::{HalError, HalResult, Record, RecordId, RecordStore, Transaction};

use crate::throttle::{encode_backoff, throttle};

// ============================================================================
// Slot Identifier
// ============================================================================

/// Validated slot index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(u16);

impl SlotId {
    /// Index into the slot table
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }

    /// Record holding this slot
    #[must_use]
    pub const fn record_id(&self) -> RecordId {
        RecordId(self.0)
    }

    /// Slot at `index`, if in range
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < NUM_SLOTS {
            Some(Self(index as u16))
        } else {
            None
        }
    }
}

impl TryFrom<u32> for SlotId {
    type Error = Error;

    /// Narrow an external 32-bit slot identifier
    ///
    /// The high 16 bits must be zero and the remaining index below
    /// `NUM_SLOTS`; no truncation is ever applied.
    fn try_from(raw: u32) -> Result<Self> {
        if raw >> 16 != 0 {
            return Err(Error::InvalidSlotId);
        }
        Self::from_index(raw as usize).ok_or(Error::InvalidSlotId)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Slot
// ============================================================================

/// Outcome of a successful read, for auditing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Key matched and the slot was already clean
    Clean,
    /// Key matched and a non-zero failure count was reset
    Reset {
        /// Failure count before the reset
        previous_failures: u16,
    },
}

/// One key/value slot with its throttle state
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct Slot {
    key: [u8; SLOT_KEY_SIZE],
    value: [u8; SLOT_VALUE_SIZE],
    #[zeroize(skip)]
    failure_count: u16,
    #[zeroize(skip)]
    backoff_deadline: Ticks,
}

impl Slot {
    /// Encoded record size
    pub const RECORD_SIZE: usize = SLOT_KEY_SIZE + SLOT_VALUE_SIZE + 2 + 8;

    /// Consecutive failed reads since the last success or write
    #[must_use]
    pub const fn failure_count(&self) -> u16 {
        self.failure_count
    }

    /// Instant before which reads are refused
    #[must_use]
    pub const fn backoff_deadline(&self) -> Ticks {
        self.backoff_deadline
    }

    /// Time left in the current backoff window
    #[must_use]
    pub const fn remaining_backoff(&self, now: Ticks) -> Millis {
        self.backoff_deadline.remaining(now)
    }

    /// Check whether the slot holds no key, value or throttle state
    #[must_use]
    pub fn is_erased(&self) -> bool {
        is_zero(&self.key)
            && is_zero(&self.value)
            && self.failure_count == 0
            && self.backoff_deadline == Ticks::ZERO
    }

    /// Overwrite key and value and clear all throttle state
    ///
    /// # Errors
    ///
    /// Returns a storage error if the commit fails; the slot is then unchanged.
    pub fn write<S: RecordStore + ?Sized>(
        &mut self,
        store: &mut S,
        id: SlotId,
        key: &[u8; SLOT_KEY_SIZE],
        value: &[u8; SLOT_VALUE_SIZE],
    ) -> Result<()> {
        let mut tx = Transaction::begin(store, id.record_id(), self);
        let staged = tx.staged_mut();
        staged.key = *key;
        staged.value = *value;
        staged.failure_count = 0;
        staged.backoff_deadline = Ticks::ZERO;
        *self = tx.commit()?;
        Ok(())
    }

    /// Zero key, value and throttle state
    ///
    /// Erasing an erased slot is a no-op that still succeeds.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the commit fails; the slot is then unchanged.
    pub fn erase<S: RecordStore + ?Sized>(&mut self, store: &mut S, id: SlotId) -> Result<()> {
        let mut tx = Transaction::begin(store, id.record_id(), self);
        tx.staged_mut().zeroize();
        tx.staged_mut().failure_count = 0;
        tx.staged_mut().backoff_deadline = Ticks::ZERO;
        *self = tx.commit()?;
        Ok(())
    }

    /// Authenticate with `candidate` and release the value into `out`
    ///
    /// `scratch` is the owner's backoff encoding buffer. Whatever the
    /// outcome, exactly `SLOT_VALUE_SIZE` bytes are written into `out`: the
    /// value on success, the backoff encoding from `scratch` otherwise.
    ///
    /// # Errors
    ///
    /// - `Error::BackOff` if the slot is still throttled; the key is not
    ///   examined and no state changes
    /// - `Error::WrongKey` if the key does not match; the failure is
    ///   persisted before returning
    /// - a storage error if persisting the new throttle state fails
    #[allow(clippy::too_many_arguments)]
    pub fn read<S: RecordStore + ?Sized>(
        &mut self,
        store: &mut S,
        id: SlotId,
        candidate: &[u8; SLOT_KEY_SIZE],
        now: Ticks,
        config: &ThrottleConfig,
        scratch: &mut [u8; SLOT_VALUE_SIZE],
        out: &mut [u8; SLOT_VALUE_SIZE],
    ) -> Result<ReadOutcome> {
        let remaining = self.remaining_backoff(now);
        if !remaining.is_zero() {
            *scratch = encode_backoff(remaining);
            out.copy_from_slice(scratch);
            return Err(Error::BackOff {
                remaining_ms: remaining.as_millis(),
            });
        }

        let matched = self.key.ct_eq(candidate);
        secure_zero(scratch);

        let result = if bool::from(matched) {
            self.reset_failures(store, id)
        } else {
            self.record_failure(store, id, now, config, scratch)
        };

        // Both outcomes fill `out` from the scratch encoding; only a
        // committed match overwrites it with the value.
        let release = matched & Choice::from(u8::from(result.is_ok()));
        out.copy_from_slice(scratch);
        constant_time_copy(release, out, &self.value);
        result
    }

    fn reset_failures<S: RecordStore + ?Sized>(
        &mut self,
        store: &mut S,
        id: SlotId,
    ) -> Result<ReadOutcome> {
        let previous_failures = self.failure_count;
        if previous_failures == 0 && self.backoff_deadline == Ticks::ZERO {
            return Ok(ReadOutcome::Clean);
        }

        let mut tx = Transaction::begin(store, id.record_id(), self);
        tx.staged_mut().failure_count = 0;
        tx.staged_mut().backoff_deadline = Ticks::ZERO;
        *self = tx.commit()?;

        if previous_failures == 0 {
            Ok(ReadOutcome::Clean)
        } else {
            Ok(ReadOutcome::Reset { previous_failures })
        }
    }

    /// Persist one more failure and leave its backoff encoding in `scratch`
    ///
    /// On a failed commit `scratch` stays zeroed.
    fn record_failure<S: RecordStore + ?Sized>(
        &mut self,
        store: &mut S,
        id: SlotId,
        now: Ticks,
        config: &ThrottleConfig,
        scratch: &mut [u8; SLOT_VALUE_SIZE],
    ) -> Result<ReadOutcome> {
        let mut tx = Transaction::begin(store, id.record_id(), self);
        let staged = tx.staged_mut();
        staged.failure_count = staged.failure_count.saturating_add(1).min(FAILURE_COUNT_MAX);
        let backoff = throttle(staged.failure_count, config);
        staged.backoff_deadline = now.after(backoff);

        *self = tx.commit()?;
        *scratch = encode_backoff(backoff);
        Err(Error::WrongKey {
            backoff_ms: backoff.as_millis(),
        })
    }
}

impl Record for Slot {
    const SIZE: usize = Self::RECORD_SIZE;

    fn encode(&self, out: &mut [u8]) {
        out[..16].copy_from_slice(&self.key);
        out[16..32].copy_from_slice(&self.value);
        out[32..34].copy_from_slice(&self.failure_count.to_le_bytes());
        out[34..42].copy_from_slice(&self.backoff_deadline.to_le_bytes());
    }

    fn decode(bytes: &[u8]) -> HalResult<Self> {
        if bytes.len() != Self::SIZE {
            return Err(HalError::InvalidEncoding);
        }

        let mut slot = Self::default();
        slot.key.copy_from_slice(&bytes[..16]);
        slot.value.copy_from_slice(&bytes[16..32]);
        slot.failure_count = u16::from_le_bytes([bytes[32], bytes[33]]);
        let mut deadline = [0u8; 8];
        deadline.copy_from_slice(&bytes[34..42]);
        slot.backoff_deadline = Ticks::from_le_bytes(deadline);

        if slot.failure_count > FAILURE_COUNT_MAX {
            return Err(HalError::InvalidEncoding);
        }
        Ok(slot)
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("failure_count", &self.failure_count)
            .field("backoff_deadline", &self.backoff_deadline)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use q_hal::load_record;
    use q_hal::sim::MemoryStore;

    type Store = MemoryStore<4, 64>;

    const KEY: [u8; 16] = [0x11; 16];
    const VALUE: [u8; 16] = [0x22; 16];
    const WRONG: [u8; 16] = [0x33; 16];
    const CFG: ThrottleConfig = ThrottleConfig::DEFAULT;

    fn id(index: usize) -> SlotId {
        SlotId::from_index(index).unwrap()
    }

    fn written(store: &mut Store) -> Slot {
        let mut slot = Slot::default();
        slot.write(store, id(0), &KEY, &VALUE).unwrap();
        slot
    }

    #[test]
    fn test_slot_id_narrowing() {
        assert_eq!(SlotId::try_from(5).map(|s| s.index()), Ok(5));
        assert_eq!(SlotId::try_from(63).map(|s| s.index()), Ok(63));
        assert_eq!(SlotId::try_from(64), Err(Error::InvalidSlotId));
        assert_eq!(SlotId::try_from(0x0001_0005), Err(Error::InvalidSlotId));
        assert_eq!(SlotId::try_from(0xFFFF_0000), Err(Error::InvalidSlotId));
    }

    #[test]
    fn test_read_with_correct_key() {
        let mut store = Store::new();
        let mut slot = written(&mut store);
        let mut scratch = [0u8; 16];
        let mut out = [0u8; 16];

        let outcome = slot.read(&mut store, id(0), &KEY, Ticks::ZERO, &CFG, &mut scratch, &mut out);
        assert_eq!(outcome, Ok(ReadOutcome::Clean));
        assert_eq!(out, VALUE);
    }

    #[test]
    fn test_wrong_key_is_persisted() {
        let mut store = Store::new();
        let mut slot = written(&mut store);
        let mut scratch = [0u8; 16];
        let mut out = [0xEEu8; 16];

        let result = slot.read(&mut store, id(0), &WRONG, Ticks::ZERO, &CFG, &mut scratch, &mut out);
        assert_eq!(result, Err(Error::WrongKey { backoff_ms: 0 }));
        assert_eq!(out, [0u8; 16]);
        assert_eq!(slot.failure_count(), 1);

        let reloaded: Slot = load_record(&store, id(0).record_id()).unwrap().unwrap();
        assert_eq!(reloaded.failure_count(), 1);
    }

    #[test]
    fn test_success_resets_failures() {
        let mut store = Store::new();
        let mut slot = written(&mut store);
        let mut scratch = [0u8; 16];
        let mut out = [0u8; 16];

        for _ in 0..3 {
            let _ = slot.read(&mut store, id(0), &WRONG, Ticks::ZERO, &CFG, &mut scratch, &mut out);
        }
        let outcome = slot.read(&mut store, id(0), &KEY, Ticks::ZERO, &CFG, &mut scratch, &mut out);
        assert_eq!(outcome, Ok(ReadOutcome::Reset { previous_failures: 3 }));
        assert_eq!(slot.failure_count(), 0);
        assert_eq!(slot.backoff_deadline(), Ticks::ZERO);
    }

    #[test]
    fn test_backoff_checked_before_key() {
        let mut store = Store::new();
        let mut slot = written(&mut store);
        let mut scratch = [0u8; 16];
        let mut out = [0u8; 16];

        for _ in 0..5 {
            let _ = slot.read(&mut store, id(0), &WRONG, Ticks::ZERO, &CFG, &mut scratch, &mut out);
        }
        assert_eq!(slot.remaining_backoff(Ticks::ZERO), Millis::from_secs(30));

        let commits = store.commit_count();
        let now = Ticks::new(10_000);
        let result = slot.read(&mut store, id(0), &KEY, now, &CFG, &mut scratch, &mut out);
        assert_eq!(result, Err(Error::BackOff { remaining_ms: 20_000 }));
        assert_eq!(&out[..4], &20_000u32.to_be_bytes());
        assert_eq!(slot.failure_count(), 5);
        assert_eq!(store.commit_count(), commits);
    }

    #[test]
    fn test_failed_commit_leaves_slot_unchanged() {
        let mut store = Store::new();
        let mut slot = written(&mut store);
        let mut scratch = [0u8; 16];
        let mut out = [0u8; 16];

        store.fail_after_commits(0);
        let result = slot.read(&mut store, id(0), &WRONG, Ticks::ZERO, &CFG, &mut scratch, &mut out);
        assert_eq!(result, Err(Error::StorageWriteFailed));
        assert_eq!(slot.failure_count(), 0);
        assert_eq!(out, [0u8; 16]);

        assert_eq!(slot.erase(&mut store, id(0)), Err(Error::StorageWriteFailed));
        assert!(!slot.is_erased());
    }

    #[test]
    fn test_erase_is_idempotent() {
        let mut store = Store::new();
        let mut slot = written(&mut store);
        slot.erase(&mut store, id(0)).unwrap();
        assert!(slot.is_erased());
        slot.erase(&mut store, id(0)).unwrap();
        assert!(slot.is_erased());
    }

    #[test]
    fn test_decode_rejects_oversized_counter() {
        let mut bytes = [0u8; Slot::RECORD_SIZE];
        bytes[32..34].copy_from_slice(&0x8000u16.to_le_bytes());
        assert!(matches!(Slot::decode(&bytes), Err(HalError::InvalidEncoding)));
    }

    #[test]
    fn test_failed_reset_commit_withholds_value() {
        let mut store = Store::new();
        let mut slot = written(&mut store);
        let mut scratch = [0u8; 16];
        let mut out = [0u8; 16];

        let _ = slot.read(&mut store, id(0), &WRONG, Ticks::ZERO, &CFG, &mut scratch, &mut out);
        store.fail_after_commits(0);

        let mut out = [0xEEu8; 16];
        let result = slot.read(&mut store, id(0), &KEY, Ticks::ZERO, &CFG, &mut scratch, &mut out);
        assert_eq!(result, Err(Error::StorageWriteFailed));
        assert_eq!(out, [0u8; 16]);
        assert_eq!(slot.failure_count(), 1);
    }

    #[test]
    fn test_is_erased_covers_every_field() {
        let mut store = Store::new();
        assert!(Slot::default().is_erased());

        let mut slot = Slot::default();
        slot.write(&mut store, id(0), &[0u8; 16], &[0u8; 16]).unwrap();
        assert!(slot.is_erased());

        let mut out = [0u8; 16];
        let mut scratch = [0u8; 16];
        let _ = slot.read(&mut store, id(0), &WRONG, Ticks::ZERO, &CFG, &mut scratch, &mut out);
        assert!(!slot.is_erased());

        slot.write(&mut store, id(0), &[0u8; 16], &VALUE).unwrap();
        assert!(!slot.is_erased());
    }
}
