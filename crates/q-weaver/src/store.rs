// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Slot store
//!
//! Owns the fixed table of [`NUM_SLOTS`] slots, the backing record store,
//! the clock that drives backoff deadlines and the scratch buffer holding
//! the current backoff encoding. Every entry point validates the external
//! slot identifier and buffer lengths before any slot is touched.

use q_common::config::{LogConfig, SystemConfig, ThrottleConfig};
use q_common::constants::{NUM_SLOTS, SLOT_KEY_SIZE, SLOT_VALUE_SIZE};
use q_common::log::LogBuffer;
use q_common::{log_debug, log_info, log_warn, Error, Result};
use q_hal::{load_record, MonotonicClock, RecordStore};

use crate::slot::{ReadOutcome, Slot, SlotId};
use crate::Slots;

const MODULE: &str = "weaver";

/// The Weaver slot store
pub struct SlotStore<S: RecordStore, C: MonotonicClock> {
    store: S,
    clock: C,
    config: ThrottleConfig,
    slots: [Slot; NUM_SLOTS],
    backoff_scratch: [u8; SLOT_VALUE_SIZE],
    log: LogBuffer,
}

impl<S: RecordStore, C: MonotonicClock> SlotStore<S, C> {
    /// Open the store, restoring every slot from `store`
    ///
    /// Slots never written are empty.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidData` for an inconsistent throttle
    /// configuration, `Error::StorageCorrupted` if a slot record fails its
    /// integrity check, or another storage error from the backing store.
    pub fn open(store: S, clock: C, config: ThrottleConfig) -> Result<Self> {
        Self::open_with_log(store, clock, config, &LogConfig::DEFAULT)
    }

    /// Open the store from the system-wide configuration
    ///
    /// # Errors
    ///
    /// See [`SlotStore::open`].
    pub fn open_with_config(store: S, clock: C, config: &SystemConfig) -> Result<Self> {
        config.validate()?;
        Self::open_with_log(store, clock, config.throttle, &config.log)
    }

    /// Open the store with an explicit audit log configuration
    ///
    /// # Errors
    ///
    /// See [`SlotStore::open`].
    pub fn open_with_log(
        store: S,
        clock: C,
        config: ThrottleConfig,
        log: &LogConfig,
    ) -> Result<Self> {
        config.validate()?;

        let mut slots: [Slot; NUM_SLOTS] = core::array::from_fn(|_| Slot::default());
        let mut restored = 0u32;
        for (index, slot) in slots.iter_mut().enumerate() {
            let id = SlotId::from_index(index).ok_or(Error::InternalError)?;
            if let Some(persisted) = load_record::<S, Slot>(&store, id.record_id())? {
                *slot = persisted;
                restored += 1;
            }
        }

        let mut this = Self {
            store,
            clock,
            config,
            slots,
            backoff_scratch: [0u8; SLOT_VALUE_SIZE],
            log: LogBuffer::with_config(log),
        };
        let ts = this.timestamp();
        log_info!(this.log, ts, MODULE, "opened, {} slot records restored", restored);
        Ok(this)
    }

    /// Number of slots
    #[must_use]
    pub const fn num_slots(&self) -> usize {
        NUM_SLOTS
    }

    /// Store `key` and `value` in slot `slot_id`, clearing its throttle state
    ///
    /// # Errors
    ///
    /// - `Error::InvalidSlotId` for an out-of-range identifier
    /// - `Error::WrongLength` unless key and value are 16 bytes each
    /// - a storage error if the commit fails (the slot is then unchanged)
    pub fn write(&mut self, slot_id: u32, key: &[u8], value: &[u8]) -> Result<()> {
        let id = SlotId::try_from(slot_id)?;
        let key: &[u8; SLOT_KEY_SIZE] = key.try_into().map_err(|_| Error::WrongLength)?;
        let value: &[u8; SLOT_VALUE_SIZE] = value.try_into().map_err(|_| Error::WrongLength)?;

        self.slots[id.index()].write(&mut self.store, id, key, value)?;

        let ts = self.timestamp();
        log_info!(self.log, ts, MODULE, "slot {} written", id);
        Ok(())
    }

    /// Read slot `slot_id` with `key`, writing 16 bytes into `out`
    ///
    /// On success `out` holds the slot value. On `WrongKey` or `BackOff`
    /// `out` holds the backoff encoding (big-endian milliseconds followed by
    /// zero padding).
    ///
    /// # Errors
    ///
    /// - `Error::InvalidSlotId` for an out-of-range identifier
    /// - `Error::WrongLength` unless key and `out` are 16 bytes each
    /// - `Error::BackOff` while the slot is throttled
    /// - `Error::WrongKey` if the key does not match
    pub fn read(&mut self, slot_id: u32, key: &[u8], out: &mut [u8]) -> Result<()> {
        let id = SlotId::try_from(slot_id)?;
        let key: &[u8; SLOT_KEY_SIZE] = key.try_into().map_err(|_| Error::WrongLength)?;
        let out: &mut [u8; SLOT_VALUE_SIZE] = out.try_into().map_err(|_| Error::WrongLength)?;

        let now = self.clock.now();
        let result = self.slots[id.index()].read(
            &mut self.store,
            id,
            key,
            now,
            &self.config,
            &mut self.backoff_scratch,
            out,
        );

        let failures = self.slots[id.index()].failure_count();
        let ts = now.as_u64();
        match result {
            Ok(ReadOutcome::Clean) => {
                log_debug!(self.log, ts, MODULE, "slot {} read", id);
            }
            Ok(ReadOutcome::Reset { previous_failures }) => {
                log_info!(
                    self.log,
                    ts,
                    MODULE,
                    "slot {} read, {} failures cleared",
                    id,
                    previous_failures
                );
            }
            Err(Error::WrongKey { backoff_ms }) => {
                log_warn!(
                    self.log,
                    ts,
                    MODULE,
                    "slot {} wrong key, failures={} backoff={}ms",
                    id,
                    failures,
                    backoff_ms
                );
            }
            Err(Error::BackOff { remaining_ms }) => {
                log_warn!(self.log, ts, MODULE, "slot {} throttled, {}ms left", id, remaining_ms);
            }
            Err(e) => {
                log_warn!(self.log, ts, MODULE, "slot {} read failed: {}", id, e);
            }
        }
        result.map(|_| ())
    }

    /// Erase slot `slot_id`
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidSlotId` for an out-of-range identifier or a
    /// storage error if the commit fails.
    pub fn erase(&mut self, slot_id: u32) -> Result<()> {
        let id = SlotId::try_from(slot_id)?;
        self.slots[id.index()].erase(&mut self.store, id)?;

        let ts = self.timestamp();
        log_info!(self.log, ts, MODULE, "slot {} erased", id);
        Ok(())
    }

    /// Erase every slot
    ///
    /// Each slot erase is individually atomic. On a storage failure the
    /// slots before the failing one are erased and the rest are untouched;
    /// repeating the call completes the job.
    ///
    /// # Errors
    ///
    /// Returns the first storage error encountered.
    pub fn erase_all(&mut self) -> Result<()> {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let id = SlotId::from_index(index).ok_or(Error::InternalError)?;
            slot.erase(&mut self.store, id)?;
        }

        let ts = self.timestamp();
        log_info!(self.log, ts, MODULE, "all slots erased");
        Ok(())
    }

    /// Failure count of slot `slot_id`
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidSlotId` for an out-of-range identifier.
    pub fn failure_count(&self, slot_id: u32) -> Result<u16> {
        let id = SlotId::try_from(slot_id)?;
        Ok(self.slots[id.index()].failure_count())
    }

    /// Active throttle configuration
    #[must_use]
    pub const fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// Audit log
    #[must_use]
    pub const fn log(&self) -> &LogBuffer {
        &self.log
    }

    /// Backing record store
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Mutable backing record store
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Clock driving backoff deadlines
    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Release the backing store and clock
    #[must_use]
    pub fn into_parts(self) -> (S, C) {
        (self.store, self.clock)
    }

    fn timestamp(&self) -> u64 {
        self.clock.now().as_u64()
    }
}

impl<S: RecordStore, C: MonotonicClock> Slots for SlotStore<S, C> {
    fn num_slots(&self) -> usize {
        SlotStore::num_slots(self)
    }

    fn write(&mut self, slot_id: u32, key: &[u8], value: &[u8]) -> Result<()> {
        SlotStore::write(self, slot_id, key, value)
    }

    fn read(&mut self, slot_id: u32, key: &[u8], out: &mut [u8]) -> Result<()> {
        SlotStore::read(self, slot_id, key, out)
    }

    fn erase_all(&mut self) -> Result<()> {
        SlotStore::erase_all(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use q_common::time::{Millis, Ticks};
    use q_hal::sim::{ManualClock, MemoryStore};

    type TestStore<'a> = SlotStore<MemoryStore<NUM_SLOTS, 64>, &'a ManualClock>;

    fn open(clock: &ManualClock) -> TestStore<'_> {
        SlotStore::open(MemoryStore::new(), clock, ThrottleConfig::DEFAULT).unwrap()
    }

    #[test]
    fn test_lengths_checked() {
        let clock = ManualClock::new(Ticks::ZERO);
        let mut store = open(&clock);
        assert_eq!(store.write(0, &[0; 15], &[0; 16]), Err(Error::WrongLength));
        assert_eq!(store.write(0, &[0; 16], &[0; 17]), Err(Error::WrongLength));
        let mut short = [0u8; 8];
        assert_eq!(store.read(0, &[0; 16], &mut short), Err(Error::WrongLength));
        assert_eq!(store.store().commit_count(), 0);
    }

    #[test]
    fn test_slot_id_checked_first() {
        let clock = ManualClock::new(Ticks::ZERO);
        let mut store = open(&clock);
        assert_eq!(store.write(64, &[0; 1], &[0; 1]), Err(Error::InvalidSlotId));
        assert_eq!(store.erase(0x0001_0000), Err(Error::InvalidSlotId));
    }

    #[test]
    fn test_backoff_expires_with_clock() {
        let clock = ManualClock::new(Ticks::new(1_000));
        let mut store = open(&clock);
        store.write(3, &[1; 16], &[2; 16]).unwrap();

        let mut out = [0u8; 16];
        for _ in 0..5 {
            let _ = store.read(3, &[9; 16], &mut out);
        }
        assert_eq!(store.read(3, &[1; 16], &mut out), Err(Error::BackOff { remaining_ms: 30_000 }));

        clock.advance(Millis::from_secs(30));
        assert_eq!(store.read(3, &[1; 16], &mut out), Ok(()));
        assert_eq!(out, [2; 16]);
        assert_eq!(store.failure_count(3), Ok(0));
    }

    #[test]
    fn test_log_records_events() {
        let clock = ManualClock::new(Ticks::ZERO);
        let mut store = open(&clock);
        store.write(1, &[1; 16], &[2; 16]).unwrap();
        let mut out = [0u8; 16];
        let _ = store.read(1, &[7; 16], &mut out);

        let last = store.log().last().unwrap();
        assert!(last.message.starts_with("slot 1 wrong key"));
    }
}
