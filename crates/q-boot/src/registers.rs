// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Boot configuration registers and rollback indexes
//!
//! Configuration registers accumulate measurements of the boot chain:
//! `reg = SHA-256(reg || measurement)`. They can be extended by anyone but
//! only reset by the bootloader, so the OS can add to the record of what
//! booted without rewriting it.
//!
//! Rollback indexes are 64-bit values that only ever increase. The
//! bootloader raises them after verifying an image carrying a newer index.

use q_common::config::LogConfig;
use q_common::constants::{CONFIG_REGISTER_COUNT, ROLLBACK_INDEX_COUNT, SHA256_OUTPUT_SIZE};
use q_common::log::LogBuffer;
use q_common::{log_debug, log_info, log_warn, Error, Privilege, Result};
use q_crypto::Sha256;
use q_hal::{load_record, HalResult, Record, RecordId, RecordStore, Transaction};

use crate::records;

const MODULE: &str = "bootreg";

/// Size of one configuration register
pub const CONFIG_REGISTER_SIZE: usize = SHA256_OUTPUT_SIZE;

/// Persisted register file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterFile {
    configuration: [[u8; CONFIG_REGISTER_SIZE]; CONFIG_REGISTER_COUNT],
    rollback: [u64; ROLLBACK_INDEX_COUNT],
}

impl Record for RegisterFile {
    const SIZE: usize = CONFIG_REGISTER_SIZE * CONFIG_REGISTER_COUNT + 8 * ROLLBACK_INDEX_COUNT;

    fn encode(&self, out: &mut [u8]) {
        let (config, rollback) = out.split_at_mut(CONFIG_REGISTER_SIZE * CONFIG_REGISTER_COUNT);
        let chunks = config.chunks_exact_mut(CONFIG_REGISTER_SIZE);
        for (chunk, register) in chunks.zip(&self.configuration) {
            chunk.copy_from_slice(register);
        }
        for (chunk, value) in rollback.chunks_exact_mut(8).zip(&self.rollback) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
    }

    fn decode(bytes: &[u8]) -> HalResult<Self> {
        let mut file = Self::default();
        let (config, rollback) = bytes.split_at(CONFIG_REGISTER_SIZE * CONFIG_REGISTER_COUNT);
        let chunks = config.chunks_exact(CONFIG_REGISTER_SIZE);
        for (register, chunk) in file.configuration.iter_mut().zip(chunks) {
            register.copy_from_slice(chunk);
        }
        for (value, chunk) in file.rollback.iter_mut().zip(rollback.chunks_exact(8)) {
            let mut le = [0u8; 8];
            le.copy_from_slice(chunk);
            *value = u64::from_le_bytes(le);
        }
        Ok(file)
    }
}

/// Boot configuration registers and rollback indexes
pub struct BootRegisters<S: RecordStore> {
    store: S,
    record: RecordId,
    file: RegisterFile,
    sequence: u64,
    log: LogBuffer,
}

impl<S: RecordStore> BootRegisters<S> {
    /// Open the registers on the default record
    ///
    /// # Errors
    ///
    /// Returns `Error::StorageCorrupted` if the record fails its integrity
    /// check, or another storage error.
    pub fn open(store: S) -> Result<Self> {
        Self::open_at(store, records::BOOT_REGISTERS, &LogConfig::DEFAULT)
    }

    /// Open the registers on an explicit record
    ///
    /// # Errors
    ///
    /// See [`BootRegisters::open`].
    pub fn open_at(store: S, record: RecordId, log: &LogConfig) -> Result<Self> {
        let file = load_record::<S, RegisterFile>(&store, record)?.unwrap_or_default();
        Ok(Self {
            store,
            record,
            file,
            sequence: 0,
            log: LogBuffer::with_config(log),
        })
    }

    /// Extend configuration register `index` with a 32-byte measurement
    ///
    /// Returns the new register value.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidSelector` if `index` is not a register
    /// - `Error::WrongLength` unless `measurement` is 32 bytes
    /// - a storage error if the commit fails (the register is then unchanged)
    pub fn extend(&mut self, index: u8, measurement: &[u8]) -> Result<[u8; CONFIG_REGISTER_SIZE]> {
        let slot = Self::register_slot(index)?;
        if measurement.len() != CONFIG_REGISTER_SIZE {
            return Err(Error::WrongLength);
        }

        let extended = Sha256::hash_pair(&self.file.configuration[slot], measurement).to_bytes();
        self.commit(|file| file.configuration[slot] = extended)?;

        let seq = self.next_sequence();
        log_debug!(self.log, seq, MODULE, "config register {} extended", index);
        Ok(extended)
    }

    /// Value of configuration register `index`
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidSelector` if `index` is not a register.
    pub fn configuration(&self, index: u8) -> Result<[u8; CONFIG_REGISTER_SIZE]> {
        let slot = Self::register_slot(index)?;
        Ok(self.file.configuration[slot])
    }

    /// Zero both configuration registers at the start of a boot
    ///
    /// # Errors
    ///
    /// `Error::SecurityStatusNotSatisfied` without bootloader privilege, or a
    /// storage error.
    pub fn reset_configuration(&mut self, privilege: Privilege) -> Result<()> {
        if !privilege.is_bootloader() {
            let seq = self.next_sequence();
            log_warn!(self.log, seq, MODULE, "config reset by {} rejected", privilege);
            return Err(Error::SecurityStatusNotSatisfied);
        }

        self.commit(|file| {
            file.configuration = [[0u8; CONFIG_REGISTER_SIZE]; CONFIG_REGISTER_COUNT];
        })?;

        let seq = self.next_sequence();
        log_info!(self.log, seq, MODULE, "config registers reset");
        Ok(())
    }

    /// Rollback index stored at `location`
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidSelector` if `location` is out of range.
    pub fn rollback_index(&self, location: u8) -> Result<u64> {
        let slot = Self::rollback_slot(location)?;
        Ok(self.file.rollback[slot])
    }

    /// Raise the rollback index at `location` to `value`
    ///
    /// Setting the current value again succeeds without a commit.
    ///
    /// # Errors
    ///
    /// - `Error::SecurityStatusNotSatisfied` without bootloader privilege
    /// - `Error::InvalidSelector` if `location` is out of range
    /// - `Error::ConditionsNotSatisfied` if `value` is below the stored index
    pub fn set_rollback_index(
        &mut self,
        privilege: Privilege,
        location: u8,
        value: u64,
    ) -> Result<()> {
        let result = self.raise_rollback_index(privilege, location, value);

        let seq = self.next_sequence();
        match &result {
            Ok(()) => log_info!(self.log, seq, MODULE, "rollback index {} = {}", location, value),
            Err(e) => {
                log_warn!(self.log, seq, MODULE, "rollback index {} update rejected: {}", location, e);
            }
        }
        result
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

    /// Release the backing store
    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }

    fn raise_rollback_index(
        &mut self,
        privilege: Privilege,
        location: u8,
        value: u64,
    ) -> Result<()> {
        if !privilege.is_bootloader() {
            return Err(Error::SecurityStatusNotSatisfied);
        }
        let slot = Self::rollback_slot(location)?;
        let current = self.file.rollback[slot];
        if value < current {
            return Err(Error::ConditionsNotSatisfied);
        }
        if value == current {
            return Ok(());
        }
        self.commit(|file| file.rollback[slot] = value)
    }

    fn commit(&mut self, update: impl FnOnce(&mut RegisterFile)) -> Result<()> {
        let mut tx = Transaction::begin(&mut self.store, self.record, &self.file);
        update(tx.staged_mut());
        self.file = tx.commit()?;
        Ok(())
    }

    fn register_slot(index: u8) -> Result<usize> {
        let slot = usize::from(index);
        if slot < CONFIG_REGISTER_COUNT {
            Ok(slot)
        } else {
            Err(Error::InvalidSelector)
        }
    }

    fn rollback_slot(location: u8) -> Result<usize> {
        let slot = usize::from(location);
        if slot < ROLLBACK_INDEX_COUNT {
            Ok(slot)
        } else {
            Err(Error::InvalidSelector)
        }
    }

    fn next_sequence(&mut self) -> u64 {
        self.sequence = self.sequence.wrapping_add(1);
        self.sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use q_crypto::Hash;
    use q_hal::sim::MemoryStore;

    fn open() -> BootRegisters<MemoryStore<1, 256>> {
        BootRegisters::open_at(MemoryStore::new(), RecordId(0), &LogConfig::DEFAULT).unwrap()
    }

    #[test]
    fn test_extend_chains_measurements() {
        let mut regs = open();
        let first = regs.extend(0, &[0x11; 32]).unwrap();

        let mut expected = [0u8; 64];
        expected[32..].copy_from_slice(&[0x11; 32]);
        assert_eq!(first, Sha256::hash(&expected).to_bytes());

        let second = regs.extend(0, &[0x22; 32]).unwrap();
        assert_eq!(second, Sha256::hash_pair(&first, &[0x22; 32]).to_bytes());
        assert_eq!(regs.configuration(0), Ok(second));
        assert_eq!(regs.configuration(1), Ok([0u8; 32]));
    }

    #[test]
    fn test_extend_argument_checks() {
        let mut regs = open();
        assert_eq!(regs.extend(2, &[0; 32]), Err(Error::InvalidSelector));
        assert_eq!(regs.extend(1, &[0; 31]), Err(Error::WrongLength));
        assert_eq!(regs.configuration(2), Err(Error::InvalidSelector));
        assert_eq!(regs.store().commit_count(), 0);
    }

    #[test]
    fn test_extend_allowed_for_os_reset_is_not() {
        let mut regs = open();
        regs.extend(1, &[5; 32]).unwrap();
        assert_eq!(regs.reset_configuration(Privilege::Os), Err(Error::SecurityStatusNotSatisfied));
        assert_ne!(regs.configuration(1), Ok([0u8; 32]));

        regs.reset_configuration(Privilege::Bootloader).unwrap();
        assert_eq!(regs.configuration(1), Ok([0u8; 32]));
    }

    #[test]
    fn test_rollback_index_only_increases() {
        let mut regs = open();
        assert_eq!(regs.set_rollback_index(Privilege::Os, 0, 3), Err(Error::SecurityStatusNotSatisfied));
        assert_eq!(regs.set_rollback_index(Privilege::Bootloader, 8, 3), Err(Error::InvalidSelector));

        regs.set_rollback_index(Privilege::Bootloader, 7, 10).unwrap();
        assert_eq!(regs.rollback_index(7), Ok(10));
        assert_eq!(
            regs.set_rollback_index(Privilege::Bootloader, 7, 9),
            Err(Error::ConditionsNotSatisfied)
        );

        let commits = regs.store().commit_count();
        assert_eq!(regs.set_rollback_index(Privilege::Bootloader, 7, 10), Ok(()));
        assert_eq!(regs.store().commit_count(), commits);
        assert_eq!(regs.rollback_index(8), Err(Error::InvalidSelector));
    }

    #[test]
    fn test_state_survives_reopen() {
        let mut regs = open();
        regs.extend(0, &[1; 32]).unwrap();
        regs.set_rollback_index(Privilege::Bootloader, 2, 42).unwrap();
        let register = regs.configuration(0).unwrap();

        let reopened = BootRegisters::open_at(regs.into_store(), RecordId(0), &LogConfig::DEFAULT).unwrap();
        assert_eq!(reopened.configuration(0), Ok(register));
        assert_eq!(reopened.rollback_index(2), Ok(42));
    }
}
