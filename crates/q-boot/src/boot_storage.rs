// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Bootloader scratch storage
//!
//! A flat 4 KiB area the bootloader uses for its own flags. Anyone may read
//! it; only the bootloader may write. Each store is one atomic commit of
//! the whole area.

use q_common::config::LogConfig;
use q_common::constants::BOOT_STORAGE_SIZE;
use q_common::log::LogBuffer;
use q_common::{log_info, log_warn, Error, Privilege, Result};
use q_hal::{load_record, HalResult, Record, RecordId, RecordStore, Transaction};

use crate::records;

const MODULE: &str = "bootstore";

/// Persisted storage image
#[derive(Clone, PartialEq, Eq)]
pub struct StorageImage([u8; BOOT_STORAGE_SIZE]);

impl StorageImage {
    /// Image contents
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; BOOT_STORAGE_SIZE] {
        &self.0
    }
}

impl Default for StorageImage {
    fn default() -> Self {
        Self([0u8; BOOT_STORAGE_SIZE])
    }
}

impl core::fmt::Debug for StorageImage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "StorageImage({} bytes)", BOOT_STORAGE_SIZE)
    }
}

impl Record for StorageImage {
    const SIZE: usize = BOOT_STORAGE_SIZE;

    fn encode(&self, out: &mut [u8]) {
        out.copy_from_slice(&self.0);
    }

    fn decode(bytes: &[u8]) -> HalResult<Self> {
        let mut image = Self::default();
        image.0.copy_from_slice(bytes);
        Ok(image)
    }
}

/// Bootloader scratch storage
pub struct BootStorage<S: RecordStore> {
    store: S,
    record: RecordId,
    image: StorageImage,
    sequence: u64,
    log: LogBuffer,
}

impl<S: RecordStore> BootStorage<S> {
    /// Open the storage on the default record
    ///
    /// # Errors
    ///
    /// Returns `Error::StorageCorrupted` if the record fails its integrity
    /// check, or another storage error.
    pub fn open(store: S) -> Result<Self> {
        Self::open_at(store, records::BOOT_STORAGE, &LogConfig::DEFAULT)
    }

    /// Open the storage on an explicit record
    ///
    /// # Errors
    ///
    /// See [`BootStorage::open`].
    pub fn open_at(store: S, record: RecordId, log: &LogConfig) -> Result<Self> {
        let image = load_record::<S, StorageImage>(&store, record)?.unwrap_or_default();
        Ok(Self {
            store,
            record,
            image,
            sequence: 0,
            log: LogBuffer::with_config(log),
        })
    }

    /// Storage size in bytes
    #[must_use]
    pub const fn capacity(&self) -> usize {
        BOOT_STORAGE_SIZE
    }

    /// Write `data` at `offset`
    ///
    /// # Errors
    ///
    /// - `Error::SecurityStatusNotSatisfied` without bootloader privilege
    /// - `Error::OutOfBounds` if `offset` lies outside the storage
    /// - `Error::InvalidData` if `data` runs past the end
    /// - a storage error if the commit fails (contents are then unchanged)
    pub fn store(&mut self, privilege: Privilege, offset: u16, data: &[u8]) -> Result<()> {
        let result = self.write_range(privilege, usize::from(offset), data);

        let seq = self.next_sequence();
        match &result {
            Ok(()) => log_info!(self.log, seq, MODULE, "stored {} bytes at {}", data.len(), offset),
            Err(e) => log_warn!(self.log, seq, MODULE, "store at {} rejected: {}", offset, e),
        }
        result
    }

    /// Read `out.len()` bytes starting at `offset`
    ///
    /// # Errors
    ///
    /// Returns `Error::OutOfBounds` if the range does not lie inside the
    /// storage.
    pub fn load(&self, offset: u16, out: &mut [u8]) -> Result<()> {
        let start = usize::from(offset);
        let end = start.checked_add(out.len()).ok_or(Error::OutOfBounds)?;
        if start >= BOOT_STORAGE_SIZE || end > BOOT_STORAGE_SIZE {
            return Err(Error::OutOfBounds);
        }
        out.copy_from_slice(&self.image.as_bytes()[start..end]);
        Ok(())
    }

    /// Audit log
    #[must_use]
    pub const fn log(&self) -> &LogBuffer {
        &self.log
    }

    /// Backing record store
    #[must_use]
    pub const fn backing_store(&self) -> &S {
        &self.store
    }

    /// Mutable backing record store
    pub fn backing_store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Release the backing store
    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }

    fn write_range(&mut self, privilege: Privilege, start: usize, data: &[u8]) -> Result<()> {
        if !privilege.is_bootloader() {
            return Err(Error::SecurityStatusNotSatisfied);
        }
        if start >= BOOT_STORAGE_SIZE {
            return Err(Error::OutOfBounds);
        }
        let end = start + data.len();
        if end > BOOT_STORAGE_SIZE {
            return Err(Error::InvalidData);
        }

        let mut tx = Transaction::begin(&mut self.store, self.record, &self.image);
        tx.staged_mut().0[start..end].copy_from_slice(data);
        self.image = tx.commit()?;
        Ok(())
    }

    fn next_sequence(&mut self) -> u64 {
        self.sequence = self.sequence.wrapping_add(1);
        self.sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use q_hal::sim::MemoryStore;

    type TestStorage = BootStorage<MemoryStore<1, 4100>>;

    fn open() -> TestStorage {
        BootStorage::open_at(MemoryStore::new(), RecordId(0), &LogConfig::DEFAULT).unwrap()
    }

    #[test]
    fn test_store_and_load() {
        let mut storage = open();
        storage.store(Privilege::Bootloader, 100, b"flags").unwrap();

        let mut out = [0u8; 7];
        storage.load(99, &mut out).unwrap();
        assert_eq!(&out, b"\0flags\0");
    }

    #[test]
    fn test_store_requires_bootloader() {
        let mut storage = open();
        assert_eq!(storage.store(Privilege::Os, 0, b"x"), Err(Error::SecurityStatusNotSatisfied));
        assert_eq!(storage.backing_store().commit_count(), 0);
    }

    #[test]
    fn test_bounds() {
        let mut storage = open();
        assert_eq!(storage.store(Privilege::Bootloader, 4096, b"x"), Err(Error::OutOfBounds));
        assert_eq!(storage.store(Privilege::Bootloader, 4095, b"xy"), Err(Error::InvalidData));
        assert_eq!(storage.store(Privilege::Bootloader, 4095, b"x"), Ok(()));

        let mut out = [0u8; 2];
        assert_eq!(storage.load(4096, &mut out[..1]), Err(Error::OutOfBounds));
        assert_eq!(storage.load(4095, &mut out), Err(Error::OutOfBounds));
        assert_eq!(storage.load(4095, &mut out[..1]), Ok(()));
        assert_eq!(out[0], b'x');
    }

    #[test]
    fn test_failed_commit_leaves_contents() {
        let mut storage = open();
        storage.store(Privilege::Bootloader, 0, b"old").unwrap();
        storage.backing_store_mut().fail_after_commits(0);
        assert_eq!(storage.store(Privilege::Bootloader, 0, b"new"), Err(Error::StorageWriteFailed));

        let mut out = [0u8; 3];
        storage.load(0, &mut out).unwrap();
        assert_eq!(&out, b"old");
    }
}
