// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! RAM-backed simulation of the platform collaborators
//!
//! Used on the host and in tests. [`MemoryStore`] can be told to start
//! failing commits after a number of successful ones, which models power
//! loss at an arbitrary point of a command sequence.

use core::cell::Cell;

use q_common::time::{Millis, Ticks};

use crate::error::{HalError, HalResult};
use crate::traits::{MonotonicClock, RecordId, RecordStore};

/// In-memory record store with `RECORDS` records of up to `CAPACITY` bytes
pub struct MemoryStore<const RECORDS: usize, const CAPACITY: usize> {
    images: [[u8; CAPACITY]; RECORDS],
    lengths: [Option<usize>; RECORDS],
    commits: u32,
    commits_before_fault: Option<u32>,
}

impl<const RECORDS: usize, const CAPACITY: usize> MemoryStore<RECORDS, CAPACITY> {
    /// Create an empty store
    #[must_use]
    pub const fn new() -> Self {
        Self {
            images: [[0u8; CAPACITY]; RECORDS],
            lengths: [None; RECORDS],
            commits: 0,
            commits_before_fault: None,
        }
    }

    /// Let `count` more commits succeed, then fail every commit
    pub fn fail_after_commits(&mut self, count: u32) {
        self.commits_before_fault = Some(count);
    }

    /// Stop injecting commit failures
    pub fn clear_fault(&mut self) {
        self.commits_before_fault = None;
    }

    /// Number of successful commits so far
    #[must_use]
    pub const fn commit_count(&self) -> u32 {
        self.commits
    }

    /// Flip one byte of a committed image
    pub fn corrupt(&mut self, id: RecordId, offset: usize) {
        if let Some(image) = self.images.get_mut(id.index()) {
            if let Some(byte) = image.get_mut(offset) {
                *byte ^= 0xFF;
            }
        }
    }
}

impl<const RECORDS: usize, const CAPACITY: usize> Default for MemoryStore<RECORDS, CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const RECORDS: usize, const CAPACITY: usize> RecordStore for MemoryStore<RECORDS, CAPACITY> {
    fn record_capacity(&self) -> usize {
        CAPACITY
    }

    fn load(&self, id: RecordId, buffer: &mut [u8]) -> HalResult<Option<usize>> {
        let index = id.index();
        if index >= RECORDS {
            return Err(HalError::InvalidRecord);
        }
        let Some(len) = self.lengths[index] else {
            return Ok(None);
        };
        if buffer.len() < len {
            return Err(HalError::RecordTooLarge);
        }
        buffer[..len].copy_from_slice(&self.images[index][..len]);
        Ok(Some(len))
    }

    fn commit(&mut self, id: RecordId, data: &[u8]) -> HalResult<()> {
        let index = id.index();
        if index >= RECORDS {
            return Err(HalError::InvalidRecord);
        }
        if data.len() > CAPACITY {
            return Err(HalError::RecordTooLarge);
        }
        match self.commits_before_fault {
            Some(0) => return Err(HalError::CommitFailed),
            Some(n) => self.commits_before_fault = Some(n - 1),
            None => {}
        }

        self.images[index][..data.len()].copy_from_slice(data);
        self.lengths[index] = Some(data.len());
        self.commits += 1;
        Ok(())
    }
}

/// Manually advanced clock
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Ticks>,
}

impl ManualClock {
    /// Create a clock reading `start`
    #[must_use]
    pub const fn new(start: Ticks) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, duration: Millis) {
        self.now.set(self.now.get().after(duration));
    }

    /// Jump to `instant` if it is not earlier than the current reading
    pub fn set(&self, instant: Ticks) {
        if instant > self.now.get() {
            self.now.set(instant);
        }
    }
}

impl MonotonicClock for ManualClock {
    fn now(&self) -> Ticks {
        self.now.get()
    }
}
