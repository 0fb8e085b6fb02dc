// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Platform collaborator traits
//!
//! The trust anchor needs exactly two things from the platform: a store that
//! replaces whole records atomically, and a clock that never runs backwards.

use q_common::time::Ticks;

use crate::error::HalResult;

/// Identifier of a persisted record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(pub u16);

impl RecordId {
    /// Index form of the identifier
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Crash-atomic record store
///
/// A commit either replaces the complete image of one record or leaves the
/// previous image in place; a reader never observes a partial write, even
/// across power loss.
pub trait RecordStore {
    /// Largest image a single record may hold, in bytes
    fn record_capacity(&self) -> usize;

    /// Read the committed image of `id` into `buffer`
    ///
    /// Returns `Ok(None)` if the record was never committed, or the image
    /// length otherwise.
    ///
    /// # Errors
    ///
    /// Returns `HalError::InvalidRecord` for an unknown id,
    /// `HalError::RecordTooLarge` if `buffer` cannot hold the image and
    /// `HalError::ReadFailed` if the backing medium fails.
    fn load(&self, id: RecordId, buffer: &mut [u8]) -> HalResult<Option<usize>>;

    /// Atomically replace the image of `id` with `data`
    ///
    /// # Errors
    ///
    /// Returns `HalError::CommitFailed` if the write did not take effect. The
    /// previous image is still readable in that case.
    fn commit(&mut self, id: RecordId, data: &[u8]) -> HalResult<()>;
}

/// Monotonic millisecond clock
pub trait MonotonicClock {
    /// Current instant
    fn now(&self) -> Ticks;
}

impl<C: MonotonicClock + ?Sized> MonotonicClock for &C {
    fn now(&self) -> Ticks {
        (**self).now()
    }
}
