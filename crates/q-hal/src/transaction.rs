// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Staged record updates
//!
//! A [`Transaction`] holds a private copy of a record. Callers mutate the
//! copy, then [`Transaction::commit`] frames it and hands it to the store as
//! one atomic replace. Dropping a transaction without committing discards
//! the copy, so a guard that fails halfway through a transition leaves both
//! the store and the caller's in-memory view untouched.

use crate::error::HalResult;
use crate::record::{store_record, Record};
use crate::traits::{RecordId, RecordStore};

/// Staged update of one record
#[must_use = "a transaction has no effect until committed"]
pub struct Transaction<'a, S: RecordStore + ?Sized, R: Record> {
    store: &'a mut S,
    id: RecordId,
    staged: R,
}

impl<'a, S: RecordStore + ?Sized, R: Record> Transaction<'a, S, R> {
    /// Begin a transaction on record `id`, staging a copy of `current`
    pub fn begin(store: &'a mut S, id: RecordId, current: &R) -> Self {
        Self {
            store,
            id,
            staged: current.clone(),
        }
    }

    /// Record being updated
    #[must_use]
    pub const fn id(&self) -> RecordId {
        self.id
    }

    /// Staged copy
    #[must_use]
    pub const fn staged(&self) -> &R {
        &self.staged
    }

    /// Mutable staged copy
    pub fn staged_mut(&mut self) -> &mut R {
        &mut self.staged
    }

    /// Commit the staged copy atomically and return it
    ///
    /// The caller installs the returned value as its new in-memory state.
    ///
    /// # Errors
    ///
    /// Propagates the store's commit error; the committed image is then
    /// unchanged and the staged copy is dropped.
    pub fn commit(self) -> HalResult<R> {
        store_record(self.store, self.id, &self.staged)?;
        Ok(self.staged)
    }

    /// Discard the staged copy
    pub fn abort(self) {}
}
