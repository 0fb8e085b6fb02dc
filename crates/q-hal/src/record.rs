// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Persisted record framing
//!
//! Every record is stored as `payload || crc32(payload)` with the CRC in
//! little-endian order. The CRC catches media corruption; atomicity is the
//! store's job.
//!
//! Frames are assembled in a stack buffer that is zeroized before returning,
//! since slot records carry keys and values.

use zeroize::Zeroize;

use crate::error::{HalError, HalResult};
use crate::traits::{RecordId, RecordStore};

/// Largest record payload, in bytes
pub const MAX_RECORD_SIZE: usize = 4096;

/// Size of the trailing CRC, in bytes
pub const CRC_SIZE: usize = 4;

/// Largest framed record, in bytes
pub const MAX_FRAME_SIZE: usize = MAX_RECORD_SIZE + CRC_SIZE;

/// A fixed-size persisted structure
pub trait Record: Sized + Clone {
    /// Encoded payload length in bytes
    const SIZE: usize;

    /// Encode into `out`, which is exactly `SIZE` bytes long
    fn encode(&self, out: &mut [u8]);

    /// Decode from `bytes`, which is exactly `SIZE` bytes long
    ///
    /// # Errors
    ///
    /// Returns `HalError::InvalidEncoding` if a field holds a value outside
    /// its domain.
    fn decode(bytes: &[u8]) -> HalResult<Self>;
}

/// Frame length of a record type
#[must_use]
pub const fn frame_size<R: Record>() -> usize {
    R::SIZE + CRC_SIZE
}

/// Load and verify record `id`
///
/// Returns `Ok(None)` if the record was never committed.
///
/// # Errors
///
/// Returns `HalError::IntegrityCheckFailed` if the frame length or CRC does
/// not match, and propagates store and decode errors.
pub fn load_record<S, R>(store: &S, id: RecordId) -> HalResult<Option<R>>
where
    S: RecordStore + ?Sized,
    R: Record,
{
    if R::SIZE > MAX_RECORD_SIZE {
        return Err(HalError::RecordTooLarge);
    }

    let mut frame = [0u8; MAX_FRAME_SIZE];
    let result = match store.load(id, &mut frame) {
        Ok(Some(len)) => decode_frame::<R>(&frame[..len]).map(Some),
        Ok(None) => Ok(None),
        Err(e) => Err(e),
    };
    frame.zeroize();
    result
}

/// Frame `record` and commit it atomically as record `id`
///
/// # Errors
///
/// Returns `HalError::RecordTooLarge` if the record exceeds
/// [`MAX_RECORD_SIZE`] and propagates store commit errors.
pub fn store_record<S, R>(store: &mut S, id: RecordId, record: &R) -> HalResult<()>
where
    S: RecordStore + ?Sized,
    R: Record,
{
    if R::SIZE > MAX_RECORD_SIZE {
        return Err(HalError::RecordTooLarge);
    }

    let mut frame = [0u8; MAX_FRAME_SIZE];
    record.encode(&mut frame[..R::SIZE]);
    let crc = compute_crc32(&frame[..R::SIZE]);
    frame[R::SIZE..frame_size::<R>()].copy_from_slice(&crc.to_le_bytes());

    let result = store.commit(id, &frame[..frame_size::<R>()]);
    frame.zeroize();
    result
}

fn decode_frame<R: Record>(frame: &[u8]) -> HalResult<R> {
    if frame.len() != frame_size::<R>() {
        return Err(HalError::IntegrityCheckFailed);
    }

    let (payload, crc) = frame.split_at(R::SIZE);
    let stored = u32::from_le_bytes([crc[0], crc[1], crc[2], crc[3]]);
    if stored != compute_crc32(payload) {
        return Err(HalError::IntegrityCheckFailed);
    }

    R::decode(payload)
}

// ============================================================================
// CRC32 Implementation
// ============================================================================

/// Compute CRC32 (IEEE 802.3 polynomial)
#[must_use]
pub fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = generate_crc32_table();

    let mut crc = 0xFFFF_FFFFu32;

    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }

    !crc
}

/// Generate CRC32 lookup table at compile time
#[allow(clippy::cast_possible_truncation)]
const fn generate_crc32_table() -> [u32; 256] {
    const POLYNOMIAL: u32 = 0xEDB8_8320;
    let mut table = [0u32; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ POLYNOMIAL;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }

    table
}
