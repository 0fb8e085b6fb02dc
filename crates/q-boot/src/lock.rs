// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Lock state machine
//!
//! The lock state is a bit mask plus the carrier unlock nonce and the
//! carrier device data digest, persisted as one record:
//!
//! | Bit  | Lock         | Who may change it                                |
//! |------|--------------|--------------------------------------------------|
//! | 0x01 | PROVISION    | anyone to set; bootloader to re-set; anyone to clear (full reset) |
//! | 0x02 | CARRIER_LOCK | set before provisioning; cleared by a signed token |
//! | 0x04 | DEVICE_LOCK  | the running OS only                              |
//! | 0x08 | BOOT_LOCK    | the bootloader only                              |
//!
//! Until PROVISION is set, the only permitted transitions are setting
//! PROVISION and enabling the carrier lock, so the factory can configure
//! the device before committing it.

use core::cell::Cell;
use core::fmt;

use q_common::config::{LockConfig, LogConfig, SystemConfig};
use q_common::constants::{DEVICE_DATA_SIZE, NONCE_SIZE};
use q_common::log::LogBuffer;
use q_common::{log_info, log_warn, Error, Nonce, Privilege, Result};
use q_crypto::SignatureVerifier;
use q_hal::{load_record, HalError, HalResult, Record, RecordId, RecordStore, Transaction};

use crate::carrier::{device_data_digest, CarrierUnlock};
use crate::records;

const MODULE: &str = "lock";

/// Lock mask bits
pub mod bits {
    /// Device is provisioned
    pub const PROVISION: u8 = 0x01;
    /// Device is bound to a carrier
    pub const CARRIER_LOCK: u8 = 0x02;
    /// User has locked the device from the OS
    pub const DEVICE_LOCK: u8 = 0x04;
    /// Bootloader is locked
    pub const BOOT_LOCK: u8 = 0x08;
    /// Every defined bit
    pub const ALL: u8 = PROVISION | CARRIER_LOCK | DEVICE_LOCK | BOOT_LOCK;
}

// ============================================================================
// Selectors
// ============================================================================

/// A single lock bit addressed by a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LockSelector {
    /// PROVISION bit
    Provision = bits::PROVISION,
    /// CARRIER_LOCK bit
    CarrierLock = bits::CARRIER_LOCK,
    /// DEVICE_LOCK bit
    DeviceLock = bits::DEVICE_LOCK,
    /// BOOT_LOCK bit
    BootLock = bits::BOOT_LOCK,
}

impl LockSelector {
    /// Mask bit of this selector
    #[must_use]
    pub const fn bit(self) -> u8 {
        self as u8
    }

    /// Short name used in the audit log
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Provision => "provision",
            Self::CarrierLock => "carrier-lock",
            Self::DeviceLock => "device-lock",
            Self::BootLock => "boot-lock",
        }
    }
}

impl TryFrom<u8> for LockSelector {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            bits::PROVISION => Ok(Self::Provision),
            bits::CARRIER_LOCK => Ok(Self::CarrierLock),
            bits::DEVICE_LOCK => Ok(Self::DeviceLock),
            bits::BOOT_LOCK => Ok(Self::BootLock),
            _ => Err(Error::InvalidSelector),
        }
    }
}

impl fmt::Display for LockSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Persisted state
// ============================================================================

/// Persisted lock state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockState {
    mask: u8,
    nonce: Nonce,
    device_data: [u8; DEVICE_DATA_SIZE],
}

impl LockState {
    /// Lock mask
    #[must_use]
    pub const fn mask(&self) -> u8 {
        self.mask
    }

    /// Check a lock bit
    #[must_use]
    pub const fn is_set(&self, bit: u8) -> bool {
        self.mask & bit == bit
    }

    /// Largest carrier nonce accepted so far
    #[must_use]
    pub const fn nonce(&self) -> Nonce {
        self.nonce
    }

    /// SHA-256 of the carrier device data, zero once unlocked
    #[must_use]
    pub const fn device_data(&self) -> &[u8; DEVICE_DATA_SIZE] {
        &self.device_data
    }

    fn set_bit(&mut self, bit: u8, enable: bool) {
        if enable {
            self.mask |= bit;
        } else {
            self.mask &= !bit;
        }
    }
}

impl Record for LockState {
    const SIZE: usize = 1 + NONCE_SIZE + DEVICE_DATA_SIZE;

    fn encode(&self, out: &mut [u8]) {
        out[0] = self.mask;
        out[1..=NONCE_SIZE].copy_from_slice(&self.nonce.to_le_bytes());
        out[1 + NONCE_SIZE..Self::SIZE].copy_from_slice(&self.device_data);
    }

    fn decode(bytes: &[u8]) -> HalResult<Self> {
        let mask = bytes[0];
        if mask & !bits::ALL != 0 {
            return Err(HalError::InvalidEncoding);
        }

        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&bytes[1..=NONCE_SIZE]);
        let mut device_data = [0u8; DEVICE_DATA_SIZE];
        device_data.copy_from_slice(&bytes[1 + NONCE_SIZE..Self::SIZE]);

        Ok(Self {
            mask,
            nonce: Nonce::from_le_bytes(nonce),
            device_data,
        })
    }
}

// ============================================================================
// Global state
// ============================================================================

/// Device-wide state outside the lock record
pub trait GlobalState {
    /// Whether the device has left the factory
    fn production(&self) -> bool;
}

impl GlobalState for bool {
    fn production(&self) -> bool {
        *self
    }
}

impl GlobalState for Cell<bool> {
    fn production(&self) -> bool {
        self.get()
    }
}

impl<G: GlobalState + ?Sized> GlobalState for &G {
    fn production(&self) -> bool {
        (**self).production()
    }
}

// ============================================================================
// State machine
// ============================================================================

/// Lock state machine
pub struct LockStateMachine<S: RecordStore, V: SignatureVerifier, G: GlobalState> {
    store: S,
    record: RecordId,
    carrier: CarrierUnlock<V>,
    global: G,
    state: LockState,
    sequence: u64,
    log: LogBuffer,
}

impl<S: RecordStore, V: SignatureVerifier, G: GlobalState> LockStateMachine<S, V, G> {
    /// Open the state machine on the default lock record
    ///
    /// A device that never committed a lock state starts with every bit
    /// clear.
    ///
    /// # Errors
    ///
    /// Returns `Error::StorageCorrupted` if the record fails its integrity
    /// check, or another storage error.
    pub fn open(store: S, verifier: V, global: G, config: LockConfig) -> Result<Self> {
        Self::open_at(store, records::LOCK_STATE, verifier, global, config, &LogConfig::DEFAULT)
    }

    /// Open the state machine from the system-wide configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidData` for an inconsistent configuration, or
    /// see [`LockStateMachine::open`].
    pub fn open_with_config(
        store: S,
        verifier: V,
        global: G,
        config: &SystemConfig,
    ) -> Result<Self> {
        config.validate()?;
        Self::open_at(store, records::LOCK_STATE, verifier, global, config.lock, &config.log)
    }

    /// Open the state machine on an explicit record
    ///
    /// # Errors
    ///
    /// See [`LockStateMachine::open`].
    pub fn open_at(
        store: S,
        record: RecordId,
        verifier: V,
        global: G,
        config: LockConfig,
        log: &LogConfig,
    ) -> Result<Self> {
        let state = load_record::<S, LockState>(&store, record)?.unwrap_or_default();

        let mut this = Self {
            store,
            record,
            carrier: CarrierUnlock::new(verifier, config),
            global,
            state,
            sequence: 0,
            log: LogBuffer::with_config(log),
        };
        let seq = this.next_sequence();
        log_info!(this.log, seq, MODULE, "opened, mask=0x{:02X}", this.state.mask());
        Ok(this)
    }

    /// Read the lock state
    ///
    /// Selector `0` returns the whole mask; a lock selector returns its bit
    /// (zero or the bit value).
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidSelector` for any other selector.
    pub fn get_lock_state(&self, selector: u8) -> Result<u8> {
        if selector == 0 {
            return Ok(self.state.mask());
        }
        let selector = LockSelector::try_from(selector)?;
        Ok(self.state.mask() & selector.bit())
    }

    /// Change one lock bit
    ///
    /// `payload` is only used by the carrier lock: the device data when
    /// enabling, the unlock token when disabling.
    ///
    /// # Errors
    ///
    /// `Error::InvalidSelector` for an unknown selector, otherwise as the
    /// per-lock setters.
    pub fn set_lock_state(
        &mut self,
        selector: u8,
        enable: bool,
        payload: &[u8],
        privilege: Privilege,
    ) -> Result<()> {
        match LockSelector::try_from(selector) {
            Ok(LockSelector::Provision) => self.set_provision(enable, privilege),
            Ok(LockSelector::CarrierLock) => self.set_carrier_lock(enable, payload),
            Ok(LockSelector::DeviceLock) => self.set_device_lock(enable, privilege),
            Ok(LockSelector::BootLock) => self.set_boot_lock(enable, privilege),
            Err(e) => {
                let seq = self.next_sequence();
                log_warn!(self.log, seq, MODULE, "selector 0x{:02X} rejected", selector);
                Err(e)
            }
        }
    }

    /// Set or clear PROVISION
    ///
    /// Clearing resets the whole lock state, including the carrier nonce and
    /// device data.
    ///
    /// # Errors
    ///
    /// `Error::SecurityStatusNotSatisfied` when re-provisioning without
    /// bootloader privilege, or a storage error.
    pub fn set_provision(&mut self, enable: bool, privilege: Privilege) -> Result<()> {
        let result = if enable {
            self.provision(privilege)
        } else {
            self.commit(|state| *state = LockState::default())
        };
        self.record_outcome(LockSelector::Provision, enable, result)
    }

    /// Set or clear CARRIER_LOCK
    ///
    /// Enabling binds the device to `SHA-256(payload)`. Disabling requires
    /// a signed unlock token in `payload`; a device that is not carrier
    /// locked accepts any disable request without looking at the payload.
    ///
    /// # Errors
    ///
    /// - `Error::ConditionsNotSatisfied` when enabling on a provisioned or
    ///   production device, when disabling on an unprovisioned device, or
    ///   for a replayed token
    /// - `Error::InvalidData` for a malformed token
    /// - `Error::SecurityStatusNotSatisfied` for a bad signature
    pub fn set_carrier_lock(&mut self, enable: bool, payload: &[u8]) -> Result<()> {
        let result = if enable {
            self.carrier_lock(payload)
        } else {
            self.carrier_unlock(payload)
        };
        self.record_outcome(LockSelector::CarrierLock, enable, result)
    }

    /// Set or clear DEVICE_LOCK
    ///
    /// # Errors
    ///
    /// `Error::ConditionsNotSatisfied` before provisioning or when called
    /// by the bootloader.
    pub fn set_device_lock(&mut self, enable: bool, privilege: Privilege) -> Result<()> {
        let result = self.device_lock(enable, privilege);
        self.record_outcome(LockSelector::DeviceLock, enable, result)
    }

    /// Set or clear BOOT_LOCK
    ///
    /// # Errors
    ///
    /// - `Error::ConditionsNotSatisfied` before provisioning, or when
    ///   clearing while CARRIER_LOCK or DEVICE_LOCK is set
    /// - `Error::SecurityStatusNotSatisfied` without bootloader privilege
    pub fn set_boot_lock(&mut self, enable: bool, privilege: Privilege) -> Result<()> {
        let result = self.boot_lock(enable, privilege);
        self.record_outcome(LockSelector::BootLock, enable, result)
    }

    /// Check an unlock token against caller-supplied nonce and device data
    ///
    /// The lock state is not touched.
    ///
    /// # Errors
    ///
    /// See [`CarrierUnlock::verify_test_vector`].
    pub fn verify_test_vector(
        &mut self,
        last_nonce: &[u8],
        device_data: &[u8],
        token: &[u8],
    ) -> Result<Nonce> {
        let result = self.carrier.verify_test_vector(last_nonce, device_data, token);
        let seq = self.next_sequence();
        match &result {
            Ok(_) => log_info!(self.log, seq, MODULE, "test vector verified"),
            Err(e) => log_warn!(self.log, seq, MODULE, "test vector rejected: {}", e),
        }
        result
    }

    /// Current lock state
    #[must_use]
    pub const fn state(&self) -> &LockState {
        &self.state
    }

    /// Nonce policy
    #[must_use]
    pub const fn config(&self) -> &LockConfig {
        self.carrier.config()
    }

    /// Carrier unlock verifier
    #[must_use]
    pub const fn carrier(&self) -> &CarrierUnlock<V> {
        &self.carrier
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

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    fn provision(&mut self, privilege: Privilege) -> Result<()> {
        if self.state.is_set(bits::PROVISION) && !privilege.is_bootloader() {
            return Err(Error::SecurityStatusNotSatisfied);
        }
        self.commit(|state| state.set_bit(bits::PROVISION, true))
    }

    fn carrier_lock(&mut self, payload: &[u8]) -> Result<()> {
        if self.state.is_set(bits::PROVISION) || self.global.production() {
            return Err(Error::ConditionsNotSatisfied);
        }
        let digest = device_data_digest(payload);
        self.commit(|state| {
            state.device_data = digest;
            state.set_bit(bits::CARRIER_LOCK, true);
        })
    }

    fn carrier_unlock(&mut self, payload: &[u8]) -> Result<()> {
        self.require_provisioned()?;
        if !self.state.is_set(bits::CARRIER_LOCK) {
            return Ok(());
        }

        let nonce = self
            .carrier
            .verify(self.state.nonce(), self.state.device_data(), payload)?;

        self.commit(|state| {
            state.set_bit(bits::CARRIER_LOCK, false);
            state.nonce = nonce;
            state.device_data = [0u8; DEVICE_DATA_SIZE];
        })
    }

    fn device_lock(&mut self, enable: bool, privilege: Privilege) -> Result<()> {
        self.require_provisioned()?;
        if privilege.is_bootloader() {
            return Err(Error::ConditionsNotSatisfied);
        }
        self.commit(|state| state.set_bit(bits::DEVICE_LOCK, enable))
    }

    fn boot_lock(&mut self, enable: bool, privilege: Privilege) -> Result<()> {
        self.require_provisioned()?;
        if !privilege.is_bootloader() {
            return Err(Error::SecurityStatusNotSatisfied);
        }
        let held = self.state.is_set(bits::CARRIER_LOCK) || self.state.is_set(bits::DEVICE_LOCK);
        if !enable && held {
            return Err(Error::ConditionsNotSatisfied);
        }
        self.commit(|state| state.set_bit(bits::BOOT_LOCK, enable))
    }

    fn require_provisioned(&self) -> Result<()> {
        if self.state.is_set(bits::PROVISION) {
            Ok(())
        } else {
            Err(Error::ConditionsNotSatisfied)
        }
    }

    /// Stage a copy of the state, apply `update` and commit it atomically
    fn commit(&mut self, update: impl FnOnce(&mut LockState)) -> Result<()> {
        let mut tx = Transaction::begin(&mut self.store, self.record, &self.state);
        update(tx.staged_mut());
        self.state = tx.commit()?;
        Ok(())
    }

    fn record_outcome(
        &mut self,
        selector: LockSelector,
        enable: bool,
        result: Result<()>,
    ) -> Result<()> {
        let seq = self.next_sequence();
        let action = if enable { "enable" } else { "disable" };
        match &result {
            Ok(()) => {
                let mask = self.state.mask();
                log_info!(self.log, seq, MODULE, "{} {}, mask=0x{:02X}", selector, action, mask);
            }
            Err(e) => {
                log_warn!(self.log, seq, MODULE, "{} {} rejected: {}", selector, action, e);
            }
        }
        result
    }

    fn next_sequence(&mut self) -> u64 {
        self.sequence = self.sequence.wrapping_add(1);
        self.sequence
    }
}
