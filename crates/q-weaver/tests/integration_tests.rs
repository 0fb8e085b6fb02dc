// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Integration tests for q-weaver
//!
//! Drives the slot store through the command-level interface with a RAM
//! record store and a manual clock, including restarts, injected commit
//! failures and media corruption.

use q_common::config::ThrottleConfig;
use q_common::constants::NUM_SLOTS;
use q_common::{Error, Millis, Ticks};
use q_hal::sim::{ManualClock, MemoryStore};
use q_weaver::{encode_backoff, SlotStore, Slots};

type Backing = MemoryStore<NUM_SLOTS, 64>;
type Store<'a> = SlotStore<Backing, &'a ManualClock>;

const KEY: [u8; 16] = [0x00; 16];
const VALUE: [u8; 16] = [0xAA; 16];
const WRONG: [u8; 16] = [0x01; 16];

fn open(clock: &ManualClock) -> Store<'_> {
    SlotStore::open(Backing::new(), clock, ThrottleConfig::DEFAULT).expect("open")
}

mod scenario_tests {
    use super::*;

    #[test]
    fn test_slot_five_throttling_scenario() {
        let clock = ManualClock::new(Ticks::new(10_000));
        let mut store = open(&clock);
        assert_eq!(store.num_slots(), 64);
        store.write(5, &KEY, &VALUE).unwrap();

        let mut out = [0u8; 16];
        for attempt in 1..=4u16 {
            assert_eq!(store.read(5, &WRONG, &mut out), Err(Error::WrongKey { backoff_ms: 0 }));
            assert_eq!(store.failure_count(5), Ok(attempt));
            assert_eq!(out, [0u8; 16]);
        }

        // Fifth failure crosses into the flat band
        assert_eq!(store.read(5, &WRONG, &mut out), Err(Error::WrongKey { backoff_ms: 30_000 }));
        assert_eq!(out, encode_backoff(Millis::new(30_000)));

        // Correct key inside the window is still refused
        clock.advance(Millis::new(10_000));
        assert_eq!(store.read(5, &KEY, &mut out), Err(Error::BackOff { remaining_ms: 20_000 }));
        assert_eq!(out, encode_backoff(Millis::new(20_000)));

        clock.advance(Millis::new(20_000));
        assert_eq!(store.read(5, &KEY, &mut out), Ok(()));
        assert_eq!(out, VALUE);
        assert_eq!(store.failure_count(5), Ok(0));
    }

    #[test]
    fn test_high_word_slot_id_rejected() {
        let clock = ManualClock::new(Ticks::ZERO);
        let mut store = open(&clock);
        store.write(5, &KEY, &VALUE).unwrap();

        let mut out = [0u8; 16];
        assert_eq!(store.read(0x0001_0005, &KEY, &mut out), Err(Error::InvalidSlotId));
        assert_eq!(store.write(0x0001_0005, &KEY, &VALUE), Err(Error::InvalidSlotId));
        assert_eq!(store.erase(0x0001_0005), Err(Error::InvalidSlotId));
        assert_eq!(store.read(64, &KEY, &mut out), Err(Error::InvalidSlotId));
    }

    #[test]
    fn test_backoff_does_not_consume_attempts() {
        let clock = ManualClock::new(Ticks::ZERO);
        let mut store = open(&clock);
        store.write(0, &KEY, &VALUE).unwrap();

        let mut out = [0u8; 16];
        for _ in 0..5 {
            let _ = store.read(0, &WRONG, &mut out);
        }
        let commits = store.store().commit_count();
        for _ in 0..10 {
            assert!(matches!(store.read(0, &WRONG, &mut out), Err(Error::BackOff { .. })));
        }
        assert_eq!(store.failure_count(0), Ok(5));
        assert_eq!(store.store().commit_count(), commits);
    }
}

mod slot_semantics_tests {
    use super::*;

    #[test]
    fn test_unwritten_slot_reads_as_zero() {
        let clock = ManualClock::new(Ticks::ZERO);
        let mut store = open(&clock);
        let mut out = [0xFFu8; 16];
        assert_eq!(store.read(63, &[0u8; 16], &mut out), Ok(()));
        assert_eq!(out, [0u8; 16]);
    }

    #[test]
    fn test_write_overwrites_and_clears_throttle() {
        let clock = ManualClock::new(Ticks::ZERO);
        let mut store = open(&clock);
        store.write(7, &KEY, &VALUE).unwrap();

        let mut out = [0u8; 16];
        for _ in 0..6 {
            let _ = store.read(7, &WRONG, &mut out);
        }
        store.write(7, &WRONG, &[0x55; 16]).unwrap();
        assert_eq!(store.failure_count(7), Ok(0));

        assert!(matches!(store.read(7, &KEY, &mut out), Err(Error::WrongKey { .. })));
        store.write(7, &WRONG, &[0x55; 16]).unwrap();
        assert_eq!(store.read(7, &WRONG, &mut out), Ok(()));
        assert_eq!(out, [0x55; 16]);
    }

    #[test]
    fn test_erase_is_idempotent() {
        let clock = ManualClock::new(Ticks::ZERO);
        let mut store = open(&clock);
        store.write(9, &WRONG, &VALUE).unwrap();

        store.erase(9).unwrap();
        store.erase(9).unwrap();

        let mut out = [0xFFu8; 16];
        assert_eq!(store.read(9, &[0u8; 16], &mut out), Ok(()));
        assert_eq!(out, [0u8; 16]);
    }

    #[test]
    fn test_erase_all_through_capability() {
        fn wipe<S: Slots>(slots: &mut S) -> q_common::Result<()> {
            slots.erase_all()
        }

        let clock = ManualClock::new(Ticks::ZERO);
        let mut store = open(&clock);
        for slot in [0u32, 31, 63] {
            store.write(slot, &WRONG, &VALUE).unwrap();
        }
        wipe(&mut store).unwrap();

        let mut out = [0u8; 16];
        for slot in [0u32, 31, 63] {
            assert_eq!(store.read(slot, &[0u8; 16], &mut out), Ok(()));
            assert_eq!(out, [0u8; 16]);
        }
    }

    #[test]
    fn test_response_is_always_sixteen_bytes() {
        let clock = ManualClock::new(Ticks::ZERO);
        let mut store = open(&clock);
        store.write(1, &KEY, &VALUE).unwrap();

        let silent = encode_backoff(Millis::ZERO);
        let flat = encode_backoff(Millis::new(30_000));
        let steps: [([u8; 16], Result<(), Error>, [u8; 16]); 7] = [
            (KEY, Ok(()), VALUE),
            (WRONG, Err(Error::WrongKey { backoff_ms: 0 }), silent),
            (WRONG, Err(Error::WrongKey { backoff_ms: 0 }), silent),
            (WRONG, Err(Error::WrongKey { backoff_ms: 0 }), silent),
            (WRONG, Err(Error::WrongKey { backoff_ms: 0 }), silent),
            (WRONG, Err(Error::WrongKey { backoff_ms: 30_000 }), flat),
            (KEY, Err(Error::BackOff { remaining_ms: 30_000 }), flat),
        ];

        for (key, expected, response) in steps {
            let mut out = [0xEEu8; 17];
            assert_eq!(store.read(1, &key, &mut out[..16]), expected);
            assert_eq!(out[..16], response);
            assert_eq!(out[16], 0xEE);
        }
    }

    #[test]
    fn test_lengths_checked_after_slot_id() {
        let clock = ManualClock::new(Ticks::ZERO);
        let mut store = open(&clock);
        let mut out = [0u8; 16];
        assert_eq!(store.read(0, &[0u8; 15], &mut out), Err(Error::WrongLength));
        assert_eq!(store.read(99, &[0u8; 15], &mut out), Err(Error::InvalidSlotId));
    }
}

mod persistence_tests {
    use super::*;

    #[test]
    fn test_throttle_survives_restart() {
        let clock = ManualClock::new(Ticks::ZERO);
        let mut store = open(&clock);
        store.write(2, &KEY, &VALUE).unwrap();

        let mut out = [0u8; 16];
        for _ in 0..5 {
            let _ = store.read(2, &WRONG, &mut out);
        }

        let (backing, clock_ref) = store.into_parts();
        let mut store = SlotStore::open(backing, clock_ref, ThrottleConfig::DEFAULT).unwrap();
        assert_eq!(store.failure_count(2), Ok(5));
        assert!(matches!(store.read(2, &KEY, &mut out), Err(Error::BackOff { .. })));

        clock.advance(Millis::from_secs(30));
        assert_eq!(store.read(2, &KEY, &mut out), Ok(()));
        assert_eq!(out, VALUE);
    }

    #[test]
    fn test_failed_wrong_key_commit_releases_nothing() {
        let clock = ManualClock::new(Ticks::ZERO);
        let mut store = open(&clock);
        store.write(4, &KEY, &VALUE).unwrap();

        store.store_mut().fail_after_commits(0);
        let mut out = [0xFFu8; 16];
        assert_eq!(store.read(4, &WRONG, &mut out), Err(Error::StorageWriteFailed));
        assert_eq!(out, [0u8; 16]);
        assert_eq!(store.failure_count(4), Ok(0));
    }

    #[test]
    fn test_failed_write_keeps_old_value() {
        let clock = ManualClock::new(Ticks::ZERO);
        let mut store = open(&clock);
        store.write(4, &KEY, &VALUE).unwrap();

        store.store_mut().fail_after_commits(0);
        assert_eq!(store.write(4, &KEY, &[0x11; 16]), Err(Error::StorageWriteFailed));
        store.store_mut().clear_fault();

        let mut out = [0u8; 16];
        store.read(4, &KEY, &mut out).unwrap();
        assert_eq!(out, VALUE);
    }

    #[test]
    fn test_corrupted_slot_detected_on_open() {
        let clock = ManualClock::new(Ticks::ZERO);
        let mut store = open(&clock);
        store.write(8, &KEY, &VALUE).unwrap();

        let (mut backing, clock_ref) = store.into_parts();
        backing.corrupt(q_hal::RecordId(8), 20);
        let result = SlotStore::open(backing, clock_ref, ThrottleConfig::DEFAULT);
        assert!(matches!(result, Err(Error::StorageCorrupted)));
    }

    #[test]
    fn test_open_from_system_config() {
        use q_common::config::{LogConfig, SystemConfig};

        let clock = ManualClock::new(Ticks::ZERO);
        let config = SystemConfig {
            log: LogConfig::DEVELOPMENT,
            ..SystemConfig::DEFAULT
        };
        let mut store = SlotStore::open_with_config(Backing::new(), &clock, &config).unwrap();
        assert_eq!(store.config(), &ThrottleConfig::DEFAULT);

        // Clean reads are only audited at debug level
        let before = store.log().len();
        let mut out = [0u8; 16];
        store.read(0, &[0u8; 16], &mut out).unwrap();
        assert_eq!(store.log().len(), before + 1);

        let broken = SystemConfig {
            throttle: ThrottleConfig {
                free_attempts: 0,
                ..ThrottleConfig::DEFAULT
            },
            ..SystemConfig::DEFAULT
        };
        assert!(matches!(
            SlotStore::open_with_config(Backing::new(), &clock, &broken),
            Err(Error::InvalidData)
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let clock = ManualClock::new(Ticks::ZERO);
        let config = ThrottleConfig {
            doubling_step: 0,
            ..ThrottleConfig::DEFAULT
        };
        assert!(matches!(
            SlotStore::open(Backing::new(), &clock, config),
            Err(Error::InvalidData)
        ));
    }
}

mod debug_tests {
    use q_weaver::Slot;

    #[test]
    fn test_debug_hides_secrets() {
        let rendered = format!("{:?}", Slot::default());
        assert!(rendered.contains("failure_count"));
        assert!(!rendered.contains("key"));
        assert!(!rendered.contains("value"));
    }
}

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_high_bits_always_rejected(high in 1u32..=0xFFFF, low in 0u32..64) {
            let clock = ManualClock::new(Ticks::ZERO);
            let mut store = open(&clock);
            prop_assert_eq!(store.erase((high << 16) | low), Err(Error::InvalidSlotId));
        }

        #[test]
        fn prop_erase_idempotent(slot in 0u32..64, key in any::<[u8; 16]>(), value in any::<[u8; 16]>()) {
            let clock = ManualClock::new(Ticks::ZERO);
            let mut store = open(&clock);
            store.write(slot, &key, &value).unwrap();
            store.erase(slot).unwrap();
            let once = store.failure_count(slot);
            store.erase(slot).unwrap();
            prop_assert_eq!(store.failure_count(slot), once);

            let mut out = [0xFFu8; 16];
            prop_assert_eq!(store.read(slot, &[0u8; 16], &mut out), Ok(()));
            prop_assert_eq!(out, [0u8; 16]);
        }

        #[test]
        fn prop_backoff_never_decreases(failures in 1usize..40) {
            let clock = ManualClock::new(Ticks::ZERO);
            let mut store = open(&clock);
            store.write(0, &KEY, &VALUE).unwrap();

            let mut out = [0u8; 16];
            let mut last = 0u32;
            for _ in 0..failures {
                // Let every window lapse so each attempt reaches the key check
                clock.advance(Millis::new(u32::MAX));
                match store.read(0, &WRONG, &mut out) {
                    Err(Error::WrongKey { backoff_ms }) => {
                        prop_assert!(backoff_ms >= last);
                        last = backoff_ms;
                    }
                    other => prop_assert!(false, "unexpected {:?}", other),
                }
            }
        }
    }
}
