// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn fake_clock_advances() {
    let clock = FakeClock::new();
    let start = clock.epoch_ms();
    clock.advance(Duration::from_secs(2));
    assert_eq!(clock.epoch_ms(), start + 2_000);
}

#[test]
fn fake_clock_clones_share_time() {
    let clock = FakeClock::new();
    let other = clock.clone();
    clock.set_epoch_ms(42);
    assert_eq!(other.epoch_ms(), 42);
}

#[test]
fn system_clock_is_after_2020() {
    assert!(SystemClock.epoch_ms() > 1_577_836_800_000);
}
