//! Backpressure monitor unit tests.
//!
//! Verifies the state machine in isolation: out-of-state transitions are
//! errors, blocked periods are measured and reported to the bus, and the
//! watermarks apply with hysteresis.

use memsched_core::common::ControllerError;
use memsched_core::soc::memory::controller::Backpressure;
use memsched_core::soc::traits::NullObserver;
use mockall::predicate::eq;

use crate::common::mocks::bus::{BusEvent, MockBus, RecordingBus};

#[test]
fn starts_unblocked() {
    let bp = Backpressure::new(192, 60);
    assert!(!bp.is_blocked());
    assert_eq!(bp.high(), 192);
    assert_eq!(bp.low(), 60);
    assert_eq!(bp.total_blocked(), 0);
    assert_eq!(bp.episodes(), 0);
}

#[test]
fn double_block_is_an_error() {
    let mut bp = Backpressure::new(4, 2);
    let mut bus = NullObserver;
    bp.set_blocked(1, &mut bus).unwrap();
    assert_eq!(bp.set_blocked(2, &mut bus), Err(ControllerError::AlreadyBlocked));
    assert!(bp.is_blocked());
    assert_eq!(bp.blocked_since(), 1);
}

#[test]
fn unblock_when_not_blocked_is_an_error() {
    let mut bp = Backpressure::new(4, 2);
    assert_eq!(
        bp.set_unblocked(5, &mut NullObserver),
        Err(ControllerError::NotBlocked)
    );
}

#[test]
fn blocked_period_is_reported_to_bus() {
    let mut bus = MockBus::new();
    bus.expect_on_blocked().with(eq(100)).times(1).return_const(());
    bus.expect_on_unblocked()
        .with(eq(130), eq(30))
        .times(1)
        .return_const(());

    let mut bp = Backpressure::new(4, 2);
    bp.set_blocked(100, &mut bus).unwrap();
    assert_eq!(bp.set_unblocked(130, &mut bus), Ok(30));
    assert_eq!(bp.total_blocked(), 30);
    assert_eq!(bp.episodes(), 1);
}

#[test]
fn totals_accumulate_across_episodes() {
    let mut bus = RecordingBus::new();
    let mut bp = Backpressure::new(4, 2);
    bp.set_blocked(0, &mut bus).unwrap();
    bp.set_unblocked(10, &mut bus).unwrap();
    bp.set_blocked(20, &mut bus).unwrap();
    bp.set_unblocked(25, &mut bus).unwrap();

    assert_eq!(bp.total_blocked(), 15);
    assert_eq!(bp.episodes(), 2);
    assert_eq!(bus.blocked_cycles(), 15);
    assert_eq!(
        bus.events,
        vec![
            BusEvent::Blocked(0),
            BusEvent::Unblocked { now: 10, cycles: 10 },
            BusEvent::Blocked(20),
            BusEvent::Unblocked { now: 25, cycles: 5 },
        ]
    );
}

#[test]
fn after_insert_blocks_strictly_above_high() {
    let mut bp = Backpressure::new(192, 60);
    let mut bus = NullObserver;
    for depth in 1..=192 {
        assert_eq!(bp.after_insert(depth, depth as u64, &mut bus), Ok(false));
    }
    assert!(!bp.is_blocked());
    assert_eq!(bp.after_insert(193, 193, &mut bus), Ok(true));
    assert!(bp.is_blocked());
    // Already blocked: further inserts do not re-block.
    assert_eq!(bp.after_insert(194, 194, &mut bus), Ok(false));
}

#[test]
fn hysteresis_releases_only_below_low() {
    let mut bp = Backpressure::new(192, 60);
    let mut bus = RecordingBus::new();
    assert_eq!(bp.after_insert(193, 0, &mut bus), Ok(true));

    for depth in (60..=192).rev() {
        assert_eq!(bp.after_issue(depth, 1000, &mut bus), Ok(None));
        assert!(bp.is_blocked(), "released early at depth {depth}");
    }
    assert_eq!(bp.after_issue(59, 1000, &mut bus), Ok(Some(1000)));
    assert!(!bp.is_blocked());
    assert_eq!(bp.after_issue(58, 1001, &mut bus), Ok(None));
    assert_eq!(bus.events.len(), 2);
}

#[test]
fn after_issue_is_noop_when_not_blocked() {
    let mut bp = Backpressure::new(4, 2);
    assert_eq!(bp.after_issue(0, 5, &mut NullObserver), Ok(None));
    assert_eq!(bp.episodes(), 0);
}
