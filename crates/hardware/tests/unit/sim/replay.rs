//! Trace replay tests.
//!
//! Verifies channel occupancy per operation, deferred admission under
//! backpressure, blocked-time accounting, and run-to-run determinism.

use memsched_core::common::Command::{self, Activate, Close, Read};
use memsched_core::common::Request;
use memsched_core::config::{ControllerConfig, PolicyKind};
use memsched_core::sim::{ReplayBus, Trace, TraceEntry, replay};
use memsched_core::soc::memory::{DramTiming, build};
use memsched_core::soc::traits::BusObserver;
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::harness::{config, init_tracing, page, page_of};

fn trace(entries: &[(u64, u64, Command)]) -> Trace {
    entries
        .iter()
        .map(|&(cycle, addr, command)| TraceEntry::new(cycle, addr, command))
        .collect()
}

fn timeline(report: &memsched_core::sim::ReplayReport) -> Vec<(u64, Command, u64)> {
    report
        .issues
        .iter()
        .map(|r| (r.cycle, r.request.command, page_of(r.request.addr)))
        .collect()
}

#[test]
fn unit_timing_issues_one_op_per_cycle() {
    init_tracing();
    let mut s = build(&config(PolicyKind::StrictFcfs)).unwrap();
    let t = trace(&[(0, page(5), Read), (0, page(5), Read), (0, page(9), Read)]);
    let report = replay(s.as_mut(), &t, DramTiming::new(1, 1, 1)).unwrap();
    assert_eq!(
        timeline(&report),
        vec![
            (0, Activate, 5),
            (1, Read, 5),
            (2, Read, 5),
            (3, Close, 5),
            (4, Activate, 9),
            (5, Read, 9),
            (6, Close, 9),
        ]
    );
    assert_eq!(report.final_cycle, 7);
    assert_eq!(report.blocked_cycles, 0);
}

#[test]
fn channel_occupancy_follows_timing() {
    let mut s = build(&config(PolicyKind::StrictFcfs)).unwrap();
    let t = trace(&[(0, page(5), Read), (0, page(5), Read), (0, page(9), Read)]);
    let report = replay(s.as_mut(), &t, DramTiming::new(2, 3, 4)).unwrap();
    let cycles: Vec<u64> = report.issues.iter().map(|r| r.cycle).collect();
    // A(3) R(2) R(2) C(4) A(3) R(2) C(4)
    assert_eq!(cycles, vec![0, 3, 5, 7, 11, 14, 16]);
    assert_eq!(report.final_cycle, 20);
}

#[test]
fn idle_gaps_are_skipped_to_next_arrival() {
    let mut s = build(&config(PolicyKind::ReadPriorityFcfs)).unwrap();
    let t = trace(&[(0, page(1), Read), (500, page(1), Read)]);
    let report = replay(s.as_mut(), &t, DramTiming::new(1, 1, 1)).unwrap();
    assert_eq!(
        timeline(&report),
        vec![(0, Activate, 1), (1, Read, 1), (500, Read, 1)]
    );
    assert_eq!(report.final_cycle, 501);
}

#[test]
fn backpressure_defers_admission() {
    let cfg = ControllerConfig {
        high_watermark: 2,
        low_watermark: 1,
        ..config(PolicyKind::ReadPriorityFcfs)
    };
    let mut s = build(&cfg).unwrap();
    let t = trace(&[
        (0, page(1), Read),
        (0, page(1), Read),
        (0, page(1), Read),
        (0, page(1), Read),
        (0, page(1), Read),
        (0, page(1), Read),
    ]);
    let report = replay(s.as_mut(), &t, DramTiming::new(1, 1, 1)).unwrap();

    assert_eq!(report.host_issues().count(), 6);
    assert!(report.block_episodes >= 1);
    assert!(report.blocked_cycles > 0);
    assert!(report.deferred_cycles > 0);
    assert_eq!(report.blocked_cycles, s.stats().blocked_cycles);
    assert_eq!(report.block_episodes, s.stats().block_episodes);
    assert!(!s.is_blocked());
}

#[rstest]
fn replay_is_deterministic(
    #[values(
        PolicyKind::StrictFcfs,
        PolicyKind::ReadPriorityFcfs,
        PolicyKind::ReservationFcfs,
        PolicyKind::TimeMultiplexed
    )]
    policy: PolicyKind,
) {
    let entries: Vec<(u64, u64, Command)> = (0..60u64)
        .map(|i| {
            let command = if i % 4 == 0 { Command::Write } else { Read };
            (i / 3, page(i * 7 % 13) + i, command)
        })
        .collect();
    let t = trace(&entries);
    let run = || {
        let mut s = build(&config(policy)).unwrap();
        replay(s.as_mut(), &t, DramTiming::default()).unwrap()
    };
    let first = run();
    assert_eq!(first, run());
    assert_eq!(first.host_issues().count(), 60);
}

#[test]
fn protocol_command_in_trace_aborts_replay() {
    let mut s = build(&config(PolicyKind::TimeMultiplexed)).unwrap();
    let t = trace(&[(0, page(1), Command::Close)]);
    let err = replay(s.as_mut(), &t, DramTiming::default()).unwrap_err();
    assert!(err.is_fatal());
}

#[test]
fn replay_bus_tracks_state() {
    let mut bus = ReplayBus::new(DramTiming::new(2, 3, 4));
    assert!(bus.is_free(0));
    bus.occupy(&Request::activate(1, 0, 0), 10);
    assert_eq!(bus.busy_until(), 13);
    assert!(!bus.is_free(12));
    assert!(bus.is_free(13));

    bus.on_blocked(20);
    assert!(bus.is_blocked());
    bus.on_unblocked(30, 10);
    assert!(!bus.is_blocked());
    assert_eq!(bus.blocked_cycles(), 10);
}

#[test]
fn empty_trace_finishes_immediately() {
    let mut s = build(&ControllerConfig::default()).unwrap();
    let report = replay(s.as_mut(), &Trace::default(), DramTiming::default()).unwrap();
    assert!(report.issues.is_empty());
    assert_eq!(report.final_cycle, 0);
}
