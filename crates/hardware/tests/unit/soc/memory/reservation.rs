//! Reservation-aware multi-bank controller tests.
//!
//! Verifies the four selection steps in their fixed order (activate, close
//! idle page, page hit, fallback), the open-page capacity and per-bank
//! limits, and that reserved write slots bound starvation of writes by reads
//! and of reads by writes.

use memsched_core::common::Command::{Activate, Close, Read, Write, Writeback};
use memsched_core::common::{Command, Request};
use memsched_core::config::{ControllerConfig, PolicyKind};
use memsched_core::soc::memory::MemoryScheduler;
use memsched_core::soc::memory::controller::ReservationFcfs;
use memsched_core::soc::traits::NullObserver;
use pretty_assertions::assert_eq;

use crate::common::harness::{DRAIN_LIMIT, config, geometry, init_tracing, page, shape};

fn controller(edit: impl FnOnce(&mut ControllerConfig)) -> ReservationFcfs {
    init_tracing();
    let mut cfg = config(PolicyKind::ReservationFcfs);
    edit(&mut cfg);
    ReservationFcfs::new(&cfg, geometry())
}

/// Inserts everything at cycle 0, drains, and checks the open-page limit after every op.
fn run_checked(s: &mut ReservationFcfs, requests: &[Request], max_pages: usize) -> Vec<Request> {
    let mut bus = NullObserver;
    for r in requests {
        s.insert(*r, 0, &mut bus).unwrap();
    }
    let mut ops = Vec::new();
    let mut now = 1;
    while s.has_pending() {
        assert!(ops.len() < DRAIN_LIMIT);
        ops.push(s.next(now, &mut bus).unwrap());
        assert!(s.open_pages().len() <= max_pages);
        now += 1;
    }
    ops
}

#[test]
fn activates_before_serving_and_closes_idle_pages() {
    let mut s = controller(|_| {});
    let ops = run_checked(
        &mut s,
        &[
            Request::read(1, page(1)),
            Request::read(2, page(2)),
            Request::read(3, page(1)),
        ],
        4,
    );
    assert_eq!(
        shape(&ops),
        vec![
            (Activate, 1),
            (Activate, 2),
            (Read, 1),
            (Read, 2),
            (Close, 2),
            (Read, 1),
        ]
    );
    // Page 1 stays open once the queues are empty.
    assert!(s.open_pages().is_open(1));
}

#[test]
fn bank_conflict_forces_close_first() {
    let mut s = controller(|_| {});
    // Pages 1 and 9 share bank 1 with eight banks.
    let ops = run_checked(
        &mut s,
        &[Request::read(1, page(1)), Request::read(2, page(9))],
        4,
    );
    assert_eq!(
        shape(&ops),
        vec![
            (Activate, 1),
            (Read, 1),
            (Close, 1),
            (Activate, 9),
            (Read, 9),
        ]
    );
}

#[test]
fn open_page_capacity_is_respected() {
    let mut s = controller(|c| c.max_active_pages = 2);
    let ops = run_checked(
        &mut s,
        &[
            Request::read(1, page(1)),
            Request::read(2, page(2)),
            Request::read(3, page(3)),
        ],
        2,
    );
    assert_eq!(
        shape(&ops),
        vec![
            (Activate, 1),
            (Activate, 2),
            (Read, 1),
            (Close, 1),
            (Activate, 3),
            (Read, 2),
            (Close, 2),
            (Read, 3),
        ]
    );
}

#[test]
fn reads_preferred_over_older_writes() {
    let mut s = controller(|_| {});
    let ops = run_checked(
        &mut s,
        &[Request::write(1, page(5)), Request::read(2, page(6))],
        4,
    );
    // Activation outranks closing, so page 5 opens before idle page 6 is closed.
    assert_eq!(
        shape(&ops),
        vec![(Activate, 6), (Read, 6), (Activate, 5), (Close, 6), (Write, 5)]
    );
}

#[test]
fn prewrite_joins_writeback_queue() {
    let mut s = controller(|_| {});
    let mut bus = NullObserver;
    s.insert(Request::new(1, page(2), Command::Prewrite), 0, &mut bus)
        .unwrap();
    assert_eq!(s.pending_writes(), 1);
    let ops = run_checked(&mut s, &[], 4);
    assert_eq!(shape(&ops), vec![(Activate, 2), (Writeback, 2)]);
}

#[test]
fn reserved_slots_start_and_end_a_drain() {
    let mut s = controller(|c| c.reserved_slots = 2);
    let mut bus = NullObserver;
    s.insert(Request::write(1, page(5)), 0, &mut bus).unwrap();
    assert!(!s.is_draining());
    s.insert(Request::write(2, page(6)), 0, &mut bus).unwrap();
    assert!(s.is_draining());

    let _ = run_checked(&mut s, &[], 4);
    assert!(!s.is_draining());
}

/// Keeps the read queue topped up on page 1 and counts cycles until `writes` writes issue.
fn cycles_until_writes(s: &mut ReservationFcfs, writes: usize, limit: u64) -> Option<u64> {
    let mut bus = NullObserver;
    let mut next_id = 100;
    for id in 0..writes as u64 {
        s.insert(Request::write(id, page(10 + id)), 0, &mut bus).unwrap();
    }
    for _ in 0..4 {
        s.insert(Request::read(next_id, page(1)), 0, &mut bus).unwrap();
        next_id += 1;
    }

    let mut issued_writes = 0;
    for now in 1..=limit {
        let op = s.next(now, &mut bus).unwrap();
        if op.command == Read {
            s.insert(Request::read(next_id, page(1)), now, &mut bus).unwrap();
            next_id += 1;
        }
        if op.command == Write {
            issued_writes += 1;
            if issued_writes == writes {
                return Some(now);
            }
        }
    }
    None
}

#[test]
fn writes_progress_under_continuous_reads() {
    let mut s = controller(|c| c.reserved_slots = 2);
    let done = cycles_until_writes(&mut s, 2, 50);
    assert!(done.is_some_and(|cycle| cycle <= 12), "writes starved: {done:?}");
}

#[test]
fn without_reservation_reads_starve_writes() {
    let mut s = controller(|c| c.reserved_slots = 0);
    assert_eq!(cycles_until_writes(&mut s, 2, 50), None);
    assert_eq!(s.pending_writes(), 2);
}

#[test]
fn fallback_serves_oldest_when_preferred_is_blocked() {
    // One open page: the write drain needs page 5 but page 1 holds the only slot.
    let mut s = controller(|c| {
        c.max_active_pages = 1;
        c.reserved_slots = 1;
    });
    let mut bus = NullObserver;
    s.insert(Request::read(1, page(1)), 0, &mut bus).unwrap();
    assert_eq!(s.next(1, &mut bus).unwrap().command, Activate);
    s.insert(Request::read(2, page(1)), 1, &mut bus).unwrap();
    s.insert(Request::write(3, page(5)), 1, &mut bus).unwrap();
    assert!(s.is_draining());

    // Writes are preferred but cannot open; page 1 is still wanted, so the
    // fallback serves the oldest request, which hits the open page.
    let r1 = s.next(2, &mut bus).unwrap();
    assert_eq!((r1.command, r1.id), (Read, 1));
    let r2 = s.next(3, &mut bus).unwrap();
    assert_eq!((r2.command, r2.id), (Read, 2));
    // Page 1 is now idle and closed before the write gets its page.
    let rest = run_checked(&mut s, &[], 1);
    assert_eq!(shape(&rest), vec![(Close, 1), (Activate, 5), (Write, 5)]);
}

#[test]
fn read_served_under_continuous_writes() {
    let mut s = controller(|c| c.reserved_slots = 2);
    let mut bus = NullObserver;
    s.insert(Request::read(0, page(1)), 0, &mut bus).unwrap();
    let mut next_page = 10;
    for id in 1..=4 {
        s.insert(Request::write(id, page(next_page)), 0, &mut bus).unwrap();
        next_page += 1;
    }
    assert!(s.is_draining());

    // A fresh write arrives after every host issue, so writes never run out.
    let mut read_at = None;
    for now in 1..=2000u64 {
        let op = s.next(now, &mut bus).unwrap();
        if op.command == Read {
            read_at = Some(now);
            break;
        }
        if op.command.is_host() {
            s.insert(Request::write(100 + now, page(next_page)), now, &mut bus)
                .unwrap();
            next_page += 1;
        }
    }
    assert!(read_at.is_some_and(|cycle| cycle <= 32), "read starved: {read_at:?}");
    assert!(s.pending_writes() >= 2);
}

#[test]
fn drain_ends_after_reserved_slot_count() {
    let mut s = controller(|c| c.reserved_slots = 2);
    let mut bus = NullObserver;
    s.insert(Request::read(0, page(1)), 0, &mut bus).unwrap();
    for id in 1..=5 {
        s.insert(Request::write(id, page(10 + id)), 0, &mut bus).unwrap();
    }
    assert!(s.is_draining());

    let mut writes = 0;
    let mut now = 1;
    while writes < 2 {
        if s.next(now, &mut bus).unwrap().command == Write {
            writes += 1;
        }
        now += 1;
    }
    // Three writes still pend, but the read is owed its turn first.
    assert!(!s.is_draining());
    assert_eq!(s.pending_writes(), 3);

    loop {
        let op = s.next(now, &mut bus).unwrap();
        now += 1;
        if op.command == Read {
            break;
        }
        assert_ne!(op.command, Write, "write issued before the owed read");
    }
    assert!(s.is_draining());
}
