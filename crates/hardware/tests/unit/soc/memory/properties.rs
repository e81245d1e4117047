//! Randomized controller invariants.
//!
//! Interleaves inserts and issues drawn by proptest and checks, for every policy:
//! - the issue stream is a pure function of the input (same steps, same ops);
//! - every admitted request is issued exactly once;
//! - replaying the ops against a page model never touches a closed page,
//!   never activates an open one, and never exceeds the open-page limits;
//! - arrival order is kept where the policy promises it.

use std::collections::HashMap;

use memsched_core::common::{Command, Request};
use memsched_core::config::PolicyKind;
use memsched_core::soc::memory::{DramGeometry, Geometry};
use memsched_core::soc::traits::NullObserver;
use proptest::prelude::*;

use crate::common::harness::{DRAIN_LIMIT, config, host_ids, page, scheduler};

#[derive(Debug, Clone, Copy)]
enum Step {
    Insert(Command, u64),
    Issue,
}

fn step() -> impl Strategy<Value = Step> {
    let command = prop_oneof![
        Just(Command::Read),
        Just(Command::Write),
        Just(Command::Prewrite),
        Just(Command::Writeback),
    ];
    prop_oneof![
        2 => (command, 0u64..12).prop_map(|(c, p)| Step::Insert(c, p)),
        1 => Just(Step::Issue),
    ]
}

/// Applies `steps` then drains. Returns the inserted requests and the issued ops.
fn execute(policy: PolicyKind, steps: &[Step]) -> (Vec<Request>, Vec<Request>) {
    let mut s = scheduler(policy);
    let mut bus = NullObserver;
    let mut inserted = Vec::new();
    let mut ops = Vec::new();
    let mut now = 0;
    for (i, st) in steps.iter().enumerate() {
        match *st {
            Step::Insert(command, p) => {
                let r = Request::new(i as u64, page(p) + 8 * i as u64 % 1024, command);
                s.insert(r, now, &mut bus).unwrap();
                inserted.push(r);
            }
            Step::Issue => {
                if s.has_pending() {
                    ops.push(s.next(now, &mut bus).unwrap());
                }
            }
        }
        now += 1;
    }
    while s.has_pending() {
        assert!(ops.len() < DRAIN_LIMIT);
        ops.push(s.next(now, &mut bus).unwrap());
        now += 1;
    }
    assert_eq!(s.depth(), 0);
    (inserted, ops)
}

/// Walks `ops` against an open-page model and panics on any illegal transition.
fn check_page_protocol(policy: PolicyKind, ops: &[Request]) {
    let cfg = config(policy);
    let geo = Geometry::from(cfg.geometry);
    let max_open = if policy == PolicyKind::ReservationFcfs {
        cfg.max_active_pages
    } else {
        1
    };
    // bank -> open page
    let mut open: HashMap<usize, u64> = HashMap::new();
    for op in ops {
        let p = geo.page_of(op.addr);
        let bank = geo.bank_of(p);
        match op.command {
            Command::Activate => {
                assert!(!open.contains_key(&bank), "{op} activates busy bank {bank}");
                open.insert(bank, p);
                assert!(open.len() <= max_open, "{op} exceeds {max_open} open pages");
            }
            Command::Close => {
                assert_eq!(open.remove(&bank), Some(p), "{op} closes a page that is not open");
            }
            _ => {
                assert_eq!(open.get(&bank), Some(&p), "{op} issued to a closed page");
            }
        }
    }
}

fn ids_of(requests: &[Request], keep: impl Fn(Command) -> bool) -> Vec<u64> {
    requests
        .iter()
        .filter(|r| r.command.is_host() && keep(r.command))
        .map(|r| r.id)
        .collect()
}

const POLICIES: [PolicyKind; 4] = PolicyKind::ALL;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn issue_stream_is_deterministic(steps in prop::collection::vec(step(), 1..80)) {
        for policy in POLICIES {
            let (_, first) = execute(policy, &steps);
            let (_, second) = execute(policy, &steps);
            prop_assert_eq!(first, second);
        }
    }

    #[test]
    fn every_request_issued_once(steps in prop::collection::vec(step(), 1..80)) {
        for policy in POLICIES {
            let (inserted, ops) = execute(policy, &steps);
            let mut want: Vec<u64> = inserted.iter().map(|r| r.id).collect();
            let mut got = host_ids(&ops);
            want.sort_unstable();
            got.sort_unstable();
            prop_assert_eq!(want, got);
            prop_assert!(ops.iter().all(|r| r.command != Command::Prewrite));
        }
    }

    #[test]
    fn page_protocol_is_respected(steps in prop::collection::vec(step(), 1..80)) {
        for policy in POLICIES {
            let (_, ops) = execute(policy, &steps);
            check_page_protocol(policy, &ops);
        }
    }

    #[test]
    fn strict_fcfs_keeps_arrival_order(steps in prop::collection::vec(step(), 1..80)) {
        let (inserted, ops) = execute(PolicyKind::StrictFcfs, &steps);
        prop_assert_eq!(host_ids(&ops), ids_of(&inserted, |_| true));
    }

    #[test]
    fn read_priority_keeps_order_within_class(steps in prop::collection::vec(step(), 1..80)) {
        let (inserted, ops) = execute(PolicyKind::ReadPriorityFcfs, &steps);
        let is_read = |c: Command| c == Command::Read;
        let is_write = |c: Command| c != Command::Read;
        prop_assert_eq!(ids_of(&ops, is_read), ids_of(&inserted, is_read));
        prop_assert_eq!(ids_of(&ops, is_write), ids_of(&inserted, is_write));
    }
}
