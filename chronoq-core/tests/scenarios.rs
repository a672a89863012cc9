//! End-to-end stepping scenarios against the public API.

use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;
use std::time::Duration;

use chronoq_core::prelude::*;

type Log = Rc<RefCell<Vec<(&'static str, u64)>>>;

fn ns(n: u64) -> VirtualTime {
    VirtualTime::from_nanos(n)
}

/// Registers a body that appends `(name, now)` to the log.
fn record(sched: &mut Scheduler, log: &Log, when: u64, name: &'static str) -> CancelHandle {
    let log = log.clone();
    sched.at(ns(when), move |s| log.borrow_mut().push((name, s.now().as_nanos())))
}

#[test]
fn fires_in_time_order_with_fifo_ties() {
    let mut sched = Scheduler::new();
    let log = Log::default();
    record(&mut sched, &log, 20, "D");
    record(&mut sched, &log, 5, "A");
    record(&mut sched, &log, 10, "B");
    record(&mut sched, &log, 10, "C");

    assert!(sched.step());
    assert_eq!(
        *log.borrow(),
        vec![("A", 5), ("B", 10), ("C", 10), ("D", 20)]
    );
    assert_eq!(sched.now(), ns(20));
    assert!(sched.is_empty());
    assert!(!sched.step_one());
}

#[test]
fn step_until_before_first_event_only_moves_clock() {
    let mut sched = Scheduler::new();
    let log = Log::default();
    let e = record(&mut sched, &log, 15, "E");

    assert_eq!(sched.step_until(ns(10)).unwrap(), true);
    assert!(log.borrow().is_empty());
    assert_eq!(sched.now(), ns(10));
    assert!(sched.is_pending(e));
}

#[test]
fn callback_schedules_follow_up() {
    let mut sched = Scheduler::new();
    let log = Log::default();
    {
        let log = log.clone();
        sched.at(ns(3), move |s| {
            log.borrow_mut().push(("F", s.now().as_nanos()));
            let log = log.clone();
            s.after(Duration::from_nanos(2), move |s| {
                log.borrow_mut().push(("G", s.now().as_nanos()))
            });
        });
    }

    assert!(sched.step());
    assert_eq!(*log.borrow(), vec![("F", 3), ("G", 5)]);
    assert_eq!(sched.now(), ns(5));
    assert!(sched.is_empty());
}

#[test]
fn step_on_empty_queue_reports_nothing_ran() {
    let mut sched = Scheduler::new();
    assert!(!sched.step_one());
    assert!(!sched.step());
    assert!(!sched.step_while(|_| true));
    assert_eq!(sched.now(), VirtualTime::ZERO);
}

#[test]
fn step_until_on_empty_queue_moves_clock() {
    let mut sched = Scheduler::new();
    assert_eq!(sched.step_until(ns(42)).unwrap(), false);
    assert_eq!(sched.now(), ns(42));
}

#[test]
fn step_until_drains_inclusive_horizon() {
    let mut sched = Scheduler::new();
    let log = Log::default();
    record(&mut sched, &log, 4, "a");
    record(&mut sched, &log, 10, "b");
    record(&mut sched, &log, 11, "c");

    assert_eq!(sched.step_until(ns(10)).unwrap(), true);
    assert_eq!(*log.borrow(), vec![("a", 4), ("b", 10)]);
    assert_eq!(sched.now(), ns(10));

    assert_eq!(sched.step_until(ns(50)).unwrap(), false);
    assert_eq!(log.borrow().len(), 3);
    assert_eq!(sched.now(), ns(50));
}

#[test]
fn step_until_fires_events_registered_inside_horizon() {
    let mut sched = Scheduler::new();
    let log = Log::default();
    {
        let log = log.clone();
        sched.at(ns(2), move |s| {
            let inside = log.clone();
            let outside = log.clone();
            s.at(ns(6), move |s| inside.borrow_mut().push(("inside", s.now().as_nanos())));
            s.at(ns(9), move |s| outside.borrow_mut().push(("outside", s.now().as_nanos())));
        });
    }

    assert_eq!(sched.step_until(ns(8)).unwrap(), true);
    assert_eq!(*log.borrow(), vec![("inside", 6)]);
    assert_eq!(sched.len(), 1);
}

#[test]
fn step_for_is_relative_to_now() {
    let mut sched = Scheduler::new();
    let log = Log::default();
    record(&mut sched, &log, 1_500, "x");

    sched.step_for(Duration::from_nanos(1_000)).unwrap();
    assert!(log.borrow().is_empty());
    assert_eq!(sched.now(), ns(1_000));

    assert_eq!(sched.step_for(Duration::from_nanos(1_000)).unwrap(), false);
    assert_eq!(*log.borrow(), vec![("x", 1_500)]);
    assert_eq!(sched.now(), ns(2_000));
}

#[test]
fn step_while_checks_predicate_before_each_step() {
    let mut sched = Scheduler::new();
    let log = Log::default();
    for t in 1..=5 {
        record(&mut sched, &log, t * 10, "tick");
    }

    let ran = sched.step_while(|s| s.now() < ns(30));
    assert!(ran);
    assert_eq!(log.borrow().len(), 3);
    assert_eq!(sched.now(), ns(30));

    assert!(!sched.step_while(|_| false));
    assert_eq!(sched.len(), 2);
}

#[test]
fn step_while_stops_when_queue_empties() {
    let mut sched = Scheduler::new();
    let log = Log::default();
    record(&mut sched, &log, 1, "only");

    let mut probes = 0;
    assert!(sched.step_while(|_| {
        probes += 1;
        true
    }));
    assert_eq!(probes, 2);
}

#[test]
fn canceled_event_never_fires_and_order_is_kept() {
    let mut sched = Scheduler::new();
    let log = Log::default();
    record(&mut sched, &log, 1, "a");
    let b = record(&mut sched, &log, 2, "b");
    record(&mut sched, &log, 2, "c");
    record(&mut sched, &log, 3, "d");

    sched.cancel(b).unwrap();
    assert!(!sched.is_pending(b));
    sched.step();

    assert_eq!(*log.borrow(), vec![("a", 1), ("c", 2), ("d", 3)]);
    assert_eq!(sched.stats().canceled, 1);
    assert_eq!(sched.stats().fired, 3);
}

#[test]
fn timeout_is_canceled_by_the_reply() {
    let mut sched = Scheduler::new();
    let log = Log::default();
    let timeout = record(&mut sched, &log, 100, "timeout");
    {
        let log = log.clone();
        sched.at(ns(40), move |s| {
            log.borrow_mut().push(("reply", s.now().as_nanos()));
            s.cancel(timeout).unwrap();
        });
    }

    sched.step();
    assert_eq!(*log.borrow(), vec![("reply", 40)]);
    assert_eq!(sched.now(), ns(40));
}

#[test]
fn callback_cancels_a_later_sibling() {
    let mut sched = Scheduler::new();
    let log = Log::default();
    let victim = Rc::new(RefCell::new(None));
    {
        let victim = victim.clone();
        let log = log.clone();
        sched.at(ns(5), move |s| {
            log.borrow_mut().push(("killer", s.now().as_nanos()));
            let handle = victim.borrow_mut().take().unwrap();
            s.cancel(handle).unwrap();
        });
    }
    *victim.borrow_mut() = Some(record(&mut sched, &log, 5, "victim"));
    record(&mut sched, &log, 6, "survivor");

    sched.step();
    assert_eq!(*log.borrow(), vec![("killer", 5), ("survivor", 6)]);
}

#[test]
fn zero_delay_follow_up_runs_in_the_same_drain() {
    let mut sched = Scheduler::new();
    let log = Log::default();
    {
        let log = log.clone();
        sched.at(ns(7), move |s| {
            let log = log.clone();
            s.after(Duration::ZERO, move |s| {
                log.borrow_mut().push(("echo", s.now().as_nanos()))
            });
        });
    }
    record(&mut sched, &log, 7, "peer");

    assert!(sched.step());
    // Equal due times keep registration order: the echo was registered last.
    assert_eq!(*log.borrow(), vec![("peer", 7), ("echo", 7)]);
    assert!(!sched.step_one());
}

#[test]
fn panicking_body_is_consumed_not_redelivered() {
    let mut sched = Scheduler::new();
    let log = Log::default();
    sched.at(ns(1), |_| panic!("body failure"));
    record(&mut sched, &log, 2, "next");

    let result = catch_unwind(AssertUnwindSafe(|| sched.step()));
    assert!(result.is_err());

    assert_eq!(sched.now(), ns(1));
    assert_eq!(sched.len(), 1);
    assert!(sched.current().is_none());
    assert!(sched.step());
    assert_eq!(*log.borrow(), vec![("next", 2)]);
}

#[test]
fn identical_scripts_are_deterministic() {
    fn run() -> (Vec<(&'static str, u64)>, VirtualTime) {
        let mut sched = Scheduler::new();
        let log = Log::default();
        for (when, name) in [(9, "p"), (3, "q"), (9, "r"), (1, "s"), (3, "t")] {
            record(&mut sched, &log, when, name);
        }
        {
            let log = log.clone();
            sched.at(ns(3), move |s| {
                let log = log.clone();
                s.after(Duration::from_nanos(6), move |s| {
                    log.borrow_mut().push(("late", s.now().as_nanos()))
                });
            });
        }
        sched.step();
        let fired = log.borrow().clone();
        (fired, sched.now())
    }

    let first = run();
    assert_eq!(first, run());
    assert_eq!(
        first.0,
        vec![("s", 1), ("q", 3), ("t", 3), ("p", 9), ("r", 9), ("late", 9)]
    );
}

#[test]
fn clock_handle_observes_progress() {
    let mut sched = Scheduler::new();
    let observer = sched.clock().clone();
    sched.at(ns(12), |_| {});
    sched.step();
    assert_eq!(observer.now(), ns(12));
}

#[test]
fn dropping_scheduler_drops_pending_bodies() {
    let witness = Rc::new(());
    {
        let mut sched = Scheduler::new();
        for t in 0..3 {
            let witness = witness.clone();
            sched.at(ns(t), move |_| drop(witness));
        }
        assert_eq!(Rc::strong_count(&witness), 4);
    }
    assert_eq!(Rc::strong_count(&witness), 1);
}
