use super::*;

#[test]
fn newer_ticket_makes_older_stale() {
    let mut gate = JobGate::default();
    let a = gate.begin();
    let b = gate.begin();
    assert!(!gate.is_current(a));
    assert!(gate.is_current(b));
    assert!(!gate.finish(a));
    assert!(gate.in_flight());
    assert!(gate.finish(b));
    assert!(!gate.in_flight());
}

#[test]
fn exclusive_begin_rejects_while_in_flight() {
    let mut gate = JobGate::default();
    let t = gate.begin_exclusive().expect("first");
    assert_eq!(gate.begin_exclusive(), None);
    assert!(gate.finish(t));
    assert!(gate.begin_exclusive().is_some());
}

#[test]
fn cancel_releases_and_invalidates() {
    let mut gate = JobGate::default();
    let t = gate.begin();
    assert!(gate.cancel());
    assert!(!gate.in_flight());
    assert!(!gate.finish(t));
    assert!(!gate.cancel());
}

#[test]
fn tickets_survive_host_round_trip() {
    let mut gate = JobGate::default();
    let t = gate.begin();
    assert!(gate.is_current(JobTicket::from_id(t.id())));
}
