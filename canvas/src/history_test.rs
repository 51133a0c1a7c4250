use super::*;
use crate::element::{ElementStyle, TextStyle};
use crate::geometry::Geometry;

fn entry_with(n: usize, ts: f64) -> HistoryEntry {
    let mut design = Design::default();
    for i in 0..n {
        #[allow(clippy::cast_precision_loss)]
        let x = i as f64;
        design
            .side_mut(Side::Front)
            .create(Geometry::new(x, 0.0, 30.0, 30.0), ElementStyle::Text(TextStyle::default()))
            .expect("create");
    }
    HistoryEntry::capture(&design, Side::Front, ts)
}

fn ok(_: &HistoryEntry) -> Result<(), HistoryError> {
    Ok(())
}

#[test]
fn duplicate_record_is_suppressed() {
    let mut h = HistoryManager::default();
    let e = entry_with(1, 1.0);
    assert!(h.record(e.clone()));
    let mut again = e;
    again.timestamp_ms = 99.0;
    assert!(!h.record(again));
    assert_eq!(h.len(), 1);
    assert_eq!(h.cursor(), 0);
}

#[test]
fn record_discards_redo_branch() {
    let mut h = HistoryManager::default();
    for n in 0..4 {
        h.record(entry_with(n, 0.0));
    }
    assert!(h.undo(ok).expect("undo"));
    assert!(h.undo(ok).expect("undo"));
    assert_eq!(h.cursor(), 1);
    h.record(entry_with(7, 0.0));
    assert_eq!(h.len(), 3);
    assert_eq!(h.cursor(), 2);
    assert!(!h.can_redo());
}

#[test]
fn cap_evicts_oldest_and_keeps_cursor_in_range() {
    let mut h = HistoryManager::default();
    for n in 0..(MAX_HISTORY + 10) {
        h.record(entry_with(n % 3, 0.0));
        assert!(h.cursor() < h.len());
    }
    assert_eq!(h.len(), MAX_HISTORY);
    assert_eq!(h.cursor(), MAX_HISTORY - 1);
}

#[test]
fn undo_at_start_is_noop() {
    let mut h = HistoryManager::default();
    assert!(!h.undo(ok).expect("empty"));
    h.record(entry_with(0, 0.0));
    assert!(!h.undo(ok).expect("single"));
    assert_eq!(h.cursor(), 0);
}

#[test]
fn redo_at_end_is_noop() {
    let mut h = HistoryManager::default();
    h.record(entry_with(0, 0.0));
    h.record(entry_with(1, 0.0));
    assert!(!h.redo(ok).expect("redo"));
    assert_eq!(h.cursor(), 1);
}

#[test]
fn failed_restore_leaves_cursor_unchanged() {
    let mut h = HistoryManager::default();
    h.record(entry_with(0, 0.0));
    h.record(entry_with(1, 0.0));
    let err = h.undo(|_| {
        Err(HistoryError::Restore(crate::element::ElementError::NonPositiveSize { id: uuid::Uuid::nil() }))
    });
    assert!(err.is_err());
    assert_eq!(h.cursor(), 1);
    assert_eq!(h.len(), 2);
}

#[test]
fn undo_hands_previous_entry_to_restore() {
    let mut h = HistoryManager::default();
    let first = entry_with(0, 0.0);
    h.record(first.clone());
    h.record(entry_with(2, 0.0));
    let mut seen = None;
    h.undo(|e| {
        seen = Some(e.clone());
        Ok(())
    })
    .expect("undo");
    assert_eq!(seen, Some(first));
}

#[test]
fn undo_redo_symmetry() {
    let mut h = HistoryManager::default();
    let n = 6;
    for i in 0..n {
        h.record(entry_with(i, 0.0));
    }
    let last = h.current().cloned();
    for _ in 0..n - 1 {
        assert!(h.undo(ok).expect("undo"));
    }
    assert_eq!(h.cursor(), 0);
    for _ in 0..n - 1 {
        assert!(h.redo(ok).expect("redo"));
    }
    assert_eq!(h.current().cloned(), last);
}

#[test]
fn entry_rebuilds_design() {
    let e = entry_with(3, 0.0);
    let design = e.to_design().expect("rebuild");
    assert_eq!(design.side(Side::Front).len(), 3);
    assert_eq!(HistoryEntry::capture(&design, Side::Front, 0.0), e);
}

#[test]
fn side_switch_counts_as_distinct_state() {
    let a = entry_with(1, 0.0);
    let mut b = a.clone();
    b.active_side = Side::Back;
    assert!(!a.same_state(&b));
}

#[test]
fn repair_cursor_clamps() {
    let mut h = HistoryManager::default();
    h.record(entry_with(0, 0.0));
    h.force_cursor(9);
    assert!(h.repair_cursor());
    assert_eq!(h.cursor(), 0);
    assert!(!h.repair_cursor());
}
