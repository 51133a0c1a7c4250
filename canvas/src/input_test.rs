#![allow(clippy::float_cmp)]

use super::*;

// =============================================================
// Modifiers
// =============================================================

#[test]
fn modifiers_default_all_false() {
    let m = Modifiers::default();
    assert!(!m.shift);
    assert!(!m.ctrl);
    assert!(!m.alt);
    assert!(!m.meta);
    assert!(!m.command());
}

#[test]
fn command_is_ctrl_or_meta() {
    assert!(Modifiers { ctrl: true, ..Modifiers::default() }.command());
    assert!(Modifiers { meta: true, ..Modifiers::default() }.command());
    assert!(!Modifiers { shift: true, alt: true, ..Modifiers::default() }.command());
}

// =============================================================
// PointerTarget
// =============================================================

#[test]
fn pointer_target_default_is_canvas() {
    assert_eq!(PointerTarget::default(), PointerTarget::Canvas);
}

// =============================================================
// InputState
// =============================================================

#[test]
fn input_state_default_is_idle() {
    let s = InputState::default();
    assert!(s.is_idle());
    assert_eq!(s.target(), None);
    assert_eq!(s.cursor(), None);
}

#[test]
fn every_active_state_reports_its_target() {
    let id = uuid::Uuid::new_v4();
    let g = Geometry::new(0.0, 0.0, 50.0, 50.0);
    let p = Point::new(1.0, 2.0);
    let states = [
        InputState::Dragging { id, start_pointer: p, start: g },
        InputState::Resizing { id, handle: ResizeHandle::Se, start_pointer: p, start: g },
        InputState::Rotating { id, center: g.center() },
    ];
    for s in states {
        assert!(!s.is_idle());
        assert_eq!(s.target(), Some(id));
        assert!(s.cursor().is_some());
    }
}

#[test]
fn resizing_cursor_follows_handle() {
    let id = uuid::Uuid::new_v4();
    let s = InputState::Resizing {
        id,
        handle: ResizeHandle::E,
        start_pointer: Point::new(0.0, 0.0),
        start: Geometry::new(0.0, 0.0, 30.0, 30.0),
    };
    assert_eq!(s.cursor(), Some("ew-resize"));
}

// =============================================================
// Feedback and flip
// =============================================================

#[test]
fn drag_feedback_dims_and_elevates() {
    let id = uuid::Uuid::new_v4();
    let fb = DragFeedback::for_element(id);
    assert_eq!(fb.opacity, 0.7);
    assert_eq!(fb.z_index, 1001);
}

#[test]
fn flip_showing_each_side() {
    let front = FlipState::showing(Side::Front);
    assert_eq!(front.angle(Side::Front), 0.0);
    assert_eq!(front.angle(Side::Back), 180.0);
    let back = FlipState::showing(Side::Back);
    assert_eq!(back.angle(Side::Back), 0.0);
    assert!(!back.is_flat());
    assert!(FlipState { front_deg: 0.0, back_deg: 0.0 }.is_flat());
}

#[test]
fn face_scale_mirrors_turned_away_face() {
    let front = FlipState::showing(Side::Front);
    assert!((front.face_scale_x(Side::Front) - 1.0).abs() < 1e-12);
    assert!((front.face_scale_x(Side::Back) + 1.0).abs() < 1e-12);
    let mid = FlipState { front_deg: 90.0, back_deg: 270.0 };
    assert!(mid.face_scale_x(Side::Front).abs() < 1e-12);
    assert!(FlipState::FLAT.is_flat());
    assert!((FlipState::FLAT.face_scale_x(Side::Back) - 1.0).abs() < 1e-12);
}

#[test]
fn ui_state_defaults() {
    let ui = UiState::default();
    assert_eq!(ui.selected_id, None);
    assert_eq!(ui.active_side, Side::Front);
    assert_eq!(ui.flip, FlipState::showing(Side::Front));
}
