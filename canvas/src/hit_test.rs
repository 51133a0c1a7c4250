#![allow(clippy::float_cmp)]

use super::*;
use crate::element::{ElementStyle, QrStyle, ShapeKind, ShapeStyle};

fn shape() -> ElementStyle {
    ElementStyle::Shape(ShapeStyle::new(ShapeKind::Rectangle))
}

fn approx(a: Point, b: Point) -> bool {
    (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
}

// =============================================================
// Handle positions
// =============================================================

#[test]
fn handles_sit_on_corners_and_edges() {
    let g = Geometry::new(10.0, 20.0, 100.0, 50.0);
    assert!(approx(handle_position(&g, ResizeHandle::Nw), Point::new(10.0, 20.0)));
    assert!(approx(handle_position(&g, ResizeHandle::Se), Point::new(110.0, 70.0)));
    assert!(approx(handle_position(&g, ResizeHandle::E), Point::new(110.0, 45.0)));
    assert!(approx(handle_position(&g, ResizeHandle::N), Point::new(60.0, 20.0)));
}

#[test]
fn rotate_handle_above_top_edge() {
    let g = Geometry::new(0.0, 100.0, 100.0, 50.0);
    assert!(approx(rotate_handle_position(&g), Point::new(50.0, 76.0)));
}

#[test]
fn handles_follow_rotation() {
    let mut g = Geometry::new(0.0, 0.0, 100.0, 100.0);
    g.rotation = 90.0;
    // Top-left corner rotates clockwise onto the top-right.
    assert!(approx(handle_position(&g, ResizeHandle::Nw), Point::new(100.0, 0.0)));
}

// =============================================================
// Effective z
// =============================================================

#[test]
fn selection_and_drag_boost_ordinary_elements() {
    let el = Element::create(Geometry::new(0.0, 0.0, 30.0, 30.0), shape(), 4);
    let id = el.id();
    assert_eq!(effective_z_index(&el, None, None), 4);
    assert_eq!(effective_z_index(&el, Some(id), None), SELECTED_Z_INDEX);
    assert_eq!(effective_z_index(&el, Some(id), Some(id)), DRAG_Z_INDEX);
}

#[test]
fn qr_keeps_baseline_and_tops_when_selected() {
    let qr = Element::create(
        Geometry::new(0.0, 0.0, 80.0, 80.0),
        ElementStyle::QrCode(QrStyle { source_ref: "q.png".into() }),
        QR_Z_INDEX,
    );
    assert_eq!(effective_z_index(&qr, None, None), QR_Z_INDEX);
    assert_eq!(effective_z_index(&qr, Some(qr.id()), None), QR_SELECTED_Z_INDEX);
    assert_eq!(effective_z_index(&qr, Some(qr.id()), Some(qr.id())), QR_SELECTED_Z_INDEX);
}

// =============================================================
// hit_test
// =============================================================

#[test]
fn topmost_body_wins() {
    let mut side = CardSide::default();
    let low = side.create(Geometry::new(0.0, 0.0, 100.0, 100.0), shape()).expect("low");
    let high = side.create(Geometry::new(50.0, 50.0, 100.0, 100.0), shape()).expect("high");
    let hit = hit_test(Point::new(75.0, 75.0), &side, None).expect("hit");
    assert_eq!(hit, Hit { element_id: high, part: HitPart::Body });
    // Selecting the lower one lifts it above.
    let hit = hit_test(Point::new(75.0, 75.0), &side, Some(low)).expect("hit");
    assert_eq!(hit.element_id, low);
}

#[test]
fn miss_returns_none() {
    let mut side = CardSide::default();
    side.create(Geometry::new(0.0, 0.0, 50.0, 50.0), shape()).expect("create");
    assert_eq!(hit_test(Point::new(300.0, 300.0), &side, None), None);
}

#[test]
fn selected_handles_take_priority() {
    let mut side = CardSide::default();
    let id = side.create(Geometry::new(100.0, 100.0, 100.0, 60.0), shape()).expect("create");
    let hit = hit_test(Point::new(101.0, 101.0), &side, Some(id)).expect("hit");
    assert_eq!(hit.part, HitPart::Resize(ResizeHandle::Nw));
    let hit = hit_test(Point::new(150.0, 76.0), &side, Some(id)).expect("hit");
    assert_eq!(hit.part, HitPart::Rotate);
}

#[test]
fn unselected_handles_are_not_hit() {
    let mut side = CardSide::default();
    side.create(Geometry::new(100.0, 100.0, 100.0, 60.0), shape()).expect("create");
    assert_eq!(hit_test(Point::new(150.0, 76.0), &side, None), None);
}

#[test]
fn rotated_body_is_hit_in_local_space() {
    let mut side = CardSide::default();
    let id = side.create(Geometry::new(0.0, 40.0, 100.0, 20.0), shape()).expect("create");
    if let Some(el) = side.get_mut(id) {
        let mut g = *el.geometry();
        g.rotation = 90.0;
        el.update_geometry(g);
    }
    assert!(hit_test(Point::new(50.0, 5.0), &side, None).is_some());
    assert!(hit_test(Point::new(5.0, 50.0), &side, None).is_none());
}

#[test]
fn paint_order_puts_qr_last() {
    let mut side = CardSide::default();
    let q = side
        .create(Geometry::new(0.0, 0.0, 80.0, 80.0), ElementStyle::QrCode(QrStyle { source_ref: "q".into() }))
        .expect("qr");
    side.create(Geometry::new(0.0, 0.0, 30.0, 30.0), shape()).expect("a");
    side.create(Geometry::new(0.0, 0.0, 30.0, 30.0), shape()).expect("b");
    let order = paint_order(&side, None, None);
    assert_eq!(order.last().map(|e| e.id()), Some(q));
}
