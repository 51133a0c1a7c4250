#![allow(clippy::float_cmp)]

use uuid::Uuid;

use super::*;
use crate::design::{Material, ModeState, Side, Template};
use crate::element::{ElementStyle, QrStyle, ShapeKind, ShapeStyle};

fn close(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

fn serialized(style: ElementStyle, z: Option<i64>) -> SerializedElement {
    SerializedElement { id: Uuid::new_v4(), geometry: Geometry::new(0.0, 0.0, 50.0, 50.0), z_index: z, style }
}

fn shape() -> ElementStyle {
    ElementStyle::Shape(ShapeStyle::new(ShapeKind::Rectangle))
}

// =============================================================
// Pixel size and scale
// =============================================================

#[test]
fn standard_card_at_300_dpi() {
    assert_eq!(PrintSpec::card(300).pixel_size(), (1011, 638));
}

#[test]
fn scale_matches_output_over_editor() {
    let s = PrintSpec::card(300).scale();
    assert!(close(s.sx, 2.022, 1e-9));
    assert!(close(s.sy, 638.0 / 316.0, 1e-9));
}

#[test]
fn end_to_end_element_scaling() {
    let s = ScaleTransform::for_output(1011.0, 638.0);
    let p = s.place(&Geometry::new(50.0, 50.0, 150.0, 100.0));
    assert!(close(p.x, 101.0, 0.5), "x {}", p.x);
    assert!(close(p.y, 101.0, 0.5), "y {}", p.y);
    assert!(close(p.width, 303.0, 0.5), "w {}", p.width);
    assert!(close(p.height, 202.0, 0.5), "h {}", p.height);
}

#[test]
fn rotation_passes_through_unscaled() {
    let s = ScaleTransform::for_output(1011.0, 638.0);
    let mut g = Geometry::new(10.0, 10.0, 40.0, 20.0);
    g.rotation = 37.0;
    assert_eq!(s.place(&g).rotation_deg, 37.0);
}

#[test]
fn font_size_scales_vertically() {
    let s = ScaleTransform { sx: 3.0, sy: 2.0 };
    assert_eq!(s.font_size(10.0), 20.0);
    assert_eq!(s.stroke_width(2.0), 5.0);
}

// =============================================================
// Placement
// =============================================================

#[test]
fn unrotated_local_origin_is_top_left() {
    let p = Placement { x: 10.0, y: 20.0, width: 100.0, height: 50.0, rotation_deg: 0.0 };
    assert_eq!(p.local_to_output(Point::new(0.0, 0.0)), Point::new(10.0, 20.0));
    assert_eq!(p.center(), Point::new(60.0, 45.0));
}

#[test]
fn rotation_pivots_on_output_center() {
    let p = Placement { x: 0.0, y: 0.0, width: 100.0, height: 100.0, rotation_deg: 90.0 };
    let c = p.local_to_output(Point::new(50.0, 50.0));
    assert!(close(c.x, 50.0, 1e-9) && close(c.y, 50.0, 1e-9));
    let tl = p.local_to_output(Point::new(0.0, 0.0));
    assert!(close(tl.x, 100.0, 1e-9) && close(tl.y, 0.0, 1e-9));
}

// =============================================================
// Draw order
// =============================================================

#[test]
fn qr_draws_last_regardless_of_insertion() {
    let qr = serialized(ElementStyle::QrCode(QrStyle { source_ref: "q.png".into() }), Some(9999));
    let elements = vec![serialized(shape(), Some(5)), qr, serialized(shape(), Some(10))];
    let order: Vec<i64> = render_order(&elements).into_iter().map(draw_priority).collect();
    assert_eq!(order, vec![5, 10, 9999]);
}

#[test]
fn missing_z_uses_type_default() {
    let qr = serialized(ElementStyle::QrCode(QrStyle { source_ref: "q.png".into() }), None);
    let plain = serialized(shape(), None);
    assert_eq!(draw_priority(&qr), 9999);
    assert_eq!(draw_priority(&plain), 0);
}

#[test]
fn ties_keep_list_order() {
    let a = serialized(shape(), Some(3));
    let b = serialized(shape(), Some(3));
    let ids = [a.id, b.id];
    let elements = vec![a, b];
    let order: Vec<Uuid> = render_order(&elements).into_iter().map(|e| e.id).collect();
    assert_eq!(order, ids);
}

// =============================================================
// Text layout
// =============================================================

#[test]
fn lines_advance_by_line_height() {
    let style = TextStyle { content: "one\ntwo\nthree".into(), ..TextStyle::default() };
    let lines = layout_text(&style, 300.0, 20.0);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0].top, 0.0);
    assert!(close(lines[1].top, 24.0, 1e-9));
    assert!(close(lines[2].top, 48.0, 1e-9));
    assert_eq!(lines[2].text, "three");
}

#[test]
fn anchor_follows_alignment() {
    for (align, expect) in [(TextAlign::Left, 0.0), (TextAlign::Center, 150.0), (TextAlign::Right, 300.0)] {
        let style = TextStyle { align, ..TextStyle::default() };
        assert_eq!(layout_text(&style, 300.0, 20.0)[0].anchor_x, expect);
    }
}

// =============================================================
// Shapes and image fit
// =============================================================

#[test]
fn circle_is_inscribed() {
    assert_eq!(circle_radius(100.0, 40.0), 20.0);
}

#[test]
fn contain_letterboxes() {
    let r = fit_image(ObjectFit::Contain, 200.0, 100.0, 100.0, 100.0);
    assert_eq!(r.dst, Rect { x: 0.0, y: 25.0, width: 100.0, height: 50.0 });
    assert_eq!(r.src.width, 200.0);
}

#[test]
fn cover_crops_source() {
    let r = fit_image(ObjectFit::Cover, 200.0, 100.0, 100.0, 100.0);
    assert_eq!(r.src, Rect { x: 50.0, y: 0.0, width: 100.0, height: 100.0 });
    assert_eq!(r.dst.width, 100.0);
}

#[test]
fn fill_stretches() {
    let r = fit_image(ObjectFit::Fill, 200.0, 100.0, 30.0, 70.0);
    assert_eq!(r.dst, Rect { x: 0.0, y: 0.0, width: 30.0, height: 70.0 });
}

// =============================================================
// Backgrounds
// =============================================================

#[test]
fn blank_pvc_is_plain_white() {
    let mode = ModeState::default();
    assert_eq!(backdrop(&mode, Side::Front), Backdrop { asset: None, fallback: Fallback::Solid(PVC_FILL) });
}

#[test]
fn template_assets_follow_naming_convention() {
    let mode = ModeState::new(Material::Pvc, Template::Blue);
    assert_eq!(backdrop(&mode, Side::Front).asset.as_deref(), Some("Blue_front.jpg"));
    assert_eq!(backdrop(&mode, Side::Back).asset.as_deref(), Some("Blue_back_compressed.jpg"));
    let pink = ModeState::new(Material::Pvc, Template::Pink);
    assert!(matches!(backdrop(&pink, Side::Front).fallback, Fallback::Gradient(..)));
}

#[test]
fn metal_and_wood_assets() {
    let metal = ModeState::new(Material::Metal, Template::Blank);
    assert_eq!(backdrop(&metal, Side::Front).asset.as_deref(), Some("Metal.jpg"));
    assert_eq!(backdrop(&metal, Side::Back).asset.as_deref(), Some("Metal_back.jpg"));
    let wood = ModeState::new(Material::Wood, Template::Blank);
    assert_eq!(backdrop(&wood, Side::Back).fallback, Fallback::WoodGrain);
}

#[test]
fn wood_stripes_are_deterministic_and_inside() {
    let a = wood_stripes(638.0);
    assert_eq!(a, wood_stripes(638.0));
    assert_eq!(a.len(), 24);
    assert!(a.iter().all(|s| s.y > 0.0 && s.y < 638.0 && s.thickness >= 1.0));
}
