//! Rectangles, circles, and the QR placeholder box.

use canvas::element::{ShapeKind, ShapeStyle};
use canvas::print::{Placement, ScaleTransform, circle_radius};
use tiny_skia::{Color, FillRule, Paint, Path, PathBuilder, Pixmap, Rect, Stroke, Transform};

use super::text::{self, FontBook};
use super::{color_or_black, px};

fn outline(kind: ShapeKind, width: f32, height: f32) -> Option<Path> {
    match kind {
        ShapeKind::Rectangle => Some(PathBuilder::from_rect(Rect::from_xywh(0.0, 0.0, width, height)?)),
        ShapeKind::Circle => {
            PathBuilder::from_circle(width / 2.0, height / 2.0, px(circle_radius(f64::from(width), f64::from(height))))
        }
    }
}

fn solid(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color);
    paint.anti_alias = true;
    paint
}

/// Fill, then stroke, in the element's local frame.
pub fn draw(pixmap: &mut Pixmap, style: &ShapeStyle, p: &Placement, scale: &ScaleTransform, transform: Transform) {
    let Some(path) = outline(style.kind, px(p.width), px(p.height)) else {
        return;
    };
    if let Some(fill) = &style.fill {
        pixmap.fill_path(&path, &solid(color_or_black(fill)), FillRule::Winding, transform, None);
    }
    if let Some(stroke) = &style.stroke
        && stroke.width > 0.0
    {
        let pen = Stroke { width: px(scale.stroke_width(stroke.width)), ..Stroke::default() };
        pixmap.stroke_path(&path, &solid(color_or_black(&stroke.color)), &pen, transform, None);
    }
}

/// White box with a black border and a "QR" label, for QR codes whose image
/// is unavailable.
pub fn draw_qr_placeholder(pixmap: &mut Pixmap, fonts: &FontBook, p: &Placement, transform: Transform) {
    let (w, h) = (px(p.width), px(p.height));
    let border = (w.min(h) * 0.02).max(2.0);
    let Some(rect) = Rect::from_xywh(0.0, 0.0, w, h) else {
        return;
    };
    pixmap.fill_rect(rect, &solid(Color::WHITE), transform, None);
    if let Some(inner) = Rect::from_xywh(border / 2.0, border / 2.0, w - border, h - border) {
        let path = PathBuilder::from_rect(inner);
        let pen = Stroke { width: border, ..Stroke::default() };
        pixmap.stroke_path(&path, &solid(Color::BLACK), &pen, transform, None);
    }
    text::draw_label(pixmap, fonts, "QR", (h * 0.3).max(8.0), (w / 2.0, h / 2.0), transform);
}
