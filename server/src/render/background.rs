//! Card backgrounds: the material/template asset, or a generated fallback.

use canvas::print::{Backdrop, Fallback, WOOD_BASE, WOOD_STRIPE, wood_stripes};
use tiny_skia::{
    Color, FilterQuality, GradientStop, LinearGradient, Paint, Pixmap, PixmapPaint, Point, Rect, SpreadMode, Transform,
};
use tracing::debug;

use super::assets::AssetStore;
use super::{bitmap, color_or_black, px};

/// Fill the whole face. The asset wins when it loads; otherwise the
/// fallback is generated.
pub fn paint(pixmap: &mut Pixmap, backdrop: &Backdrop, assets: &AssetStore) {
    if let Some(name) = &backdrop.asset
        && let Some(img) = assets.load_background(name)
        && let Some(src) = bitmap::rgba_to_pixmap(&img, None)
    {
        #[allow(clippy::cast_precision_loss)]
        let transform = Transform::from_scale(
            pixmap.width() as f32 / src.width() as f32,
            pixmap.height() as f32 / src.height() as f32,
        );
        let paint = PixmapPaint { quality: FilterQuality::Bilinear, ..PixmapPaint::default() };
        pixmap.fill(Color::WHITE);
        pixmap.draw_pixmap(0, 0, src.as_ref(), &paint, transform, None);
        return;
    }
    debug!(asset = ?backdrop.asset, fallback = ?backdrop.fallback, "painting fallback background");
    paint_fallback(pixmap, backdrop.fallback);
}

fn paint_fallback(pixmap: &mut Pixmap, fallback: Fallback) {
    match fallback {
        Fallback::Solid(color) => pixmap.fill(color_or_black(color)),
        Fallback::WoodGrain => paint_wood(pixmap),
        Fallback::Gradient(from, to) => paint_gradient(pixmap, from, to),
    }
}

fn paint_wood(pixmap: &mut Pixmap) {
    pixmap.fill(color_or_black(WOOD_BASE));
    #[allow(clippy::cast_precision_loss)]
    let width = pixmap.width() as f32;
    let stripe = color_or_black(WOOD_STRIPE);
    for s in wood_stripes(f64::from(pixmap.height())) {
        let mut color = stripe;
        color.apply_opacity(px(s.alpha));
        let mut paint = Paint::default();
        paint.set_color(color);
        paint.anti_alias = true;
        if let Some(rect) = Rect::from_xywh(0.0, px(s.y - s.thickness / 2.0), width, px(s.thickness)) {
            pixmap.fill_rect(rect, &paint, Transform::identity(), None);
        }
    }
}

fn paint_gradient(pixmap: &mut Pixmap, from: &str, to: &str) {
    #[allow(clippy::cast_precision_loss)]
    let (w, h) = (pixmap.width() as f32, pixmap.height() as f32);
    let shader = LinearGradient::new(
        Point::from_xy(0.0, 0.0),
        Point::from_xy(w, h),
        vec![GradientStop::new(0.0, color_or_black(from)), GradientStop::new(1.0, color_or_black(to))],
        SpreadMode::Pad,
        Transform::identity(),
    );
    let Some(shader) = shader else {
        pixmap.fill(color_or_black(from));
        return;
    };
    let paint = Paint { shader, anti_alias: true, ..Paint::default() };
    if let Some(rect) = Rect::from_xywh(0.0, 0.0, w, h) {
        pixmap.fill_rect(rect, &paint, Transform::identity(), None);
    }
}
