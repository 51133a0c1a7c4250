//! Raster images (uploads, QR codes, background assets) onto the face.

use canvas::element::{ColorFilter, ObjectFit};
use canvas::print::{Placement, fit_image};
use image::RgbaImage;
use image::imageops::crop_imm;
use tiny_skia::{ColorU8, FilterQuality, Pixmap, PixmapPaint, Transform};
use tracing::warn;

use super::px;

/// Copy an RGBA image into a premultiplied pixmap, applying `filter` to the
/// color channels first.
#[must_use]
pub fn rgba_to_pixmap(img: &RgbaImage, filter: Option<ColorFilter>) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(img.width(), img.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(img.pixels()) {
        let [r, g, b, a] = src.0;
        let [r, g, b] = match filter {
            Some(f) => f.apply([r, g, b]),
            None => [r, g, b],
        };
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

/// Draw `img` into the element box described by `p`, honoring `fit`.
///
/// `transform` maps the element's local frame (origin at its top-left) to
/// output pixels; see [`super::placement_transform`].
pub fn draw(
    pixmap: &mut Pixmap,
    img: &RgbaImage,
    fit: ObjectFit,
    filter: Option<ColorFilter>,
    p: &Placement,
    transform: Transform,
) {
    let rects = fit_image(fit, f64::from(img.width()), f64::from(img.height()), p.width, p.height);
    let (x, y, w, h) = crop_bounds(rects.src, img.width(), img.height());
    let cropped = crop_imm(img, x, y, w, h).to_image();
    let Some(src) = rgba_to_pixmap(&cropped, filter) else {
        warn!(width = w, height = h, "image too small to draw");
        return;
    };
    let placed = transform
        .pre_translate(px(rects.dst.x), px(rects.dst.y))
        .pre_scale(px(rects.dst.width / f64::from(w)), px(rects.dst.height / f64::from(h)));
    let paint = PixmapPaint { quality: FilterQuality::Bilinear, ..PixmapPaint::default() };
    pixmap.draw_pixmap(0, 0, src.as_ref(), &paint, placed, None);
}

/// Integer crop box inside a `width`×`height` image, at least one pixel.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn crop_bounds(src: canvas::print::Rect, width: u32, height: u32) -> (u32, u32, u32, u32) {
    let x = (src.x.floor().max(0.0) as u32).min(width.saturating_sub(1));
    let y = (src.y.floor().max(0.0) as u32).min(height.saturating_sub(1));
    let w = (src.width.round().max(1.0) as u32).min(width - x).max(1);
    let h = (src.height.round().max(1.0) as u32).min(height - y).max(1);
    (x, y, w, h)
}
