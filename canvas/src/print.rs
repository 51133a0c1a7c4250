//! Editor space → print space.
//!
//! The editor canvas has a fixed nominal size; the print raster is sized from
//! physical card dimensions and DPI. Everything here is shared by the live
//! preview and the server's 300 DPI compositor, so both place, stack, and lay
//! out elements with the same arithmetic.
//!
//! Placement order for a rotated element is: translate to the element center
//! in output pixels, rotate, then translate by the negative half extent. The
//! element is then drawn at local `(0, 0)`..`(width, height)`.

#[cfg(test)]
#[path = "print_test.rs"]
mod print_test;

use crate::consts::{EDITOR_HEIGHT, EDITOR_WIDTH, LINE_HEIGHT_FACTOR};
use crate::design::{Material, ModeState, Side, Template};
use crate::element::{ObjectFit, SerializedElement, TextAlign, TextStyle, default_z_index};
use crate::geometry::Geometry;
use crate::viewport::Point;

const MM_PER_INCH: f64 = 25.4;

/// Physical output size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrintSpec {
    pub dpi: u32,
    pub width_mm: f64,
    pub height_mm: f64,
}

impl PrintSpec {
    /// ISO/IEC 7810 ID-1 card width.
    pub const CARD_WIDTH_MM: f64 = 85.6;
    /// ISO/IEC 7810 ID-1 card height.
    pub const CARD_HEIGHT_MM: f64 = 53.98;

    /// A standard card at `dpi`.
    #[must_use]
    pub fn card(dpi: u32) -> Self {
        Self { dpi, width_mm: Self::CARD_WIDTH_MM, height_mm: Self::CARD_HEIGHT_MM }
    }

    /// Output size in whole pixels: `round(mm / 25.4 * dpi)` per axis.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn pixel_size(&self) -> (u32, u32) {
        let dpi = f64::from(self.dpi);
        let px = |mm: f64| (mm / MM_PER_INCH * dpi).round().max(1.0) as u32;
        (px(self.width_mm), px(self.height_mm))
    }

    #[must_use]
    pub fn scale(&self) -> ScaleTransform {
        let (w, h) = self.pixel_size();
        ScaleTransform::for_output(f64::from(w), f64::from(h))
    }
}

/// Independent X/Y scale from editor space to an output raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleTransform {
    pub sx: f64,
    pub sy: f64,
}

impl ScaleTransform {
    /// Identity: output space equals editor space.
    pub const IDENTITY: Self = Self { sx: 1.0, sy: 1.0 };

    #[must_use]
    pub fn for_output(width_px: f64, height_px: f64) -> Self {
        Self { sx: width_px / EDITOR_WIDTH, sy: height_px / EDITOR_HEIGHT }
    }

    /// Map an editor geometry into output pixels. Rotation passes through.
    #[must_use]
    pub fn place(&self, g: &Geometry) -> Placement {
        Placement {
            x: g.x * self.sx,
            y: g.y * self.sy,
            width: g.width * self.sx,
            height: g.height * self.sy,
            rotation_deg: g.rotation,
        }
    }

    /// Font size in output pixels. Text scales with the vertical factor.
    #[must_use]
    pub fn font_size(&self, editor_px: f64) -> f64 {
        editor_px * self.sy
    }

    /// Stroke width in output pixels.
    #[must_use]
    pub fn stroke_width(&self, editor_px: f64) -> f64 {
        editor_px * f64::midpoint(self.sx, self.sy)
    }
}

/// An element's box in output pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation_deg: f64,
}

impl Placement {
    /// Rotation pivot in output space.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Map a point in the element's local frame (`0..width`, `0..height`)
    /// into output space.
    #[must_use]
    pub fn local_to_output(&self, local: Point) -> Point {
        let c = self.center();
        let (sin, cos) = self.rotation_deg.to_radians().sin_cos();
        let lx = local.x - self.width / 2.0;
        let ly = local.y - self.height / 2.0;
        Point::new(c.x + lx * cos - ly * sin, c.y + lx * sin + ly * cos)
    }
}

/// Priority used to sort elements for drawing.
#[must_use]
pub fn draw_priority(element: &SerializedElement) -> i64 {
    element.z_index.unwrap_or_else(|| default_z_index(element.kind()))
}

/// Elements in draw order: ascending priority, ties in list order.
#[must_use]
pub fn render_order(elements: &[SerializedElement]) -> Vec<&SerializedElement> {
    let mut out: Vec<&SerializedElement> = elements.iter().collect();
    out.sort_by_key(|e| draw_priority(e));
    out
}

/// One laid-out line of text in the element's local output frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine<'a> {
    pub text: &'a str,
    /// Horizontal anchor; its meaning follows `align`.
    pub anchor_x: f64,
    /// Top of the line box.
    pub top: f64,
}

/// Text lines positioned for an element `width` wide (output pixels).
///
/// Lines split on `'\n'` only and advance by `font_size * 1.2`. The anchor is
/// `0`, `width / 2`, or `width` for left, center, and right alignment.
#[must_use]
pub fn layout_text<'a>(style: &'a TextStyle, width: f64, font_size: f64) -> Vec<TextLine<'a>> {
    let anchor_x = match style.align {
        TextAlign::Left => 0.0,
        TextAlign::Center => width / 2.0,
        TextAlign::Right => width,
    };
    let advance = font_size * LINE_HEIGHT_FACTOR;
    style
        .lines()
        .enumerate()
        .map(|(i, text)| {
            #[allow(clippy::cast_precision_loss)]
            let top = i as f64 * advance;
            TextLine { text, anchor_x, top }
        })
        .collect()
}

/// Radius of the circle inscribed in a `width`×`height` box.
#[must_use]
pub fn circle_radius(width: f64, height: f64) -> f64 {
    width.min(height) / 2.0
}

/// Axis-aligned rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Source crop and destination box for drawing an image into an element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitRects {
    /// Region of the source image to sample.
    pub src: Rect,
    /// Region of the element box (local frame) to fill.
    pub dst: Rect,
}

/// Resolve `fit` for a `src_w`×`src_h` image in a `box_w`×`box_h` box.
#[must_use]
pub fn fit_image(fit: ObjectFit, src_w: f64, src_h: f64, box_w: f64, box_h: f64) -> FitRects {
    let full_src = Rect { x: 0.0, y: 0.0, width: src_w, height: src_h };
    let full_dst = Rect { x: 0.0, y: 0.0, width: box_w, height: box_h };
    if src_w <= 0.0 || src_h <= 0.0 {
        return FitRects { src: full_src, dst: full_dst };
    }
    match fit {
        ObjectFit::Fill => FitRects { src: full_src, dst: full_dst },
        ObjectFit::Contain => {
            let scale = (box_w / src_w).min(box_h / src_h);
            let (w, h) = (src_w * scale, src_h * scale);
            FitRects { src: full_src, dst: Rect { x: (box_w - w) / 2.0, y: (box_h - h) / 2.0, width: w, height: h } }
        }
        ObjectFit::Cover => {
            let scale = (box_w / src_w).max(box_h / src_h);
            let (w, h) = (box_w / scale, box_h / scale);
            FitRects { src: Rect { x: (src_w - w) / 2.0, y: (src_h - h) / 2.0, width: w, height: h }, dst: full_dst }
        }
    }
}

// =============================================================
// Backgrounds
// =============================================================

/// Plain card stock.
pub const PVC_FILL: &str = "#FFFFFF";
/// Base tone of the generated wood grain.
pub const WOOD_BASE: &str = "#C8A165";
/// Stripe tone of the generated wood grain.
pub const WOOD_STRIPE: &str = "#8B5A2B";

/// What to paint when the background asset is missing or fails to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    Solid(&'static str),
    /// Horizontal striations over [`WOOD_BASE`]; see [`wood_stripes`].
    WoodGrain,
    /// Top-left to bottom-right linear gradient.
    Gradient(&'static str, &'static str),
}

/// Background for one face of the card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backdrop {
    /// Asset file name under the asset directory.
    pub asset: Option<String>,
    pub fallback: Fallback,
}

/// Resolve the background for `side` under the current mode.
///
/// Asset names follow a fixed convention: `{Template}_{side}.jpg` for the
/// front, `{Template}_{side}_compressed.jpg` for the back, and
/// `Metal.jpg` / `Metal_back.jpg` (likewise `Wood`) for restricted materials.
#[must_use]
pub fn backdrop(mode: &ModeState, side: Side) -> Backdrop {
    if let Some(stem) = mode.template().asset_stem() {
        let asset = match side {
            Side::Front => format!("{stem}_front.jpg"),
            Side::Back => format!("{stem}_back_compressed.jpg"),
        };
        let fallback = match mode.template() {
            Template::Pink => Fallback::Gradient("#F8BBD0", "#E91E63"),
            _ => Fallback::Gradient("#4A90D9", "#1E4E8C"),
        };
        return Backdrop { asset: Some(asset), fallback };
    }
    match mode.material() {
        Material::Pvc => Backdrop { asset: None, fallback: Fallback::Solid(PVC_FILL) },
        Material::Wood => Backdrop { asset: Some(material_asset("Wood", side)), fallback: Fallback::WoodGrain },
        Material::Metal => Backdrop {
            asset: Some(material_asset("Metal", side)),
            fallback: Fallback::Gradient("#D6D8DB", "#8E9196"),
        },
    }
}

fn material_asset(stem: &str, side: Side) -> String {
    match side {
        Side::Front => format!("{stem}.jpg"),
        Side::Back => format!("{stem}_back.jpg"),
    }
}

/// One wood-grain stripe: a horizontal band at `y` in output pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stripe {
    pub y: f64,
    pub thickness: f64,
    pub alpha: f64,
}

/// Deterministic stripe layout for a `height`-pixel face.
///
/// Bands repeat every `height / 24` with thickness cycling through one to
/// three units, so the preview and the print show the same grain.
#[must_use]
pub fn wood_stripes(height: f64) -> Vec<Stripe> {
    const BANDS: u32 = 24;
    let spacing = height / f64::from(BANDS);
    let unit = (height / EDITOR_HEIGHT).max(1.0);
    (0..BANDS)
        .map(|i| Stripe {
            y: f64::from(i) * spacing + spacing / 2.0,
            thickness: f64::from(i * 7 % 3 + 1) * unit,
            alpha: 0.15 + f64::from(i * 5 % 4) * 0.05,
        })
        .collect()
}
