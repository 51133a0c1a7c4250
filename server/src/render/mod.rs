//! 300 DPI card composition.
//!
//! DESIGN
//! ======
//! Each face is rebuilt from its serialized elements: background first, then
//! elements in [`canvas::print::render_order`]. Geometry goes through the
//! same [`canvas::print::ScaleTransform`] the editor preview uses, so the
//! print matches what the customer saw.
//!
//! ERROR HANDLING
//! ==============
//! Resource problems (missing background, unreadable QR file, no font) are
//! logged and drawn around with a fallback. Only failures that leave no image
//! at all (canvas allocation, PNG encoding) surface as [`RenderError`].

pub mod assets;
pub mod background;
pub mod bitmap;
pub mod shape;
pub mod text;

use canvas::design::{Design, Side};
use canvas::element::{ElementStyle, SerializedElement};
use canvas::print::{Placement, PrintSpec, ScaleTransform, render_order};
use tiny_skia::{Color, Pixmap, Transform};
use tracing::{debug, warn};

use crate::config::ServerConfig;
use assets::AssetStore;
use text::FontBook;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("cannot allocate a {width}x{height} canvas")]
    Canvas { width: u32, height: u32 },
    #[error("PNG encoding failed: {0}")]
    Encode(String),
}

/// Composes card faces at print resolution.
pub struct Compositor {
    spec: PrintSpec,
    assets: AssetStore,
    fonts: FontBook,
}

impl Compositor {
    #[must_use]
    pub fn new(spec: PrintSpec, assets: AssetStore, fonts: FontBook) -> Self {
        Self { spec, assets, fonts }
    }

    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            PrintSpec::card(config.print_dpi),
            AssetStore::new(config.asset_dir.clone(), config.qr_asset_dir.clone()),
            FontBook::new(config.font_dir.clone()),
        )
    }

    #[must_use]
    pub fn spec(&self) -> PrintSpec {
        self.spec
    }

    /// Draw one face.
    ///
    /// # Errors
    ///
    /// Fails only when the output canvas cannot be allocated.
    pub fn compose(&self, design: &Design, side: Side) -> Result<Pixmap, RenderError> {
        let (width, height) = self.spec.pixel_size();
        let mut pixmap = Pixmap::new(width, height).ok_or(RenderError::Canvas { width, height })?;
        let scale = self.spec.scale();

        background::paint(&mut pixmap, &canvas::print::backdrop(&design.mode, side), &self.assets);

        let elements = design.side(side).to_serializable();
        for el in render_order(&elements) {
            self.draw_element(&mut pixmap, el, &scale);
        }
        debug!(?side, count = elements.len(), width, height, "face composed");
        Ok(pixmap)
    }

    /// Draw one face and encode it as PNG.
    ///
    /// # Errors
    ///
    /// See [`Compositor::compose`]; also fails if encoding fails.
    pub fn render_png(&self, design: &Design, side: Side) -> Result<Vec<u8>, RenderError> {
        self.compose(design, side)?.encode_png().map_err(|e| RenderError::Encode(e.to_string()))
    }

    fn draw_element(&self, pixmap: &mut Pixmap, el: &SerializedElement, scale: &ScaleTransform) {
        let p = scale.place(&el.geometry);
        let transform = placement_transform(&p);
        match &el.style {
            ElementStyle::Text(style) => text::draw(pixmap, &self.fonts, style, &p, scale, transform),
            ElementStyle::Shape(style) => shape::draw(pixmap, style, &p, scale, transform),
            ElementStyle::Image(style) => match self.assets.load_embedded(&style.source_ref) {
                Some(img) => bitmap::draw(pixmap, &img, style.object_fit, style.color_filter, &p, transform),
                None => warn!(id = %el.id, "image source is not an embedded data URI; skipped"),
            },
            ElementStyle::QrCode(qr) => match self.assets.load_qr(&qr.source_ref) {
                Some(img) => bitmap::draw(pixmap, &img, canvas::element::ObjectFit::Fill, None, &p, transform),
                None => {
                    warn!(id = %el.id, source = %qr.source_ref, "QR image unavailable; drawing placeholder");
                    shape::draw_qr_placeholder(pixmap, &self.fonts, &p, transform);
                }
            },
        }
    }
}

/// Translate to the element center, rotate, then back by half the extent so
/// the element draws at local `(0, 0)`..`(width, height)`.
#[must_use]
pub fn placement_transform(p: &Placement) -> Transform {
    let c = p.center();
    Transform::from_translate(px(c.x), px(c.y))
        .pre_rotate(px(p.rotation_deg))
        .pre_translate(px(-p.width / 2.0), px(-p.height / 2.0))
}

/// Output coordinate as tiny-skia's `f32`.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn px(v: f64) -> f32 {
    v as f32
}

/// Parse `#RGB`, `#RRGGBB`, or `#RRGGBBAA`, plus a few keywords.
#[must_use]
pub fn parse_color(raw: &str) -> Option<Color> {
    let s = raw.trim();
    match s.to_ascii_lowercase().as_str() {
        "black" => return Some(Color::BLACK),
        "white" => return Some(Color::WHITE),
        "transparent" => return Some(Color::TRANSPARENT),
        _ => {}
    }
    let hex = s.strip_prefix('#')?;
    let nibble = |i: usize| u8::from_str_radix(hex.get(i..=i)?, 16).ok();
    let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    match hex.len() {
        3 => Some(Color::from_rgba8(nibble(0)? * 17, nibble(1)? * 17, nibble(2)? * 17, 255)),
        6 => Some(Color::from_rgba8(byte(0)?, byte(2)?, byte(4)?, 255)),
        8 => Some(Color::from_rgba8(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}

/// [`parse_color`] with a logged fallback to black.
pub(crate) fn color_or_black(raw: &str) -> Color {
    parse_color(raw).unwrap_or_else(|| {
        warn!(color = raw, "unparsable color; using black");
        Color::BLACK
    })
}


#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
