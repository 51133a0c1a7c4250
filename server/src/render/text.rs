//! Text elements rasterized with TrueType fonts from the font directory.
//!
//! Fonts are looked up as `{Family}-{Regular|Bold|Italic|BoldItalic}.ttf`
//! with spaces removed from the family, then `{Family}-Regular.ttf`, then
//! `default.ttf`. Text whose font cannot be found is skipped with a warning.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use ab_glyph::{Font, FontArc, GlyphId, ScaleFont, point};
use canvas::element::{FontWeight, TextAlign, TextStyle};
use canvas::print::{Placement, ScaleTransform, layout_text};
use tiny_skia::{Color, ColorU8, Paint, Pixmap, PixmapPaint, Rect, Transform};
use tracing::{debug, warn};

use super::{color_or_black, px};

const DEFAULT_FONT_FILE: &str = "default.ttf";

/// Lazily loaded font faces keyed by file name.
pub struct FontBook {
    dir: PathBuf,
    cache: Mutex<HashMap<String, Option<FontArc>>>,
}

impl FontBook {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir, cache: Mutex::new(HashMap::new()) }
    }

    /// Best available face for `family` in the requested variant.
    #[must_use]
    pub fn face(&self, family: &str, bold: bool, italic: bool) -> Option<FontArc> {
        let stem: String = family.chars().filter(|c| !c.is_whitespace()).collect();
        let variant = match (bold, italic) {
            (false, false) => "Regular",
            (true, false) => "Bold",
            (false, true) => "Italic",
            (true, true) => "BoldItalic",
        };
        let candidates = [format!("{stem}-{variant}.ttf"), format!("{stem}-Regular.ttf"), DEFAULT_FONT_FILE.to_owned()];
        let found = candidates.iter().find_map(|file| self.load(file));
        if found.is_none() {
            warn!(family, dir = %self.dir.display(), "no usable font; text skipped");
        }
        found
    }

    fn load(&self, file: &str) -> Option<FontArc> {
        let mut cache = self.cache.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(cached) = cache.get(file) {
            return cached.clone();
        }
        let path = self.dir.join(file);
        let font = match std::fs::read(&path) {
            Ok(bytes) => match FontArc::try_from_vec(bytes) {
                Ok(font) => Some(font),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "invalid font file");
                    None
                }
            },
            Err(e) => {
                debug!(path = %path.display(), error = %e, "font file not readable");
                None
            }
        };
        cache.insert(file.to_owned(), font.clone());
        font
    }
}

/// One rasterized line: colored coverage plus the metrics needed to place it.
struct LineRaster {
    pixmap: Option<Pixmap>,
    width: f32,
    ascent: f32,
}

fn rasterize_line(font: &FontArc, size: f32, text: &str, color: Color) -> LineRaster {
    let scaled = font.as_scaled(size);
    let mut glyphs = Vec::new();
    let mut caret = 0.0f32;
    let mut prev: Option<GlyphId> = None;
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(p) = prev {
            caret += scaled.kern(p, id);
        }
        glyphs.push((id, caret));
        caret += scaled.h_advance(id);
        prev = Some(id);
    }
    let ascent = scaled.ascent();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (w, h) = (caret.ceil().max(1.0) as u32, (ascent - scaled.descent()).ceil().max(1.0) as u32);
    let Some(mut pixmap) = Pixmap::new(w, h) else {
        return LineRaster { pixmap: None, width: caret, ascent };
    };

    let (w_i, h_i) = (i64::from(w), i64::from(h));
    let mut coverage = vec![0.0f32; (w as usize) * (h as usize)];
    for (id, x) in glyphs {
        let Some(outlined) = font.outline_glyph(id.with_scale_and_position(size, point(x, ascent))) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        #[allow(clippy::cast_possible_truncation)]
        let (ox, oy) = (bounds.min.x as i64, bounds.min.y as i64);
        outlined.draw(|gx, gy, c| {
            let (x, y) = (i64::from(gx) + ox, i64::from(gy) + oy);
            if (0..w_i).contains(&x)
                && (0..h_i).contains(&y)
                && let Ok(idx) = usize::try_from(y * w_i + x)
            {
                coverage[idx] = (coverage[idx] + c).min(1.0);
            }
        });
    }

    let rgba = color.to_color_u8();
    for (dst, c) in pixmap.pixels_mut().iter_mut().zip(coverage) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let a = (f32::from(rgba.alpha()) * c).round() as u8;
        *dst = ColorU8::from_rgba(rgba.red(), rgba.green(), rgba.blue(), a).premultiply();
    }
    LineRaster { pixmap: Some(pixmap), width: caret, ascent }
}

/// Draw a text element. Lines are laid out exactly as in the editor preview.
pub fn draw(
    pixmap: &mut Pixmap,
    fonts: &FontBook,
    style: &TextStyle,
    p: &Placement,
    scale: &ScaleTransform,
    transform: Transform,
) {
    let Some(font) = fonts.face(&style.font_family, style.weight == FontWeight::Bold, style.italic) else {
        return;
    };
    let size = scale.font_size(style.font_size_px);
    let color = color_or_black(&style.color);
    for line in layout_text(style, p.width, size) {
        let raster = rasterize_line(&font, px(size), line.text, color);
        let left = match style.align {
            TextAlign::Left => px(line.anchor_x),
            TextAlign::Center => px(line.anchor_x) - raster.width / 2.0,
            TextAlign::Right => px(line.anchor_x) - raster.width,
        };
        let line_transform = transform.pre_translate(left, px(line.top));
        if let Some(glyphs) = &raster.pixmap {
            pixmap.draw_pixmap(0, 0, glyphs.as_ref(), &PixmapPaint::default(), line_transform, None);
        }
        if style.underline && raster.width > 0.0 {
            let thickness = (px(size) / 15.0).max(1.0);
            let mut paint = Paint::default();
            paint.set_color(color);
            paint.anti_alias = true;
            if let Some(rect) = Rect::from_xywh(0.0, raster.ascent + thickness, raster.width, thickness) {
                pixmap.fill_rect(rect, &paint, line_transform, None);
            }
        }
    }
}

/// Draw a single bold label centered on local `(cx, cy)`. Returns whether a
/// font was available.
pub fn draw_label(
    pixmap: &mut Pixmap,
    fonts: &FontBook,
    label: &str,
    size: f32,
    (cx, cy): (f32, f32),
    transform: Transform,
) -> bool {
    let Some(font) = fonts.face("Arial", true, false) else {
        return false;
    };
    let raster = rasterize_line(&font, size, label, Color::BLACK);
    if let Some(glyphs) = &raster.pixmap {
        #[allow(clippy::cast_precision_loss)]
        let (w, h) = (glyphs.width() as f32, glyphs.height() as f32);
        let placed = transform.pre_translate(cx - w / 2.0, cy - h / 2.0);
        pixmap.draw_pixmap(0, 0, glyphs.as_ref(), &PixmapPaint::default(), placed, None);
    }
    true
}

#[cfg(test)]
#[path = "text_test.rs"]
mod tests;
