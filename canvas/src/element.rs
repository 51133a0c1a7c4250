//! Element model: placed objects, their styles, and their serialized form.
//!
//! An [`Element`] is the canonical in-memory representation of something
//! placed on one side of the card. Its variant-specific style lives in the
//! tagged union [`ElementStyle`], matched exhaustively wherever behaviour
//! differs by type.
//!
//! Every element carries a cached [`SerializedElement`], refreshed by each
//! mutator before it returns. That projection is the only form that leaves
//! the element: history snapshots and the submission payload both store it,
//! and [`Element::from_serializable`] rebuilds an identical element from it.

#[cfg(test)]
#[path = "element_test.rs"]
mod element_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::design::{Material, Side};
use crate::geometry::Geometry;

/// Unique identifier for an element.
pub type ElementId = Uuid;

/// Text tone substituted on wood cards (engraved look).
pub const WOOD_TONE: &str = "#4A2C17";

/// Text tone substituted on metal cards.
pub const METAL_TONE: &str = "#2B2B2B";

/// The four element variants, without their style payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Image,
    Text,
    Shape,
    #[serde(rename = "qrcode")]
    QrCode,
}

impl ElementKind {
    /// Display name used in user-facing messages.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Text => "text",
            Self::Shape => "shape",
            Self::QrCode => "QR code",
        }
    }
}

/// How an image fills its element box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectFit {
    /// Scale to fit inside the box, preserving aspect ratio.
    #[default]
    Contain,
    /// Scale to cover the box, cropping the overflow.
    Cover,
    /// Stretch to the box.
    Fill,
}

impl ObjectFit {
    #[must_use]
    pub fn as_css(self) -> &'static str {
        match self {
            Self::Contain => "contain",
            Self::Cover => "cover",
            Self::Fill => "fill",
        }
    }
}

/// Deterministic colour treatment applied to images on restricted materials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorFilter {
    /// Sepia tone for wood.
    WoodSepia,
    /// Grayscale with raised contrast for metal.
    MetalMono,
}

impl ColorFilter {
    /// CSS `filter` value used by the live preview.
    #[must_use]
    pub fn css(self) -> &'static str {
        match self {
            Self::WoodSepia => "sepia(100%)",
            Self::MetalMono => "grayscale(100%) contrast(120%)",
        }
    }

    /// Apply the filter to one RGB pixel. Matches the CSS definitions above.
    #[must_use]
    pub fn apply(self, [r, g, b]: [u8; 3]) -> [u8; 3] {
        let (r, g, b) = (f64::from(r), f64::from(g), f64::from(b));
        match self {
            Self::WoodSepia => [
                channel(0.393 * r + 0.769 * g + 0.189 * b),
                channel(0.349 * r + 0.686 * g + 0.168 * b),
                channel(0.272 * r + 0.534 * g + 0.131 * b),
            ],
            Self::MetalMono => {
                let luma = 0.2126 * r + 0.7152 * g + 0.0722 * b;
                let v = channel((luma - 128.0).mul_add(1.2, 128.0));
                [v, v, v]
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn channel(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Style of an uploaded image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStyle {
    /// Data URL of the image bytes, or an asset path.
    pub source_ref: String,
    #[serde(default)]
    pub object_fit: ObjectFit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_filter: Option<ColorFilter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    #[must_use]
    pub fn as_css(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

/// Style of a text element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    pub content: String,
    pub font_family: String,
    pub font_size_px: f64,
    pub color: String,
    #[serde(default)]
    pub weight: FontWeight,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub align: TextAlign,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            content: "Text".into(),
            font_family: "Arial".into(),
            font_size_px: 24.0,
            color: "#000000".into(),
            weight: FontWeight::Normal,
            italic: false,
            underline: false,
            align: TextAlign::Left,
        }
    }
}

impl TextStyle {
    /// CSS font shorthand: `"<style> <weight> <size>px <family>"`.
    #[must_use]
    pub fn font_string_at(&self, size_px: f64) -> String {
        let style = if self.italic { "italic" } else { "normal" };
        let weight = match self.weight {
            FontWeight::Normal => "normal",
            FontWeight::Bold => "bold",
        };
        format!("{style} {weight} {size_px}px {}", self.font_family)
    }

    /// Font shorthand at the editor font size.
    #[must_use]
    pub fn font_string(&self) -> String {
        self.font_string_at(self.font_size_px)
    }

    /// Lines of the content, split on explicit newlines only.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.content.split('\n')
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    #[default]
    Rectangle,
    Circle,
}

/// Outline of a shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    pub color: String,
    pub width: f64,
}

/// Style of a shape element. Fill and stroke are toggled independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeStyle {
    pub kind: ShapeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<StrokeStyle>,
}

impl ShapeStyle {
    #[must_use]
    pub fn new(kind: ShapeKind) -> Self {
        Self { kind, fill: Some("#4A90D9".into()), stroke: None }
    }
}

/// Style of a QR code. Geometry defaults are fixed; see [`crate::design::default_qr_geometry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrStyle {
    /// Path relative to the QR asset location.
    pub source_ref: String,
}

/// Variant-specific style. The `type` tag doubles as the element type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElementStyle {
    Image(ImageStyle),
    Text(TextStyle),
    Shape(ShapeStyle),
    #[serde(rename = "qrcode")]
    QrCode(QrStyle),
}

impl ElementStyle {
    #[must_use]
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Image(_) => ElementKind::Image,
            Self::Text(_) => ElementKind::Text,
            Self::Shape(_) => ElementKind::Shape,
            Self::QrCode(_) => ElementKind::QrCode,
        }
    }
}

/// DOM-independent snapshot of an element; the wire and history format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedElement {
    pub id: ElementId,
    pub geometry: Geometry,
    /// Explicit stacking priority. Absent in hand-written payloads; the
    /// print pipeline then falls back to the type default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i64>,
    pub style: ElementStyle,
}

impl SerializedElement {
    #[must_use]
    pub fn kind(&self) -> ElementKind {
        self.style.kind()
    }
}

/// Rejection from [`Element::from_serializable`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ElementError {
    #[error("element {id}: {field} is not a finite number")]
    NonFinite { id: ElementId, field: &'static str },
    #[error("element {id}: size must be positive")]
    NonPositiveSize { id: ElementId },
}

/// A placed element on one side of the card.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    id: ElementId,
    geometry: Geometry,
    style: ElementStyle,
    z_index: i64,
    serialized: SerializedElement,
}

impl Element {
    /// Build an element with a fresh id.
    #[must_use]
    pub fn create(geometry: Geometry, style: ElementStyle, z_index: i64) -> Self {
        Self::with_id(Uuid::new_v4(), geometry, style, z_index)
    }

    #[must_use]
    pub fn with_id(id: ElementId, geometry: Geometry, style: ElementStyle, z_index: i64) -> Self {
        let serialized = SerializedElement { id, geometry, z_index: Some(z_index), style: style.clone() };
        Self { id, geometry, style, z_index, serialized }
    }

    #[must_use]
    pub fn id(&self) -> ElementId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> ElementKind {
        self.style.kind()
    }

    #[must_use]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    #[must_use]
    pub fn style(&self) -> &ElementStyle {
        &self.style
    }

    #[must_use]
    pub fn z_index(&self) -> i64 {
        self.z_index
    }

    #[must_use]
    pub fn is_qr(&self) -> bool {
        matches!(self.style, ElementStyle::QrCode(_))
    }

    /// The cached serializable projection.
    #[must_use]
    pub fn serializable(&self) -> &SerializedElement {
        &self.serialized
    }

    /// Owned copy of the serializable projection.
    #[must_use]
    pub fn to_serializable(&self) -> SerializedElement {
        self.serialized.clone()
    }

    /// Rebuild an element from its serialized form.
    ///
    /// # Errors
    ///
    /// Returns [`ElementError`] if a geometry field is not finite or a
    /// dimension is not positive. Values produced by
    /// [`Element::to_serializable`] always pass.
    pub fn from_serializable(data: &SerializedElement) -> Result<Self, ElementError> {
        let g = &data.geometry;
        for (field, v) in [("x", g.x), ("y", g.y), ("width", g.width), ("height", g.height), ("rotation", g.rotation)] {
            if !v.is_finite() {
                return Err(ElementError::NonFinite { id: data.id, field });
            }
        }
        if g.width <= 0.0 || g.height <= 0.0 {
            return Err(ElementError::NonPositiveSize { id: data.id });
        }
        let z = data.z_index.unwrap_or_else(|| default_z_index(data.kind()));
        Ok(Self::with_id(data.id, data.geometry, data.style.clone(), z))
    }

    /// Replace the geometry. Clamping is the geometry engine's job.
    pub fn update_geometry(&mut self, geometry: Geometry) {
        self.geometry = geometry;
        self.refresh();
    }

    /// Replace the style. The element type never changes.
    ///
    /// Returns `false` (and changes nothing) on a type mismatch.
    pub fn replace_style(&mut self, style: ElementStyle) -> bool {
        if style.kind() != self.kind() {
            return false;
        }
        self.style = style;
        self.refresh();
        true
    }

    pub fn set_z_index(&mut self, z_index: i64) {
        self.z_index = z_index;
        self.refresh();
    }

    /// Apply material-driven style overrides.
    ///
    /// Text (and shape paint) on wood/metal takes the material tone. Images on
    /// wood get a sepia filter, on metal a monochrome filter, except on the
    /// back of a metal card, which is plain plastic. PVC clears image filters.
    /// QR codes are never altered.
    pub fn apply_material_constraints(&mut self, material: Material, side: Side) {
        let tone = match material {
            Material::Wood => Some(WOOD_TONE),
            Material::Metal => Some(METAL_TONE),
            Material::Pvc => None,
        };
        match &mut self.style {
            ElementStyle::Text(text) => {
                if let Some(tone) = tone {
                    tone.clone_into(&mut text.color);
                }
            }
            ElementStyle::Shape(shape) => {
                if let Some(tone) = tone {
                    if shape.fill.is_some() {
                        shape.fill = Some(tone.to_owned());
                    }
                    if let Some(stroke) = shape.stroke.as_mut() {
                        tone.clone_into(&mut stroke.color);
                    }
                }
            }
            ElementStyle::Image(image) => {
                image.color_filter = match (material, side) {
                    (Material::Wood, _) => Some(ColorFilter::WoodSepia),
                    (Material::Metal, Side::Front) => Some(ColorFilter::MetalMono),
                    (Material::Metal, Side::Back) | (Material::Pvc, _) => None,
                };
            }
            ElementStyle::QrCode(_) => {}
        }
        self.refresh();
    }

    fn refresh(&mut self) {
        self.serialized = SerializedElement {
            id: self.id,
            geometry: self.geometry,
            z_index: Some(self.z_index),
            style: self.style.clone(),
        };
    }
}

/// Stacking priority used when an element carries no explicit z-index.
#[must_use]
pub fn default_z_index(kind: ElementKind) -> i64 {
    match kind {
        ElementKind::QrCode => crate::consts::QR_Z_INDEX,
        ElementKind::Image | ElementKind::Text | ElementKind::Shape => 0,
    }
}
