//! Card-level state: sides, material/template mode, and the submission payload.
//!
//! A [`Design`] owns two [`CardSide`] arenas and one [`ModeState`]. Elements
//! are looked up by [`ElementId`]; nothing outside a side holds an element by
//! reference.

#[cfg(test)]
#[path = "design_test.rs"]
mod design_test;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::consts::{IMAGE_FIT_HEIGHT, IMAGE_FIT_WIDTH, MIN_ELEMENT_SIZE, QR_MARGIN, QR_SIZE, QR_Z_INDEX};
use crate::element::{Element, ElementError, ElementId, ElementKind, ElementStyle, SerializedElement};
use crate::engine::EditError;
use crate::geometry::Geometry;
use crate::viewport::Bounds;

// =============================================================
// Mode enums
// =============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Front,
    Back,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Front, Side::Back];

    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::Front => Self::Back,
            Self::Back => Self::Front,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Back => "back",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Material {
    #[default]
    Pvc,
    Wood,
    Metal,
}

impl Material {
    /// Wood and metal print monochrome and lock the back side.
    #[must_use]
    pub fn is_restricted(self) -> bool {
        matches!(self, Self::Wood | Self::Metal)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pvc => "pvc",
            Self::Wood => "wood",
            Self::Metal => "metal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    #[default]
    Blank,
    Blue,
    Pink,
}

impl Template {
    /// Blue and pink ship fixed artwork on both sides.
    #[must_use]
    pub fn is_semi_custom(self) -> bool {
        matches!(self, Self::Blue | Self::Pink)
    }

    /// Stem used by the background asset naming convention.
    #[must_use]
    pub fn asset_stem(self) -> Option<&'static str> {
        match self {
            Self::Blank => None,
            Self::Blue => Some("Blue"),
            Self::Pink => Some("Pink"),
        }
    }
}

// =============================================================
// ModeState
// =============================================================

/// Material/template mode plus the derived restriction predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModeState {
    material: Material,
    template: Template,
    semi_custom: bool,
}

impl ModeState {
    #[must_use]
    pub fn new(material: Material, template: Template) -> Self {
        let mut mode = Self::default();
        mode.select_template(template);
        mode.select_material(material);
        mode
    }

    #[must_use]
    pub fn material(&self) -> Material {
        self.material
    }

    #[must_use]
    pub fn template(&self) -> Template {
        self.template
    }

    #[must_use]
    pub fn is_semi_custom(&self) -> bool {
        self.semi_custom
    }

    /// Select a material. Wood and metal force the blank template.
    pub fn select_material(&mut self, material: Material) {
        self.material = material;
        if material.is_restricted() {
            self.select_template(Template::Blank);
        }
    }

    /// Select a template. Never touches the material.
    pub fn select_template(&mut self, template: Template) {
        self.template = template;
        self.semi_custom = template.is_semi_custom();
    }

    /// Whether editing is locked on `side`.
    #[must_use]
    pub fn restricted(&self, side: Side) -> bool {
        (self.semi_custom && side == Side::Back)
            || (self.material == Material::Metal && side == Side::Back)
            || (self.material == Material::Wood && side == Side::Back)
    }

    /// QR controls exist only on blank PVC cards.
    #[must_use]
    pub fn qr_allowed(&self) -> bool {
        self.material == Material::Pvc && self.template == Template::Blank
    }

    /// Whether a new element of `kind` may be created on `side`.
    ///
    /// # Errors
    ///
    /// The [`EditError`] names the rule that blocks creation.
    pub fn check_create(&self, side: Side, kind: ElementKind) -> Result<(), EditError> {
        if self.restricted(side) {
            return Err(EditError::SideLocked { side });
        }
        if self.semi_custom && !matches!(kind, ElementKind::Text | ElementKind::Image) {
            return Err(EditError::ElementRestricted { kind });
        }
        if kind == ElementKind::QrCode && !self.qr_allowed() {
            return Err(EditError::QrUnavailable);
        }
        Ok(())
    }
}

// =============================================================
// CardSide
// =============================================================

/// Elements on one face of the card, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardSide {
    elements: Vec<Element>,
}

impl CardSide {
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.elements.iter_mut()
    }

    #[must_use]
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id() == id)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.id() == id)
    }

    #[must_use]
    pub fn contains(&self, id: ElementId) -> bool {
        self.get(id).is_some()
    }

    pub fn remove(&mut self, id: ElementId) -> Option<Element> {
        let idx = self.elements.iter().position(|e| e.id() == id)?;
        Some(self.elements.remove(idx))
    }

    /// Keep only the elements for which `keep` returns true.
    pub fn retain(&mut self, keep: impl FnMut(&Element) -> bool) {
        self.elements.retain(keep);
    }

    #[must_use]
    pub fn qr_count(&self) -> usize {
        self.elements.iter().filter(|e| e.is_qr()).count()
    }

    /// Next stacking priority for an ordinary element: one above the highest
    /// non-QR element. QR codes sit on their own sentinel and do not count.
    #[must_use]
    pub fn next_z_index(&self) -> i64 {
        self.elements.iter().filter(|e| !e.is_qr()).map(Element::z_index).max().map_or(1, |z| z + 1)
    }

    /// Create an element and append it. Returns its id.
    ///
    /// QR codes get the fixed sentinel z-index; everything else stacks on top.
    ///
    /// # Errors
    ///
    /// [`EditError::SecondQr`] if this side already has a QR code.
    pub fn create(&mut self, geometry: Geometry, style: ElementStyle) -> Result<ElementId, EditError> {
        let z = match style.kind() {
            ElementKind::QrCode => {
                if self.qr_count() > 0 {
                    return Err(EditError::SecondQr);
                }
                QR_Z_INDEX
            }
            ElementKind::Image | ElementKind::Text | ElementKind::Shape => self.next_z_index(),
        };
        let element = Element::create(geometry, style, z);
        let id = element.id();
        self.elements.push(element);
        Ok(id)
    }

    /// Append an already-built element (restore path).
    pub fn push(&mut self, element: Element) {
        self.elements.push(element);
    }

    #[must_use]
    pub fn to_serializable(&self) -> Vec<SerializedElement> {
        self.elements.iter().map(Element::to_serializable).collect()
    }

    /// Rebuild a side from serialized elements.
    ///
    /// # Errors
    ///
    /// Fails on the first element that does not rebuild.
    pub fn from_serializable(data: &[SerializedElement]) -> Result<Self, ElementError> {
        let elements = data.iter().map(Element::from_serializable).collect::<Result<_, _>>()?;
        Ok(Self { elements })
    }
}

// =============================================================
// Default placement
// =============================================================

/// A `width`×`height` box centered in `bounds`.
#[must_use]
pub fn centered_geometry(bounds: &Bounds, width: f64, height: f64) -> Geometry {
    let cx = f64::midpoint(bounds.left, bounds.right);
    let cy = f64::midpoint(bounds.top, bounds.bottom);
    Geometry::new(cx - width / 2.0, cy - height / 2.0, width, height)
}

/// Scale a natural image size to fit the default image box, keeping its
/// aspect ratio. Degenerate sizes fall back to the full box.
#[must_use]
pub fn fit_image_size(natural_width: f64, natural_height: f64) -> (f64, f64) {
    if natural_width <= 0.0 || natural_height <= 0.0 || !natural_width.is_finite() || !natural_height.is_finite() {
        return (IMAGE_FIT_WIDTH, IMAGE_FIT_HEIGHT);
    }
    let scale = (IMAGE_FIT_WIDTH / natural_width).min(IMAGE_FIT_HEIGHT / natural_height);
    (natural_width * scale, natural_height * scale)
}

/// Default QR placement: bottom-right of the content box, inset by a margin.
#[must_use]
pub fn default_qr_geometry(bounds: &Bounds) -> Geometry {
    let x = (bounds.right - QR_SIZE - QR_MARGIN).max(bounds.left);
    let y = (bounds.bottom - QR_SIZE - QR_MARGIN).max(bounds.top);
    Geometry::new(x, y, QR_SIZE, QR_SIZE)
}

// =============================================================
// Design
// =============================================================

/// Counts from [`Design::repair_invariants`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElementRepairs {
    pub undersized: usize,
    pub extra_qr: usize,
}

/// The root aggregate edited by the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Design {
    pub mode: ModeState,
    front: CardSide,
    back: CardSide,
}

impl Design {
    #[must_use]
    pub fn side(&self, side: Side) -> &CardSide {
        match side {
            Side::Front => &self.front,
            Side::Back => &self.back,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut CardSide {
        match side {
            Side::Front => &mut self.front,
            Side::Back => &mut self.back,
        }
    }

    /// Find the side holding `id`.
    #[must_use]
    pub fn locate(&self, id: ElementId) -> Option<Side> {
        Side::ALL.into_iter().find(|&s| self.side(s).contains(id))
    }

    /// Re-apply material overrides to every element on both sides.
    pub fn apply_material_constraints(&mut self) {
        let material = self.mode.material();
        for side in Side::ALL {
            for el in self.side_mut(side).iter_mut() {
                el.apply_material_constraints(material, side);
            }
        }
    }

    /// Grow undersized elements to the minimum and drop every QR code after
    /// the first on each side.
    pub fn repair_invariants(&mut self) -> ElementRepairs {
        let mut repairs = ElementRepairs::default();
        for s in Side::ALL {
            let card_side = self.side_mut(s);
            for el in card_side.iter_mut() {
                let g = *el.geometry();
                if !g.meets_minimum() {
                    warn!(id = %el.id(), width = g.width, height = g.height, "growing undersized element");
                    el.update_geometry(Geometry {
                        width: g.width.max(MIN_ELEMENT_SIZE),
                        height: g.height.max(MIN_ELEMENT_SIZE),
                        ..g
                    });
                    repairs.undersized += 1;
                }
            }
            if card_side.qr_count() > 1 {
                let mut seen = false;
                let before = card_side.len();
                card_side.retain(|e| {
                    if !e.is_qr() {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
                let removed = before - card_side.len();
                warn!(side = ?s, removed, "removing extra QR codes");
                repairs.extra_qr += removed;
            }
        }
        repairs
    }

    #[must_use]
    pub fn elements_data(&self) -> SideElements {
        SideElements { front: self.front.to_serializable(), back: self.back.to_serializable() }
    }

    /// Build the submission payload.
    #[must_use]
    pub fn to_data(&self, customer: CustomerInfo, submitted_at_ms: f64) -> DesignData {
        DesignData {
            material: self.mode.material(),
            template: self.mode.template(),
            elements: self.elements_data(),
            customer,
            submitted_at_ms,
        }
    }

    /// Rebuild a design from a payload. The semi-custom flag is re-derived
    /// from the template, and the material cascade is re-run.
    ///
    /// # Errors
    ///
    /// Returns the first element that fails to rebuild.
    pub fn from_data(data: &DesignData) -> Result<Self, ElementError> {
        Ok(Self {
            mode: ModeState::new(data.material, data.template),
            front: CardSide::from_serializable(&data.elements.front)?,
            back: CardSide::from_serializable(&data.elements.back)?,
        })
    }
}

// =============================================================
// Wire payload
// =============================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideElements {
    #[serde(default)]
    pub front: Vec<SerializedElement>,
    #[serde(default)]
    pub back: Vec<SerializedElement>,
}

impl SideElements {
    #[must_use]
    pub fn get(&self, side: Side) -> &[SerializedElement] {
        match side {
            Side::Front => &self.front,
            Side::Back => &self.back,
        }
    }
}

/// Contact details entered with the order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub notes: String,
}

impl CustomerInfo {
    /// First required field that is blank, if any.
    #[must_use]
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.name.trim().is_empty() {
            Some("name")
        } else if self.email.trim().is_empty() {
            Some("email")
        } else {
            None
        }
    }
}

/// The `designData` field of a submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignData {
    pub material: Material,
    pub template: Template,
    #[serde(default)]
    pub elements: SideElements,
    #[serde(default)]
    pub customer: CustomerInfo,
    /// Client clock at submission, milliseconds since the Unix epoch.
    #[serde(default)]
    pub submitted_at_ms: f64,
}
