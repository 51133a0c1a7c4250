use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info, warn};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

use crate::consts::{
    CLICK_MOVE_THRESHOLD_PX, MAX_UPLOAD_BYTES, MIN_ELEMENT_SIZE, ROTATE_HANDLE_BEARING_DEG, TEXT_EDIT_DEBOUNCE_MS,
};
use crate::design::{
    CustomerInfo, Design, DesignData, Material, Side, Template, centered_geometry, default_qr_geometry, fit_image_size,
};
use crate::element::{
    Element, ElementId, ElementKind, ElementStyle, ImageStyle, ObjectFit, QrStyle, ShapeKind, ShapeStyle, TextStyle,
};
use crate::geometry::{
    Geometry, clamp_to_content_box, compute_aspect_resize, compute_free_resize, compute_rotation_angle,
    normalize_degrees,
};
use crate::hit::{self, HitPart};
use crate::history::{HistoryEntry, HistoryError, HistoryManager};
use crate::input::{
    Button, DragFeedback, FlipState, InputState, Key, Modifiers, PendingTextEdit, PointerTarget, UiState,
};
use crate::jobs::{JobGate, JobTicket};
use crate::render;
use crate::viewport::{Point, Viewport};

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Default size of a new text element.
const TEXT_WIDTH: f64 = 150.0;
const TEXT_HEIGHT: f64 = 40.0;

/// Default edge length of a new shape.
const SHAPE_SIZE: f64 = 100.0;

/// Image types accepted for upload.
const ACCEPTED_MIME: [&str; 5] = ["image/png", "image/jpeg", "image/gif", "image/webp", "image/svg+xml"];

/// User-facing rejection of an editing action.
///
/// The message is meant to be shown as-is; the operation that produced it has
/// changed nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("the {} of this card can't be edited", side.as_str())]
    SideLocked { side: Side },
    #[error("{} elements aren't available with this template", kind.label())]
    ElementRestricted { kind: ElementKind },
    #[error("QR codes are only available on blank PVC cards")]
    QrUnavailable,
    #[error("only one QR code is allowed per side")]
    SecondQr,
    #[error("templates aren't available for wood or metal cards")]
    TemplateUnavailable,
    #[error("unsupported file type: {mime}")]
    UnsupportedUpload { mime: String },
    #[error("file is too large ({size} bytes, limit {limit})")]
    UploadTooLarge { size: usize, limit: usize },
    #[error("please fill in your {field}")]
    MissingField { field: &'static str },
    #[error("a submission is already in progress")]
    SubmissionInFlight,
    #[error("element not found: {0}")]
    UnknownElement(ElementId),
    #[error("element {0} has a different type")]
    WrongElementType(ElementId),
}

/// Check an upload before reading it.
///
/// # Errors
///
/// [`EditError::UnsupportedUpload`] for non-image types and
/// [`EditError::UploadTooLarge`] above the size limit.
pub fn validate_upload(mime: &str, size_bytes: usize) -> Result<(), EditError> {
    if !ACCEPTED_MIME.contains(&mime) {
        return Err(EditError::UnsupportedUpload { mime: mime.to_owned() });
    }
    if size_bytes > MAX_UPLOAD_BYTES {
        return Err(EditError::UploadTooLarge { size: size_bytes, limit: MAX_UPLOAD_BYTES });
    }
    Ok(())
}

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    RenderNeeded,
    SetCursor(String),
    SelectionChanged(Option<ElementId>),
    ElementCreated { id: ElementId, side: Side },
    ElementUpdated { id: ElementId },
    ElementDeleted { id: ElementId },
    /// Open the inline editor over a text element.
    OpenTextEditor { id: ElementId, content: String },
    CloseTextEditor,
    /// Show this message to the user.
    Rejected(EditError),
    /// A history step replaced the whole design.
    StateRestored,
    SideChanged(Side),
    /// The 3D preview angles changed; the host may animate between them.
    FlipChanged(FlipState),
    ControlsChanged(ControlState),
}

/// Which editing affordances are available right now.
///
/// A hint for the host UI; every operation re-checks its own rules.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlState {
    pub side_locked: bool,
    pub can_add_text: bool,
    pub can_add_image: bool,
    pub can_add_shape: bool,
    pub qr_visible: bool,
    pub can_add_qr: bool,
    pub can_remove_qr: bool,
    pub templates_enabled: bool,
    pub can_undo: bool,
    pub can_redo: bool,
    pub submitting: bool,
}

/// Counts of problems fixed by [`EngineCore::self_check`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Repairs {
    pub dangling_refs: usize,
    pub undersized: usize,
    pub extra_qr: usize,
    pub history_cursor: usize,
}

impl Repairs {
    #[must_use]
    pub fn total(&self) -> usize {
        self.dangling_refs + self.undersized + self.extra_qr + self.history_cursor
    }
}

/// UI state saved while a side is captured without flip or selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapturePlan {
    pub side: Side,
    flip: FlipState,
    selected: Option<ElementId>,
}

/// Core engine state: all logic that doesn't depend on the canvas element.
///
/// Separated from `Engine` so it can be tested without WASM/browser dependencies.
pub struct EngineCore {
    pub design: Design,
    pub ui: UiState,
    pub input: InputState,
    pub viewport: Viewport,
    history: HistoryManager,
    pending_text: Option<PendingTextEdit>,
    image_jobs: JobGate,
    submission: JobGate,
}

impl Default for EngineCore {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl EngineCore {
    /// Fresh engine with an empty design. The initial state is the first
    /// history entry.
    #[must_use]
    pub fn new(now_ms: f64) -> Self {
        let mut core = Self {
            design: Design::default(),
            ui: UiState::default(),
            input: InputState::default(),
            viewport: Viewport::default(),
            history: HistoryManager::default(),
            pending_text: None,
            image_jobs: JobGate::default(),
            submission: JobGate::default(),
        };
        core.record(now_ms);
        core
    }

    // --- Queries ---

    /// The currently selected element, if any.
    #[must_use]
    pub fn selection(&self) -> Option<ElementId> {
        self.ui.selected_id
    }

    #[must_use]
    pub fn active_side(&self) -> Side {
        self.ui.active_side
    }

    /// Look up an element on either side.
    #[must_use]
    pub fn element(&self, id: ElementId) -> Option<&Element> {
        Side::ALL.into_iter().find_map(|s| self.design.side(s).get(id))
    }

    #[must_use]
    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    #[must_use]
    pub fn pending_text_edit(&self) -> Option<PendingTextEdit> {
        self.pending_text
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.submission.in_flight()
    }

    #[must_use]
    pub fn controls(&self) -> ControlState {
        let mode = &self.design.mode;
        let side = self.ui.active_side;
        let allowed = |kind| mode.check_create(side, kind).is_ok();
        let qr_count = self.design.side(side).qr_count();
        ControlState {
            side_locked: mode.restricted(side),
            can_add_text: allowed(ElementKind::Text),
            can_add_image: allowed(ElementKind::Image),
            can_add_shape: allowed(ElementKind::Shape),
            qr_visible: mode.qr_allowed(),
            can_add_qr: allowed(ElementKind::QrCode) && qr_count == 0,
            can_remove_qr: mode.qr_allowed() && !mode.restricted(side) && qr_count > 0,
            templates_enabled: !mode.material().is_restricted(),
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
            submitting: self.submission.in_flight(),
        }
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    // --- Pointer input ---

    /// Handle a pointer-down at page position `page_pt`.
    ///
    /// Chrome clicks are ignored entirely. A click on nothing deselects. A
    /// click on an element starts exactly one gesture, and only from idle.
    pub fn on_pointer_down(
        &mut self,
        page_pt: Point,
        button: Button,
        target: PointerTarget,
        _modifiers: Modifiers,
        now_ms: f64,
    ) -> Vec<Action> {
        if button != Button::Primary || target == PointerTarget::Chrome {
            return Vec::new();
        }
        if !self.input.is_idle() {
            debug!(state = ?self.input, "pointer-down ignored; gesture in progress");
            return Vec::new();
        }

        let mut actions = Vec::new();
        let side = self.ui.active_side;
        let hit = if target == PointerTarget::Canvas && !self.design.mode.restricted(side) {
            let pt = self.viewport.page_to_card(page_pt);
            hit::hit_test(pt, self.design.side(side), self.ui.selected_id)
        } else {
            None
        };

        if self.ui.editing_text.is_some() && hit.map(|h| h.element_id) != self.ui.editing_text {
            self.ui.editing_text = None;
            actions.push(Action::CloseTextEditor);
        }

        let Some(hit) = hit else {
            self.pending_text = None;
            actions.extend(self.deselect());
            return actions;
        };
        let Some(element) = self.design.side(side).get(hit.element_id) else {
            return actions;
        };
        let start = *element.geometry();
        let is_text = element.kind() == ElementKind::Text;

        actions.extend(self.select(hit.element_id));
        self.input = match hit.part {
            HitPart::Body => {
                if is_text {
                    self.pending_text = Some(PendingTextEdit {
                        id: hit.element_id,
                        origin: page_pt,
                        fire_at_ms: now_ms + TEXT_EDIT_DEBOUNCE_MS,
                    });
                }
                InputState::Dragging { id: hit.element_id, start_pointer: page_pt, start }
            }
            HitPart::Resize(handle) => InputState::Resizing { id: hit.element_id, handle, start_pointer: page_pt, start },
            HitPart::Rotate => InputState::Rotating { id: hit.element_id, center: start.center() },
        };
        actions.extend(self.set_cursor(self.input.cursor()));
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Handle a pointer-move. Active gestures recompute geometry from their
    /// start state; idle moves only update the hover cursor.
    pub fn on_pointer_move(&mut self, page_pt: Point, modifiers: Modifiers) -> Vec<Action> {
        if let Some(pending) = self.pending_text {
            if pending.origin.distance(page_pt) > CLICK_MOVE_THRESHOLD_PX {
                debug!(id = %pending.id, "pending text edit cancelled by movement");
                self.pending_text = None;
            }
        }

        let side = self.ui.active_side;
        let pt = self.viewport.page_to_card(page_pt);
        let next = match self.input.clone() {
            InputState::Idle => return self.update_hover(pt),
            InputState::Dragging { id, start_pointer, start } => {
                if self.pending_text.is_some_and(|p| p.id == id) {
                    return Vec::new();
                }
                let mut moved = start;
                moved.x += page_pt.x - start_pointer.x;
                moved.y += page_pt.y - start_pointer.y;
                self.ui.drag_feedback.get_or_insert_with(|| DragFeedback::for_element(id));
                (id, clamp_to_content_box(&moved, &self.viewport.content_box()))
            }
            InputState::Resizing { id, handle, start_pointer, start } => {
                let dx = page_pt.x - start_pointer.x;
                let dy = page_pt.y - start_pointer.y;
                let resized = if modifiers.shift {
                    compute_free_resize(handle, &start, dx, dy)
                } else {
                    compute_aspect_resize(handle, &start, dx, dy)
                };
                (id, resized)
            }
            InputState::Rotating { id, center } => {
                let Some(current) = self.design.side(side).get(id).map(|e| *e.geometry()) else {
                    return self.abort_gesture("rotate target vanished");
                };
                let angle = normalize_degrees(compute_rotation_angle(center, pt) + ROTATE_HANDLE_BEARING_DEG);
                (id, Geometry { rotation: angle, ..current })
            }
        };

        let (id, geometry) = next;
        let Some(element) = self.design.side_mut(side).get_mut(id) else {
            return self.abort_gesture("gesture target vanished");
        };
        element.update_geometry(geometry);
        vec![Action::ElementUpdated { id }, Action::RenderNeeded]
    }

    /// Handle a pointer-up anywhere. Ends the active gesture and records one
    /// history entry.
    pub fn on_pointer_up(&mut self, _page_pt: Point, button: Button, now_ms: f64) -> Vec<Action> {
        if button != Button::Primary || self.input.is_idle() {
            return Vec::new();
        }
        self.input = InputState::Idle;
        self.ui.drag_feedback = None;
        let mut actions = self.set_cursor(None);
        self.record(now_ms);
        actions.push(Action::ControlsChanged(self.controls()));
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Advance host time. Opens the inline text editor once a text click has
    /// outlived the debounce without turning into a drag.
    pub fn tick(&mut self, now_ms: f64) -> Vec<Action> {
        let Some(pending) = self.pending_text else {
            return Vec::new();
        };
        if now_ms < pending.fire_at_ms || !self.input.is_idle() {
            return Vec::new();
        }
        self.pending_text = None;
        let Some(ElementStyle::Text(text)) = self.design.side(self.ui.active_side).get(pending.id).map(Element::style)
        else {
            return Vec::new();
        };
        let content = text.content.clone();
        self.ui.editing_text = Some(pending.id);
        vec![Action::OpenTextEditor { id: pending.id, content }]
    }

    // --- Keyboard ---

    /// Handle a key press. Keys go to the inline editor while it is open.
    pub fn on_key_down(&mut self, key: &Key, modifiers: Modifiers, now_ms: f64) -> Vec<Action> {
        if self.ui.editing_text.is_some() {
            return Vec::new();
        }
        match key.0.as_str() {
            "Delete" | "Backspace" => match self.ui.selected_id {
                Some(id) => self.delete_element(id, now_ms).unwrap_or_else(|e| vec![Action::Rejected(e)]),
                None => Vec::new(),
            },
            "Escape" => self.deselect(),
            "z" | "Z" if modifiers.command() => {
                if modifiers.shift {
                    self.redo()
                } else {
                    self.undo()
                }
            }
            "y" | "Y" if modifiers.command() => self.redo(),
            _ => Vec::new(),
        }
    }

    // --- Selection ---

    /// Select `id`, replacing any previous selection.
    pub fn select(&mut self, id: ElementId) -> Vec<Action> {
        if self.ui.selected_id == Some(id) {
            return Vec::new();
        }
        self.ui.selected_id = Some(id);
        vec![Action::SelectionChanged(Some(id)), Action::RenderNeeded]
    }

    pub fn deselect(&mut self) -> Vec<Action> {
        if self.ui.selected_id.take().is_none() {
            return Vec::new();
        }
        vec![Action::SelectionChanged(None), Action::RenderNeeded]
    }

    // --- Element creation ---

    /// Add a text element centered on the active side.
    ///
    /// # Errors
    ///
    /// Rejected when the active side or element type is restricted.
    pub fn add_text(&mut self, now_ms: f64) -> Result<Vec<Action>, EditError> {
        let geometry = centered_geometry(&self.viewport.content_box(), TEXT_WIDTH, TEXT_HEIGHT);
        self.create_element(geometry, ElementStyle::Text(TextStyle::default()), now_ms)
    }

    /// Add a shape centered on the active side.
    ///
    /// # Errors
    ///
    /// Rejected when the active side or element type is restricted.
    pub fn add_shape(&mut self, kind: ShapeKind, now_ms: f64) -> Result<Vec<Action>, EditError> {
        let geometry = centered_geometry(&self.viewport.content_box(), SHAPE_SIZE, SHAPE_SIZE);
        self.create_element(geometry, ElementStyle::Shape(ShapeStyle::new(kind)), now_ms)
    }

    /// Add the QR code for the active side at its default position.
    ///
    /// # Errors
    ///
    /// Rejected unless the card is blank PVC, or if the side already has one.
    pub fn add_qr(&mut self, source_ref: String, now_ms: f64) -> Result<Vec<Action>, EditError> {
        let geometry = default_qr_geometry(&self.viewport.content_box());
        self.create_element(geometry, ElementStyle::QrCode(QrStyle { source_ref }), now_ms)
    }

    /// Remove the active side's QR code, if it has one.
    ///
    /// # Errors
    ///
    /// Rejected when the side is locked.
    pub fn remove_qr(&mut self, now_ms: f64) -> Result<Vec<Action>, EditError> {
        let side = self.ui.active_side;
        let Some(id) = self.design.side(side).iter().find(|e| e.is_qr()).map(Element::id) else {
            return Ok(Vec::new());
        };
        self.delete_element(id, now_ms)
    }

    /// Start an image upload. The host reads and decodes the file, then
    /// reports back with the returned ticket.
    ///
    /// # Errors
    ///
    /// Rejected for restricted sides and for unsupported or oversized files.
    pub fn begin_image_load(&mut self, mime: &str, size_bytes: usize) -> Result<JobTicket, EditError> {
        self.design.mode.check_create(self.ui.active_side, ElementKind::Image)?;
        validate_upload(mime, size_bytes)?;
        Ok(self.image_jobs.begin())
    }

    /// Finish an image upload. Stale or cancelled tickets are dropped and
    /// return `Ok` with no actions.
    ///
    /// # Errors
    ///
    /// Rejected if the active side became restricted while decoding.
    pub fn complete_image_load(
        &mut self,
        ticket: JobTicket,
        source_ref: String,
        natural_width: f64,
        natural_height: f64,
        now_ms: f64,
    ) -> Result<Vec<Action>, EditError> {
        if !self.image_jobs.finish(ticket) {
            debug!(ticket = ticket.id(), "stale image load dropped");
            return Ok(Vec::new());
        }
        let (w, h) = fit_image_size(natural_width, natural_height);
        let geometry = centered_geometry(&self.viewport.content_box(), w.max(MIN_ELEMENT_SIZE), h.max(MIN_ELEMENT_SIZE));
        let style = ElementStyle::Image(ImageStyle { source_ref, object_fit: ObjectFit::Contain, color_filter: None });
        self.create_element(geometry, style, now_ms)
    }

    /// Report a failed decode. Returns whether the ticket was current.
    pub fn fail_image_load(&mut self, ticket: JobTicket, reason: &str) -> bool {
        let current = self.image_jobs.finish(ticket);
        if current {
            warn!(ticket = ticket.id(), reason, "image load failed");
        }
        current
    }

    /// Invalidate any outstanding image load.
    pub fn cancel_jobs(&mut self) -> bool {
        self.image_jobs.cancel()
    }

    fn create_element(&mut self, geometry: Geometry, style: ElementStyle, now_ms: f64) -> Result<Vec<Action>, EditError> {
        let side = self.ui.active_side;
        let kind = style.kind();
        self.design.mode.check_create(side, kind)?;
        let geometry = clamp_to_content_box(&geometry, &self.viewport.content_box());
        let id = self.design.side_mut(side).create(geometry, style)?;
        let material = self.design.mode.material();
        if let Some(el) = self.design.side_mut(side).get_mut(id) {
            el.apply_material_constraints(material, side);
        }
        info!(%id, ?side, kind = kind.label(), "element created");

        let mut actions = vec![Action::ElementCreated { id, side }];
        actions.extend(self.select(id));
        self.record(now_ms);
        actions.push(Action::ControlsChanged(self.controls()));
        actions.push(Action::RenderNeeded);
        Ok(actions)
    }

    // --- Element mutation ---

    /// Delete an element.
    ///
    /// # Errors
    ///
    /// Rejected when the element is unknown or its side is locked.
    pub fn delete_element(&mut self, id: ElementId, now_ms: f64) -> Result<Vec<Action>, EditError> {
        let side = self.editable_side_of(id)?;
        self.design.side_mut(side).remove(id);
        let mut actions = vec![Action::ElementDeleted { id }];
        if self.ui.selected_id == Some(id) {
            actions.extend(self.deselect());
        }
        if self.ui.editing_text == Some(id) {
            self.ui.editing_text = None;
            actions.push(Action::CloseTextEditor);
        }
        if self.pending_text.is_some_and(|p| p.id == id) {
            self.pending_text = None;
        }
        self.record(now_ms);
        actions.push(Action::ControlsChanged(self.controls()));
        actions.push(Action::RenderNeeded);
        Ok(actions)
    }

    /// Replace an element's style with one of the same type. Material
    /// overrides are re-applied on top.
    ///
    /// # Errors
    ///
    /// Rejected for unknown elements, locked sides, or a type change.
    pub fn update_style(&mut self, id: ElementId, style: ElementStyle, now_ms: f64) -> Result<Vec<Action>, EditError> {
        let side = self.editable_side_of(id)?;
        let material = self.design.mode.material();
        let Some(el) = self.design.side_mut(side).get_mut(id) else {
            return Err(EditError::UnknownElement(id));
        };
        if !el.replace_style(style) {
            return Err(EditError::WrongElementType(id));
        }
        el.apply_material_constraints(material, side);
        self.record(now_ms);
        Ok(vec![Action::ElementUpdated { id }, Action::RenderNeeded])
    }

    /// Commit text from the inline editor and close it.
    ///
    /// # Errors
    ///
    /// Rejected for unknown or non-text elements and locked sides.
    pub fn commit_text(&mut self, id: ElementId, content: String, now_ms: f64) -> Result<Vec<Action>, EditError> {
        let Some(ElementStyle::Text(current)) = self.element(id).map(Element::style) else {
            return Err(self.element(id).map_or(EditError::UnknownElement(id), |_| EditError::WrongElementType(id)));
        };
        let style = ElementStyle::Text(TextStyle { content, ..current.clone() });
        if self.ui.editing_text == Some(id) {
            self.ui.editing_text = None;
        }
        let mut actions = self.update_style(id, style, now_ms)?;
        actions.push(Action::CloseTextEditor);
        Ok(actions)
    }

    /// Close the inline editor without changing anything.
    pub fn cancel_text_edit(&mut self) -> Vec<Action> {
        if self.ui.editing_text.take().is_none() {
            return Vec::new();
        }
        vec![Action::CloseTextEditor]
    }

    fn editable_side_of(&self, id: ElementId) -> Result<Side, EditError> {
        let side = self.design.locate(id).ok_or(EditError::UnknownElement(id))?;
        if self.design.mode.restricted(side) {
            return Err(EditError::SideLocked { side });
        }
        Ok(side)
    }

    // --- Mode state ---

    /// Choose a material. Wood and metal force the blank template and
    /// re-tone every element.
    pub fn select_material(&mut self, material: Material, now_ms: f64) -> Vec<Action> {
        self.design.mode.select_material(material);
        info!(material = material.as_str(), template = ?self.design.mode.template(), "material selected");
        let mut actions = self.refresh_derived();
        self.record(now_ms);
        actions.push(Action::ControlsChanged(self.controls()));
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Choose a template.
    ///
    /// # Errors
    ///
    /// Wood and metal cards only take the blank template.
    pub fn select_template(&mut self, template: Template, now_ms: f64) -> Result<Vec<Action>, EditError> {
        if self.design.mode.material().is_restricted() && template != Template::Blank {
            return Err(EditError::TemplateUnavailable);
        }
        self.design.mode.select_template(template);
        info!(?template, semi_custom = self.design.mode.is_semi_custom(), "template selected");
        let mut actions = self.refresh_derived();
        self.record(now_ms);
        actions.push(Action::ControlsChanged(self.controls()));
        actions.push(Action::RenderNeeded);
        Ok(actions)
    }

    /// Show and edit the other face. Not a history event.
    pub fn switch_side(&mut self, side: Side) -> Vec<Action> {
        if self.ui.active_side == side {
            return Vec::new();
        }
        self.input = InputState::Idle;
        self.ui.drag_feedback = None;
        self.pending_text = None;
        let mut actions = self.cancel_text_edit();
        actions.extend(self.deselect());
        self.ui.active_side = side;
        self.ui.flip = FlipState::showing(side);
        actions.push(Action::SideChanged(side));
        actions.push(Action::FlipChanged(self.ui.flip));
        actions.push(Action::ControlsChanged(self.controls()));
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Re-run the gating that follows any mode change: material tones, and
    /// dropping selection and editors on a side that just became locked.
    fn refresh_derived(&mut self) -> Vec<Action> {
        self.design.apply_material_constraints();
        let mut actions = Vec::new();
        if self.design.mode.restricted(self.ui.active_side) {
            self.input = InputState::Idle;
            self.ui.drag_feedback = None;
            self.pending_text = None;
            actions.extend(self.cancel_text_edit());
            actions.extend(self.deselect());
        }
        actions
    }

    // --- History ---

    fn record(&mut self, now_ms: f64) {
        let entry = HistoryEntry::capture(&self.design, self.ui.active_side, now_ms);
        if self.history.record(entry) {
            debug!(len = self.history.len(), cursor = self.history.cursor(), "history recorded");
        }
    }

    pub fn undo(&mut self) -> Vec<Action> {
        if !self.input.is_idle() {
            return Vec::new();
        }
        let mut history = std::mem::take(&mut self.history);
        let result = history.undo(|entry| self.restore_entry(entry));
        self.history = history;
        self.finish_history_step(result, "undo")
    }

    pub fn redo(&mut self) -> Vec<Action> {
        if !self.input.is_idle() {
            return Vec::new();
        }
        let mut history = std::mem::take(&mut self.history);
        let result = history.redo(|entry| self.restore_entry(entry));
        self.history = history;
        self.finish_history_step(result, "redo")
    }

    fn restore_entry(&mut self, entry: &HistoryEntry) -> Result<(), HistoryError> {
        let design = entry.to_design()?;
        self.design = design;
        self.pending_text = None;
        self.ui.drag_feedback = None;
        self.ui.editing_text = None;
        self.ui.active_side = entry.active_side;
        self.ui.flip = FlipState::showing(entry.active_side);
        if self.ui.selected_id.is_some_and(|id| !self.design.side(entry.active_side).contains(id)) {
            self.ui.selected_id = None;
        }
        self.refresh_derived();
        Ok(())
    }

    fn finish_history_step(&mut self, result: Result<bool, HistoryError>, op: &'static str) -> Vec<Action> {
        match result {
            Ok(true) => {
                debug!(op, cursor = self.history.cursor(), "history step");
                vec![
                    Action::StateRestored,
                    Action::CloseTextEditor,
                    Action::SelectionChanged(self.ui.selected_id),
                    Action::SideChanged(self.ui.active_side),
                    Action::FlipChanged(self.ui.flip),
                    Action::ControlsChanged(self.controls()),
                    Action::RenderNeeded,
                ]
            }
            Ok(false) => Vec::new(),
            Err(e) => {
                warn!(op, error = %e, "history restore failed; state unchanged");
                Vec::new()
            }
        }
    }

    // --- Self-validation ---

    /// Find and repair state that no operation should produce: dangling
    /// references, undersized elements, duplicate QR codes, and an
    /// out-of-range history cursor.
    pub fn self_check(&mut self) -> Repairs {
        let mut repairs = Repairs::default();
        let side = self.ui.active_side;

        if self.ui.selected_id.is_some_and(|id| !self.design.side(side).contains(id)) {
            warn!(id = ?self.ui.selected_id, "self-check: dropping dangling selection");
            self.ui.selected_id = None;
            repairs.dangling_refs += 1;
        }
        if self.ui.editing_text.is_some_and(|id| !self.design.side(side).contains(id)) {
            warn!("self-check: closing editor for missing element");
            self.ui.editing_text = None;
            repairs.dangling_refs += 1;
        }
        if self.input.target().is_some_and(|id| !self.design.side(side).contains(id)) {
            warn!(state = ?self.input, "self-check: aborting gesture on missing element");
            self.input = InputState::Idle;
            self.ui.drag_feedback = None;
            repairs.dangling_refs += 1;
        }
        if self.pending_text.is_some_and(|p| !self.design.side(side).contains(p.id)) {
            self.pending_text = None;
            repairs.dangling_refs += 1;
        }

        let fixed = self.design.repair_invariants();
        repairs.undersized = fixed.undersized;
        repairs.extra_qr = fixed.extra_qr;

        if self.history.repair_cursor() {
            warn!(len = self.history.len(), "self-check: clamped history cursor");
            repairs.history_cursor += 1;
        }
        repairs
    }

    // --- Submission ---

    /// Start a submission and return the payload to send.
    ///
    /// # Errors
    ///
    /// Rejected while another submission is in flight or when a required
    /// customer field is blank.
    pub fn begin_submission(
        &mut self,
        customer: CustomerInfo,
        now_ms: f64,
    ) -> Result<(JobTicket, DesignData), EditError> {
        if let Some(field) = customer.missing_field() {
            return Err(EditError::MissingField { field });
        }
        let ticket = self.submission.begin_exclusive().ok_or(EditError::SubmissionInFlight)?;
        info!(ticket = ticket.id(), "submission started");
        Ok((ticket, self.design.to_data(customer, now_ms)))
    }

    /// Record the server's answer. Always clears the in-flight flag for the
    /// current ticket, success or not. Stale tickets are ignored.
    pub fn finish_submission(&mut self, ticket: JobTicket, outcome: Result<&str, &str>) -> bool {
        if !self.submission.finish(ticket) {
            debug!(ticket = ticket.id(), "stale submission result ignored");
            return false;
        }
        match outcome {
            Ok(design_id) => info!(ticket = ticket.id(), design_id, "submission accepted"),
            Err(message) => warn!(ticket = ticket.id(), message, "submission failed"),
        }
        true
    }

    /// Abandon the in-flight submission. Its result will be ignored.
    pub fn cancel_submission(&mut self) -> bool {
        let cancelled = self.submission.cancel();
        if cancelled {
            info!("submission cancelled");
        }
        cancelled
    }

    // --- Capture ---

    /// Flatten both faces and hide selection UI so `side` can be captured.
    pub fn prepare_capture(&mut self, side: Side) -> CapturePlan {
        let plan = CapturePlan { side, flip: self.ui.flip, selected: self.ui.selected_id };
        self.ui.flip = FlipState::FLAT;
        self.ui.selected_id = None;
        plan
    }

    /// Undo [`EngineCore::prepare_capture`].
    pub fn finish_capture(&mut self, plan: CapturePlan) {
        self.ui.flip = plan.flip;
        self.ui.selected_id = plan.selected.filter(|&id| self.design.side(self.ui.active_side).contains(id));
    }

    // --- Helpers ---

    fn abort_gesture(&mut self, reason: &'static str) -> Vec<Action> {
        warn!(state = ?self.input, reason, "gesture aborted");
        self.input = InputState::Idle;
        self.ui.drag_feedback = None;
        let mut actions = self.set_cursor(None);
        actions.push(Action::RenderNeeded);
        actions
    }

    fn update_hover(&mut self, pt: Point) -> Vec<Action> {
        let side = self.ui.active_side;
        let cursor = if self.design.mode.restricted(side) {
            None
        } else {
            hit::hit_test(pt, self.design.side(side), self.ui.selected_id).map(|h| match h.part {
                HitPart::Body => "move",
                HitPart::Resize(handle) => handle.cursor(),
                HitPart::Rotate => "grab",
            })
        };
        self.set_cursor(cursor)
    }

    fn set_cursor(&mut self, cursor: Option<&'static str>) -> Vec<Action> {
        if self.ui.cursor == cursor {
            return Vec::new();
        }
        self.ui.cursor = cursor;
        vec![Action::SetCursor(cursor.unwrap_or("default").to_owned())]
    }
}

/// The full canvas engine. Wraps `EngineCore` and owns the browser canvas element.
pub struct Engine {
    canvas: HtmlCanvasElement,
    images: HashMap<String, HtmlImageElement>,
    pub core: EngineCore,
}

impl Engine {
    /// Create a new engine bound to the given canvas element.
    #[must_use]
    pub fn new(canvas: HtmlCanvasElement, now_ms: f64) -> Self {
        Self { canvas, images: HashMap::new(), core: EngineCore::new(now_ms) }
    }

    /// Make a decoded image available to the painter under `source_ref`.
    pub fn register_image(&mut self, source_ref: String, image: HtmlImageElement) {
        self.images.insert(source_ref, image);
    }

    /// Draw the active side to the canvas.
    pub fn render(&self) {
        if let Err(e) = self.paint(self.core.ui.active_side, true) {
            warn!(error = ?e, "render failed");
        }
    }

    /// Paint `side` flat and without selection UI, returning a PNG data URL.
    ///
    /// # Errors
    ///
    /// Returns the browser error if the context or encoder is unavailable.
    pub fn capture_side(&mut self, side: Side) -> Result<String, JsValue> {
        let plan = self.core.prepare_capture(side);
        let result = self.paint(side, false).and_then(|()| self.canvas.to_data_url_with_type("image/png"));
        self.core.finish_capture(plan);
        self.render();
        result
    }

    fn paint(&self, side: Side, show_selection: bool) -> Result<(), JsValue> {
        let ctx = self
            .canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        let scene = render::Scene {
            design: &self.core.design,
            ui: &self.core.ui,
            side,
            images: &self.images,
            show_selection,
            width: f64::from(self.canvas.width()),
            height: f64::from(self.canvas.height()),
        };
        render::draw(&ctx, &scene)
    }
}
