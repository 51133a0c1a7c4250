//! Rendering: draws one face of the card to a 2D context.
//!
//! All drawing on [`web_sys::CanvasRenderingContext2d`] happens here; the
//! engine only acquires the context and hands it over. The painter receives
//! read-only views of the design and UI state and produces pixels; it does
//! not mutate any application state.
//!
//! Element placement goes through [`crate::print::ScaleTransform`], the same
//! arithmetic the server uses for the 300 DPI output, so the preview and the
//! print agree. All fallible `Canvas2D` calls propagate errors via
//! `Result<(), JsValue>`; the caller ([`crate::engine::Engine::render`]) logs them.

use std::collections::HashMap;
use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::{CanvasGradient, CanvasRenderingContext2d, HtmlImageElement};

use crate::consts::HANDLE_RADIUS_PX;
use crate::design::{Design, Side};
use crate::element::{Element, ElementStyle, ImageStyle, ShapeKind, ShapeStyle, TextAlign, TextStyle};
use crate::geometry::ResizeHandle;
use crate::hit;
use crate::input::UiState;
use crate::viewport::Point;
use crate::print::{
    Fallback, Placement, ScaleTransform, WOOD_BASE, WOOD_STRIPE, backdrop, circle_radius, fit_image, layout_text,
    wood_stripes,
};

/// Selection dash segment length in canvas pixels.
const SELECTION_DASH_PX: f64 = 4.0;

const SELECTION_COLOR: &str = "#1E90FF";

/// Everything needed to paint one face.
pub struct Scene<'a> {
    pub design: &'a Design,
    pub ui: &'a UiState,
    pub side: Side,
    /// Decoded images keyed by source reference or background asset name.
    pub images: &'a HashMap<String, HtmlImageElement>,
    pub show_selection: bool,
    /// Canvas size in pixels.
    pub width: f64,
    pub height: f64,
}

/// Draw the full scene: background, elements, then selection UI.
///
/// # Errors
///
/// Returns `Err` if any `Canvas2D` call fails (e.g. invalid context state).
pub fn draw(ctx: &CanvasRenderingContext2d, scene: &Scene<'_>) -> Result<(), JsValue> {
    let scale = ScaleTransform::for_output(scene.width, scene.height);

    // Layer 1: clear and paint the background.
    ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)?;
    ctx.clear_rect(0.0, 0.0, scene.width, scene.height);

    // The face's flip angle squashes it about the vertical center line.
    let sx = scene.ui.flip.face_scale_x(scene.side);
    ctx.set_transform(sx, 0.0, 0.0, 1.0, scene.width * (1.0 - sx) / 2.0, 0.0)?;
    draw_background(ctx, scene)?;

    // Layer 2: elements in effective z-order (bottom first).
    let selected = scene.show_selection.then_some(scene.ui.selected_id).flatten();
    let dragging = scene.ui.drag_feedback.map(|f| f.id);
    for el in hit::paint_order(scene.design.side(scene.side), selected, dragging) {
        let opacity = scene.ui.drag_feedback.filter(|f| f.id == el.id()).map_or(1.0, |f| f.opacity);
        ctx.save();
        ctx.set_global_alpha(opacity);
        let result = draw_element(ctx, el, &scale, scene.images);
        ctx.restore();
        result?;
    }

    // Layer 3: selection UI.
    if let Some(el) = selected.and_then(|id| scene.design.side(scene.side).get(id)) {
        draw_selection(ctx, el, &scale)?;
    }
    Ok(())
}

// =============================================================
// Background
// =============================================================

fn draw_background(ctx: &CanvasRenderingContext2d, scene: &Scene<'_>) -> Result<(), JsValue> {
    let (w, h) = (scene.width, scene.height);
    let bg = backdrop(&scene.design.mode, scene.side);
    if let Some(img) = bg.asset.as_ref().and_then(|name| scene.images.get(name)).filter(|i| i.complete()) {
        return ctx.draw_image_with_html_image_element_and_dw_and_dh(img, 0.0, 0.0, w, h);
    }
    match bg.fallback {
        Fallback::Solid(color) => {
            ctx.set_fill_style_str(color);
            ctx.fill_rect(0.0, 0.0, w, h);
        }
        Fallback::WoodGrain => {
            ctx.set_fill_style_str(WOOD_BASE);
            ctx.fill_rect(0.0, 0.0, w, h);
            ctx.save();
            ctx.set_fill_style_str(WOOD_STRIPE);
            for stripe in wood_stripes(h) {
                ctx.set_global_alpha(stripe.alpha);
                ctx.fill_rect(0.0, stripe.y - stripe.thickness / 2.0, w, stripe.thickness);
            }
            ctx.restore();
        }
        Fallback::Gradient(from, to) => {
            let gradient: CanvasGradient = ctx.create_linear_gradient(0.0, 0.0, w, h);
            gradient.add_color_stop(0.0, from)?;
            gradient.add_color_stop(1.0, to)?;
            ctx.set_fill_style_canvas_gradient(&gradient);
            ctx.fill_rect(0.0, 0.0, w, h);
        }
    }
    Ok(())
}

// =============================================================
// Element dispatch
// =============================================================

fn draw_element(
    ctx: &CanvasRenderingContext2d,
    el: &Element,
    scale: &ScaleTransform,
    images: &HashMap<String, HtmlImageElement>,
) -> Result<(), JsValue> {
    let p = scale.place(el.geometry());
    ctx.save();
    place(ctx, &p)?;
    let result = match el.style() {
        ElementStyle::Text(style) => draw_text(ctx, style, &p, scale),
        ElementStyle::Image(style) => draw_image(ctx, style, &p, images),
        ElementStyle::Shape(style) => draw_shape(ctx, style, &p, scale),
        ElementStyle::QrCode(qr) => match images.get(&qr.source_ref).filter(|i| i.complete()) {
            Some(img) => ctx.draw_image_with_html_image_element_and_dw_and_dh(img, 0.0, 0.0, p.width, p.height),
            None => draw_qr_placeholder(ctx, &p),
        },
    };
    ctx.restore();
    result
}

fn draw_text(
    ctx: &CanvasRenderingContext2d,
    style: &TextStyle,
    p: &Placement,
    scale: &ScaleTransform,
) -> Result<(), JsValue> {
    let size = scale.font_size(style.font_size_px);
    ctx.set_font(&style.font_string_at(size));
    ctx.set_fill_style_str(&style.color);
    ctx.set_text_align(style.align.as_css());
    ctx.set_text_baseline("top");
    for line in layout_text(style, p.width, size) {
        ctx.fill_text(line.text, line.anchor_x, line.top)?;
        if style.underline {
            let width = ctx.measure_text(line.text)?.width();
            let left = match style.align {
                TextAlign::Left => line.anchor_x,
                TextAlign::Center => line.anchor_x - width / 2.0,
                TextAlign::Right => line.anchor_x - width,
            };
            let y = line.top + size;
            ctx.set_stroke_style_str(&style.color);
            ctx.set_line_width((size / 15.0).max(1.0));
            ctx.begin_path();
            ctx.move_to(left, y);
            ctx.line_to(left + width, y);
            ctx.stroke();
        }
    }
    Ok(())
}

fn draw_image(
    ctx: &CanvasRenderingContext2d,
    style: &ImageStyle,
    p: &Placement,
    images: &HashMap<String, HtmlImageElement>,
) -> Result<(), JsValue> {
    let Some(img) = images.get(&style.source_ref).filter(|i| i.complete()) else {
        // Still decoding; the host re-renders once the image arrives.
        return Ok(());
    };
    let fit = fit_image(
        style.object_fit,
        f64::from(img.natural_width()),
        f64::from(img.natural_height()),
        p.width,
        p.height,
    );
    ctx.set_filter(style.color_filter.map_or("none", |f| f.css()));
    ctx.draw_image_with_html_image_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
        img,
        fit.src.x,
        fit.src.y,
        fit.src.width,
        fit.src.height,
        fit.dst.x,
        fit.dst.y,
        fit.dst.width,
        fit.dst.height,
    )?;
    ctx.set_filter("none");
    Ok(())
}

fn draw_shape(
    ctx: &CanvasRenderingContext2d,
    style: &ShapeStyle,
    p: &Placement,
    scale: &ScaleTransform,
) -> Result<(), JsValue> {
    ctx.begin_path();
    match style.kind {
        ShapeKind::Rectangle => ctx.rect(0.0, 0.0, p.width, p.height),
        ShapeKind::Circle => ctx.arc(p.width / 2.0, p.height / 2.0, circle_radius(p.width, p.height), 0.0, 2.0 * PI)?,
    }
    if let Some(fill) = &style.fill {
        ctx.set_fill_style_str(fill);
        ctx.fill();
    }
    if let Some(stroke) = &style.stroke {
        ctx.set_stroke_style_str(&stroke.color);
        ctx.set_line_width(scale.stroke_width(stroke.width));
        ctx.stroke();
    }
    Ok(())
}

/// Bordered box with a "QR" label, shown until the QR image is available.
fn draw_qr_placeholder(ctx: &CanvasRenderingContext2d, p: &Placement) -> Result<(), JsValue> {
    ctx.set_fill_style_str("#FFFFFF");
    ctx.fill_rect(0.0, 0.0, p.width, p.height);
    ctx.set_stroke_style_str("#000000");
    ctx.set_line_width(2.0);
    ctx.stroke_rect(1.0, 1.0, p.width - 2.0, p.height - 2.0);
    ctx.set_fill_style_str("#000000");
    ctx.set_font(&format!("bold {}px Arial", (p.height * 0.3).max(8.0)));
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");
    ctx.fill_text("QR", p.width / 2.0, p.height / 2.0)
}

// =============================================================
// Selection UI
// =============================================================

fn draw_selection(ctx: &CanvasRenderingContext2d, el: &Element, scale: &ScaleTransform) -> Result<(), JsValue> {
    let p = scale.place(el.geometry());

    // Dashed bounding box (rotated with the element).
    ctx.save();
    place(ctx, &p)?;
    ctx.set_stroke_style_str(SELECTION_COLOR);
    ctx.set_line_width(1.0);
    let dash_array = js_sys::Array::new();
    dash_array.push(&SELECTION_DASH_PX.into());
    dash_array.push(&SELECTION_DASH_PX.into());
    ctx.set_line_dash(&dash_array)?;
    ctx.stroke_rect(0.0, 0.0, p.width, p.height);
    ctx.set_line_dash(&js_sys::Array::new())?;
    ctx.restore();

    // Handles are positioned in card space, then scaled to canvas pixels.
    let to_canvas = |pt: Point| (pt.x * scale.sx, pt.y * scale.sy);
    let geom = el.geometry();

    ctx.save();
    ctx.set_fill_style_str("#fff");
    ctx.set_stroke_style_str(SELECTION_COLOR);
    ctx.set_line_width(1.0);
    let size = HANDLE_RADIUS_PX;
    for handle in ResizeHandle::ALL {
        let (x, y) = to_canvas(hit::handle_position(geom, handle));
        ctx.fill_rect(x - size, y - size, size * 2.0, size * 2.0);
        ctx.stroke_rect(x - size, y - size, size * 2.0, size * 2.0);
    }

    // Connecting line from N handle to rotate handle.
    let (nx, ny) = to_canvas(hit::handle_position(geom, ResizeHandle::N));
    let (rx, ry) = to_canvas(hit::rotate_handle_position(geom));
    ctx.begin_path();
    ctx.move_to(nx, ny);
    ctx.line_to(rx, ry);
    ctx.stroke();

    // Rotate handle circle.
    ctx.begin_path();
    ctx.arc(rx, ry, size, 0.0, 2.0 * PI)?;
    ctx.fill();
    ctx.stroke();

    ctx.restore();
    Ok(())
}

// =============================================================
// Helpers
// =============================================================

/// Translate to the element center, rotate, then back by half the extent so
/// the element draws at local `(0, 0)`..`(width, height)`.
fn place(ctx: &CanvasRenderingContext2d, p: &Placement) -> Result<(), JsValue> {
    let c = p.center();
    ctx.translate(c.x, c.y)?;
    ctx.rotate(p.rotation_deg.to_radians())?;
    ctx.translate(-p.width / 2.0, -p.height / 2.0)?;
    Ok(())
}
