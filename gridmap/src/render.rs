//! Rendering: paints the grid layer and the scene to a 2D context.
//!
//! This module is the only place that touches [`web_sys::CanvasRenderingContext2d`].
//! It receives read-only views of the grid, the scene and the camera and
//! produces pixels; it does not mutate any application state.
//!
//! All fallible `Canvas2D` calls propagate errors via `Result<(), JsValue>`.
//! The top-level caller ([`crate::engine::Engine::render`]) handles the result.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use crate::camera::Camera;
use crate::grid::{GRID_LINE_COLOR, GridLayer};
use crate::scene::{Group, RetainedScene, Shape};
use crate::style::{ShapeStyle, Shadow};

/// Line height multiplier for multi-line labels.
const LINE_HEIGHT: f64 = 1.2;

/// Draw the grid, then every group bottom-to-top.
///
/// `viewport_w` and `viewport_h` are in CSS pixels. `dpr` is the device pixel ratio.
///
/// # Errors
///
/// Returns `Err` if any `Canvas2D` call fails (e.g. invalid context state).
pub fn draw(
    ctx: &CanvasRenderingContext2d,
    grid: &GridLayer,
    scene: &RetainedScene,
    camera: &Camera,
    viewport_w: f64,
    viewport_h: f64,
    dpr: f64,
) -> Result<(), JsValue> {
    ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0)?;
    ctx.clear_rect(0.0, 0.0, viewport_w, viewport_h);
    ctx.translate(camera.pan_x, camera.pan_y)?;
    ctx.scale(camera.zoom, camera.zoom)?;

    draw_grid(ctx, grid);

    for (_, group) in scene.groups_in_order() {
        draw_group(ctx, group)?;
    }
    Ok(())
}

fn draw_grid(ctx: &CanvasRenderingContext2d, grid: &GridLayer) {
    ctx.set_stroke_style_str(GRID_LINE_COLOR);
    for line in grid.lines() {
        ctx.set_line_width(line.width);
        ctx.begin_path();
        ctx.move_to(line.from.x, line.from.y);
        ctx.line_to(line.to.x, line.to.y);
        ctx.stroke();
    }
}

fn draw_group(ctx: &CanvasRenderingContext2d, group: &Group) -> Result<(), JsValue> {
    ctx.save();
    ctx.translate(group.origin.x, group.origin.y)?;
    for shape in &group.shapes {
        match shape {
            Shape::Rect { width, height, style } => draw_rect(ctx, *width, *height, style),
            Shape::Text { text, width, height, color, font_px } => {
                draw_label(ctx, text, *width, *height, color, *font_px)?;
            }
        }
    }
    ctx.restore();
    Ok(())
}

fn draw_rect(ctx: &CanvasRenderingContext2d, width: f64, height: f64, style: &ShapeStyle) {
    ctx.set_global_alpha(style.opacity);
    match style.shadow {
        Some(shadow) => apply_shadow(ctx, &shadow),
        None => clear_shadow(ctx),
    }
    if let Some(fill) = style.fill {
        ctx.set_fill_style_str(fill);
        ctx.fill_rect(0.0, 0.0, width, height);
    }
    ctx.set_stroke_style_str(style.stroke);
    ctx.set_line_width(style.stroke_width);
    ctx.stroke_rect(0.0, 0.0, width, height);
    clear_shadow(ctx);
}

fn apply_shadow(ctx: &CanvasRenderingContext2d, shadow: &Shadow) {
    ctx.set_shadow_color(&with_alpha(shadow.color, shadow.opacity));
    ctx.set_shadow_blur(shadow.blur);
    ctx.set_shadow_offset_x(shadow.offset);
    ctx.set_shadow_offset_y(shadow.offset);
}

fn clear_shadow(ctx: &CanvasRenderingContext2d) {
    ctx.set_shadow_color("transparent");
    ctx.set_shadow_blur(0.0);
    ctx.set_shadow_offset_x(0.0);
    ctx.set_shadow_offset_y(0.0);
}

/// Centered label; lines split on `\n` and stacked around the box middle.
fn draw_label(
    ctx: &CanvasRenderingContext2d,
    text: &str,
    width: f64,
    height: f64,
    color: &str,
    font_px: f64,
) -> Result<(), JsValue> {
    ctx.set_fill_style_str(color);
    ctx.set_font(&format!("{font_px:.0}px sans-serif"));
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");
    for (line, y) in label_lines(text, height, font_px) {
        ctx.fill_text(line, width * 0.5, y)?;
    }
    Ok(())
}

/// Lines of `text` with the vertical center of each, inside a box of `height`.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn label_lines(text: &str, height: f64, font_px: f64) -> Vec<(&str, f64)> {
    let lines: Vec<&str> = text.split('\n').collect();
    let step = font_px * LINE_HEIGHT;
    let block = step * (lines.len().saturating_sub(1)) as f64;
    let top = height * 0.5 - block * 0.5;
    lines.into_iter().enumerate().map(|(i, line)| (line, top + step * i as f64)).collect()
}

/// CSS color with `alpha` applied. Hex colors (`#rgb`, `#rrggbb`) and
/// `black`/`white` become `rgba(...)`; anything else is returned unchanged.
pub(crate) fn with_alpha(color: &str, alpha: f64) -> String {
    let rgb = match color.trim() {
        "black" => Some((0, 0, 0)),
        "white" => Some((255, 255, 255)),
        hex => parse_hex(hex),
    };
    match rgb {
        Some((r, g, b)) => format!("rgba({r}, {g}, {b}, {alpha})"),
        None => color.to_owned(),
    }
}

fn parse_hex(raw: &str) -> Option<(u8, u8, u8)> {
    let digits = raw.strip_prefix('#')?;
    let channel = |s: &str| u8::from_str_radix(s, 16);
    let parsed = match digits.len() {
        3 => {
            let expand = |i: usize| digits.get(i..=i).map(|d| d.repeat(2));
            let (r, g, b) = (expand(0)?, expand(1)?, expand(2)?);
            (channel(&r), channel(&g), channel(&b))
        }
        6 => (channel(digits.get(0..2)?), channel(digits.get(2..4)?), channel(digits.get(4..6)?)),
        _ => return None,
    };
    match parsed {
        (Ok(r), Ok(g), Ok(b)) => Some((r, g, b)),
        _ => None,
    }
}
