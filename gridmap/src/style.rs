//! Color theming for tools and drawings.
//!
//! Tools are colored by type and page theme; drawings by their palette color
//! and fill mode. Selection overrides the stroke with a blue glow. Tools
//! outside an active filter are dimmed.

#[cfg(test)]
#[path = "style_test.rs"]
mod style_test;

use crate::doc::{DrawingColor, DrawingItem, ToolType};

/// Stroke and glow color for the selected item.
pub const SELECTED_STROKE: &str = "#007bff";
pub const SELECTED_STROKE_WIDTH: f64 = 2.0;
pub const SELECTED_GLOW_BLUR: f64 = 10.0;
pub const SELECTED_GLOW_OPACITY: f64 = 0.7;

pub const TOOL_STROKE_WIDTH: f64 = 1.0;
pub const DRAWING_STROKE_WIDTH: f64 = 2.0;

/// Opacity of tools excluded by the active tool filter.
pub const DIMMED_OPACITY: f64 = 0.3;

/// Label font size in world pixels.
pub const LABEL_FONT_PX: f64 = 14.0;

/// Page color scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Parse the page's `data-bs-theme` attribute; anything but `dark` is light.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("dark") { Self::Dark } else { Self::Light }
    }
}

/// Drop shadow (or glow, when the offset is zero).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    pub color: &'static str,
    pub blur: f64,
    pub offset: f64,
    pub opacity: f64,
}

/// Fully resolved paint for one rectangle and its label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeStyle {
    /// `None` paints no fill (hollow drawing).
    pub fill: Option<&'static str>,
    pub stroke: &'static str,
    pub stroke_width: f64,
    pub text: &'static str,
    pub shadow: Option<Shadow>,
    pub opacity: f64,
}

impl ShapeStyle {
    /// Same paint with the given opacity.
    #[must_use]
    pub fn with_opacity(self, opacity: f64) -> Self {
        Self { opacity, ..self }
    }
}

/// Base colors for a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolPalette {
    pub fill: &'static str,
    pub stroke: &'static str,
    pub text: &'static str,
    pub shadow: &'static str,
}

#[must_use]
pub fn tool_palette(tool_type: ToolType, theme: Theme) -> ToolPalette {
    match theme {
        Theme::Light => {
            let fill = match tool_type {
                ToolType::Chemblend => "#8e44ad",
                ToolType::Slurry => "#16a085",
                ToolType::Other => "#3498db",
            };
            ToolPalette { fill, stroke: "#333", text: "black", shadow: "black" }
        }
        Theme::Dark => {
            let (fill, stroke, text) = match tool_type {
                ToolType::Chemblend => ("#4a1a5c", "#5e226e", "#c084d1"),
                ToolType::Slurry => ("#0d4f47", "#1a5d55", "#4fd1c7"),
                ToolType::Other => ("#1a3a5c", "#2a4a6c", "#87ceeb"),
            };
            ToolPalette { fill, stroke, text, shadow: "rgba(0,0,0,0.5)" }
        }
    }
}

/// Stroke color and solid fill color for a drawing color.
#[must_use]
pub fn drawing_palette(color: DrawingColor) -> (&'static str, &'static str) {
    match color {
        DrawingColor::Black => ("#333", "#aaa"),
        DrawingColor::Blue => ("#0d6efd", "#cfe2ff"),
        DrawingColor::Green => ("#198754", "#d1e7dd"),
        DrawingColor::Red => ("#dc3545", "#f8d7da"),
        DrawingColor::Yellow => ("#ffc107", "#fff3cd"),
    }
}

fn selected_glow() -> Shadow {
    Shadow { color: SELECTED_STROKE, blur: SELECTED_GLOW_BLUR, offset: 0.0, opacity: SELECTED_GLOW_OPACITY }
}

/// Paint for a tool rectangle.
#[must_use]
pub fn tool_style(tool_type: ToolType, theme: Theme, selected: bool, dimmed: bool) -> ShapeStyle {
    let palette = tool_palette(tool_type, theme);
    let opacity = if dimmed { DIMMED_OPACITY } else { 1.0 };
    if selected {
        return ShapeStyle {
            fill: Some(palette.fill),
            stroke: SELECTED_STROKE,
            stroke_width: SELECTED_STROKE_WIDTH,
            text: palette.text,
            shadow: Some(selected_glow()),
            opacity,
        };
    }
    ShapeStyle {
        fill: Some(palette.fill),
        stroke: palette.stroke,
        stroke_width: TOOL_STROKE_WIDTH,
        text: palette.text,
        shadow: Some(Shadow { color: palette.shadow, blur: 5.0, offset: 2.0, opacity: 0.3 }),
        opacity,
    }
}

/// Paint for a drawing rectangle. Labels take the stroke color.
#[must_use]
pub fn drawing_style(drawing: &DrawingItem, selected: bool) -> ShapeStyle {
    let (stroke, solid) = drawing_palette(drawing.color);
    let fill = drawing.is_solid.then_some(solid);
    if selected {
        return ShapeStyle {
            fill,
            stroke: SELECTED_STROKE,
            stroke_width: SELECTED_STROKE_WIDTH,
            text: stroke,
            shadow: Some(selected_glow()),
            opacity: 1.0,
        };
    }
    ShapeStyle { fill, stroke, stroke_width: DRAWING_STROKE_WIDTH, text: stroke, shadow: None, opacity: 1.0 }
}

/// Split a tool name like `RAK151F` into `"RAK\n151F"`.
///
/// Names that are not letters followed by digits (and optional trailing
/// letters) come back unchanged.
#[must_use]
pub fn format_tool_label(name: &str) -> String {
    let letters = name.chars().take_while(char::is_ascii_alphabetic).count();
    if letters == 0 {
        return name.to_owned();
    }
    let rest = &name[letters..];
    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 || !rest[digits..].chars().all(|c| c.is_ascii_alphabetic()) {
        return name.to_owned();
    }
    format!("{}\n{rest}", &name[..letters])
}
