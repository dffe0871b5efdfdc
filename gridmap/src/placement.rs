//! Placement: size classes, grid snapping, previews, and the tool picker.
//!
//! A placement starts as a [`Preview`] that follows the pointer, snapped to
//! the cell under it. Confirming the preview produces a create request; the
//! item only enters the store once the backend answers with its id.
//!
//! Snapping uses two rules. Previews snap the pointer's cell (`floor`), so
//! the preview's top-left corner is the hovered cell. Drags snap the item's
//! top-left corner to the nearest grid line (`round`) after subtracting the
//! grab offset, so an item never jumps under the pointer.

#[cfg(test)]
#[path = "placement_test.rs"]
mod placement_test;


use crate::camera::{Point, world_to_cell};
use crate::consts::{DEFAULT_DRAWING_HEIGHT, DEFAULT_DRAWING_WIDTH};
use crate::doc::{
    DrawingColor, DrawingItem, ItemKind, MapItem, PlacementSlot, ToolInfo, ToolType, feed_name, has_feed_variant,
};
use crate::wire::{AvailableToolDto, CreateToolRequest, DrawingRequest};

// =============================================================
// Size classes and snapping
// =============================================================

/// Tool footprint, in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeClass {
    #[default]
    W4H2,
    W3H3,
    W2H4,
}

impl SizeClass {
    pub const ALL: [Self; 3] = [Self::W4H2, Self::W3H3, Self::W2H4];

    /// Parse `"4x2"`, `"3x3"` or `"2x4"`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "4x2" => Some(Self::W4H2),
            "3x3" => Some(Self::W3H3),
            "2x4" => Some(Self::W2H4),
            _ => None,
        }
    }

    /// `(width, height)` in cells.
    #[must_use]
    pub fn cells(self) -> (u32, u32) {
        match self {
            Self::W4H2 => (4, 2),
            Self::W3H3 => (3, 3),
            Self::W2H4 => (2, 4),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::W4H2 => "4x2",
            Self::W3H3 => "3x3",
            Self::W2H4 => "2x4",
        }
    }
}

/// Cell containing `world`.
#[must_use]
pub fn snap_floor(world: Point, cell_size: f64) -> (f64, f64) {
    let cell = world_to_cell(world, cell_size);
    (cell.x.floor(), cell.y.floor())
}

/// Nearest cell corner for an item grabbed at `offset` (world px) inside it.
#[must_use]
pub fn snap_round(world: Point, offset: Point, cell_size: f64) -> (f64, f64) {
    let corner = world_to_cell(Point::new(world.x - offset.x, world.y - offset.y), cell_size);
    (corner.x.round(), corner.y.round())
}

// =============================================================
// Drawing form
// =============================================================

/// Values of the drawing dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawingForm {
    pub text: String,
    pub width: u32,
    pub height: u32,
    pub color: DrawingColor,
    pub is_solid: bool,
}

impl Default for DrawingForm {
    fn default() -> Self {
        Self {
            text: String::new(),
            width: DEFAULT_DRAWING_WIDTH,
            height: DEFAULT_DRAWING_HEIGHT,
            color: DrawingColor::Black,
            is_solid: false,
        }
    }
}

impl DrawingForm {
    /// Pre-populate the form from an existing drawing.
    #[must_use]
    pub fn from_item(item: &MapItem) -> Option<Self> {
        match &item.kind {
            ItemKind::Drawing(drawing) => Some(Self {
                text: drawing.text.clone(),
                width: item.width,
                height: item.height,
                color: drawing.color,
                is_solid: drawing.is_solid,
            }),
            ItemKind::Tool(_) => None,
        }
    }

    /// Replace zero sizes with the defaults.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            width: if self.width < 1 { DEFAULT_DRAWING_WIDTH } else { self.width },
            height: if self.height < 1 { DEFAULT_DRAWING_HEIGHT } else { self.height },
            ..self
        }
    }

    /// The drawing this form describes.
    #[must_use]
    pub fn drawing(&self) -> DrawingItem {
        DrawingItem { text: self.text.clone(), color: self.color, is_solid: self.is_solid }
    }

    /// Request body placing this drawing at cell `(x, y)`.
    #[must_use]
    pub fn request(&self, x: i32, y: i32) -> DrawingRequest {
        DrawingRequest {
            x,
            y,
            width: self.width,
            height: self.height,
            text: self.text.clone(),
            color: self.color.as_str().to_owned(),
            is_solid: self.is_solid,
        }
    }
}

// =============================================================
// Tool choices
// =============================================================

/// One placeable entry of the tool picker.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolChoice {
    pub slot: PlacementSlot,
    /// Display name; feed entries already carry the `F` suffix.
    pub name: String,
    /// Name of the underlying tool record.
    pub base_name: String,
    pub label: String,
    pub model: String,
    pub serial: String,
    pub tool_type: ToolType,
    pub status: String,
}

impl ToolChoice {
    /// Tool record for the placed item. Keeps the base tool's name; the feed
    /// name is derived from the slot at display time.
    #[must_use]
    pub fn info(&self) -> ToolInfo {
        ToolInfo {
            id: self.slot.tool_id,
            name: self.base_name.clone(),
            model: self.model.clone(),
            serial: self.serial.clone(),
            tool_type: self.tool_type,
            status: self.status.clone(),
        }
    }

    /// Case-insensitive match on label, model and serial.
    #[must_use]
    pub fn matches(&self, search: &str) -> bool {
        let needle = search.trim().to_lowercase();
        needle.is_empty()
            || self.label.to_lowercase().contains(&needle)
            || self.model.to_lowercase().contains(&needle)
            || self.serial.to_lowercase().contains(&needle)
    }
}

/// Picker label: `"<name> - <model>"`, with `" (Feed)"` for feed entries.
#[must_use]
pub fn format_choice_label(name: &str, model: &str, is_feed: bool) -> String {
    let suffix = if is_feed { " (Feed)" } else { "" };
    format!("{name} - {model}{suffix}")
}

/// Expand the available-tools answer into picker entries: the regular slot
/// unless already placed, then the feed slot for `D`-suffixed names unless
/// already placed.
#[must_use]
pub fn expand_available_tools(tools: &[AvailableToolDto]) -> Vec<ToolChoice> {
    let mut out = Vec::with_capacity(tools.len());
    for tool in tools {
        let model = tool.model.clone().unwrap_or_default();
        let serial = tool.serial.clone().unwrap_or_default();
        let tool_type = ToolType::parse(tool.tool_type.as_deref().unwrap_or_default());
        let status = tool.status.clone().unwrap_or_default();

        if !tool.regular_placed {
            out.push(ToolChoice {
                slot: PlacementSlot::regular(tool.id),
                name: tool.name.clone(),
                base_name: tool.name.clone(),
                label: format_choice_label(&tool.name, &model, false),
                model: model.clone(),
                serial: serial.clone(),
                tool_type,
                status: status.clone(),
            });
        }
        if has_feed_variant(&tool.name) && !tool.feed_placed {
            let name = feed_name(&tool.name);
            out.push(ToolChoice {
                slot: PlacementSlot::feed(tool.id),
                label: format_choice_label(&name, &model, true),
                name,
                base_name: tool.name.clone(),
                model,
                serial,
                tool_type,
                status,
            });
        }
    }
    out
}

/// Tool picker contents plus the guard against overlapping refreshes.
#[derive(Debug, Clone, Default)]
pub struct ToolPicker {
    choices: Vec<ToolChoice>,
    refreshing: bool,
}

impl ToolPicker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the refresh slot. Returns `false` while a refresh is in flight.
    pub fn begin_refresh(&mut self) -> bool {
        if self.refreshing {
            tracing::debug!("tool picker refresh already in progress");
            return false;
        }
        self.refreshing = true;
        true
    }

    /// Install a fresh answer and release the refresh slot. The backend's
    /// placed flags are authoritative.
    pub fn finish_refresh(&mut self, tools: &[AvailableToolDto]) {
        self.choices = expand_available_tools(tools);
        self.refreshing = false;
    }

    /// Release the refresh slot after a failed fetch. The picker is emptied.
    pub fn abort_refresh(&mut self) {
        self.choices.clear();
        self.refreshing = false;
    }

    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    #[must_use]
    pub fn choices(&self) -> &[ToolChoice] {
        &self.choices
    }

    /// Entries matching `search`, in picker order.
    #[must_use]
    pub fn filter(&self, search: &str) -> Vec<&ToolChoice> {
        self.choices.iter().filter(|c| c.matches(search)).collect()
    }

    #[must_use]
    pub fn find(&self, slot: PlacementSlot) -> Option<&ToolChoice> {
        self.choices.iter().find(|c| c.slot == slot)
    }

    /// Drop a slot after it was placed.
    pub fn remove(&mut self, slot: PlacementSlot) {
        self.choices.retain(|c| c.slot != slot);
    }
}

// =============================================================
// Preview
// =============================================================

/// What a preview will place.
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewKind {
    Tool { choice: ToolChoice, size: SizeClass },
    Drawing(DrawingForm),
}

/// The translucent placement preview.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub kind: PreviewKind,
    /// Top-left cell.
    pub x: f64,
    pub y: f64,
    /// Set once the create request was emitted; the preview then ignores
    /// further pointer movement and clicks until the answer arrives.
    pub submitted: bool,
}

impl Preview {
    #[must_use]
    pub fn new(kind: PreviewKind) -> Self {
        Self { kind, x: 0.0, y: 0.0, submitted: false }
    }

    /// Size in cells.
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        match &self.kind {
            PreviewKind::Tool { size, .. } => size.cells(),
            PreviewKind::Drawing(form) => (form.width, form.height),
        }
    }

    /// Move the preview so its top-left corner is the cell under `world`.
    pub fn track(&mut self, world: Point, cell_size: f64) {
        let (x, y) = snap_floor(world, cell_size);
        self.x = x;
        self.y = y;
    }

    #[allow(clippy::cast_possible_truncation)]
    fn cell(&self) -> (i32, i32) {
        (self.x.floor() as i32, self.y.floor() as i32)
    }

    /// Create-tool request, for tool previews.
    #[must_use]
    pub fn tool_request(&self) -> Option<CreateToolRequest> {
        let PreviewKind::Tool { choice, size, .. } = &self.kind else {
            return None;
        };
        let (x, y) = self.cell();
        let (width, height) = size.cells();
        Some(CreateToolRequest { tool_id: choice.slot, x, y, width, height })
    }

    /// Create-drawing request, for drawing previews.
    #[must_use]
    pub fn drawing_request(&self) -> Option<DrawingRequest> {
        let PreviewKind::Drawing(form) = &self.kind else {
            return None;
        };
        let (x, y) = self.cell();
        Some(form.request(x, y))
    }
}
