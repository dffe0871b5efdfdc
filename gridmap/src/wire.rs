//! JSON payloads exchanged with the map backend.
//!
//! Inbound DTOs are deliberately lenient: every field the editor can live
//! without is optional, and conversion into [`MapItem`] drops (and logs)
//! entries it cannot make sense of instead of failing the whole load.
//! Outbound requests are plain serde structs matching the endpoint bodies.

#[cfg(test)]
#[path = "wire_test.rs"]
mod wire_test;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::consts::{DEFAULT_DRAWING_HEIGHT, DEFAULT_DRAWING_WIDTH};
use crate::doc::{
    DrawingColor, DrawingItem, FEED_MARKER, ItemId, ItemKind, MapItem, PlacementSlot, ToolCatalog, ToolId, ToolInfo,
    ToolItem, ToolType,
};
use crate::placement::SizeClass;

// =============================================================
// Inbound
// =============================================================

/// Nested tool record on a saved item.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDto {
    pub id: ToolId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tool_type: Option<String>,
    #[serde(default)]
    pub model1: Option<String>,
    #[serde(default)]
    pub serial_number1: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl ToolDto {
    fn into_info(self) -> ToolInfo {
        ToolInfo {
            id: self.id,
            name: self.name.unwrap_or_else(|| "Unknown Tool".to_owned()),
            model: self.model1.unwrap_or_default(),
            serial: self.serial_number1.unwrap_or_default(),
            tool_type: ToolType::parse(self.tool_type.as_deref().unwrap_or_default()),
            status: self.status.unwrap_or_default(),
        }
    }
}

/// A saved map item as returned by `GET /api/map` and the create endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedItemDto {
    pub id: ItemId,
    #[serde(rename = "type", default)]
    pub item_type: Option<String>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub is_solid: bool,
    #[serde(default)]
    pub tool: Option<ToolDto>,
    #[serde(default)]
    pub tool_id: Option<ToolId>,
}

impl SavedItemDto {
    /// Convert into a live item, looking tool display data up in `catalog`
    /// first and falling back to the nested payload.
    ///
    /// Returns `None` for unknown item types and tools without an id.
    #[must_use]
    pub fn into_item(self, catalog: &ToolCatalog) -> Option<MapItem> {
        let kind = self.item_type.as_deref().unwrap_or_default().to_ascii_uppercase();
        let is_tool = match kind.as_str() {
            "TOOL" => true,
            "DRAWING" => false,
            "" => self.tool.is_some() || self.tool_id.is_some(),
            _ => return None,
        };

        if is_tool {
            let tool_id = self.tool.as_ref().map(|t| t.id).or(self.tool_id)?;
            let is_feed = self.text.as_deref() == Some(FEED_MARKER);
            let slot = if is_feed { PlacementSlot::feed(tool_id) } else { PlacementSlot::regular(tool_id) };
            let info = match catalog.get(tool_id) {
                Some(info) => info.clone(),
                None => self.tool.map_or_else(|| ToolInfo::fallback(tool_id), ToolDto::into_info),
            };
            let (default_w, default_h) = SizeClass::default().cells();
            return Some(MapItem {
                id: self.id,
                x: self.x,
                y: self.y,
                width: whole_cells(self.width, default_w),
                height: whole_cells(self.height, default_h),
                kind: ItemKind::Tool(ToolItem { slot, info }),
            });
        }

        Some(MapItem {
            id: self.id,
            x: self.x,
            y: self.y,
            width: whole_cells(self.width, DEFAULT_DRAWING_WIDTH),
            height: whole_cells(self.height, DEFAULT_DRAWING_HEIGHT),
            kind: ItemKind::Drawing(DrawingItem {
                text: self.text.unwrap_or_default(),
                color: DrawingColor::parse(self.color.as_deref().unwrap_or_default()),
                is_solid: self.is_solid,
            }),
        })
    }
}

/// Round a cell count from the wire; missing or sub-cell values use `fallback`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_cells(raw: Option<f64>, fallback: u32) -> u32 {
    match raw {
        Some(v) if v.is_finite() && v.round() >= 1.0 => v.round().min(f64::from(u32::MAX)) as u32,
        _ => fallback,
    }
}

/// An entry of `GET /api/map/available-tools`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableToolDto {
    pub id: ToolId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(rename = "type", default)]
    pub tool_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub regular_placed: bool,
    #[serde(default)]
    pub feed_placed: bool,
}

/// The available-tools endpoint answers either `{ "tools": [...] }` or a bare array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AvailableToolsResponse {
    Wrapped { tools: Vec<AvailableToolDto> },
    Bare(Vec<AvailableToolDto>),
}

impl AvailableToolsResponse {
    #[must_use]
    pub fn into_tools(self) -> Vec<AvailableToolDto> {
        match self {
            Self::Wrapped { tools } | Self::Bare(tools) => tools,
        }
    }
}

/// A tool record from the page bootstrap (`allToolsData`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogToolDto {
    pub id: ToolId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(rename = "type", default)]
    pub tool_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl From<CatalogToolDto> for ToolInfo {
    fn from(dto: CatalogToolDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name.unwrap_or_else(|| format!("Tool {}", dto.id)),
            model: dto.model.unwrap_or_default(),
            serial: dto.serial.unwrap_or_default(),
            tool_type: ToolType::parse(dto.tool_type.as_deref().unwrap_or_default()),
            status: dto.status.unwrap_or_default(),
        }
    }
}

// =============================================================
// Outbound
// =============================================================

/// Body of `POST /api/map/tool`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateToolRequest {
    pub tool_id: PlacementSlot,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Body of `POST /api/map/drawing` and `PUT /api/map/drawing/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingRequest {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub text: String,
    pub color: String,
    pub is_solid: bool,
}

/// Body of `PUT /api/map/{id}/position`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PositionRequest {
    pub x: i32,
    pub y: i32,
}

/// One entry of the `POST /api/map/save` snapshot. Tools omit their size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PositionSnapshot {
    pub id: ItemId,
    pub x: i32,
    pub y: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl PositionSnapshot {
    /// Snapshot an item at its floored cell position.
    #[must_use]
    pub fn of(item: &MapItem) -> Self {
        let (width, height) = if item.is_drawing() { (Some(item.width), Some(item.height)) } else { (None, None) };
        Self { id: item.id, x: item.cell_x(), y: item.cell_y(), width, height }
    }
}

// =============================================================
// Bootstrap globals
// =============================================================

/// Decode a bootstrap global that may be a JSON array or a JSON-encoded string
/// holding one. Anything else yields an empty list and a warning.
#[must_use]
pub fn parse_bootstrap_list<T: for<'de> Deserialize<'de>>(name: &str, value: Value) -> Vec<T> {
    let value = match value {
        Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
            Ok(inner) => inner,
            Err(e) => {
                tracing::warn!(global = name, error = %e, "bootstrap global is not valid JSON");
                return Vec::new();
            }
        },
        Value::Null => return Vec::new(),
        other => other,
    };

    let Value::Array(entries) = value else {
        tracing::warn!(global = name, "bootstrap global is not an array");
        return Vec::new();
    };

    let total = entries.len();
    let parsed: Vec<T> = entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(global = name, error = %e, "skipping malformed bootstrap entry");
                None
            }
        })
        .collect();
    tracing::debug!(global = name, total, parsed = parsed.len(), "bootstrap global decoded");
    parsed
}

/// Decode saved items from a raw JSON array, skipping malformed entries.
#[must_use]
pub fn items_from_value(value: Value, catalog: &ToolCatalog) -> Vec<MapItem> {
    parse_bootstrap_list::<SavedItemDto>("gridItems", value)
        .into_iter()
        .filter_map(|dto| {
            let id = dto.id;
            let item = dto.into_item(catalog);
            if item.is_none() {
                tracing::warn!(id, "skipping saved item with unknown type or missing tool");
            }
            item
        })
        .collect()
}

/// Decode the tool catalog from the `allToolsData` bootstrap global.
#[must_use]
pub fn catalog_from_value(value: Value) -> ToolCatalog {
    let tools = parse_bootstrap_list::<CatalogToolDto>("allToolsData", value);
    ToolCatalog::new(tools.into_iter().map(ToolInfo::from).collect())
}
