//! Document model: placed map items, the tool catalog, and the in-memory store.
//!
//! This module defines what sits on the facility map (`MapItem`, a tagged
//! variant of tool placements and drawing annotations), the identity of a
//! tool's placement slot (`PlacementSlot`, regular or feed), the tool records
//! used for labels and tooltips (`ToolInfo`, `ToolCatalog`), and the runtime
//! store that owns all live items (`ItemStore`).
//!
//! Positions and sizes are in grid cells. Sizes are whole cells; positions
//! may land on half cells after arrow-key nudges and are floored when they
//! cross the wire.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::HashMap;
use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::camera::Rect;

/// Server-assigned identifier of a placed map item.
pub type ItemId = i64;

/// Identifier of an external tool record.
pub type ToolId = i64;

/// Wire suffix marking the feed placement slot of a tool.
pub const FEED_SUFFIX: &str = "_FEED";

/// Marker the backend stores in a feed placement's `text` field.
pub const FEED_MARKER: &str = "FEED";

// =============================================================
// Placement slots
// =============================================================

/// Which of a tool's placement slots an item occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SlotVariant {
    /// The tool itself.
    #[default]
    Regular,
    /// The feed side of a tool whose name ends in `D`.
    Feed,
}

/// A tool placement identity: one tool may occupy each variant at most once.
///
/// On the wire the feed slot is spelled `"<toolId>_FEED"`; inside the crate it
/// stays a typed pair so it can never collide with a genuine numeric id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlacementSlot {
    pub tool_id: ToolId,
    pub variant: SlotVariant,
}

impl PlacementSlot {
    #[must_use]
    pub fn regular(tool_id: ToolId) -> Self {
        Self { tool_id, variant: SlotVariant::Regular }
    }

    #[must_use]
    pub fn feed(tool_id: ToolId) -> Self {
        Self { tool_id, variant: SlotVariant::Feed }
    }

    #[must_use]
    pub fn is_feed(&self) -> bool {
        self.variant == SlotVariant::Feed
    }

    /// Parse `"12"` or `"12_FEED"`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (base, variant) = match raw.strip_suffix(FEED_SUFFIX) {
            Some(base) => (base, SlotVariant::Feed),
            None => (raw, SlotVariant::Regular),
        };
        match base.parse::<ToolId>() {
            Ok(tool_id) => Some(Self { tool_id, variant }),
            Err(_) => None,
        }
    }
}

impl fmt::Display for PlacementSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.variant {
            SlotVariant::Regular => write!(f, "{}", self.tool_id),
            SlotVariant::Feed => write!(f, "{}{FEED_SUFFIX}", self.tool_id),
        }
    }
}

impl Serialize for PlacementSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.variant {
            SlotVariant::Regular => serializer.serialize_i64(self.tool_id),
            SlotVariant::Feed => serializer.collect_str(self),
        }
    }
}

impl<'de> Deserialize<'de> for PlacementSlot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SlotVisitor;

        impl Visitor<'_> for SlotVisitor {
            type Value = PlacementSlot;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a tool id number or a \"<id>_FEED\" string")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(PlacementSlot::regular(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                i64::try_from(v)
                    .map(PlacementSlot::regular)
                    .map_err(|_| E::custom("tool id out of range"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                PlacementSlot::parse(v).ok_or_else(|| E::custom(format!("invalid placement slot `{v}`")))
            }
        }

        deserializer.deserialize_any(SlotVisitor)
    }
}

// =============================================================
// Tools
// =============================================================

/// Tool classification; only drives color theming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolType {
    Chemblend,
    Slurry,
    #[default]
    Other,
}

impl ToolType {
    /// Case-insensitive parse of the backend's enum name; unknown types are `Other`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "CHEMBLEND" => Self::Chemblend,
            "SLURRY" => Self::Slurry,
            _ => Self::Other,
        }
    }
}

/// Display data for an external tool record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolInfo {
    pub id: ToolId,
    pub name: String,
    pub model: String,
    pub serial: String,
    pub tool_type: ToolType,
    pub status: String,
}

impl ToolInfo {
    /// Placeholder used when neither the catalog nor the payload names the tool.
    #[must_use]
    pub fn fallback(id: ToolId) -> Self {
        Self { id, name: format!("Tool {id}"), ..Self::default() }
    }
}

/// Whether a tool name qualifies for a feed variant (ends in `D`).
#[must_use]
pub fn has_feed_variant(name: &str) -> bool {
    name.chars().last().is_some_and(|c| c.eq_ignore_ascii_case(&'d'))
}

/// The feed display name: trailing `D` replaced by `F`.
///
/// Names without a trailing `D` are returned unchanged.
#[must_use]
pub fn feed_name(name: &str) -> String {
    if has_feed_variant(name) {
        let mut out = name[..name.len() - 1].to_owned();
        out.push('F');
        out
    } else {
        name.to_owned()
    }
}

/// Tool records supplied by the host page, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: HashMap<ToolId, ToolInfo>,
}

impl ToolCatalog {
    #[must_use]
    pub fn new(tools: Vec<ToolInfo>) -> Self {
        Self { tools: tools.into_iter().map(|t| (t.id, t)).collect() }
    }

    #[must_use]
    pub fn get(&self, id: ToolId) -> Option<&ToolInfo> {
        self.tools.get(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// =============================================================
// Items
// =============================================================

/// Annotation palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DrawingColor {
    #[default]
    Black,
    Blue,
    Green,
    Red,
    Yellow,
}

impl DrawingColor {
    pub const ALL: [Self; 5] = [Self::Black, Self::Blue, Self::Green, Self::Red, Self::Yellow];

    /// Parse a palette name; anything unrecognized is black.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "blue" => Self::Blue,
            "green" => Self::Green,
            "red" => Self::Red,
            "yellow" => Self::Yellow,
            _ => Self::Black,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Black => "black",
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Red => "red",
            Self::Yellow => "yellow",
        }
    }
}

/// A tool placed on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolItem {
    pub slot: PlacementSlot,
    pub info: ToolInfo,
}

impl ToolItem {
    /// Name shown on the map; feed placements swap the trailing `D` for `F`.
    #[must_use]
    pub fn display_name(&self) -> String {
        if self.slot.is_feed() {
            feed_name(&self.info.name)
        } else {
            self.info.name.clone()
        }
    }
}

/// A free-form annotation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DrawingItem {
    pub text: String,
    pub color: DrawingColor,
    pub is_solid: bool,
}

/// What a map item is.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemKind {
    Tool(ToolItem),
    Drawing(DrawingItem),
}

/// A placed entity on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapItem {
    pub id: ItemId,
    /// Left edge in cells.
    pub x: f64,
    /// Top edge in cells.
    pub y: f64,
    /// Width in cells, at least 1.
    pub width: u32,
    /// Height in cells, at least 1.
    pub height: u32,
    pub kind: ItemKind,
}

impl MapItem {
    #[must_use]
    pub fn is_tool(&self) -> bool {
        matches!(self.kind, ItemKind::Tool(_))
    }

    #[must_use]
    pub fn is_drawing(&self) -> bool {
        matches!(self.kind, ItemKind::Drawing(_))
    }

    /// Placement slot, for tool items.
    #[must_use]
    pub fn slot(&self) -> Option<PlacementSlot> {
        match &self.kind {
            ItemKind::Tool(tool) => Some(tool.slot),
            ItemKind::Drawing(_) => None,
        }
    }

    /// Persisted left edge: live half-cell positions are floored.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn cell_x(&self) -> i32 {
        self.x.floor() as i32
    }

    /// Persisted top edge: live half-cell positions are floored.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn cell_y(&self) -> i32 {
        self.y.floor() as i32
    }

    /// Footprint in cells.
    #[must_use]
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Bounding box in world pixels.
    #[must_use]
    pub fn bounds(&self, cell_size: f64) -> Rect {
        Rect::new(
            self.x * cell_size,
            self.y * cell_size,
            f64::from(self.width) * cell_size,
            f64::from(self.height) * cell_size,
        )
    }
}

/// In-memory store of map items.
#[derive(Debug, Clone, Default)]
pub struct ItemStore {
    items: HashMap<ItemId, MapItem>,
}

impl ItemStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an item.
    pub fn insert(&mut self, item: MapItem) {
        self.items.insert(item.id, item);
    }

    /// Remove an item by id, returning it if it was present.
    pub fn remove(&mut self, id: ItemId) -> Option<MapItem> {
        self.items.remove(&id)
    }

    #[must_use]
    pub fn get(&self, id: ItemId) -> Option<&MapItem> {
        self.items.get(&id)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut MapItem> {
        self.items.get_mut(&id)
    }

    /// Replace all items with a freshly loaded set.
    pub fn load(&mut self, items: Vec<MapItem>) {
        self.items.clear();
        for item in items {
            self.items.insert(item.id, item);
        }
    }

    /// All items in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &MapItem> {
        self.items.values()
    }

    /// The item occupying `slot`, if any.
    #[must_use]
    pub fn by_slot(&self, slot: PlacementSlot) -> Option<&MapItem> {
        self.items.values().find(|item| item.slot() == Some(slot))
    }

    /// Item ids bottom-to-top: largest footprint first so smaller items are
    /// never hidden behind larger ones. Ties break by id for stability.
    #[must_use]
    pub fn draw_order(&self) -> Vec<ItemId> {
        let mut items: Vec<&MapItem> = self.items.values().collect();
        items.sort_by(|a, b| b.area().cmp(&a.area()).then_with(|| a.id.cmp(&b.id)));
        items.into_iter().map(|item| item.id).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
