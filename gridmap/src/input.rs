//! Input model: editor modes, pointer kinds, keys, and the gesture state.
//!
//! `Mode` is the editor's standing intent, changed only by the toolbar.
//! `GesturePhase` is the gesture being tracked between pointer-down and
//! pointer-up. A press starts out `Pending` while the engine decides whether
//! it is a click, a drag or a pan; panning and dragging are separate variants
//! of one enum so they can never be active together.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::camera::Point;
use crate::doc::ItemId;

/// Editor mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Inspect tools: click selects, second click navigates.
    #[default]
    Select,
    /// Move and edit items.
    Edit,
    /// Place a tool preview.
    AddTool,
    /// Place a drawing preview.
    Draw,
}

impl Mode {
    /// Parse a toolbar mode name (`select`, `edit`, `add-tool`, `draw`).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "select" => Some(Self::Select),
            "edit" => Some(Self::Edit),
            "add-tool" | "add_tool" | "addtool" => Some(Self::AddTool),
            "draw" => Some(Self::Draw),
            _ => None,
        }
    }

    /// Whether this mode places a preview.
    #[must_use]
    pub fn is_placing(self) -> bool {
        matches!(self, Self::AddTool | Self::Draw)
    }

    /// Cursor shown while idle in this mode.
    #[must_use]
    pub fn cursor(self) -> CursorStyle {
        match self {
            Self::Select | Self::Edit => CursorStyle::Default,
            Self::AddTool => CursorStyle::Cell,
            Self::Draw => CursorStyle::Crosshair,
        }
    }
}

/// Source of a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerKind {
    #[default]
    Mouse,
    Touch,
}

/// Keys the engine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
}

impl Key {
    /// Map a browser `KeyboardEvent.key` value.
    #[must_use]
    pub fn from_dom(raw: &str) -> Option<Self> {
        match raw {
            "ArrowUp" => Some(Self::ArrowUp),
            "ArrowDown" => Some(Self::ArrowDown),
            "ArrowLeft" => Some(Self::ArrowLeft),
            "ArrowRight" => Some(Self::ArrowRight),
            _ => None,
        }
    }

    /// Unit direction `(dx, dy)` in cells.
    #[must_use]
    pub fn direction(self) -> (f64, f64) {
        match self {
            Self::ArrowUp => (0.0, -1.0),
            Self::ArrowDown => (0.0, 1.0),
            Self::ArrowLeft => (-1.0, 0.0),
            Self::ArrowRight => (1.0, 0.0),
        }
    }
}

/// CSS cursor the host should apply to the canvas container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorStyle {
    #[default]
    Default,
    Grabbing,
    Pointer,
    Cell,
    Crosshair,
}

impl CursorStyle {
    #[must_use]
    pub fn as_css(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Grabbing => "grabbing",
            Self::Pointer => "pointer",
            Self::Cell => "cell",
            Self::Crosshair => "crosshair",
        }
    }
}

/// Gesture tracked between pointer-down and pointer-up.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GesturePhase {
    /// No gesture in progress.
    #[default]
    Idle,
    /// A press on an item that has not yet become a click, drag or pan.
    Pending {
        /// Item under the press.
        item: ItemId,
        /// Screen position of the press, for the movement threshold.
        origin: Point,
        /// Pointer kind of the press, for the threshold size.
        kind: PointerKind,
        /// Time (ms) after which the press escalates to a pan. `None` when
        /// the press can only become a drag.
        escalate_at: Option<f64>,
        /// Pointer offset inside the item (world px) when the press may drag.
        drag_offset: Option<Point>,
    },
    /// The viewport follows the pointer.
    Panning {
        /// Screen position of the previous pointer event.
        last: Point,
    },
    /// An item follows the pointer, snapped to the grid.
    Dragging {
        id: ItemId,
        /// Pointer offset inside the item in world pixels.
        offset: Point,
    },
}

impl GesturePhase {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    #[must_use]
    pub fn is_panning(&self) -> bool {
        matches!(self, Self::Panning { .. })
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(self, Self::Dragging { .. })
    }

    /// Whether a pending press has passed its hold deadline at `now_ms`.
    #[must_use]
    pub fn hold_expired(&self, now_ms: f64) -> bool {
        match self {
            Self::Pending { escalate_at: Some(deadline), .. } => now_ms >= *deadline,
            _ => false,
        }
    }
}

/// Most recent touch tap, for double-tap detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LastTap {
    pub item: ItemId,
    pub at_ms: f64,
}

impl LastTap {
    /// Whether a tap on `item` at `now_ms` completes a double tap.
    #[must_use]
    pub fn is_double(&self, item: ItemId, now_ms: f64, window_ms: f64) -> bool {
        self.item == item && now_ms - self.at_ms <= window_ms
    }
}
