//! Shared numeric defaults for the grid editor.

// ── Grid ────────────────────────────────────────────────────────

/// Edge length of one grid cell in world pixels at zoom 1.0.
pub const CELL_SIZE_PX: f64 = 20.0;

/// Number of cells across the facility map.
pub const GRID_WIDTH_CELLS: u32 = 100;

/// Number of cells down the facility map.
pub const GRID_HEIGHT_CELLS: u32 = 50;

/// Every n-th grid line is drawn heavier to aid counting.
pub const EMPHASIS_EVERY: u32 = 5;

/// Stroke width of a regular grid line.
pub const GRID_LINE_WIDTH: f64 = 0.5;

/// Stroke width of an emphasized grid line.
pub const GRID_EMPHASIS_WIDTH: f64 = 1.0;

// ── Zoom ────────────────────────────────────────────────────────

/// Discrete zoom scale factors, smallest first.
pub const ZOOM_LEVELS: [f64; 5] = [0.7, 0.85, 1.0, 1.15, 1.3];

/// Index into [`ZOOM_LEVELS`] used at startup (scale 1.0).
pub const DEFAULT_ZOOM_INDEX: usize = 2;

// ── Gestures ────────────────────────────────────────────────────

/// A press held this long on an item without a decision becomes a pan.
pub const HOLD_TO_PAN_MS: f64 = 200.0;

/// Mouse movement (Manhattan, screen px) that turns a press into a pan or drag.
pub const MOUSE_MOVE_THRESHOLD_PX: f64 = 4.0;

/// Touch movement threshold; larger because fingers are imprecise.
pub const TOUCH_MOVE_THRESHOLD_PX: f64 = 10.0;

/// Two taps on the same drawing within this window open its editor.
pub const DOUBLE_TAP_MS: f64 = 300.0;

/// Arrow keys nudge the selected item by this fraction of a cell.
pub const NUDGE_CELLS: f64 = 0.5;

/// Tooltip offset from the pointer, screen px.
pub const TOOLTIP_OFFSET_PX: f64 = 10.0;

// ── Previews ────────────────────────────────────────────────────

/// Opacity of a placement preview.
pub const PREVIEW_OPACITY: f64 = 0.7;

/// Drawing width used when the form leaves it blank.
pub const DEFAULT_DRAWING_WIDTH: u32 = 4;

/// Drawing height used when the form leaves it blank.
pub const DEFAULT_DRAWING_HEIGHT: u32 = 3;
