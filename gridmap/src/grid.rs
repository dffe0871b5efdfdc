//! Grid layer: line layout for the entire logical extent.
//!
//! Lines cover the whole map rather than the visible window so panning (a
//! pure transform) never reveals an undrawn region. The layer is rebuilt on
//! load, resize and zoom; `generation` counts those rebuilds.

#[cfg(test)]
#[path = "grid_test.rs"]
mod grid_test;

use crate::camera::Point;
use crate::config::GridConfig;
use crate::consts::{EMPHASIS_EVERY, GRID_EMPHASIS_WIDTH, GRID_LINE_WIDTH};

/// Stroke color for all grid lines.
pub const GRID_LINE_COLOR: &str = "#ddd";

/// One grid line in world pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLine {
    pub from: Point,
    pub to: Point,
    pub width: f64,
}

impl GridLine {
    /// Whether this is a heavier counting line.
    #[must_use]
    pub fn is_emphasis(&self) -> bool {
        self.width >= GRID_EMPHASIS_WIDTH
    }
}

/// Cached grid lines plus a rebuild counter.
#[derive(Debug, Clone, Default)]
pub struct GridLayer {
    lines: Vec<GridLine>,
    generation: u64,
}

impl GridLayer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild every line for the grid described by `config`.
    pub fn redraw(&mut self, config: &GridConfig) {
        self.lines = layout_lines(config);
        self.generation += 1;
    }

    #[must_use]
    pub fn lines(&self) -> &[GridLine] {
        &self.lines
    }

    /// Number of rebuilds since construction.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Horizontal lines first (top to bottom), then vertical lines (left to right).
#[must_use]
pub fn layout_lines(config: &GridConfig) -> Vec<GridLine> {
    let total_w = config.world_width();
    let total_h = config.world_height();
    let cell = config.cell_size;

    let horizontal = (0..=config.grid_height).map(|i| {
        let y = f64::from(i) * cell;
        GridLine { from: Point::new(0.0, y), to: Point::new(total_w, y), width: line_width(i) }
    });
    let vertical = (0..=config.grid_width).map(|i| {
        let x = f64::from(i) * cell;
        GridLine { from: Point::new(x, 0.0), to: Point::new(x, total_h), width: line_width(i) }
    });

    horizontal.chain(vertical).collect()
}

fn line_width(index: u32) -> f64 {
    if index % EMPHASIS_EVERY == 0 {
        GRID_EMPHASIS_WIDTH
    } else {
        GRID_LINE_WIDTH
    }
}
