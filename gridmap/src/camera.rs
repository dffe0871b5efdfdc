//! Viewport: pan offset, discrete zoom, and coordinate conversions.
//!
//! Three coordinate spaces are in play. *Screen* points are CSS pixels relative
//! to the canvas element. *World* points are unscaled map pixels with the
//! origin at the top-left corner of the grid. *Cell* coordinates are world
//! coordinates divided by the cell size; they are what crosses the wire.

#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use crate::config::GridConfig;

/// A point in either screen or world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to `other`; the gesture thresholds use this metric.
    #[must_use]
    pub fn manhattan(self, other: Point) -> f64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

/// Axis-aligned rectangle in world pixels, origin at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Inclusive containment test.
    #[must_use]
    pub fn contains(&self, pt: Point) -> bool {
        pt.x >= self.x && pt.x <= self.x + self.width && pt.y >= self.y && pt.y <= self.y + self.height
    }

    #[must_use]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Pan/zoom transform.
///
/// `pan_x` / `pan_y` are in CSS pixels and never positive once clamped.
/// `zoom` is a scale factor (1.0 = no zoom).
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub pan_x: f64,
    pub pan_y: f64,
    pub zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self { pan_x: 0.0, pan_y: 0.0, zoom: 1.0 }
    }
}

impl Camera {
    /// Convert a screen-space point (CSS pixels) to world coordinates.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point {
            x: (screen.x - self.pan_x) / self.zoom,
            y: (screen.y - self.pan_y) / self.zoom,
        }
    }

    /// Convert a world-space point to screen coordinates (CSS pixels).
    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Point {
        Point {
            x: world.x * self.zoom + self.pan_x,
            y: world.y * self.zoom + self.pan_y,
        }
    }
}

/// The viewport onto the facility map.
///
/// Owns the camera, the discrete zoom ladder and the viewport size, and keeps
/// the pan offset inside the grid extent after every change.
#[derive(Debug, Clone)]
pub struct Stage {
    camera: Camera,
    zoom_levels: Vec<f64>,
    zoom_index: usize,
    viewport_width: f64,
    viewport_height: f64,
    world_width: f64,
    world_height: f64,
}

impl Stage {
    /// Build a stage for the grid described by `config`, with an empty viewport.
    #[must_use]
    pub fn new(config: &GridConfig) -> Self {
        let zoom_index = config.default_zoom_index.min(config.zoom_levels.len().saturating_sub(1));
        let zoom = config.zoom_levels.get(zoom_index).copied().unwrap_or(1.0);
        Self {
            camera: Camera { pan_x: 0.0, pan_y: 0.0, zoom },
            zoom_levels: config.zoom_levels.clone(),
            zoom_index,
            viewport_width: 0.0,
            viewport_height: 0.0,
            world_width: config.world_width(),
            world_height: config.world_height(),
        }
    }

    /// Current camera transform.
    #[must_use]
    pub fn camera(&self) -> Camera {
        self.camera
    }

    /// Current zoom scale factor.
    #[must_use]
    pub fn zoom(&self) -> f64 {
        self.camera.zoom
    }

    /// Current index into the zoom ladder.
    #[must_use]
    pub fn zoom_index(&self) -> usize {
        self.zoom_index
    }

    /// Viewport size in CSS pixels.
    #[must_use]
    pub fn viewport_size(&self) -> (f64, f64) {
        (self.viewport_width, self.viewport_height)
    }

    /// Step one level up the zoom ladder. Returns `false` at the top.
    pub fn zoom_in(&mut self) -> bool {
        if self.zoom_index + 1 >= self.zoom_levels.len() {
            return false;
        }
        self.zoom_index += 1;
        self.apply_zoom();
        true
    }

    /// Step one level down the zoom ladder. Returns `false` at the bottom.
    pub fn zoom_out(&mut self) -> bool {
        if self.zoom_index == 0 {
            return false;
        }
        self.zoom_index -= 1;
        self.apply_zoom();
        true
    }

    fn apply_zoom(&mut self) {
        if let Some(&zoom) = self.zoom_levels.get(self.zoom_index) {
            self.camera.zoom = zoom;
        }
        self.clamp_pan();
    }

    /// Track the container's client size.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport_width = width.max(0.0);
        self.viewport_height = height.max(0.0);
        self.clamp_pan();
    }

    /// Pan by a screen-space delta, clamped to the grid extent.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.camera.pan_x += dx;
        self.camera.pan_y += dy;
        self.clamp_pan();
    }

    /// Lowest allowed pan offsets `(min_x, min_y)`; the highest is always 0.
    ///
    /// When the scaled grid is smaller than the viewport the bound collapses
    /// to 0 and the grid stays pinned to the top-left corner.
    #[must_use]
    pub fn pan_min(&self) -> (f64, f64) {
        let min_x = (self.viewport_width - self.world_width * self.camera.zoom).min(0.0);
        let min_y = (self.viewport_height - self.world_height * self.camera.zoom).min(0.0);
        (min_x, min_y)
    }

    fn clamp_pan(&mut self) {
        let (min_x, min_y) = self.pan_min();
        self.camera.pan_x = self.camera.pan_x.max(min_x).min(0.0);
        self.camera.pan_y = self.camera.pan_y.max(min_y).min(0.0);
    }

    /// Convert a screen point to world pixels under the current pan and zoom.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Point {
        self.camera.screen_to_world(screen)
    }

    /// Convert a world point to screen pixels under the current pan and zoom.
    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Point {
        self.camera.world_to_screen(world)
    }
}

/// Cell containing a world point, as fractional cell units (not floored).
#[must_use]
pub fn world_to_cell(world: Point, cell_size: f64) -> Point {
    Point::new(world.x / cell_size, world.y / cell_size)
}
