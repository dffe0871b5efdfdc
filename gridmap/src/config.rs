//! Grid and gesture configuration.
//!
//! Every field has a default matching [`crate::consts`], so a host page can
//! pass a partial JSON object (or nothing at all) and only override what it
//! needs.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use serde::Deserialize;

use crate::consts::{
    CELL_SIZE_PX, DEFAULT_ZOOM_INDEX, DOUBLE_TAP_MS, GRID_HEIGHT_CELLS, GRID_WIDTH_CELLS, HOLD_TO_PAN_MS,
    MOUSE_MOVE_THRESHOLD_PX, TOUCH_MOVE_THRESHOLD_PX, ZOOM_LEVELS,
};

/// Errors produced while loading or validating a [`GridConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The JSON document could not be parsed.
    #[error("config parse failed: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds a value the editor cannot work with.
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Editor configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridConfig {
    /// Cell edge length in world pixels.
    pub cell_size: f64,
    /// Map width in cells.
    pub grid_width: u32,
    /// Map height in cells.
    pub grid_height: u32,
    /// Zoom scale factors, ascending.
    pub zoom_levels: Vec<f64>,
    /// Startup index into `zoom_levels`.
    pub default_zoom_index: usize,
    /// Hold-to-pan delay in milliseconds.
    pub hold_to_pan_ms: f64,
    /// Mouse movement threshold in screen pixels.
    pub mouse_threshold_px: f64,
    /// Touch movement threshold in screen pixels.
    pub touch_threshold_px: f64,
    /// Double-tap window in milliseconds.
    pub double_tap_ms: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size: CELL_SIZE_PX,
            grid_width: GRID_WIDTH_CELLS,
            grid_height: GRID_HEIGHT_CELLS,
            zoom_levels: ZOOM_LEVELS.to_vec(),
            default_zoom_index: DEFAULT_ZOOM_INDEX,
            hold_to_pan_ms: HOLD_TO_PAN_MS,
            mouse_threshold_px: MOUSE_MOVE_THRESHOLD_PX,
            touch_threshold_px: TOUCH_MOVE_THRESHOLD_PX,
            double_tap_ms: DOUBLE_TAP_MS,
        }
    }
}

impl GridConfig {
    /// Parse a (possibly partial) JSON config and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::Invalid`] when validation fails.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the values describe a usable grid.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(invalid("cellSize", "must be a positive number"));
        }
        if self.grid_width == 0 || self.grid_height == 0 {
            return Err(invalid("gridWidth/gridHeight", "must be at least one cell"));
        }
        if self.zoom_levels.is_empty() {
            return Err(invalid("zoomLevels", "must not be empty"));
        }
        if self.zoom_levels.iter().any(|z| !(z.is_finite() && *z > 0.0)) {
            return Err(invalid("zoomLevels", "every level must be a positive number"));
        }
        if self.zoom_levels.windows(2).any(|w| w[0] >= w[1]) {
            return Err(invalid("zoomLevels", "levels must be strictly ascending"));
        }
        if self.default_zoom_index >= self.zoom_levels.len() {
            return Err(invalid("defaultZoomIndex", "out of range for zoomLevels"));
        }
        if self.hold_to_pan_ms < 0.0 || self.double_tap_ms < 0.0 {
            return Err(invalid("holdToPanMs/doubleTapMs", "must not be negative"));
        }
        if self.mouse_threshold_px < 0.0 || self.touch_threshold_px < 0.0 {
            return Err(invalid("mouseThresholdPx/touchThresholdPx", "must not be negative"));
        }
        Ok(())
    }

    /// Full map width in world pixels.
    #[must_use]
    pub fn world_width(&self) -> f64 {
        f64::from(self.grid_width) * self.cell_size
    }

    /// Full map height in world pixels.
    #[must_use]
    pub fn world_height(&self) -> f64 {
        f64::from(self.grid_height) * self.cell_size
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field, reason: reason.to_owned() }
}
