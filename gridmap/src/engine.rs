//! Interaction engine for the facility map.
//!
//! [`EngineCore`] is the whole editor state machine: it owns the stage, the
//! grid layer, the item store, the scene and every piece of interaction
//! state, and turns host events (pointer, wheel, keys, timer ticks, toolbar
//! and dialog results) into [`Action`]s. It never performs I/O. Network
//! actions are executed by [`crate::session::MapSession`], which reports the
//! outcome back through the `complete_*` methods.
//!
//! [`Engine`] wraps the core with the browser canvas and a clock.
//!
//! DESIGN
//! ======
//! Timestamps are supplied by the caller in milliseconds, so the hold-to-pan
//! deadline is plain data: it is checked on every event and on `on_timer`,
//! and disappears with the gesture on release or mode change.
//!
//! Unsaved changes are tracked as a revision counter. Every local mutation
//! bumps `revision`; a save snapshot carries the revision it captured and
//! its completion only clears the flag if nothing changed since.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::collections::{HashMap, HashSet};

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::camera::{Point, Stage};
use crate::config::GridConfig;
use crate::consts::{NUDGE_CELLS, PREVIEW_OPACITY, TOOLTIP_OFFSET_PX};
use crate::doc::{ItemId, ItemKind, ItemStore, MapItem, PlacementSlot, ToolCatalog, ToolId, ToolInfo, ToolItem};
use crate::grid::GridLayer;
use crate::input::{CursorStyle, GesturePhase, Key, LastTap, Mode, PointerKind};
use crate::placement::{DrawingForm, Preview, PreviewKind, SizeClass, ToolPicker};
use crate::scene::{RetainedScene, SceneGraph, SceneKey, Shape};
use crate::style::{LABEL_FONT_PX, ShapeStyle, Theme, drawing_style, format_tool_label, tool_style};
use crate::wire::{AvailableToolDto, CreateToolRequest, DrawingRequest, PositionSnapshot, SavedItemDto};

/// Alert shown when the backend rejects a tool placement.
pub const TOOL_PLACEMENT_FAILED: &str = "Failed to place tool. It may already be on the map.";
/// Alert shown when the backend rejects a drawing placement.
pub const DRAWING_PLACEMENT_FAILED: &str = "Failed to place drawing.";
/// Alert shown when a drawing edit fails.
pub const DRAWING_UPDATE_FAILED: &str = "Failed to update drawing.";
/// Alert shown when a delete fails.
pub const DELETE_FAILED: &str = "Failed to delete item.";

/// Actions returned from handlers for the host (or the session) to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // ── Network ─────────────────────────────────────────────────
    CreateTool(CreateToolRequest),
    CreateDrawing(DrawingRequest),
    UpdateDrawing { id: ItemId, request: DrawingRequest },
    DeleteItem { id: ItemId },
    SaveState { revision: u64, items: Vec<PositionSnapshot> },
    RefreshAvailableTools,

    // ── Host UI ─────────────────────────────────────────────────
    OpenToolPicker,
    ToolPickerUpdated,
    OpenDrawingForm(DrawingForm),
    EditDrawingRequested { id: ItemId, form: DrawingForm },
    ConfirmDeleteRequested { id: ItemId },
    Navigate { tool_id: ToolId },
    Alert(String),
    SetCursor(CursorStyle),
    ShowTooltip { info: ToolInfo, at: Point },
    HideTooltip,
    UnsavedChanged(bool),
    DeleteEnabled(bool),
    RenderNeeded,
}

impl Action {
    /// Whether the action needs the backend.
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::CreateTool(_)
                | Self::CreateDrawing(_)
                | Self::UpdateDrawing { .. }
                | Self::DeleteItem { .. }
                | Self::SaveState { .. }
                | Self::RefreshAvailableTools
        )
    }
}

/// Core engine state: everything that does not depend on the canvas element.
///
/// Generic over the scene graph so tests can inspect a [`RetainedScene`]
/// directly.
pub struct EngineCore<S: SceneGraph = RetainedScene> {
    config: GridConfig,
    stage: Stage,
    grid: GridLayer,
    store: ItemStore,
    catalog: ToolCatalog,
    picker: ToolPicker,
    scene: S,
    mode: Mode,
    gesture: GesturePhase,
    selection: Option<ItemId>,
    preview: Option<Preview>,
    last_tap: Option<LastTap>,
    last_pointer: Option<Point>,
    cursor: CursorStyle,
    tooltip_for: Option<ItemId>,
    theme: Theme,
    tool_filter: Option<HashSet<ToolId>>,
    revision: u64,
    saved_revision: u64,
    in_flight: HashSet<ItemId>,
    pending_edits: HashMap<ItemId, DrawingForm>,
}

impl EngineCore<RetainedScene> {
    #[must_use]
    pub fn new(config: GridConfig) -> Self {
        Self::with_scene(config, RetainedScene::new())
    }
}

impl Default for EngineCore<RetainedScene> {
    fn default() -> Self {
        Self::new(GridConfig::default())
    }
}

impl<S: SceneGraph> EngineCore<S> {
    /// Build an engine drawing into `scene`.
    pub fn with_scene(config: GridConfig, scene: S) -> Self {
        let stage = Stage::new(&config);
        let mut grid = GridLayer::new();
        grid.redraw(&config);
        Self {
            config,
            stage,
            grid,
            store: ItemStore::new(),
            catalog: ToolCatalog::default(),
            picker: ToolPicker::new(),
            scene,
            mode: Mode::Select,
            gesture: GesturePhase::Idle,
            selection: None,
            preview: None,
            last_tap: None,
            last_pointer: None,
            cursor: CursorStyle::Default,
            tooltip_for: None,
            theme: Theme::Light,
            tool_filter: None,
            revision: 0,
            saved_revision: 0,
            in_flight: HashSet::new(),
            pending_edits: HashMap::new(),
        }
    }

    // --- Data inputs ---

    /// Replace the tool catalog used for labels and tooltips.
    pub fn set_catalog(&mut self, catalog: ToolCatalog) {
        tracing::debug!(tools = catalog.len(), "tool catalog loaded");
        self.catalog = catalog;
    }

    /// Replace every item on the map with a freshly loaded set.
    pub fn load_items(&mut self, items: Vec<MapItem>) -> Vec<Action> {
        let mut actions = Vec::new();
        self.deselect(&mut actions);
        self.hide_tooltip(&mut actions);
        self.gesture = GesturePhase::Idle;
        for id in self.store.draw_order() {
            self.scene.destroy_group(SceneKey::Item(id));
        }
        self.store.load(items);
        for id in self.store.draw_order() {
            self.build_item_group(id);
        }
        self.apply_z_order();
        self.grid.redraw(&self.config);
        tracing::info!(items = self.store.len(), "map items loaded");
        self.request_render(&mut actions);
        actions
    }

    /// Decode and load saved items from the backend, skipping bad entries.
    pub fn load_saved(&mut self, dtos: Vec<SavedItemDto>) -> Vec<Action> {
        let items = dtos
            .into_iter()
            .filter_map(|dto| {
                let id = dto.id;
                let item = dto.into_item(&self.catalog);
                if item.is_none() {
                    tracing::warn!(id, "skipping saved item with unknown type or missing tool");
                }
                item
            })
            .collect();
        self.load_items(items)
    }

    // --- Mode ---

    /// Switch modes. Saves pending changes first, then resets selection,
    /// preview and gesture, and asks the host for the mode's dialog.
    pub fn set_mode(&mut self, mode: Mode) -> Vec<Action> {
        let mut actions = Vec::new();
        if let Some(save) = self.save_action() {
            actions.push(save);
        }
        self.mode = mode;
        self.deselect(&mut actions);
        self.destroy_preview();
        self.gesture = GesturePhase::Idle;
        self.last_tap = None;
        self.hide_tooltip(&mut actions);
        self.set_cursor(mode.cursor(), &mut actions);

        match mode {
            Mode::AddTool => {
                actions.push(Action::OpenToolPicker);
                if self.picker.begin_refresh() {
                    actions.push(Action::RefreshAvailableTools);
                }
            }
            Mode::Draw => actions.push(Action::OpenDrawingForm(DrawingForm::default())),
            Mode::Select | Mode::Edit => {}
        }
        tracing::debug!(?mode, "mode changed");
        self.request_render(&mut actions);
        actions
    }

    /// Start following the pointer with a preview of `slot` at `size`.
    pub fn begin_tool_preview(&mut self, slot: PlacementSlot, size: SizeClass) -> Vec<Action> {
        if self.mode != Mode::AddTool {
            return Vec::new();
        }
        if self.store.by_slot(slot).is_some() {
            tracing::warn!(%slot, "tool slot already on the map");
            return vec![Action::Alert(TOOL_PLACEMENT_FAILED.to_owned())];
        }
        let Some(choice) = self.picker.find(slot).cloned() else {
            tracing::warn!(%slot, "tool slot not offered by the picker");
            return Vec::new();
        };
        self.install_preview(Preview::new(PreviewKind::Tool { choice, size }))
    }

    /// Start following the pointer with a drawing preview built from `form`.
    pub fn begin_drawing_preview(&mut self, form: DrawingForm) -> Vec<Action> {
        if self.mode != Mode::Draw {
            return Vec::new();
        }
        self.install_preview(Preview::new(PreviewKind::Drawing(form.normalized())))
    }

    fn install_preview(&mut self, mut preview: Preview) -> Vec<Action> {
        if let Some(screen) = self.last_pointer {
            preview.track(self.stage.screen_to_world(screen), self.config.cell_size);
        }
        self.preview = Some(preview);
        self.build_preview_group();
        let mut actions = Vec::new();
        self.request_render(&mut actions);
        actions
    }

    // --- Pointer input ---

    /// Pointer pressed at `screen` (CSS px relative to the canvas).
    pub fn on_pointer_down(&mut self, screen: Point, kind: PointerKind, now_ms: f64) -> Vec<Action> {
        let mut actions = self.on_timer(now_ms);
        self.last_pointer = Some(screen);

        if self.mode.is_placing() {
            self.confirm_preview(screen, &mut actions);
            return actions;
        }

        let world = self.stage.screen_to_world(screen);
        let hit = match self.scene.hit_test(world) {
            Some(SceneKey::Item(id)) => self.store.get(id).map(|item| (id, item.is_drawing(), item.bounds(self.config.cell_size))),
            Some(SceneKey::Preview) | None => None,
        };
        let Some((id, is_drawing, bounds)) = hit else {
            self.start_pan(screen, &mut actions);
            return actions;
        };

        let deadline = Some(now_ms + self.config.hold_to_pan_ms);
        match self.mode {
            Mode::Select if is_drawing => self.start_pan(screen, &mut actions),
            Mode::Select => self.gesture = pending(id, screen, kind, deadline, None),
            Mode::Edit if self.selection == Some(id) => {
                let offset = Point::new(world.x - bounds.x, world.y - bounds.y);
                self.gesture = pending(id, screen, kind, None, Some(offset));
            }
            Mode::Edit => self.gesture = pending(id, screen, kind, deadline, None),
            Mode::AddTool | Mode::Draw => {}
        }
        actions
    }

    /// Pointer moved to `screen`.
    pub fn on_pointer_move(&mut self, screen: Point, kind: PointerKind, now_ms: f64) -> Vec<Action> {
        let mut actions = self.on_timer(now_ms);
        self.last_pointer = Some(screen);

        match self.gesture {
            GesturePhase::Pending { item, origin, kind: press_kind, drag_offset, .. } => {
                let threshold = match press_kind {
                    PointerKind::Mouse => self.config.mouse_threshold_px,
                    PointerKind::Touch => self.config.touch_threshold_px,
                };
                if screen.manhattan(origin) > threshold {
                    match drag_offset {
                        Some(offset) if self.mode == Mode::Edit && self.selection == Some(item) => {
                            self.gesture = GesturePhase::Dragging { id: item, offset };
                            self.set_cursor(CursorStyle::Grabbing, &mut actions);
                            self.drag_to(item, screen, offset, &mut actions);
                        }
                        _ => {
                            self.start_pan(origin, &mut actions);
                            self.pan_to(screen, &mut actions);
                        }
                    }
                }
            }
            GesturePhase::Panning { .. } => self.pan_to(screen, &mut actions),
            GesturePhase::Dragging { id, offset } => self.drag_to(id, screen, offset, &mut actions),
            GesturePhase::Idle => self.hover(screen, kind, &mut actions),
        }
        actions
    }

    /// Pointer released at `screen`.
    pub fn on_pointer_up(&mut self, screen: Point, kind: PointerKind, now_ms: f64) -> Vec<Action> {
        let mut actions = self.on_timer(now_ms);
        self.last_pointer = Some(screen);

        let phase = std::mem::take(&mut self.gesture);
        if let GesturePhase::Pending { item, .. } = phase {
            self.click(item, kind, now_ms, &mut actions);
        }
        if !self.mode.is_placing() {
            self.set_cursor(self.mode.cursor(), &mut actions);
        }
        if self.selection.is_some() {
            self.apply_z_order();
            self.request_render(&mut actions);
        }
        actions
    }

    /// Clock tick: escalates a held press to a pan once its deadline passes.
    pub fn on_timer(&mut self, now_ms: f64) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.gesture.hold_expired(now_ms) {
            if let GesturePhase::Pending { origin, .. } = self.gesture {
                let last = self.last_pointer.unwrap_or(origin);
                self.start_pan(last, &mut actions);
            }
        }
        actions
    }

    /// Wheel: scrolling up zooms in, anything else zooms out.
    pub fn on_wheel(&mut self, delta_y: f64) -> Vec<Action> {
        if delta_y < 0.0 { self.zoom_in() } else { self.zoom_out() }
    }

    /// Arrow keys nudge the selected item by half a cell in edit mode.
    pub fn on_key_down(&mut self, key: Key) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.mode != Mode::Edit {
            return actions;
        }
        let Some(id) = self.selection else {
            return actions;
        };
        let (dx, dy) = key.direction();
        let cell = self.config.cell_size;
        let Some(item) = self.store.get_mut(id) else {
            return actions;
        };
        item.x += dx * NUDGE_CELLS;
        item.y += dy * NUDGE_CELLS;
        let origin = Point::new(item.x * cell, item.y * cell);
        self.scene.move_group(SceneKey::Item(id), origin);
        self.mark_dirty(&mut actions);
        self.request_render(&mut actions);
        actions
    }

    // --- Viewport ---

    pub fn zoom_in(&mut self) -> Vec<Action> {
        let changed = self.stage.zoom_in();
        self.after_zoom(changed)
    }

    pub fn zoom_out(&mut self) -> Vec<Action> {
        let changed = self.stage.zoom_out();
        self.after_zoom(changed)
    }

    fn after_zoom(&mut self, changed: bool) -> Vec<Action> {
        let mut actions = Vec::new();
        if changed {
            tracing::debug!(zoom = self.stage.zoom(), "zoom changed");
            self.grid.redraw(&self.config);
            self.request_render(&mut actions);
        }
        actions
    }

    /// Track the container size.
    pub fn resize(&mut self, width: f64, height: f64) -> Vec<Action> {
        let mut actions = Vec::new();
        self.stage.resize(width, height);
        self.grid.redraw(&self.config);
        self.request_render(&mut actions);
        actions
    }

    // --- Theme and filter ---

    /// Recolor tools for the page theme.
    pub fn set_theme(&mut self, theme: Theme) -> Vec<Action> {
        self.theme = theme;
        self.restyle_all()
    }

    /// Dim every tool outside `visible`; `None` clears the filter.
    pub fn set_tool_filter(&mut self, visible: Option<HashSet<ToolId>>) -> Vec<Action> {
        self.tool_filter = visible;
        self.restyle_all()
    }

    fn restyle_all(&mut self) -> Vec<Action> {
        for id in self.store.draw_order() {
            self.build_item_group(id);
        }
        if self.preview.is_some() {
            self.build_preview_group();
        }
        self.apply_z_order();
        let mut actions = Vec::new();
        self.request_render(&mut actions);
        actions
    }

    // --- Dialog results ---

    /// Ask the host to edit a drawing.
    pub fn open_drawing_editor(&mut self, id: ItemId) -> Vec<Action> {
        match self.store.get(id).and_then(DrawingForm::from_item) {
            Some(form) => vec![Action::EditDrawingRequested { id, form }],
            None => Vec::new(),
        }
    }

    /// Submit the edit dialog for drawing `id`.
    pub fn submit_drawing_edit(&mut self, id: ItemId, form: DrawingForm) -> Vec<Action> {
        let Some(item) = self.store.get(id).filter(|item| item.is_drawing()) else {
            tracing::warn!(id, "edit submitted for unknown drawing");
            return Vec::new();
        };
        if self.in_flight.contains(&id) {
            tracing::warn!(id, "refusing drawing update while a request is in flight");
            return Vec::new();
        }
        let form = form.normalized();
        let request = form.request(item.cell_x(), item.cell_y());
        self.in_flight.insert(id);
        self.pending_edits.insert(id, form);
        vec![Action::UpdateDrawing { id, request }]
    }

    /// Toolbar delete: ask the host to confirm.
    pub fn request_delete(&mut self) -> Vec<Action> {
        match self.selection {
            Some(id) => vec![Action::ConfirmDeleteRequested { id }],
            None => Vec::new(),
        }
    }

    /// Host confirmed deleting `id`.
    pub fn confirm_delete(&mut self, id: ItemId) -> Vec<Action> {
        if self.store.get(id).is_none() {
            return Vec::new();
        }
        if !self.in_flight.insert(id) {
            tracing::warn!(id, "refusing delete while a request is in flight");
            return Vec::new();
        }
        vec![Action::DeleteItem { id }]
    }

    /// Toolbar save.
    pub fn save(&mut self) -> Vec<Action> {
        self.save_action().into_iter().collect()
    }

    fn save_action(&self) -> Option<Action> {
        if !self.has_unsaved_changes() {
            return None;
        }
        let mut items: Vec<PositionSnapshot> = self.store.iter().map(PositionSnapshot::of).collect();
        items.sort_by_key(|s| s.id);
        Some(Action::SaveState { revision: self.revision, items })
    }

    // --- Network completions ---

    /// Outcome of a `CreateTool` request; `None` when it failed.
    pub fn complete_tool_placement(&mut self, created: Option<SavedItemDto>) -> Vec<Action> {
        let choice = match self.preview.as_ref().map(|p| &p.kind) {
            Some(PreviewKind::Tool { choice, .. }) => Some(choice.clone()),
            _ => None,
        };
        let placed = created.and_then(|dto| dto.into_item(&self.catalog)).and_then(|mut item| {
            let ItemKind::Tool(tool) = &mut item.kind else {
                return None;
            };
            if let Some(choice) = &choice {
                tool.slot = choice.slot;
                if self.catalog.get(choice.slot.tool_id).is_none() {
                    tool.info = choice.info();
                }
            }
            Some(item)
        });

        let Some(item) = placed else {
            tracing::warn!("tool placement failed");
            let mut actions = vec![Action::Alert(TOOL_PLACEMENT_FAILED.to_owned())];
            actions.extend(self.set_mode(Mode::Select));
            return actions;
        };

        if let Some(slot) = item.slot() {
            self.picker.remove(slot);
            tracing::info!(id = item.id, %slot, "tool placed");
        }
        let mut actions = self.finish_placement(item);
        if self.picker.begin_refresh() {
            actions.push(Action::RefreshAvailableTools);
        }
        actions
    }

    /// Outcome of a `CreateDrawing` request; `None` when it failed.
    pub fn complete_drawing_placement(&mut self, created: Option<SavedItemDto>) -> Vec<Action> {
        let form = match self.preview.as_ref().map(|p| &p.kind) {
            Some(PreviewKind::Drawing(form)) => Some(form.clone()),
            _ => None,
        };
        let placed = created.and_then(|dto| dto.into_item(&self.catalog)).filter(MapItem::is_drawing);
        let Some(mut item) = placed else {
            tracing::warn!("drawing placement failed");
            let mut actions = vec![Action::Alert(DRAWING_PLACEMENT_FAILED.to_owned())];
            actions.extend(self.set_mode(Mode::Select));
            return actions;
        };
        if let (Some(form), ItemKind::Drawing(drawing)) = (form, &mut item.kind) {
            if drawing.text.is_empty() && !form.text.is_empty() {
                *drawing = form.drawing();
            }
        }
        tracing::info!(id = item.id, "drawing placed");
        self.finish_placement(item)
    }

    fn finish_placement(&mut self, item: MapItem) -> Vec<Action> {
        let id = item.id;
        self.destroy_preview();
        self.store.insert(item);
        self.build_item_group(id);
        let mut actions = self.set_mode(Mode::Select);
        self.apply_z_order();
        self.mark_dirty(&mut actions);
        self.request_render(&mut actions);
        actions
    }

    /// Outcome of an `UpdateDrawing` request.
    pub fn complete_drawing_update(&mut self, id: ItemId, ok: bool) -> Vec<Action> {
        self.in_flight.remove(&id);
        let form = self.pending_edits.remove(&id);
        if !ok {
            tracing::warn!(id, "drawing update failed");
            return vec![Action::Alert(DRAWING_UPDATE_FAILED.to_owned())];
        }
        let mut actions = Vec::new();
        let Some(form) = form else {
            return actions;
        };
        let Some(item) = self.store.get_mut(id) else {
            return actions;
        };
        item.width = form.width;
        item.height = form.height;
        if let ItemKind::Drawing(drawing) = &mut item.kind {
            *drawing = form.drawing();
        }
        self.build_item_group(id);
        self.apply_z_order();
        self.mark_dirty(&mut actions);
        self.request_render(&mut actions);
        actions
    }

    /// Outcome of a `DeleteItem` request.
    pub fn complete_delete(&mut self, id: ItemId, ok: bool) -> Vec<Action> {
        self.in_flight.remove(&id);
        if !ok {
            tracing::warn!(id, "delete failed");
            return vec![Action::Alert(DELETE_FAILED.to_owned())];
        }
        let mut actions = Vec::new();
        if self.selection == Some(id) {
            self.deselect(&mut actions);
        }
        if self.tooltip_for == Some(id) {
            self.hide_tooltip(&mut actions);
        }
        if matches!(self.gesture, GesturePhase::Pending { item, .. } | GesturePhase::Dragging { id: item, .. } if item == id)
        {
            self.gesture = GesturePhase::Idle;
        }
        self.pending_edits.remove(&id);
        if self.store.remove(id).is_some() {
            self.scene.destroy_group(SceneKey::Item(id));
            tracing::info!(id, "item deleted");
        }
        self.apply_z_order();
        self.mark_dirty(&mut actions);
        self.request_render(&mut actions);
        actions
    }

    /// Outcome of a `SaveState` request for the snapshot taken at `revision`.
    pub fn complete_save(&mut self, revision: u64, ok: bool) -> Vec<Action> {
        let mut actions = Vec::new();
        if !ok {
            tracing::warn!(revision, "map save failed; changes remain unsaved");
            return actions;
        }
        let was_dirty = self.has_unsaved_changes();
        self.saved_revision = self.saved_revision.max(revision);
        if was_dirty && !self.has_unsaved_changes() {
            actions.push(Action::UnsavedChanged(false));
        }
        tracing::debug!(revision, pending = self.has_unsaved_changes(), "map saved");
        actions
    }

    /// Outcome of a `RefreshAvailableTools` request; `None` when it failed.
    pub fn complete_tool_refresh(&mut self, tools: Option<Vec<AvailableToolDto>>) -> Vec<Action> {
        match tools {
            Some(tools) => {
                self.picker.finish_refresh(&tools);
                tracing::debug!(choices = self.picker.choices().len(), "tool picker refreshed");
                vec![Action::ToolPickerUpdated]
            }
            None => {
                tracing::warn!("available tools failed to load; picker emptied");
                self.picker.abort_refresh();
                vec![Action::ToolPickerUpdated]
            }
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn selection(&self) -> Option<ItemId> {
        self.selection
    }

    #[must_use]
    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    #[must_use]
    pub fn gesture(&self) -> GesturePhase {
        self.gesture
    }

    #[must_use]
    pub fn cursor(&self) -> CursorStyle {
        self.cursor
    }

    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.revision != self.saved_revision
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn item(&self, id: ItemId) -> Option<&MapItem> {
        self.store.get(id)
    }

    #[must_use]
    pub fn store(&self) -> &ItemStore {
        &self.store
    }

    #[must_use]
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    #[must_use]
    pub fn grid(&self) -> &GridLayer {
        &self.grid
    }

    #[must_use]
    pub fn scene(&self) -> &S {
        &self.scene
    }

    #[must_use]
    pub fn picker(&self) -> &ToolPicker {
        &self.picker
    }

    #[must_use]
    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    #[must_use]
    pub fn theme(&self) -> Theme {
        self.theme
    }

    // --- Gestures ---

    fn start_pan(&mut self, screen: Point, actions: &mut Vec<Action>) {
        self.gesture = GesturePhase::Panning { last: screen };
        self.set_cursor(CursorStyle::Grabbing, actions);
    }

    fn pan_to(&mut self, screen: Point, actions: &mut Vec<Action>) {
        let GesturePhase::Panning { last } = self.gesture else {
            return;
        };
        self.stage.pan_by(screen.x - last.x, screen.y - last.y);
        self.gesture = GesturePhase::Panning { last: screen };
        self.request_render(actions);
    }

    #[allow(clippy::float_cmp)]
    fn drag_to(&mut self, id: ItemId, screen: Point, offset: Point, actions: &mut Vec<Action>) {
        let cell = self.config.cell_size;
        let world = self.stage.screen_to_world(screen);
        let (x, y) = crate::placement::snap_round(world, offset, cell);
        let Some(item) = self.store.get_mut(id) else {
            return;
        };
        if item.x == x && item.y == y {
            return;
        }
        item.x = x;
        item.y = y;
        self.scene.move_group(SceneKey::Item(id), Point::new(x * cell, y * cell));
        self.mark_dirty(actions);
        self.request_render(actions);
    }

    fn click(&mut self, id: ItemId, kind: PointerKind, now_ms: f64, actions: &mut Vec<Action>) {
        let Some(item) = self.store.get(id) else {
            return;
        };
        let is_drawing = item.is_drawing();
        let tool_id = item.slot().map(|slot| slot.tool_id);

        match self.mode {
            Mode::Select => {
                if self.selection == Some(id) {
                    if let Some(tool_id) = tool_id {
                        actions.push(Action::Navigate { tool_id });
                    }
                } else if !is_drawing {
                    self.select(id, actions);
                }
            }
            Mode::Edit => {
                if self.selection == Some(id) && is_drawing {
                    actions.extend(self.open_drawing_editor(id));
                    return;
                }
                self.select(id, actions);
                if kind == PointerKind::Touch && is_drawing {
                    let double = self.last_tap.is_some_and(|tap| tap.is_double(id, now_ms, self.config.double_tap_ms));
                    if double {
                        actions.extend(self.open_drawing_editor(id));
                    }
                    self.last_tap = Some(LastTap { item: id, at_ms: now_ms });
                }
            }
            Mode::AddTool | Mode::Draw => {}
        }
    }

    #[allow(clippy::float_cmp)]
    fn hover(&mut self, screen: Point, kind: PointerKind, actions: &mut Vec<Action>) {
        let world = self.stage.screen_to_world(screen);
        match self.mode {
            Mode::Select => {
                let hovered = match self.scene.hit_test(world) {
                    Some(SceneKey::Item(id)) => self.store.get(id).and_then(|item| match &item.kind {
                        ItemKind::Tool(tool) => Some((id, tooltip_info(tool))),
                        ItemKind::Drawing(_) => None,
                    }),
                    _ => None,
                };
                match hovered {
                    Some((id, info)) if kind == PointerKind::Mouse => {
                        self.tooltip_for = Some(id);
                        let at = Point::new(screen.x + TOOLTIP_OFFSET_PX, screen.y + TOOLTIP_OFFSET_PX);
                        actions.push(Action::ShowTooltip { info, at });
                    }
                    _ => self.hide_tooltip(actions),
                }
            }
            Mode::Edit => {
                let over_item = matches!(self.scene.hit_test(world), Some(SceneKey::Item(_)));
                let cursor = if over_item { CursorStyle::Pointer } else { CursorStyle::Default };
                self.set_cursor(cursor, actions);
            }
            Mode::AddTool | Mode::Draw => {
                let cell = self.config.cell_size;
                let Some(preview) = self.preview.as_mut().filter(|p| !p.submitted) else {
                    return;
                };
                let before = (preview.x, preview.y);
                preview.track(world, cell);
                if before != (preview.x, preview.y) {
                    let origin = Point::new(preview.x * cell, preview.y * cell);
                    self.scene.move_group(SceneKey::Preview, origin);
                    self.request_render(actions);
                }
            }
        }
    }

    fn confirm_preview(&mut self, screen: Point, actions: &mut Vec<Action>) {
        let world = self.stage.screen_to_world(screen);
        let cell = self.config.cell_size;
        let Some(preview) = self.preview.as_mut().filter(|p| !p.submitted) else {
            return;
        };
        preview.track(world, cell);
        preview.submitted = true;
        let origin = Point::new(preview.x * cell, preview.y * cell);
        let request = match &preview.kind {
            PreviewKind::Tool { .. } => preview.tool_request().map(Action::CreateTool),
            PreviewKind::Drawing(_) => preview.drawing_request().map(Action::CreateDrawing),
        };
        self.scene.move_group(SceneKey::Preview, origin);
        actions.extend(request);
    }

    // --- Selection ---

    fn select(&mut self, id: ItemId, actions: &mut Vec<Action>) {
        if self.selection == Some(id) {
            return;
        }
        let previous = self.selection.replace(id);
        if let Some(prev) = previous {
            self.build_item_group(prev);
        }
        self.build_item_group(id);
        self.apply_z_order();
        if previous.is_none() {
            actions.push(Action::DeleteEnabled(true));
        }
        self.request_render(actions);
    }

    fn deselect(&mut self, actions: &mut Vec<Action>) {
        if let Some(id) = self.selection.take() {
            self.build_item_group(id);
            self.apply_z_order();
            actions.push(Action::DeleteEnabled(false));
        }
    }

    // --- Bookkeeping ---

    fn mark_dirty(&mut self, actions: &mut Vec<Action>) {
        let was_dirty = self.has_unsaved_changes();
        self.revision += 1;
        if !was_dirty {
            actions.push(Action::UnsavedChanged(true));
        }
    }

    fn set_cursor(&mut self, cursor: CursorStyle, actions: &mut Vec<Action>) {
        if self.cursor != cursor {
            self.cursor = cursor;
            actions.push(Action::SetCursor(cursor));
        }
    }

    fn hide_tooltip(&mut self, actions: &mut Vec<Action>) {
        if self.tooltip_for.take().is_some() {
            actions.push(Action::HideTooltip);
        }
    }

    fn request_render(&mut self, actions: &mut Vec<Action>) {
        if !actions.contains(&Action::RenderNeeded) {
            self.scene.batch_redraw();
            actions.push(Action::RenderNeeded);
        }
    }

    fn destroy_preview(&mut self) {
        if self.preview.take().is_some() {
            self.scene.destroy_group(SceneKey::Preview);
        }
    }

    fn apply_z_order(&mut self) {
        let order: Vec<SceneKey> = self.store.draw_order().into_iter().map(SceneKey::Item).collect();
        self.scene.set_z_order(&order);
    }

    // --- Scene building ---

    fn item_style(&self, item: &MapItem) -> ShapeStyle {
        let selected = self.selection == Some(item.id);
        match &item.kind {
            ItemKind::Tool(tool) => {
                let dimmed = self.tool_filter.as_ref().is_some_and(|visible| !visible.contains(&tool.slot.tool_id));
                tool_style(tool.info.tool_type, self.theme, selected, dimmed)
            }
            ItemKind::Drawing(drawing) => drawing_style(drawing, selected),
        }
    }

    fn build_item_group(&mut self, id: ItemId) {
        let Some(item) = self.store.get(id) else {
            return;
        };
        let cell = self.config.cell_size;
        let style = self.item_style(item);
        let label = match &item.kind {
            ItemKind::Tool(tool) => format_tool_label(&tool.display_name()),
            ItemKind::Drawing(drawing) => drawing.text.clone(),
        };
        let bounds = item.bounds(cell);
        let key = SceneKey::Item(id);
        self.scene.create_group(key, Point::new(bounds.x, bounds.y));
        add_body(&mut self.scene, key, bounds.width, bounds.height, style, label);
    }

    fn build_preview_group(&mut self) {
        let Some(preview) = &self.preview else {
            return;
        };
        let cell = self.config.cell_size;
        let (w, h) = preview.size();
        let (width, height) = (f64::from(w) * cell, f64::from(h) * cell);
        let (style, label) = match &preview.kind {
            PreviewKind::Tool { choice, .. } => {
                (tool_style(choice.tool_type, self.theme, false, false), format_tool_label(&choice.name))
            }
            PreviewKind::Drawing(form) => (drawing_style(&form.drawing(), false), form.text.clone()),
        };
        let origin = Point::new(preview.x * cell, preview.y * cell);
        self.scene.create_group(SceneKey::Preview, origin);
        add_body(&mut self.scene, SceneKey::Preview, width, height, style.with_opacity(PREVIEW_OPACITY), label);
    }
}

fn add_body<S: SceneGraph>(scene: &mut S, key: SceneKey, width: f64, height: f64, style: ShapeStyle, label: String) {
    scene.add_shape_to_group(key, Shape::Rect { width, height, style });
    if !label.is_empty() {
        scene.add_shape_to_group(
            key,
            Shape::Text { text: label, width, height, color: style.text, font_px: LABEL_FONT_PX },
        );
    }
}

fn pending(item: ItemId, origin: Point, kind: PointerKind, escalate_at: Option<f64>, drag_offset: Option<Point>) -> GesturePhase {
    GesturePhase::Pending { item, origin, kind, escalate_at, drag_offset }
}

/// Tooltip data for a placed tool; feed placements show the feed name.
fn tooltip_info(tool: &ToolItem) -> ToolInfo {
    ToolInfo { name: tool.display_name(), ..tool.info.clone() }
}

/// The full canvas engine. Wraps [`EngineCore`] with the browser canvas and clock.
pub struct Engine {
    canvas: HtmlCanvasElement,
    dpr: f64,
    pub core: EngineCore,
}

impl Engine {
    /// Create an engine bound to `canvas`.
    #[must_use]
    pub fn new(canvas: HtmlCanvasElement, config: GridConfig) -> Self {
        Self { canvas, dpr: 1.0, core: EngineCore::new(config) }
    }

    /// Update the viewport size (CSS px) and device pixel ratio, resizing the
    /// canvas backing store to match.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) -> Vec<Action> {
        self.dpr = dpr.max(1.0);
        self.canvas.set_width((width_css * self.dpr).round().max(0.0) as u32);
        self.canvas.set_height((height_css * self.dpr).round().max(0.0) as u32);
        self.core.resize(width_css, height_css)
    }

    pub fn on_pointer_down(&mut self, screen: Point, kind: PointerKind) -> Vec<Action> {
        self.core.on_pointer_down(screen, kind, js_sys::Date::now())
    }

    pub fn on_pointer_move(&mut self, screen: Point, kind: PointerKind) -> Vec<Action> {
        self.core.on_pointer_move(screen, kind, js_sys::Date::now())
    }

    pub fn on_pointer_up(&mut self, screen: Point, kind: PointerKind) -> Vec<Action> {
        self.core.on_pointer_up(screen, kind, js_sys::Date::now())
    }

    /// Call from an animation-frame or interval tick while a press is held.
    pub fn tick(&mut self) -> Vec<Action> {
        self.core.on_timer(js_sys::Date::now())
    }

    /// Draw the current state to the canvas.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the 2D context is unavailable or a draw call fails.
    pub fn render(&self) -> Result<(), JsValue> {
        let ctx = self
            .canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        let (width, height) = self.core.stage().viewport_size();
        crate::render::draw(
            &ctx,
            self.core.grid(),
            self.core.scene(),
            &self.core.stage().camera(),
            width,
            height,
            self.dpr,
        )
    }
}
