#![allow(clippy::clone_on_copy, clippy::float_cmp)]

use super::*;
use crate::doc::{DrawingColor, DrawingItem, ToolType};
use crate::style::DIMMED_OPACITY;

// =============================================================
// Helpers
// =============================================================

const TOOL_ID: ItemId = 1;
const DRAWING_ID: ItemId = 2;

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn core() -> EngineCore {
    let mut core = EngineCore::new(GridConfig::default());
    core.resize(800.0, 600.0);
    core
}

fn tool_at(id: ItemId, slot: PlacementSlot, x: f64, y: f64) -> MapItem {
    MapItem {
        id,
        x,
        y,
        width: 4,
        height: 2,
        kind: ItemKind::Tool(ToolItem {
            slot,
            info: ToolInfo {
                id: slot.tool_id,
                name: "RAK151D".into(),
                model: "Mirra".into(),
                serial: "SN-1".into(),
                tool_type: ToolType::Slurry,
                status: "ACTIVE".into(),
            },
        }),
    }
}

fn drawing_at(id: ItemId, x: f64, y: f64, width: u32, height: u32) -> MapItem {
    MapItem {
        id,
        x,
        y,
        width,
        height,
        kind: ItemKind::Drawing(DrawingItem { text: "Bay".into(), color: DrawingColor::Blue, is_solid: false }),
    }
}

/// A core with a tool at cell (2, 2) covering screen (40..120, 40..80) and a
/// drawing at cell (10, 10) covering screen (200..280, 200..260).
fn loaded() -> EngineCore {
    let mut core = core();
    core.load_items(vec![
        tool_at(TOOL_ID, PlacementSlot::regular(12), 2.0, 2.0),
        drawing_at(DRAWING_ID, 10.0, 10.0, 4, 3),
    ]);
    core
}

fn click(core: &mut EngineCore, at: Point, kind: PointerKind, now: f64) -> Vec<Action> {
    let mut actions = core.on_pointer_down(at, kind, now);
    actions.extend(core.on_pointer_up(at, kind, now + 10.0));
    actions
}

fn available(id: ToolId, name: &str) -> AvailableToolDto {
    AvailableToolDto {
        id,
        name: name.into(),
        model: Some("Mirra".into()),
        serial: Some(format!("SN-{id}")),
        tool_type: Some("SLURRY".into()),
        ..AvailableToolDto::default()
    }
}

fn saved_tool(id: ItemId, tool_id: ToolId, x: f64, y: f64, w: f64, h: f64) -> SavedItemDto {
    SavedItemDto {
        id,
        item_type: Some("TOOL".into()),
        x,
        y,
        width: Some(w),
        height: Some(h),
        tool_id: Some(tool_id),
        ..SavedItemDto::default()
    }
}

fn saved_drawing(id: ItemId, x: f64, y: f64) -> SavedItemDto {
    SavedItemDto {
        id,
        item_type: Some("DRAWING".into()),
        x,
        y,
        width: Some(4.0),
        height: Some(3.0),
        ..SavedItemDto::default()
    }
}

fn has_action<F>(actions: &[Action], pred: F) -> bool
where
    F: Fn(&Action) -> bool,
{
    actions.iter().any(pred)
}

fn has_render_needed(actions: &[Action]) -> bool {
    has_action(actions, |a| matches!(a, Action::RenderNeeded))
}

fn body_style(core: &EngineCore, id: ItemId) -> ShapeStyle {
    let group = core.scene().group(SceneKey::Item(id)).unwrap();
    match &group.shapes[0] {
        Shape::Rect { style, .. } => *style,
        Shape::Text { .. } => panic!("first shape should be the body"),
    }
}

// =============================================================
// Defaults and loading
// =============================================================

#[test]
fn core_new_starts_in_select_mode() {
    let core = core();
    assert_eq!(core.mode(), Mode::Select);
    assert!(core.selection().is_none());
    assert!(core.preview().is_none());
    assert!(!core.has_unsaved_changes());
    assert_eq!(core.cursor(), CursorStyle::Default);
    assert_eq!(core.stage().zoom(), 1.0);
}

#[test]
fn core_new_lays_out_grid() {
    let core = core();
    assert!(core.grid().generation() > 0);
    assert!(!core.grid().lines().is_empty());
}

#[test]
fn load_items_builds_groups_largest_first() {
    let core = loaded();
    assert_eq!(core.store().len(), 2);
    assert_eq!(core.scene().order(), &[SceneKey::Item(DRAWING_ID), SceneKey::Item(TOOL_ID)]);
    let tool = core.scene().group(SceneKey::Item(TOOL_ID)).unwrap();
    assert_eq!(tool.origin, pt(40.0, 40.0));
    assert!(matches!(&tool.shapes[1], Shape::Text { text, .. } if text == "RAK\n151D"));
}

#[test]
fn load_items_replaces_previous_items() {
    let mut core = loaded();
    click(&mut core, pt(50.0, 50.0), PointerKind::Mouse, 0.0);
    let actions = core.load_items(vec![drawing_at(9, 0.0, 0.0, 2, 2)]);
    assert!(has_action(&actions, |a| matches!(a, Action::DeleteEnabled(false))));
    assert!(core.selection().is_none());
    assert_eq!(core.scene().len(), 1);
    assert!(core.scene().group(SceneKey::Item(TOOL_ID)).is_none());
    assert!(!core.has_unsaved_changes());
}

#[test]
fn load_saved_skips_unknown_types() {
    let mut core = core();
    let unknown = SavedItemDto { id: 7, item_type: Some("PIPE".into()), ..SavedItemDto::default() };
    core.load_saved(vec![saved_drawing(3, 0.0, 0.0), unknown]);
    assert_eq!(core.store().len(), 1);
    assert!(core.item(3).is_some());
}

// =============================================================
// Select mode
// =============================================================

#[test]
fn select_mode_click_selects_tool() {
    let mut core = loaded();
    let actions = click(&mut core, pt(50.0, 50.0), PointerKind::Mouse, 0.0);
    assert_eq!(core.selection(), Some(TOOL_ID));
    assert!(has_action(&actions, |a| matches!(a, Action::DeleteEnabled(true))));
    assert_eq!(body_style(&core, TOOL_ID).stroke, crate::style::SELECTED_STROKE);
    assert!(core.gesture().is_idle());
}

#[test]
fn select_mode_click_on_selected_tool_navigates() {
    let mut core = loaded();
    click(&mut core, pt(50.0, 50.0), PointerKind::Mouse, 0.0);
    let actions = click(&mut core, pt(60.0, 60.0), PointerKind::Mouse, 100.0);
    assert!(actions.contains(&Action::Navigate { tool_id: 12 }));
    assert_eq!(core.selection(), Some(TOOL_ID));
}

#[test]
fn select_mode_press_on_drawing_pans_immediately() {
    let mut core = loaded();
    let actions = core.on_pointer_down(pt(210.0, 210.0), PointerKind::Mouse, 0.0);
    assert!(core.gesture().is_panning());
    assert!(actions.contains(&Action::SetCursor(CursorStyle::Grabbing)));
    core.on_pointer_up(pt(210.0, 210.0), PointerKind::Mouse, 5.0);
    assert!(core.selection().is_none());
    assert_eq!(core.cursor(), CursorStyle::Default);
}

#[test]
fn press_on_empty_space_pans_viewport() {
    let mut core = loaded();
    core.on_pointer_down(pt(500.0, 400.0), PointerKind::Mouse, 0.0);
    assert!(core.gesture().is_panning());
    let actions = core.on_pointer_move(pt(450.0, 360.0), PointerKind::Mouse, 16.0);
    assert!(has_render_needed(&actions));
    assert_eq!(core.stage().camera().pan_x, -50.0);
    assert_eq!(core.stage().camera().pan_y, -40.0);
}

#[test]
fn pan_never_leaves_grid_extent() {
    let mut core = loaded();
    core.on_pointer_down(pt(500.0, 400.0), PointerKind::Mouse, 0.0);
    core.on_pointer_move(pt(700.0, 500.0), PointerKind::Mouse, 16.0);
    assert_eq!(core.stage().camera().pan_x, 0.0);
    core.on_pointer_move(pt(-5000.0, -5000.0), PointerKind::Mouse, 32.0);
    let (min_x, min_y) = core.stage().pan_min();
    assert_eq!(core.stage().camera().pan_x, min_x);
    assert_eq!(core.stage().camera().pan_y, min_y);
}

#[test]
fn hold_on_tool_escalates_to_pan() {
    let mut core = loaded();
    core.on_pointer_down(pt(50.0, 50.0), PointerKind::Mouse, 1000.0);
    assert!(core.on_timer(1199.0).is_empty());
    assert!(matches!(core.gesture(), GesturePhase::Pending { .. }));

    let actions = core.on_timer(1200.0);
    assert!(core.gesture().is_panning());
    assert!(actions.contains(&Action::SetCursor(CursorStyle::Grabbing)));

    core.on_pointer_up(pt(50.0, 50.0), PointerKind::Mouse, 1300.0);
    assert!(core.selection().is_none());
}

#[test]
fn small_mouse_movement_stays_a_click() {
    let mut core = loaded();
    core.on_pointer_down(pt(50.0, 50.0), PointerKind::Mouse, 0.0);
    core.on_pointer_move(pt(52.0, 52.0), PointerKind::Mouse, 10.0);
    assert!(matches!(core.gesture(), GesturePhase::Pending { .. }));
    core.on_pointer_up(pt(52.0, 52.0), PointerKind::Mouse, 20.0);
    assert_eq!(core.selection(), Some(TOOL_ID));
}

#[test]
fn movement_past_threshold_pans_from_press_origin() {
    let mut core = loaded();
    core.on_pointer_down(pt(50.0, 50.0), PointerKind::Mouse, 0.0);
    core.on_pointer_move(pt(45.0, 50.0), PointerKind::Mouse, 10.0);
    assert!(core.gesture().is_panning());
    assert_eq!(core.stage().camera().pan_x, -5.0);
}

#[test]
fn touch_threshold_is_larger() {
    let mut core = loaded();
    core.on_pointer_down(pt(50.0, 50.0), PointerKind::Touch, 0.0);
    core.on_pointer_move(pt(45.0, 50.0), PointerKind::Touch, 10.0);
    assert!(matches!(core.gesture(), GesturePhase::Pending { .. }));
    core.on_pointer_move(pt(39.0, 50.0), PointerKind::Touch, 20.0);
    assert!(core.gesture().is_panning());
}

#[test]
fn hover_shows_tooltip_with_offset() {
    let mut core = loaded();
    let actions = core.on_pointer_move(pt(50.0, 50.0), PointerKind::Mouse, 0.0);
    let shown = actions.iter().find_map(|a| match a {
        Action::ShowTooltip { info, at } => Some((info.clone(), *at)),
        _ => None,
    });
    let (info, at) = shown.unwrap();
    assert_eq!(info.name, "RAK151D");
    assert_eq!(at, pt(60.0, 60.0));

    let actions = core.on_pointer_move(pt(500.0, 500.0), PointerKind::Mouse, 10.0);
    assert!(actions.contains(&Action::HideTooltip));
}

#[test]
fn hover_tooltip_uses_feed_name() {
    let mut core = core();
    core.load_items(vec![tool_at(TOOL_ID, PlacementSlot::feed(12), 2.0, 2.0)]);
    let actions = core.on_pointer_move(pt(50.0, 50.0), PointerKind::Mouse, 0.0);
    assert!(has_action(&actions, |a| matches!(a, Action::ShowTooltip { info, .. } if info.name == "RAK151F")));
}

// =============================================================
// Edit mode
// =============================================================

#[test]
fn edit_mode_drag_snaps_to_whole_cells() {
    let mut core = loaded();
    core.set_mode(Mode::Edit);
    click(&mut core, pt(50.0, 50.0), PointerKind::Mouse, 0.0);
    assert_eq!(core.selection(), Some(TOOL_ID));

    core.on_pointer_down(pt(50.0, 50.0), PointerKind::Mouse, 100.0);
    // Selected item: no hold deadline.
    assert!(core.on_timer(10_000.0).is_empty());

    let actions = core.on_pointer_move(pt(95.0, 72.0), PointerKind::Mouse, 10_010.0);
    assert!(core.gesture().is_dragging());
    assert!(actions.contains(&Action::UnsavedChanged(true)));
    let item = core.item(TOOL_ID).unwrap();
    assert_eq!((item.x, item.y), (4.0, 3.0));
    assert_eq!(core.scene().group(SceneKey::Item(TOOL_ID)).unwrap().origin, pt(80.0, 60.0));

    core.on_pointer_up(pt(95.0, 72.0), PointerKind::Mouse, 10_020.0);
    assert!(core.gesture().is_idle());
    assert_eq!(core.cursor(), CursorStyle::Default);
}

#[test]
fn drag_without_cell_change_stays_clean() {
    let mut core = loaded();
    core.set_mode(Mode::Edit);
    click(&mut core, pt(50.0, 50.0), PointerKind::Mouse, 0.0);
    core.on_pointer_down(pt(50.0, 50.0), PointerKind::Mouse, 100.0);
    let actions = core.on_pointer_move(pt(56.0, 50.0), PointerKind::Mouse, 110.0);
    assert!(core.gesture().is_dragging());
    assert!(!actions.contains(&Action::UnsavedChanged(true)));
    assert!(!core.has_unsaved_changes());
}

#[test]
fn edit_mode_press_on_unselected_item_pans() {
    let mut core = loaded();
    core.set_mode(Mode::Edit);
    core.on_pointer_down(pt(50.0, 50.0), PointerKind::Mouse, 0.0);
    core.on_pointer_move(pt(40.0, 50.0), PointerKind::Mouse, 10.0);
    assert!(core.gesture().is_panning());
    assert_eq!(core.item(TOOL_ID).unwrap().x, 2.0);
}

#[test]
fn edit_mode_hover_shows_pointer_cursor() {
    let mut core = loaded();
    core.set_mode(Mode::Edit);
    let actions = core.on_pointer_move(pt(50.0, 50.0), PointerKind::Mouse, 0.0);
    assert!(actions.contains(&Action::SetCursor(CursorStyle::Pointer)));
    let actions = core.on_pointer_move(pt(500.0, 500.0), PointerKind::Mouse, 10.0);
    assert!(actions.contains(&Action::SetCursor(CursorStyle::Default)));
}

#[test]
fn edit_mode_click_on_selected_drawing_opens_editor() {
    let mut core = loaded();
    core.set_mode(Mode::Edit);
    click(&mut core, pt(210.0, 210.0), PointerKind::Mouse, 0.0);
    assert_eq!(core.selection(), Some(DRAWING_ID));

    let actions = click(&mut core, pt(210.0, 210.0), PointerKind::Mouse, 1000.0);
    let form = actions.iter().find_map(|a| match a {
        Action::EditDrawingRequested { id, form } if *id == DRAWING_ID => Some(form.clone()),
        _ => None,
    });
    let form = form.unwrap();
    assert_eq!(form.text, "Bay");
    assert_eq!((form.width, form.height), (4, 3));
    assert_eq!(form.color, DrawingColor::Blue);
}

fn opens_editor(actions: &[Action]) -> bool {
    has_action(actions, |a| matches!(a, Action::EditDrawingRequested { id, .. } if *id == DRAWING_ID))
}

#[test]
fn touch_second_tap_on_selected_drawing_opens_editor() {
    let mut core = loaded();
    core.set_mode(Mode::Edit);
    let first = click(&mut core, pt(210.0, 210.0), PointerKind::Touch, 0.0);
    assert!(!opens_editor(&first));
    let second = click(&mut core, pt(212.0, 210.0), PointerKind::Touch, 150.0);
    assert!(opens_editor(&second));
}

#[test]
fn touch_double_tap_within_window_opens_editor() {
    let mut core = loaded();
    core.set_mode(Mode::Edit);
    click(&mut core, pt(210.0, 210.0), PointerKind::Touch, 0.0);
    click(&mut core, pt(50.0, 50.0), PointerKind::Touch, 50.0);
    assert_eq!(core.selection(), Some(TOOL_ID));

    let actions = click(&mut core, pt(210.0, 210.0), PointerKind::Touch, 150.0);
    assert_eq!(core.selection(), Some(DRAWING_ID));
    assert!(opens_editor(&actions));
}

#[test]
fn touch_taps_outside_window_only_select() {
    let mut core = loaded();
    core.set_mode(Mode::Edit);
    click(&mut core, pt(210.0, 210.0), PointerKind::Touch, 0.0);
    click(&mut core, pt(50.0, 50.0), PointerKind::Touch, 50.0);

    let actions = click(&mut core, pt(210.0, 210.0), PointerKind::Touch, 500.0);
    assert_eq!(core.selection(), Some(DRAWING_ID));
    assert!(!opens_editor(&actions));
}

#[test]
fn arrow_keys_nudge_half_a_cell() {
    let mut core = loaded();
    core.set_mode(Mode::Edit);
    click(&mut core, pt(50.0, 50.0), PointerKind::Mouse, 0.0);
    let actions = core.on_key_down(Key::ArrowRight);
    assert!(actions.contains(&Action::UnsavedChanged(true)));
    core.on_key_down(Key::ArrowUp);
    let item = core.item(TOOL_ID).unwrap();
    assert_eq!((item.x, item.y), (2.5, 1.5));

    let Some(Action::SaveState { items, .. }) = core.save().pop() else {
        panic!("expected save");
    };
    let snap = items.iter().find(|s| s.id == TOOL_ID).unwrap();
    assert_eq!((snap.x, snap.y), (2, 1));
}

#[test]
fn arrow_keys_ignored_outside_edit_mode() {
    let mut core = loaded();
    click(&mut core, pt(50.0, 50.0), PointerKind::Mouse, 0.0);
    assert!(core.on_key_down(Key::ArrowLeft).is_empty());
    assert_eq!(core.item(TOOL_ID).unwrap().x, 2.0);
}

// =============================================================
// Modes
// =============================================================

#[test]
fn mode_switch_saves_and_resets() {
    let mut core = loaded();
    core.set_mode(Mode::Edit);
    click(&mut core, pt(50.0, 50.0), PointerKind::Mouse, 0.0);
    core.on_key_down(Key::ArrowDown);

    let actions = core.set_mode(Mode::Select);
    let save = actions.iter().find_map(|a| match a {
        Action::SaveState { revision, items } => Some((*revision, items.len())),
        _ => None,
    });
    assert_eq!(save, Some((core.revision(), 2)));
    assert!(actions.contains(&Action::DeleteEnabled(false)));
    assert!(core.selection().is_none());
    assert!(core.gesture().is_idle());
}

#[test]
fn clean_mode_switch_does_not_save() {
    let mut core = loaded();
    let actions = core.set_mode(Mode::Edit);
    assert!(!has_action(&actions, |a| matches!(a, Action::SaveState { .. })));
}

#[test]
fn add_tool_mode_opens_picker_and_refreshes_once() {
    let mut core = loaded();
    let actions = core.set_mode(Mode::AddTool);
    assert!(actions.contains(&Action::SetCursor(CursorStyle::Cell)));
    assert!(actions.contains(&Action::OpenToolPicker));
    assert!(actions.contains(&Action::RefreshAvailableTools));

    let again = core.set_mode(Mode::AddTool);
    assert!(again.contains(&Action::OpenToolPicker));
    assert!(!again.contains(&Action::RefreshAvailableTools));
}

#[test]
fn draw_mode_opens_blank_form() {
    let mut core = core();
    let actions = core.set_mode(Mode::Draw);
    assert!(actions.contains(&Action::SetCursor(CursorStyle::Crosshair)));
    assert!(actions.contains(&Action::OpenDrawingForm(DrawingForm::default())));
}

#[test]
fn mode_switch_discards_preview() {
    let mut core = core();
    core.set_mode(Mode::Draw);
    core.begin_drawing_preview(DrawingForm::default());
    assert!(core.scene().group(SceneKey::Preview).is_some());
    core.set_mode(Mode::Edit);
    assert!(core.preview().is_none());
    assert!(core.scene().group(SceneKey::Preview).is_none());
}

// =============================================================
// Tool placement
// =============================================================

fn add_tool_ready() -> EngineCore {
    let mut core = core();
    core.set_mode(Mode::AddTool);
    let actions = core.complete_tool_refresh(Some(vec![available(12, "RAK151D")]));
    assert_eq!(actions, vec![Action::ToolPickerUpdated]);
    core
}

#[test]
fn tool_refresh_expands_feed_variant() {
    let core = add_tool_ready();
    assert_eq!(core.picker().choices().len(), 2);
    assert!(!core.picker().is_refreshing());
}

#[test]
fn failed_refresh_empties_picker_and_releases_guard() {
    let mut core = add_tool_ready();
    assert_eq!(core.picker().choices().len(), 2);
    core.set_mode(Mode::Select);
    core.set_mode(Mode::AddTool);
    assert!(core.picker().is_refreshing());

    let actions = core.complete_tool_refresh(None);
    assert_eq!(actions, vec![Action::ToolPickerUpdated]);
    assert!(core.picker().choices().is_empty());
    assert!(!core.picker().is_refreshing());
}

#[test]
fn refresh_lists_slots_the_backend_reports_free() {
    let mut core = core();
    core.load_items(vec![tool_at(TOOL_ID, PlacementSlot::regular(12), 0.0, 0.0)]);
    core.set_mode(Mode::AddTool);
    core.complete_tool_refresh(Some(vec![available(12, "RAK151D")]));
    assert!(core.picker().find(PlacementSlot::regular(12)).is_some());
    assert!(core.picker().find(PlacementSlot::feed(12)).is_some());
}

#[test]
fn tool_preview_follows_pointer_snapped_to_cell() {
    let mut core = add_tool_ready();
    core.begin_tool_preview(PlacementSlot::feed(12), SizeClass::W3H3);
    let actions = core.on_pointer_move(pt(65.0, 41.0), PointerKind::Mouse, 0.0);
    assert!(has_render_needed(&actions));
    let preview = core.preview().unwrap();
    assert_eq!((preview.x, preview.y), (3.0, 2.0));
    assert_eq!(core.scene().group(SceneKey::Preview).unwrap().origin, pt(60.0, 40.0));
    assert_eq!(core.scene().order().last(), Some(&SceneKey::Preview));
}

#[test]
fn click_confirms_tool_preview_once() {
    let mut core = add_tool_ready();
    core.begin_tool_preview(PlacementSlot::feed(12), SizeClass::W3H3);
    let actions = core.on_pointer_down(pt(65.0, 41.0), PointerKind::Mouse, 0.0);
    let expected = CreateToolRequest { tool_id: PlacementSlot::feed(12), x: 3, y: 2, width: 3, height: 3 };
    assert!(actions.contains(&Action::CreateTool(expected)));
    assert!(core.preview().unwrap().submitted);

    let again = core.on_pointer_down(pt(100.0, 100.0), PointerKind::Mouse, 50.0);
    assert!(!has_action(&again, |a| matches!(a, Action::CreateTool(_))));
}

#[test]
fn tool_placement_success_inserts_item() {
    let mut core = add_tool_ready();
    core.begin_tool_preview(PlacementSlot::feed(12), SizeClass::W3H3);
    core.on_pointer_down(pt(65.0, 41.0), PointerKind::Mouse, 0.0);

    let actions = core.complete_tool_placement(Some(saved_tool(100, 12, 3.0, 2.0, 3.0, 3.0)));
    let item = core.item(100).unwrap();
    assert_eq!(item.slot(), Some(PlacementSlot::feed(12)));
    assert_eq!((item.width, item.height), (3, 3));
    assert_eq!(core.mode(), Mode::Select);
    assert!(core.preview().is_none());
    assert!(core.has_unsaved_changes());
    assert!(actions.contains(&Action::RefreshAvailableTools));
    assert!(core.picker().find(PlacementSlot::feed(12)).is_none());
    assert!(core.picker().find(PlacementSlot::regular(12)).is_some());

    let label = core.scene().group(SceneKey::Item(100)).unwrap().shapes.iter().find_map(|s| match s {
        Shape::Text { text, .. } => Some(text.clone()),
        Shape::Rect { .. } => None,
    });
    assert_eq!(label.as_deref(), Some("RAK\n151F"));
}

#[test]
fn tool_placement_failure_alerts_and_returns_to_select() {
    let mut core = add_tool_ready();
    core.begin_tool_preview(PlacementSlot::regular(12), SizeClass::W4H2);
    core.on_pointer_down(pt(65.0, 41.0), PointerKind::Mouse, 0.0);

    let actions = core.complete_tool_placement(None);
    assert!(actions.contains(&Action::Alert(TOOL_PLACEMENT_FAILED.to_owned())));
    assert_eq!(core.mode(), Mode::Select);
    assert!(core.preview().is_none());
    assert!(core.store().is_empty());
    assert!(core.scene().group(SceneKey::Preview).is_none());
}

#[test]
fn preview_refused_for_slot_already_on_map() {
    let mut core = core();
    core.load_items(vec![tool_at(TOOL_ID, PlacementSlot::regular(12), 0.0, 0.0)]);
    core.set_mode(Mode::AddTool);
    core.complete_tool_refresh(Some(vec![available(12, "RAK151D")]));
    let actions = core.begin_tool_preview(PlacementSlot::regular(12), SizeClass::W4H2);
    assert!(actions.contains(&Action::Alert(TOOL_PLACEMENT_FAILED.to_owned())));
    assert!(core.preview().is_none());
}

// =============================================================
// Drawing placement and edits
// =============================================================

#[test]
fn drawing_preview_normalizes_and_places() {
    let mut core = core();
    core.set_mode(Mode::Draw);
    core.begin_drawing_preview(DrawingForm { text: "Exit".into(), width: 0, height: 0, ..DrawingForm::default() });
    assert_eq!(core.preview().unwrap().size(), (4, 3));

    let actions = core.on_pointer_down(pt(25.0, 5.0), PointerKind::Mouse, 0.0);
    let request = actions.iter().find_map(|a| match a {
        Action::CreateDrawing(req) => Some(req.clone()),
        _ => None,
    });
    let request = request.unwrap();
    assert_eq!((request.x, request.y, request.width, request.height), (1, 0, 4, 3));
    assert_eq!(request.text, "Exit");

    core.complete_drawing_placement(Some(saved_drawing(50, 1.0, 0.0)));
    assert_eq!(core.mode(), Mode::Select);
    let item = core.item(50).unwrap();
    assert!(matches!(&item.kind, ItemKind::Drawing(d) if d.text == "Exit"));
}

#[test]
fn drawing_placement_failure_alerts() {
    let mut core = core();
    core.set_mode(Mode::Draw);
    core.begin_drawing_preview(DrawingForm::default());
    core.on_pointer_down(pt(5.0, 5.0), PointerKind::Mouse, 0.0);
    let actions = core.complete_drawing_placement(None);
    assert!(actions.contains(&Action::Alert(DRAWING_PLACEMENT_FAILED.to_owned())));
    assert!(core.store().is_empty());
}

#[test]
fn drawing_edit_round_trip() {
    let mut core = loaded();
    let form = DrawingForm { text: "Bay 2".into(), width: 6, height: 2, color: DrawingColor::Red, is_solid: true };
    let actions = core.submit_drawing_edit(DRAWING_ID, form.clone());
    assert_eq!(actions, vec![Action::UpdateDrawing { id: DRAWING_ID, request: form.request(10, 10) }]);

    // Second edit while the first is in flight is refused.
    assert!(core.submit_drawing_edit(DRAWING_ID, form).is_empty());

    let actions = core.complete_drawing_update(DRAWING_ID, true);
    assert!(actions.contains(&Action::UnsavedChanged(true)));
    let item = core.item(DRAWING_ID).unwrap();
    assert_eq!((item.width, item.height), (6, 2));
    assert!(matches!(&item.kind, ItemKind::Drawing(d) if d.text == "Bay 2" && d.is_solid));
    assert_eq!(body_style(&core, DRAWING_ID).fill, Some(crate::style::drawing_palette(DrawingColor::Red).1));
}

#[test]
fn drawing_edit_failure_keeps_item() {
    let mut core = loaded();
    core.submit_drawing_edit(DRAWING_ID, DrawingForm { text: "X".into(), ..DrawingForm::default() });
    let actions = core.complete_drawing_update(DRAWING_ID, false);
    assert_eq!(actions, vec![Action::Alert(DRAWING_UPDATE_FAILED.to_owned())]);
    assert!(matches!(&core.item(DRAWING_ID).unwrap().kind, ItemKind::Drawing(d) if d.text == "Bay"));
    assert!(!core.submit_drawing_edit(DRAWING_ID, DrawingForm::default()).is_empty());
}

#[test]
fn edit_submitted_for_tool_is_ignored() {
    let mut core = loaded();
    assert!(core.submit_drawing_edit(TOOL_ID, DrawingForm::default()).is_empty());
}

// =============================================================
// Delete
// =============================================================

#[test]
fn delete_flow_removes_selected_item() {
    let mut core = loaded();
    core.set_mode(Mode::Edit);
    click(&mut core, pt(50.0, 50.0), PointerKind::Mouse, 0.0);

    assert_eq!(core.request_delete(), vec![Action::ConfirmDeleteRequested { id: TOOL_ID }]);
    assert_eq!(core.confirm_delete(TOOL_ID), vec![Action::DeleteItem { id: TOOL_ID }]);
    assert!(core.confirm_delete(TOOL_ID).is_empty());

    let actions = core.complete_delete(TOOL_ID, true);
    assert!(actions.contains(&Action::DeleteEnabled(false)));
    assert!(core.item(TOOL_ID).is_none());
    assert!(core.selection().is_none());
    assert!(core.scene().group(SceneKey::Item(TOOL_ID)).is_none());
    assert!(core.has_unsaved_changes());
}

#[test]
fn delete_without_selection_does_nothing() {
    let mut core = loaded();
    assert!(core.request_delete().is_empty());
}

#[test]
fn delete_failure_alerts_and_keeps_item() {
    let mut core = loaded();
    core.confirm_delete(DRAWING_ID);
    let actions = core.complete_delete(DRAWING_ID, false);
    assert_eq!(actions, vec![Action::Alert(DELETE_FAILED.to_owned())]);
    assert!(core.item(DRAWING_ID).is_some());
    assert!(!core.has_unsaved_changes());
}

// =============================================================
// Saving
// =============================================================

#[test]
fn save_when_clean_is_a_no_op() {
    let mut core = loaded();
    assert!(core.save().is_empty());
}

#[test]
fn save_completion_only_clears_matching_revision() {
    let mut core = loaded();
    core.set_mode(Mode::Edit);
    click(&mut core, pt(50.0, 50.0), PointerKind::Mouse, 0.0);
    core.on_key_down(Key::ArrowRight);

    let Some(Action::SaveState { revision, items }) = core.save().pop() else {
        panic!("expected save");
    };
    assert_eq!(items.iter().map(|s| s.id).collect::<Vec<_>>(), vec![TOOL_ID, DRAWING_ID]);
    assert_eq!(items[1].width, Some(4));
    assert_eq!(items[0].width, None);

    core.on_key_down(Key::ArrowRight);
    assert!(core.complete_save(revision, true).is_empty());
    assert!(core.has_unsaved_changes());

    let latest = core.revision();
    assert_eq!(core.complete_save(latest, true), vec![Action::UnsavedChanged(false)]);
    assert!(!core.has_unsaved_changes());
}

#[test]
fn failed_save_stays_dirty() {
    let mut core = loaded();
    core.set_mode(Mode::Edit);
    click(&mut core, pt(50.0, 50.0), PointerKind::Mouse, 0.0);
    core.on_key_down(Key::ArrowRight);
    let revision = core.revision();
    assert!(core.complete_save(revision, false).is_empty());
    assert!(core.has_unsaved_changes());
}

// =============================================================
// Zoom, theme, filter
// =============================================================

#[test]
fn wheel_steps_through_zoom_levels() {
    let mut core = core();
    let generation = core.grid().generation();
    let actions = core.on_wheel(-120.0);
    assert!(has_render_needed(&actions));
    assert_eq!(core.stage().zoom(), 1.15);
    assert!(core.grid().generation() > generation);

    core.on_wheel(-1.0);
    assert_eq!(core.stage().zoom(), 1.3);
    assert!(core.on_wheel(-1.0).is_empty());

    core.on_wheel(5.0);
    assert_eq!(core.stage().zoom(), 1.15);
}

#[test]
fn zoom_out_stops_at_smallest_level() {
    let mut core = core();
    core.zoom_out();
    core.zoom_out();
    assert_eq!(core.stage().zoom(), 0.7);
    assert!(core.zoom_out().is_empty());
}

#[test]
fn tool_filter_dims_other_tools() {
    let mut core = loaded();
    core.set_tool_filter(Some([99].into_iter().collect()));
    assert_eq!(body_style(&core, TOOL_ID).opacity, DIMMED_OPACITY);
    assert_eq!(body_style(&core, DRAWING_ID).opacity, 1.0);

    core.set_tool_filter(None);
    assert_eq!(body_style(&core, TOOL_ID).opacity, 1.0);
}

#[test]
fn theme_change_restyles_tools() {
    let mut core = loaded();
    let light = body_style(&core, TOOL_ID);
    let actions = core.set_theme(Theme::Dark);
    assert!(has_render_needed(&actions));
    assert_eq!(core.theme(), Theme::Dark);
    assert_eq!(body_style(&core, TOOL_ID).fill, Some(crate::style::tool_palette(ToolType::Slurry, Theme::Dark).fill));
    assert_eq!(light.fill, Some(crate::style::tool_palette(ToolType::Slurry, Theme::Light).fill));
}

#[test]
fn network_actions_are_classified() {
    assert!(Action::RefreshAvailableTools.is_network());
    assert!(Action::DeleteItem { id: 1 }.is_network());
    assert!(!Action::RenderNeeded.is_network());
    assert!(!Action::Alert(String::new()).is_network());
}
