//! Scene graph: the retained set of shape groups the renderer paints.
//!
//! The engine talks to the scene only through [`SceneGraph`], so the state
//! machine can be driven against an in-memory scene in tests and against the
//! canvas-backed one in the browser. [`RetainedScene`] is the implementation
//! used in both places; it keeps groups in paint order and answers hit tests.
//!
//! DESIGN
//! ======
//! Each placed item owns one group keyed by its id; the placement preview
//! owns a single group keyed [`SceneKey::Preview`]. The preview is always
//! painted last and never hit-tested, so pointer events "see through" it to
//! the canvas underneath.

#[cfg(test)]
#[path = "scene_test.rs"]
mod scene_test;

use std::collections::HashMap;

use crate::camera::{Point, Rect};
use crate::doc::ItemId;
use crate::style::ShapeStyle;

/// Identifies one group in the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneKey {
    Item(ItemId),
    Preview,
}

/// A primitive inside a group, positioned relative to the group origin.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Body rectangle anchored at the group origin.
    Rect { width: f64, height: f64, style: ShapeStyle },
    /// Centered label laid out inside a `width` x `height` box.
    Text { text: String, width: f64, height: f64, color: &'static str, font_px: f64 },
}

/// A positioned collection of shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub origin: Point,
    pub shapes: Vec<Shape>,
}

impl Group {
    /// World-space bounds of the first body rectangle, if any.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        self.shapes.iter().find_map(|shape| match shape {
            Shape::Rect { width, height, .. } => Some(Rect::new(self.origin.x, self.origin.y, *width, *height)),
            Shape::Text { .. } => None,
        })
    }
}

/// Operations the engine needs from a scene graph.
pub trait SceneGraph {
    /// Create (or reset) an empty group at `origin`. New groups paint on top
    /// of existing items but below the preview.
    fn create_group(&mut self, key: SceneKey, origin: Point);

    /// Append a shape to an existing group. Unknown keys are ignored.
    fn add_shape_to_group(&mut self, key: SceneKey, shape: Shape);

    /// Move a group's origin.
    fn move_group(&mut self, key: SceneKey, origin: Point);

    /// Remove a group and its shapes.
    fn destroy_group(&mut self, key: SceneKey);

    /// Topmost item group containing `world`. The preview is never returned.
    fn hit_test(&self, world: Point) -> Option<SceneKey>;

    /// Reorder groups bottom-to-top. Keys not listed keep their relative
    /// order below the listed ones; the preview stays on top regardless.
    fn set_z_order(&mut self, order: &[SceneKey]);

    /// Mark the scene for one repaint.
    fn batch_redraw(&mut self);
}

/// In-memory scene graph.
#[derive(Debug, Clone, Default)]
pub struct RetainedScene {
    groups: HashMap<SceneKey, Group>,
    order: Vec<SceneKey>,
    redraws: u64,
}

impl RetainedScene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn group(&self, key: SceneKey) -> Option<&Group> {
        self.groups.get(&key)
    }

    /// Keys bottom-to-top.
    #[must_use]
    pub fn order(&self) -> &[SceneKey] {
        &self.order
    }

    /// Groups bottom-to-top, for painting.
    pub fn groups_in_order(&self) -> impl Iterator<Item = (SceneKey, &Group)> {
        self.order.iter().filter_map(|key| self.groups.get(key).map(|g| (*key, g)))
    }

    /// Number of batched repaint requests so far.
    #[must_use]
    pub fn redraw_count(&self) -> u64 {
        self.redraws
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn keep_preview_on_top(&mut self) {
        if let Some(pos) = self.order.iter().position(|k| *k == SceneKey::Preview) {
            let key = self.order.remove(pos);
            self.order.push(key);
        }
    }
}

impl SceneGraph for RetainedScene {
    fn create_group(&mut self, key: SceneKey, origin: Point) {
        self.groups.insert(key, Group { origin, shapes: Vec::new() });
        self.order.retain(|k| *k != key);
        self.order.push(key);
        self.keep_preview_on_top();
    }

    fn add_shape_to_group(&mut self, key: SceneKey, shape: Shape) {
        if let Some(group) = self.groups.get_mut(&key) {
            group.shapes.push(shape);
        }
    }

    fn move_group(&mut self, key: SceneKey, origin: Point) {
        if let Some(group) = self.groups.get_mut(&key) {
            group.origin = origin;
        }
    }

    fn destroy_group(&mut self, key: SceneKey) {
        self.groups.remove(&key);
        self.order.retain(|k| *k != key);
    }

    fn hit_test(&self, world: Point) -> Option<SceneKey> {
        self.order
            .iter()
            .rev()
            .filter(|key| **key != SceneKey::Preview)
            .find(|key| {
                self.groups
                    .get(*key)
                    .and_then(Group::bounds)
                    .is_some_and(|bounds| bounds.contains(world))
            })
            .copied()
    }

    fn set_z_order(&mut self, order: &[SceneKey]) {
        let mut next: Vec<SceneKey> = self.order.iter().copied().filter(|k| !order.contains(k)).collect();
        next.extend(order.iter().copied().filter(|k| self.groups.contains_key(k)));
        self.order = next;
        self.keep_preview_on_top();
    }

    fn batch_redraw(&mut self) {
        self.redraws += 1;
    }
}
