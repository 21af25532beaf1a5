//! Normalized anchor point of an entity.
//!
//! `(0.0, 0.0)` is the top-left corner of the parent (or view), `(1.0, 1.0)`
//! the bottom-right corner. `Anchor::splat(0.5)` centers the entity.

use bevy_ecs::prelude::Component;

#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct Anchor {
    pub x: f32,
    pub y: f32,
}

impl Anchor {
    pub fn new(x: f32, y: f32) -> Self {
        Anchor { x, y }
    }

    /// Same anchor on both axes.
    pub fn splat(v: f32) -> Self {
        Anchor { x: v, y: v }
    }
}

impl Default for Anchor {
    fn default() -> Self {
        Anchor::splat(0.0)
    }
}
