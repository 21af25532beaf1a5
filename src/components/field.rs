//! Playing field of the match-3 template.

use bevy_ecs::prelude::Component;

/// Grid of cells the match game is played on.
///
/// The field only describes its layout; filling and matching are left to the
/// game built on top of the template.
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct Field {
    pub columns: u32,
    pub rows: u32,
    /// Side of a square cell in pixels.
    pub cell_size: f32,
}

impl Field {
    pub fn new(columns: u32, rows: u32, cell_size: f32) -> Self {
        Field {
            columns,
            rows,
            cell_size,
        }
    }

    /// Total size of the field in pixels as `(width, height)`.
    pub fn size(&self) -> (f32, f32) {
        (
            self.columns as f32 * self.cell_size,
            self.rows as f32 * self.cell_size,
        )
    }
}
