//! Components of the demo description widget.
//!
//! See [`crate::game::add_description`] for how the widget is assembled: a
//! [`Geometry`] background with a [`Text`] child attached to it.

use bevy_ecs::prelude::Component;

/// Single line of text.
#[derive(Component, Clone, Debug, PartialEq)]
pub struct Text {
    pub text: String,
    /// Hex color string, e.g. `"#ffffff"`.
    pub color: String,
    pub size: u32,
}

impl Text {
    /// Rough pixel extent of the text, used to size backgrounds.
    ///
    /// Assumes an average glyph width of 60% of the font size.
    pub fn extent(&self) -> (f32, f32) {
        let size = self.size as f32;
        (self.text.chars().count() as f32 * size * 0.6, size)
    }
}

/// Solid filled rectangle.
#[derive(Component, Clone, Debug, PartialEq)]
pub struct Geometry {
    pub width: f32,
    pub height: f32,
    pub color: String,
}

/// Placement relative to the top edge of the view: centered horizontally,
/// `offset_y` pixels down.
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct PositionTop {
    pub offset_x: f32,
    pub offset_y: f32,
}

/// Presentation flags shared by widget entities.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct WidgetFlags {
    pub pickable: bool,
    pub ignore_zoom: bool,
    pub debug: bool,
}

impl WidgetFlags {
    /// Not pickable, unaffected by camera zoom, hidden from debug overlays.
    pub fn overlay() -> Self {
        WidgetFlags {
            pickable: false,
            ignore_zoom: true,
            debug: false,
        }
    }
}
