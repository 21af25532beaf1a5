//! Draw order for entities inside a view.

use bevy_ecs::prelude::Component;

/// Draw order hint. Entities with a higher value are drawn on top.
#[derive(Component, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ZIndex(pub i32);
