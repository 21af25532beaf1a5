//! View membership tag.
//!
//! The scene graph itself lives outside this crate. Entities created by
//! controllers carry a [`ViewId`] naming the view they were added to so the
//! renderer can pick them up.

use bevy_ecs::prelude::Component;

/// Name of the view used when a controller is created without one.
pub const DEFAULT_VIEW: &str = "master";

/// Name of the view an entity belongs to.
#[derive(Component, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ViewId(pub String);

impl ViewId {
    pub fn new(name: impl Into<String>) -> Self {
        ViewId(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ViewId {
    fn default() -> Self {
        ViewId(DEFAULT_VIEW.to_string())
    }
}
