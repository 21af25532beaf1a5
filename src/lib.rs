//! meta2d library.
//!
//! The utility layer of a 2D engine built on `bevy_ecs`: resource
//! registration, a controller registry with lifecycle hooks, deferred Lua
//! script loading with module imports, and small helpers. Exposed as a
//! library for the `meta2d` binary and the integration tests.

pub mod components;
pub mod events;
pub mod game;
pub mod helpers;
pub mod resources;
pub mod systems;
