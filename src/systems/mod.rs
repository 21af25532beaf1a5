//! Engine systems.
//!
//! Submodules overview
//! - [`controllers`] – drop controllers whose removal is pending
//! - [`enginephase`] – trigger pending phase transitions and detect when
//!   resources are resolved
//! - [`lua_commands`] – apply commands queued by Lua
//! - [`resourceloads`] – resolve resources that are loading
//! - [`scripts`] – execute scripts and track the startup flush

use bevy_ecs::prelude::*;

pub mod controllers;
pub mod enginephase;
pub mod lua_commands;
pub mod resourceloads;
pub mod scripts;

use crate::systems::controllers::remove_pending_controllers;
use crate::systems::enginephase::{check_pending_phase, check_resources_loaded};
use crate::systems::lua_commands::apply_lua_commands;
use crate::systems::resourceloads::update_resource_loads;
use crate::systems::scripts::update_script_loads;

/// Schedule running one engine tick.
///
/// Requires the resources inserted by
/// [`create_engine`](crate::resources::enginestate::create_engine) and a
/// non-send [`LuaRuntime`](crate::resources::lua_runtime::LuaRuntime).
pub fn build_update_schedule() -> Schedule {
    let mut update = Schedule::default();
    update.add_systems(
        (
            update_script_loads,
            apply_lua_commands,
            update_resource_loads,
            check_resources_loaded,
            check_pending_phase,
            remove_pending_controllers,
        )
            .chain(),
    );
    update
}
