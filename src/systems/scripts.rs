//! Executes scripts as their sources arrive.
//!
//! Each tick runs every script that is next in line, in injection order.
//! Script and import requests a script makes are applied before it counts as
//! complete, so scripts requested during the startup flush join the same
//! flush.

use bevy_ecs::prelude::*;
use log::{debug, error, info};

use crate::resources::enginestate::{EngineState, NextEnginePhase};
use crate::resources::lua_runtime::LuaRuntime;
use crate::resources::modules::ModuleRegistry;
use crate::resources::scriptloader::ScriptLoader;
use crate::systems::lua_commands::process_script_command;

pub fn update_script_loads(
    mut commands: Commands,
    lua: NonSend<LuaRuntime>,
    mut loader: ResMut<ScriptLoader>,
    mut modules: ResMut<ModuleRegistry>,
    mut engine: ResMut<EngineState>,
    mut next_phase: ResMut<NextEnginePhase>,
) {
    while let Some(script) = loader.next_ready() {
        match script.source() {
            Ok(source) => {
                debug!("Running script {}", script.src());
                if let Err(e) = lua.run_source(script.src(), source) {
                    error!("Script {} failed: {}", script.src(), e);
                }
            }
            Err(e) => error!("Script {} could not be loaded: {}", script.src(), e),
        }

        for cmd in lua.drain_script_commands() {
            process_script_command(&mut loader, &mut modules, &engine, cmd);
        }

        if loader.complete(script, &mut commands) {
            info!("Deferred scripts loaded");
            next_phase.continue_load(&mut engine);
        }
    }
}
