//! Applies the commands Lua scripts queue through the `meta` table.
//!
//! - [`process_script_command`] – script loads and module imports
//! - [`process_resource_command`] – resource registration
//! - [`process_controller_command`] – controller registry operations
//! - [`apply_lua_commands`] – system draining every queue once per tick

use bevy_ecs::prelude::*;

use crate::resources::controllers::ControllerRegistry;
use crate::resources::enginestate::EngineState;
use crate::resources::lua_runtime::{ControllerCmd, LuaRuntime, ResourceCmd, ScriptCmd};
use crate::resources::modules::{ModuleRegistry, import_module};
use crate::resources::registrar::{LoadMode, add_resources};
use crate::resources::resourcestore::{ResourceKind, ResourceStore};
use crate::resources::scriptloader::ScriptLoader;

pub fn process_script_command(
    loader: &mut ScriptLoader,
    modules: &mut ModuleRegistry,
    engine: &EngineState,
    cmd: ScriptCmd,
) {
    match cmd {
        ScriptCmd::LoadScript { src } => loader.load_script(src, None, engine),
        ScriptCmd::Import { path } => {
            import_module(modules, loader, &path, engine);
        }
    }
}

/// Name of the `meta` function that registers `kind` resources in `mode`.
fn registrar_caller(kind: ResourceKind, mode: LoadMode) -> &'static str {
    match (kind, mode) {
        (ResourceKind::Texture, LoadMode::Load) => "load_textures",
        (ResourceKind::Texture, LoadMode::Preload) => "preload_textures",
        (ResourceKind::Sound, LoadMode::Load) => "load_sounds",
        (ResourceKind::Sound, LoadMode::Preload) => "preload_sounds",
        (ResourceKind::SpriteSheet, _) => "load_spritesheet",
    }
}

pub fn process_resource_command(store: &mut ResourceStore, cmd: ResourceCmd) {
    match cmd {
        ResourceCmd::Add {
            kind,
            buffer,
            folder,
            mode,
        } => {
            add_resources(
                store,
                kind,
                &buffer,
                folder.as_deref(),
                mode,
                registrar_caller(kind, mode),
            );
        }
    }
}

pub fn process_controller_command(
    registry: &mut ControllerRegistry,
    engine: &EngineState,
    commands: &mut Commands,
    cmd: ControllerCmd,
) {
    match cmd {
        ControllerCmd::Register { name, view } => {
            registry.register(&name, view.as_deref(), engine, commands);
        }
        ControllerCmd::Unregister { name } => {
            registry.unregister(&name, commands);
        }
        ControllerCmd::UnregisterAll => {
            registry.unregister_all(commands);
        }
    }
}

/// Drain every Lua command queue.
///
/// Script commands queued while a script runs are handled by
/// [`update_script_loads`](crate::systems::scripts::update_script_loads);
/// this system picks up the rest, along with resource and controller
/// commands.
pub fn apply_lua_commands(
    mut commands: Commands,
    lua: NonSend<LuaRuntime>,
    engine: Res<EngineState>,
    mut loader: ResMut<ScriptLoader>,
    mut modules: ResMut<ModuleRegistry>,
    mut store: ResMut<ResourceStore>,
    mut registry: ResMut<ControllerRegistry>,
) {
    for cmd in lua.drain_script_commands() {
        process_script_command(&mut loader, &mut modules, &engine, cmd);
    }
    for cmd in lua.drain_resource_commands() {
        process_resource_command(&mut store, cmd);
    }
    for cmd in lua.drain_controller_commands() {
        process_controller_command(&mut registry, &engine, &mut commands, cmd);
    }
}
