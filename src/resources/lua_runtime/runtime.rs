//! Lua runtime core implementation.
//!
//! This module contains the `LuaRuntime` struct which manages the Lua
//! interpreter and provides the `meta` table API to Lua scripts.

use super::commands::*;
use crate::helpers::{hex_to_rgb, is_url, serialize, to_upper_first_char};
use crate::resources::registrar::LoadMode;
use crate::resources::resourcestore::ResourceKind;
use mlua::prelude::*;
use std::cell::RefCell;

use log::{error, info, warn};

/// Shared state accessible from Lua function closures.
/// This is stored in Lua's app_data and allows Lua functions to queue commands.
struct LuaAppData {
    script_commands: RefCell<Vec<ScriptCmd>>,
    resource_commands: RefCell<Vec<ResourceCmd>>,
    controller_commands: RefCell<Vec<ControllerCmd>>,
}

/// Resource holding the Lua interpreter state.
///
/// This is a `NonSend` resource because the Lua state is not thread-safe.
/// It should be initialized once at startup and reused by every script.
pub struct LuaRuntime {
    lua: Lua,
}

/// Registers a Lua function that pushes a command to a queue in `LuaAppData`.
macro_rules! register_cmd {
    ($meta:expr, $lua:expr, $name:expr, $queue:ident,
     |$args:pat_param| $arg_ty:ty, $cmd:expr) => {
        $meta.set(
            $name,
            $lua.create_function(|lua, $args: $arg_ty| {
                lua.app_data_ref::<LuaAppData>()
                    .ok_or_else(|| LuaError::runtime("LuaAppData not found"))?
                    .$queue
                    .borrow_mut()
                    .push($cmd);
                Ok(())
            })?,
        )?;
    };
}

/// Registers a resource function `name(buffer, folder?)` queueing a
/// [`ResourceCmd::Add`] with a fixed kind and mode.
macro_rules! register_resource_cmd {
    ($meta:expr, $lua:expr, $name:expr, $kind:expr, $mode:expr) => {
        $meta.set(
            $name,
            $lua.create_function(|lua, (buffer, folder): (LuaValue, Option<String>)| {
                let buffer = lua
                    .from_value::<serde_json::Value>(buffer)
                    .map_err(|e| LuaError::runtime(format!("[{}]: {}", $name, e)))?;
                lua.app_data_ref::<LuaAppData>()
                    .ok_or_else(|| LuaError::runtime("LuaAppData not found"))?
                    .resource_commands
                    .borrow_mut()
                    .push(ResourceCmd::Add {
                        kind: $kind,
                        buffer,
                        folder,
                        mode: $mode,
                    });
                Ok(())
            })?,
        )?;
    };
}

impl LuaRuntime {
    /// Creates a new Lua runtime and registers the `meta` API.
    ///
    /// # Errors
    ///
    /// Returns an error if Lua initialization or API registration fails.
    pub fn new() -> LuaResult<Self> {
        let lua = Lua::new();

        lua.set_app_data(LuaAppData {
            script_commands: RefCell::new(Vec::new()),
            resource_commands: RefCell::new(Vec::new()),
            controller_commands: RefCell::new(Vec::new()),
        });

        let runtime = Self { lua };
        runtime.register_base_api()?;
        runtime.register_script_api()?;
        runtime.register_resource_api()?;
        runtime.register_controller_api()?;
        runtime.register_helper_api()?;

        Ok(runtime)
    }

    /// Registers the `meta` table with logging functions.
    fn register_base_api(&self) -> LuaResult<()> {
        let meta = self.lua.create_table()?;

        // meta.log(message) - General purpose logging
        meta.set(
            "log",
            self.lua.create_function(|_, msg: String| {
                info!(target: "lua", "{}", msg);
                Ok(())
            })?,
        )?;

        meta.set(
            "log_info",
            self.lua.create_function(|_, msg: String| {
                info!(target: "lua", "{}", msg);
                Ok(())
            })?,
        )?;

        meta.set(
            "log_warn",
            self.lua.create_function(|_, msg: String| {
                warn!(target: "lua", "{}", msg);
                Ok(())
            })?,
        )?;

        meta.set(
            "log_error",
            self.lua.create_function(|_, msg: String| {
                error!(target: "lua", "{}", msg);
                Ok(())
            })?,
        )?;

        self.lua.globals().set("meta", meta)?;

        Ok(())
    }

    fn register_script_api(&self) -> LuaResult<()> {
        let meta: LuaTable = self.lua.globals().get("meta")?;
        register_cmd!(meta, self.lua, "load_script", script_commands,
            |src| String, ScriptCmd::LoadScript { src });
        register_cmd!(meta, self.lua, "import", script_commands,
            |path| String, ScriptCmd::Import { path });
        Ok(())
    }

    fn register_resource_api(&self) -> LuaResult<()> {
        let meta: LuaTable = self.lua.globals().get("meta")?;
        register_resource_cmd!(meta, self.lua, "load_textures", ResourceKind::Texture, LoadMode::Load);
        register_resource_cmd!(meta, self.lua, "preload_textures", ResourceKind::Texture, LoadMode::Preload);
        register_resource_cmd!(meta, self.lua, "load_sounds", ResourceKind::Sound, LoadMode::Load);
        register_resource_cmd!(meta, self.lua, "preload_sounds", ResourceKind::Sound, LoadMode::Preload);
        register_resource_cmd!(meta, self.lua, "load_spritesheet", ResourceKind::SpriteSheet, LoadMode::Preload);
        Ok(())
    }

    fn register_controller_api(&self) -> LuaResult<()> {
        let meta: LuaTable = self.lua.globals().get("meta")?;
        register_cmd!(meta, self.lua, "register", controller_commands,
            |(name, view)| (String, Option<String>), ControllerCmd::Register { name, view });
        register_cmd!(meta, self.lua, "unregister", controller_commands,
            |name| String, ControllerCmd::Unregister { name });
        register_cmd!(meta, self.lua, "unregister_all", controller_commands,
            |()| (), ControllerCmd::UnregisterAll);
        Ok(())
    }

    /// Registers the stateless helpers. These answer immediately.
    fn register_helper_api(&self) -> LuaResult<()> {
        let meta: LuaTable = self.lua.globals().get("meta")?;

        meta.set(
            "is_url",
            self.lua.create_function(|_, s: String| Ok(is_url(&s)))?,
        )?;

        meta.set(
            "to_upper_first_char",
            self.lua
                .create_function(|_, s: String| Ok(to_upper_first_char(&s)))?,
        )?;

        // meta.hex_to_rgb(hex) -> { r, g, b } or nil
        meta.set(
            "hex_to_rgb",
            self.lua.create_function(|lua, hex: String| {
                match hex_to_rgb(&hex) {
                    Ok(rgb) => lua.to_value(&rgb),
                    Err(e) => {
                        warn!(target: "lua", "[hex_to_rgb]: {}", e);
                        Ok(LuaValue::Nil)
                    }
                }
            })?,
        )?;

        // meta.serialize(table) -> "k1=v1&k2=v2", keys in sorted order
        meta.set(
            "serialize",
            self.lua.create_function(|_, table: LuaTable| {
                let mut pairs = Vec::new();
                for pair in table.pairs::<LuaValue, LuaValue>() {
                    let (key, value) = pair?;
                    pairs.push((key.to_string()?, value.to_string()?));
                }
                pairs.sort();
                Ok(serialize(pairs))
            })?,
        )?;

        Ok(())
    }

    pub fn drain_script_commands(&self) -> Vec<ScriptCmd> {
        self.lua
            .app_data_ref::<LuaAppData>()
            .map(|data| data.script_commands.borrow_mut().drain(..).collect())
            .unwrap_or_default()
    }

    pub fn drain_resource_commands(&self) -> Vec<ResourceCmd> {
        self.lua
            .app_data_ref::<LuaAppData>()
            .map(|data| data.resource_commands.borrow_mut().drain(..).collect())
            .unwrap_or_default()
    }

    pub fn drain_controller_commands(&self) -> Vec<ControllerCmd> {
        self.lua
            .app_data_ref::<LuaAppData>()
            .map(|data| data.controller_commands.borrow_mut().drain(..).collect())
            .unwrap_or_default()
    }

    /// Execute `source`, reporting errors against `name`.
    pub fn run_source(&self, name: &str, source: &str) -> LuaResult<()> {
        self.lua.load(source).set_name(name).exec()
    }

    pub fn lua(&self) -> &Lua {
        &self.lua
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_script_commands_are_queued() {
        let runtime = LuaRuntime::new().unwrap();
        runtime
            .run_source(
                "boot",
                r#"
                meta.load_script("scripts/a.lua")
                meta.import("physics/1.2.0")
                "#,
            )
            .unwrap();

        assert_eq!(
            runtime.drain_script_commands(),
            vec![
                ScriptCmd::LoadScript {
                    src: "scripts/a.lua".to_string()
                },
                ScriptCmd::Import {
                    path: "physics/1.2.0".to_string()
                },
            ]
        );
        assert!(runtime.drain_script_commands().is_empty());
    }

    #[test]
    fn test_resource_buffers_convert_to_json() {
        let runtime = LuaRuntime::new().unwrap();
        runtime
            .run_source(
                "assets",
                r#"
                meta.preload_textures({ "ball.png", { path = "bricks.png", name = "bricks" } }, "textures")
                meta.load_sounds("ping.wav")
                "#,
            )
            .unwrap();

        let cmds = runtime.drain_resource_commands();
        assert_eq!(cmds.len(), 2);
        assert_eq!(
            cmds[0],
            ResourceCmd::Add {
                kind: ResourceKind::Texture,
                buffer: json!(["ball.png", { "path": "bricks.png", "name": "bricks" }]),
                folder: Some("textures".to_string()),
                mode: LoadMode::Preload,
            }
        );
        assert_eq!(
            cmds[1],
            ResourceCmd::Add {
                kind: ResourceKind::Sound,
                buffer: json!("ping.wav"),
                folder: None,
                mode: LoadMode::Load,
            }
        );
    }

    #[test]
    fn test_controller_commands_are_queued() {
        let runtime = LuaRuntime::new().unwrap();
        runtime
            .run_source(
                "ctrl",
                r#"
                meta.register("MatchGame", "hud")
                meta.unregister("MatchGame")
                meta.unregister_all()
                "#,
            )
            .unwrap();

        assert_eq!(
            runtime.drain_controller_commands(),
            vec![
                ControllerCmd::Register {
                    name: "MatchGame".to_string(),
                    view: Some("hud".to_string())
                },
                ControllerCmd::Unregister {
                    name: "MatchGame".to_string()
                },
                ControllerCmd::UnregisterAll,
            ]
        );
    }

    #[test]
    fn test_helpers_answer_immediately() {
        let runtime = LuaRuntime::new().unwrap();
        runtime
            .run_source(
                "helpers",
                r##"
                local c = meta.hex_to_rgb("#ff8000")
                red, green, blue = c.r, c.g, c.b
                bad = meta.hex_to_rgb("#12")
                url = meta.is_url("https://example.com/a.lua")
                word = meta.to_upper_first_char("tile")
                query = meta.serialize({ b = "x y", a = 1 })
                "##,
            )
            .unwrap();

        let globals = runtime.lua().globals();
        assert_eq!(globals.get::<u8>("red").unwrap(), 255);
        assert_eq!(globals.get::<u8>("green").unwrap(), 128);
        assert_eq!(globals.get::<u8>("blue").unwrap(), 0);
        assert!(globals.get::<LuaValue>("bad").unwrap().is_nil());
        assert!(globals.get::<bool>("url").unwrap());
        assert_eq!(globals.get::<String>("word").unwrap(), "Tile");
        assert_eq!(globals.get::<String>("query").unwrap(), "a=1&b=x%20y");
    }

    #[test]
    fn test_script_errors_are_reported() {
        let runtime = LuaRuntime::new().unwrap();
        assert!(runtime.run_source("broken", "this is not lua").is_err());
        assert!(runtime.run_source("boom", "error('boom')").is_err());
    }
}
