//! Lua scripting runtime.
//!
//! Game scripts talk to the engine through the global `meta` table.
//!
//! - [`commands`] - Command enums queued by Lua and applied by Rust systems
//! - [`runtime`] - The interpreter and the `meta` table API
//!
//! # Example
//!
//! ```lua
//! meta.log("booting")
//! meta.import("physics/1.2.0")
//! meta.preload_textures({ "ball.png", { path = "bricks.png", name = "bricks" } }, "textures")
//! meta.load_sounds("ping.wav", "audio")
//! meta.register("MatchGame")
//! ```

mod commands;
mod runtime;

pub use commands::*;
pub use runtime::LuaRuntime;
