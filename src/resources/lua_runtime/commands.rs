//! Command enums for Lua-Rust communication.
//!
//! Lua functions in the `meta` table never touch engine state directly. They
//! queue one of these commands, and Rust systems apply them once the Lua call
//! returns.

use serde_json::Value;

use crate::resources::registrar::LoadMode;
use crate::resources::resourcestore::ResourceKind;

/// Script loading requested from Lua.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptCmd {
    /// Load a script through the deferred script loader
    LoadScript { src: String },
    /// Import a module (`name[/.../version]`)
    Import { path: String },
}

/// Resource registration requested from Lua.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceCmd {
    /// Register every descriptor in `buffer` under `folder`
    Add {
        kind: ResourceKind,
        buffer: Value,
        folder: Option<String>,
        mode: LoadMode,
    },
}

/// Controller registry operations requested from Lua.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerCmd {
    Register { name: String, view: Option<String> },
    Unregister { name: String },
    UnregisterAll,
}
