//! ECS resources made available to systems.
//!
//! Overview
//! - `controllers` – scopes, controller factories and the active controller of each scope
//! - `engineconfig` – settings loaded from `config.ini`
//! - `enginestate` – authoritative and pending engine phase, `create_engine`
//! - `lua_runtime` – Lua interpreter and the `meta` table API
//! - `modules` – imported modules and their versions
//! - `registrar` – helpers turning descriptor buffers into resources
//! - `resourcestore` – registered textures, sounds and spritesheets
//! - `scriptfetch` – inline, embedded and threaded script source fetchers
//! - `scriptloader` – deferred script loading and the startup flush
pub mod controllers;
pub mod engineconfig;
pub mod enginestate;
pub mod lua_runtime;
pub mod modules;
pub mod registrar;
pub mod resourcestore;
pub mod scriptfetch;
pub mod scriptloader;
