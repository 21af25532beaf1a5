//! Module importer.
//!
//! A module path is `name[/.../version]`. The first segment names the module
//! and the last one is its version; a bare name means `latest`. Each module is
//! recorded once. Importing it again with the same version does nothing, with
//! another version it is an error.

use bevy_ecs::prelude::Resource;
use log::{debug, error};
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::helpers::is_url;
use crate::resources::enginestate::EngineState;
use crate::resources::scriptloader::ScriptLoader;

pub const LATEST_VERSION: &str = "latest";
pub const MODULE_ENTRY: &str = "module.lua";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRecord {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("There is already added module [{name}] but with different version: {recorded}")]
    VersionConflict {
        name: String,
        recorded: String,
        requested: String,
    },
}

/// Modules imported so far.
#[derive(Resource, Debug, Default)]
pub struct ModuleRegistry {
    modules: FxHashMap<String, ModuleRecord>,
    import_url: String,
}

impl ModuleRegistry {
    pub fn new(import_url: impl Into<String>) -> Self {
        ModuleRegistry {
            modules: FxHashMap::default(),
            import_url: import_url.into(),
        }
    }

    pub fn import_url(&self) -> &str {
        &self.import_url
    }

    pub fn get(&self, name: &str) -> Option<&ModuleRecord> {
        self.modules.get(name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Record the module named by `path`.
    ///
    /// Returns the script to load for a newly recorded module, `None` when
    /// there is nothing to do.
    pub fn try_import(&mut self, path: &str) -> Result<Option<String>, ImportError> {
        if path.is_empty() {
            return Ok(None);
        }

        let segments: Vec<&str> = path.split('/').collect();
        let name = segments[0];
        let (version, path) = if segments.len() == 1 {
            (LATEST_VERSION, format!("{}/{}", path, LATEST_VERSION))
        } else {
            (segments[segments.len() - 1], path.to_string())
        };

        if let Some(module) = self.modules.get(name) {
            if module.version != version {
                return Err(ImportError::VersionConflict {
                    name: module.name.clone(),
                    recorded: module.version.clone(),
                    requested: version.to_string(),
                });
            }
            return Ok(None);
        }

        debug!("Importing module {} ({})", name, version);
        self.modules.insert(
            name.to_string(),
            ModuleRecord {
                name: name.to_string(),
                version: version.to_string(),
            },
        );

        if is_url(&path) {
            Ok(Some(path))
        } else {
            Ok(Some(format!("{}{}/{}", self.import_url, path, MODULE_ENTRY)))
        }
    }
}

/// Import the module at `path`, handing its entry script to `loader`.
///
/// Returns `true` when a script was requested.
pub fn import_module(
    modules: &mut ModuleRegistry,
    loader: &mut ScriptLoader,
    path: &str,
    engine: &EngineState,
) -> bool {
    match modules.try_import(path) {
        Ok(Some(script)) => {
            loader.load_script(script, None, engine);
            true
        }
        Ok(None) => false,
        Err(e) => {
            error!("[import]: {}", e);
            false
        }
    }
}
