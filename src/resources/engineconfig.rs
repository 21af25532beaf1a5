//! Engine configuration resource.
//!
//! Settings are loaded from an INI file. Every value has a safe default so the
//! engine starts without a config file.
//!
//! # Configuration File Format
//!
//! ```ini
//! [engine]
//! asset_root = ./assets
//! import_url = ./modules/
//! default_view = master
//! debug = false
//!
//! [scripts]
//! main = scripts/main.lua
//! ```

use bevy_ecs::prelude::*;
use configparser::ini::Ini;
use log::info;
use std::path::PathBuf;

use crate::components::view::DEFAULT_VIEW;

const DEFAULT_ASSET_ROOT: &str = "./assets";
const DEFAULT_IMPORT_URL: &str = "./modules/";
const DEFAULT_MAIN_SCRIPT: &str = "scripts/main.lua";
const DEFAULT_CONFIG_PATH: &str = "./config.ini";

/// Engine configuration resource.
#[derive(Resource, Debug, Clone)]
pub struct EngineConfig {
    /// Directory resource and script sources are resolved against.
    pub asset_root: PathBuf,
    /// Prefix of module paths passed to `import`.
    pub import_url: String,
    /// View given to controllers created without one.
    pub default_view: String,
    /// Enables verbose startup logging.
    pub debug: bool,
    /// Script queued before the engine is created, relative to `asset_root`.
    pub main_script: Option<String>,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self {
            asset_root: PathBuf::from(DEFAULT_ASSET_ROOT),
            import_url: DEFAULT_IMPORT_URL.to_string(),
            default_view: DEFAULT_VIEW.to_string(),
            debug: false,
            main_script: Some(DEFAULT_MAIN_SCRIPT.to_string()),
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Create a configuration reading from a custom file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values keep their current values. Returns an error if the file
    /// cannot be read or parsed.
    pub fn load_from_file(&mut self) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| format!("Failed to load config file: {}", e))?;

        // [engine] section
        if let Some(root) = config.get("engine", "asset_root") {
            self.asset_root = PathBuf::from(root);
        }
        if let Some(url) = config.get("engine", "import_url") {
            self.import_url = url;
        }
        if let Some(view) = config.get("engine", "default_view") {
            self.default_view = view;
        }
        if let Some(debug) = config.getbool("engine", "debug").ok().flatten() {
            self.debug = debug;
        }

        // [scripts] section; `none` disables the main script
        if let Some(main) = config.get("scripts", "main") {
            self.main_script = if main.is_empty() || main.eq_ignore_ascii_case("none") {
                None
            } else {
                Some(main)
            };
        }

        info!(
            "Loaded config: asset_root={:?}, import_url={}, default_view={}, debug={}, main={:?}",
            self.asset_root, self.import_url, self.default_view, self.debug, self.main_script
        );

        Ok(())
    }

    /// Save configuration to the INI file, creating it if needed.
    pub fn save_to_file(&self) -> Result<(), String> {
        let mut config = Ini::new();

        config.set(
            "engine",
            "asset_root",
            Some(self.asset_root.display().to_string()),
        );
        config.set("engine", "import_url", Some(self.import_url.clone()));
        config.set("engine", "default_view", Some(self.default_view.clone()));
        config.set("engine", "debug", Some(self.debug.to_string()));
        config.set(
            "scripts",
            "main",
            Some(
                self.main_script
                    .clone()
                    .unwrap_or_else(|| "none".to_string()),
            ),
        );

        config
            .write(&self.config_path)
            .map_err(|e| format!("Failed to save config file: {}", e))?;

        info!("Saved config to {:?}", self.config_path);

        Ok(())
    }
}
