//! meta2d main entry point.
//!
//! Runs the match-3 template headless:
//!
//! 1. Load `config.ini` and apply command line overrides
//! 2. Create the Lua runtime and register the `MatchGame` controller factory
//! 3. Queue the main script, then create the engine, which flushes it
//! 4. Tick the update schedule until the engine is ready (or `--ticks` run out)
//! 5. Release the engine and stop the script fetch thread
//!
//! # Running
//!
//! ```sh
//! cargo run --release -- --asset-root ./assets --threaded
//! ```

use bevy_ecs::prelude::*;
use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;
use std::time::Duration;

use meta2d::game::{MatchCfg, add_description, register_match_game};
use meta2d::resources::controllers::ControllerRegistry;
use meta2d::resources::engineconfig::EngineConfig;
use meta2d::resources::enginestate::{EngineState, create_engine, release_engine};
use meta2d::resources::lua_runtime::LuaRuntime;
use meta2d::resources::scriptloader::{ScriptLoader, shutdown_script_fetcher};
use meta2d::systems::build_update_schedule;

/// meta2d headless runner
#[derive(Parser)]
#[command(version, about = "Runs the meta2d match-3 template without a renderer.")]
struct Cli {
    /// Configuration file.
    #[arg(long, value_name = "PATH", default_value = "./config.ini")]
    config: PathBuf,

    /// Override `[engine] asset_root`.
    #[arg(long, value_name = "DIR")]
    asset_root: Option<PathBuf>,

    /// Give up after this many ticks if the engine is not ready.
    #[arg(long, default_value_t = 600)]
    ticks: u32,

    /// Read scripts on a background thread.
    #[arg(long)]
    threaded: bool,

    /// Show a description line at the top of the default view.
    #[arg(long, value_name = "TEXT")]
    description: Option<String>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = EngineConfig::with_path(&cli.config);
    if let Err(e) = config.load_from_file() {
        warn!("{}, using defaults", e);
    }
    if let Some(root) = cli.asset_root {
        config.asset_root = root;
    }
    if config.debug {
        info!("Debug mode enabled: {:?}", config);
    }

    let lua_runtime = match LuaRuntime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create Lua runtime: {}", e);
            std::process::exit(1);
        }
    };

    let mut world = World::new();
    world.insert_non_send_resource(lua_runtime);

    let mut registry = ControllerRegistry::new(config.default_view.clone());
    register_match_game(&mut registry, MatchCfg::default());
    world.insert_resource(registry);

    let mut loader = if cli.threaded {
        ScriptLoader::threaded(config.asset_root.clone())
    } else {
        ScriptLoader::inline(config.asset_root.clone())
    };
    if let Some(main_script) = &config.main_script {
        loader.load_script(main_script.clone(), None, &EngineState::new());
    }
    world.insert_resource(loader);

    let default_view = config.default_view.clone();
    world.insert_resource(config);

    if !create_engine(&mut world) {
        error!("Engine could not be created");
        std::process::exit(1);
    }

    if let Some(text) = cli.description {
        let mut commands = world.commands();
        add_description(&mut commands, &default_view, &text);
        world.flush();
    }

    let mut update = build_update_schedule();
    let mut ready = false;
    for tick in 1..=cli.ticks {
        update.run(&mut world);
        if world.resource::<EngineState>().is_ready() {
            info!("Engine ready after {} tick(s)", tick);
            ready = true;
            break;
        }
        if cli.threaded {
            std::thread::sleep(Duration::from_millis(1));
        }
    }
    if !ready {
        warn!(
            "Engine not ready after {} tick(s), phase {:?}",
            cli.ticks,
            world.resource::<EngineState>().get()
        );
    }

    release_engine(&mut world);
    update.run(&mut world);
    shutdown_script_fetcher(&mut world);
    info!("Bye");
}
