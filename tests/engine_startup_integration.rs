//! Engine startup integration tests.
//!
//! These drive a full `World` through `create_engine` and the update schedule:
//! deferred script flushing, controller hooks across phases, deferred
//! removal, resource resolution and engine release.

use bevy_ecs::prelude::*;
use std::sync::{Arc, Mutex};

use meta2d::components::field::Field;
use meta2d::components::view::ViewId;
use meta2d::game::{MatchCfg, register_match_game};
use meta2d::resources::controllers::{
    Controller, ControllerCtx, ControllerRegistry, register_controller, unregister_controller,
};
use meta2d::resources::engineconfig::EngineConfig;
use meta2d::resources::enginestate::{EnginePhases, EngineState, create_engine};
use meta2d::resources::lua_runtime::LuaRuntime;
use meta2d::resources::modules::ModuleRegistry;
use meta2d::resources::resourcestore::{ResourceState, ResourceStore};
use meta2d::resources::scriptloader::{ScriptLoader, shutdown_script_fetcher};
use meta2d::systems::build_update_schedule;

// =============================================================================
// Helpers
// =============================================================================

type Log = Arc<Mutex<Vec<String>>>;

struct Recording {
    tag: String,
    log: Log,
}

impl Recording {
    fn push(&self, hook: &str) {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.tag, hook));
    }
}

impl Controller for Recording {
    fn load(&mut self, _ctx: &mut ControllerCtx<'_, '_, '_>) {
        self.push("load");
    }
    fn ready(&mut self, _ctx: &mut ControllerCtx<'_, '_, '_>) {
        self.push("ready");
    }
    fn unload(&mut self, _ctx: &mut ControllerCtx<'_, '_, '_>) {
        self.push("unload");
    }
    fn release(&mut self, _ctx: &mut ControllerCtx<'_, '_, '_>) {
        self.push("release");
    }
}

fn add_recording(registry: &mut ControllerRegistry, scope: &str, log: &Log) {
    let log = log.clone();
    let tag = scope.to_string();
    registry.add_factory(scope, "Controller", move |_view: &str| Recording {
        tag: tag.clone(),
        log: log.clone(),
    });
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

fn make_world(loader: ScriptLoader) -> World {
    let mut world = World::new();
    world.insert_non_send_resource(LuaRuntime::new().unwrap());
    world.insert_resource(EngineConfig::new());
    world.insert_resource(ControllerRegistry::new("master"));
    world.insert_resource(ModuleRegistry::new("lib/"));
    world.insert_resource(loader);
    world
}

fn queue_script(world: &mut World, src: &str) {
    let engine = world
        .get_resource::<EngineState>()
        .cloned()
        .unwrap_or_default();
    world
        .resource_mut::<ScriptLoader>()
        .load_script(src, None, &engine);
}

/// Tick until the engine is ready. Returns the number of ticks run.
fn tick_until_ready(world: &mut World, schedule: &mut Schedule, max_ticks: u32) -> u32 {
    for tick in 1..=max_ticks {
        schedule.run(world);
        if world.resource::<EngineState>().is_ready() {
            return tick;
        }
    }
    panic!(
        "engine not ready after {} ticks, phase {:?}",
        max_ticks,
        world.resource::<EngineState>().get()
    );
}

fn phase(world: &World) -> EnginePhases {
    world.resource::<EngineState>().get()
}

// =============================================================================
// Startup
// =============================================================================

#[test]
fn startup_without_scripts_reaches_ready() {
    let log = Log::default();
    let mut world = make_world(ScriptLoader::embedded(std::iter::empty::<(&str, &str)>()));
    add_recording(&mut world.resource_mut::<ControllerRegistry>(), "Hud", &log);
    assert!(register_controller(&mut world, "Hud", None).is_some());
    assert!(entries(&log).is_empty());

    assert!(create_engine(&mut world));
    let mut schedule = build_update_schedule();
    tick_until_ready(&mut world, &mut schedule, 5);

    assert_eq!(entries(&log), ["Hud:load", "Hud:ready"]);
    assert_eq!(world.resource::<EngineState>().continue_count(), 1);

    // further ticks run no hook twice
    schedule.run(&mut world);
    schedule.run(&mut world);
    assert_eq!(entries(&log).len(), 2);
}

#[test]
fn deferred_scripts_continue_once() {
    let a = r#"
        count = (count or 0) + 1
        if not queued then
            queued = true
            meta.load_script("b.lua")
        end
    "#;
    let b = r#"
        b_ran_after = count
    "#;
    let mut world = make_world(ScriptLoader::embedded([("a.lua", a), ("b.lua", b)]));
    for _ in 0..3 {
        queue_script(&mut world, "a.lua");
    }
    assert_eq!(world.resource::<ScriptLoader>().pending_len(), 3);

    assert!(create_engine(&mut world));
    assert_eq!(phase(&world), EnginePhases::Loading);
    assert!(world.resource::<ScriptLoader>().is_flushing());
    assert_eq!(world.resource::<ScriptLoader>().remaining(), 3);

    let mut schedule = build_update_schedule();
    tick_until_ready(&mut world, &mut schedule, 5);

    assert_eq!(world.resource::<EngineState>().continue_count(), 1);
    let loader = world.resource::<ScriptLoader>();
    assert_eq!(loader.remaining(), 0);
    assert!(!loader.is_flushing());
    assert_eq!(loader.in_flight_len(), 0);

    let runtime = world.non_send_resource::<LuaRuntime>();
    let globals = runtime.lua().globals();
    assert_eq!(globals.get::<i64>("count").unwrap(), 3);
    assert_eq!(globals.get::<i64>("b_ran_after").unwrap(), 3);
}

#[test]
fn failed_scripts_do_not_block_startup() {
    let mut world = make_world(ScriptLoader::embedded([("bad.lua", "error('boom')")]));
    queue_script(&mut world, "bad.lua");
    queue_script(&mut world, "missing.lua");

    assert!(create_engine(&mut world));
    let mut schedule = build_update_schedule();
    tick_until_ready(&mut world, &mut schedule, 5);
    assert_eq!(world.resource::<EngineState>().continue_count(), 1);
}

#[test]
fn scripts_after_load_run_immediately() {
    let mut world = make_world(ScriptLoader::embedded([("late.lua", "late = true")]));
    assert!(create_engine(&mut world));
    let mut schedule = build_update_schedule();
    tick_until_ready(&mut world, &mut schedule, 5);

    queue_script(&mut world, "late.lua");
    assert_eq!(world.resource::<ScriptLoader>().pending_len(), 0);
    schedule.run(&mut world);

    let runtime = world.non_send_resource::<LuaRuntime>();
    assert!(runtime.lua().globals().get::<bool>("late").unwrap());
    assert_eq!(world.resource::<EngineState>().continue_count(), 1);
}

#[test]
fn threaded_fetcher_reads_scripts_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("scripts")).unwrap();
    std::fs::write(
        dir.path().join("scripts/main.lua"),
        r#"meta.load_script("scripts/extra.lua") booted = true"#,
    )
    .unwrap();
    std::fs::write(dir.path().join("scripts/extra.lua"), "extra = true").unwrap();

    let mut world = make_world(ScriptLoader::threaded(dir.path()));
    queue_script(&mut world, "scripts/main.lua");
    assert!(create_engine(&mut world));

    let mut schedule = build_update_schedule();
    let mut ready = false;
    for _ in 0..5000 {
        schedule.run(&mut world);
        if world.resource::<EngineState>().is_ready() {
            ready = true;
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(1));
    }
    shutdown_script_fetcher(&mut world);
    assert!(ready);

    let runtime = world.non_send_resource::<LuaRuntime>();
    let globals = runtime.lua().globals();
    assert!(globals.get::<bool>("booted").unwrap());
    assert!(globals.get::<bool>("extra").unwrap());
}

// =============================================================================
// Controllers
// =============================================================================

#[test]
fn late_registration_receives_missed_hooks() {
    let log = Log::default();
    let mut world = make_world(ScriptLoader::embedded(std::iter::empty::<(&str, &str)>()));
    add_recording(&mut world.resource_mut::<ControllerRegistry>(), "Late", &log);

    assert!(create_engine(&mut world));
    let mut schedule = build_update_schedule();
    tick_until_ready(&mut world, &mut schedule, 5);
    assert!(entries(&log).is_empty());

    assert!(register_controller(&mut world, "Late", Some("hud")).is_some());
    assert_eq!(entries(&log), ["Late:load", "Late:ready"]);
}

#[test]
fn removal_is_deferred_until_next_tick() {
    let log = Log::default();
    let mut world = make_world(ScriptLoader::embedded(std::iter::empty::<(&str, &str)>()));
    add_recording(&mut world.resource_mut::<ControllerRegistry>(), "Temp", &log);
    assert!(create_engine(&mut world));
    let mut schedule = build_update_schedule();
    tick_until_ready(&mut world, &mut schedule, 5);

    let handle = register_controller(&mut world, "Temp", None).unwrap();
    assert!(unregister_controller(&mut world, "Temp"));
    assert_eq!(
        entries(&log),
        ["Temp:load", "Temp:ready", "Temp:unload", "Temp:release"]
    );

    // still holding its slot
    {
        let registry = world.resource::<ControllerRegistry>();
        assert_eq!(registry.active("Temp"), Some(handle.clone()));
        assert!(registry.is_removing(&handle));
    }
    assert!(register_controller(&mut world, "Temp", None).is_none());
    assert!(!unregister_controller(&mut world, "Temp"));

    schedule.run(&mut world);
    assert!(world.resource::<ControllerRegistry>().active("Temp").is_none());
    assert!(register_controller(&mut world, "Temp", None).is_some());
    assert_eq!(entries(&log).len(), 6);
}

#[test]
fn create_engine_twice_releases_the_engine() {
    let log = Log::default();
    let mut world = make_world(ScriptLoader::embedded(std::iter::empty::<(&str, &str)>()));
    add_recording(&mut world.resource_mut::<ControllerRegistry>(), "Game", &log);
    register_controller(&mut world, "Game", None).unwrap();

    assert!(create_engine(&mut world));
    let mut schedule = build_update_schedule();
    tick_until_ready(&mut world, &mut schedule, 5);

    assert!(!create_engine(&mut world));
    assert_eq!(phase(&world), EnginePhases::Released);
    assert_eq!(
        entries(&log),
        ["Game:load", "Game:ready", "Game:unload", "Game:release"]
    );

    schedule.run(&mut world);
    assert!(world.resource::<ControllerRegistry>().is_empty());
}

// =============================================================================
// Resources and the match-3 template
// =============================================================================

#[test]
fn main_script_registers_resources_and_template() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("scripts")).unwrap();
    std::fs::create_dir_all(dir.path().join("textures")).unwrap();
    std::fs::create_dir_all(dir.path().join("lib/gems/1.0")).unwrap();
    std::fs::write(dir.path().join("textures/gem.png"), b"png").unwrap();
    std::fs::write(
        dir.path().join("scripts/main.lua"),
        r#"
        meta.import("gems/1.0")
        meta.preload_textures({ "gem.png", { path = "board.png", name = "board" } }, "textures")
        meta.load_sounds("swap.wav", "audio")
        meta.register("MatchGame", "board")
        "#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join("lib/gems/1.0/module.lua"),
        r#"gems_loaded = true"#,
    )
    .unwrap();

    let mut world = make_world(ScriptLoader::inline(dir.path()));
    let mut config = EngineConfig::new();
    config.asset_root = dir.path().to_path_buf();
    world.insert_resource(config);
    register_match_game(
        &mut world.resource_mut::<ControllerRegistry>(),
        MatchCfg::default(),
    );
    queue_script(&mut world, "scripts/main.lua");

    assert!(create_engine(&mut world));
    let mut schedule = build_update_schedule();
    tick_until_ready(&mut world, &mut schedule, 5);

    let store = world.resource::<ResourceStore>();
    assert_eq!(store.len(), 3);
    assert_eq!(store.get_texture("gem").unwrap().state(), ResourceState::Loaded);
    assert_eq!(store.get_texture("board").unwrap().state(), ResourceState::Failed);
    assert_eq!(store.get_sound("swap").unwrap().state(), ResourceState::Unloaded);

    let modules = world.resource::<ModuleRegistry>();
    assert_eq!(modules.get("gems").unwrap().version, "1.0");
    let runtime = world.non_send_resource::<LuaRuntime>();
    assert!(runtime.lua().globals().get::<bool>("gems_loaded").unwrap());

    let mut query = world.query::<(&Field, &ViewId)>();
    let (field, view) = query.single(&world).unwrap();
    assert_eq!(*field, Field::new(8, 8, 64.0));
    assert_eq!(view.as_str(), "board");
}
