//! Engine lifecycle resources.
//!
//! [`EngineState`] is the authoritative startup phase of the engine and the
//! source of the lifecycle flags the registries consult (`is_loaded`,
//! `is_ctrl_loaded`, `is_ready`). Transitions are requested through
//! [`NextEnginePhase`] and applied by
//! [`observe_engine_phase_change`](crate::events::enginephase::observe_engine_phase_change).

use bevy_ecs::prelude::*;
use log::{error, info, warn};

use crate::events::enginephase::{EnginePhaseChangedEvent, observe_engine_phase_change};
use crate::resources::controllers::ControllerRegistry;
use crate::resources::engineconfig::EngineConfig;
use crate::resources::lua_runtime::LuaRuntime;
use crate::resources::modules::ModuleRegistry;
use crate::resources::resourcestore::ResourceStore;
use crate::resources::scriptloader::ScriptLoader;

/// Startup phases, in the order the engine goes through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum EnginePhases {
    #[default]
    None,
    /// Deferred scripts are being flushed.
    Loading,
    /// Every startup script finished; new scripts load immediately.
    Loaded,
    /// Controllers received `load()`; resources may still be loading.
    CtrlLoaded,
    /// Controllers received `ready()`.
    Ready,
    /// The engine was torn down; all controllers were unregistered.
    Released,
}

/// Representation of a requested next phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NextEnginePhases {
    #[default]
    Unchanged,
    Pending(EnginePhases),
}

/// Authoritative engine phase.
#[derive(Resource, Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct EngineState {
    current: EnginePhases,
    /// How many times the script loader asked the engine to continue.
    continue_count: u32,
}

impl EngineState {
    /// Create a new state initialized to [`EnginePhases::None`].
    pub fn new() -> Self {
        EngineState::default()
    }

    pub fn get(&self) -> EnginePhases {
        self.current
    }

    /// Update the phase immediately, without running enter hooks.
    pub fn set(&mut self, phase: EnginePhases) {
        self.current = phase;
    }

    /// Startup scripts are done; script requests are no longer buffered.
    pub fn is_loaded(&self) -> bool {
        self.current >= EnginePhases::Loaded && self.current != EnginePhases::Released
    }

    /// Controllers already went through their `load()` phase.
    pub fn is_ctrl_loaded(&self) -> bool {
        self.current >= EnginePhases::CtrlLoaded && self.current != EnginePhases::Released
    }

    pub fn is_ready(&self) -> bool {
        self.current == EnginePhases::Ready
    }

    pub fn continue_count(&self) -> u32 {
        self.continue_count
    }

    pub(crate) fn note_continue(&mut self) {
        self.continue_count += 1;
    }
}

/// Intent to move the engine to a new phase.
#[derive(Resource, Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NextEnginePhase {
    next: NextEnginePhases,
}

impl NextEnginePhase {
    pub fn new() -> Self {
        NextEnginePhase::default()
    }

    pub fn get(&self) -> &NextEnginePhases {
        &self.next
    }

    /// Mark a transition to `next` as pending.
    ///
    /// The system `check_pending_phase` emits the change event.
    pub fn set(&mut self, next: EnginePhases) {
        self.next = NextEnginePhases::Pending(next);
    }

    pub fn reset(&mut self) {
        self.next = NextEnginePhases::Unchanged;
    }

    /// Continue the startup sequence once the deferred scripts are drained.
    pub fn continue_load(&mut self, state: &mut EngineState) {
        state.note_continue();
        self.set(EnginePhases::Loaded);
    }
}

/// Create the engine resources and start the load sequence.
///
/// Missing registries and the Lua runtime are inserted with defaults built
/// from the [`EngineConfig`] resource (or a default config). If an engine already
/// exists it is released instead and `false` is returned.
pub fn create_engine(world: &mut World) -> bool {
    if world.contains_resource::<EngineState>() {
        warn!("create_engine: an engine already exists, releasing it");
        release_engine(world);
        return false;
    }

    if !world.contains_resource::<EngineConfig>() {
        world.insert_resource(EngineConfig::new());
    }
    let config = world.resource::<EngineConfig>().clone();

    if !world.contains_resource::<ControllerRegistry>() {
        world.insert_resource(ControllerRegistry::new(config.default_view.clone()));
    }
    if !world.contains_resource::<ScriptLoader>() {
        world.insert_resource(ScriptLoader::inline(config.asset_root.clone()));
    }
    if !world.contains_resource::<ModuleRegistry>() {
        world.insert_resource(ModuleRegistry::new(config.import_url.clone()));
    }
    if !world.contains_resource::<ResourceStore>() {
        world.insert_resource(ResourceStore::new());
    }
    if !world.contains_non_send::<LuaRuntime>() {
        match LuaRuntime::new() {
            Ok(runtime) => world.insert_non_send_resource(runtime),
            Err(e) => error!("create_engine: failed to create Lua runtime: {}", e),
        }
    }

    world.insert_resource(EngineState::new());
    let mut next = NextEnginePhase::new();
    next.set(EnginePhases::Loading);
    world.insert_resource(next);

    world.spawn(Observer::new(observe_engine_phase_change));
    world.flush();

    info!("Engine created");
    world.trigger(EnginePhaseChangedEvent {});
    world.flush();
    true
}

/// Move the engine to [`EnginePhases::Released`], unregistering every
/// controller on the way.
pub fn release_engine(world: &mut World) {
    let Some(mut next) = world.get_resource_mut::<NextEnginePhase>() else {
        warn!("release_engine: no engine to release");
        return;
    };
    next.set(EnginePhases::Released);
    world.trigger(EnginePhaseChangedEvent {});
    world.flush();
}
