//! Engine phase transition event and observer.
//!
//! Code requests a phase change by updating [`NextEnginePhase`]. Emitting an
//! [`EnginePhaseChangedEvent`] then triggers the observer in this module,
//! which applies the transition to [`EngineState`] and runs the enter hook of
//! the new phase. Hooks that move the engine further request the next phase
//! and trigger the event again, so a startup with nothing to wait for runs
//! straight through to [`EnginePhases::CtrlLoaded`].
use crate::resources::controllers::ControllerRegistry;
use crate::resources::enginestate::NextEnginePhases::{Pending, Unchanged};
use crate::resources::enginestate::{EnginePhases, EngineState, NextEnginePhase};
use crate::resources::scriptloader::ScriptLoader;
use bevy_ecs::observer::On;
use bevy_ecs::prelude::*;
use log::{debug, info, warn};

/// Event used to indicate that a pending engine phase transition should be
/// applied.
///
/// Emitting this event causes [`observe_engine_phase_change`] to read
/// [`NextEnginePhase`]. If it contains [`Pending`], the observer updates
/// [`EngineState`], runs the enter hook and clears the pending value; if it is
/// [`Unchanged`], nothing happens.
#[derive(Event, Debug, Clone, Copy)]
pub struct EnginePhaseChangedEvent {}

/// Observer that applies a pending engine phase transition.
///
/// Enter hooks:
/// - `Loading`: flush deferred scripts, or continue right away when none are
///   waiting
/// - `Loaded`: request `CtrlLoaded`
/// - `CtrlLoaded`: `load()` every registered controller
/// - `Ready`: `ready()` every registered controller
/// - `Released`: unregister every controller
pub fn observe_engine_phase_change(
    _trigger: On<EnginePhaseChangedEvent>,
    mut commands: Commands,
    mut next_phase: Option<ResMut<NextEnginePhase>>,
    mut engine: Option<ResMut<EngineState>>,
    mut registry: Option<ResMut<ControllerRegistry>>,
    mut loader: Option<ResMut<ScriptLoader>>,
) {
    debug!("EnginePhaseChangedEvent triggered");

    if let (Some(next_phase), Some(engine)) =
        (next_phase.as_deref_mut(), engine.as_deref_mut())
    {
        match *next_phase.get() {
            Pending(new_phase) => {
                info!("Engine phase {:?} -> {:?}", engine.get(), new_phase);
                engine.set(new_phase);
                next_phase.reset();
                on_phase_enter(
                    new_phase,
                    &mut commands,
                    next_phase,
                    engine,
                    registry.as_deref_mut(),
                    loader.as_deref_mut(),
                );
            }
            Unchanged => {
                debug!("No phase change pending.");
            }
        }
    } else {
        warn!(
            "One or more resources missing in observe_engine_phase_change. next_phase: {:?}, engine: {:?}",
            next_phase.is_some(),
            engine.is_some()
        );
    }
}

/// Internal: run the enter hook of `phase`.
fn on_phase_enter(
    phase: EnginePhases,
    commands: &mut Commands,
    next_phase: &mut NextEnginePhase,
    engine: &mut EngineState,
    registry: Option<&mut ControllerRegistry>,
    loader: Option<&mut ScriptLoader>,
) {
    match phase {
        EnginePhases::None => debug!("Entered None phase"),
        EnginePhases::Loading => {
            let waiting = loader.is_some_and(|loader| loader.flush_pending());
            if !waiting {
                debug!("No deferred scripts, continuing");
                next_phase.continue_load(engine);
                commands.trigger(EnginePhaseChangedEvent {});
            }
        }
        EnginePhases::Loaded => {
            next_phase.set(EnginePhases::CtrlLoaded);
            commands.trigger(EnginePhaseChangedEvent {});
        }
        EnginePhases::CtrlLoaded => {
            if let Some(registry) = registry {
                registry.load_all(commands);
            }
        }
        EnginePhases::Ready => {
            if let Some(registry) = registry {
                registry.ready_all(commands);
            }
        }
        EnginePhases::Released => {
            if let Some(registry) = registry {
                let count = registry.unregister_all(commands);
                info!("Engine released, {} controller(s) unregistered", count);
            }
        }
    }
}
