use crate::events::enginephase::EnginePhaseChangedEvent;
use crate::resources::enginestate::{EnginePhases, EngineState, NextEnginePhase, NextEnginePhases};
use crate::resources::resourcestore::ResourceStore;
use bevy_ecs::prelude::*;
use log::info;

pub fn check_pending_phase(mut commands: Commands, next_phase: Res<NextEnginePhase>) {
    if let NextEnginePhases::Pending(_new_phase) = next_phase.get() {
        commands.trigger(EnginePhaseChangedEvent {});
    }
}

/// Request [`EnginePhases::Ready`] once the controllers are loaded and no
/// resource is still loading.
pub fn check_resources_loaded(
    engine: Res<EngineState>,
    mut next_phase: ResMut<NextEnginePhase>,
    store: Res<ResourceStore>,
) {
    if engine.get() != EnginePhases::CtrlLoaded || store.is_loading() {
        return;
    }
    if *next_phase.get() == NextEnginePhases::Unchanged {
        info!("All resources resolved ({} registered)", store.len());
        next_phase.set(EnginePhases::Ready);
    }
}
