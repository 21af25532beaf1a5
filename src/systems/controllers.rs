use crate::resources::controllers::ControllerRegistry;
use bevy_ecs::prelude::*;
use log::debug;

/// Drop controllers removed since the last tick, freeing their scopes.
pub fn remove_pending_controllers(mut registry: ResMut<ControllerRegistry>) {
    for instance in registry.remove_pending() {
        debug!(
            "Removed controller {:?} from scope {}",
            instance.id(),
            instance.scope()
        );
    }
}
