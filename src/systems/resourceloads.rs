//! Resolves resources waiting in [`ResourceState::Loading`].
//!
//! A resource is loaded once its source exists under the configured asset
//! root. Remote sources are not fetched and fail.

use crate::helpers::is_url;
use crate::resources::engineconfig::EngineConfig;
use crate::resources::resourcestore::{ResourceState, ResourceStore};
use bevy_ecs::prelude::*;
use log::{debug, warn};

pub fn update_resource_loads(config: Res<EngineConfig>, mut store: ResMut<ResourceStore>) {
    if !store.is_loading() {
        return;
    }
    for resource in store
        .iter_mut()
        .filter(|r| r.state() == ResourceState::Loading)
    {
        if is_url(&resource.src) {
            warn!(
                "{} '{}': remote sources are not supported ({})",
                resource.kind, resource.name, resource.src
            );
            resource.set_state(ResourceState::Failed);
            continue;
        }
        let path = config.asset_root.join(&resource.src);
        if path.is_file() {
            debug!("{} '{}' loaded", resource.kind, resource.name);
            resource.set_state(ResourceState::Loaded);
        } else {
            warn!(
                "{} '{}': file not found: {}",
                resource.kind,
                resource.name,
                path.display()
            );
            resource.set_state(ResourceState::Failed);
        }
    }
}
