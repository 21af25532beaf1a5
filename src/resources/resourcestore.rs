//! Resource store: registered textures, sounds and spritesheets.
//!
//! The store tracks what was registered and the load state of each entry.
//! Decoding and GPU/audio upload happen in the rendering backend; here a
//! resource is considered loaded once its source is found under the asset
//! root (see [`crate::systems::resourceloads::update_resource_loads`]).

use bevy_ecs::prelude::Resource;
use log::{debug, warn};
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

/// Category of resource, selecting how the backend treats its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Texture,
    Sound,
    SpriteSheet,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Texture => "Texture",
            ResourceKind::Sound => "Sound",
            ResourceKind::SpriteSheet => "SpriteSheet",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceState {
    #[default]
    Unloaded,
    Loading,
    Loaded,
    Failed,
}

/// Index of a resource inside its [`ResourceStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub usize);

/// A registered resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceEntry {
    pub kind: ResourceKind,
    /// Lookup name, unique per kind.
    pub name: String,
    /// Source path or URL, already prefixed with the folder path.
    pub src: String,
    /// Extra descriptor fields, passed through to the backend untouched.
    pub meta: Map<String, Value>,
    state: ResourceState,
}

impl ResourceEntry {
    /// Create an unloaded resource. The name defaults to the file stem of
    /// `src` (`"textures/ball.png"` -> `"ball"`).
    pub fn new(kind: ResourceKind, src: impl Into<String>) -> Self {
        let src = src.into();
        ResourceEntry {
            kind,
            name: name_from_src(&src),
            src,
            meta: Map::new(),
            state: ResourceState::Unloaded,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = meta;
        self
    }

    pub fn state(&self) -> ResourceState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state == ResourceState::Loaded
    }

    /// Request loading. Unloaded and failed resources move to `Loading`;
    /// loaded or in-flight resources are left as they are.
    pub fn load(&mut self) {
        if self.state == ResourceState::Unloaded || self.state == ResourceState::Failed {
            debug!("Loading {} '{}' from {}", self.kind, self.name, self.src);
            self.state = ResourceState::Loading;
        }
    }

    pub(crate) fn set_state(&mut self, state: ResourceState) {
        self.state = state;
    }
}

fn name_from_src(src: &str) -> String {
    Path::new(src)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(src)
        .to_string()
}

/// All registered resources, addressable by kind and name.
#[derive(Resource, Debug, Default)]
pub struct ResourceStore {
    resources: Vec<ResourceEntry>,
    by_name: FxHashMap<(ResourceKind, String), ResourceId>,
}

impl ResourceStore {
    pub fn new() -> Self {
        ResourceStore::default()
    }

    /// Register a resource and return its id.
    ///
    /// Every call creates a new entry. Name lookup keeps resolving to the
    /// first resource registered under a name; later ones with the same kind
    /// and name are reachable by id only.
    pub fn add(&mut self, resource: ResourceEntry) -> ResourceId {
        let id = ResourceId(self.resources.len());
        let key = (resource.kind, resource.name.clone());
        if let Some(existing) = self.by_name.get(&key).and_then(|e| self.resources.get(e.0)) {
            warn!(
                "{} name '{}' already points to {}, {} is reachable by id only",
                resource.kind, resource.name, existing.src, resource.src
            );
        } else {
            self.by_name.insert(key, id);
        }
        self.resources.push(resource);
        id
    }

    pub fn get(&self, id: ResourceId) -> Option<&ResourceEntry> {
        self.resources.get(id.0)
    }

    pub fn get_mut(&mut self, id: ResourceId) -> Option<&mut ResourceEntry> {
        self.resources.get_mut(id.0)
    }

    pub fn find(&self, kind: ResourceKind, name: &str) -> Option<&ResourceEntry> {
        self.by_name
            .get(&(kind, name.to_string()))
            .and_then(|id| self.get(*id))
    }

    pub fn get_texture(&self, name: &str) -> Option<&ResourceEntry> {
        self.find(ResourceKind::Texture, name)
    }

    pub fn get_sound(&self, name: &str) -> Option<&ResourceEntry> {
        self.find(ResourceKind::Sound, name)
    }

    pub fn get_spritesheet(&self, name: &str) -> Option<&ResourceEntry> {
        self.find(ResourceKind::SpriteSheet, name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceEntry> {
        self.resources.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ResourceEntry> {
        self.resources.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// `true` while any resource is waiting to be resolved.
    pub fn is_loading(&self) -> bool {
        self.resources
            .iter()
            .any(|r| r.state == ResourceState::Loading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_defaults_to_file_stem() {
        let res = ResourceEntry::new(ResourceKind::Texture, "assets/textures/ball.png");
        assert_eq!(res.name, "ball");
        assert_eq!(res.state(), ResourceState::Unloaded);
    }

    #[test]
    fn test_same_name_gets_its_own_entry() {
        let mut store = ResourceStore::new();
        let a = store.add(ResourceEntry::new(ResourceKind::Texture, "a/ball.png"));
        let b = store.add(ResourceEntry::new(ResourceKind::Texture, "b/ball.png"));
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(b).unwrap().src, "b/ball.png");
        assert_eq!(store.get_texture("ball").unwrap().src, "a/ball.png");
    }

    #[test]
    fn test_same_name_different_kind() {
        let mut store = ResourceStore::new();
        store.add(ResourceEntry::new(ResourceKind::Texture, "hit.png"));
        store.add(ResourceEntry::new(ResourceKind::Sound, "hit.wav"));
        assert_eq!(store.len(), 2);
        assert_eq!(store.get_sound("hit").unwrap().src, "hit.wav");
        assert!(store.get_spritesheet("hit").is_none());
    }

    #[test]
    fn test_load_marks_loading() {
        let mut store = ResourceStore::new();
        let id = store.add(ResourceEntry::new(ResourceKind::Sound, "ping.wav"));
        assert!(!store.is_loading());
        store.get_mut(id).unwrap().load();
        assert!(store.is_loading());
        assert_eq!(store.get(id).unwrap().state(), ResourceState::Loading);
    }
}
