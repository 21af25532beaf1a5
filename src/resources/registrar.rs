//! Resource registration helpers.
//!
//! A *buffer* is a JSON-like value holding either one descriptor or a list of
//! them. A descriptor is a plain path string or an object with a `path`, an
//! optional `name` and any extra metadata:
//!
//! ```json
//! ["ball.png", { "path": "bricks.png", "name": "bricks", "frames": 4 }]
//! ```
//!
//! Every descriptor becomes one [`ResourceEntry`] whose source is the
//! normalized folder path followed by the descriptor path. In
//! [`LoadMode::Preload`] each new resource is loaded right away; otherwise it
//! stays unloaded until requested.

use log::warn;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::resources::resourcestore::{ResourceEntry, ResourceId, ResourceKind, ResourceStore};

/// Error type for resource registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrarError {
    /// The buffer is not a string, an object or a list.
    #[error("unsupported resource buffer: {0}")]
    UnsupportedBuffer(&'static str),
    /// A descriptor could not be turned into a resource.
    #[error("invalid resource descriptor: {0}")]
    InvalidDescriptor(String),
}

/// Whether new resources are loaded at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Register only; the resource loads when first requested.
    Load,
    /// Register and load immediately.
    Preload,
}

/// One resource to register.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceDescriptor {
    Path(String),
    Detailed {
        path: String,
        name: Option<String>,
        meta: Map<String, Value>,
    },
}

#[derive(Deserialize)]
struct DetailedFields {
    path: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(flatten)]
    meta: Map<String, Value>,
}

impl ResourceDescriptor {
    pub fn from_value(value: &Value) -> Result<Self, RegistrarError> {
        match value {
            Value::String(path) => Ok(ResourceDescriptor::Path(path.clone())),
            Value::Object(_) => {
                let fields: DetailedFields = serde_json::from_value(value.clone())
                    .map_err(|e| RegistrarError::InvalidDescriptor(e.to_string()))?;
                Ok(ResourceDescriptor::Detailed {
                    path: fields.path,
                    name: fields.name,
                    meta: fields.meta,
                })
            }
            other => Err(RegistrarError::InvalidDescriptor(format!(
                "expected a path or an object, got {}",
                value_type(other)
            ))),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            ResourceDescriptor::Path(path) => path,
            ResourceDescriptor::Detailed { path, .. } => path,
        }
    }

    /// Build the resource this descriptor names, resolved against
    /// `folder_path` (already normalized).
    pub fn into_resource(self, kind: ResourceKind, folder_path: &str) -> ResourceEntry {
        match self {
            ResourceDescriptor::Path(path) => {
                ResourceEntry::new(kind, format!("{}{}", folder_path, path))
            }
            ResourceDescriptor::Detailed { path, name, meta } => {
                let resource =
                    ResourceEntry::new(kind, format!("{}{}", folder_path, path)).with_meta(meta);
                match name {
                    Some(name) => resource.with_name(name),
                    None => resource,
                }
            }
        }
    }
}

fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// Make a non-empty folder path end with exactly one `/`.
///
/// `None` and `""` mean no prefix.
pub fn normalize_folder_path(folder_path: Option<&str>) -> String {
    match folder_path {
        None | Some("") => String::new(),
        Some(path) if path.ends_with('/') => path.to_string(),
        Some(path) => format!("{}/", path),
    }
}

/// Register every descriptor in `buffer` as a resource of `kind`.
///
/// List elements that are not descriptors are skipped with a warning; the
/// call only fails when `buffer` itself is not a string, object or list.
pub fn try_add_resources(
    store: &mut ResourceStore,
    kind: ResourceKind,
    buffer: &Value,
    folder_path: Option<&str>,
    mode: LoadMode,
) -> Result<Vec<ResourceId>, RegistrarError> {
    let folder_path = normalize_folder_path(folder_path);

    let descriptors: Vec<&Value> = match buffer {
        Value::Array(items) => items.iter().collect(),
        Value::String(_) | Value::Object(_) => vec![buffer],
        other => return Err(RegistrarError::UnsupportedBuffer(value_type(other))),
    };

    let mut created = Vec::with_capacity(descriptors.len());
    for value in descriptors {
        let descriptor = match ResourceDescriptor::from_value(value) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!("Skipping {} descriptor: {}", kind, e);
                continue;
            }
        };
        let id = store.add(descriptor.into_resource(kind, &folder_path));
        if mode == LoadMode::Preload {
            if let Some(resource) = store.get_mut(id) {
                resource.load();
            }
        }
        created.push(id);
    }

    Ok(created)
}

/// Like [`try_add_resources`], logging a warning tagged with `caller` and
/// returning `None` on failure.
pub fn add_resources(
    store: &mut ResourceStore,
    kind: ResourceKind,
    buffer: &Value,
    folder_path: Option<&str>,
    mode: LoadMode,
    caller: &str,
) -> Option<Vec<ResourceId>> {
    match try_add_resources(store, kind, buffer, folder_path, mode) {
        Ok(ids) => Some(ids),
        Err(e) => {
            warn!("[{}]: Unsupported parameter was passed: {}", caller, e);
            None
        }
    }
}

/// Register textures; they load when first requested.
pub fn load_textures(store: &mut ResourceStore, buffer: &Value, folder_path: Option<&str>) -> bool {
    add_resources(
        store,
        ResourceKind::Texture,
        buffer,
        folder_path,
        LoadMode::Load,
        "load_textures",
    )
    .is_some()
}

/// Register textures and load them immediately.
pub fn preload_textures(
    store: &mut ResourceStore,
    buffer: &Value,
    folder_path: Option<&str>,
) -> bool {
    add_resources(
        store,
        ResourceKind::Texture,
        buffer,
        folder_path,
        LoadMode::Preload,
        "preload_textures",
    )
    .is_some()
}

/// Register sounds; they load when first requested.
pub fn load_sounds(store: &mut ResourceStore, buffer: &Value, folder_path: Option<&str>) -> bool {
    add_resources(
        store,
        ResourceKind::Sound,
        buffer,
        folder_path,
        LoadMode::Load,
        "load_sounds",
    )
    .is_some()
}

/// Register sounds and load them immediately.
pub fn preload_sounds(store: &mut ResourceStore, buffer: &Value, folder_path: Option<&str>) -> bool {
    add_resources(
        store,
        ResourceKind::Sound,
        buffer,
        folder_path,
        LoadMode::Preload,
        "preload_sounds",
    )
    .is_some()
}

/// Register spritesheets. Spritesheets are always preloaded.
pub fn load_spritesheet(
    store: &mut ResourceStore,
    buffer: &Value,
    folder_path: Option<&str>,
) -> bool {
    add_resources(
        store,
        ResourceKind::SpriteSheet,
        buffer,
        folder_path,
        LoadMode::Preload,
        "load_spritesheet",
    )
    .is_some()
}
