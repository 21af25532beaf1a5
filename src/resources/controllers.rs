//! Controller registry.
//!
//! A *scope* is a named namespace holding controller factories keyed by type
//! name and at most one active controller instance. Controllers are addressed
//! as `"Scope.Type"`; a bare `"Scope"` means `"Scope.Controller"`.
//!
//! Lifecycle per scope:
//!
//! ```text
//! Unregistered -> Registered -> (Loaded) -> (Ready) -> Removing -> Unregistered
//! ```
//!
//! A controller registered after the engine passed its controller-loading
//! phase receives `load()` right away, and `ready()` as well when the engine
//! is ready, so late controllers never miss a hook.
//!
//! Removal is always deferred: [`ControllerRegistry::remove_ctrl`],
//! [`ControllerRegistry::unregister`] and
//! [`ControllerRegistry::unregister_all`] run `unload()` and `release()`
//! immediately and mark the controller as removing. It keeps its scope slot
//! and stops receiving hooks until
//! [`remove_pending_controllers`](crate::systems::controllers::remove_pending_controllers)
//! drops it on the next tick.

use bevy_ecs::prelude::*;
use log::{debug, error};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::fmt;
use thiserror::Error;

use crate::resources::enginestate::EngineState;

/// Type name used when a controller name has no `.Type` part.
pub const DEFAULT_CONTROLLER_TYPE: &str = "Controller";

/// Error type for controller registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("no controller name is defined")]
    NoName,
    #[error("name should be in format \"MyScope.Controller\", got \"{0}\"")]
    BadFormat(String),
    #[error("no such scope defined: {0}")]
    NoScope(String),
    #[error("no controller ({ctrl}) found in scope: {scope}")]
    NoConstructor { scope: String, ctrl: String },
    #[error("controller ({0}) is already added in scope")]
    AlreadyAdded(String),
    #[error("no controller added to the scope: {0}")]
    NotAdded(String),
    #[error("controller ({0}) is not the same as the one added to the scope")]
    Mismatch(String),
    #[error("controller ({0}) is already being removed")]
    AlreadyRemoving(String),
}

/// Hooks a controller receives over its lifetime.
///
/// All hooks default to doing nothing.
pub trait Controller: Send + Sync + 'static {
    fn load(&mut self, _ctx: &mut ControllerCtx<'_, '_, '_>) {}
    fn ready(&mut self, _ctx: &mut ControllerCtx<'_, '_, '_>) {}
    fn unload(&mut self, _ctx: &mut ControllerCtx<'_, '_, '_>) {}
    fn release(&mut self, _ctx: &mut ControllerCtx<'_, '_, '_>) {}
}

/// What a controller sees while one of its hooks runs.
pub struct ControllerCtx<'a, 'w, 's> {
    /// Scope the controller is registered under.
    pub scope: &'a str,
    /// View the controller adds its entities to.
    pub view: &'a str,
    pub commands: &'a mut Commands<'w, 's>,
}

/// Builds a controller for the given view.
pub type ControllerFactory = Box<dyn Fn(&str) -> Box<dyn Controller> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControllerId(pub u64);

/// Caller-side reference to a controller owned by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ControllerHandle {
    pub id: ControllerId,
    pub scope: String,
}

/// A created controller, stamped with its scope and view.
pub struct ControllerInstance {
    id: ControllerId,
    scope: String,
    view: String,
    controller: Box<dyn Controller>,
}

impl ControllerInstance {
    pub fn id(&self) -> ControllerId {
        self.id
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn view(&self) -> &str {
        &self.view
    }

    pub fn handle(&self) -> ControllerHandle {
        ControllerHandle {
            id: self.id,
            scope: self.scope.clone(),
        }
    }

    fn run(&mut self, hook: Hook, commands: &mut Commands) {
        debug!("{:?} controller {} ({})", hook, self.scope, self.id.0);
        let mut ctx = ControllerCtx {
            scope: &self.scope,
            view: &self.view,
            commands,
        };
        match hook {
            Hook::Load => self.controller.load(&mut ctx),
            Hook::Ready => self.controller.ready(&mut ctx),
            Hook::Unload => self.controller.unload(&mut ctx),
            Hook::Release => self.controller.release(&mut ctx),
        }
    }
}

impl fmt::Debug for ControllerInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerInstance")
            .field("id", &self.id)
            .field("scope", &self.scope)
            .field("view", &self.view)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy)]
enum Hook {
    Load,
    Ready,
    Unload,
    Release,
}

#[derive(Default)]
struct Scope {
    factories: FxHashMap<String, ControllerFactory>,
    active: Option<ControllerId>,
}

struct LiveController {
    instance: ControllerInstance,
    removing: bool,
}

/// Split `"Scope.Type"` into its parts, defaulting the type.
pub fn parse_ctrl_name(name: &str) -> Result<(&str, &str), ControllerError> {
    if name.is_empty() {
        return Err(ControllerError::NoName);
    }
    let parts: SmallVec<[&str; 3]> = name.split('.').collect();
    match parts.as_slice() {
        [scope] => Ok((*scope, DEFAULT_CONTROLLER_TYPE)),
        [scope, ctrl] => Ok((*scope, *ctrl)),
        _ => Err(ControllerError::BadFormat(name.to_string())),
    }
}

/// Scopes, their factories and the ordered list of live controllers.
#[derive(Resource)]
pub struct ControllerRegistry {
    scopes: FxHashMap<String, Scope>,
    live: Vec<LiveController>,
    default_view: String,
    next_id: u64,
}

impl Default for ControllerRegistry {
    fn default() -> Self {
        Self::new(crate::components::view::DEFAULT_VIEW)
    }
}

impl ControllerRegistry {
    pub fn new(default_view: impl Into<String>) -> Self {
        ControllerRegistry {
            scopes: FxHashMap::default(),
            live: Vec::new(),
            default_view: default_view.into(),
            next_id: 1,
        }
    }

    pub fn default_view(&self) -> &str {
        &self.default_view
    }

    /// Declare a scope. Returns `false` if it already existed.
    pub fn define_scope(&mut self, scope: impl Into<String>) -> bool {
        let scope = scope.into();
        if self.scopes.contains_key(&scope) {
            return false;
        }
        self.scopes.insert(scope, Scope::default());
        true
    }

    /// Register a controller factory under `scope.type_name`, declaring the
    /// scope if needed. A factory with the same name is replaced.
    pub fn add_factory<C, F>(&mut self, scope: &str, type_name: &str, factory: F)
    where
        C: Controller,
        F: Fn(&str) -> C + Send + Sync + 'static,
    {
        let boxed: ControllerFactory =
            Box::new(move |view: &str| -> Box<dyn Controller> { Box::new(factory(view)) });
        self.scopes
            .entry(scope.to_string())
            .or_default()
            .factories
            .insert(type_name.to_string(), boxed);
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains_key(scope)
    }

    /// Handle of the controller active in `scope`, including one that is
    /// pending removal.
    pub fn active(&self, scope: &str) -> Option<ControllerHandle> {
        let id = self.scopes.get(scope)?.active?;
        Some(ControllerHandle {
            id,
            scope: scope.to_string(),
        })
    }

    pub fn is_removing(&self, handle: &ControllerHandle) -> bool {
        self.live
            .iter()
            .any(|c| c.instance.id == handle.id && c.removing)
    }

    /// Handles of all live controllers in registration order.
    pub fn handles(&self) -> Vec<ControllerHandle> {
        self.live.iter().map(|c| c.instance.handle()).collect()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Instantiate the controller named `name` without registering it.
    pub fn try_create_ctrl(
        &mut self,
        name: &str,
        view: Option<&str>,
    ) -> Result<ControllerInstance, ControllerError> {
        let (scope_name, ctrl_name) = parse_ctrl_name(name)?;
        let scope = self
            .scopes
            .get(scope_name)
            .ok_or_else(|| ControllerError::NoScope(scope_name.to_string()))?;
        let factory =
            scope
                .factories
                .get(ctrl_name)
                .ok_or_else(|| ControllerError::NoConstructor {
                    scope: scope_name.to_string(),
                    ctrl: ctrl_name.to_string(),
                })?;

        let view = view.unwrap_or(self.default_view.as_str()).to_string();
        let controller = factory(&view);
        let id = ControllerId(self.next_id);
        self.next_id += 1;

        Ok(ControllerInstance {
            id,
            scope: scope_name.to_string(),
            view,
            controller,
        })
    }

    pub fn create_ctrl(&mut self, name: &str, view: Option<&str>) -> Option<ControllerInstance> {
        self.try_create_ctrl(name, view)
            .map_err(|e| error!("create_ctrl: {}", e))
            .ok()
    }

    /// Activate an already created controller in its scope.
    pub fn try_add_ctrl(
        &mut self,
        mut instance: ControllerInstance,
        engine: &EngineState,
        commands: &mut Commands,
    ) -> Result<ControllerHandle, ControllerError> {
        let scope = self
            .scopes
            .get_mut(&instance.scope)
            .ok_or_else(|| ControllerError::NoScope(instance.scope.clone()))?;
        if scope.active.is_some() {
            return Err(ControllerError::AlreadyAdded(instance.scope.clone()));
        }
        scope.active = Some(instance.id);

        if engine.is_ctrl_loaded() {
            instance.run(Hook::Load, commands);
        }
        if engine.is_ready() {
            instance.run(Hook::Ready, commands);
        }

        let handle = instance.handle();
        self.live.push(LiveController {
            instance,
            removing: false,
        });
        Ok(handle)
    }

    pub fn add_ctrl(
        &mut self,
        instance: ControllerInstance,
        engine: &EngineState,
        commands: &mut Commands,
    ) -> Option<ControllerHandle> {
        self.try_add_ctrl(instance, engine, commands)
            .map_err(|e| error!("add_ctrl: {}", e))
            .ok()
    }

    /// Create the controller named `name` and activate it.
    ///
    /// Fails without creating anything when the scope already has an active
    /// controller.
    pub fn try_register(
        &mut self,
        name: &str,
        view: Option<&str>,
        engine: &EngineState,
        commands: &mut Commands,
    ) -> Result<ControllerHandle, ControllerError> {
        let (scope_name, _) = parse_ctrl_name(name)?;
        if let Some(scope) = self.scopes.get(scope_name) {
            if scope.active.is_some() {
                return Err(ControllerError::AlreadyAdded(scope_name.to_string()));
            }
        }
        let instance = self.try_create_ctrl(name, view)?;
        self.try_add_ctrl(instance, engine, commands)
    }

    pub fn register(
        &mut self,
        name: &str,
        view: Option<&str>,
        engine: &EngineState,
        commands: &mut Commands,
    ) -> Option<ControllerHandle> {
        self.try_register(name, view, engine, commands)
            .map_err(|e| error!("register: {}", e))
            .ok()
    }

    /// Unload and release the controller behind `handle`.
    ///
    /// Nothing happens when the handle does not match the controller active
    /// in its scope.
    pub fn try_remove_ctrl(
        &mut self,
        handle: &ControllerHandle,
        commands: &mut Commands,
    ) -> Result<(), ControllerError> {
        let scope = self
            .scopes
            .get(&handle.scope)
            .ok_or_else(|| ControllerError::NoScope(handle.scope.clone()))?;
        let active = scope
            .active
            .ok_or_else(|| ControllerError::NotAdded(handle.scope.clone()))?;
        if active != handle.id {
            return Err(ControllerError::Mismatch(handle.scope.clone()));
        }
        self.begin_removal(active, &handle.scope, commands)
    }

    pub fn remove_ctrl(&mut self, handle: &ControllerHandle, commands: &mut Commands) -> bool {
        self.try_remove_ctrl(handle, commands)
            .map_err(|e| error!("remove_ctrl: {}", e))
            .is_ok()
    }

    /// Unload and release the controller active under `name`'s scope.
    pub fn try_unregister(
        &mut self,
        name: &str,
        commands: &mut Commands,
    ) -> Result<(), ControllerError> {
        let (scope_name, ctrl_name) = parse_ctrl_name(name)?;
        let scope = self
            .scopes
            .get(scope_name)
            .ok_or_else(|| ControllerError::NoScope(scope_name.to_string()))?;
        if !scope.factories.contains_key(ctrl_name) {
            return Err(ControllerError::NoConstructor {
                scope: scope_name.to_string(),
                ctrl: ctrl_name.to_string(),
            });
        }
        let active = scope
            .active
            .ok_or_else(|| ControllerError::NotAdded(scope_name.to_string()))?;
        let scope_name = scope_name.to_string();
        self.begin_removal(active, &scope_name, commands)
    }

    pub fn unregister(&mut self, name: &str, commands: &mut Commands) -> bool {
        self.try_unregister(name, commands)
            .map_err(|e| error!("unregister: {}", e))
            .is_ok()
    }

    /// Unload and release every live controller. Returns how many were
    /// scheduled for removal.
    pub fn unregister_all(&mut self, commands: &mut Commands) -> usize {
        let mut count = 0;
        for live in self.live.iter_mut().filter(|c| !c.removing) {
            live.instance.run(Hook::Unload, commands);
            live.instance.run(Hook::Release, commands);
            live.removing = true;
            count += 1;
        }
        count
    }

    fn begin_removal(
        &mut self,
        id: ControllerId,
        scope: &str,
        commands: &mut Commands,
    ) -> Result<(), ControllerError> {
        let live = self
            .live
            .iter_mut()
            .find(|c| c.instance.id == id)
            .ok_or_else(|| ControllerError::NotAdded(scope.to_string()))?;
        if live.removing {
            return Err(ControllerError::AlreadyRemoving(scope.to_string()));
        }
        live.instance.run(Hook::Unload, commands);
        live.instance.run(Hook::Release, commands);
        live.removing = true;
        Ok(())
    }

    /// Drop every controller marked as removing and free its scope slot.
    pub fn remove_pending(&mut self) -> Vec<ControllerInstance> {
        let (removed, kept): (Vec<_>, Vec<_>) =
            self.live.drain(..).partition(|c| c.removing);
        self.live = kept;

        removed
            .into_iter()
            .map(|c| {
                if let Some(scope) = self.scopes.get_mut(&c.instance.scope) {
                    if scope.active == Some(c.instance.id) {
                        scope.active = None;
                    }
                }
                c.instance
            })
            .collect()
    }

    /// Call `load()` on every live controller, in registration order.
    pub fn load_all(&mut self, commands: &mut Commands) {
        self.run_all(Hook::Load, commands);
    }

    /// Call `ready()` on every live controller, in registration order.
    pub fn ready_all(&mut self, commands: &mut Commands) {
        self.run_all(Hook::Ready, commands);
    }

    fn run_all(&mut self, hook: Hook, commands: &mut Commands) {
        for live in self.live.iter_mut().filter(|c| !c.removing) {
            live.instance.run(hook, commands);
        }
    }
}

/// Register `name` against the world's registry and engine state, applying
/// the commands issued by any hook that ran.
pub fn register_controller(
    world: &mut World,
    name: &str,
    view: Option<&str>,
) -> Option<ControllerHandle> {
    let handle = world
        .try_resource_scope(|world, mut registry: Mut<ControllerRegistry>| {
            let engine = world
                .get_resource::<EngineState>()
                .cloned()
                .unwrap_or_default();
            let mut commands = world.commands();
            registry.register(name, view, &engine, &mut commands)
        })
        .flatten();
    world.flush();
    handle
}

/// Unregister `name` from the world's registry, applying hook commands.
pub fn unregister_controller(world: &mut World, name: &str) -> bool {
    let removed = world
        .try_resource_scope(|world, mut registry: Mut<ControllerRegistry>| {
            let mut commands = world.commands();
            registry.unregister(name, &mut commands)
        })
        .unwrap_or(false);
    world.flush();
    removed
}
