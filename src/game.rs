use bevy_ecs::hierarchy::ChildOf;
use bevy_ecs::prelude::*;
use log::info;

use crate::components::anchor::Anchor;
use crate::components::description::{Geometry, PositionTop, Text, WidgetFlags};
use crate::components::field::Field;
use crate::components::view::ViewId;
use crate::components::zindex::ZIndex;
use crate::resources::controllers::{Controller, ControllerCtx, ControllerRegistry};

/// Scope the match-3 template registers under.
pub const MATCH_GAME_SCOPE: &str = "MatchGame";

/// Layout of the match-3 field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchCfg {
    pub columns: u32,
    pub rows: u32,
    pub cell_size: f32,
}

impl Default for MatchCfg {
    fn default() -> Self {
        MatchCfg {
            columns: 8,
            rows: 8,
            cell_size: 64.0,
        }
    }
}

/// Controller of the match-3 template. On load it adds a centered [`Field`]
/// to its view.
#[derive(Debug, Default)]
pub struct MatchGame {
    pub cfg: MatchCfg,
    field: Option<Entity>,
}

impl MatchGame {
    pub fn new(cfg: MatchCfg) -> Self {
        MatchGame { cfg, field: None }
    }

    pub fn field(&self) -> Option<Entity> {
        self.field
    }
}

impl Controller for MatchGame {
    fn load(&mut self, ctx: &mut ControllerCtx<'_, '_, '_>) {
        let field = ctx
            .commands
            .spawn((
                Field::new(self.cfg.columns, self.cfg.rows, self.cfg.cell_size),
                Anchor::splat(0.5),
                ViewId::new(ctx.view),
            ))
            .id();
        info!(
            "{}: {}x{} field added to view {}",
            ctx.scope, self.cfg.columns, self.cfg.rows, ctx.view
        );
        self.field = Some(field);
    }

    fn unload(&mut self, ctx: &mut ControllerCtx<'_, '_, '_>) {
        if let Some(field) = self.field.take() {
            ctx.commands.entity(field).despawn();
        }
    }
}

/// Register the `MatchGame.Controller` factory.
pub fn register_match_game(registry: &mut ControllerRegistry, cfg: MatchCfg) {
    registry.add_factory(MATCH_GAME_SCOPE, "Controller", move |_view: &str| {
        MatchGame::new(cfg)
    });
}

/// Add a one-line description at the top of `view`: a black background with
/// a white text child. Returns the background entity.
pub fn add_description(commands: &mut Commands, view: &str, text: &str) -> Entity {
    let msg = Text {
        text: text.to_string(),
        color: "#ffffff".to_string(),
        size: 14,
    };
    let (width, height) = msg.extent();

    let bg = commands
        .spawn((
            Geometry {
                width: width + 10.0,
                height: height + 10.0,
                color: "#000000".to_string(),
            },
            ZIndex(9999),
            Anchor::new(0.5, 0.0),
            PositionTop {
                offset_x: 0.0,
                offset_y: 10.0,
            },
            WidgetFlags::overlay(),
            ViewId::new(view),
        ))
        .id();

    commands.spawn((
        msg,
        Anchor::splat(0.5),
        WidgetFlags::overlay(),
        ViewId::new(view),
        ChildOf(bg),
    ));

    bg
}
