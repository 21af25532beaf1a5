//! ECS components for entities.
//!
//! Entities in this crate are created by controllers and demo helpers and
//! are consumed by the (external) renderer.
//!
//! Submodules overview:
//! - [`anchor`] – normalized anchor point relative to the parent
//! - [`description`] – text and background parts of the description widget
//! - [`field`] – playing field of the match-3 template
//! - [`view`] – name of the view an entity was added to
//! - [`zindex`] – draw order hint

pub mod anchor;
pub mod description;
pub mod field;
pub mod view;
pub mod zindex;
