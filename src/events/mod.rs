//! Event types and observers used by the engine.
//!
//! Submodules:
//! - [`enginephase`] – startup phase transitions and their enter hooks
pub mod enginephase;
