//! Floating protractor: placement, hit-testing and drag handling for an
//! on-screen angle measuring tool, plus its persisted settings.
//!
//! The crate is toolkit-neutral. A host feeds [`tool::Controller`] pointer
//! and key events, executes the returned [`tool::Effect`]s and paints the
//! [`overlay::DrawCommand`]s it renders.

pub mod config;
pub mod exchange;
pub mod geometry;
pub mod overlay;
pub mod store;
pub mod tool;
