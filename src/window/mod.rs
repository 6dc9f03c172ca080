//! Overlay window machinery.
//!
//! Submodules:
//! - [`character`] – one overlay window per character, on a dedicated thread
//! - [`events`] – per-thread event drain and the draggable hit test
//! - [`registry`] – shared render contexts for cross-thread forced renders
//! - [`watcher`] – global event watch that renders during window drags

pub mod character;
pub mod events;
pub mod registry;
pub mod watcher;
