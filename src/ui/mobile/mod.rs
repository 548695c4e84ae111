//! Mobile UI components for blescan
//!
//! Platform-neutral view models that native renderers bind to.

pub mod discovery_screen;

pub use discovery_screen::{DiscoveryScreen, ScreenModel};
