//! Graphics backend implementations
//!
//! The engine ships a windowless software backend used by the demo binary
//! and the test-suite. A context-owning GL/Vulkan backend would implement
//! the same [`crate::render::device::RenderDevice`] trait.

pub mod headless;

pub use headless::{DeviceEvent, HeadlessDevice};
