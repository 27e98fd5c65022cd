//! GPU device management.
//!
//! Creates the wgpu Instance/Adapter/Device/Queue used by GPU-backed shader
//! contexts. No surface is involved; rendering targets offscreen textures.

mod gpu;

pub use gpu::{Gpu, GpuInit};
