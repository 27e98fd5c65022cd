//! GLSL rendering context backed by naga.
//!
//! [`GlslContext`] implements [`ShaderContext`](crate::shader::ShaderContext)
//! with GL object semantics: integer handles, deferred deletion of attached
//! stages and of the current program, and a sticky error flag.

mod compile;
mod context;
mod error;
mod gpu;
mod link;
mod uniforms;

pub use context::GlslContext;
pub use error::ContextError;
pub use gpu::{GpuProgram, ENTRY_POINT};
