//! Glance engine crate.
//!
//! Loads, compiles and links GLSL shader programs behind an owned
//! [`ShaderProgram`](shader::ShaderProgram) handle, and sets their uniforms.

pub mod device;
pub mod glsl;
pub mod logging;
pub mod shader;
