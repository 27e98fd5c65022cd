//! Shader programs.
//!
//! [`ShaderProgram`] reads a vertex and a fragment source, compiles and links
//! them through a [`ShaderContext`] and exposes typed uniform setters. Source
//! read failures abort construction; compile, link and uniform lookup failures
//! are reported and, by default, tolerated.

mod context;
mod error;
mod info_log;
mod program;
mod source;
mod uniform;

#[cfg(test)]
mod recording;

pub use context::{
    InfoLog, ProgramId, ShaderContext, StageId, StageKind, UniformLocation, UniformValue,
};
pub use error::{ShaderError, SourceReadError};
pub use info_log::{Diagnostic, DiagnosticOrigin, LengthMismatch};
pub use program::{FailurePolicy, ProgramConfig, ProgramStatus, ShaderProgram};
pub use source::ShaderSource;
pub use uniform::Uniform;
