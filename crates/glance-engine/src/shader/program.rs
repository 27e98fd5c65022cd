use std::path::Path;

use super::context::{ProgramId, ShaderContext, StageId, StageKind, UniformLocation, UniformValue};
use super::error::ShaderError;
use super::info_log::{self, Diagnostic, DiagnosticOrigin, RetrievedLog};
use super::source::ShaderSource;
use super::uniform::Uniform;

/// What construction does when a stage fails to compile or the program fails to link.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum FailurePolicy {
    /// Log the failure, keep it in [`ShaderProgram::diagnostics`] and hand out
    /// the (degraded) program anyway.
    #[default]
    Report,
    /// Turn the failure into a [`ShaderError`].
    Reject,
}

/// Construction options for [`ShaderProgram`].
#[derive(Debug, Clone, Default)]
pub struct ProgramConfig {
    pub failure_policy: FailurePolicy,
}

/// Outcome of the compile and link checks performed during construction.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ProgramStatus {
    pub vertex_compiled: bool,
    pub fragment_compiled: bool,
    pub linked: bool,
}

impl ProgramStatus {
    pub fn is_ok(&self) -> bool {
        self.vertex_compiled && self.fragment_compiled && self.linked
    }
}

/// A stage object that is deleted when dropped.
struct Stage<'c, C: ShaderContext + ?Sized> {
    ctx: &'c C,
    id: StageId,
}

impl<C: ShaderContext + ?Sized> Drop for Stage<'_, C> {
    fn drop(&mut self) {
        self.ctx.delete_stage(self.id);
    }
}

/// A linked vertex + fragment program.
///
/// Owns its program object and deletes it on drop. Compile and link failures
/// are reported through `log` and [`diagnostics`](Self::diagnostics); under the
/// default [`FailurePolicy::Report`] such a program is still returned, in which
/// case [`is_degraded`](Self::is_degraded) is true and uniform lookups fail.
pub struct ShaderProgram<'c, C: ShaderContext + ?Sized> {
    ctx: &'c C,
    id: ProgramId,
    status: ProgramStatus,
    diagnostics: Vec<Diagnostic>,
}

impl<'c, C: ShaderContext + ?Sized> ShaderProgram<'c, C> {
    /// Reads both source files, then compiles and links them.
    pub fn new(
        ctx: &'c C,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
    ) -> Result<Self, ShaderError> {
        Self::with_config(ctx, vertex_path, fragment_path, ProgramConfig::default())
    }

    pub fn with_config(
        ctx: &'c C,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
        config: ProgramConfig,
    ) -> Result<Self, ShaderError> {
        // Both reads happen before the context is touched.
        let vertex = ShaderSource::read(vertex_path)?;
        let fragment = ShaderSource::read(fragment_path)?;
        Self::from_sources(ctx, &vertex, &fragment, config)
    }

    pub fn from_sources(
        ctx: &'c C,
        vertex: &ShaderSource,
        fragment: &ShaderSource,
        config: ProgramConfig,
    ) -> Result<Self, ShaderError> {
        let reject = config.failure_policy == FailurePolicy::Reject;
        let mut diagnostics = Vec::new();

        let (vertex_stage, vertex_compiled) =
            compile_stage(ctx, StageKind::Vertex, vertex, &mut diagnostics);
        if reject && !vertex_compiled {
            return Err(compile_error(StageKind::Vertex, diagnostics));
        }

        let (fragment_stage, fragment_compiled) =
            compile_stage(ctx, StageKind::Fragment, fragment, &mut diagnostics);
        if reject && !fragment_compiled {
            return Err(compile_error(StageKind::Fragment, diagnostics));
        }

        let id = ctx.create_program();
        let mut program = Self {
            ctx,
            id,
            status: ProgramStatus {
                vertex_compiled,
                fragment_compiled,
                linked: false,
            },
            diagnostics,
        };

        ctx.attach_stage(id, vertex_stage.id);
        ctx.attach_stage(id, fragment_stage.id);
        ctx.link_program(id);
        program.status.linked = program.check_linked();

        // Only the program handle outlives construction.
        drop(vertex_stage);
        drop(fragment_stage);

        if reject && !program.status.linked {
            let log = program
                .diagnostics
                .iter()
                .rev()
                .find(|d| d.origin == DiagnosticOrigin::Link)
                .map(|d| d.log.clone())
                .unwrap_or_default();
            return Err(ShaderError::Link { log });
        }

        log::debug!(
            "shader program {} built from {} + {}",
            id,
            vertex.origin(),
            fragment.origin()
        );
        Ok(program)
    }

    fn check_linked(&mut self) -> bool {
        let ctx = self.ctx;
        let id = self.id;
        if ctx.program_link_status(id) {
            return true;
        }

        let retrieved = info_log::retrieve(
            || ctx.program_info_log_length(id),
            |capacity| ctx.program_info_log(id, capacity),
        );
        self.diagnostics
            .push(report(DiagnosticOrigin::Link, id.0, retrieved));
        false
    }

    /// Makes this the current program of the context.
    ///
    /// Uniform setters write into the current program, so call this first.
    pub fn use_program(&self) {
        self.ctx.use_program(Some(self.id));
    }

    pub fn set_bool(&self, name: &str, value: bool) {
        self.set_uniform(name, value);
    }

    pub fn set_int(&self, name: &str, value: i32) {
        self.set_uniform(name, value);
    }

    pub fn set_float(&self, name: &str, value: f32) {
        self.set_uniform(name, value);
    }

    pub fn set_vec4(&self, name: &str, value: [f32; 4]) {
        self.set_uniform(name, value);
    }

    /// Writes `value` into the uniform `name`.
    ///
    /// An unresolved name is logged and otherwise ignored.
    pub fn set_uniform<V: Uniform>(&self, name: &str, value: V) {
        if let Some(location) = self.resolve(name) {
            value.write(self.ctx, location);
        }
    }

    /// Reads back the current value of the uniform `name`.
    pub fn uniform_value(&self, name: &str) -> Option<UniformValue> {
        let location = self.ctx.uniform_location(self.id, name)?;
        self.ctx.uniform_value(self.id, location)
    }

    fn resolve(&self, name: &str) -> Option<UniformLocation> {
        let location = self.ctx.uniform_location(self.id, name);
        if location.is_none() {
            log::error!("{}", unresolved_uniform_message(name, self.id));
        }
        location
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn status(&self) -> ProgramStatus {
        self.status
    }

    /// True if a stage failed to compile or the program failed to link.
    pub fn is_degraded(&self) -> bool {
        !self.status.is_ok()
    }

    /// Compile and link failures reported while building this program.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

impl<C: ShaderContext + ?Sized> Drop for ShaderProgram<'_, C> {
    fn drop(&mut self) {
        log::trace!("deleting shader program {}", self.id);
        self.ctx.delete_program(self.id);
    }
}

fn compile_stage<'c, C: ShaderContext + ?Sized>(
    ctx: &'c C,
    kind: StageKind,
    source: &ShaderSource,
    diagnostics: &mut Vec<Diagnostic>,
) -> (Stage<'c, C>, bool) {
    let stage = Stage {
        ctx,
        id: ctx.create_stage(kind),
    };
    ctx.stage_source(stage.id, source.text());
    ctx.compile_stage(stage.id);

    let compiled = ctx.stage_compile_status(stage.id);
    if compiled {
        log::trace!("compiled {kind} shader {} from {}", stage.id, source.origin());
    } else {
        log::error!("{kind} shader {} ({}) did not compile", stage.id, source.origin());
        let retrieved = info_log::retrieve(
            || ctx.stage_info_log_length(stage.id),
            |capacity| ctx.stage_info_log(stage.id, capacity),
        );
        diagnostics.push(report(DiagnosticOrigin::Compile(kind), stage.id.0, retrieved));
    }

    (stage, compiled)
}

fn report(origin: DiagnosticOrigin, object: u32, retrieved: Option<RetrievedLog>) -> Diagnostic {
    let (log, length_mismatch) = match retrieved {
        Some(r) => (r.text, r.length_mismatch),
        None => (String::new(), None),
    };

    match origin {
        DiagnosticOrigin::Compile(kind) if log.is_empty() => {
            log::error!("failed to compile {kind} shader {object}; no compiler log available")
        }
        DiagnosticOrigin::Compile(kind) => {
            log::error!("failed to compile {kind} shader {object}. Compiler log:\n{log}")
        }
        DiagnosticOrigin::Link if log.is_empty() => {
            log::error!("failed to link shader program {object}; no linker log available")
        }
        DiagnosticOrigin::Link => {
            log::error!("failed to link shader program {object}. Linker log:\n{log}")
        }
    }

    Diagnostic {
        origin,
        object,
        log,
        length_mismatch,
    }
}

fn compile_error(stage: StageKind, diagnostics: Vec<Diagnostic>) -> ShaderError {
    let log = diagnostics
        .into_iter()
        .rev()
        .find(|d| d.origin == DiagnosticOrigin::Compile(stage))
        .map(|d| d.log)
        .unwrap_or_default();
    ShaderError::Compile { stage, log }
}

pub(crate) fn unresolved_uniform_message(name: &str, program: ProgramId) -> String {
    format!(
        "could not find uniform `{name}`: it is not an active uniform of shader program \
         {program} or the name is reserved"
    )
}
