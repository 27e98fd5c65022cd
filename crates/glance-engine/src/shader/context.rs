use std::fmt;

/// Pipeline stage a stage object is compiled for.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StageKind {
    Vertex,
    Fragment,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Vertex => f.write_str("vertex"),
            StageKind::Fragment => f.write_str("fragment"),
        }
    }
}

/// Handle to a stage object owned by a rendering context.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct StageId(pub u32);

/// Handle to a program object owned by a rendering context.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ProgramId(pub u32);

/// Slot of an active uniform inside one program.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct UniformLocation(pub u32);

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of an info log fetch.
///
/// `written` counts the characters placed in `text`, excluding the terminator
/// that the matching `*_info_log_length` query includes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InfoLog {
    pub text: String,
    pub written: usize,
}

/// Value read back from a uniform slot.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Uint(u32),
    Float(f32),
    Vec4([f32; 4]),
}

/// Operations a rendering context provides to build and drive shader programs.
///
/// Contexts are confined to one thread and mutate internal state through `&self`,
/// the same way a current GL context is ambient state rather than a value.
/// Uniform writes target whichever program was last passed to [`use_program`].
///
/// [`use_program`]: ShaderContext::use_program
pub trait ShaderContext {
    fn create_stage(&self, kind: StageKind) -> StageId;
    fn stage_source(&self, stage: StageId, source: &str);
    fn compile_stage(&self, stage: StageId);
    fn stage_compile_status(&self, stage: StageId) -> bool;
    /// Byte length of the compile log, including the trailing terminator. Zero if empty.
    fn stage_info_log_length(&self, stage: StageId) -> usize;
    fn stage_info_log(&self, stage: StageId, capacity: usize) -> InfoLog;
    fn delete_stage(&self, stage: StageId);

    fn create_program(&self) -> ProgramId;
    fn attach_stage(&self, program: ProgramId, stage: StageId);
    fn link_program(&self, program: ProgramId);
    fn program_link_status(&self, program: ProgramId) -> bool;
    /// Byte length of the link log, including the trailing terminator. Zero if empty.
    fn program_info_log_length(&self, program: ProgramId) -> usize;
    fn program_info_log(&self, program: ProgramId, capacity: usize) -> InfoLog;
    fn delete_program(&self, program: ProgramId);

    fn use_program(&self, program: Option<ProgramId>);
    fn current_program(&self) -> Option<ProgramId>;

    /// Resolves `name` to an active uniform of `program`.
    ///
    /// Returns `None` when the name is not active, is reserved, or the program
    /// has not been linked successfully.
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    fn uniform_1i(&self, location: UniformLocation, value: i32);
    fn uniform_1f(&self, location: UniformLocation, value: f32);
    fn uniform_4f(&self, location: UniformLocation, value: [f32; 4]);

    /// Reads the current value of a uniform slot.
    fn uniform_value(&self, program: ProgramId, location: UniformLocation) -> Option<UniformValue>;
}
