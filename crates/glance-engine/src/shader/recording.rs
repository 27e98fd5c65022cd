//! A scripted context that records calls, for protocol-level tests.

use std::cell::{Cell, RefCell};

use super::context::{
    InfoLog, ProgramId, ShaderContext, StageId, StageKind, UniformLocation, UniformValue,
};

/// What the context answers when a log is fetched.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedLog {
    pub text: String,
    pub written: usize,
}

pub(crate) struct RecordingContext {
    compile_ok: bool,
    log_length: usize,
    log: ScriptedLog,
    next_id: Cell<u32>,
    fetches: Cell<usize>,
    calls: RefCell<Vec<String>>,
    deleted_stages: RefCell<Vec<StageId>>,
    deleted_programs: RefCell<Vec<ProgramId>>,
    current: Cell<Option<ProgramId>>,
}

impl RecordingContext {
    /// Every compile and link fails; every log query answers `log_length`.
    pub(crate) fn failing_compile(log_length: usize, log: ScriptedLog) -> Self {
        Self {
            compile_ok: false,
            log_length,
            log,
            next_id: Cell::new(1),
            fetches: Cell::new(0),
            calls: RefCell::new(Vec::new()),
            deleted_stages: RefCell::new(Vec::new()),
            deleted_programs: RefCell::new(Vec::new()),
            current: Cell::new(None),
        }
    }

    pub(crate) fn log_fetches(&self) -> usize {
        self.fetches.get()
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub(crate) fn deleted_stages(&self) -> Vec<StageId> {
        self.deleted_stages.borrow().clone()
    }

    pub(crate) fn deleted_programs(&self) -> Vec<ProgramId> {
        self.deleted_programs.borrow().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.borrow_mut().push(call.into());
    }

    fn next(&self) -> u32 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn fetch(&self, capacity: usize) -> InfoLog {
        self.fetches.set(self.fetches.get() + 1);
        assert_eq!(capacity, self.log_length);
        InfoLog {
            text: self.log.text.clone(),
            written: self.log.written,
        }
    }
}

impl ShaderContext for RecordingContext {
    fn create_stage(&self, kind: StageKind) -> StageId {
        self.record(format!("create_stage {kind}"));
        StageId(self.next())
    }

    fn stage_source(&self, stage: StageId, _source: &str) {
        self.record(format!("stage_source {stage}"));
    }

    fn compile_stage(&self, stage: StageId) {
        self.record(format!("compile {stage}"));
    }

    fn stage_compile_status(&self, _stage: StageId) -> bool {
        self.compile_ok
    }

    fn stage_info_log_length(&self, _stage: StageId) -> usize {
        self.log_length
    }

    fn stage_info_log(&self, _stage: StageId, capacity: usize) -> InfoLog {
        self.fetch(capacity)
    }

    fn delete_stage(&self, stage: StageId) {
        self.record(format!("delete_stage {stage}"));
        self.deleted_stages.borrow_mut().push(stage);
    }

    fn create_program(&self) -> ProgramId {
        self.record("create_program");
        ProgramId(self.next())
    }

    fn attach_stage(&self, program: ProgramId, stage: StageId) {
        self.record(format!("attach {program} {stage}"));
    }

    fn link_program(&self, _program: ProgramId) {
        self.record("link");
    }

    fn program_link_status(&self, _program: ProgramId) -> bool {
        self.compile_ok
    }

    fn program_info_log_length(&self, _program: ProgramId) -> usize {
        0
    }

    fn program_info_log(&self, _program: ProgramId, capacity: usize) -> InfoLog {
        self.fetch(capacity)
    }

    fn delete_program(&self, program: ProgramId) {
        self.record(format!("delete_program {program}"));
        self.deleted_programs.borrow_mut().push(program);
    }

    fn use_program(&self, program: Option<ProgramId>) {
        self.current.set(program);
    }

    fn current_program(&self) -> Option<ProgramId> {
        self.current.get()
    }

    fn uniform_location(&self, _program: ProgramId, _name: &str) -> Option<UniformLocation> {
        None
    }

    fn uniform_1i(&self, _location: UniformLocation, _value: i32) {
        self.record("uniform_1i");
    }

    fn uniform_1f(&self, _location: UniformLocation, _value: f32) {
        self.record("uniform_1f");
    }

    fn uniform_4f(&self, _location: UniformLocation, _value: [f32; 4]) {
        self.record("uniform_4f");
    }

    fn uniform_value(&self, _program: ProgramId, _location: UniformLocation) -> Option<UniformValue> {
        None
    }
}
