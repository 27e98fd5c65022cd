use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use wgpu::naga;

use crate::device::Gpu;
use crate::shader::{
    InfoLog, ProgramId, ShaderContext, StageId, StageKind, UniformLocation, UniformValue,
};

use super::compile::compile;
use super::error::ContextError;
use super::gpu::GpuProgram;
use super::link::link;
use super::uniforms::{UniformStorage, UniformWrite};

/// Uniform names with this prefix are reserved and never resolve.
const RESERVED_PREFIX: &str = "gl_";

struct StageObject {
    kind: StageKind,
    source: String,
    module: Option<naga::Module>,
    compiled: bool,
    log: String,
    delete_pending: bool,
}

#[derive(Default)]
struct ProgramObject {
    attached: Vec<StageId>,
    linked: bool,
    log: String,
    uniforms: Option<UniformStorage>,
    gpu: Option<Rc<GpuProgram>>,
    delete_pending: bool,
}

#[derive(Default)]
struct State {
    next_id: u32,
    stages: HashMap<StageId, StageObject>,
    programs: HashMap<ProgramId, ProgramObject>,
    current: Option<ProgramId>,
    error: Option<ContextError>,
}

impl State {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Records `err` unless an earlier error is still unread.
    fn fail(&mut self, err: ContextError) {
        log::warn!("{err}");
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    fn stage_mut(&mut self, id: StageId) -> Option<&mut StageObject> {
        if !self.stages.contains_key(&id) {
            self.fail(ContextError::InvalidValue(format!("no stage object named {id}")));
        }
        self.stages.get_mut(&id)
    }

    fn program_mut(&mut self, id: ProgramId) -> Option<&mut ProgramObject> {
        if !self.programs.contains_key(&id) {
            self.fail(ContextError::InvalidValue(format!("no program object named {id}")));
        }
        self.programs.get_mut(&id)
    }

    fn is_attached(&self, stage: StageId) -> bool {
        self.programs.values().any(|p| p.attached.contains(&stage))
    }

    fn remove_program(&mut self, id: ProgramId) {
        let Some(program) = self.programs.remove(&id) else { return };
        for stage in program.attached {
            let pending = self.stages.get(&stage).is_some_and(|s| s.delete_pending);
            if pending && !self.is_attached(stage) {
                self.stages.remove(&stage);
                log::trace!("released stage {stage} after detaching it from program {id}");
            }
        }
        log::trace!("released program {id}");
    }

    fn linked_uniforms(&mut self, id: ProgramId) -> Option<&mut UniformStorage> {
        let program = self.program_mut(id)?;
        if program.uniforms.is_none() {
            self.fail(ContextError::InvalidOperation(format!(
                "program {id} has not been linked successfully"
            )));
            return None;
        }
        self.programs.get_mut(&id).and_then(|p| p.uniforms.as_mut())
    }
}

struct GpuHandles {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

/// A [`ShaderContext`] that compiles Vulkan-flavoured GLSL 450 with naga.
///
/// Uniforms must live in blocks with an explicit `binding`; their members are
/// addressed by name. Without a GPU the context still compiles, links and
/// stores uniform values, which is enough to build and query programs.
/// With [`with_gpu`](Self::with_gpu) a successful link also creates a
/// [`GpuProgram`] and uniform writes are forwarded to its buffers.
pub struct GlslContext {
    state: RefCell<State>,
    gpu: Option<GpuHandles>,
}

impl Default for GlslContext {
    fn default() -> Self {
        Self::new()
    }
}

impl GlslContext {
    /// Creates a context with no GPU attached.
    pub fn new() -> Self {
        Self {
            state: RefCell::new(State::default()),
            gpu: None,
        }
    }

    /// Creates a context whose programs get GPU modules and uniform buffers.
    pub fn with_gpu(gpu: &Gpu) -> Self {
        Self {
            state: RefCell::new(State::default()),
            gpu: Some(GpuHandles {
                device: gpu.device().clone(),
                queue: gpu.queue().clone(),
            }),
        }
    }

    /// Returns and clears the first error recorded since the last call.
    pub fn take_error(&self) -> Option<ContextError> {
        self.state.borrow_mut().error.take()
    }

    /// Stage objects not yet deleted by their owner.
    pub fn live_stages(&self) -> usize {
        self.state
            .borrow()
            .stages
            .values()
            .filter(|s| !s.delete_pending)
            .count()
    }

    /// Program objects not yet deleted by their owner.
    pub fn live_programs(&self) -> usize {
        self.state
            .borrow()
            .programs
            .values()
            .filter(|p| !p.delete_pending)
            .count()
    }

    /// GPU objects of a linked program, when a GPU is attached.
    pub fn gpu_program(&self, program: ProgramId) -> Option<Rc<GpuProgram>> {
        self.state
            .borrow()
            .programs
            .get(&program)
            .and_then(|p| p.gpu.clone())
    }

    fn write_uniform(&self, location: UniformLocation, value: UniformWrite) {
        let mut state = self.state.borrow_mut();
        let Some(current) = state.current else {
            state.fail(ContextError::InvalidOperation(
                "uniform write with no current program".into(),
            ));
            return;
        };

        let written = match state.linked_uniforms(current).map(|u| u.write(location, value)) {
            Some(Ok(written)) => written,
            Some(Err(err)) => return state.fail(err),
            None => return,
        };

        if let (Some(handles), Some(gpu)) = (
            &self.gpu,
            state.programs.get(&current).and_then(|p| p.gpu.as_ref()),
        ) {
            gpu.write(&handles.queue, written.block, written.offset, &written.bytes);
        }
    }

    fn info_log(log: &str, capacity: usize) -> InfoLog {
        let mut end = log.len().min(capacity.saturating_sub(1));
        while !log.is_char_boundary(end) {
            end -= 1;
        }
        InfoLog {
            text: log[..end].to_owned(),
            written: end,
        }
    }

    fn log_length(log: &str) -> usize {
        if log.is_empty() { 0 } else { log.len() + 1 }
    }
}

impl ShaderContext for GlslContext {
    fn create_stage(&self, kind: StageKind) -> StageId {
        let mut state = self.state.borrow_mut();
        let id = StageId(state.next_id());
        state.stages.insert(
            id,
            StageObject {
                kind,
                source: String::new(),
                module: None,
                compiled: false,
                log: String::new(),
                delete_pending: false,
            },
        );
        log::trace!("created {kind} stage {id}");
        id
    }

    fn stage_source(&self, stage: StageId, source: &str) {
        if let Some(stage) = self.state.borrow_mut().stage_mut(stage) {
            stage.source = source.to_owned();
        }
    }

    fn compile_stage(&self, stage: StageId) {
        let mut state = self.state.borrow_mut();
        let Some(stage) = state.stage_mut(stage) else { return };

        match compile(stage.kind, &stage.source) {
            Ok(module) => {
                stage.module = Some(module);
                stage.compiled = true;
                stage.log.clear();
            }
            Err(log) => {
                stage.module = None;
                stage.compiled = false;
                stage.log = log;
            }
        }
    }

    fn stage_compile_status(&self, stage: StageId) -> bool {
        self.state
            .borrow_mut()
            .stage_mut(stage)
            .is_some_and(|s| s.compiled)
    }

    fn stage_info_log_length(&self, stage: StageId) -> usize {
        self.state
            .borrow_mut()
            .stage_mut(stage)
            .map_or(0, |s| Self::log_length(&s.log))
    }

    fn stage_info_log(&self, stage: StageId, capacity: usize) -> InfoLog {
        self.state
            .borrow_mut()
            .stage_mut(stage)
            .map(|s| Self::info_log(&s.log, capacity))
            .unwrap_or_default()
    }

    fn delete_stage(&self, stage: StageId) {
        let mut state = self.state.borrow_mut();
        if state.stage_mut(stage).is_none() {
            return;
        }

        if state.is_attached(stage) {
            if let Some(s) = state.stages.get_mut(&stage) {
                s.delete_pending = true;
            }
            log::trace!("stage {stage} is attached; release deferred");
        } else {
            state.stages.remove(&stage);
            log::trace!("released stage {stage}");
        }
    }

    fn create_program(&self) -> ProgramId {
        let mut state = self.state.borrow_mut();
        let id = ProgramId(state.next_id());
        state.programs.insert(id, ProgramObject::default());
        log::trace!("created program {id}");
        id
    }

    fn attach_stage(&self, program: ProgramId, stage: StageId) {
        let mut state = self.state.borrow_mut();
        if state.stage_mut(stage).is_none() {
            return;
        }
        let Some(p) = state.program_mut(program) else { return };

        if p.attached.contains(&stage) {
            state.fail(ContextError::InvalidOperation(format!(
                "stage {stage} is already attached to program {program}"
            )));
            return;
        }
        p.attached.push(stage);
    }

    fn link_program(&self, program: ProgramId) {
        let mut state = self.state.borrow_mut();
        let Some(attached) = state.program_mut(program).map(|p| p.attached.clone()) else {
            return;
        };

        let mut errors = Vec::new();
        let mut module_of = |kind: StageKind| -> Option<naga::Module> {
            let stage = attached
                .iter()
                .filter_map(|id| state.stages.get(id).map(|s| (id, s)))
                .find(|(_, s)| s.kind == kind);
            match stage {
                None => {
                    errors.push(format!("no {kind} stage attached"));
                    None
                }
                Some((id, s)) if !s.compiled => {
                    errors.push(format!("{kind} stage {id} has not been compiled successfully"));
                    None
                }
                Some((_, s)) => s.module.clone(),
            }
        };
        let vertex = module_of(StageKind::Vertex);
        let fragment = module_of(StageKind::Fragment);

        let result = match (vertex, fragment) {
            (Some(vertex), Some(fragment)) => link(&vertex, &fragment).and_then(|layout| {
                let gpu = match &self.gpu {
                    Some(handles) => Some(Rc::new(GpuProgram::new(
                        &handles.device,
                        &format!("glance program {program}"),
                        &vertex,
                        &fragment,
                        &layout.blocks,
                    )?)),
                    None => None,
                };
                Ok((UniformStorage::new(&layout), gpu))
            }),
            _ => Err(errors.join("\n")),
        };

        let Some(p) = state.programs.get_mut(&program) else { return };
        match result {
            Ok((uniforms, gpu)) => {
                p.linked = true;
                p.log.clear();
                p.uniforms = Some(uniforms);
                p.gpu = gpu;
                log::trace!("linked program {program}");
            }
            Err(log) => {
                p.linked = false;
                p.log = log;
                p.uniforms = None;
                p.gpu = None;
            }
        }
    }

    fn program_link_status(&self, program: ProgramId) -> bool {
        self.state
            .borrow_mut()
            .program_mut(program)
            .is_some_and(|p| p.linked)
    }

    fn program_info_log_length(&self, program: ProgramId) -> usize {
        self.state
            .borrow_mut()
            .program_mut(program)
            .map_or(0, |p| Self::log_length(&p.log))
    }

    fn program_info_log(&self, program: ProgramId, capacity: usize) -> InfoLog {
        self.state
            .borrow_mut()
            .program_mut(program)
            .map(|p| Self::info_log(&p.log, capacity))
            .unwrap_or_default()
    }

    fn delete_program(&self, program: ProgramId) {
        let mut state = self.state.borrow_mut();
        let is_current = state.current == Some(program);
        let Some(p) = state.program_mut(program) else { return };

        if is_current {
            p.delete_pending = true;
            log::trace!("program {program} is current; release deferred");
        } else {
            state.remove_program(program);
        }
    }

    fn use_program(&self, program: Option<ProgramId>) {
        let mut state = self.state.borrow_mut();

        if let Some(id) = program {
            let Some(p) = state.program_mut(id) else { return };
            if !p.linked {
                state.fail(ContextError::InvalidOperation(format!(
                    "program {id} has not been linked successfully"
                )));
                return;
            }
        }

        let previous = std::mem::replace(&mut state.current, program);
        if let Some(prev) = previous.filter(|prev| Some(*prev) != program) {
            let pending = state.programs.get(&prev).is_some_and(|p| p.delete_pending);
            if pending {
                state.remove_program(prev);
            }
        }
    }

    fn current_program(&self) -> Option<ProgramId> {
        self.state.borrow().current
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let mut state = self.state.borrow_mut();
        let uniforms = state.linked_uniforms(program)?;
        if name.starts_with(RESERVED_PREFIX) {
            return None;
        }
        uniforms.find(name)
    }

    fn uniform_1i(&self, location: UniformLocation, value: i32) {
        self.write_uniform(location, UniformWrite::Int(value));
    }

    fn uniform_1f(&self, location: UniformLocation, value: f32) {
        self.write_uniform(location, UniformWrite::Float(value));
    }

    fn uniform_4f(&self, location: UniformLocation, value: [f32; 4]) {
        self.write_uniform(location, UniformWrite::Vec4(value));
    }

    fn uniform_value(&self, program: ProgramId, location: UniformLocation) -> Option<UniformValue> {
        let mut state = self.state.borrow_mut();
        let read = state.linked_uniforms(program)?.read(location);
        match read {
            Ok(value) => Some(value),
            Err(err) => {
                state.fail(err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = "#version 450
layout(location = 0) in vec3 aPos;
void main() {
    gl_Position = vec4(aPos, 1.0);
}
";

    const FRAGMENT: &str = "#version 450
layout(location = 0) out vec4 FragColor;
layout(std140, set = 0, binding = 0) uniform Params {
    vec4 aColor;
};
void main() {
    FragColor = aColor;
}
";

    fn stage(ctx: &GlslContext, kind: StageKind, src: &str) -> StageId {
        let id = ctx.create_stage(kind);
        ctx.stage_source(id, src);
        ctx.compile_stage(id);
        id
    }

    fn linked(ctx: &GlslContext) -> ProgramId {
        let vs = stage(ctx, StageKind::Vertex, VERTEX);
        let fs = stage(ctx, StageKind::Fragment, FRAGMENT);
        let program = ctx.create_program();
        ctx.attach_stage(program, vs);
        ctx.attach_stage(program, fs);
        ctx.link_program(program);
        ctx.delete_stage(vs);
        ctx.delete_stage(fs);
        program
    }

    // ── stages ────────────────────────────────────────────────────────────

    #[test]
    fn compiled_stage_has_empty_log() {
        let ctx = GlslContext::new();
        let vs = stage(&ctx, StageKind::Vertex, VERTEX);
        assert!(ctx.stage_compile_status(vs));
        assert_eq!(ctx.stage_info_log_length(vs), 0);
    }

    #[test]
    fn log_length_counts_the_terminator() {
        let ctx = GlslContext::new();
        let fs = stage(&ctx, StageKind::Fragment, "#version 450\nvoid main() { oops }");
        assert!(!ctx.stage_compile_status(fs));

        let len = ctx.stage_info_log_length(fs);
        let log = ctx.stage_info_log(fs, len);
        assert_eq!(log.written + 1, len);
        assert_eq!(log.text.len(), log.written);
    }

    #[test]
    fn short_capacity_truncates_log() {
        let ctx = GlslContext::new();
        let fs = stage(&ctx, StageKind::Fragment, "not glsl at all");
        let log = ctx.stage_info_log(fs, 5);
        assert_eq!(log.written, 4);
        assert_eq!(log.text.len(), 4);
    }

    #[test]
    fn unknown_stage_is_an_invalid_value() {
        let ctx = GlslContext::new();
        ctx.compile_stage(StageId(42));
        assert!(matches!(ctx.take_error(), Some(ContextError::InvalidValue(_))));
        assert_eq!(ctx.take_error(), None);
    }

    #[test]
    fn deleting_unattached_stage_releases_it() {
        let ctx = GlslContext::new();
        let vs = stage(&ctx, StageKind::Vertex, VERTEX);
        ctx.delete_stage(vs);
        assert_eq!(ctx.live_stages(), 0);
        ctx.stage_compile_status(vs);
        assert!(matches!(ctx.take_error(), Some(ContextError::InvalidValue(_))));
    }

    #[test]
    fn attached_stage_outlives_delete_until_program_goes() {
        let ctx = GlslContext::new();
        let program = linked(&ctx);
        assert_eq!(ctx.state.borrow().stages.len(), 2);

        ctx.delete_program(program);
        assert!(ctx.state.borrow().stages.is_empty());
        assert!(ctx.state.borrow().programs.is_empty());
    }

    // ── programs ──────────────────────────────────────────────────────────

    #[test]
    fn link_without_fragment_stage_fails() {
        let ctx = GlslContext::new();
        let vs = stage(&ctx, StageKind::Vertex, VERTEX);
        let program = ctx.create_program();
        ctx.attach_stage(program, vs);
        ctx.link_program(program);

        assert!(!ctx.program_link_status(program));
        let len = ctx.program_info_log_length(program);
        assert!(ctx.program_info_log(program, len).text.contains("no fragment stage"));
    }

    #[test]
    fn double_attach_is_rejected() {
        let ctx = GlslContext::new();
        let vs = stage(&ctx, StageKind::Vertex, VERTEX);
        let program = ctx.create_program();
        ctx.attach_stage(program, vs);
        ctx.attach_stage(program, vs);
        assert!(matches!(ctx.take_error(), Some(ContextError::InvalidOperation(_))));
    }

    #[test]
    fn unlinked_program_cannot_be_used() {
        let ctx = GlslContext::new();
        let program = ctx.create_program();
        ctx.use_program(Some(program));
        assert_eq!(ctx.current_program(), None);
        assert!(matches!(ctx.take_error(), Some(ContextError::InvalidOperation(_))));
    }

    #[test]
    fn deleting_current_program_is_deferred() {
        let ctx = GlslContext::new();
        let program = linked(&ctx);
        ctx.use_program(Some(program));
        ctx.delete_program(program);

        assert_eq!(ctx.live_programs(), 0);
        assert_eq!(ctx.current_program(), Some(program));
        assert_eq!(ctx.state.borrow().programs.len(), 1);

        ctx.use_program(None);
        assert!(ctx.state.borrow().programs.is_empty());
        assert!(ctx.state.borrow().stages.is_empty());
    }

    #[test]
    fn headless_link_creates_no_gpu_program() {
        let ctx = GlslContext::new();
        let program = linked(&ctx);
        assert!(ctx.program_link_status(program));
        assert!(ctx.gpu_program(program).is_none());
    }

    #[test]
    fn gpu_link_creates_gpu_program() {
        let Ok(gpu) = pollster::block_on(crate::device::Gpu::headless(Default::default())) else {
            // No adapter on this machine.
            return;
        };
        let ctx = GlslContext::with_gpu(&gpu);
        let program = linked(&ctx);

        let gpu_program = ctx.gpu_program(program).expect("gpu program");
        assert_eq!(gpu_program.bind_groups.len(), 1);

        let location = ctx.uniform_location(program, "aColor").unwrap();
        ctx.use_program(Some(program));
        ctx.uniform_4f(location, [0.5; 4]);
        assert_eq!(ctx.take_error(), None);
    }

    #[test]
    fn device_rejection_fails_the_link() {
        let Ok(gpu) = pollster::block_on(crate::device::Gpu::headless(Default::default())) else {
            return;
        };
        let ctx = GlslContext::with_gpu(&gpu);

        // Past any adapter's bind group limit.
        let high_set = FRAGMENT.replace("set = 0", "set = 64");
        let vs = stage(&ctx, StageKind::Vertex, VERTEX);
        let fs = stage(&ctx, StageKind::Fragment, &high_set);
        assert!(ctx.stage_compile_status(fs));

        let program = ctx.create_program();
        ctx.attach_stage(program, vs);
        ctx.attach_stage(program, fs);
        ctx.link_program(program);

        assert!(!ctx.program_link_status(program));
        assert!(ctx.gpu_program(program).is_none());
        let len = ctx.program_info_log_length(program);
        assert!(ctx.program_info_log(program, len).text.contains("rejected"));

        ctx.use_program(Some(program));
        assert_eq!(ctx.current_program(), None);
    }

    // ── uniforms ──────────────────────────────────────────────────────────

    #[test]
    fn reserved_names_do_not_resolve() {
        let ctx = GlslContext::new();
        let program = linked(&ctx);
        assert_eq!(ctx.uniform_location(program, "gl_Position"), None);
        assert!(ctx.uniform_location(program, "aColor").is_some());
        assert_eq!(ctx.take_error(), None);
    }

    #[test]
    fn uniform_write_targets_current_program() {
        let ctx = GlslContext::new();
        let program = linked(&ctx);
        let location = ctx.uniform_location(program, "aColor").unwrap();

        ctx.use_program(Some(program));
        ctx.uniform_4f(location, [0.2, 0.3, 0.3, 1.0]);
        assert_eq!(
            ctx.uniform_value(program, location),
            Some(UniformValue::Vec4([0.2, 0.3, 0.3, 1.0]))
        );
    }

    #[test]
    fn wrong_arity_write_is_an_invalid_operation() {
        let ctx = GlslContext::new();
        let program = linked(&ctx);
        let location = ctx.uniform_location(program, "aColor").unwrap();

        ctx.use_program(Some(program));
        ctx.uniform_1f(location, 1.0);
        assert!(matches!(ctx.take_error(), Some(ContextError::InvalidOperation(_))));
        assert_eq!(
            ctx.uniform_value(program, location),
            Some(UniformValue::Vec4([0.0; 4]))
        );
    }

    #[test]
    fn lookup_on_unlinked_program_fails() {
        let ctx = GlslContext::new();
        let program = ctx.create_program();
        assert_eq!(ctx.uniform_location(program, "aColor"), None);
        assert!(matches!(ctx.take_error(), Some(ContextError::InvalidOperation(_))));
    }
}
