use wgpu::naga;
use naga::front::glsl::{Frontend, Options};
use naga::valid::{Capabilities, ValidationFlags, Validator};

use crate::shader::StageKind;

/// Compiles one GLSL stage into a validated naga module.
///
/// On failure the returned string is the human-readable compile log.
pub(crate) fn compile(kind: StageKind, source: &str) -> Result<naga::Module, String> {
    let stage = match kind {
        StageKind::Vertex => naga::ShaderStage::Vertex,
        StageKind::Fragment => naga::ShaderStage::Fragment,
    };

    let mut frontend = Frontend::default();
    let module = frontend
        .parse(&Options::from(stage), source)
        .map_err(|errors| failure(kind, errors.emit_to_string(source)))?;

    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|error| failure(kind, error.emit_to_string(source)))?;

    if !module.entry_points.iter().any(|ep| ep.stage == stage) {
        return Err(failure(kind, format!("no `main` entry point for the {kind} stage")));
    }

    Ok(module)
}

fn failure(kind: StageKind, detail: String) -> String {
    format!("{kind} stage compilation failed\n{}", detail.trim_end())
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

    #[test]
    fn valid_vertex_stage_compiles() {
        let module = compile(StageKind::Vertex, VERTEX).unwrap();
        assert_eq!(module.entry_points.len(), 1);
        assert_eq!(module.entry_points[0].stage, naga::ShaderStage::Vertex);
    }

    #[test]
    fn missing_semicolon_is_a_compile_failure() {
        let src = VERTEX.replace("1.0);", "1.0)");
        let log = compile(StageKind::Vertex, &src).unwrap_err();
        assert!(log.starts_with("vertex stage compilation failed\n"));
        assert!(log.lines().count() > 1);
    }

    #[test]
    fn empty_source_fails() {
        assert!(compile(StageKind::Fragment, "").is_err());
    }

    #[test]
    fn bool_block_member_is_rejected() {
        let src = "#version 450
layout(location = 0) out vec4 FragColor;
layout(std140, set = 0, binding = 0) uniform Params {
    bool flag;
    vec4 tint;
};
void main() {
    FragColor = vec4(0.0);
    if (flag) {
        FragColor = tint;
    }
}
";
        let log = compile(StageKind::Fragment, src).unwrap_err();
        assert!(log.starts_with("fragment stage compilation failed\n"));
        assert!(log.contains("host-shareable"));
    }
}
