mod render;

use std::f32::consts::PI;
use std::path::Path;

use anyhow::{Context, Result};
use glance_engine::device::{Gpu, GpuInit};
use glance_engine::glsl::GlslContext;
use glance_engine::logging::{init_logging, LoggingConfig};
use glance_engine::shader::ShaderProgram;

use render::TriangleRenderer;

const FRAMES: u32 = 8;
const FRAME_STEP_SECS: f32 = 0.25;
const TARGET_SIZE: u32 = 256;

/// Colour cycle driven by elapsed time; the three channels are a third of a turn apart.
fn color_at(t: f32) -> [f32; 4] {
    [
        0.5 * t.sin() + 0.5,
        0.5 * (t + 0.667 * PI).sin() + 0.5,
        0.5 * (t - 0.667 * PI).sin() + 0.5,
        1.0,
    ]
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let gpu = match pollster::block_on(Gpu::headless(GpuInit::default())) {
        Ok(gpu) => Some(gpu),
        Err(err) => {
            log::warn!("{err:#}; continuing without a GPU");
            None
        }
    };

    let ctx = match &gpu {
        Some(gpu) => GlslContext::with_gpu(gpu),
        None => GlslContext::new(),
    };

    let shaders = Path::new(env!("CARGO_MANIFEST_DIR")).join("shaders");
    let program = ShaderProgram::new(
        &ctx,
        shaders.join("triangle.vs"),
        shaders.join("triangle.fs"),
    )
    .context("failed to build the triangle program")?;

    if program.is_degraded() {
        log::error!("triangle program is unusable; see the diagnostics above");
        return Ok(());
    }

    let renderer = gpu.as_ref().zip(ctx.gpu_program(program.id())).map(|(gpu, gpu_program)| {
        let renderer = TriangleRenderer::new(gpu.device(), &gpu_program, TARGET_SIZE, TARGET_SIZE);
        (gpu, gpu_program, renderer)
    });

    for frame in 0..FRAMES {
        let t = frame as f32 * FRAME_STEP_SECS;

        program.use_program();
        program.set_vec4("aColor", color_at(t));

        if let Some((gpu, gpu_program, renderer)) = &renderer {
            renderer.render(gpu.device(), gpu.queue(), gpu_program);
        }

        log::info!(
            "frame {frame} t={t:.2}s aColor={:?}",
            program.uniform_value("aColor")
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_cycle_stays_in_range() {
        let c = color_at(0.0);
        assert!((c[0] - 0.5).abs() < 1e-6);
        assert!(c[1] > c[2]);
        assert_eq!(c[3], 1.0);

        for i in 0..100 {
            let c = color_at(i as f32 * 0.1);
            assert!(c.iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }
}
