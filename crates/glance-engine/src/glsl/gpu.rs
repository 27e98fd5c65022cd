use std::borrow::Cow;

use wgpu::naga;

use super::link::{blocks_by_group, BlockLayout};

/// Entry point name of every stage compiled from GLSL.
pub const ENTRY_POINT: &str = "main";

/// GPU-side objects created for a linked program.
///
/// Bind group `i` in [`bind_groups`](Self::bind_groups) matches layout `i` in
/// [`bind_group_layouts`](Self::bind_group_layouts); groups with no uniform
/// block get an empty layout so the indices stay dense.
pub struct GpuProgram {
    pub vertex: wgpu::ShaderModule,
    pub fragment: wgpu::ShaderModule,
    pub bind_group_layouts: Vec<wgpu::BindGroupLayout>,
    pub bind_groups: Vec<wgpu::BindGroup>,
    /// One uniform buffer per block, indexed like the link layout.
    buffers: Vec<wgpu::Buffer>,
}

impl GpuProgram {
    /// Creates the GPU objects of a linked program.
    ///
    /// Everything is created inside a validation error scope; an error means
    /// the device rejected the program and the message becomes the link log.
    pub(crate) fn new(
        device: &wgpu::Device,
        label: &str,
        vertex: &naga::Module,
        fragment: &naga::Module,
        blocks: &[BlockLayout],
    ) -> Result<Self, String> {
        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
        let program = Self::create(device, label, vertex, fragment, blocks);

        match pollster::block_on(scope.pop()) {
            Some(err) => Err(format!("the device rejected the program\n{err}")),
            None => Ok(program),
        }
    }

    fn create(
        device: &wgpu::Device,
        label: &str,
        vertex: &naga::Module,
        fragment: &naga::Module,
        blocks: &[BlockLayout],
    ) -> Self {
        let vertex = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{label} vertex")),
            source: wgpu::ShaderSource::Naga(Cow::Owned(vertex.clone())),
        });
        let fragment = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{label} fragment")),
            source: wgpu::ShaderSource::Naga(Cow::Owned(fragment.clone())),
        });

        let buffers: Vec<wgpu::Buffer> = blocks
            .iter()
            .map(|block| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&format!(
                        "{label} ubo set={} binding={}",
                        block.group, block.binding
                    )),
                    size: u64::from(block.size),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
            .collect();

        let groups = blocks_by_group(blocks);
        let group_count = groups.keys().next_back().map_or(0, |last| last + 1);

        let mut bind_group_layouts = Vec::with_capacity(group_count as usize);
        let mut bind_groups = Vec::with_capacity(group_count as usize);

        for group in 0..group_count {
            let members = groups.get(&group).map(Vec::as_slice).unwrap_or(&[]);

            let entries: Vec<wgpu::BindGroupLayoutEntry> = members
                .iter()
                .map(|(_, block)| wgpu::BindGroupLayoutEntry {
                    binding: block.binding,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(u64::from(block.size)),
                    },
                    count: None,
                })
                .collect();

            let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&format!("{label} bgl {group}")),
                entries: &entries,
            });

            let bindings: Vec<wgpu::BindGroupEntry> = members
                .iter()
                .map(|(index, block)| wgpu::BindGroupEntry {
                    binding: block.binding,
                    resource: buffers[*index].as_entire_binding(),
                })
                .collect();

            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("{label} bind group {group}")),
                layout: &layout,
                entries: &bindings,
            });

            bind_group_layouts.push(layout);
            bind_groups.push(bind_group);
        }

        log::debug!(
            "{label}: created {} uniform buffer(s) in {} bind group(s)",
            buffers.len(),
            bind_groups.len()
        );

        Self {
            vertex,
            fragment,
            bind_group_layouts,
            bind_groups,
            buffers,
        }
    }

    /// Pipeline layout covering every bind group of this program.
    pub fn pipeline_layout(&self, device: &wgpu::Device, label: &str) -> wgpu::PipelineLayout {
        let layouts: Vec<&wgpu::BindGroupLayout> = self.bind_group_layouts.iter().collect();
        device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &layouts,
            immediate_size: 0,
        })
    }

    /// Binds every group of this program on `pass`.
    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>) {
        for (index, group) in self.bind_groups.iter().enumerate() {
            pass.set_bind_group(index as u32, group, &[]);
        }
    }

    pub(crate) fn write(&self, queue: &wgpu::Queue, block: usize, offset: u32, bytes: &[u8]) {
        if let Some(buffer) = self.buffers.get(block) {
            queue.write_buffer(buffer, u64::from(offset), bytes);
        }
    }
}
