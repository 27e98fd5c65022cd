//! Program linking: stage interface checks and the merged uniform table.

use std::collections::BTreeMap;

use wgpu::naga;
use naga::{AddressSpace, Binding, Handle, Module, Scalar, ScalarKind, Type, TypeInner, VectorSize};

/// Types a uniform slot can have, as far as the setters are concerned.
///
/// GLSL `bool` is not host-shareable, so block members carrying a flag are
/// declared `int` or `uint` and set with `1i`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum UniformType {
    Int,
    Uint,
    Float,
    Vec4,
    /// Declared and addressable, but not writable through the scalar/vec4 setters.
    Other,
}

impl UniformType {
    fn of(inner: &TypeInner) -> Self {
        match *inner {
            TypeInner::Scalar(Scalar {
                kind: ScalarKind::Sint,
                width: 4,
            }) => Self::Int,
            TypeInner::Scalar(Scalar {
                kind: ScalarKind::Uint,
                width: 4,
            }) => Self::Uint,
            TypeInner::Scalar(Scalar {
                kind: ScalarKind::Float,
                width: 4,
            }) => Self::Float,
            TypeInner::Vector {
                size: VectorSize::Quad,
                scalar:
                    Scalar {
                        kind: ScalarKind::Float,
                        width: 4,
                    },
            } => Self::Vec4,
            _ => Self::Other,
        }
    }

    /// Bytes occupied in block storage; zero for `Other`.
    pub(crate) fn size(self) -> usize {
        match self {
            Self::Int | Self::Uint | Self::Float => 4,
            Self::Vec4 => 16,
            Self::Other => 0,
        }
    }
}

/// One uniform buffer binding shared by the linked stages.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BlockLayout {
    pub group: u32,
    pub binding: u32,
    /// Buffer size, rounded up to 16 bytes.
    pub size: u32,
}

/// An addressable uniform inside one block.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UniformSlot {
    pub name: String,
    pub block: usize,
    pub offset: u32,
    pub ty: UniformType,
}

/// Everything a successful link produces besides the modules themselves.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct LinkedLayout {
    pub blocks: Vec<BlockLayout>,
    pub uniforms: Vec<UniformSlot>,
}

/// Links a compiled vertex and fragment module.
///
/// Every problem found is collected; the error string is the full link log.
pub(crate) fn link(vertex: &Module, fragment: &Module) -> Result<LinkedLayout, String> {
    let mut errors = Vec::new();

    check_interface(vertex, fragment, &mut errors);

    let mut layout = LinkedLayout::default();
    collect_uniforms(vertex, "vertex", &mut layout, &mut errors);
    collect_uniforms(fragment, "fragment", &mut layout, &mut errors);

    if errors.is_empty() {
        Ok(layout)
    } else {
        Err(errors.join("\n"))
    }
}

// ── stage interface ───────────────────────────────────────────────────────

fn check_interface(vertex: &Module, fragment: &Module, errors: &mut Vec<String>) {
    let mut outputs = Vec::new();
    if let Some(ep) = entry_point(vertex, naga::ShaderStage::Vertex)
        && let Some(result) = &ep.function.result
    {
        collect_locations(vertex, result.ty, result.binding.as_ref(), &mut outputs);
    }

    let mut inputs = Vec::new();
    if let Some(ep) = entry_point(fragment, naga::ShaderStage::Fragment) {
        for arg in &ep.function.arguments {
            collect_locations(fragment, arg.ty, arg.binding.as_ref(), &mut inputs);
        }
    }

    for (location, input) in inputs {
        match outputs.iter().find(|(l, _)| *l == location) {
            None => errors.push(format!(
                "fragment input at location {location} is not written by the vertex stage"
            )),
            Some((_, output)) if is_plain(input) && is_plain(output) && input != *output => {
                errors.push(format!(
                    "fragment input at location {location} does not match the type of the vertex output"
                ))
            }
            Some(_) => {}
        }
    }
}

fn entry_point(module: &Module, stage: naga::ShaderStage) -> Option<&naga::EntryPoint> {
    module.entry_points.iter().find(|ep| ep.stage == stage)
}

/// Walks a bound value, descending into structs whose members carry the bindings.
fn collect_locations<'m>(
    module: &'m Module,
    ty: Handle<Type>,
    binding: Option<&Binding>,
    out: &mut Vec<(u32, &'m TypeInner)>,
) {
    match binding {
        Some(Binding::Location { location, .. }) => out.push((*location, &module.types[ty].inner)),
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_locations(module, member.ty, member.binding.as_ref(), out);
                }
            }
        }
    }
}

/// Types that carry no arena handles and so compare meaningfully across modules.
fn is_plain(inner: &TypeInner) -> bool {
    matches!(
        inner,
        TypeInner::Scalar(_) | TypeInner::Vector { .. } | TypeInner::Matrix { .. }
    )
}

// ── uniforms ──────────────────────────────────────────────────────────────

fn collect_uniforms(
    module: &Module,
    stage: &str,
    layout: &mut LinkedLayout,
    errors: &mut Vec<String>,
) {
    for (_, var) in module.global_variables.iter() {
        if var.space != AddressSpace::Uniform {
            continue;
        }
        let Some(binding) = &var.binding else {
            errors.push(format!("{stage} stage declares a uniform block without a binding"));
            continue;
        };

        let (span, members) = match &module.types[var.ty].inner {
            TypeInner::Struct { members, span } => (
                *span,
                members
                    .iter()
                    .map(|m| (m.name.clone(), m.offset, UniformType::of(&module.types[m.ty].inner)))
                    .collect::<Vec<_>>(),
            ),
            inner => (16, vec![(var.name.clone(), 0, UniformType::of(inner))]),
        };

        let block = match block_index(layout, binding.group, binding.binding, span) {
            Ok(index) => index,
            Err(msg) => {
                errors.push(msg);
                continue;
            }
        };

        for (name, offset, ty) in members {
            let Some(name) = name.filter(|n| !n.is_empty()) else { continue };
            add_slot(layout, UniformSlot { name, block, offset, ty }, errors);
        }
    }
}

fn block_index(
    layout: &mut LinkedLayout,
    group: u32,
    binding: u32,
    span: u32,
) -> Result<usize, String> {
    let size = span.max(1).next_multiple_of(16);
    if let Some(index) = layout
        .blocks
        .iter()
        .position(|b| b.group == group && b.binding == binding)
    {
        if layout.blocks[index].size != size {
            return Err(format!(
                "uniform block at set {group} binding {binding} is declared with different layouts"
            ));
        }
        return Ok(index);
    }

    layout.blocks.push(BlockLayout { group, binding, size });
    Ok(layout.blocks.len() - 1)
}

fn add_slot(layout: &mut LinkedLayout, slot: UniformSlot, errors: &mut Vec<String>) {
    match layout.uniforms.iter().find(|u| u.name == slot.name) {
        None => layout.uniforms.push(slot),
        Some(existing) if *existing == slot => {}
        Some(_) => errors.push(format!(
            "uniform `{}` is declared differently across stages",
            slot.name
        )),
    }
}

/// Groups blocks by bind group, in group order.
pub(crate) fn blocks_by_group(blocks: &[BlockLayout]) -> BTreeMap<u32, Vec<(usize, &BlockLayout)>> {
    let mut groups: BTreeMap<u32, Vec<(usize, &BlockLayout)>> = BTreeMap::new();
    for (index, block) in blocks.iter().enumerate() {
        groups.entry(block.group).or_default().push((index, block));
    }
    groups
}
