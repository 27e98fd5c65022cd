use crate::shader::{UniformLocation, UniformValue};

use super::error::ContextError;
use super::link::{LinkedLayout, UniformSlot, UniformType};

/// Value handed to a uniform write, by setter arity.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) enum UniformWrite {
    Int(i32),
    Float(f32),
    Vec4([f32; 4]),
}

/// Bytes changed by a successful write, for forwarding to a GPU buffer.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WrittenRange {
    pub block: usize,
    pub offset: u32,
    pub bytes: Vec<u8>,
}

/// Host-side copy of every uniform block of a linked program.
#[derive(Debug, Clone)]
pub(crate) struct UniformStorage {
    slots: Vec<UniformSlot>,
    blocks: Vec<Vec<u8>>,
}

impl UniformStorage {
    pub(crate) fn new(layout: &LinkedLayout) -> Self {
        Self {
            slots: layout.uniforms.clone(),
            blocks: layout
                .blocks
                .iter()
                .map(|b| vec![0u8; b.size as usize])
                .collect(),
        }
    }

    pub(crate) fn find(&self, name: &str) -> Option<UniformLocation> {
        self.slots
            .iter()
            .position(|s| s.name == name)
            .map(|i| UniformLocation(i as u32))
    }

    pub(crate) fn write(
        &mut self,
        location: UniformLocation,
        value: UniformWrite,
    ) -> Result<WrittenRange, ContextError> {
        let slot = self.slot(location)?;

        let bytes: Vec<u8> = match (slot.ty, value) {
            (UniformType::Int, UniformWrite::Int(v)) => bytemuck::bytes_of(&v).to_vec(),
            (UniformType::Uint, UniformWrite::Int(v)) => bytemuck::bytes_of(&(v as u32)).to_vec(),
            (UniformType::Float, UniformWrite::Float(v)) => bytemuck::bytes_of(&v).to_vec(),
            (UniformType::Vec4, UniformWrite::Vec4(v)) => bytemuck::bytes_of(&v).to_vec(),
            (ty, value) => {
                return Err(ContextError::InvalidOperation(format!(
                    "uniform `{}` has type {ty:?}, which cannot be set from {value:?}",
                    slot.name
                )));
            }
        };

        let (block, offset) = (slot.block, slot.offset);
        let start = offset as usize;
        let dst = self
            .blocks
            .get_mut(block)
            .and_then(|data| data.get_mut(start..start + bytes.len()))
            .ok_or_else(|| {
                ContextError::InvalidOperation(format!(
                    "uniform slot {} lies outside its block",
                    location.0
                ))
            })?;
        dst.copy_from_slice(&bytes);

        Ok(WrittenRange {
            block,
            offset,
            bytes,
        })
    }

    pub(crate) fn read(&self, location: UniformLocation) -> Result<UniformValue, ContextError> {
        let slot = self.slot(location)?;
        let start = slot.offset as usize;
        self.blocks
            .get(slot.block)
            .and_then(|data| data.get(start..start + slot.ty.size()))
            .and_then(|data| decode(slot.ty, data))
            .ok_or_else(|| {
                ContextError::InvalidOperation(format!(
                    "uniform `{}` cannot be read back as a scalar or vec4",
                    slot.name
                ))
            })
    }

    /// Full contents of one block.
    #[cfg(test)]
    pub(crate) fn block(&self, index: usize) -> Option<&[u8]> {
        self.blocks.get(index).map(Vec::as_slice)
    }

    fn slot(&self, location: UniformLocation) -> Result<&UniformSlot, ContextError> {
        self.slots.get(location.0 as usize).ok_or_else(|| {
            ContextError::InvalidOperation(format!(
                "location {} is not a uniform of the current program",
                location.0
            ))
        })
    }
}

fn decode(ty: UniformType, data: &[u8]) -> Option<UniformValue> {
    Some(match ty {
        UniformType::Int => UniformValue::Int(bytemuck::pod_read_unaligned(data)),
        UniformType::Uint => UniformValue::Uint(bytemuck::pod_read_unaligned(data)),
        UniformType::Float => UniformValue::Float(bytemuck::pod_read_unaligned(data)),
        UniformType::Vec4 => UniformValue::Vec4(bytemuck::pod_read_unaligned(data)),
        UniformType::Other => return None,
    })
}
