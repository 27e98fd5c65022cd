use super::context::{ShaderContext, UniformLocation};

/// A value that can be written into a uniform slot.
///
/// Each implementation picks the context call matching its arity.
pub trait Uniform: Copy {
    fn write<C: ShaderContext + ?Sized>(self, ctx: &C, location: UniformLocation);
}

impl Uniform for bool {
    /// Booleans travel as integers (0/1).
    #[inline]
    fn write<C: ShaderContext + ?Sized>(self, ctx: &C, location: UniformLocation) {
        ctx.uniform_1i(location, i32::from(self));
    }
}

impl Uniform for i32 {
    #[inline]
    fn write<C: ShaderContext + ?Sized>(self, ctx: &C, location: UniformLocation) {
        ctx.uniform_1i(location, self);
    }
}

impl Uniform for f32 {
    #[inline]
    fn write<C: ShaderContext + ?Sized>(self, ctx: &C, location: UniformLocation) {
        ctx.uniform_1f(location, self);
    }
}

impl Uniform for [f32; 4] {
    #[inline]
    fn write<C: ShaderContext + ?Sized>(self, ctx: &C, location: UniformLocation) {
        ctx.uniform_4f(location, self);
    }
}
