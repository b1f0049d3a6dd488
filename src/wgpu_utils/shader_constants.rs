use std::any::type_name;

use bytemuck::Pod;

use super::ConstantBufferError;

/// Size granularity of a shader constant layout in bytes (the length of four floats).
pub const CONSTANT_ALIGNMENT: usize = 16;

/// A plain-old-data layout that can be uploaded as one block of shader constants.
///
/// Usually implemented with `#[derive(ShaderConstants)]`, which also checks at compile time that
/// the size is a non-zero multiple of [`CONSTANT_ALIGNMENT`].
///
/// ```
/// use constant_buffer::{ShaderConstants, bytemuck};
///
/// #[repr(C)]
/// #[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable, ShaderConstants)]
/// struct Light {
///     direction: [f32; 4],
///     color: [f32; 4],
/// }
///
/// assert_eq!(Light::SIZE, 32);
/// ```
///
/// Three floats are not a whole number of 16-byte rows:
///
/// ```compile_fail
/// use constant_buffer::{ShaderConstants, bytemuck};
///
/// #[repr(C)]
/// #[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable, ShaderConstants)]
/// struct Direction {
///     xyz: [f32; 3],
/// }
/// ```
pub trait ShaderConstants: Pod {
    /// Debug label given to buffers holding this layout.
    const LABEL: &'static str;
    const SIZE: u64 = size_of::<Self>() as u64;
}

impl ShaderConstants for [f32; 4] {
    const LABEL: &'static str = "vec4<f32>";
}

impl ShaderConstants for [[f32; 4]; 4] {
    const LABEL: &'static str = "mat4x4<f32>";
}

/// Checks that `T` can be bound as a single uniform binding on a device with `limits`.
pub fn validate_layout<T: ShaderConstants>(limits: &wgpu::Limits) -> Result<(), ConstantBufferError> {
    if T::SIZE == 0 || T::SIZE % CONSTANT_ALIGNMENT as u64 != 0 {
        return Err(ConstantBufferError::LayoutMisaligned {
            type_name: type_name::<T>(),
            size: T::SIZE,
        });
    }
    let limit = limits.max_uniform_buffer_binding_size as u64;
    if T::SIZE > limit {
        return Err(ConstantBufferError::LayoutTooLarge {
            type_name: type_name::<T>(),
            size: T::SIZE,
            limit,
        });
    }
    Ok(())
}
