//! Typed constant buffers on top of wgpu, updated either by discard-and-remap writes into a
//! resident buffer or by sub-allocating frame-scoped transient memory.

// Lets `#[derive(ShaderConstants)]` refer to `::constant_buffer` from inside this crate too.
extern crate self as constant_buffer;

pub use bytemuck;
pub use cgmath;
pub use wgpu;

pub use constant_buffer_derive::ShaderConstants;

mod config;
mod view_projection;

pub use config::*;
pub use view_projection::*;

pub mod wgpu_utils;

pub use wgpu_utils::{
    CONSTANT_ALIGNMENT, ConstantBuffer, ConstantBufferError, ConstantsBinding, FrameStatistics,
    ShaderConstants, StrategyPreference, TransientAllocation, TransientMemory,
    TransientMemoryError, UpdateStrategy,
};

pub(crate) mod utils;
