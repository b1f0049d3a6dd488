mod constant_buffer;
mod frame_allocator;
mod shader_constants;
mod strategy;
mod transient_memory;

pub use constant_buffer::*;
pub use frame_allocator::*;
pub use shader_constants::*;
pub use strategy::*;
pub use transient_memory::*;
