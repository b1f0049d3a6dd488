use bytemuck::Pod;
use derive_more::{Display, Error};

use crate::{ConfigError, TransientMemoryConfig, utils::*};

use super::{FrameAllocator, FrameStatistics};

#[derive(Debug, Display, Error)]
pub enum TransientMemoryError {
    #[display("transient allocations must not be empty")]
    ZeroSized,
    #[display("transient allocation alignment {alignment} is not a power of two")]
    InvalidAlignment { alignment: u64 },
    #[display(
        "transient allocation of {size} bytes exceeds the device's maximum buffer size of {limit} bytes"
    )]
    AllocationTooLarge { size: u64, limit: u64 },
    #[display(
        "transient write of {size} bytes is not a multiple of `wgpu::COPY_BUFFER_ALIGNMENT`"
    )]
    UnalignedWrite { size: u64 },
    #[display("transient allocation at offset {offset} cannot be addressed by a dynamic offset")]
    OffsetOutOfRange { offset: u64 },
    #[display("failed to create a {size}-byte transient page: {source}")]
    PageCreation { size: u64, source: wgpu::Error },
}

/// A region of transient memory holding one write.
///
/// Valid for the frame it was allocated in. Bind it through a layout entry with a dynamic
/// offset: [`binding_resource`](Self::binding_resource) covers `size` bytes from the start of
/// the page and [`dynamic_offset`](Self::dynamic_offset) selects this region.
#[derive(Debug, Clone)]
pub struct TransientAllocation {
    buffer: wgpu::Buffer,
    offset: u64,
    dynamic_offset: u32,
    size: u64,
    frame: u64,
}

impl TransientAllocation {
    pub fn wgpu_buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn dynamic_offset(&self) -> u32 {
        self.dynamic_offset
    }

    pub fn binding_resource(&self) -> wgpu::BindingResource<'_> {
        wgpu::BindingResource::Buffer(wgpu::BufferBinding {
            buffer: &self.buffer,
            offset: 0,
            size: wgpu::BufferSize::new(self.size),
        })
    }
}

/// Frame-scoped pool of uniform pages that small per-draw constant blocks are carved out of.
///
/// Call [`commit_frame`](Self::commit_frame) once per frame after submitting its work.
#[derive(Debug)]
pub struct TransientMemory {
    device: wgpu::Device,
    allocator: FrameAllocator<wgpu::Buffer>,
    alignment: u64,
    max_buffer_size: u64,
}

impl TransientMemory {
    pub fn new(device: &wgpu::Device, config: &TransientMemoryConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let limits = device.limits();
        let alignment = config
            .alignment
            .max(limits.min_uniform_buffer_offset_alignment as u64);
        let max_buffer_size = limits.max_buffer_size;
        let page_size = page_size_for(config.page_size, alignment, max_buffer_size);
        log::info!(
            "transient memory: {} frames in flight, {page_size}-byte pages, {alignment}-byte alignment",
            config.frames_in_flight
        );
        Ok(Self {
            device: device.clone(),
            allocator: FrameAllocator::new(config.frames_in_flight as usize, page_size),
            alignment,
            max_buffer_size,
        })
    }

    /// Minimum alignment of every allocation, at least the device's uniform offset alignment.
    pub fn alignment(&self) -> u64 {
        self.alignment
    }

    pub fn page_size(&self) -> u64 {
        self.allocator.page_size()
    }

    pub fn frame(&self) -> u64 {
        self.allocator.frame()
    }

    pub fn allocate(
        &mut self,
        size: u64,
        alignment: u64,
    ) -> Result<TransientAllocation, TransientMemoryError> {
        if !alignment.is_power_of_two() {
            return Err(TransientMemoryError::InvalidAlignment { alignment });
        }
        if size > self.max_buffer_size {
            return Err(TransientMemoryError::AllocationTooLarge {
                size,
                limit: self.max_buffer_size,
            });
        }
        if size > self.allocator.page_size() {
            log::warn!(
                "transient allocation of {size} bytes exceeds the page size of {} bytes",
                self.allocator.page_size()
            );
        }
        let device = &self.device;
        let alignment = alignment.max(self.alignment);
        let (sub_allocation, page) = self
            .allocator
            .allocate(size, alignment, |capacity| create_page(device, capacity))?;
        let offset = sub_allocation.offset;
        let dynamic_offset =
            u32::try_from(offset).map_err(|_| TransientMemoryError::OffsetOutOfRange { offset })?;
        Ok(TransientAllocation {
            buffer: page.clone(),
            offset,
            dynamic_offset,
            size: sub_allocation.size,
            frame: sub_allocation.frame,
        })
    }

    pub fn write_bytes(
        &mut self,
        queue: &wgpu::Queue,
        bytes: &[u8],
        alignment: u64,
    ) -> Result<TransientAllocation, TransientMemoryError> {
        let size = bytes.len() as u64;
        if size % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(TransientMemoryError::UnalignedWrite { size });
        }
        let allocation = self.allocate(size, alignment)?;
        queue.write_buffer(&allocation.buffer, allocation.offset, bytes);
        log::trace!(
            "wrote {size} transient bytes at offset {} (frame {})",
            allocation.offset,
            allocation.frame
        );
        Ok(allocation)
    }

    pub fn write<T: Pod>(
        &mut self,
        queue: &wgpu::Queue,
        value: &T,
        alignment: u64,
    ) -> Result<TransientAllocation, TransientMemoryError> {
        self.write_bytes(queue, bytemuck::bytes_of(value), alignment)
    }

    pub fn commit_frame(&mut self) {
        self.allocator.commit_frame();
    }

    /// Releases trailing pages that older frames left empty. See
    /// [`FrameAllocator::garbage_collect`].
    pub fn garbage_collect(&mut self) -> usize {
        self.allocator.garbage_collect()
    }

    pub fn statistics(&self) -> FrameStatistics {
        self.allocator.statistics()
    }
}

/// Page size in multiples of `alignment`, small enough that every offset in a regular page fits
/// a `u32` dynamic offset and the page fits the device's maximum buffer size.
fn page_size_for(requested: u64, alignment: u64, max_buffer_size: u64) -> u64 {
    let limit = align_down(max_buffer_size.min(u32::MAX as u64), alignment).max(alignment);
    align_up(requested.max(alignment), alignment).min(limit)
}

fn create_page(device: &wgpu::Device, size: u64) -> Result<wgpu::Buffer, TransientMemoryError> {
    log::info!("creating {size}-byte transient constant page");
    create_buffer_checked(
        device,
        &wgpu::BufferDescriptor {
            label: Some("transient constants"),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        },
    )
    .map_err(|source| TransientMemoryError::PageCreation { size, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_rounded_up_to_the_alignment() {
        assert_eq!(page_size_for(64 * 1024, 256, u64::MAX), 64 * 1024);
        assert_eq!(page_size_for(1000, 256, u64::MAX), 1024);
        assert_eq!(page_size_for(16, 256, u64::MAX), 256);
    }

    #[test]
    fn page_size_clamp_stays_a_multiple_of_the_alignment() {
        assert_eq!(page_size_for(1 << 20, 256, 1000), 768);
        assert_eq!(page_size_for(1 << 40, 256, u64::MAX), 0xffff_ff00);
        assert!(page_size_for(1 << 40, 256, u64::MAX) <= u32::MAX as u64);
    }
}
