pub(crate) fn the_default<T: Default>() -> T {
    Default::default()
}

/// Rounds `value` up to the next multiple of `alignment`, which must be non-zero.
pub(crate) fn align_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

/// Rounds `value` down to a multiple of `alignment`, which must be non-zero.
pub(crate) fn align_down(value: u64, alignment: u64) -> u64 {
    value / alignment * alignment
}

/// Creates a buffer, returning the validation or out-of-memory error the device raised for it.
pub(crate) fn create_buffer_checked(
    device: &wgpu::Device,
    descriptor: &wgpu::BufferDescriptor<'_>,
) -> Result<wgpu::Buffer, wgpu::Error> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let buffer = device.create_buffer(descriptor);
    let validation_error = pollster::block_on(device.pop_error_scope());
    let out_of_memory_error = pollster::block_on(device.pop_error_scope());
    match validation_error.or(out_of_memory_error) {
        Some(error) => Err(error),
        None => Ok(buffer),
    }
}
