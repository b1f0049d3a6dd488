use std::{any::type_name, marker::PhantomData};

use derive_more::{Display, Error, From};
use wgpu::util::DeviceExt as _;

use crate::utils::*;

use super::{
    ShaderConstants, TransientAllocation, TransientMemory, TransientMemoryError, UpdateStrategy,
    validate_layout,
};

/// Minimum alignment of a transient constant block, in bytes.
pub const TRANSIENT_CONSTANT_ALIGNMENT: u64 = 64;

#[derive(Debug, Display, From, Error)]
pub enum ConstantBufferError {
    #[display(
        "constant buffer `{label}` is used before it is created (perhaps `create` hasn't been called?)"
    )]
    NotCreated { label: String },
    #[display(
        "constant buffer `{label}` was created for {actual} updates but a {requested} update was requested"
    )]
    StrategyMismatch {
        label: String,
        requested: UpdateStrategy,
        actual: UpdateStrategy,
    },
    #[display("constant buffer `{label}` uses transient updates but no transient memory was given")]
    MissingTransientMemory { label: String },
    #[display("{strategy} constant updates are not supported by this device")]
    UnsupportedStrategy { strategy: UpdateStrategy },
    #[display(
        "shader constants `{type_name}` are {size} bytes, which is not a non-zero multiple of 16"
    )]
    LayoutMisaligned { type_name: &'static str, size: u64 },
    #[display(
        "shader constants `{type_name}` are {size} bytes, exceeding the device's uniform binding limit of {limit} bytes"
    )]
    LayoutTooLarge {
        type_name: &'static str,
        size: u64,
        limit: u64,
    },
    #[display("device failed to create constant buffer `{label}`: {source}")]
    Device { label: String, source: wgpu::Error },
    #[from]
    #[display("{_0}")]
    TransientMemory(TransientMemoryError),
}

#[derive(Debug)]
enum Backing {
    Uncreated,
    Resident(wgpu::Buffer),
    /// Transient updates carve every write out of `TransientMemory`; no buffer object of our own.
    Transient { alignment: u64 },
}

/// Strongly typed constant buffer holding one `T`.
///
/// Not `Clone`: a buffer is owned by exactly one wrapper and released with it.
#[derive(Debug)]
pub struct ConstantBuffer<T: ShaderConstants> {
    backing: Backing,
    label: Option<String>,
    _marker: PhantomData<T>,
}

impl<T: ShaderConstants> Default for ConstantBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ShaderConstants> ConstantBuffer<T> {
    /// An empty wrapper; [`create`](Self::create) must be called before any update.
    pub fn new() -> Self {
        Self {
            backing: Backing::Uncreated,
            label: the_default(),
            _marker: PhantomData,
        }
    }

    pub fn with_device(
        device: &wgpu::Device,
        strategy: UpdateStrategy,
    ) -> Result<Self, ConstantBufferError> {
        let mut self_ = Self::new();
        self_.create(device, strategy)?;
        Ok(self_)
    }

    /// Overrides the debug label, which defaults to `T::LABEL`. Takes effect on the next `create`.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(T::LABEL)
    }

    pub fn is_created(&self) -> bool {
        !matches!(self.backing, Backing::Uncreated)
    }

    pub fn strategy(&self) -> Option<UpdateStrategy> {
        match self.backing {
            Backing::Uncreated => None,
            Backing::Resident(_) => Some(UpdateStrategy::DiscardRemap),
            Backing::Transient { .. } => Some(UpdateStrategy::Transient),
        }
    }

    /// Creates the backing for `strategy`, releasing any previous one.
    pub fn create(
        &mut self,
        device: &wgpu::Device,
        strategy: UpdateStrategy,
    ) -> Result<(), ConstantBufferError> {
        self.backing = Backing::Uncreated;
        let limits = device.limits();
        validate_layout::<T>(&limits)?;
        if !strategy.is_supported(&limits) {
            return Err(ConstantBufferError::UnsupportedStrategy { strategy });
        }
        let backing = match strategy {
            UpdateStrategy::DiscardRemap => {
                let wgpu_buffer = create_buffer_checked(
                    device,
                    &wgpu::BufferDescriptor {
                        label: Some(self.label()),
                        size: T::SIZE,
                        usage: wgpu::BufferUsages::UNIFORM
                            | wgpu::BufferUsages::COPY_DST
                            | wgpu::BufferUsages::COPY_SRC,
                        mapped_at_creation: false,
                    },
                )
                .map_err(|source| ConstantBufferError::Device {
                    label: self.label().to_owned(),
                    source,
                })?;
                Backing::Resident(wgpu_buffer)
            }
            UpdateStrategy::Transient => Backing::Transient {
                alignment: TRANSIENT_CONSTANT_ALIGNMENT
                    .max(limits.min_uniform_buffer_offset_alignment as u64),
            },
        };
        log::info!(
            "created constant buffer `{}` ({} bytes of `{}`, {strategy} updates)",
            self.label(),
            T::SIZE,
            type_name::<T>(),
        );
        self.backing = backing;
        Ok(())
    }

    /// The resident buffer, if the buffer is created for discard-and-remap updates.
    pub fn wgpu_buffer(&self) -> Option<&wgpu::Buffer> {
        match &self.backing {
            Backing::Resident(wgpu_buffer) => Some(wgpu_buffer),
            _ => None,
        }
    }

    fn resident_buffer(&self) -> Result<&wgpu::Buffer, ConstantBufferError> {
        match &self.backing {
            Backing::Resident(wgpu_buffer) => Ok(wgpu_buffer),
            Backing::Uncreated => Err(self.not_created()),
            Backing::Transient { .. } => Err(ConstantBufferError::StrategyMismatch {
                label: self.label().to_owned(),
                requested: UpdateStrategy::DiscardRemap,
                actual: UpdateStrategy::Transient,
            }),
        }
    }

    fn not_created(&self) -> ConstantBufferError {
        ConstantBufferError::NotCreated {
            label: self.label().to_owned(),
        }
    }

    /// Replaces the whole contents with `value` through a discard-and-remap write.
    ///
    /// The write lands before the next submission starts, so every command in that submission
    /// reads the last value written. Use [`set_data_with_encoder`](Self::set_data_with_encoder)
    /// to change the contents between passes of one submission.
    pub fn set_data(&self, queue: &wgpu::Queue, value: &T) -> Result<(), ConstantBufferError> {
        let wgpu_buffer = self.resident_buffer()?;
        queue.write_buffer(wgpu_buffer, 0, bytemuck::bytes_of(value));
        log::trace!("wrote {} bytes to constant buffer `{}`", T::SIZE, self.label());
        Ok(())
    }

    /// Replaces the whole contents with `value` at this point of `encoder`.
    ///
    /// `value` goes into a fresh staging region that is copied into the buffer in command order:
    /// commands recorded before this call read the previous contents, commands recorded after it
    /// read `value`.
    pub fn set_data_with_encoder(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        value: &T,
    ) -> Result<(), ConstantBufferError> {
        let wgpu_buffer = self.resident_buffer()?;
        let staging_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(self.label()),
            contents: bytemuck::bytes_of(value),
            usage: wgpu::BufferUsages::COPY_SRC,
        });
        encoder.copy_buffer_to_buffer(&staging_buffer, 0, wgpu_buffer, 0, T::SIZE);
        log::trace!(
            "recorded a {}-byte write to constant buffer `{}`",
            T::SIZE,
            self.label()
        );
        Ok(())
    }

    /// Writes `value` into a fresh region of the current frame of `transient_memory`.
    pub fn set_data_transient(
        &self,
        transient_memory: &mut TransientMemory,
        queue: &wgpu::Queue,
        value: &T,
    ) -> Result<TransientAllocation, ConstantBufferError> {
        let alignment = match self.backing {
            Backing::Transient { alignment } => alignment,
            Backing::Uncreated => return Err(self.not_created()),
            Backing::Resident(_) => {
                return Err(ConstantBufferError::StrategyMismatch {
                    label: self.label().to_owned(),
                    requested: UpdateStrategy::Transient,
                    actual: UpdateStrategy::DiscardRemap,
                });
            }
        };
        Ok(transient_memory.write(queue, value, alignment)?)
    }

    /// Writes `value` with whichever strategy the buffer was created for.
    pub fn update<'a>(
        &'a self,
        queue: &wgpu::Queue,
        transient_memory: Option<&mut TransientMemory>,
        value: &T,
    ) -> Result<ConstantsBinding<'a>, ConstantBufferError> {
        match (&self.backing, transient_memory) {
            (Backing::Transient { .. }, Some(transient_memory)) => Ok(ConstantsBinding::Transient(
                self.set_data_transient(transient_memory, queue, value)?,
            )),
            (Backing::Transient { .. }, None) => Err(ConstantBufferError::MissingTransientMemory {
                label: self.label().to_owned(),
            }),
            _ => {
                self.set_data(queue, value)?;
                Ok(ConstantsBinding::Resident(self.resident_buffer()?))
            }
        }
    }

    /// Bind group layout entry for this buffer. Transient buffers need a dynamic offset.
    pub fn layout_entry(
        &self,
        binding: u32,
        visibility: wgpu::ShaderStages,
    ) -> wgpu::BindGroupLayoutEntry {
        wgpu::BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: matches!(self.backing, Backing::Transient { .. }),
                min_binding_size: wgpu::BufferSize::new(T::SIZE),
            },
            count: None,
        }
    }
}

/// Where the latest constants live after [`ConstantBuffer::update`].
#[derive(Debug, Clone)]
pub enum ConstantsBinding<'a> {
    Resident(&'a wgpu::Buffer),
    Transient(TransientAllocation),
}

impl ConstantsBinding<'_> {
    pub fn wgpu_buffer(&self) -> &wgpu::Buffer {
        match self {
            Self::Resident(wgpu_buffer) => wgpu_buffer,
            Self::Transient(allocation) => allocation.wgpu_buffer(),
        }
    }

    pub fn offset(&self) -> u64 {
        match self {
            Self::Resident(_) => 0,
            Self::Transient(allocation) => allocation.offset(),
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            Self::Resident(wgpu_buffer) => wgpu_buffer.size(),
            Self::Transient(allocation) => allocation.size(),
        }
    }

    pub fn binding_resource(&self) -> wgpu::BindingResource<'_> {
        match self {
            Self::Resident(wgpu_buffer) => wgpu_buffer.as_entire_binding(),
            Self::Transient(allocation) => allocation.binding_resource(),
        }
    }

    /// Dynamic offsets to pass to `set_bind_group`.
    pub fn dynamic_offsets(&self) -> Vec<u32> {
        match self {
            Self::Resident(_) => Vec::new(),
            Self::Transient(allocation) => vec![allocation.dynamic_offset()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer_reports_not_created() {
        let constant_buffer = ConstantBuffer::<[[f32; 4]; 4]>::new();
        assert!(!constant_buffer.is_created());
        assert_eq!(constant_buffer.strategy(), None);
        assert!(constant_buffer.wgpu_buffer().is_none());
        assert!(matches!(
            constant_buffer.resident_buffer(),
            Err(ConstantBufferError::NotCreated { .. })
        ));
    }

    #[test]
    fn label_defaults_to_layout_label() {
        let constant_buffer = ConstantBuffer::<[f32; 4]>::default();
        assert_eq!(constant_buffer.label(), "vec4<f32>");
        let constant_buffer = constant_buffer.with_label("fill color");
        assert_eq!(constant_buffer.label(), "fill color");
    }

    #[test]
    fn layout_entry_describes_a_uniform_of_the_layout_size() {
        let constant_buffer = ConstantBuffer::<[[f32; 4]; 4]>::new();
        let entry = constant_buffer.layout_entry(2, wgpu::ShaderStages::VERTEX);
        assert_eq!(entry.binding, 2);
        assert_eq!(entry.visibility, wgpu::ShaderStages::VERTEX);
        match entry.ty {
            wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset,
                min_binding_size,
            } => {
                assert!(!has_dynamic_offset);
                assert_eq!(min_binding_size.map(|size| size.get()), Some(64));
            }
            other => panic!("expected a uniform buffer binding, found {other:?}"),
        }
    }

    #[test]
    fn errors_name_the_buffer() {
        let error = ConstantBufferError::StrategyMismatch {
            label: "camera".to_owned(),
            requested: UpdateStrategy::Transient,
            actual: UpdateStrategy::DiscardRemap,
        };
        assert_eq!(
            error.to_string(),
            "constant buffer `camera` was created for discard-and-remap updates but a transient update was requested"
        );
    }
}
