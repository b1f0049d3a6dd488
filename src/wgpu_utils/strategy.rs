use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::ConstantBufferError;

/// How a [`ConstantBuffer`](super::ConstantBuffer) gets new contents before a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum UpdateStrategy {
    /// Overwrite the resident buffer through the queue.
    ///
    /// wgpu stages every write in fresh memory and copies it ahead of the next submission, so
    /// the CPU never waits for in-flight reads of the previous contents. Queue writes land
    /// before the whole next submission; encoder writes
    /// ([`set_data_with_encoder`](super::ConstantBuffer::set_data_with_encoder)) land in command
    /// order, so passes recorded earlier keep reading the previous contents.
    #[display("discard-and-remap")]
    DiscardRemap,
    /// Sub-allocate a region of frame-scoped [`TransientMemory`](super::TransientMemory) per
    /// write, bound with a dynamic offset. Every draw observes its own value.
    #[display("transient")]
    Transient,
}

impl UpdateStrategy {
    pub fn is_supported(self, limits: &wgpu::Limits) -> bool {
        match self {
            Self::DiscardRemap => true,
            Self::Transient => limits.max_dynamic_uniform_buffers_per_pipeline_layout > 0,
        }
    }

    /// Unified-memory adapters write transient pages as cheaply as a dedicated buffer, so they
    /// prefer sub-allocation; discrete adapters keep one resident buffer.
    pub fn preferred_for(device_type: wgpu::DeviceType, limits: &wgpu::Limits) -> Self {
        let unified_memory = matches!(
            device_type,
            wgpu::DeviceType::IntegratedGpu | wgpu::DeviceType::Cpu
        );
        if unified_memory && Self::Transient.is_supported(limits) {
            Self::Transient
        } else {
            Self::DiscardRemap
        }
    }
}

/// Configured choice of [`UpdateStrategy`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyPreference {
    /// Pick from the adapter's capabilities.
    #[default]
    Auto,
    DiscardRemap,
    Transient,
}

impl StrategyPreference {
    pub fn resolve(
        self,
        device_type: wgpu::DeviceType,
        limits: &wgpu::Limits,
    ) -> Result<UpdateStrategy, ConstantBufferError> {
        let strategy = match self {
            Self::Auto => UpdateStrategy::preferred_for(device_type, limits),
            Self::DiscardRemap => UpdateStrategy::DiscardRemap,
            Self::Transient => UpdateStrategy::Transient,
        };
        if !strategy.is_supported(limits) {
            return Err(ConstantBufferError::UnsupportedStrategy { strategy });
        }
        log::info!("constant update strategy: {strategy} ({self:?} on {device_type:?} adapter)");
        Ok(strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits_without_dynamic_uniforms() -> wgpu::Limits {
        wgpu::Limits {
            max_dynamic_uniform_buffers_per_pipeline_layout: 0,
            ..wgpu::Limits::default()
        }
    }

    #[test]
    fn unified_memory_adapters_prefer_transient() {
        let limits = wgpu::Limits::default();
        for device_type in [wgpu::DeviceType::IntegratedGpu, wgpu::DeviceType::Cpu] {
            assert_eq!(
                UpdateStrategy::preferred_for(device_type, &limits),
                UpdateStrategy::Transient,
            );
        }
        for device_type in [
            wgpu::DeviceType::DiscreteGpu,
            wgpu::DeviceType::VirtualGpu,
            wgpu::DeviceType::Other,
        ] {
            assert_eq!(
                UpdateStrategy::preferred_for(device_type, &limits),
                UpdateStrategy::DiscardRemap,
            );
        }
    }

    #[test]
    fn auto_never_picks_an_unsupported_strategy() {
        let limits = limits_without_dynamic_uniforms();
        let strategy = StrategyPreference::Auto
            .resolve(wgpu::DeviceType::IntegratedGpu, &limits)
            .unwrap();
        assert_eq!(strategy, UpdateStrategy::DiscardRemap);
    }

    #[test]
    fn explicit_transient_without_dynamic_uniforms_is_an_error() {
        let limits = limits_without_dynamic_uniforms();
        let result = StrategyPreference::Transient.resolve(wgpu::DeviceType::DiscreteGpu, &limits);
        assert!(matches!(
            result,
            Err(ConstantBufferError::UnsupportedStrategy {
                strategy: UpdateStrategy::Transient
            })
        ));
    }

    #[test]
    fn explicit_preferences_override_the_adapter() {
        let limits = wgpu::Limits::default();
        assert_eq!(
            StrategyPreference::DiscardRemap
                .resolve(wgpu::DeviceType::Cpu, &limits)
                .unwrap(),
            UpdateStrategy::DiscardRemap,
        );
        assert_eq!(
            StrategyPreference::Transient
                .resolve(wgpu::DeviceType::DiscreteGpu, &limits)
                .unwrap(),
            UpdateStrategy::Transient,
        );
    }

    #[test]
    fn preference_names_are_snake_case() {
        let preference: StrategyPreference = serde_json::from_str("\"discard_remap\"").unwrap();
        assert_eq!(preference, StrategyPreference::DiscardRemap);
        assert_eq!(
            serde_json::to_string(&StrategyPreference::Transient).unwrap(),
            "\"transient\""
        );
    }
}
