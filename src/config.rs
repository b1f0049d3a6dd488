use std::{fs, io, path::Path};

use derive_more::{Display, Error, From};
use serde::{Deserialize, Serialize};

use crate::wgpu_utils::StrategyPreference;

#[derive(Debug, Display, From, Error)]
pub enum ConfigError {
    #[display("{_0}")]
    IoError(io::Error),
    #[display("{_0}")]
    SerdeJsonError(serde_json::Error),
    #[display("invalid `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Sizing of [`TransientMemory`](crate::wgpu_utils::TransientMemory).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransientMemoryConfig {
    /// Number of frames whose allocations stay untouched before their pages are reused.
    pub frames_in_flight: u32,
    pub page_size: u64,
    /// Raised to the device's uniform offset alignment when smaller.
    pub alignment: u64,
}

impl Default for TransientMemoryConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: 2,
            page_size: 64 * 1024,
            alignment: 64,
        }
    }
}

impl TransientMemoryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frames_in_flight == 0 {
            return Err(ConfigError::Invalid {
                field: "transient.frames_in_flight",
                reason: "at least one frame must be in flight".to_owned(),
            });
        }
        if !self.alignment.is_power_of_two() {
            return Err(ConfigError::Invalid {
                field: "transient.alignment",
                reason: format!("{} is not a power of two", self.alignment),
            });
        }
        if self.page_size < self.alignment {
            return Err(ConfigError::Invalid {
                field: "transient.page_size",
                reason: format!(
                    "{} bytes is smaller than the alignment of {} bytes",
                    self.page_size, self.alignment
                ),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConstantBufferConfig {
    pub strategy: StrategyPreference,
    /// Debug label of the constant buffer, instead of the layout's own.
    pub label: Option<String>,
    pub transient: TransientMemoryConfig,
}

impl ConstantBufferConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        log::info!("loading constant buffer config {path:?}...");
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.label.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::Invalid {
                field: "label",
                reason: "labels cannot be empty".to_owned(),
            });
        }
        self.transient.validate()
    }
}
