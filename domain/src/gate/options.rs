//! Model loading options.
//!
//! These flags are not interpreted by the gate pipeline itself; they are
//! forwarded to the model registry, tensor loader, and tokenizer.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placement hint for tensors and loaded models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DevicePlacement {
    /// First accelerator if one is available, CPU otherwise
    #[default]
    Auto,
    Cpu,
    Cuda(usize),
    Metal(usize),
}

impl fmt::Display for DevicePlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DevicePlacement::Auto => write!(f, "auto"),
            DevicePlacement::Cpu => write!(f, "cpu"),
            DevicePlacement::Cuda(ordinal) => write!(f, "cuda:{}", ordinal),
            DevicePlacement::Metal(ordinal) => write!(f, "metal:{}", ordinal),
        }
    }
}

impl std::str::FromStr for DevicePlacement {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        let (kind, ordinal) = match lowered.split_once(':') {
            Some((kind, ordinal)) => {
                let ordinal = ordinal
                    .parse::<usize>()
                    .map_err(|_| DomainError::InvalidDevice(s.to_string()))?;
                (kind.to_string(), ordinal)
            }
            None => (lowered, 0),
        };
        match kind.as_str() {
            "auto" => Ok(DevicePlacement::Auto),
            "cpu" => Ok(DevicePlacement::Cpu),
            "cuda" | "gpu" => Ok(DevicePlacement::Cuda(ordinal)),
            "metal" | "mps" => Ok(DevicePlacement::Metal(ordinal)),
            _ => Err(DomainError::InvalidDevice(s.to_string())),
        }
    }
}

impl TryFrom<String> for DevicePlacement {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DevicePlacement> for String {
    fn from(value: DevicePlacement) -> Self {
        value.to_string()
    }
}

/// Weight quantization requested at model load time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantization {
    FourBit,
    EightBit,
}

impl fmt::Display for Quantization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantization::FourBit => write!(f, "4-bit"),
            Quantization::EightBit => write!(f, "8-bit"),
        }
    }
}

/// Options forwarded to model, tensor, and tokenizer loading.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    pub load_in_4bit: bool,
    pub load_in_8bit: bool,
    pub lazy_unpickle: bool,
    pub trust_remote_code: bool,
    pub device: DevicePlacement,
}

impl LoadOptions {
    // ==================== Builder Methods ====================

    pub fn with_load_in_4bit(mut self, enabled: bool) -> Self {
        self.load_in_4bit = enabled;
        self
    }

    pub fn with_load_in_8bit(mut self, enabled: bool) -> Self {
        self.load_in_8bit = enabled;
        self
    }

    pub fn with_lazy_unpickle(mut self, enabled: bool) -> Self {
        self.lazy_unpickle = enabled;
        self
    }

    pub fn with_trust_remote_code(mut self, enabled: bool) -> Self {
        self.trust_remote_code = enabled;
        self
    }

    pub fn with_device(mut self, device: DevicePlacement) -> Self {
        self.device = device;
        self
    }

    /// Reject flag combinations no loader can honor
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.load_in_4bit && self.load_in_8bit {
            return Err(DomainError::ConflictingQuantization);
        }
        Ok(())
    }

    pub fn quantization(&self) -> Option<Quantization> {
        if self.load_in_4bit {
            Some(Quantization::FourBit)
        } else if self.load_in_8bit {
            Some(Quantization::EightBit)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_from_str() {
        assert_eq!("auto".parse::<DevicePlacement>().ok(), Some(DevicePlacement::Auto));
        assert_eq!("CPU".parse::<DevicePlacement>().ok(), Some(DevicePlacement::Cpu));
        assert_eq!("cuda".parse::<DevicePlacement>().ok(), Some(DevicePlacement::Cuda(0)));
        assert_eq!(
            "cuda:2".parse::<DevicePlacement>().ok(),
            Some(DevicePlacement::Cuda(2))
        );
        assert_eq!("mps".parse::<DevicePlacement>().ok(), Some(DevicePlacement::Metal(0)));
        assert!("tpu".parse::<DevicePlacement>().is_err());
        assert!("cuda:x".parse::<DevicePlacement>().is_err());
    }

    #[test]
    fn test_device_display() {
        assert_eq!(DevicePlacement::Auto.to_string(), "auto");
        assert_eq!(DevicePlacement::Cuda(1).to_string(), "cuda:1");
    }

    #[test]
    fn test_default_options() {
        let options = LoadOptions::default();
        assert!(!options.load_in_4bit);
        assert!(!options.load_in_8bit);
        assert_eq!(options.device, DevicePlacement::Auto);
        assert!(options.validate().is_ok());
        assert_eq!(options.quantization(), None);
    }

    #[test]
    fn test_conflicting_quantization() {
        let options = LoadOptions::default()
            .with_load_in_4bit(true)
            .with_load_in_8bit(true);
        assert_eq!(options.validate(), Err(DomainError::ConflictingQuantization));
    }

    #[test]
    fn test_quantization() {
        let options = LoadOptions::default().with_load_in_8bit(true);
        assert_eq!(options.quantization(), Some(Quantization::EightBit));
    }
}
