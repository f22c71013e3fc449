//! Device resolution for the candle backend

use crate::error::GateError;
use candle_core::Device;
use moegate_domain::DevicePlacement;
use tracing::debug;

/// Map a placement hint onto a candle device.
///
/// `Auto` prefers CUDA device 0 and falls back to the CPU.
pub fn resolve_device(placement: DevicePlacement) -> Result<Device, GateError> {
    let device = match placement {
        DevicePlacement::Auto => Device::cuda_if_available(0)?,
        DevicePlacement::Cpu => Device::Cpu,
        DevicePlacement::Cuda(ordinal) => Device::new_cuda(ordinal)?,
        DevicePlacement::Metal(ordinal) => Device::new_metal(ordinal)?,
    };
    debug!("Resolved device {} to {:?}", placement, device);
    Ok(device)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_placement() {
        let device = resolve_device(DevicePlacement::Cpu).unwrap();
        assert!(matches!(device, Device::Cpu));
    }

    #[test]
    fn test_auto_placement_resolves() {
        assert!(resolve_device(DevicePlacement::Auto).is_ok());
    }
}
