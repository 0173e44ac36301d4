use thiserror::Error;

/// Typed error used at the control-loop boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TurretError {
    /// Generic hardware I/O problem (bus write failed, device missing)
    #[error("hardware error: {0}")]
    Hardware(String),
    /// A fault the device itself reported
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("configuration error: {0}")]
    Config(String),
    /// No frame arrived from the detection source in time
    #[error("timed out waiting for capture")]
    Timeout,
    /// Internal state invalid (poisoned lock, stopped worker)
    #[error("invalid state: {0}")]
    State(String),
    /// Command refused by mode arbitration
    #[error("rejected: {0}")]
    Rejected(String),
}

/// Errors constructing a pipeline out of parts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

/// Map a boxed hardware error into a `TurretError`, downcasting to the
/// hardware crate's typed errors when that feature is enabled.
pub(crate) fn map_hw_error_dyn(e: &(dyn std::error::Error + 'static)) -> TurretError {
    #[cfg(feature = "hardware-errors")]
    {
        use turret_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Timeout => TurretError::Timeout,
                other => TurretError::HardwareFault(other.to_string()),
            };
        }
    }
    let msg = e.to_string();
    if msg.to_lowercase().contains("timeout") {
        TurretError::Timeout
    } else {
        TurretError::Hardware(msg)
    }
}
