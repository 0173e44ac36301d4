//! Human-readable error descriptions and structured JSON error formatting.

/// Map an eyre::Report to a human-readable explanation with likely causes
/// and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    use turret_core::error::{BuildError, TurretError};

    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See README for a sample."
            ),
        };
    }

    if let Some(te) = err.downcast_ref::<TurretError>() {
        return match te {
            TurretError::Timeout => {
                "What happened: No frame arrived from the capture side in time.\nLikely causes: Camera not attached, inference process down, or capture.frame_timeout_ms too low.\nHow to fix: Check the camera and detector, or raise capture.frame_timeout_ms in the config.".to_string()
            }
            TurretError::Rejected(msg) => format!(
                "What happened: Command refused ({msg}).\nLikely causes: The turret is in the other operating mode.\nHow to fix: Switch modes first; automatic tracking owns the servos while it runs."
            ),
            TurretError::Hardware(msg) | TurretError::HardwareFault(msg) => format!(
                "What happened: Hardware error ({msg}).\nLikely causes: I2C/GPIO wiring, power, or permissions.\nHow to fix: Verify the PCA9685 address and bus in [servo], relay pin in [actuators], and GPIO access rights."
            ),
            TurretError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file and rerun."
            ),
            TurretError::State(msg) => format!(
                "What happened: Internal state error ({msg}).\nLikely causes: A worker thread died mid-run.\nHow to fix: Re-run with --log-level=debug and file a report with the log."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config. The
    // alternate format includes the whole context chain.
    let msg = format!("{err:#}");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("i2c") || lower.contains("gpio") {
        return "What happened: Failed to open a hardware bus.\nLikely causes: Wrong i2c_bus/i2c_address or relay_pin, or insufficient permissions.\nHow to fix: Fix the [servo]/[actuators] values in the config; ensure the process may access I2C and GPIO.".to_string();
    }

    if lower.contains("must be") || lower.contains("must differ") || lower.contains("must lie") {
        return format!(
            "What happened: Configuration failed validation.\nDetail: {msg}\nHow to fix: Edit the TOML config and try again."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per error family; everything else returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    use turret_core::error::TurretError;
    if let Some(te) = err.downcast_ref::<TurretError>() {
        return match te {
            TurretError::Rejected(_) => 3,
            TurretError::Timeout => 4,
            TurretError::Hardware(_) | TurretError::HardwareFault(_) => 5,
            TurretError::Config(_) | TurretError::State(_) => 2,
        };
    }
    if err.downcast_ref::<turret_core::error::BuildError>().is_some() {
        return 2;
    }
    1
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;
    use turret_core::error::TurretError;

    let reason = match err.downcast_ref::<TurretError>() {
        Some(TurretError::Rejected(_)) => "Rejected",
        Some(TurretError::Timeout) => "Timeout",
        Some(TurretError::Hardware(_)) => "Hardware",
        Some(TurretError::HardwareFault(_)) => "HardwareFault",
        Some(TurretError::Config(_)) => "Config",
        Some(TurretError::State(_)) => "State",
        None => "Error",
    };
    json!({ "reason": reason, "message": humanize(err) }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use turret_core::error::TurretError;

    #[test]
    fn rejected_maps_to_its_exit_code_and_reason() {
        let err = eyre::Report::new(TurretError::Rejected("manual move".into()));
        assert_eq!(exit_code_for_error(&err), 3);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Rejected");
    }

    #[test]
    fn unknown_errors_fall_back_to_one() {
        let err = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&err), 1);
        assert!(humanize(&err).contains("boom"));
    }
}
