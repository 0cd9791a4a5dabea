//! Human-readable error descriptions and structured JSON error formatting.

use garage_core::EstimatorError;

use crate::cli::CliError;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(ce) = err.downcast_ref::<CliError>() {
        return match ce {
            CliError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/garage.toml for a sample."
            ),
            CliError::BadScript(msg) => format!(
                "What happened: The simulation script could not be parsed ({msg}).\nLikely causes: A step is not written as action[:door]@ms.\nHow to fix: Use steps like `close@0,close:side@2000,sensor-closed@9000`."
            ),
            CliError::UnknownDoor(id) => format!(
                "What happened: Door '{id}' is not configured.\nLikely causes: Typo in --door or a script step.\nHow to fix: Use one of the [[doors]] ids from the config."
            ),
        };
    }

    if let Some(ee) = err.downcast_ref::<EstimatorError>() {
        return match ee {
            EstimatorError::InvalidRating { door, open_ms, close_ms } => format!(
                "What happened: Door {door} has an unusable rating (open={open_ms}ms, close={close_ms}ms).\nLikely causes: A rated travel time is zero or negative.\nHow to fix: Measure full open and close runs and set time_to_open_ms / time_to_close_ms."
            ),
            EstimatorError::StoreRejected(what) => format!(
                "What happened: The entity store rejected a write to {what}.\nLikely causes: Schema validation or a read-only field.\nHow to fix: Check the store schema for the door entity."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from config or CSV loading
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("travel csv must have headers") {
        return "Invalid headers in travel CSV. Expected 'door,direction,ms'.".to_string();
    }

    if lower.contains("travel csv") || lower.contains("invalid csv row") {
        return format!(
            "What happened: The travel CSV could not be used ({msg}).\nLikely causes: Missing open/close runs for a door, a non-positive ms value, or an unknown door id.\nHow to fix: Record at least one open and one close run per configured door."
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

/// Stable exit codes: 2 usage, 3 configuration, 4 estimator, 1 anything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(ce) = err.downcast_ref::<CliError>() {
        return match ce {
            CliError::Config(_) => 3,
            CliError::BadScript(_) | CliError::UnknownDoor(_) => 2,
        };
    }
    if err.downcast_ref::<EstimatorError>().is_some() {
        return 4;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(ce) = err.downcast_ref::<CliError>() {
        return match ce {
            CliError::Config(_) => "Config",
            CliError::BadScript(_) => "BadScript",
            CliError::UnknownDoor(_) => "UnknownDoor",
        };
    }
    if let Some(ee) = err.downcast_ref::<EstimatorError>() {
        return match ee {
            EstimatorError::InvalidRating { .. } => "InvalidRating",
            EstimatorError::MalformedNotification { .. } => "MalformedNotification",
            EstimatorError::Store(_) => "Store",
            EstimatorError::StoreRejected(_) => "StoreRejected",
            EstimatorError::Config(_) => "Config",
        };
    }
    "Error"
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_errors_get_stable_codes() {
        let e = eyre::Report::new(CliError::UnknownDoor("attic".into()));
        assert_eq!(exit_code_for_error(&e), 2);
        assert!(humanize(&e).contains("attic"));

        let e = eyre::Report::new(EstimatorError::InvalidRating {
            door: "main".into(),
            open_ms: 0,
            close_ms: 8000,
        });
        assert_eq!(exit_code_for_error(&e), 4);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&e)).unwrap();
        assert_eq!(v["reason"], "InvalidRating");
    }

    #[test]
    fn cli_errors_render_their_subject() {
        assert_eq!(
            CliError::Config("doors empty".into()).to_string(),
            "invalid configuration: doors empty"
        );
        assert_eq!(CliError::BadScript("x@y".into()).to_string(), "bad script: x@y");
        assert_eq!(CliError::UnknownDoor("attic".into()).to_string(), "unknown door 'attic'");
    }

    #[test]
    fn untyped_errors_fall_back() {
        let e = eyre::eyre!("travel CSV must have headers 'door,direction,ms', got: a,b");
        assert_eq!(exit_code_for_error(&e), 1);
        assert!(humanize(&e).contains("Invalid headers"));
    }
}
