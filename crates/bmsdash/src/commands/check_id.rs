//! Device-id availability check.
//!
//! Drives the same debounced validator the registration form uses, with a
//! single input, and reports the settled state.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use bmsdash_core::{AvailabilityState, CoreError, DebouncedValidator, Protocol, ValidatorOptions};

use crate::cli::{CheckIdArgs, GlobalOpts};
use crate::config::{self, Needs};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckResult {
    device_id: String,
    protocol: Protocol,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl CheckResult {
    fn new(device_id: &str, protocol: Protocol, state: &AvailabilityState) -> Self {
        let (status, message) = match state {
            AvailabilityState::Idle => ("not-required", None),
            AvailabilityState::Checking => ("checking", None),
            AvailabilityState::Available => ("available", None),
            AvailabilityState::Taken => ("exists", None),
            AvailabilityState::Error(m) => ("error", Some(m.clone())),
        };
        Self {
            device_id: device_id.to_owned(),
            protocol,
            status,
            message,
        }
    }
}

pub async fn handle(args: CheckIdArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let device_id = args.device_id.trim();
    if device_id.is_empty() {
        return Err(CliError::Validation {
            field: "device-id".into(),
            reason: "must not be empty".into(),
        });
    }

    let state = if args.protocol.requires_unique_device_id() {
        check_remote(device_id, args.protocol, global).await?
    } else {
        debug!(protocol = %args.protocol, "Protocol ids are host-scoped; skipping check");
        AvailabilityState::Idle
    };

    let color = output::should_color(global.color);
    let result = CheckResult::new(device_id, args.protocol, &state);
    let out = output::render_single(
        global.output,
        &result,
        |_| output::availability_line(device_id, &state, color),
        |r| r.status.to_owned(),
    )?;
    output::print_output(&out, global.quiet);

    match state {
        AvailabilityState::Taken => Err(CliError::Conflict {
            resource_type: "device id".into(),
            identifier: device_id.to_owned(),
        }),
        AvailabilityState::Error(message) => Err(CliError::CheckFailed { message }),
        _ => Ok(()),
    }
}

async fn check_remote(
    device_id: &str,
    protocol: Protocol,
    global: &GlobalOpts,
) -> Result<AvailabilityState, CliError> {
    let dashboard = config::resolve_dashboard_config(global, Needs::Rest)?;
    let client = dashboard.config_client()?;

    let validator = DebouncedValidator::spawn(
        Arc::new(client),
        ValidatorOptions {
            protocol: Some(protocol),
            ..dashboard.validator_options()
        },
    );
    let mut states = validator.subscribe();
    validator.set_input(device_id);

    // The watch guard must be released before shutdown.
    let outcome = {
        let settled = tokio::time::timeout(
            config::request_timeout(&dashboard),
            states.wait_for(|s| !matches!(s, AvailabilityState::Idle | AvailabilityState::Checking)),
        )
        .await;
        match settled {
            Ok(Ok(state)) => Ok(state.clone()),
            Ok(Err(_)) => Err(CliError::from(CoreError::UnexpectedResponse {
                message: "validator stopped before the check settled".into(),
            })),
            Err(_) => Err(CliError::Timeout),
        }
    };

    validator.shutdown().await;
    outcome
}
