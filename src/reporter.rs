//! HTTP client for publishing measurements to the monitoring service.

use crate::{error::ReportError, types::Measurement};
use reqwest::{Url, blocking::Client};
use serde::Serialize;
use std::time::Duration;

/// Default bound on a single report request.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Delivers measurements somewhere. One call, one delivery attempt.
pub trait Report {
    fn report(&mut self, measurement: &Measurement) -> Result<(), ReportError>;
}

/// JSON body of a session value update.
#[derive(Debug, Serialize, PartialEq)]
pub struct ValuePayload {
    /// Decimal string with six fractional digits, e.g. `"3.300000"`.
    pub value: String,
}

impl From<&Measurement> for ValuePayload {
    fn from(measurement: &Measurement) -> Self {
        Self {
            value: format!("{:.6}", measurement.value),
        }
    }
}

/// Posts each measurement to `{monitor_host}/session/{VALUE_TYPE}`.
pub struct TelemetryReporter {
    client: Client,
    monitor_host: Url,
}

impl TelemetryReporter {
    /// Create a reporter whose requests time out after `timeout`.
    pub fn new(monitor_host: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, monitor_host))
    }

    pub fn with_client(client: Client, monitor_host: Url) -> Self {
        Self {
            client,
            monitor_host,
        }
    }

    /// Endpoint for a measurement.
    pub fn endpoint(&self, measurement: &Measurement) -> String {
        format!(
            "{}/session/{}",
            self.monitor_host.as_str().trim_end_matches('/'),
            measurement.kind.value_type()
        )
    }
}

impl Report for TelemetryReporter {
    fn report(&mut self, measurement: &Measurement) -> Result<(), ReportError> {
        let url = self.endpoint(measurement);
        let payload = ValuePayload::from(measurement);

        log::debug!("Posting {:?} to {}", payload, url);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .map_err(|source| ReportError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ReportError::Status {
                url,
                status: status.as_u16(),
            })
        }
    }
}
