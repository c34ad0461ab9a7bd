use std::{path::PathBuf, process::ExitCode, time::Duration};

use anyhow::Context;
use clap::Parser;
use drok_aux_regulator::{
    control::{ControlLoop, LoopTiming},
    controller::{DEFAULT_TOLERANCE_VOLTS, Hysteresis},
    link::{DEFAULT_BAUD_RATE, DEFAULT_FAILURE_THRESHOLD, DEFAULT_UNIT_ID, DeviceLink, LinkSettings},
    port::SerialConnector,
    reporter::TelemetryReporter,
    retry::{RetryPolicy, ThreadSleep},
    scaling::ScalingFactors,
    settings::{DEFAULT_SECTION, EndpointConfig},
};
use env_logger::Builder;
use log::{LevelFilter, error, info};

/// Exit code for an unusable settings file.
const EXIT_CONFIG: u8 = 3;

/// Regulates an auxiliary DC module's output voltage and reports its telemetry.
#[derive(Parser, Debug)]
#[command(name = "drok-aux-regulator", version)]
struct Cli {
    /// File to recover the persistent settings from.
    #[arg(long)]
    settings_file: PathBuf,
    /// Settings section holding DROK_DEVICE and MDROID_HOST.
    #[arg(long, default_value = DEFAULT_SECTION)]
    section: String,
    /// Seconds between polls.
    #[arg(long, default_value_t = 10)]
    poll_interval_secs: u64,
    /// Seconds to wait before the first connect retry.
    #[arg(long, default_value_t = 10)]
    reconnect_delay_secs: u64,
    /// Growth factor of the connect retry delay. 1.0 keeps it fixed.
    #[arg(long, default_value_t = 1.0, value_parser = parse_backoff)]
    reconnect_backoff: f32,
    /// Upper bound of the connect retry delay.
    #[arg(long, default_value_t = 60)]
    reconnect_max_delay_secs: u64,
    /// Consecutive failed transactions before the serial link is reopened. 0 never reopens.
    #[arg(long, default_value_t = DEFAULT_FAILURE_THRESHOLD)]
    failure_threshold: u32,
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    baud_rate: u32,
    /// Modbus unit id of the regulator.
    #[arg(long, default_value_t = DEFAULT_UNIT_ID)]
    unit_id: u8,
    /// Serial read timeout in milliseconds.
    #[arg(long, default_value_t = 300)]
    serial_timeout_ms: u64,
    /// HTTP request timeout in seconds.
    #[arg(long, default_value_t = 5)]
    http_timeout_secs: u64,
    /// Millivolts per raw voltage register count.
    #[arg(long, default_value_t = 10)]
    voltage_step_mv: u32,
    /// Milliamps per raw current register count.
    #[arg(long, default_value_t = 10)]
    current_step_ma: u32,
    /// Window around a setpoint within which the output counts as settled, in volts.
    #[arg(long, default_value_t = DEFAULT_TOLERANCE_VOLTS, value_parser = parse_tolerance)]
    tolerance: f32,
}

fn parse_backoff(s: &str) -> Result<f32, String> {
    let value: f32 = s.parse().map_err(|e| format!("{e}"))?;
    if value.is_finite() && value >= 1.0 {
        Ok(value)
    } else {
        Err(format!("{s} is not a finite factor of at least 1.0"))
    }
}

fn parse_tolerance(s: &str) -> Result<f32, String> {
    let value: f32 = s.parse().map_err(|e| format!("{e}"))?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("{s} is not a positive number of volts"))
    }
}

impl Cli {
    fn timing(&self) -> LoopTiming {
        let initial_delay = Duration::from_secs(self.reconnect_delay_secs);
        LoopTiming {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            reconnect: RetryPolicy {
                initial_delay,
                multiplier: self.reconnect_backoff,
                max_delay: Duration::from_secs(self.reconnect_max_delay_secs).max(initial_delay),
                max_attempts: None,
            },
        }
    }

    fn link_settings(&self, device_address: String) -> LinkSettings {
        LinkSettings {
            address: device_address,
            baud_rate: self.baud_rate,
            unit_id: self.unit_id,
            scaling: ScalingFactors::new(self.voltage_step_mv.max(1), self.current_step_ma.max(1)),
            failure_threshold: self.failure_threshold,
        }
    }
}

fn main() -> ExitCode {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter(Some("drok_aux_regulator"), LevelFilter::Debug)
        .parse_default_env()
        .init();

    let cli = Cli::parse();

    let config = match EndpointConfig::load(&cli.settings_file, &cli.section) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    match run(cli, config) {
        Ok(never) => match never {},
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, config: EndpointConfig) -> anyhow::Result<std::convert::Infallible> {
    info!(
        "Regulator at {}, reporting to {}",
        config.device_address, config.monitor_host
    );

    let reporter = TelemetryReporter::new(
        config.monitor_host,
        Duration::from_secs(cli.http_timeout_secs),
    )
    .context("Failed to create HTTP client")?;
    let connector = SerialConnector::new(Duration::from_millis(cli.serial_timeout_ms));
    let link = DeviceLink::new(connector, cli.link_settings(config.device_address));

    let mut control = ControlLoop::new(
        link,
        reporter,
        ThreadSleep,
        Hysteresis::with_tolerance(cli.tolerance),
        cli.timing(),
    );

    control
        .establish()
        .context("Failed to connect to regulator")?;
    info!("Starting control loop");
    control.run()
}
