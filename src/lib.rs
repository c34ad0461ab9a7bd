//! This crate keeps an auxiliary DC regulation module at the right output voltage for its load
//! and publishes its telemetry.
//!
//! Every poll period it reads the module's output voltage and load current over a serial link,
//! moves the output setpoint between 5.24V and 5.35V with a two-state hysteresis policy, and
//! posts both readings to a monitoring service over HTTP.
//!
//! The module is driven with Modbus RTU holding register reads and writes. The serial port used
//! should be configured like so:
//! * Default baud rate: 4800
//! * Data bits: 8
//! * Stop bits: 1
//! * Parity: None

pub mod control;
pub mod controller;
pub mod error;
pub mod link;
pub mod port;
pub mod regulator;
pub mod reporter;
pub mod retry;
pub mod scaling;
pub mod settings;
pub mod types;
mod registers;

#[cfg(test)]
mod mock_serial;
