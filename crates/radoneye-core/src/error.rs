//! Error types for radoneye-core.
//!
//! This module defines all error types that can occur while talking to a
//! RadonEye device over Bluetooth Low Energy.
//!
//! # Error Recovery
//!
//! Nothing is retried inside the library. Every error reaches the caller
//! unchanged and the caller decides what to do next.
//!
//! | Error Type | Suggested handling |
//! |------------|--------------------|
//! | [`Error::Timeout`] | Retry the operation once the client is Ready again |
//! | [`Error::Bluetooth`] / [`Error::Transport`] | Reconnect, then retry |
//! | [`Error::HistoryIntegrity`] | Re-read the history; pages were lost in flight |
//! | [`Error::ExchangeInProgress`] | Wait for the running operation to finish |
//! | [`Error::UnsupportedDevice`] | Do not retry; the firmware is unknown |
//! | [`Error::InvalidUnit`] | Do not retry; fix the unit name |
//! | [`Error::InvalidConfig`] | Do not retry; fix the requested setting |
//! | [`Error::InvalidData`] | Do not retry; report the frame |
//!
//! Errors raised while disconnecting are logged and never returned.

use std::time::Duration;

use thiserror::Error;

use radoneye_types::ParseError;

use crate::client::ClientState;

/// Errors that can occur when communicating with RadonEye devices.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Bluetooth Low Energy error.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Transport failure reported by a non-BLE transport.
    #[error("Transport error: {0}")]
    Transport(String),

    /// No known RadonEye service was found on the connected device.
    #[error("Unsupported device: no known RadonEye service found")]
    UnsupportedDevice,

    /// Device not found during scan or connection.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Required BLE characteristic not found on device.
    #[error("Characteristic not found: {0}")]
    CharacteristicNotFound(String),

    /// Operation attempted while not connected to the device.
    #[error("Not connected to device (state: {0:?})")]
    NotConnected(ClientState),

    /// Another exchange is already running on this connection.
    #[error("Another exchange is already in progress")]
    ExchangeInProgress,

    /// An exchange did not complete before its deadline.
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The deadline that elapsed.
        duration: Duration,
    },

    /// The notification channel closed before the exchange completed.
    #[error("Subscription closed during '{0}'")]
    SubscriptionClosed(String),

    /// History pages were missing, duplicated or inconsistent.
    #[error("History integrity error: {0}")]
    HistoryIntegrity(String),

    /// A unit name or unit byte is not supported.
    #[error("Invalid unit: {0}")]
    InvalidUnit(String),

    /// Failed to parse data received from device.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A requested setting cannot be encoded for the device.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a history integrity error.
    pub fn integrity(message: impl Into<String>) -> Self {
        Self::HistoryIntegrity(message.into())
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::InvalidUnit(unit) => Error::InvalidUnit(unit),
            ParseError::InvalidData(msg) => Error::InvalidData(msg),
            other => Error::InvalidData(other.to_string()),
        }
    }
}

/// Result type alias using radoneye-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
