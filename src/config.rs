//! Typed configuration surface for a [`crate::Host`] (spec.md §6.2).
//!
//! The core never reads a config file or parses CLI flags itself — an
//! embedding application builds a [`HostConfig`] however it likes (flags,
//! file, hardcoded) and hands it to [`crate::Host::start`].

use std::time::Duration;

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::error::HostConfigError;

/// BLE heartbeat interval (spec.md §5).
pub const BLE_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(500);

/// BLE inbound-silence timeout before the session is considered dead (spec.md §5).
pub const BLE_LIVENESS_TIMEOUT: Duration = Duration::from_secs(3);

/// UDP discovery beacon broadcast interval (spec.md §4.3).
pub const BEACON_INTERVAL: Duration = Duration::from_millis(500);

/// Bad-auth-code lockout window (spec.md §4.7).
pub const LOCKOUT_WINDOW: Duration = Duration::from_secs(60);

/// Bad-auth-code strikes before lockout (spec.md §4.7).
pub const LOCKOUT_STRIKES: u32 = 3;

/// Application-facing configuration for one [`crate::Host`] instance.
///
/// [`HostConfig::validate`] is checked by [`crate::Host::start`] before any
/// socket is touched, matching the teacher's fixture-validation style:
/// invalid values are rejected up front, never discovered mid-session.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(on(String, into))]
pub struct HostConfig {
    /// 6-byte `[A-Z0-9]` shared secret (spec.md §3 HELLO).
    auth_code: String,
    /// 1..=20 byte UTF-8 name advertised in the discovery beacon.
    service_name: String,
    /// TCP port the listener binds (spec.md §4.6).
    #[builder(default = 50000)]
    tcp_port: u16,
    /// UDP port the discovery beacon targets (spec.md §4.3).
    #[builder(default = 50001)]
    beacon_port: u16,
    /// Opaque bytes sent to the mobile peer as the initial `CONFIG` message
    /// once a session reaches `Connected` (spec.md §4.7).
    #[builder(default = Vec::new())]
    initial_config_payload: Vec<u8>,
    /// BLE heartbeat interval override, defaulting to [`BLE_HEARTBEAT_INTERVAL`].
    #[builder(default = BLE_HEARTBEAT_INTERVAL)]
    ble_heartbeat_interval: Duration,
    /// BLE liveness timeout override, defaulting to [`BLE_LIVENESS_TIMEOUT`].
    #[builder(default = BLE_LIVENESS_TIMEOUT)]
    ble_liveness_timeout: Duration,
    /// Beacon broadcast interval override, defaulting to [`BEACON_INTERVAL`].
    #[builder(default = BEACON_INTERVAL)]
    beacon_interval: Duration,
}

impl HostConfig {
    /// Returns the configured auth code.
    #[must_use]
    pub fn auth_code(&self) -> &str {
        &self.auth_code
    }

    /// Returns the configured service name.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Returns the configured TCP listener port.
    #[must_use]
    pub fn tcp_port(&self) -> u16 {
        self.tcp_port
    }

    /// Returns the configured UDP beacon port.
    #[must_use]
    pub fn beacon_port(&self) -> u16 {
        self.beacon_port
    }

    /// Returns the payload sent as the session's initial `CONFIG` message.
    #[must_use]
    pub fn initial_config_payload(&self) -> &[u8] {
        &self.initial_config_payload
    }

    /// Returns the BLE heartbeat interval.
    #[must_use]
    pub fn ble_heartbeat_interval(&self) -> Duration {
        self.ble_heartbeat_interval
    }

    /// Returns the BLE liveness timeout.
    #[must_use]
    pub fn ble_liveness_timeout(&self) -> Duration {
        self.ble_liveness_timeout
    }

    /// Returns the beacon broadcast interval.
    #[must_use]
    pub fn beacon_interval(&self) -> Duration {
        self.beacon_interval
    }

    /// Validates the auth code and service name, per spec.md §3/§6.2.
    ///
    /// # Errors
    ///
    /// Returns [`HostConfigError::InvalidAuthCode`] or
    /// [`HostConfigError::InvalidServiceNameLength`].
    pub fn validate(&self) -> Result<(), HostConfigError> {
        let is_valid_auth_code = self.auth_code.len() == 6
            && self
                .auth_code
                .bytes()
                .all(|byte| byte.is_ascii_uppercase() || byte.is_ascii_digit());
        if !is_valid_auth_code {
            return Err(HostConfigError::InvalidAuthCode {
                value: self.auth_code.clone(),
            });
        }
        let name_len = self.service_name.as_bytes().len();
        if name_len == 0 || name_len > 20 {
            return Err(HostConfigError::InvalidServiceNameLength { len: name_len });
        }
        Ok(())
    }
}
