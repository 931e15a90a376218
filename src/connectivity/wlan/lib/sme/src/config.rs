// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{error::Error, ie::policy::SecurityPolicy},
    anyhow::Context as _,
    serde::Deserialize,
    std::{path::Path, time::Duration},
};

/// Tunables of the station SME. Missing fields take their default value.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SmeConfig {
    /// Capacity of the process table shared by all state machines.
    pub max_instances: usize,
    /// Join attempts while the AP refuses the offered AKM.
    pub join_attempts: u8,
    /// Authentication attempts per authentication algorithm.
    pub auth_attempts: u8,
    pub assoc_attempts: u8,
    /// Fall back from open system to shared key authentication once open system attempts are
    /// exhausted.
    pub allow_shared_key_fallback: bool,
    /// Skip the deauthenticate and radio reset round trips when tearing a connection down.
    pub skip_reset: bool,
    pub mic_failure_window_secs: u64,
    pub countermeasures_blacklist_secs: u64,
    pub key_handshake_timeout_secs: u64,
    pub wps_walk_time_secs: u64,
    /// Firmware timeouts handed down with the scan, join, authenticate and associate requests,
    /// in time units of 1024 us.
    pub probe_timeout_tu: u32,
    pub join_failure_timeout_tu: u32,
    pub auth_failure_timeout_tu: u32,
    pub assoc_failure_timeout_tu: u32,
    pub security: SecurityPolicy,
}

impl Default for SmeConfig {
    fn default() -> Self {
        Self {
            max_instances: 16,
            join_attempts: 3,
            auth_attempts: 3,
            assoc_attempts: 3,
            allow_shared_key_fallback: false,
            skip_reset: false,
            mic_failure_window_secs: 60,
            countermeasures_blacklist_secs: 60,
            key_handshake_timeout_secs: 10,
            wps_walk_time_secs: 120,
            probe_timeout_tu: 100,
            join_failure_timeout_tu: 2000,
            auth_failure_timeout_tu: 2000,
            assoc_failure_timeout_tu: 2000,
            security: SecurityPolicy::default(),
        }
    }
}

impl SmeConfig {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: SmeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read SME config {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("bad SME config {}", path.display()))
    }

    pub fn validate(&self) -> Result<(), Error> {
        // Selector, connection manager, security manager and WPS may all be alive at once.
        if self.max_instances < 4 {
            return Err(Error::InvalidConfig(format!(
                "max_instances must be at least 4, got {}",
                self.max_instances
            )));
        }
        if self.join_attempts == 0 || self.auth_attempts == 0 || self.assoc_attempts == 0 {
            return Err(Error::InvalidConfig("attempt limits must be non-zero".to_string()));
        }
        let timeouts = [
            self.probe_timeout_tu,
            self.join_failure_timeout_tu,
            self.auth_failure_timeout_tu,
            self.assoc_failure_timeout_tu,
        ];
        if timeouts.contains(&0) {
            return Err(Error::InvalidConfig("firmware timeouts must be non-zero".to_string()));
        }
        if self.security.pairwise_ciphers.is_empty() || self.security.akms.is_empty() {
            return Err(Error::InvalidConfig("security policy allows no suite".to_string()));
        }
        Ok(())
    }

    pub fn mic_failure_window(&self) -> Duration {
        Duration::from_secs(self.mic_failure_window_secs)
    }

    pub fn countermeasures_blacklist(&self) -> Duration {
        Duration::from_secs(self.countermeasures_blacklist_secs)
    }

    pub fn key_handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.key_handshake_timeout_secs)
    }

    pub fn wps_walk_time(&self) -> Duration {
        Duration::from_secs(self.wps_walk_time_secs)
    }
}
