/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */


use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::actor::RestartLimiterConfig;

/// Configuration of a [`Stage`](crate::prelude::Stage).
///
/// Loaded from `config.toml` in the `stagehand` XDG configuration directory.
/// Every field has a default, so a file only needs the values it changes:
///
/// ```toml
/// [timeouts]
/// shutdown_timeout_ms = 2000
///
/// [limits]
/// inbox_quota = 10000
///
/// [restart]
/// max_restarts = 3
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Timeout configuration
    pub timeouts: TimeoutConfig,
    /// Limits and capacity configuration
    pub limits: LimitsConfig,
    /// Restart limits applied to every actor
    pub restart: RestartLimiterConfig,
    /// Default values configuration
    pub defaults: DefaultsConfig,
}

/// Timeout-related configuration values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// How long [`Stage::shutdown`](crate::prelude::Stage::shutdown) waits, in milliseconds
    pub shutdown_timeout_ms: u64,
}

/// Limits and capacity configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Unprocessed messages an actor may hold unless its role says otherwise;
    /// unlimited when absent
    pub inbox_quota: Option<usize>,
}

/// Default configuration values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Priority of views created by [`Stage::prioritized`](crate::prelude::Stage::prioritized)
    pub priority: i64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_ms: 10_000,
        }
    }
}

impl StageConfig {
    /// Convert the shutdown timeout to a Duration
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.shutdown_timeout_ms)
    }

    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns the parser's error for malformed input.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load configuration from XDG-compliant locations
    ///
    /// Looks for `stagehand/config.toml` under `$XDG_CONFIG_HOME` and then
    /// the XDG system directories. A missing file yields the defaults; a file
    /// that cannot be read or parsed is logged and also yields the defaults.
    #[must_use]
    pub fn load() -> Self {
        let xdg_dirs = match xdg::BaseDirectories::with_prefix("stagehand") {
            Ok(dirs) => dirs,
            Err(e) => {
                error!("Failed to initialize XDG directories: {}", e);
                return Self::default();
            }
        };
        match xdg_dirs.find_config_file("config.toml") {
            Some(path) => Self::load_from(&path),
            None => {
                info!("No configuration file found, using defaults");
                Self::default()
            }
        }
    }

    /// Loads a configuration file, falling back to the defaults on any error.
    #[must_use]
    pub fn load_from(path: &Path) -> Self {
        info!("Loading configuration from: {}", path.display());
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to read configuration file {}: {}", path.display(), e);
                return Self::default();
            }
        };
        match Self::from_toml_str(&text) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to parse configuration file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}
