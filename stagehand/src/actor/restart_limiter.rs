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


//! Restart accounting for actors.
//!
//! Every restart is recorded in a sliding window. Once the window holds
//! `max_restarts` entries, further restarts are refused and the actor is
//! dismissed instead. Consecutive restarts wait for an exponentially growing
//! backoff before the new behavior is started.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Limits and backoff applied to actor restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestartLimiterConfig {
    /// When `false`, restarts are never refused and never delayed.
    pub enabled: bool,
    /// Restarts allowed inside one window.
    pub max_restarts: u32,
    /// Length of the sliding window, in seconds.
    pub window_secs: u64,
    /// Delay before the first restart, in milliseconds.
    pub initial_backoff_ms: u64,
    /// Upper bound for the delay, in milliseconds.
    pub max_backoff_ms: u64,
    /// Growth factor of the delay between consecutive restarts.
    pub backoff_multiplier: f64,
}

impl Default for RestartLimiterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_restarts: 5,
            window_secs: 60,
            initial_backoff_ms: 100,
            max_backoff_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RestartLimiterConfig {
    /// Unlimited, immediate restarts.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            max_restarts: 0,
            window_secs: 0,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
            backoff_multiplier: 1.0,
        }
    }

    /// The sliding window.
    #[must_use]
    pub const fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// The delay after `consecutive` earlier restarts, capped at the maximum.
    #[must_use]
    pub fn backoff_after(&self, consecutive: usize) -> Duration {
        if !self.enabled || self.initial_backoff_ms == 0 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(consecutive).unwrap_or(i32::MAX);
        #[allow(clippy::cast_precision_loss)]
        let millis = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(exponent);
        #[allow(clippy::cast_precision_loss)]
        let ceiling = self.max_backoff_ms as f64;
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let capped = millis.clamp(0.0, ceiling) as u64;
        Duration::from_millis(capped)
    }
}

/// Refusal to restart an actor that restarted too often.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("restart limit exceeded: {attempts} restarts in the last {window_secs}s (max {max_restarts})")]
pub struct RestartLimitExceeded {
    /// Restarts currently inside the window.
    pub attempts: usize,
    /// The configured limit.
    pub max_restarts: u32,
    /// The window length in seconds.
    pub window_secs: u64,
}

/// A snapshot of a [`RestartLimiter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartStats {
    /// Restarts inside the window.
    pub restarts_in_window: usize,
    /// Restarts since the last reset, which drive the backoff.
    pub consecutive_restarts: usize,
    /// The configured limit.
    pub max_restarts: u32,
}

/// Sliding-window restart counter with exponential backoff.
#[derive(Debug, Default)]
pub struct RestartLimiter {
    config: RestartLimiterConfig,
    recent: VecDeque<Instant>,
    consecutive: usize,
}

impl RestartLimiter {
    /// Creates a limiter with no recorded restarts.
    #[must_use]
    pub const fn new(config: RestartLimiterConfig) -> Self {
        Self {
            config,
            recent: VecDeque::new(),
            consecutive: 0,
        }
    }

    /// Checks whether one more restart fits into the window.
    ///
    /// # Errors
    ///
    /// Returns [`RestartLimitExceeded`] once the window is full.
    pub fn can_restart(&mut self) -> Result<(), RestartLimitExceeded> {
        if !self.config.enabled {
            return Ok(());
        }
        let window = self.config.window();
        let now = Instant::now();
        while self
            .recent
            .front()
            .is_some_and(|at| now.duration_since(*at) >= window)
        {
            self.recent.pop_front();
        }
        if self.recent.len() >= self.config.max_restarts as usize {
            return Err(RestartLimitExceeded {
                attempts: self.recent.len(),
                max_restarts: self.config.max_restarts,
                window_secs: self.config.window_secs,
            });
        }
        Ok(())
    }

    /// Records a restart and returns how long to wait before it happens.
    pub fn record_restart(&mut self) -> Duration {
        let backoff = self.config.backoff_after(self.consecutive);
        self.recent.push_back(Instant::now());
        self.consecutive += 1;
        backoff
    }

    /// Returns the backoff the next restart would get.
    #[must_use]
    pub fn peek_backoff(&self) -> Duration {
        self.config.backoff_after(self.consecutive)
    }

    /// Restarts the backoff sequence; the window is left alone.
    pub fn reset_consecutive(&mut self) {
        self.consecutive = 0;
    }

    /// Returns the current counters.
    #[must_use]
    pub fn stats(&self) -> RestartStats {
        RestartStats {
            restarts_in_window: self.recent.len(),
            consecutive_restarts: self.consecutive,
            max_restarts: self.config.max_restarts,
        }
    }
}
