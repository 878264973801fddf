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


use std::fmt;

/// Where an actor is in its lifecycle.
///
/// ```text
/// Created -> Starting -> Started -> Restarting -> Started
///                           |
///                           +-> Stopped
/// any state except Dismissed -> Dismissed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Registered but not started; messages are buffered.
    Created,
    /// Start requested; messages are buffered until the behavior is running.
    Starting,
    /// Processing messages.
    Started,
    /// Between two incarnations of the behavior; messages are buffered.
    Restarting,
    /// Stopped by request; new messages are refused.
    Stopped,
    /// Gone for good.
    Dismissed,
}

impl State {
    /// Returns `true` if messages sent in this state are buffered for later.
    #[must_use]
    pub const fn buffers_messages(self) -> bool {
        matches!(self, Self::Created | Self::Starting | Self::Restarting)
    }

    /// Returns `true` if the actor no longer accepts messages.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Dismissed)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Starting => "starting",
            Self::Started => "started",
            Self::Restarting => "restarting",
            Self::Stopped => "stopped",
            Self::Dismissed => "dismissed",
        })
    }
}
