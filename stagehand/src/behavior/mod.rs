//! Pattern-matching behaviors.
//!
//! [`BehaviorBuilder`] registers handlers against [`MessageMatcher`]s and
//! assembles them into a [`Behavior`](crate::traits::Behavior). When a message
//! arrives, every matcher is tried in registration order and every handler
//! whose matcher accepts the message runs. Fallbacks registered with
//! [`on_no_match`](BehaviorBuilder::on_no_match) run only when nothing
//! matched. The assembled dispatch collapses to the cheapest form that
//! preserves these rules.

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


// --- Public Re-exports ---
pub use behavior_error::BehaviorError;
pub use builder::{BehaviorBuilder, LifecycleHandler, MessageHandler};
pub use matcher::MessageMatcher;

// --- Submodules ---

/// Defines [`BehaviorError`].
mod behavior_error;
/// Defines [`BehaviorBuilder`].
mod builder;
/// Defines the assembled dispatch and its collapse rules.
mod dispatch;
/// Defines [`MessageMatcher`] and the built-in matchers.
mod matcher;
