//! The contracts user code implements.
//!
//! *   [`Behavior`]: what an actor does with each message, plus start and stop hooks.
//! *   [`Role`]: how an actor is assembled: its behavior (fresh on every
//!     restart), executor, tracing span and inbox quota.
//! *   [`Script`]: a [`Role`] built from a closure.

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
pub use behavior::Behavior;
pub use role::{Role, Script};

// --- Submodules ---

/// Defines the [`Behavior`] trait.
mod behavior;
/// Defines the [`Role`] trait and [`Script`].
mod role;
