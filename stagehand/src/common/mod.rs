//! The stage and the configuration it runs with.
//!
//! # Key Re-exported Components:
//!
//! *   [`Stage`]: owns actors by id, the default executor and the scheduler
//!     and priority decorators shared by its actors.
//! *   [`StageConfig`]: timeouts, inbox limits, restart limits and defaults,
//!     loaded from an XDG configuration file.
//! *   [`StageError`]: what stage operations can fail with.

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
pub use config::{DefaultsConfig, LimitsConfig, StageConfig, TimeoutConfig};
pub use stage::Stage;
pub use stage_error::StageError;

// --- Crate-Internal Re-exports ---
pub(crate) use stage::StageInner;

// --- Submodules ---

/// Defines the configuration system.
mod config;
/// Defines the [`Stage`] registry.
mod stage;
/// Defines [`StageError`].
mod stage_error;
