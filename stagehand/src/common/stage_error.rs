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


use thiserror::Error;

use crate::actor::ActorError;

/// Errors returned by [`Stage`](crate::prelude::Stage) operations.
#[derive(Debug, Error)]
pub enum StageError {
    /// An actor with this id is already registered.
    #[error("an actor named {0} already exists")]
    DuplicateId(String),

    /// No Tokio runtime is available to run the stage on.
    #[error("no tokio runtime available: {0}")]
    NoRuntime(String),

    /// The role could not provide what the actor needs.
    #[error("role failed to assemble the actor")]
    Role(#[source] anyhow::Error),

    /// An actor operation failed.
    #[error(transparent)]
    Actor(#[from] ActorError),

    /// Shutdown did not finish within the configured timeout.
    #[error("shutdown timed out")]
    ShutdownTimeout,
}
