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

use crate::actor::State;
use crate::executor::ExecutorError;

/// Errors returned by [`Actor`](crate::actor::Actor) operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActorError {
    /// The operation is not allowed in the actor's current state.
    #[error("actor {id} cannot {operation} while {state}")]
    IllegalState {
        /// The actor.
        id: String,
        /// Its state when the operation was attempted.
        state: State,
        /// What was attempted.
        operation: &'static str,
    },

    /// The actor already holds as many unprocessed messages as it may.
    #[error("actor {id} already holds {quota} unprocessed messages")]
    QuotaExceeded {
        /// The actor.
        id: String,
        /// Its inbox quota.
        quota: usize,
    },

    /// The actor's executor refused its work.
    #[error("actor {id} could not queue work")]
    Rejected {
        /// The actor.
        id: String,
        /// Why the executor refused.
        #[source]
        source: ExecutorError,
    },
}
