//! Actors: handles, lifecycle and the context passed to behaviors.
//!
//! An [`Actor`] is a cheap, cloneable handle to a runtime cell owned by a
//! [`Stage`](crate::prelude::Stage). Messages told to an actor are queued on
//! its [`Mailbox`], which runs one task at a time on the actor's executor, so
//! a behavior never sees two messages at once.
//!
//! The lifecycle is a small state machine (see [`State`]). Starting and
//! restarting acquire a fresh behavior from the actor's
//! [`Role`](crate::prelude::Role); messages that arrive in the meantime wait
//! in a delayed queue and are replayed in arrival order. Restarts are counted
//! by a [`RestartLimiter`]. Failures are either fatal for the actor or, with
//! the supervision types of this module, reported to a supervisor actor that
//! decides on a [`Recovery`].

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


use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::executor::panic_message;

// --- Public Re-exports ---
pub use actor_error::ActorError;
pub use agent::Agent;
pub use conversation::{Conversation, MessageFilter};
pub use handle::Actor;
pub use mailbox::Mailbox;
pub use restart_limiter::{RestartLimitExceeded, RestartLimiter, RestartLimiterConfig, RestartStats};
pub use state::State;
pub use supervision::{
    Recovery, RegisterSupervisor, SupervisedBehavior, SupervisedFailure, SupervisedRecovery,
    SupervisedRole, UnregisterSupervisor,
};

pub(crate) use agent::{Effects, Transition};
pub(crate) use cell::ActorCell;

// --- Submodules ---

/// Defines the errors returned by actor operations.
mod actor_error;
/// Defines the per-callback [`Agent`].
mod agent;
/// Defines the runtime cell behind every handle.
mod cell;
/// Defines threaded conversations with an actor.
mod conversation;
/// Defines the public [`Actor`] handle.
mod handle;
/// Implements delivery, dispatch and the lifecycle transitions.
mod lifecycle;
/// Defines the sequential task queue of an actor.
mod mailbox;
/// Defines restart accounting.
mod restart_limiter;
/// Defines the lifecycle states.
mod state;
/// Defines the supervision overlay.
mod supervision;

/// Runs a user callback, turning a panic into an error.
pub(crate) fn guarded<T>(callback: impl FnOnce() -> anyhow::Result<T>) -> anyhow::Result<T> {
    catch_unwind(AssertUnwindSafe(callback)).unwrap_or_else(|payload| {
        Err(anyhow::anyhow!("panicked: {}", panic_message(&*payload)))
    })
}
