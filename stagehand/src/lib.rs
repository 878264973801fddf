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


#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Stagehand
//!
//! An actor runtime on top of Tokio. Actors are isolated units of sequential
//! computation that only talk through asynchronous messages. Each actor runs
//! a user-supplied behavior on a pluggable executor, and never handles two
//! messages at the same time.
//!
//! ## Key Concepts
//!
//! - **Executors**: everything runs as a task on an [`Executor`](prelude::Executor).
//!   Decorators add bounded concurrency ([`ThrottledExecutor`](prelude::ThrottledExecutor)),
//!   aging priorities ([`PriorityExecutor`](prelude::PriorityExecutor)), deadlines
//!   ([`TimeoutExecutor`](prelude::TimeoutExecutor)) and timers
//!   ([`ScheduledExecutor`](prelude::ScheduledExecutor)).
//! - **Mailboxes**: a throttled executor with a concurrency of one per actor.
//! - **Behaviors**: what an actor does with a message, usually assembled from
//!   pattern-matching handlers with [`BehaviorBuilder`](prelude::BehaviorBuilder).
//! - **Lifecycle**: actors are created, started, restarted, stopped and
//!   dismissed; messages arriving while an actor cannot handle them are kept
//!   and replayed in order.
//! - **Supervision**: failures can be reported to a supervisor actor, which
//!   decides how the failed actor recovers.
//! - **Stage**: owns actors by id and the executors they share.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stagehand::prelude::*;
//!
//! let stage = Stage::launch()?;
//! let counter = stage.actor("counter", Script::new(|_| {
//!     let mut total = 0_u64;
//!     Ok(BehaviorBuilder::new()
//!         .on_message::<u64, _>(move |n, _, _| {
//!             total += n;
//!             Ok(())
//!         })
//!         .build()?)
//! }))?;
//! counter.tell(5_u64)?;
//! stage.shutdown().await?;
//! ```

/// Defines actors, their lifecycle and supervision.
pub(crate) mod actor;

/// Defines the behavior builder and its dispatch engine.
pub(crate) mod behavior;

/// Defines the stage and its configuration.
pub(crate) mod common;

/// Defines executors and their decorators.
pub(crate) mod executor;

/// Defines messages, envelops and runtime notifications.
pub(crate) mod message;

/// Defines the traits user code implements.
pub(crate) mod traits;

/// A prelude module for conveniently importing the most commonly used items.
///
/// ## Runtime
/// *   [`Stage`](crate::common::Stage), [`StageConfig`](crate::common::StageConfig)
///     and [`StageError`](crate::common::StageError).
///
/// ## Actors
/// *   [`Actor`](crate::actor::Actor), [`Agent`](crate::actor::Agent),
///     [`State`](crate::actor::State), [`Conversation`](crate::actor::Conversation)
///     and the supervision messages.
///
/// ## Behaviors
/// *   [`Behavior`](crate::traits::Behavior), [`Role`](crate::traits::Role),
///     [`Script`](crate::traits::Script) and [`BehaviorBuilder`](crate::behavior::BehaviorBuilder).
///
/// ## Messages
/// *   [`Message`](crate::message::Message), [`Envelop`](crate::message::Envelop),
///     [`Headers`](crate::message::Headers) and the runtime notifications.
///
/// ## Executors
/// *   The [`Executor`](crate::executor::Executor) trait, its extension
///     [`ExecutorExt`](crate::executor::ExecutorExt) and every decorator.
pub mod prelude {
    pub use crate::actor::{
        Actor, ActorError, Agent, Conversation, Mailbox, MessageFilter, Recovery, RegisterSupervisor,
        RestartLimitExceeded, RestartLimiter, RestartLimiterConfig, RestartStats, State,
        SupervisedBehavior, SupervisedFailure, SupervisedRecovery, SupervisedRole, UnregisterSupervisor,
    };
    pub use crate::behavior::{BehaviorBuilder, BehaviorError, LifecycleHandler, MessageHandler, MessageMatcher};
    pub use crate::common::{DefaultsConfig, LimitsConfig, Stage, StageConfig, StageError, TimeoutConfig};
    pub use crate::executor::{
        executor_identity, DecoratorCache, Executor, ExecutorError, ExecutorExt, ExecutorRef, Period,
        PriorityExecutor, PriorityRegistry, ScheduledExecutor, ScheduledFuture, Task, TaskError, TaskFuture,
        ThrottledExecutor, TimeoutExecutor, TokioExecutor,
    };
    pub use crate::message::{
        BounceReason, Bounced, DeadLetter, Delivery, Envelop, Headers, Message, MessageType, Receipt,
    };
    pub use crate::traits::{Behavior, Role, Script};
}
