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


use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::Span;

use crate::actor::{Actor, Mailbox, RestartLimiter, State};
use crate::common::StageInner;
use crate::executor::{ExecutorRef, ScheduledExecutor};
use crate::message::Delivery;
use crate::traits::{Behavior, Role};

/// The runtime state behind every [`Actor`] handle.
pub(crate) struct ActorCell {
    pub(crate) id: String,
    pub(crate) role: Arc<dyn Role>,
    pub(crate) stage: Weak<StageInner>,
    pub(crate) executor: ExecutorRef,
    pub(crate) scheduler: Arc<ScheduledExecutor>,
    pub(crate) mailbox: Mailbox,
    pub(crate) span: Span,
    pub(crate) quota: usize,
    /// Messages accepted but not yet handled, including delayed ones.
    pub(crate) inbox: AtomicUsize,
    pub(crate) core: Mutex<Core>,
    pub(crate) restarts: Mutex<RestartLimiter>,
}

/// Everything guarded by the cell lock.
///
/// The behavior is moved out while one of its callbacks runs, so the lock is
/// never held across user code.
pub(crate) struct Core {
    pub(crate) state: State,
    pub(crate) behavior: Option<Box<dyn Behavior>>,
    pub(crate) delayed: VecDeque<Delivery>,
    /// A replay task is queued at the head of the mailbox.
    pub(crate) replaying: bool,
    pub(crate) finalized: bool,
    /// Told a [`DeadLetter`](crate::message::DeadLetter) on finalization.
    pub(crate) observers: Vec<Actor>,
    /// Why the actor was dismissed, once it is finalized.
    pub(crate) cause: Option<String>,
}

impl ActorCell {
    /// Builds a cell in [`State::Created`], resolving executor, span and
    /// quota through the role.
    pub(crate) fn new(id: String, role: Arc<dyn Role>, stage: &Arc<StageInner>) -> anyhow::Result<Self> {
        let executor = role.executor(&id)?.unwrap_or_else(|| stage.default_executor());
        let scheduler = stage.scheduler_for(&executor);
        let span = role.span(&id);
        let quota = role
            .quota(&id)
            .or(stage.config.limits.inbox_quota)
            .unwrap_or(usize::MAX);
        Ok(Self {
            mailbox: Mailbox::new(Arc::clone(&executor)),
            restarts: Mutex::new(RestartLimiter::new(stage.config.restart.clone())),
            stage: Arc::downgrade(stage),
            inbox: AtomicUsize::new(0),
            core: Mutex::new(Core {
                state: State::Created,
                behavior: None,
                delayed: VecDeque::new(),
                replaying: false,
                finalized: false,
                observers: Vec::new(),
                cause: None,
            }),
            id,
            role,
            executor,
            scheduler,
            span,
            quota,
        })
    }
}

impl fmt::Debug for ActorCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorCell")
            .field("id", &self.id)
            .field("quota", &self.quota)
            .field("mailbox", &self.mailbox)
            .finish_non_exhaustive()
    }
}
