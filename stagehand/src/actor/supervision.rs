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


//! Supervision: handing failures to another actor instead of dying.
//!
//! A [`SupervisedBehavior`] wraps the behavior of an actor. While no
//! supervisor is registered it changes nothing and failures dismiss the actor
//! as usual. Once an actor has been registered with
//! [`RegisterSupervisor`] (see [`Actor::supervise`]), a failing message is
//! set aside and reported as a [`SupervisedFailure`]. Until the supervisor
//! answers with a matching [`SupervisedRecovery`], every other message is
//! held back. The answer decides what happens to the failed message, the
//! held-back backlog and the actor itself.
//!
//! | Recovery | Failed message | Backlog | Actor |
//! |---|---|---|---|
//! | [`Retry`](Recovery::Retry) | handled again, first | handled | kept |
//! | [`Resume`](Recovery::Resume) | bounced | handled | kept |
//! | [`RestartAndRetry`](Recovery::RestartAndRetry) | handled again, first | handled | restarted |
//! | [`RestartAndResume`](Recovery::RestartAndResume) | bounced | handled | restarted |
//! | [`Restart`](Recovery::Restart) | bounced | bounced | restarted |
//! | [`Dismiss`](Recovery::Dismiss) | bounced | bounced | dismissed |
//!
//! "Bounced" means returned as [`Bounced`] to senders that asked for a
//! receipt. [`SupervisedRole`] keeps the registration across restarts.
//!
//! ```rust,ignore
//! let worker = stage.actor("worker", SupervisedRole::new(worker_role))?;
//! worker.supervise(&overseer)?;
//!
//! // inside the overseer's behavior:
//! builder.on_message::<SupervisedFailure, _>(|failure, envelop, agent| {
//!     let decision = SupervisedRecovery {
//!         failure_id: failure.failure_id,
//!         recovery: Recovery::Retry,
//!     };
//!     agent.reply(envelop, decision)?;
//!     Ok(())
//! });
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn, Span};
use uuid::Uuid;

use crate::actor::{guarded, Actor, Agent};
use crate::executor::ExecutorRef;
use crate::message::{BounceReason, Bounced, Delivery, Envelop, Headers, Message, Receipt};
use crate::traits::{Behavior, Role};

/// Makes the carried actor the supervisor of the recipient.
#[derive(Debug, Clone)]
pub struct RegisterSupervisor(pub Actor);

/// Withdraws the recipient's supervisor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnregisterSupervisor;

/// Reports a failure to a supervisor.
#[derive(Debug, Clone)]
pub struct SupervisedFailure {
    /// Identifies this failure; the answer must quote it.
    pub failure_id: Uuid,
    /// The failed actor.
    pub actor_id: String,
    /// What went wrong.
    pub cause: Arc<anyhow::Error>,
}

/// A supervisor's decision about a reported failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisedRecovery {
    /// The failure being answered.
    pub failure_id: Uuid,
    /// What to do about it.
    pub recovery: Recovery,
}

/// How a supervised actor recovers from a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Recovery {
    /// Handle the failed message again, then the backlog.
    Retry,
    /// Give up on the failed message and handle the backlog.
    Resume,
    /// Restart, then handle the failed message and the backlog.
    RestartAndRetry,
    /// Restart, then handle the backlog.
    RestartAndResume,
    /// Give up on everything held back and restart.
    Restart,
    /// Give up on everything held back and dismiss the actor.
    Dismiss,
}

impl Recovery {
    const fn retries(self) -> bool {
        matches!(self, Self::Retry | Self::RestartAndRetry)
    }

    const fn keeps_backlog(self) -> bool {
        !matches!(self, Self::Restart | Self::Dismiss)
    }

    const fn restarts(self) -> bool {
        matches!(self, Self::RestartAndRetry | Self::RestartAndResume | Self::Restart)
    }
}

type SupervisorSlot = Arc<Mutex<Option<Actor>>>;

/// A failure cause that is still shared with an undelivered report.
#[derive(Debug)]
struct SharedCause(Arc<anyhow::Error>);

impl fmt::Display for SharedCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl std::error::Error for SharedCause {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

/// Takes a cause back from a report, keeping its source chain.
fn unshare(cause: Arc<anyhow::Error>) -> anyhow::Error {
    Arc::try_unwrap(cause).unwrap_or_else(|shared| anyhow::Error::new(SharedCause(shared)))
}

/// A failure reported and not yet answered.
struct Pending {
    failure_id: Uuid,
    /// Receipt id of the last [`SupervisedFailure`] sent.
    notice: Uuid,
    cause: Arc<anyhow::Error>,
    failed: Delivery,
    backlog: VecDeque<Delivery>,
}

/// Wraps a behavior so its failures go to a supervisor.
pub struct SupervisedBehavior {
    inner: Box<dyn Behavior>,
    supervisor: SupervisorSlot,
    pending: Option<Pending>,
    /// Receipt id of the last notice, kept until its receipt arrives.
    notice: Option<Uuid>,
}

impl SupervisedBehavior {
    /// Wraps `inner`; no supervisor is registered yet.
    #[must_use]
    pub fn new(inner: Box<dyn Behavior>) -> Self {
        Self::sharing(inner, SupervisorSlot::default())
    }

    fn sharing(inner: Box<dyn Behavior>, supervisor: SupervisorSlot) -> Self {
        Self {
            inner,
            supervisor,
            pending: None,
            notice: None,
        }
    }

    /// Returns the registered supervisor.
    #[must_use]
    pub fn supervisor(&self) -> Option<Actor> {
        self.supervisor.lock().clone()
    }

    /// Returns `true` while a failure waits for its recovery.
    #[must_use]
    pub const fn is_awaiting_recovery(&self) -> bool {
        self.pending.is_some()
    }

    fn register(&mut self, supervisor: Actor, agent: &Agent<'_>) -> anyhow::Result<()> {
        info!(actor = %agent.id(), supervisor = %supervisor.id(), "supervisor registered");
        *self.supervisor.lock() = Some(supervisor.clone());
        let Some(pending) = self.pending.as_mut() else {
            return Ok(());
        };
        let notice = Uuid::new_v4();
        let report = SupervisedFailure {
            failure_id: pending.failure_id,
            actor_id: agent.id().to_string(),
            cause: Arc::clone(&pending.cause),
        };
        agent.tell_with(&supervisor, Message::new(report), Headers::new().with_receipt_id(notice))?;
        pending.notice = notice;
        self.notice = Some(notice);
        Ok(())
    }

    fn unregister(&mut self, agent: &Agent<'_>) -> anyhow::Result<()> {
        *self.supervisor.lock() = None;
        info!(actor = %agent.id(), "supervisor withdrawn");
        match &self.pending {
            Some(pending) => Err(anyhow::anyhow!(
                "supervisor withdrawn before recovery: {:#}",
                pending.cause
            )),
            None => Ok(()),
        }
    }

    fn escalate(
        &mut self,
        cause: anyhow::Error,
        message: &Message,
        envelop: &Envelop,
        agent: &Agent<'_>,
    ) -> anyhow::Result<()> {
        let Some(supervisor) = self.supervisor() else {
            return Err(cause);
        };
        let failure_id = Uuid::new_v4();
        let notice = Uuid::new_v4();
        let cause = Arc::new(cause);
        let report = SupervisedFailure {
            failure_id,
            actor_id: agent.id().to_string(),
            cause: Arc::clone(&cause),
        };
        if let Err(refused) = agent.tell_with(&supervisor, Message::new(report), Headers::new().with_receipt_id(notice)) {
            warn!(actor = %agent.id(), supervisor = %supervisor.id(), "failure report refused: {refused}");
            return Err(unshare(cause));
        }
        warn!(actor = %agent.id(), %failure_id, "failure reported to {}: {cause:#}", supervisor.id());
        envelop.prevent_receipt();
        self.notice = Some(notice);
        self.pending = Some(Pending {
            failure_id,
            notice,
            cause,
            failed: Delivery::new(message.clone(), envelop.redeliver()),
            backlog: VecDeque::new(),
        });
        Ok(())
    }

    fn decide(
        &mut self,
        decision: SupervisedRecovery,
        envelop: &Envelop,
        message: &Message,
        agent: &mut Agent<'_>,
    ) -> anyhow::Result<()> {
        let from_supervisor = match (envelop.sender(), self.supervisor()) {
            (Some(sender), Some(supervisor)) => *sender == supervisor,
            _ => false,
        };
        let expected = self.pending.as_ref().map(|pending| pending.failure_id);
        if !from_supervisor || expected != Some(decision.failure_id) {
            envelop.prevent_receipt();
            agent.bounce(
                message,
                envelop,
                BounceReason::Rejected(format!("no pending failure {} from this sender", decision.failure_id)),
            );
            return Ok(());
        }
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        info!(actor = %agent.id(), failure_id = %decision.failure_id, recovery = ?decision.recovery, "recovering");
        let recovery = decision.recovery;
        let Pending {
            cause,
            failed,
            backlog,
            ..
        } = pending;
        if recovery.retries() {
            agent.redeliver(std::iter::once(failed));
        } else {
            agent.bounce(&failed.message, &failed.envelop, BounceReason::Failed(format!("{cause:#}")));
        }
        if recovery.keeps_backlog() {
            agent.redeliver(backlog);
        } else {
            let reason = BounceReason::Rejected(format!("discarded by {recovery:?}"));
            for held in &backlog {
                agent.bounce(&held.message, &held.envelop, reason.clone());
            }
        }
        if recovery.restarts() {
            agent.restart();
        } else if recovery == Recovery::Dismiss {
            agent.dismiss();
        }
        Ok(())
    }

    fn hold(&mut self, message: &Message, envelop: &Envelop) -> anyhow::Result<()> {
        let Some(pending) = self.pending.as_mut() else {
            return Ok(());
        };
        if let Some(bounced) = message.downcast_ref::<Bounced>() {
            if bounced.receipt_id == pending.notice {
                return Err(anyhow::anyhow!(
                    "supervisor unreachable ({}): {:#}",
                    bounced.reason,
                    pending.cause
                ));
            }
        }
        envelop.prevent_receipt();
        pending.backlog.push_back(Delivery::new(message.clone(), envelop.redeliver()));
        Ok(())
    }
}

impl Behavior for SupervisedBehavior {
    fn on_start(&mut self, agent: &mut Agent<'_>) -> anyhow::Result<()> {
        guarded(|| self.inner.on_start(agent))
    }

    fn on_message(&mut self, message: &Message, envelop: &Envelop, agent: &mut Agent<'_>) -> anyhow::Result<()> {
        if let Some(RegisterSupervisor(supervisor)) = message.downcast_ref::<RegisterSupervisor>() {
            return self.register(supervisor.clone(), agent);
        }
        if message.is::<UnregisterSupervisor>() {
            return self.unregister(agent);
        }
        if let Some(decision) = message.downcast_ref::<SupervisedRecovery>() {
            return self.decide(*decision, envelop, message, agent);
        }
        if let Some(receipt) = message.downcast_ref::<Receipt>() {
            if self.notice == Some(receipt.receipt_id) {
                self.notice = None;
                return Ok(());
            }
        }
        if self.pending.is_some() {
            return self.hold(message, envelop);
        }
        match guarded(|| self.inner.on_message(message, envelop, agent)) {
            Ok(()) => Ok(()),
            Err(cause) => self.escalate(cause, message, envelop, agent),
        }
    }

    fn on_stop(&mut self, agent: &mut Agent<'_>) -> anyhow::Result<()> {
        if let Some(pending) = self.pending.take() {
            let reason = BounceReason::Failed(format!("{:#}", pending.cause));
            agent.bounce(&pending.failed.message, &pending.failed.envelop, reason);
            for held in &pending.backlog {
                agent.bounce(&held.message, &held.envelop, BounceReason::Stopped);
            }
        }
        guarded(|| self.inner.on_stop(agent))
    }
}

impl fmt::Debug for SupervisedBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupervisedBehavior")
            .field("supervisor", &self.supervisor.try_lock().map(|slot| (*slot).clone()))
            .field("awaiting_recovery", &self.pending.is_some())
            .finish_non_exhaustive()
    }
}

/// Wraps a role so every behavior it creates is supervised.
///
/// The supervisor registration is shared by all incarnations of the actor,
/// so it survives restarts.
pub struct SupervisedRole<R> {
    inner: R,
    supervisor: SupervisorSlot,
}

impl<R: Role> SupervisedRole<R> {
    /// Wraps `inner` with no supervisor registered.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            supervisor: SupervisorSlot::default(),
        }
    }

    /// Registers `supervisor` from the start.
    #[must_use]
    pub fn with_supervisor(self, supervisor: Actor) -> Self {
        *self.supervisor.lock() = Some(supervisor);
        self
    }
}

impl<R: Role> Role for SupervisedRole<R> {
    fn behavior(&self, id: &str) -> anyhow::Result<Box<dyn Behavior>> {
        let inner = self.inner.behavior(id)?;
        Ok(Box::new(SupervisedBehavior::sharing(inner, Arc::clone(&self.supervisor))))
    }

    fn executor(&self, id: &str) -> anyhow::Result<Option<ExecutorRef>> {
        self.inner.executor(id)
    }

    fn span(&self, id: &str) -> Span {
        self.inner.span(id)
    }

    fn quota(&self, id: &str) -> Option<usize> {
        self.inner.quota(id)
    }
}

impl<R> fmt::Debug for SupervisedRole<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupervisedRole").finish_non_exhaustive()
    }
}
