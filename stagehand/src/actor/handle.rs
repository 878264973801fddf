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


use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{instrument, trace};

use crate::actor::{ActorCell, ActorError, Conversation, MessageFilter, RegisterSupervisor, State, UnregisterSupervisor};
use crate::executor::ExecutorRef;
use crate::message::{DeadLetter, Delivery, Envelop, Headers, Message};

/// A handle to an actor.
///
/// Handles are cheap to clone and compare equal when they refer to the same
/// actor. Everything an outsider can do with an actor goes through a handle:
/// telling it messages and driving its lifecycle.
///
/// ```rust,ignore
/// let greeter = stage.actor("greeter", role)?;
/// greeter.tell(String::from("hello"))?;
/// greeter.tell_with(
///     Message::new(String::from("hello again")),
///     Headers::new().with_receipt(),
///     Some(me.clone()),
/// )?;
/// ```
#[derive(Clone)]
pub struct Actor {
    pub(crate) cell: Arc<ActorCell>,
}

impl Actor {
    pub(crate) const fn from_cell(cell: Arc<ActorCell>) -> Self {
        Self { cell }
    }

    /// Returns the actor's id, unique within its stage.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.cell.id
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> State {
        self.cell.core.lock().state
    }

    /// Returns the number of tasks waiting in the mailbox.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.cell.mailbox.queued()
    }

    /// Returns the number of accepted messages not yet handled.
    #[must_use]
    pub fn unprocessed(&self) -> usize {
        self.cell.inbox.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Returns the executor the actor runs on.
    #[must_use]
    pub fn executor(&self) -> &ExecutorRef {
        &self.cell.executor
    }

    /// Tells the actor a message with no sender and default headers.
    ///
    /// # Errors
    ///
    /// Fails with [`ActorError::IllegalState`] once the actor is stopped or
    /// dismissed and with [`ActorError::QuotaExceeded`] when its inbox is full.
    pub fn tell<T: Any + Send + Sync>(&self, message: T) -> Result<(), ActorError> {
        self.tell_with(Message::new(message), Headers::new(), None)
    }

    /// Tells the actor a message with explicit headers and sender.
    ///
    /// If the message cannot be accepted and the headers request a receipt,
    /// the sender also receives a [`Bounced`](crate::message::Bounced).
    ///
    /// # Errors
    ///
    /// See [`tell`](Actor::tell).
    pub fn tell_with(&self, message: Message, headers: Headers, sender: Option<Actor>) -> Result<(), ActorError> {
        self.post(Delivery::new(message, Envelop::new(sender, headers)))
    }

    /// Tells several messages in order, sharing headers and sender.
    ///
    /// Stops at the first refusal.
    ///
    /// # Errors
    ///
    /// See [`tell`](Actor::tell).
    pub fn tell_all<I>(&self, messages: I, headers: &Headers, sender: Option<&Actor>) -> Result<(), ActorError>
    where
        I: IntoIterator<Item = Message>,
    {
        messages
            .into_iter()
            .try_for_each(|message| self.tell_with(message, headers.clone(), sender.cloned()))
    }

    /// Passes on a message received elsewhere.
    ///
    /// The thread id and the apparent send time of `envelop` are kept; any
    /// receipt request is not.
    ///
    /// # Errors
    ///
    /// See [`tell`](Actor::tell).
    pub fn forward(&self, message: Message, envelop: &Envelop, sender: Option<Actor>) -> Result<(), ActorError> {
        let age = SystemTime::now()
            .duration_since(envelop.sent_at())
            .unwrap_or_default();
        let headers = envelop.headers().thread_only().with_offset(age);
        self.tell_with(message, headers, sender)
    }

    /// Opens a conversation: every message told through it carries `thread_id`
    /// and passes through `filters` first.
    #[must_use]
    pub fn thread(&self, thread_id: impl Into<Arc<str>>, filters: Vec<MessageFilter>, sender: Option<Actor>) -> Conversation {
        Conversation::new(self.clone(), Headers::new().with_thread_id(thread_id), filters, sender)
    }

    /// Starts a created actor.
    ///
    /// Messages told before or during the start are handled once the
    /// behavior's `on_start` has run.
    ///
    /// # Errors
    ///
    /// Fails with [`ActorError::IllegalState`] unless the actor is
    /// [`State::Created`].
    #[instrument(skip(self), fields(actor = %self.id()))]
    pub fn start(&self) -> Result<(), ActorError> {
        self.transition(&[State::Created], State::Starting, "start")?;
        let actor = self.clone();
        self.queue_head(Box::new(move || actor.begin()))
    }

    /// Replaces the behavior with a fresh one from the role.
    ///
    /// The old behavior stops first. Messages arriving in between are kept
    /// and handled by the new behavior in order.
    ///
    /// # Errors
    ///
    /// Fails with [`ActorError::IllegalState`] unless the actor is
    /// [`State::Started`].
    #[instrument(skip(self), fields(actor = %self.id()))]
    pub fn restart(&self) -> Result<(), ActorError> {
        self.transition(&[State::Started], State::Restarting, "restart")?;
        let actor = self.clone();
        self.queue_head(Box::new(move || actor.recycle()))
    }

    /// Stops the actor. New messages are refused from now on.
    ///
    /// # Errors
    ///
    /// Fails with [`ActorError::IllegalState`] unless the actor is
    /// [`State::Started`].
    #[instrument(skip(self), fields(actor = %self.id()))]
    pub fn stop(&self) -> Result<(), ActorError> {
        self.transition(&[State::Started], State::Stopped, "stop")?;
        let actor = self.clone();
        self.queue_head(Box::new(move || actor.wind_down()))
    }

    /// Dismisses the actor ahead of any waiting messages, which bounce.
    ///
    /// Observers receive a [`DeadLetter`] and the stage forgets the actor.
    ///
    /// # Errors
    ///
    /// Fails with [`ActorError::IllegalState`] if the actor is already
    /// dismissed.
    #[instrument(skip(self), fields(actor = %self.id()))]
    pub fn dismiss(&self) -> Result<(), ActorError> {
        self.dismiss_with(None)
    }

    /// Dismisses the actor after the messages already waiting are handled.
    ///
    /// # Errors
    ///
    /// Fails with [`ActorError::IllegalState`] if the actor is already
    /// dismissed.
    #[instrument(skip(self), fields(actor = %self.id()))]
    pub fn dismiss_lazy(&self) -> Result<(), ActorError> {
        let state = self.state();
        if state == State::Dismissed {
            return Err(self.illegal(state, "dismiss"));
        }
        let actor = self.clone();
        self.cell
            .mailbox
            .execute(Box::new(move || {
                if let Err(refused) = actor.dismiss_with(None) {
                    trace!(actor = %actor.id(), "{refused}");
                }
            }))
            .map_err(|source| self.rejected(source))
    }

    /// Dismisses the actor and unregisters it from its stage right away.
    ///
    /// # Errors
    ///
    /// Fails with [`ActorError::IllegalState`] if the actor is already
    /// dismissed.
    pub fn remove(&self) -> Result<(), ActorError> {
        self.dismiss()?;
        self.unregister();
        Ok(())
    }

    /// Adds an actor to be told a [`DeadLetter`] when this one is dismissed.
    ///
    /// An observer added after the dismissal is told immediately.
    pub fn add_observer(&self, observer: &Actor) {
        let mut core = self.cell.core.lock();
        if !core.finalized {
            if !core.observers.contains(observer) {
                core.observers.push(observer.clone());
            }
            return;
        }
        let letter = DeadLetter {
            actor_id: self.id().to_string(),
            cause: core.cause.clone(),
        };
        drop(core);
        self.notify(observer, Message::new(letter));
    }

    /// Removes an observer. Returns `true` if it was registered.
    pub fn remove_observer(&self, observer: &Actor) -> bool {
        let mut core = self.cell.core.lock();
        let before = core.observers.len();
        core.observers.retain(|known| known != observer);
        core.observers.len() != before
    }

    /// Asks a supervised actor to report its failures to `supervisor`.
    ///
    /// Only actors whose behavior is a
    /// [`SupervisedBehavior`](crate::actor::SupervisedBehavior) understand the
    /// request.
    ///
    /// # Errors
    ///
    /// See [`tell`](Actor::tell).
    pub fn supervise(&self, supervisor: &Actor) -> Result<(), ActorError> {
        self.tell_with(
            Message::new(RegisterSupervisor(supervisor.clone())),
            Headers::new(),
            Some(supervisor.clone()),
        )
    }

    /// Withdraws the current supervisor.
    ///
    /// # Errors
    ///
    /// See [`tell`](Actor::tell).
    pub fn unsupervise(&self) -> Result<(), ActorError> {
        self.tell(UnregisterSupervisor)
    }
}

impl PartialEq for Actor {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

impl Eq for Actor {}

impl Hash for Actor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.cell).hash(state);
    }
}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Actor");
        out.field("id", &self.cell.id);
        if let Some(core) = self.cell.core.try_lock() {
            out.field("state", &core.state);
        }
        out.finish()
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cell.id)
    }
}
