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
use std::sync::Arc;
use std::time::Duration;

use tracing::{warn, Span};

use crate::actor::{Actor, ActorError, State};
use crate::executor::{ExecutorRef, ScheduledExecutor, ScheduledFuture};
use crate::message::{BounceReason, Delivery, Envelop, Headers, Message};
use crate::traits::Behavior;

/// A lifecycle change requested from inside a callback.
///
/// When a callback asks for several, the most final one wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Transition {
    Restart,
    Stop,
    Dismiss,
}

/// What a callback asked for, applied once it has returned.
#[derive(Default)]
pub(crate) struct Effects {
    pub(crate) replacement: Option<Box<dyn Behavior>>,
    pub(crate) transition: Option<Transition>,
    pub(crate) redeliveries: Vec<Delivery>,
}

/// The actor as seen from inside one of its own callbacks.
///
/// An agent exists only for the duration of a callback. Sending messages
/// takes effect immediately; behavior replacement, lifecycle requests and
/// redeliveries are applied after the callback returns.
pub struct Agent<'a> {
    actor: &'a Actor,
    effects: Effects,
}

impl<'a> Agent<'a> {
    pub(crate) fn new(actor: &'a Actor) -> Self {
        Self {
            actor,
            effects: Effects::default(),
        }
    }

    pub(crate) fn into_effects(self) -> Effects {
        self.effects
    }

    /// Returns a handle to the actor itself.
    #[must_use]
    pub const fn myself(&self) -> &Actor {
        self.actor
    }

    /// Returns the actor's id.
    #[must_use]
    pub fn id(&self) -> &str {
        self.actor.id()
    }

    /// Returns the actor's lifecycle state.
    #[must_use]
    pub fn state(&self) -> State {
        self.actor.state()
    }

    /// Returns the executor the actor runs on.
    #[must_use]
    pub fn executor(&self) -> &ExecutorRef {
        self.actor.executor()
    }

    /// Returns the scheduler bound to the actor's executor.
    #[must_use]
    pub fn scheduler(&self) -> &Arc<ScheduledExecutor> {
        &self.actor.cell.scheduler
    }

    /// Returns the tracing span the actor's callbacks run in.
    #[must_use]
    pub fn span(&self) -> &Span {
        &self.actor.cell.span
    }

    /// Replaces the behavior, starting with the next message.
    ///
    /// The replaced behavior is dropped without `on_stop`.
    pub fn set_behavior(&mut self, behavior: Box<dyn Behavior>) {
        self.effects.replacement = Some(behavior);
    }

    /// Restarts the actor once the callback returns.
    pub fn restart(&mut self) {
        self.request(Transition::Restart);
    }

    /// Stops the actor once the callback returns.
    pub fn stop(&mut self) {
        self.request(Transition::Stop);
    }

    /// Dismisses the actor once the callback returns.
    pub fn dismiss(&mut self) {
        self.request(Transition::Dismiss);
    }

    fn request(&mut self, transition: Transition) {
        self.effects.transition = self.effects.transition.max(Some(transition));
    }

    /// Hands deliveries back to the actor, ahead of everything still waiting.
    ///
    /// They are handled in the given order, after the current callback and
    /// after a restart requested by it.
    pub fn redeliver(&mut self, deliveries: impl IntoIterator<Item = Delivery>) {
        self.effects.redeliveries.extend(deliveries);
    }

    /// Tells `target` a message, with this actor as sender.
    ///
    /// # Errors
    ///
    /// See [`Actor::tell`].
    pub fn tell<T: Any + Send + Sync>(&self, target: &Actor, message: T) -> Result<(), ActorError> {
        self.tell_with(target, Message::new(message), Headers::new())
    }

    /// Tells `target` a message with explicit headers, with this actor as sender.
    ///
    /// # Errors
    ///
    /// See [`Actor::tell`].
    pub fn tell_with(&self, target: &Actor, message: Message, headers: Headers) -> Result<(), ActorError> {
        target.tell_with(message, headers, Some(self.actor.clone()))
    }

    /// Answers the sender of `envelop` in the same thread.
    ///
    /// Returns `Ok(false)` when there is nobody to answer.
    ///
    /// # Errors
    ///
    /// See [`Actor::tell`].
    pub fn reply<T: Any + Send + Sync>(&self, envelop: &Envelop, message: T) -> Result<bool, ActorError> {
        let Some(sender) = envelop.sender() else {
            return Ok(false);
        };
        self.tell_with(sender, Message::new(message), envelop.headers().thread_only())?;
        Ok(true)
    }

    /// Tells the actor itself `message` after `delay`.
    ///
    /// Cancelling the returned future before the deadline withdraws the
    /// message.
    pub fn schedule<T: Any + Send + Sync>(&self, delay: Duration, message: T) -> ScheduledFuture<()> {
        let actor = self.actor.clone();
        let message = Message::new(message);
        self.scheduler().schedule(delay, move || {
            if let Err(refused) = actor.tell_with(message, Headers::new(), Some(actor.clone())) {
                warn!(actor = %actor.id(), "scheduled message not delivered: {refused}");
            }
        })
    }

    /// Returns a message to its sender as [`Bounced`](crate::message::Bounced),
    /// if the sender asked for a receipt.
    pub fn bounce(&self, message: &Message, envelop: &Envelop, reason: BounceReason) {
        self.actor.bounce(message, envelop, reason);
    }
}
