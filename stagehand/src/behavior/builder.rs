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
use std::mem;

use super::dispatch::{Dispatch, MatchingBehavior, MatchingHandler};
use super::matcher::{Always, EnvelopWhere, EqualTo, OfType, SenderWhere, Where};
use super::{BehaviorError, MessageMatcher};
use crate::actor::{Actor, Agent};
use crate::message::{Envelop, Message, MessageType};
use crate::traits::Behavior;

/// A handler for a raw message.
pub type MessageHandler =
    Box<dyn FnMut(&Message, &Envelop, &mut Agent<'_>) -> anyhow::Result<()> + Send>;

/// A start or stop observer.
pub type LifecycleHandler = Box<dyn FnMut(&mut Agent<'_>) -> anyhow::Result<()> + Send>;

/// Assembles a [`Behavior`] from handlers.
///
/// Registration order is dispatch order. Registrations that can never be
/// valid are remembered and reported by [`build`](BehaviorBuilder::build).
///
/// ```rust,ignore
/// let behavior = BehaviorBuilder::new()
///     .on_message::<u32, _>(|n, _, _| {
///         tracing::info!(n, "number");
///         Ok(())
///     })
///     .on_message_equal_to(Some(String::from("stop")), |_, _, agent| {
///         agent.stop();
///         Ok(())
///     })
///     .on_no_match(|message, _, _| {
///         tracing::warn!(?message, "unexpected");
///         Ok(())
///     })
///     .build()?;
/// ```
#[derive(Default)]
pub struct BehaviorBuilder {
    matching: Vec<MatchingHandler>,
    fallbacks: Vec<MessageHandler>,
    starters: Vec<LifecycleHandler>,
    stoppers: Vec<LifecycleHandler>,
    errors: Vec<BehaviorError>,
}

fn message_handler<H>(handler: H) -> MessageHandler
where
    H: FnMut(&Message, &Envelop, &mut Agent<'_>) -> anyhow::Result<()> + Send + 'static,
{
    Box::new(handler)
}

fn typed_handler<T, H>(mut handler: H) -> MessageHandler
where
    T: Any,
    H: FnMut(&T, &Envelop, &mut Agent<'_>) -> anyhow::Result<()> + Send + 'static,
{
    message_handler(move |message, envelop, agent| match message.downcast_ref::<T>() {
        Some(payload) => handler(payload, envelop, agent),
        None => Ok(()),
    })
}

impl BehaviorBuilder {
    /// Starts an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `handler` for every message.
    pub fn on_any<H>(&mut self, handler: H) -> &mut Self
    where
        H: FnMut(&Message, &Envelop, &mut Agent<'_>) -> anyhow::Result<()> + Send + 'static,
    {
        self.on_match(Always, handler)
    }

    /// Runs `handler` for messages accepted by `matcher`.
    pub fn on_match<M, H>(&mut self, matcher: M, handler: H) -> &mut Self
    where
        M: MessageMatcher,
        H: FnMut(&Message, &Envelop, &mut Agent<'_>) -> anyhow::Result<()> + Send + 'static,
    {
        self.matching
            .push(MatchingHandler::new(Box::new(matcher), message_handler(handler)));
        self
    }

    /// Runs `handler` for payloads of exactly type `T`.
    pub fn on_message<T, H>(&mut self, handler: H) -> &mut Self
    where
        T: Any + Send + Sync,
        H: FnMut(&T, &Envelop, &mut Agent<'_>) -> anyhow::Result<()> + Send + 'static,
    {
        self.matching.push(MatchingHandler::new(
            Box::new(OfType(vec![MessageType::of::<T>()])),
            typed_handler(handler),
        ));
        self
    }

    /// Runs `handler` for payloads of any of `types`.
    ///
    /// An empty set of types is reported by [`build`](BehaviorBuilder::build).
    pub fn on_messages<I, H>(&mut self, types: I, handler: H) -> &mut Self
    where
        I: IntoIterator<Item = MessageType>,
        H: FnMut(&Message, &Envelop, &mut Agent<'_>) -> anyhow::Result<()> + Send + 'static,
    {
        let types: Vec<MessageType> = types.into_iter().collect();
        if types.is_empty() {
            self.errors.push(BehaviorError::EmptyTypeSet {
                registration: self.matching.len(),
            });
            return self;
        }
        self.on_match(OfType(types), handler)
    }

    /// Runs `handler` for payloads of type `T` that satisfy `predicate`.
    pub fn on_message_where<T, P, H>(&mut self, predicate: P, handler: H) -> &mut Self
    where
        T: Any + Send + Sync,
        P: Fn(&T) -> anyhow::Result<bool> + Send + Sync + 'static,
        H: FnMut(&T, &Envelop, &mut Agent<'_>) -> anyhow::Result<()> + Send + 'static,
    {
        self.matching.push(MatchingHandler::new(
            Box::new(Where::<T, P>::new(predicate)),
            typed_handler(handler),
        ));
        self
    }

    /// Runs `handler` for a payload equal to `value`.
    ///
    /// `None` matches the null message and nothing else.
    pub fn on_message_equal_to<T, H>(&mut self, value: Option<T>, handler: H) -> &mut Self
    where
        T: PartialEq + Any + Send + Sync,
        H: FnMut(&Message, &Envelop, &mut Agent<'_>) -> anyhow::Result<()> + Send + 'static,
    {
        self.on_match(EqualTo(value), handler)
    }

    /// Runs `handler` for deliveries whose envelop satisfies `predicate`.
    pub fn on_envelop<P, H>(&mut self, predicate: P, handler: H) -> &mut Self
    where
        P: Fn(&Envelop) -> anyhow::Result<bool> + Send + Sync + 'static,
        H: FnMut(&Message, &Envelop, &mut Agent<'_>) -> anyhow::Result<()> + Send + 'static,
    {
        self.on_match(EnvelopWhere(predicate), handler)
    }

    /// Runs `handler` for deliveries whose sender satisfies `predicate`.
    pub fn on_sender<P, H>(&mut self, predicate: P, handler: H) -> &mut Self
    where
        P: Fn(Option<&Actor>) -> anyhow::Result<bool> + Send + Sync + 'static,
        H: FnMut(&Message, &Envelop, &mut Agent<'_>) -> anyhow::Result<()> + Send + 'static,
    {
        self.on_match(SenderWhere(predicate), handler)
    }

    /// Runs `handler` when no other handler matched.
    pub fn on_no_match<H>(&mut self, handler: H) -> &mut Self
    where
        H: FnMut(&Message, &Envelop, &mut Agent<'_>) -> anyhow::Result<()> + Send + 'static,
    {
        self.fallbacks.push(message_handler(handler));
        self
    }

    /// Runs `observer` when the actor starts.
    pub fn on_start<H>(&mut self, observer: H) -> &mut Self
    where
        H: FnMut(&mut Agent<'_>) -> anyhow::Result<()> + Send + 'static,
    {
        self.starters.push(Box::new(observer));
        self
    }

    /// Runs `observer` when the actor stops.
    pub fn on_stop<H>(&mut self, observer: H) -> &mut Self
    where
        H: FnMut(&mut Agent<'_>) -> anyhow::Result<()> + Send + 'static,
    {
        self.stoppers.push(Box::new(observer));
        self
    }

    /// Assembles the behavior, leaving this builder empty.
    ///
    /// # Errors
    ///
    /// Returns the first invalid registration.
    pub fn build(&mut self) -> Result<Box<dyn Behavior>, BehaviorError> {
        Ok(Box::new(self.assemble()?))
    }

    fn assemble(&mut self) -> Result<MatchingBehavior, BehaviorError> {
        let Self {
            matching,
            fallbacks,
            starters,
            stoppers,
            errors,
        } = mem::take(self);
        if let Some(error) = errors.into_iter().next() {
            return Err(error);
        }
        Ok(MatchingBehavior {
            dispatch: Dispatch::collapse(matching, fallbacks),
            starters,
            stoppers,
        })
    }
}
