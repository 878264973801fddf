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


use tracing::trace;

use super::builder::{LifecycleHandler, MessageHandler};
use super::MessageMatcher;
use crate::actor::Agent;
use crate::message::{Envelop, Message};
use crate::traits::Behavior;

/// A handler guarded by a matcher.
pub(crate) struct MatchingHandler {
    matcher: Box<dyn MessageMatcher>,
    handler: MessageHandler,
}

impl MatchingHandler {
    pub(crate) fn new(matcher: Box<dyn MessageMatcher>, handler: MessageHandler) -> Self {
        Self { matcher, handler }
    }

    /// Runs the handler if the matcher accepts; returns whether it matched.
    fn handle(&mut self, message: &Message, envelop: &Envelop, agent: &mut Agent<'_>) -> anyhow::Result<bool> {
        if !self.matcher.matches(message, envelop)? {
            return Ok(false);
        }
        (self.handler)(message, envelop, agent)?;
        Ok(true)
    }
}

/// The assembled message dispatch, collapsed to its simplest form.
pub(crate) enum Dispatch {
    /// No handlers and no fallbacks.
    Noop,
    /// No handlers and exactly one fallback.
    Fallback(MessageHandler),
    /// Exactly one handler and no fallbacks.
    Single(MatchingHandler),
    /// Everything else.
    Composite {
        matching: Vec<MatchingHandler>,
        fallbacks: Vec<MessageHandler>,
    },
}

impl Dispatch {
    pub(crate) fn collapse(mut matching: Vec<MatchingHandler>, mut fallbacks: Vec<MessageHandler>) -> Self {
        if matching.is_empty() && fallbacks.len() <= 1 {
            return fallbacks.pop().map_or(Self::Noop, Self::Fallback);
        }
        if matching.len() == 1 && fallbacks.is_empty() {
            if let Some(single) = matching.pop() {
                return Self::Single(single);
            }
        }
        Self::Composite {
            matching,
            fallbacks,
        }
    }

    fn handle(&mut self, message: &Message, envelop: &Envelop, agent: &mut Agent<'_>) -> anyhow::Result<()> {
        match self {
            Self::Noop => Ok(()),
            Self::Fallback(fallback) => fallback(message, envelop, agent),
            Self::Single(handler) => handler.handle(message, envelop, agent).map(drop),
            Self::Composite {
                matching,
                fallbacks,
            } => {
                let mut matched = false;
                for handler in matching.iter_mut() {
                    matched |= handler.handle(message, envelop, agent)?;
                }
                if !matched {
                    trace!(message = message.type_name(), "no handler matched, running fallbacks");
                    for fallback in fallbacks.iter_mut() {
                        fallback(message, envelop, agent)?;
                    }
                }
                Ok(())
            }
        }
    }

    #[cfg(test)]
    pub(crate) const fn shape(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::Fallback(_) => "fallback",
            Self::Single(_) => "single",
            Self::Composite { .. } => "composite",
        }
    }
}

/// The behavior produced by [`BehaviorBuilder`](super::BehaviorBuilder).
pub(crate) struct MatchingBehavior {
    pub(crate) dispatch: Dispatch,
    pub(crate) starters: Vec<LifecycleHandler>,
    pub(crate) stoppers: Vec<LifecycleHandler>,
}

impl Behavior for MatchingBehavior {
    fn on_start(&mut self, agent: &mut Agent<'_>) -> anyhow::Result<()> {
        self.starters.iter_mut().try_for_each(|observer| observer(agent))
    }

    fn on_message(&mut self, message: &Message, envelop: &Envelop, agent: &mut Agent<'_>) -> anyhow::Result<()> {
        self.dispatch.handle(message, envelop, agent)
    }

    fn on_stop(&mut self, agent: &mut Agent<'_>) -> anyhow::Result<()> {
        self.stoppers.iter_mut().try_for_each(|observer| observer(agent))
    }
}
