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


use crate::actor::Agent;
use crate::message::{Envelop, Message};

/// The logic of an actor.
///
/// An actor calls its behavior from one thread at a time, so implementations
/// can keep plain mutable state. Callbacks are synchronous and must not block.
/// Returning an error from [`on_message`](Behavior::on_message) counts as a
/// failure of the actor; unless a supervisor handles it, the actor is
/// dismissed. Panics are treated the same way.
///
/// Most behaviors are assembled with [`BehaviorBuilder`](crate::prelude::BehaviorBuilder)
/// rather than implemented by hand.
pub trait Behavior: Send + 'static {
    /// Called once the actor has started, before any message.
    ///
    /// # Errors
    ///
    /// An error dismisses the actor.
    fn on_start(&mut self, _agent: &mut Agent<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Handles one message.
    ///
    /// # Errors
    ///
    /// An error is a failure of the actor.
    fn on_message(
        &mut self,
        message: &Message,
        envelop: &Envelop,
        agent: &mut Agent<'_>,
    ) -> anyhow::Result<()>;

    /// Called when the actor stops, restarts or is dismissed after a start.
    ///
    /// # Errors
    ///
    /// Errors are logged and otherwise ignored.
    fn on_stop(&mut self, _agent: &mut Agent<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}

impl Behavior for Box<dyn Behavior> {
    fn on_start(&mut self, agent: &mut Agent<'_>) -> anyhow::Result<()> {
        (**self).on_start(agent)
    }

    fn on_message(
        &mut self,
        message: &Message,
        envelop: &Envelop,
        agent: &mut Agent<'_>,
    ) -> anyhow::Result<()> {
        (**self).on_message(message, envelop, agent)
    }

    fn on_stop(&mut self, agent: &mut Agent<'_>) -> anyhow::Result<()> {
        (**self).on_stop(agent)
    }
}
