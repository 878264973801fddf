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
use std::sync::Arc;

use uuid::Uuid;

use crate::actor::{Actor, ActorError};
use crate::message::{Headers, Message};

/// Maps a message before a [`Conversation`] sends it.
pub type MessageFilter = Arc<dyn Fn(Message) -> Message + Send + Sync>;

/// A thread of messages to one actor.
///
/// Created by [`Actor::thread`]. Every message carries the same thread id,
/// so the recipient can tell conversations apart and answer in the right one.
#[derive(Clone)]
pub struct Conversation {
    target: Actor,
    sender: Option<Actor>,
    headers: Headers,
    filters: Vec<MessageFilter>,
}

impl Conversation {
    pub(crate) fn new(target: Actor, headers: Headers, filters: Vec<MessageFilter>, sender: Option<Actor>) -> Self {
        Self {
            target,
            sender,
            headers,
            filters,
        }
    }

    /// Returns the thread id shared by every message.
    #[must_use]
    pub fn thread_id(&self) -> &str {
        self.headers.thread_id().unwrap_or_default()
    }

    /// Returns the recipient.
    #[must_use]
    pub const fn target(&self) -> &Actor {
        &self.target
    }

    /// Sends a message in this thread.
    ///
    /// # Errors
    ///
    /// See [`Actor::tell`].
    pub fn tell<T: Any + Send + Sync>(&self, message: T) -> Result<(), ActorError> {
        self.send(Message::new(message), self.headers.clone())
    }

    /// Sends a message in this thread and asks for a receipt.
    ///
    /// Returns the receipt id the answering [`Receipt`](crate::message::Receipt)
    /// or [`Bounced`](crate::message::Bounced) will carry.
    ///
    /// # Errors
    ///
    /// See [`Actor::tell`].
    pub fn tell_with_receipt<T: Any + Send + Sync>(&self, message: T) -> Result<Uuid, ActorError> {
        let receipt_id = Uuid::new_v4();
        self.send(Message::new(message), self.headers.with_receipt_id(receipt_id))?;
        Ok(receipt_id)
    }

    fn send(&self, message: Message, headers: Headers) -> Result<(), ActorError> {
        let message = self.filters.iter().fold(message, |message, filter| filter(message));
        self.target.tell_with(message, headers, self.sender.clone())
    }
}

impl fmt::Debug for Conversation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conversation")
            .field("target", &self.target)
            .field("thread_id", &self.thread_id())
            .field("filters", &self.filters.len())
            .finish_non_exhaustive()
    }
}
