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


use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use std::time::SystemTime;

use static_assertions::assert_impl_all;
use uuid::Uuid;

use crate::actor::Actor;
use crate::message::{Headers, Message};

/// Metadata that accompanies one delivery of a message.
#[derive(Debug)]
pub struct Envelop {
    sender: Option<Actor>,
    sent_at: SystemTime,
    received_at: OnceLock<SystemTime>,
    headers: Headers,
    receipt_prevented: AtomicBool,
}

impl Envelop {
    /// Creates an envelop stamped with the current time.
    #[must_use]
    pub fn new(sender: Option<Actor>, headers: Headers) -> Self {
        Self {
            sender,
            sent_at: SystemTime::now(),
            received_at: OnceLock::new(),
            headers,
            receipt_prevented: AtomicBool::new(false),
        }
    }

    /// Returns the sending actor, if the message was sent by one.
    #[must_use]
    pub const fn sender(&self) -> Option<&Actor> {
        self.sender.as_ref()
    }

    /// Returns the apparent send time: the real one minus the header offset.
    #[must_use]
    pub fn sent_at(&self) -> SystemTime {
        self.sent_at
            .checked_sub(self.headers.offset())
            .unwrap_or(SystemTime::UNIX_EPOCH)
    }

    /// Returns when the recipient's mailbox dequeued the message.
    #[must_use]
    pub fn received_at(&self) -> Option<SystemTime> {
        self.received_at.get().copied()
    }

    pub(crate) fn mark_received(&self) {
        let _ = self.received_at.set(SystemTime::now());
    }

    /// Returns the headers chosen by the sender.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Shorthand for the thread id in the headers.
    #[must_use]
    pub fn thread_id(&self) -> Option<&str> {
        self.headers.thread_id()
    }

    /// Shorthand for the receipt id in the headers.
    #[must_use]
    pub const fn receipt_id(&self) -> Option<Uuid> {
        self.headers.receipt_id()
    }

    /// Stops the runtime from sending a receipt for this delivery.
    ///
    /// Handlers that take responsibility for a message (for example by
    /// buffering it) call this and answer later themselves.
    pub fn prevent_receipt(&self) {
        self.receipt_prevented.store(true, Ordering::Release);
    }

    /// Returns `true` if a handler prevented the receipt.
    #[must_use]
    pub fn is_receipt_prevented(&self) -> bool {
        self.receipt_prevented.load(Ordering::Acquire)
    }

    /// Returns `true` if a receipt was requested and not prevented.
    #[must_use]
    pub fn wants_receipt(&self) -> bool {
        self.headers.receipt_id().is_some() && !self.is_receipt_prevented()
    }

    /// Copies the envelop for another delivery attempt.
    ///
    /// Sender, send time and headers are kept; the receive time and the
    /// receipt flag start fresh.
    #[must_use]
    pub fn redeliver(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            sent_at: self.sent_at,
            received_at: OnceLock::new(),
            headers: self.headers.clone(),
            receipt_prevented: AtomicBool::new(false),
        }
    }
}

/// A message together with its envelop.
#[derive(Debug)]
pub struct Delivery {
    /// The message.
    pub message: Message,
    /// Its envelop.
    pub envelop: Envelop,
}

impl Delivery {
    /// Pairs `message` with `envelop`.
    #[must_use]
    pub const fn new(message: Message, envelop: Envelop) -> Self {
        Self { message, envelop }
    }

    /// Copies the delivery for another attempt, see [`Envelop::redeliver`].
    #[must_use]
    pub fn redeliver(&self) -> Self {
        Self {
            message: self.message.clone(),
            envelop: self.envelop.redeliver(),
        }
    }
}

assert_impl_all!(Envelop: Send, Sync);
assert_impl_all!(Delivery: Send, Sync);
