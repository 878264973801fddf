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


use std::fmt;

use uuid::Uuid;

use crate::message::Message;

/// Confirms that a message sent with a receipt request was processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// The id from the original message's headers.
    pub receipt_id: Uuid,
    /// The actor that processed the message.
    pub actor_id: String,
}

/// Returns a message that could not be processed to its sender.
///
/// Only sent for messages whose headers requested a receipt.
#[derive(Debug, Clone)]
pub struct Bounced {
    /// The id from the original message's headers.
    pub receipt_id: Uuid,
    /// The message that was not processed.
    pub message: Message,
    /// Why it was not processed.
    pub reason: BounceReason,
}

/// Why a message bounced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BounceReason {
    /// The recipient was dismissed.
    Dismissed,
    /// The recipient was stopped.
    Stopped,
    /// The recipient's inbox was full.
    QuotaExceeded,
    /// Processing the message failed.
    Failed(String),
    /// The recipient refused the message.
    Rejected(String),
}

impl fmt::Display for BounceReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dismissed => f.write_str("recipient dismissed"),
            Self::Stopped => f.write_str("recipient stopped"),
            Self::QuotaExceeded => f.write_str("recipient inbox full"),
            Self::Failed(cause) => write!(f, "processing failed: {cause}"),
            Self::Rejected(cause) => write!(f, "rejected: {cause}"),
        }
    }
}

/// Tells observers that an actor was dismissed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    /// The dismissed actor.
    pub actor_id: String,
    /// The failure that caused the dismissal, if any.
    pub cause: Option<String>,
}
