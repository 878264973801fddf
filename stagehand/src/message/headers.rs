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


use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

/// Per-message options chosen by the sender.
///
/// Headers are immutable; every `with_*` method returns an updated copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    thread_id: Option<Arc<str>>,
    receipt_id: Option<Uuid>,
    offset: Duration,
}

impl Headers {
    /// Empty headers: no thread, no receipt, no offset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the conversation thread this message belongs to.
    #[must_use]
    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    /// Returns the receipt id, if the sender asked for a receipt.
    #[must_use]
    pub const fn receipt_id(&self) -> Option<Uuid> {
        self.receipt_id
    }

    /// Returns how far the apparent send time lies before the real one.
    #[must_use]
    pub const fn offset(&self) -> Duration {
        self.offset
    }

    /// Places the message in a conversation thread.
    #[must_use]
    pub fn with_thread_id(&self, thread_id: impl Into<Arc<str>>) -> Self {
        Self {
            thread_id: Some(thread_id.into()),
            ..self.clone()
        }
    }

    /// Asks for a [`Receipt`](super::Receipt) under a freshly minted id.
    #[must_use]
    pub fn with_receipt(&self) -> Self {
        self.with_receipt_id(Uuid::new_v4())
    }

    /// Asks for a [`Receipt`](super::Receipt) under `receipt_id`.
    #[must_use]
    pub fn with_receipt_id(&self, receipt_id: Uuid) -> Self {
        Self {
            receipt_id: Some(receipt_id),
            ..self.clone()
        }
    }

    /// Drops any receipt request.
    #[must_use]
    pub fn without_receipt(&self) -> Self {
        Self {
            receipt_id: None,
            ..self.clone()
        }
    }

    /// Backdates the apparent send time by `offset`.
    #[must_use]
    pub fn with_offset(&self, offset: Duration) -> Self {
        Self {
            offset,
            ..self.clone()
        }
    }

    /// Keeps only the thread id.
    #[must_use]
    pub fn thread_only(&self) -> Self {
        Self {
            thread_id: self.thread_id.clone(),
            ..Self::default()
        }
    }
}
