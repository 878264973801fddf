//! Messages and the metadata that travels with them.
//!
//! *   [`Message`]: a cloneable, type-erased payload, or the null message.
//! *   [`Headers`]: thread id, receipt request and send-time offset.
//! *   [`Envelop`]: per-delivery metadata (sender, timestamps, headers).
//! *   [`Delivery`]: a message together with its envelop, as buffered by actors.
//! *   [`Receipt`], [`Bounced`] and [`DeadLetter`]: notifications the runtime
//!     sends on its own behalf.

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


// --- Public Re-exports ---
pub use envelop::{Delivery, Envelop};
pub use headers::Headers;
pub use notifications::{BounceReason, Bounced, DeadLetter, Receipt};
pub use payload::{Message, MessageType};

// --- Submodules ---

/// Defines [`Envelop`] and [`Delivery`].
mod envelop;
/// Defines [`Headers`].
mod headers;
/// Defines the runtime's own notification messages.
mod notifications;
/// Defines [`Message`] and [`MessageType`].
mod payload;
