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


use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

use static_assertions::assert_impl_all;

/// A message as actors see it: any `Send + Sync` value, or nothing at all.
///
/// The payload is reference counted, so cloning a message never clones the
/// value inside it. Type tests compare the exact runtime type.
#[derive(Clone)]
pub struct Message {
    payload: Option<Arc<dyn Any + Send + Sync>>,
    type_name: &'static str,
}

impl Message {
    /// Wraps `value`. Wrapping a `Message` returns it unchanged.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        let boxed: Box<dyn Any + Send + Sync> = Box::new(value);
        match boxed.downcast::<Self>() {
            Ok(message) => *message,
            Err(boxed) => Self {
                payload: Some(Arc::from(boxed)),
                type_name: type_name::<T>(),
            },
        }
    }

    /// The null message, carrying no payload.
    #[must_use]
    pub const fn null() -> Self {
        Self {
            payload: None,
            type_name: "null",
        }
    }

    /// Returns `true` for the null message.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.payload.is_none()
    }

    /// Returns `true` if the payload is exactly a `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.payload.as_deref().is_some_and(|payload| payload.is::<T>())
    }

    /// Borrows the payload as a `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.as_deref()?.downcast_ref::<T>()
    }

    /// Returns the runtime type of the payload, `None` for the null message.
    #[must_use]
    pub fn type_id(&self) -> Option<TypeId> {
        self.payload.as_deref().map(|payload| (*payload).type_id())
    }

    /// Returns the type name recorded when the message was created.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns `true` if both messages share the same payload allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.payload, &other.payload) {
            (Some(left), Some(right)) => Arc::ptr_eq(left, right),
            (None, None) => true,
            _ => false,
        }
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Message({})", self.type_name)
    }
}

/// A runtime type that messages can be tested against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageType {
    id: TypeId,
    name: &'static str,
}

impl MessageType {
    /// The type `T`.
    #[must_use]
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Returns `true` if `message` carries exactly this type.
    #[must_use]
    pub fn matches(&self, message: &Message) -> bool {
        message.type_id() == Some(self.id)
    }

    /// Returns the type name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

assert_impl_all!(Message: Send, Sync, Clone);
