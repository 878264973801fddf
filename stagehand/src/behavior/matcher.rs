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
use std::marker::PhantomData;

use crate::actor::Actor;
use crate::message::{Envelop, Message, MessageType};

/// Decides whether a handler applies to a message.
///
/// Any `Fn(&Message, &Envelop) -> anyhow::Result<bool>` closure is a matcher.
/// An error aborts the dispatch of the message and counts as a failure of the
/// actor.
pub trait MessageMatcher: Send + Sync + 'static {
    /// Returns `true` if the handler should run for this delivery.
    ///
    /// # Errors
    ///
    /// Any error the matcher raises while deciding.
    fn matches(&self, message: &Message, envelop: &Envelop) -> anyhow::Result<bool>;
}

impl<F> MessageMatcher for F
where
    F: Fn(&Message, &Envelop) -> anyhow::Result<bool> + Send + Sync + 'static,
{
    fn matches(&self, message: &Message, envelop: &Envelop) -> anyhow::Result<bool> {
        self(message, envelop)
    }
}

/// Matches every message.
pub(crate) struct Always;

impl MessageMatcher for Always {
    fn matches(&self, _message: &Message, _envelop: &Envelop) -> anyhow::Result<bool> {
        Ok(true)
    }
}

/// Matches messages whose payload is one of a set of types.
pub(crate) struct OfType(pub(crate) Vec<MessageType>);

impl MessageMatcher for OfType {
    fn matches(&self, message: &Message, _envelop: &Envelop) -> anyhow::Result<bool> {
        Ok(self.0.iter().any(|kind| kind.matches(message)))
    }
}

/// Matches payloads of type `T` that satisfy a predicate.
pub(crate) struct Where<T, P> {
    predicate: P,
    payload: PhantomData<fn(&T)>,
}

impl<T, P> Where<T, P> {
    pub(crate) const fn new(predicate: P) -> Self {
        Self {
            predicate,
            payload: PhantomData,
        }
    }
}

impl<T, P> MessageMatcher for Where<T, P>
where
    T: Any,
    P: Fn(&T) -> anyhow::Result<bool> + Send + Sync + 'static,
{
    fn matches(&self, message: &Message, _envelop: &Envelop) -> anyhow::Result<bool> {
        message
            .downcast_ref::<T>()
            .map_or(Ok(false), |payload| (self.predicate)(payload))
    }
}

/// Matches a payload equal to a value; `None` matches only the null message.
pub(crate) struct EqualTo<T>(pub(crate) Option<T>);

impl<T> MessageMatcher for EqualTo<T>
where
    T: PartialEq + Any + Send + Sync,
{
    fn matches(&self, message: &Message, _envelop: &Envelop) -> anyhow::Result<bool> {
        Ok(match &self.0 {
            None => message.is_null(),
            Some(expected) => message.downcast_ref::<T>() == Some(expected),
        })
    }
}

/// Matches on the envelop alone.
pub(crate) struct EnvelopWhere<P>(pub(crate) P);

impl<P> MessageMatcher for EnvelopWhere<P>
where
    P: Fn(&Envelop) -> anyhow::Result<bool> + Send + Sync + 'static,
{
    fn matches(&self, _message: &Message, envelop: &Envelop) -> anyhow::Result<bool> {
        (self.0)(envelop)
    }
}

/// Matches on the sender.
pub(crate) struct SenderWhere<P>(pub(crate) P);

impl<P> MessageMatcher for SenderWhere<P>
where
    P: Fn(Option<&Actor>) -> anyhow::Result<bool> + Send + Sync + 'static,
{
    fn matches(&self, _message: &Message, envelop: &Envelop) -> anyhow::Result<bool> {
        (self.0)(envelop.sender())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Headers;

    fn envelop() -> Envelop {
        Envelop::new(None, Headers::new())
    }

    #[test]
    fn equality_with_none_matches_only_null() {
        let matcher = EqualTo::<String>(None);
        assert!(matcher.matches(&Message::null(), &envelop()).unwrap());
        assert!(!matcher
            .matches(&Message::new(String::from("x")), &envelop())
            .unwrap());
    }

    #[test]
    fn equality_with_a_value_needs_type_and_value() {
        let matcher = EqualTo(Some(String::from("x")));
        assert!(matcher.matches(&Message::new(String::from("x")), &envelop()).unwrap());
        assert!(!matcher.matches(&Message::new(String::from("y")), &envelop()).unwrap());
        assert!(!matcher.matches(&Message::new("x"), &envelop()).unwrap());
        assert!(!matcher.matches(&Message::null(), &envelop()).unwrap());
    }

    #[test]
    fn predicate_errors_surface() {
        let matcher = Where::<u32, _>::new(|n: &u32| {
            anyhow::ensure!(*n != 13, "unlucky");
            Ok(*n > 10)
        });
        assert!(matcher.matches(&Message::new(11_u32), &envelop()).unwrap());
        assert!(!matcher.matches(&Message::new(3_u32), &envelop()).unwrap());
        assert!(!matcher.matches(&Message::new(11_i64), &envelop()).unwrap());
        assert!(matcher.matches(&Message::new(13_u32), &envelop()).is_err());
    }

    #[test]
    fn closures_are_matchers() {
        let matcher = |message: &Message, _: &Envelop| Ok::<_, anyhow::Error>(message.is::<bool>());
        assert!(MessageMatcher::matches(&matcher, &Message::new(true), &envelop()).unwrap());
        assert!(!OfType(vec![MessageType::of::<u8>()])
            .matches(&Message::new(true), &envelop())
            .unwrap());
    }
}
