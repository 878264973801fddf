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

use tracing::Span;

use crate::executor::ExecutorRef;
use crate::traits::Behavior;

/// Assembles the parts of an actor.
///
/// [`behavior`](Role::behavior) is called on every start and restart, so
/// each incarnation of the actor begins with fresh state. The other methods
/// are consulted once, when the actor is created.
pub trait Role: Send + Sync + 'static {
    /// Creates the behavior for the actor `id`.
    ///
    /// # Errors
    ///
    /// An error dismisses the actor.
    fn behavior(&self, id: &str) -> anyhow::Result<Box<dyn Behavior>>;

    /// Chooses the executor the actor runs on; `None` selects the stage default.
    ///
    /// # Errors
    ///
    /// An error aborts the creation of the actor.
    fn executor(&self, _id: &str) -> anyhow::Result<Option<ExecutorRef>> {
        Ok(None)
    }

    /// Returns the span the actor's callbacks run in.
    fn span(&self, id: &str) -> Span {
        tracing::info_span!("actor", id = %id)
    }

    /// Caps the number of unprocessed messages; `None` uses the stage default.
    fn quota(&self, _id: &str) -> Option<usize> {
        None
    }
}

/// A [`Role`] made from a closure, with optional executor and quota.
///
/// ```rust,ignore
/// let role = Script::new(|_id| {
///     Ok(BehaviorBuilder::new()
///         .on_message::<String, _>(|text, _, _| {
///             tracing::info!(%text, "heard");
///             Ok(())
///         })
///         .build()?)
/// })
/// .with_quota(64);
/// ```
pub struct Script<F> {
    factory: F,
    executor: Option<ExecutorRef>,
    quota: Option<usize>,
}

impl<F> Script<F>
where
    F: Fn(&str) -> anyhow::Result<Box<dyn Behavior>> + Send + Sync + 'static,
{
    /// Wraps a behavior factory.
    pub const fn new(factory: F) -> Self {
        Self {
            factory,
            executor: None,
            quota: None,
        }
    }

    /// Runs the actor on `executor` instead of the stage default.
    #[must_use]
    pub fn with_executor(mut self, executor: ExecutorRef) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Caps the number of unprocessed messages.
    #[must_use]
    pub fn with_quota(mut self, quota: usize) -> Self {
        self.quota = Some(quota);
        self
    }
}

impl<F> fmt::Debug for Script<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Script")
            .field("custom_executor", &self.executor.is_some())
            .field("quota", &self.quota)
            .finish_non_exhaustive()
    }
}

impl<F> Role for Script<F>
where
    F: Fn(&str) -> anyhow::Result<Box<dyn Behavior>> + Send + Sync + 'static,
{
    fn behavior(&self, id: &str) -> anyhow::Result<Box<dyn Behavior>> {
        (self.factory)(id)
    }

    fn executor(&self, _id: &str) -> anyhow::Result<Option<ExecutorRef>> {
        Ok(self.executor.clone())
    }

    fn quota(&self, _id: &str) -> Option<usize> {
        self.quota
    }
}
