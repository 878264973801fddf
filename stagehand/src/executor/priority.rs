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


use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use super::{DecoratorCache, Executor, ExecutorError, ExecutorRef, Task};

/// Hands out priority views over executors.
///
/// Every view over the same target executor shares one queue, so priorities
/// are comparable across all of them. The registry holds the shared queues
/// weakly; a queue disappears once the last view over it is dropped.
#[derive(Debug, Default)]
pub struct PriorityRegistry {
    contexts: DecoratorCache<PriorityContext>,
}

impl PriorityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view over `target` that submits at `priority`.
    #[must_use]
    pub fn executor(&self, target: &ExecutorRef, priority: i64) -> PriorityExecutor {
        let context = self
            .contexts
            .get_or_insert_with(target, || PriorityContext::new(Arc::clone(target)));
        PriorityExecutor { context, priority }
    }

    /// Drops queues that no view uses any more.
    pub fn purge(&self) -> usize {
        self.contexts.purge()
    }

    /// Returns the number of registered queues.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Returns `true` if no queue is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

/// An executor view that orders queued work by priority.
///
/// Each submission is ranked by `priority + age`, where `age` decreases by one
/// with every submission to the shared queue. Work that has waited long enough
/// therefore overtakes newer work of a slightly higher priority. Every
/// submission schedules exactly one poll on the target executor, and each poll
/// runs the single best-ranked task at that moment.
#[derive(Clone)]
pub struct PriorityExecutor {
    context: Arc<PriorityContext>,
    priority: i64,
}

impl fmt::Debug for PriorityExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorityExecutor")
            .field("priority", &self.priority)
            .field("queued", &self.queued())
            .finish()
    }
}

impl PriorityExecutor {
    /// Creates a view with its own private queue over `target`.
    #[must_use]
    pub fn new(target: ExecutorRef, priority: i64) -> Self {
        Self {
            context: Arc::new(PriorityContext::new(target)),
            priority,
        }
    }

    /// Returns the priority used by [`Executor::execute`].
    #[must_use]
    pub const fn priority(&self) -> i64 {
        self.priority
    }

    /// Returns another view over the same queue with a different priority.
    #[must_use]
    pub fn with_priority(&self, priority: i64) -> Self {
        Self {
            context: Arc::clone(&self.context),
            priority,
        }
    }

    /// Submits `task` at `priority` instead of the view's own priority.
    ///
    /// # Errors
    ///
    /// Fails if the target executor refuses the poll task. The task is then
    /// removed from the queue again.
    pub fn execute_with_priority(&self, priority: i64, task: Task) -> Result<(), ExecutorError> {
        let context = &self.context;
        let age = context.age.fetch_sub(1, Ordering::SeqCst);
        context.queue.lock().push(Prioritized {
            rank: priority.saturating_add(age),
            age,
            task,
        });
        let poller = Arc::clone(context);
        context
            .target
            .execute(Box::new(move || poller.poll()))
            .inspect_err(|_| context.queue.lock().retain(|entry| entry.age != age))
    }

    /// Returns the number of tasks waiting in the shared queue.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.context.queue.lock().len()
    }

    /// Returns `true` if both views share a queue.
    #[must_use]
    pub fn shares_queue_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.context, &other.context)
    }
}

impl Executor for PriorityExecutor {
    fn execute(&self, task: Task) -> Result<(), ExecutorError> {
        self.execute_with_priority(self.priority, task)
    }

    fn shutdown(&self) {
        self.context.target.shutdown();
    }

    fn shutdown_now(&self) -> Vec<Task> {
        let mut unstarted: Vec<Task> = self
            .context
            .queue
            .lock()
            .drain()
            .map(|entry| entry.task)
            .collect();
        unstarted.extend(self.context.target.shutdown_now());
        unstarted
    }

    fn is_shutdown(&self) -> bool {
        self.context.target.is_shutdown()
    }
}

/// The queue shared by all priority views over one target executor.
pub(crate) struct PriorityContext {
    target: ExecutorRef,
    queue: Mutex<BinaryHeap<Prioritized>>,
    age: AtomicI64,
}

impl fmt::Debug for PriorityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorityContext")
            .field("queued", &self.queue.lock().len())
            .finish_non_exhaustive()
    }
}

impl PriorityContext {
    fn new(target: ExecutorRef) -> Self {
        Self {
            target,
            queue: Mutex::new(BinaryHeap::new()),
            age: AtomicI64::new(0),
        }
    }

    fn poll(&self) {
        let next = self.queue.lock().pop();
        if let Some(entry) = next {
            trace!(rank = entry.rank, age = entry.age, "running prioritized task");
            (entry.task)();
        }
    }
}

struct Prioritized {
    rank: i64,
    age: i64,
    task: Task,
}

impl PartialEq for Prioritized {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == CmpOrdering::Equal
    }
}

impl Eq for Prioritized {}

impl PartialOrd for Prioritized {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Prioritized {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Ages only ever decrease, so a larger age is an older submission.
        self.rank
            .cmp(&other.rank)
            .then_with(|| self.age.cmp(&other.age))
    }
}
