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


use crate::executor::{Executor, ExecutorError, ExecutorRef, Task, ThrottledExecutor};

/// The task queue of one actor.
///
/// A mailbox runs at most one task at a time on its executor, in FIFO order,
/// except for tasks queued with [`execute_next`](Mailbox::execute_next), which
/// run before anything already waiting. The executor is shared with other
/// actors; a mailbox never shuts it down.
#[derive(Debug, Clone)]
pub struct Mailbox {
    queue: ThrottledExecutor,
}

impl Mailbox {
    /// Creates a mailbox running on `executor`.
    #[must_use]
    pub fn new(executor: ExecutorRef) -> Self {
        Self {
            queue: ThrottledExecutor::sequential(executor),
        }
    }

    /// Queues `task` behind everything already waiting.
    ///
    /// # Errors
    ///
    /// Fails if the executor refuses work.
    pub fn execute(&self, task: Task) -> Result<(), ExecutorError> {
        self.queue.execute(task)
    }

    /// Queues `task` ahead of everything already waiting.
    ///
    /// # Errors
    ///
    /// Fails if the executor refuses work.
    pub fn execute_next(&self, task: Task) -> Result<(), ExecutorError> {
        self.queue.execute_next(task)
    }

    /// Returns the number of waiting tasks.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.queued()
    }

    /// Returns the executor the mailbox runs on.
    #[must_use]
    pub fn executor(&self) -> &ExecutorRef {
        self.queue.target()
    }
}
