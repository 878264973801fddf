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
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::debug;

use super::{Executor, ExecutorError, ExecutorRef, Task, TaskFuture};

/// Gives every task a deadline.
///
/// A task that has not finished when its deadline passes is expired: its
/// [`TaskFuture`] completes with [`TaskError::Expired`](super::TaskError::Expired)
/// and, if it had not started yet, it never runs. A task that is already
/// running cannot be interrupted; its eventual result is discarded.
#[derive(Clone)]
pub struct TimeoutExecutor {
    target: ExecutorRef,
    timeout: Duration,
    handle: Handle,
}

impl fmt::Debug for TimeoutExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeoutExecutor")
            .field("timeout", &self.timeout)
            .field("target_shutdown", &self.target.is_shutdown())
            .finish_non_exhaustive()
    }
}

impl TimeoutExecutor {
    /// Wraps `target`, expiring tasks after `timeout`. Timers run on `handle`.
    #[must_use]
    pub fn new(target: ExecutorRef, timeout: Duration, handle: Handle) -> Self {
        Self {
            target,
            timeout,
            handle,
        }
    }

    /// Returns the per-task deadline.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `work` with a deadline and returns its future.
    pub fn submit<T, F>(&self, work: F) -> TaskFuture<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let future = TaskFuture::pending();
        let slot = future.clone();
        match self.target.execute(Box::new(move || slot.run(work))) {
            Ok(()) => self.watch(future.clone()),
            Err(rejected) => {
                future.complete(Err(rejected.into()));
            }
        }
        future
    }

    fn watch<T: Send + 'static>(&self, future: TaskFuture<T>) {
        let timeout = self.timeout;
        self.handle.spawn(async move {
            if tokio::time::timeout(timeout, future.wait()).await.is_err() && future.expire(timeout) {
                debug!(?timeout, "task expired before completing");
            }
        });
    }
}

impl Executor for TimeoutExecutor {
    fn execute(&self, task: Task) -> Result<(), ExecutorError> {
        let future = TaskFuture::pending();
        let slot = future.clone();
        self.target.execute(Box::new(move || slot.run(task)))?;
        self.watch(future);
        Ok(())
    }

    fn shutdown(&self) {
        self.target.shutdown();
    }

    fn shutdown_now(&self) -> Vec<Task> {
        self.target.shutdown_now()
    }

    fn is_shutdown(&self) -> bool {
        self.target.is_shutdown()
    }
}
