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


use std::time::Duration;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, instrument, trace};

use super::{Executor, ExecutorError, Task};

/// The default executor: every task is spawned on a Tokio runtime.
///
/// Spawned tasks are tracked, so [`terminated`](TokioExecutor::terminated)
/// can wait for in-flight work after a shutdown. Tasks are synchronous
/// closures and occupy a worker thread for as long as they run.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: Handle,
    tracker: TaskTracker,
    closed: CancellationToken,
}

impl TokioExecutor {
    /// Creates an executor spawning onto `handle`.
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            tracker: TaskTracker::new(),
            closed: CancellationToken::new(),
        }
    }

    /// Creates an executor on the runtime the caller is running in.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Rejected`] when called outside a Tokio runtime.
    pub fn current() -> Result<Self, ExecutorError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|error| ExecutorError::Rejected(error.to_string()))
    }

    /// Returns the runtime handle tasks are spawned on.
    #[must_use]
    pub const fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Returns the number of spawned tasks that have not finished yet.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Waits up to `timeout` for every spawned task to finish.
    ///
    /// Only meaningful after [`shutdown`](Executor::shutdown); returns `true` if
    /// all tasks finished in time.
    #[instrument(skip(self))]
    pub async fn terminated(&self, timeout: Duration) -> bool {
        self.tracker.close();
        let finished = tokio::time::timeout(timeout, self.tracker.wait()).await.is_ok();
        debug!(finished, remaining = self.tracker.len(), "executor drained");
        finished
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, task: Task) -> Result<(), ExecutorError> {
        if self.closed.is_cancelled() {
            return Err(ExecutorError::Shutdown);
        }
        self.tracker.spawn_on(async move { task() }, &self.handle);
        Ok(())
    }

    fn shutdown(&self) {
        if !self.closed.is_cancelled() {
            trace!(in_flight = self.tracker.len(), "shutting down executor");
        }
        self.closed.cancel();
        self.tracker.close();
    }

    fn shutdown_now(&self) -> Vec<Task> {
        // Spawned tasks belong to the runtime and cannot be taken back.
        self.shutdown();
        Vec::new()
    }

    fn is_shutdown(&self) -> bool {
        self.closed.is_cancelled()
    }
}
