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
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

use super::{panic_message, TaskError};

/// The awaitable result of a closure submitted to an executor.
///
/// Cloning a `TaskFuture` yields another handle to the same result. The
/// closure behind it runs at most once; [`cancel`](TaskFuture::cancel) only
/// succeeds while it has not started.
pub struct TaskFuture<T> {
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    done: Notify,
}

enum Slot<T> {
    Pending,
    Running,
    Done(Result<T, TaskError>),
}

impl<T> Clone for TaskFuture<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for TaskFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.shared.slot.lock() {
            Slot::Pending => "pending",
            Slot::Running => "running",
            Slot::Done(Ok(_)) => "completed",
            Slot::Done(Err(_)) => "failed",
        };
        f.debug_struct("TaskFuture").field("state", &state).finish()
    }
}

impl<T: Send + 'static> TaskFuture<T> {
    pub(crate) fn pending() -> Self {
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot::Pending),
                done: Notify::new(),
            }),
        }
    }

    /// Creates a future that is already done with `result`.
    #[must_use]
    pub fn ready(result: Result<T, TaskError>) -> Self {
        let future = Self::pending();
        future.complete(result);
        future
    }

    /// Runs `work` unless the future was cancelled first, capturing panics.
    pub(crate) fn run<F>(&self, work: F)
    where
        F: FnOnce() -> T,
    {
        {
            let mut slot = self.shared.slot.lock();
            if !matches!(*slot, Slot::Pending) {
                return;
            }
            *slot = Slot::Running;
        }
        let result = panic::catch_unwind(AssertUnwindSafe(work))
            .map_err(|payload| TaskError::Panicked(panic_message(&*payload)));
        self.complete(result);
    }

    /// Stores `result` unless the future is already done.
    pub(crate) fn complete(&self, result: Result<T, TaskError>) -> bool {
        {
            let mut slot = self.shared.slot.lock();
            if matches!(*slot, Slot::Done(_)) {
                return false;
            }
            *slot = Slot::Done(result);
        }
        self.shared.done.notify_waiters();
        true
    }

    /// Fails the future with [`TaskError::Expired`] if it has not completed.
    ///
    /// A closure that is already running keeps running; its result is dropped.
    pub(crate) fn expire(&self, after: Duration) -> bool {
        self.complete(Err(TaskError::Expired(after)))
    }

    /// Prevents the closure from running.
    ///
    /// Returns `true` only if this call stopped the closure before it started.
    pub fn cancel(&self) -> bool {
        {
            let mut slot = self.shared.slot.lock();
            if !matches!(*slot, Slot::Pending) {
                return false;
            }
            *slot = Slot::Done(Err(TaskError::Cancelled));
        }
        self.shared.done.notify_waiters();
        true
    }

    /// Returns `true` once the future holds a value or an error.
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(*self.shared.slot.lock(), Slot::Done(_))
    }

    /// Returns `true` if the future was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(*self.shared.slot.lock(), Slot::Done(Err(TaskError::Cancelled)))
    }

    /// Waits until the future is done, without reading the result.
    pub async fn wait(&self) {
        loop {
            let notified = self.shared.done.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_done() {
                return;
            }
            notified.await;
        }
    }

    /// Waits for the result.
    ///
    /// # Errors
    ///
    /// Returns the [`TaskError`] the task ended with.
    pub async fn get(&self) -> Result<T, TaskError>
    where
        T: Clone,
    {
        self.wait().await;
        match &*self.shared.slot.lock() {
            Slot::Done(result) => result.clone(),
            Slot::Pending | Slot::Running => Err(TaskError::Cancelled),
        }
    }

    /// Waits for the result for at most `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Timeout`] if the result is not available in time,
    /// otherwise the [`TaskError`] the task ended with.
    pub async fn get_timeout(&self, timeout: Duration) -> Result<T, TaskError>
    where
        T: Clone,
    {
        tokio::time::timeout(timeout, self.get())
            .await
            .map_err(|_| TaskError::Timeout)?
    }
}
