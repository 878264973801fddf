//! Executors and the decorators layered on top of them.
//!
//! Everything in Stagehand runs as a [`Task`] submitted to an [`Executor`].
//! The default pool is [`TokioExecutor`]; the decorators in this module
//! ([`ThrottledExecutor`], [`PriorityExecutor`], [`TimeoutExecutor`] and
//! [`ScheduledExecutor`]) wrap any other executor and add ordering,
//! prioritisation, deadlines or timers. Executors are shared as
//! [`ExecutorRef`] (`Arc<dyn Executor>`) and compared by pointer identity.

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
use std::sync::Arc;

// --- Public Re-exports ---
pub use executor_error::{ExecutorError, TaskError};
pub use priority::{PriorityExecutor, PriorityRegistry};
pub use registry::DecoratorCache;
pub use scheduled::{Period, ScheduledExecutor, ScheduledFuture};
pub use task_future::TaskFuture;
pub use throttled::ThrottledExecutor;
pub use timeout::TimeoutExecutor;
pub use tokio_executor::TokioExecutor;

// --- Submodules ---

/// Defines the error types raised by executors and task futures.
mod executor_error;
/// Defines the priority decorator and its shared contexts.
mod priority;
/// Defines the weak, identity-keyed cache used for per-executor decorators.
mod registry;
/// Defines delayed and periodic scheduling.
mod scheduled;
/// Defines the awaitable result of a submitted closure.
mod task_future;
/// Defines the bounded-concurrency decorator.
mod throttled;
/// Defines the deadline decorator.
mod timeout;
/// Defines the default executor backed by a Tokio runtime.
mod tokio_executor;

/// A unit of work accepted by an [`Executor`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// A shared, type-erased executor.
pub type ExecutorRef = Arc<dyn Executor>;

/// Something that runs tasks, now or later, on some thread.
///
/// Implementations must never run a submitted task more than once. Whether a
/// task runs on the calling thread is up to the implementation, but callers in
/// this crate never hold a lock while submitting.
pub trait Executor: Send + Sync + 'static {
    /// Submits a task for execution.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Shutdown`] once the executor no longer accepts work,
    /// or [`ExecutorError::Rejected`] when it refuses the task for another reason.
    fn execute(&self, task: Task) -> Result<(), ExecutorError>;

    /// Stops accepting new work. Tasks already accepted still run.
    fn shutdown(&self);

    /// Stops accepting new work and returns the tasks that never started.
    fn shutdown_now(&self) -> Vec<Task>;

    /// Returns `true` once [`shutdown`](Executor::shutdown) has been called.
    fn is_shutdown(&self) -> bool;
}

/// Closure submission with an awaitable result, available on every executor.
pub trait ExecutorExt: Executor {
    /// Runs `work` on this executor and returns a [`TaskFuture`] for its result.
    ///
    /// The closure is skipped if the future is cancelled before it starts. A
    /// panic inside the closure completes the future with
    /// [`TaskError::Panicked`]; a rejected submission yields a future that is
    /// already done with [`TaskError::Rejected`].
    fn submit<T, F>(&self, work: F) -> TaskFuture<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let future = TaskFuture::pending();
        let slot = future.clone();
        if let Err(rejected) = self.execute(Box::new(move || slot.run(work))) {
            future.complete(Err(TaskError::Rejected(rejected)));
        }
        future
    }
}

impl<E: Executor + ?Sized> ExecutorExt for E {}

/// Returns the pointer identity of an executor, used as a cache key.
#[must_use]
pub fn executor_identity(executor: &ExecutorRef) -> usize {
    Arc::as_ptr(executor).cast::<()>() as usize
}

/// Renders a panic payload as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}
