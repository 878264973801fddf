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

use thiserror::Error;

/// Errors raised when submitting work or configuring an executor.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutorError {
    /// The executor has been shut down and accepts no further work.
    #[error("executor has been shut down")]
    Shutdown,

    /// The executor refused the task.
    #[error("task rejected: {0}")]
    Rejected(String),

    /// A throttled executor was configured without any concurrency.
    #[error("max concurrency must be at least 1, got {0}")]
    InvalidConcurrency(usize),

    /// A periodic schedule was configured with a zero period.
    #[error("period must be greater than zero")]
    InvalidPeriod,
}

/// The ways a [`TaskFuture`](super::TaskFuture) can end without a value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    /// The task was cancelled before it produced a value.
    #[error("task was cancelled")]
    Cancelled,

    /// Waiting for the result took longer than the caller allowed.
    ///
    /// The task itself may still complete later.
    #[error("timed out waiting for the task result")]
    Timeout,

    /// The task did not finish within the deadline of a
    /// [`TimeoutExecutor`](super::TimeoutExecutor).
    #[error("task expired after {0:?}")]
    Expired(Duration),

    /// The task panicked.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The executor refused the task.
    #[error("task was rejected")]
    Rejected(#[from] ExecutorError),
}
