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


use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{trace, warn};

use super::{Executor, ExecutorError, ExecutorRef, Task};

/// Bounds how many tasks run at once on a wrapped executor.
///
/// Submitted tasks wait in a FIFO queue; at most `max_concurrency` drain tasks
/// are in flight on the wrapped executor at any time. Each drain task runs one
/// queued task and then resubmits itself, so no task ever runs on the thread
/// that submitted it and a long queue never grows the stack. With a
/// concurrency of one the queue runs strictly in order, except for tasks
/// pushed to the front with [`execute_next`](ThrottledExecutor::execute_next).
#[derive(Clone)]
pub struct ThrottledExecutor {
    inner: Arc<Throttle>,
}

struct Throttle {
    target: ExecutorRef,
    max_concurrency: usize,
    state: Mutex<ThrottleState>,
    closed: AtomicBool,
}

#[derive(Default)]
struct ThrottleState {
    commands: VecDeque<Queued>,
    pending: usize,
    tickets: u64,
}

/// A waiting task, tagged so a refused submission can take it back.
struct Queued {
    ticket: u64,
    task: Task,
}

impl fmt::Debug for ThrottledExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ThrottledExecutor")
            .field("max_concurrency", &self.inner.max_concurrency)
            .field("queued", &state.commands.len())
            .field("pending", &state.pending)
            .finish()
    }
}

impl ThrottledExecutor {
    /// Wraps `target`, allowing at most `max_concurrency` tasks to run at once.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::InvalidConcurrency`] if `max_concurrency` is zero.
    pub fn new(target: ExecutorRef, max_concurrency: usize) -> Result<Self, ExecutorError> {
        if max_concurrency == 0 {
            return Err(ExecutorError::InvalidConcurrency(max_concurrency));
        }
        Ok(Self {
            inner: Arc::new(Throttle {
                target,
                max_concurrency,
                state: Mutex::new(ThrottleState::default()),
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Wraps `target` so that its tasks run one at a time.
    #[must_use]
    pub fn sequential(target: ExecutorRef) -> Self {
        Self {
            inner: Arc::new(Throttle {
                target,
                max_concurrency: 1,
                state: Mutex::new(ThrottleState::default()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Queues `task` ahead of everything already waiting.
    ///
    /// # Errors
    ///
    /// Fails if this executor was shut down or the wrapped executor refused
    /// the drain task.
    pub fn execute_next(&self, task: Task) -> Result<(), ExecutorError> {
        self.enqueue(task, true)
    }

    /// Returns the number of tasks waiting to run.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.inner.state.lock().commands.len()
    }

    /// Returns the concurrency bound.
    #[must_use]
    pub fn max_concurrency(&self) -> usize {
        self.inner.max_concurrency
    }

    /// Returns the wrapped executor.
    #[must_use]
    pub fn target(&self) -> &ExecutorRef {
        &self.inner.target
    }

    fn enqueue(&self, task: Task, front: bool) -> Result<(), ExecutorError> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(ExecutorError::Shutdown);
        }
        let (ticket, dispatch) = {
            let mut state = self.inner.state.lock();
            state.tickets += 1;
            let ticket = state.tickets;
            let queued = Queued { ticket, task };
            if front {
                state.commands.push_front(queued);
            } else {
                state.commands.push_back(queued);
            }
            let dispatch = state.pending < self.inner.max_concurrency;
            if dispatch {
                state.pending += 1;
            }
            (ticket, dispatch)
        };
        if !dispatch {
            return Ok(());
        }
        let Err(error) = Throttle::dispatch(&self.inner) else {
            return Ok(());
        };
        // A drain already in flight may have taken the task; then it still runs.
        match self.inner.withdraw(ticket) {
            Some(_refused) => Err(error),
            None => Ok(()),
        }
    }
}

impl Throttle {
    /// Takes a task back out of the queue, unless a drain already took it.
    fn withdraw(&self, ticket: u64) -> Option<Task> {
        let mut state = self.state.lock();
        let index = state.commands.iter().position(|queued| queued.ticket == ticket)?;
        state.commands.remove(index).map(|queued| queued.task)
    }

    fn dispatch(this: &Arc<Self>) -> Result<(), ExecutorError> {
        let throttle = Arc::clone(this);
        this.target
            .execute(Box::new(move || Throttle::drain(&throttle)))
            .inspect_err(|_| this.state.lock().pending -= 1)
    }

    fn drain(this: &Arc<Self>) {
        let command = {
            let mut state = this.state.lock();
            match state.commands.pop_front() {
                Some(queued) => queued.task,
                None => {
                    state.pending -= 1;
                    trace!(pending = state.pending, "throttle queue drained");
                    return;
                }
            }
        };
        let _resubmit = Resubmit(this);
        command();
    }
}

/// Hands the drain slot back to the wrapped executor, even if the command panicked.
struct Resubmit<'a>(&'a Arc<Throttle>);

impl Drop for Resubmit<'_> {
    fn drop(&mut self) {
        if let Err(error) = Throttle::dispatch(self.0) {
            let stranded = self.0.state.lock().commands.len();
            warn!(%error, stranded, "throttled executor could not resubmit its drain task");
        }
    }
}

impl Executor for ThrottledExecutor {
    fn execute(&self, task: Task) -> Result<(), ExecutorError> {
        self.enqueue(task, false)
    }

    fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.target.shutdown();
    }

    fn shutdown_now(&self) -> Vec<Task> {
        self.inner.closed.store(true, Ordering::Release);
        let mut unstarted: Vec<Task> = self
            .inner
            .state
            .lock()
            .commands
            .drain(..)
            .map(|queued| queued.task)
            .collect();
        unstarted.extend(self.inner.target.shutdown_now());
        unstarted
    }

    fn is_shutdown(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}
