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


use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use super::{Executor, ExecutorError, ExecutorExt, ExecutorRef, Task, TaskError, TaskFuture};

/// How a periodic schedule computes its next deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// The next deadline is the previous deadline plus this period.
    FixedRate(Duration),
    /// The next deadline is the completion time of the previous run plus this delay.
    FixedDelay(Duration),
}

impl Period {
    /// Returns the configured period or delay.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        match self {
            Self::FixedRate(period) | Self::FixedDelay(period) => *period,
        }
    }
}

/// Runs work on a target executor after a delay, once or periodically.
///
/// Timers run on a Tokio runtime; when a deadline passes, the work is
/// submitted to the target executor. Pending schedules are tracked by
/// deadline and can be inspected or cancelled together.
#[derive(Clone)]
pub struct ScheduledExecutor {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    target: ExecutorRef,
    handle: Handle,
    schedules: Mutex<BTreeMap<(Instant, u64), CancellationToken>>,
    next_key: AtomicU64,
    closed: CancellationToken,
}

impl fmt::Debug for ScheduledExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledExecutor")
            .field("pending", &self.pending())
            .field("closed", &self.inner.closed.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl ScheduledExecutor {
    /// Schedules onto `target`, running timers on `handle`.
    #[must_use]
    pub fn new(target: ExecutorRef, handle: Handle) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                target,
                handle,
                schedules: Mutex::new(BTreeMap::new()),
                next_key: AtomicU64::new(0),
                closed: CancellationToken::new(),
            }),
        }
    }

    /// Returns the executor scheduled work runs on.
    #[must_use]
    pub fn target(&self) -> &ExecutorRef {
        &self.inner.target
    }

    /// Runs `work` once after `delay`.
    ///
    /// After [`shutdown`](Executor::shutdown) the returned future is already
    /// done with a rejection.
    pub fn schedule<T, F>(&self, delay: Duration, work: F) -> ScheduledFuture<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let deadline = Instant::now() + delay;
        let future = ScheduledFuture::new(deadline, None, self.inner.closed.child_token());
        if self.inner.closed.is_cancelled() {
            future.reject(ExecutorError::Shutdown);
            return future;
        }
        let registration = Registration::new(&self.inner, deadline, future.shared.timer.clone());
        let scheduled = future.clone();
        let target = Arc::clone(&self.inner.target);
        self.inner.handle.spawn(async move {
            let _registration = registration;
            tokio::select! {
                () = scheduled.shared.timer.cancelled() => {
                    trace!("scheduled task cancelled before its deadline");
                }
                () = tokio::time::sleep_until(deadline) => {
                    if !scheduled.shared.claimed.swap(true, Ordering::SeqCst) {
                        scheduled.dispatch(&target, work);
                    }
                }
            }
        });
        future
    }

    /// Runs `work` every `period`, starting after `initial`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::InvalidPeriod`] for a zero period and
    /// [`ExecutorError::Shutdown`] after shutdown.
    pub fn schedule_at_fixed_rate<F>(
        &self,
        initial: Duration,
        period: Duration,
        work: F,
    ) -> Result<ScheduledFuture<()>, ExecutorError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.schedule_periodic(initial, Period::FixedRate(period), work)
    }

    /// Runs `work` repeatedly with `delay` between the end of one run and the
    /// start of the next, starting after `initial`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::InvalidPeriod`] for a zero delay and
    /// [`ExecutorError::Shutdown`] after shutdown.
    pub fn schedule_with_fixed_delay<F>(
        &self,
        initial: Duration,
        delay: Duration,
        work: F,
    ) -> Result<ScheduledFuture<()>, ExecutorError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.schedule_periodic(initial, Period::FixedDelay(delay), work)
    }

    /// Runs `work` repeatedly according to `period`, starting after `initial`.
    ///
    /// Runs never overlap. The schedule ends when it is cancelled or when a
    /// run fails (panics, is rejected or is cancelled on the target).
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::InvalidPeriod`] for a zero period and
    /// [`ExecutorError::Shutdown`] after shutdown.
    pub fn schedule_periodic<F>(
        &self,
        initial: Duration,
        period: Period,
        work: F,
    ) -> Result<ScheduledFuture<()>, ExecutorError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        if period.duration().is_zero() {
            return Err(ExecutorError::InvalidPeriod);
        }
        if self.inner.closed.is_cancelled() {
            return Err(ExecutorError::Shutdown);
        }
        let first = Instant::now() + initial;
        let future = ScheduledFuture::new(first, Some(period), self.inner.closed.child_token());
        let mut registration = Registration::new(&self.inner, first, future.shared.timer.clone());
        let scheduled = future.clone();
        let target = Arc::clone(&self.inner.target);
        let work = Arc::new(work);
        self.inner.handle.spawn(async move {
            let timer = scheduled.shared.timer.clone();
            let mut deadline = first;
            loop {
                tokio::select! {
                    () = timer.cancelled() => break,
                    () = tokio::time::sleep_until(deadline) => {}
                }
                let work = Arc::clone(&work);
                let run = scheduled.dispatch(&target, move || (*work)());
                let outcome = tokio::select! {
                    () = timer.cancelled() => break,
                    outcome = run.get() => outcome,
                };
                if let Err(error) = outcome {
                    warn!(%error, "periodic task failed, no further runs");
                    scheduled.finish();
                    break;
                }
                deadline = match period {
                    Period::FixedRate(period) => deadline + period,
                    Period::FixedDelay(delay) => Instant::now() + delay,
                };
                *scheduled.shared.deadline.lock() = deadline;
                registration.move_to(deadline);
            }
        });
        Ok(future)
    }

    /// Returns the number of schedules waiting for their next deadline.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.schedules.lock().len()
    }

    /// Returns the earliest pending deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.inner
            .schedules
            .lock()
            .keys()
            .next()
            .map(|(deadline, _)| *deadline)
    }

    /// Cancels every pending schedule but keeps accepting new ones.
    pub fn cancel_all(&self) -> usize {
        let timers: Vec<CancellationToken> = self.inner.schedules.lock().values().cloned().collect();
        for timer in &timers {
            timer.cancel();
        }
        timers.len()
    }
}

impl Executor for ScheduledExecutor {
    fn execute(&self, task: Task) -> Result<(), ExecutorError> {
        if self.inner.closed.is_cancelled() {
            return Err(ExecutorError::Shutdown);
        }
        self.inner.target.execute(task)
    }

    fn shutdown(&self) {
        self.inner.closed.cancel();
        self.inner.target.shutdown();
    }

    fn shutdown_now(&self) -> Vec<Task> {
        self.inner.closed.cancel();
        self.inner.target.shutdown_now()
    }

    fn is_shutdown(&self) -> bool {
        self.inner.closed.is_cancelled()
    }
}

/// Keeps a schedule listed under its current deadline while its timer task lives.
struct Registration {
    scheduler: Arc<SchedulerInner>,
    key: (Instant, u64),
}

impl Registration {
    fn new(scheduler: &Arc<SchedulerInner>, deadline: Instant, timer: CancellationToken) -> Self {
        let key = (deadline, scheduler.next_key.fetch_add(1, Ordering::Relaxed));
        scheduler.schedules.lock().insert(key, timer);
        Self {
            scheduler: Arc::clone(scheduler),
            key,
        }
    }

    fn move_to(&mut self, deadline: Instant) {
        let mut schedules = self.scheduler.schedules.lock();
        if let Some(timer) = schedules.remove(&self.key) {
            self.key.0 = deadline;
            schedules.insert(self.key, timer);
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.scheduler.schedules.lock().remove(&self.key);
    }
}

/// The handle to a delayed or periodic schedule.
///
/// Before the deadline the schedule only exists as a timer; once it fires the
/// work is submitted and its [`TaskFuture`] becomes the result source. For a
/// periodic schedule [`get`](ScheduledFuture::get) resolves with the most
/// recent run.
pub struct ScheduledFuture<T> {
    shared: Arc<ScheduledShared<T>>,
}

struct ScheduledShared<T> {
    period: Option<Period>,
    deadline: Mutex<Instant>,
    timer: CancellationToken,
    claimed: AtomicBool,
    cancelled: AtomicBool,
    current: Mutex<Option<TaskFuture<T>>>,
    dispatched: Notify,
}

impl<T> Clone for ScheduledFuture<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for ScheduledFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledFuture")
            .field("period", &self.shared.period)
            .field("deadline", &*self.shared.deadline.lock())
            .field("cancelled", &self.shared.cancelled.load(Ordering::SeqCst))
            .finish()
    }
}

impl<T: Send + 'static> ScheduledFuture<T> {
    fn new(deadline: Instant, period: Option<Period>, timer: CancellationToken) -> Self {
        Self {
            shared: Arc::new(ScheduledShared {
                period,
                deadline: Mutex::new(deadline),
                timer,
                claimed: AtomicBool::new(false),
                cancelled: AtomicBool::new(false),
                current: Mutex::new(None),
                dispatched: Notify::new(),
            }),
        }
    }

    fn dispatch<F>(&self, target: &ExecutorRef, work: F) -> TaskFuture<T>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let run = target.submit(work);
        *self.shared.current.lock() = Some(run.clone());
        self.shared.dispatched.notify_waiters();
        run
    }

    fn reject(&self, cause: ExecutorError) {
        self.shared.claimed.store(true, Ordering::SeqCst);
        *self.shared.current.lock() = Some(TaskFuture::ready(Err(cause.into())));
        self.shared.dispatched.notify_waiters();
    }

    fn finish(&self) {
        self.shared.claimed.store(true, Ordering::SeqCst);
        self.shared.timer.cancel();
        self.shared.dispatched.notify_waiters();
    }

    /// Returns the current deadline.
    #[must_use]
    pub fn deadline(&self) -> Instant {
        *self.shared.deadline.lock()
    }

    /// Returns the time left until the current deadline, zero once it has passed.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.deadline().saturating_duration_since(Instant::now())
    }

    /// Returns the period of a periodic schedule.
    #[must_use]
    pub fn period(&self) -> Option<Period> {
        self.shared.period
    }

    /// Returns `true` for periodic schedules.
    #[must_use]
    pub fn is_periodic(&self) -> bool {
        self.shared.period.is_some()
    }

    /// Cancels the timer and, if the work was already submitted, its task.
    ///
    /// Returns `true` if either was still cancellable. A run that has already
    /// started is not interrupted.
    pub fn cancel(&self) -> bool {
        let timer_stopped = !self.shared.claimed.swap(true, Ordering::SeqCst);
        self.shared.timer.cancel();
        let run_stopped = self
            .shared
            .current
            .lock()
            .as_ref()
            .is_some_and(TaskFuture::cancel);
        self.shared.dispatched.notify_waiters();
        let cancelled = timer_stopped || run_stopped;
        if cancelled {
            self.shared.cancelled.store(true, Ordering::SeqCst);
        }
        cancelled
    }

    /// Returns `true` if a call to [`cancel`](ScheduledFuture::cancel) succeeded.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `true` once the schedule can produce no further result.
    #[must_use]
    pub fn is_done(&self) -> bool {
        if self.is_cancelled() || self.shared.timer.is_cancelled() {
            return true;
        }
        !self.is_periodic()
            && self
                .shared
                .current
                .lock()
                .as_ref()
                .is_some_and(TaskFuture::is_done)
    }

    async fn dispatched(&self) -> Result<TaskFuture<T>, TaskError> {
        loop {
            let notified = self.shared.dispatched.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            let current = self.shared.current.lock().clone();
            if let Some(run) = current {
                return Ok(run);
            }
            if self.shared.timer.is_cancelled() {
                return Err(TaskError::Cancelled);
            }
            notified.await;
        }
    }

    /// Waits for the deadline to pass and the submitted work to finish.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Cancelled`] if the schedule was cancelled before
    /// the work was submitted, otherwise the error of the run itself.
    pub async fn get(&self) -> Result<T, TaskError>
    where
        T: Clone,
    {
        self.dispatched().await?.get().await
    }

    /// Like [`get`](ScheduledFuture::get), but gives up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Timeout`] if nothing is available in time.
    pub async fn get_timeout(&self, timeout: Duration) -> Result<T, TaskError>
    where
        T: Clone,
    {
        tokio::time::timeout(timeout, self.get())
            .await
            .map_err(|_| TaskError::Timeout)?
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::executor::TokioExecutor;

    fn scheduler() -> ScheduledExecutor {
        let handle = Handle::current();
        ScheduledExecutor::new(Arc::new(TokioExecutor::new(handle.clone())), handle)
    }

    #[tokio::test]
    async fn delayed_work_runs_after_its_deadline() {
        let scheduler = scheduler();
        let started = Instant::now();
        let future = scheduler.schedule(Duration::from_millis(30), || "late");
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(future.get().await, Ok("late"));
        assert!(started.elapsed() >= Duration::from_millis(30));
        assert!(future.is_done());
    }

    #[tokio::test]
    async fn cancel_before_the_deadline_prevents_the_run() {
        let scheduler = scheduler();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        let future = scheduler.schedule(Duration::from_millis(50), move || flag.store(true, Ordering::SeqCst));
        assert!(future.cancel());
        assert!(future.is_cancelled());
        assert_eq!(future.get().await, Err(TaskError::Cancelled));
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn cancel_after_completion_reports_false() {
        let scheduler = scheduler();
        let future = scheduler.schedule(Duration::ZERO, || 1_u8);
        assert_eq!(future.get().await, Ok(1));
        assert!(!future.cancel());
        assert!(!future.is_cancelled());
    }

    #[tokio::test]
    async fn get_timeout_expires_while_the_timer_waits() {
        let scheduler = scheduler();
        let future = scheduler.schedule(Duration::from_secs(30), || ());
        assert_eq!(
            future.get_timeout(Duration::from_millis(10)).await,
            Err(TaskError::Timeout)
        );
        assert!(future.cancel());
    }

    #[tokio::test]
    async fn zero_period_is_a_configuration_error() {
        let scheduler = scheduler();
        assert_eq!(
            scheduler
                .schedule_at_fixed_rate(Duration::ZERO, Duration::ZERO, || {})
                .unwrap_err(),
            ExecutorError::InvalidPeriod
        );
    }

    #[tokio::test]
    async fn fixed_rate_keeps_running_until_cancelled() {
        let scheduler = scheduler();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let future = scheduler
            .schedule_at_fixed_rate(Duration::ZERO, Duration::from_millis(10), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        tokio::time::sleep(Duration::from_millis(75)).await;
        assert!(future.cancel());
        let seen = runs.load(Ordering::SeqCst);
        assert!(seen >= 3, "expected several runs, saw {seen}");
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(runs.load(Ordering::SeqCst) <= seen + 1);
        assert!(future.is_done());
    }

    #[tokio::test]
    async fn fixed_delay_stops_after_a_failed_run() {
        let scheduler = scheduler();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let future = scheduler
            .schedule_with_fixed_delay(Duration::ZERO, Duration::from_millis(5), move || {
                if counter.fetch_add(1, Ordering::SeqCst) == 2 {
                    panic!("third run fails");
                }
            })
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert!(future.is_done());
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn cancel_all_clears_the_registry() {
        let scheduler = scheduler();
        let first = scheduler.schedule(Duration::from_secs(10), || ());
        let second = scheduler.schedule(Duration::from_secs(20), || ());
        assert_eq!(scheduler.next_deadline(), Some(first.deadline()));
        assert_eq!(scheduler.cancel_all(), 2);
        assert_eq!(first.get().await, Err(TaskError::Cancelled));
        assert_eq!(second.get().await, Err(TaskError::Cancelled));
        tokio::task::yield_now().await;
        assert!(scheduler.schedule(Duration::ZERO, || 5).get().await.is_ok());
    }

    #[tokio::test]
    async fn shutdown_rejects_new_schedules() {
        let scheduler = scheduler();
        let pending = scheduler.schedule(Duration::from_secs(10), || ());
        scheduler.shutdown();
        assert_eq!(pending.get().await, Err(TaskError::Cancelled));
        let late = scheduler.schedule(Duration::ZERO, || ());
        assert_eq!(
            late.get().await,
            Err(TaskError::Rejected(ExecutorError::Shutdown))
        );
    }
}
