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
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use parking_lot::Mutex;
use stagehand::prelude::*;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

// Declare the submodules.
pub mod messages;

// Ensures tracing initialization happens only once across all tests.
static INIT: Once = Once::new();

/// Initializes the global tracing subscriber for tests.
///
/// Everything is written to `logs/stagehand_tests.txt` through a
/// non-blocking appender. `RUST_LOG` overrides the default filter.
pub fn initialize_tracing() {
    INIT.call_once(|| {
        std::fs::create_dir_all("logs").expect("could not create logs dir");

        let file_appender = RollingFileAppender::new(Rotation::NEVER, "logs", "stagehand_tests.txt");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        // Leak the guard so the non-blocking writer is not dropped before process exit
        Box::leak(Box::new(guard));

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info")
                .add_directive("stagehand::actor=trace".parse().unwrap())
                .add_directive("stagehand::executor=debug".parse().unwrap())
        });

        let subscriber = FmtSubscriber::builder()
            .with_span_events(FmtSpan::NONE)
            .with_max_level(Level::TRACE)
            .compact()
            .with_line_number(true)
            .without_time()
            .with_target(true)
            .with_env_filter(filter)
            .with_writer(non_blocking)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .expect("setting default subscriber failed");
    });
}

/// Messages seen by a [`recorder`] actor, in arrival order.
pub type Inbox = Arc<Mutex<Vec<Message>>>;

/// A role whose actor keeps every message it receives.
pub fn recorder(inbox: &Inbox) -> impl Role {
    let inbox = Arc::clone(inbox);
    Script::new(move |_: &str| {
        let inbox = Arc::clone(&inbox);
        Ok(BehaviorBuilder::new()
            .on_any(move |message, _, _| {
                inbox.lock().push(message.clone());
                Ok(())
            })
            .build()?)
    })
}

/// Returns the recorded payloads of type `T`.
pub fn recorded<T: Clone + Send + Sync + 'static>(inbox: &Inbox) -> Vec<T> {
    inbox
        .lock()
        .iter()
        .filter_map(|message| message.downcast_ref::<T>().cloned())
        .collect()
}

/// A stage on the current runtime with the given restart limits.
pub fn stage_with(restart: RestartLimiterConfig) -> Stage {
    let config = StageConfig {
        restart,
        ..StageConfig::default()
    };
    Stage::with_config(tokio::runtime::Handle::current(), config)
}

/// Polls `condition` until it holds or two seconds pass.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Awaits `future` for at most two seconds.
pub async fn within<F: Future>(future: F) -> anyhow::Result<F::Output> {
    Ok(tokio::time::timeout(Duration::from_secs(2), future).await?)
}

/// An executor that only runs tasks when the test says so.
#[derive(Default)]
pub struct ManualExecutor {
    queue: Mutex<VecDeque<Task>>,
    closed: AtomicBool,
}

impl ManualExecutor {
    /// Runs the oldest queued task; returns `false` if there was none.
    pub fn run_one(&self) -> bool {
        let next = self.queue.lock().pop_front();
        next.map(|task| task()).is_some()
    }

    /// Runs tasks, including ones queued meanwhile, until none is left.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        while self.run_one() {
            ran += 1;
        }
        ran
    }

    /// Returns the number of queued tasks.
    pub fn queued(&self) -> usize {
        self.queue.lock().len()
    }
}

impl Executor for ManualExecutor {
    fn execute(&self, task: Task) -> Result<(), ExecutorError> {
        if self.is_shutdown() {
            return Err(ExecutorError::Shutdown);
        }
        self.queue.lock().push_back(task);
        Ok(())
    }

    fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn shutdown_now(&self) -> Vec<Task> {
        self.shutdown();
        self.queue.lock().drain(..).collect()
    }

    fn is_shutdown(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
