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
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{debug, instrument, trace, warn};

use crate::actor::{Actor, ActorCell};
use crate::common::{StageConfig, StageError};
use crate::executor::{DecoratorCache, Executor, ExecutorRef, PriorityExecutor, PriorityRegistry, ScheduledExecutor, TokioExecutor};
use crate::traits::Role;

/// Owns a set of actors and the executors they share.
///
/// A stage is the entry point of the runtime. It registers actors by id,
/// hands out the default executor and the decorators built on it, and shuts
/// everything down together.
///
/// ```rust,ignore
/// let stage = Stage::launch()?;
/// let echo = stage.actor("echo", Script::new(|_| {
///     Ok(BehaviorBuilder::new()
///         .on_any(|message, envelop, agent| {
///             agent.reply(envelop, message.clone())?;
///             Ok(())
///         })
///         .build()?)
/// }))?;
/// echo.tell("ping")?;
/// stage.shutdown().await?;
/// ```
#[derive(Clone)]
pub struct Stage {
    inner: Arc<StageInner>,
}

pub(crate) struct StageInner {
    actors: DashMap<String, Actor>,
    executor: Arc<TokioExecutor>,
    handle: Handle,
    pub(crate) config: StageConfig,
    schedulers: DecoratorCache<ScheduledExecutor>,
    priorities: PriorityRegistry,
    vacated: Notify,
}

impl Stage {
    /// Creates a stage on the current Tokio runtime with the configuration
    /// found on disk.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::NoRuntime`] outside a Tokio runtime.
    pub fn launch() -> Result<Self, StageError> {
        let handle = Handle::try_current().map_err(|e| StageError::NoRuntime(e.to_string()))?;
        Ok(Self::with_config(handle, StageConfig::load()))
    }

    /// Creates a stage on `handle` with an explicit configuration.
    #[must_use]
    pub fn with_config(handle: Handle, config: StageConfig) -> Self {
        Self {
            inner: Arc::new(StageInner {
                actors: DashMap::new(),
                executor: Arc::new(TokioExecutor::new(handle.clone())),
                handle,
                config,
                schedulers: DecoratorCache::new(),
                priorities: PriorityRegistry::new(),
                vacated: Notify::new(),
            }),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &StageConfig {
        &self.inner.config
    }

    /// Returns the executor actors run on unless their role picks another.
    #[must_use]
    pub fn default_executor(&self) -> ExecutorRef {
        self.inner.default_executor()
    }

    /// Returns the scheduler for `executor`, shared by everything that asks
    /// for the same executor while it is in use.
    #[must_use]
    pub fn scheduler_for(&self, executor: &ExecutorRef) -> Arc<ScheduledExecutor> {
        self.inner.scheduler_for(executor)
    }

    /// Returns a priority view of `executor`.
    #[must_use]
    pub fn priority(&self, executor: &ExecutorRef, priority: i64) -> PriorityExecutor {
        self.inner.priorities.executor(executor, priority)
    }

    /// Returns a priority view of `executor` at the configured default priority.
    #[must_use]
    pub fn prioritized(&self, executor: &ExecutorRef) -> PriorityExecutor {
        self.priority(executor, self.inner.config.defaults.priority)
    }

    /// Registers an actor without starting it.
    ///
    /// Messages told to it are kept until [`Actor::start`] has run.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::DuplicateId`] if the id is taken and
    /// [`StageError::Role`] if the role cannot provide an executor.
    #[instrument(skip(self, role))]
    pub fn create<R: Role>(&self, id: &str, role: R) -> Result<Actor, StageError> {
        if self.inner.actors.contains_key(id) {
            return Err(StageError::DuplicateId(id.to_string()));
        }
        let cell = ActorCell::new(id.to_string(), Arc::new(role), &self.inner).map_err(StageError::Role)?;
        let actor = Actor::from_cell(Arc::new(cell));
        match self.inner.actors.entry(id.to_string()) {
            Entry::Occupied(_) => Err(StageError::DuplicateId(id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(actor.clone());
                debug!("actor created");
                Ok(actor)
            }
        }
    }

    /// Registers and starts an actor.
    ///
    /// # Errors
    ///
    /// See [`create`](Stage::create); a refused start is returned as
    /// [`StageError::Actor`].
    pub fn actor<R: Role>(&self, id: &str, role: R) -> Result<Actor, StageError> {
        let actor = self.create(id, role)?;
        actor.start()?;
        Ok(actor)
    }

    /// Looks up an actor by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Actor> {
        self.inner.actors.get(id).map(|entry| entry.value().clone())
    }

    /// Dismisses and unregisters an actor, returning it if it was known.
    pub fn remove(&self, id: &str) -> Option<Actor> {
        let actor = self.get(id)?;
        if let Err(refused) = actor.remove() {
            trace!(%id, "{refused}");
            actor.unregister();
        }
        Some(actor)
    }

    /// Returns the number of registered actors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.actors.len()
    }

    /// Returns `true` if no actor is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.actors.is_empty()
    }

    /// Returns the ids of all registered actors.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.inner.actors.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Dismisses every actor, cancels pending schedules and shuts the default
    /// executor down.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::ShutdownTimeout`] if actors or tasks are still
    /// running when the configured timeout passes.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<(), StageError> {
        let timeout = self.inner.config.shutdown_timeout();
        let actors: Vec<Actor> = self.inner.actors.iter().map(|entry| entry.value().clone()).collect();
        debug!(actors = actors.len(), "shutting down");
        for actor in &actors {
            if let Err(refused) = actor.dismiss() {
                trace!("{refused}");
            }
        }
        let vacated = tokio::time::timeout(timeout, async {
            loop {
                let notified = self.inner.vacated.notified();
                if self.inner.actors.is_empty() {
                    break;
                }
                notified.await;
            }
        })
        .await
        .is_ok();
        if !vacated {
            warn!(remaining = self.inner.actors.len(), "actors still registered at shutdown timeout");
        }
        for scheduler in self.inner.schedulers.live() {
            scheduler.cancel_all();
        }
        self.inner.executor.shutdown();
        let drained = self.inner.executor.terminated(timeout).await;
        if vacated && drained {
            Ok(())
        } else {
            Err(StageError::ShutdownTimeout)
        }
    }
}

impl StageInner {
    pub(crate) fn default_executor(&self) -> ExecutorRef {
        self.executor.clone()
    }

    pub(crate) fn scheduler_for(&self, executor: &ExecutorRef) -> Arc<ScheduledExecutor> {
        self.schedulers.get_or_insert_with(executor, || {
            ScheduledExecutor::new(Arc::clone(executor), self.handle.clone())
        })
    }

    /// Forgets `actor` if it is still the one registered under its id.
    pub(crate) fn unregister(&self, actor: &Actor) {
        if self.actors.remove_if(actor.id(), |_, known| known == actor).is_some() {
            trace!(actor = %actor.id(), "unregistered");
        }
        if self.actors.is_empty() {
            self.vacated.notify_waiters();
        }
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("actors", &self.inner.actors.len())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
