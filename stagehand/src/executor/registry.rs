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


use std::sync::{Arc, Weak};

use dashmap::DashMap;

use super::{executor_identity, ExecutorRef};

/// A cache of per-executor decorators, keyed by executor identity.
///
/// Entries are held weakly: a decorator lives only as long as somebody holds
/// the `Arc` returned by [`get_or_insert_with`](DecoratorCache::get_or_insert_with).
/// Dead entries are purged on every lookup.
#[derive(Debug)]
pub struct DecoratorCache<T> {
    entries: DashMap<usize, Weak<T>>,
}

impl<T> Default for DecoratorCache<T> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<T> DecoratorCache<T> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the live decorator for `target`, creating it with `make` if needed.
    pub fn get_or_insert_with(&self, target: &ExecutorRef, make: impl FnOnce() -> T) -> Arc<T> {
        self.purge();
        let mut entry = self
            .entries
            .entry(executor_identity(target))
            .or_insert_with(Weak::new);
        if let Some(existing) = entry.upgrade() {
            return existing;
        }
        let created = Arc::new(make());
        *entry = Arc::downgrade(&created);
        created
    }

    /// Drops entries whose decorator is gone, returning how many were removed.
    pub fn purge(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, decorator| decorator.strong_count() > 0);
        before.saturating_sub(self.entries.len())
    }

    /// Returns every decorator that is still alive.
    #[must_use]
    pub fn live(&self) -> Vec<Arc<T>> {
        self.entries
            .iter()
            .filter_map(|entry| entry.value().upgrade())
            .collect()
    }

    /// Returns the number of entries, live or not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
