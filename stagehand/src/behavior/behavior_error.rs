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


use thiserror::Error;

/// Invalid handler registrations, reported by
/// [`BehaviorBuilder::build`](super::BehaviorBuilder::build).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BehaviorError {
    /// A type-set registration was given no types.
    #[error("registration #{registration} matches an empty set of message types")]
    EmptyTypeSet {
        /// Position of the offending registration among all message handlers.
        registration: usize,
    },
}
