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

use chrono::{DateTime, Utc};
use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::common::ActiveError;

/// A failure that no caller was waiting for.
///
/// Published on the runtime's failure channel (see
/// [`ActiveRuntime::subscribe_failures`](crate::common::ActiveRuntime::subscribe_failures))
/// for failed one-way calls and for failed calls whose caller had already given up.
#[derive(new, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReport {
    /// Name of the actor that produced the failure.
    pub actor: String,
    /// Interface the actor implements.
    pub interface_id: String,
    /// Method that failed.
    pub method: String,
    /// Id of the failed invocation.
    pub invocation_id: u64,
    /// The failure itself.
    pub error: ActiveError,
    /// When the failure was observed.
    #[new(value = "Utc::now()")]
    pub timestamp: DateTime<Utc>,
}
