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

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

static NEXT_INVOCATION_ID: AtomicU64 = AtomicU64::new(1);

/// A method call addressed to an active object: the method name and its arguments
/// encoded as an ordered list of JSON values.
///
/// Every invocation gets a process-unique id, used to correlate remote replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    /// Correlation id, unique within this process.
    pub invocation_id: u64,
    /// Name of the method to run.
    pub method: String,
    /// Encoded arguments, in order.
    pub arguments: Vec<Value>,
}

impl Invocation {
    /// Creates an invocation with a fresh id.
    pub fn new(method: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            invocation_id: NEXT_INVOCATION_ID.fetch_add(1, Ordering::Relaxed),
            method: method.into(),
            arguments,
        }
    }

    /// Recreates an invocation received from a peer, keeping its id.
    pub(crate) fn with_id(invocation_id: u64, method: String, arguments: Vec<Value>) -> Self {
        Self {
            invocation_id,
            method,
            arguments,
        }
    }
}
