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

//! Payloads exchanged by remote callers and listeners.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::{ActiveError, CallResult};
use crate::message::Invocation;

/// Schema tag carried by every request payload.
pub const REQUEST_SCHEMA: &str = "acton-active.request.v1";

/// Schema tag carried by every response payload.
pub const RESPONSE_SCHEMA: &str = "acton-active.response.v1";

/// An invocation on its way to a remote actor.
///
/// # Wire Format
///
/// ```json
/// {
///   "schema": "acton-active.request.v1",
///   "interfaceId": "counter",
///   "methodSignature": "increment",
///   "arguments": [1],
///   "invocationId": 7,
///   "oneWay": false
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRequest {
    /// Payload schema tag.
    pub schema: String,
    /// Interface the target actor was exposed under.
    pub interface_id: String,
    /// Method to run.
    pub method_signature: String,
    /// Encoded arguments, in order.
    #[serde(default)]
    pub arguments: Vec<Value>,
    /// Correlation id echoed in the response.
    pub invocation_id: u64,
    /// Whether the caller waits for a response.
    #[serde(default)]
    pub one_way: bool,
}

impl WireRequest {
    /// Frames `invocation` for the actor exposed as `interface_id`.
    #[must_use]
    pub fn new(interface_id: &str, invocation: Invocation, one_way: bool) -> Self {
        Self {
            schema: REQUEST_SCHEMA.to_string(),
            interface_id: interface_id.to_string(),
            method_signature: invocation.method,
            arguments: invocation.arguments,
            invocation_id: invocation.invocation_id,
            one_way,
        }
    }

    /// Checks the schema tag.
    ///
    /// # Errors
    ///
    /// [`ActiveError::Protocol`] for any other schema.
    pub fn validate(&self) -> Result<(), ActiveError> {
        if self.schema == REQUEST_SCHEMA {
            Ok(())
        } else {
            Err(ActiveError::Protocol(format!(
                "unsupported request schema {:?}",
                self.schema
            )))
        }
    }

    /// The invocation to enqueue on the local actor, keeping the caller's id.
    #[must_use]
    pub fn into_invocation(self) -> Invocation {
        Invocation::with_id(self.invocation_id, self.method_signature, self.arguments)
    }
}

/// Outcome flag of a [`WireResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireStatus {
    /// The method returned a value.
    Ok,
    /// The call failed; the response carries the error.
    Error,
}

/// The outcome of a remote invocation.
///
/// The error is the same [`ActiveError`] a local caller would have seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireResponse {
    /// Payload schema tag.
    pub schema: String,
    /// Id of the invocation this answers.
    pub invocation_id: u64,
    /// Whether `result` or `error` is set.
    pub status: WireStatus,
    /// Encoded return value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ActiveError>,
}

impl WireResponse {
    /// Frames the outcome of invocation `invocation_id`.
    #[must_use]
    pub fn from_result(invocation_id: u64, result: &CallResult) -> Self {
        match result {
            Ok(value) => Self {
                schema: RESPONSE_SCHEMA.to_string(),
                invocation_id,
                status: WireStatus::Ok,
                result: Some(value.clone()),
                error: None,
            },
            Err(error) => Self::error(invocation_id, error.clone()),
        }
    }

    /// An error response.
    #[must_use]
    pub fn error(invocation_id: u64, error: ActiveError) -> Self {
        Self {
            schema: RESPONSE_SCHEMA.to_string(),
            invocation_id,
            status: WireStatus::Error,
            result: None,
            error: Some(error),
        }
    }

    /// Unpacks the outcome for the waiting caller.
    ///
    /// # Errors
    ///
    /// The carried error, or [`ActiveError::Protocol`] when the schema is unknown or an
    /// error response carries no error.
    pub fn into_result(self) -> CallResult {
        if self.schema != RESPONSE_SCHEMA {
            return Err(ActiveError::Protocol(format!(
                "unsupported response schema {:?}",
                self.schema
            )));
        }
        match self.status {
            WireStatus::Ok => Ok(self.result.unwrap_or(Value::Null)),
            WireStatus::Error => Err(self.error.unwrap_or_else(|| {
                ActiveError::Protocol("error response without an error".to_string())
            })),
        }
    }
}
