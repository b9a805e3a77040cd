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

use tokio::sync::{mpsc, oneshot};

use crate::common::CallResult;
use crate::remote::WireResponse;

/// Where the result of an invocation goes once the actor has processed it.
#[derive(Debug)]
pub enum ReplyTarget {
    /// A local caller awaiting the result.
    OneShot(oneshot::Sender<CallResult>),
    /// A remote caller: the result is framed and queued on the connection it came from.
    Remote {
        /// Correlation id echoed back to the caller.
        invocation_id: u64,
        /// Outbound queue of the originating connection.
        outbound: mpsc::Sender<WireResponse>,
    },
    /// A one-way call; nobody receives the result.
    Discard,
}

impl ReplyTarget {
    /// Hands `result` to whoever is waiting for it.
    ///
    /// Returns the result back as `Err` when nobody received it: the local caller went
    /// away, the connection closed, or the call was one-way.
    pub(crate) async fn deliver(self, result: CallResult) -> Result<(), CallResult> {
        match self {
            Self::OneShot(reply) => reply.send(result),
            Self::Remote {
                invocation_id,
                outbound,
            } => {
                let response = WireResponse::from_result(invocation_id, &result);
                outbound.send(response).await.map_err(|_| result)
            }
            Self::Discard => match result {
                Ok(_) => Ok(()),
                Err(error) => Err(Err(error)),
            },
        }
    }

    /// Whether the caller expects no result.
    #[must_use]
    pub const fn is_one_way(&self) -> bool {
        matches!(self, Self::Discard)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::common::ActiveError;

    #[tokio::test]
    async fn one_shot_reports_a_departed_caller() {
        let (tx, rx) = oneshot::channel();
        drop(rx);
        let undelivered = ReplyTarget::OneShot(tx).deliver(Ok(json!(1))).await;
        assert_eq!(undelivered, Err(Ok(json!(1))));
    }

    #[tokio::test]
    async fn discarded_failures_are_returned() {
        let undelivered = ReplyTarget::Discard
            .deliver(Err(ActiveError::application("boom")))
            .await;
        assert_eq!(undelivered, Err(Err(ActiveError::application("boom"))));
        assert_eq!(ReplyTarget::Discard.deliver(Ok(json!(null))).await, Ok(()));
    }

    #[tokio::test]
    async fn remote_replies_carry_the_invocation_id() {
        let (outbound, mut frames) = mpsc::channel(1);
        ReplyTarget::Remote {
            invocation_id: 42,
            outbound,
        }
        .deliver(Ok(json!("done")))
        .await
        .unwrap();
        let response = frames.recv().await.unwrap();
        assert_eq!(response.invocation_id, 42);
        assert_eq!(response.into_result(), Ok(json!("done")));
    }
}
