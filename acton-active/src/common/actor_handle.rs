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

use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use acton_ern::Ern;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, instrument, trace, warn};

use crate::actor::{MailboxMonitor, MailboxStatus};
use crate::common::{ActiveConfig, ActiveError, ActorSender, CallResult};
use crate::message::{Envelope, Invocation, MailboxItem, ReplyTarget, SystemSignal};

/// A clonable handle for interacting with a running actor.
///
/// The handle enqueues invocations into the actor's mailbox, reports the mailbox
/// status and stops the actor. Equality and hashing are based solely on the actor's
/// unique identifier (`id`).
#[derive(Debug, Clone)]
pub struct ActorHandle {
    /// The unique identifier (`Ern`) for the actor this handle refers to.
    pub(crate) id: Ern,
    /// Human-readable name the actor was created with.
    pub(crate) name: String,
    /// Interface implemented by the actor's dispatch table.
    pub(crate) interface_id: String,
    /// The sender part of the MPSC channel connected to the actor's mailbox.
    pub(crate) outbox: ActorSender,
    /// Status shared with the actor's message loop.
    pub(crate) mailbox: Arc<MailboxMonitor>,
    /// Tracks the actor's main task.
    tracker: TaskTracker,
    /// The actor's cancellation token, a child of the runtime's token.
    pub(crate) cancellation_token: CancellationToken,
    call_timeout: Duration,
    shutdown_timeout: Duration,
}

impl PartialEq for ActorHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ActorHandle {}

impl Hash for ActorHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl ActorHandle {
    pub(crate) fn new(
        id: Ern,
        name: &str,
        interface_id: &str,
        outbox: ActorSender,
        cancellation_token: CancellationToken,
        config: &ActiveConfig,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            interface_id: interface_id.to_string(),
            outbox,
            mailbox: Arc::new(MailboxMonitor::default()),
            tracker: TaskTracker::new(),
            cancellation_token,
            call_timeout: config.call_timeout(),
            shutdown_timeout: config.actor_shutdown_timeout(),
        }
    }

    /// Returns the actor's unique identifier.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> &Ern {
        &self.id
    }

    /// Returns the name the actor was created with.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the interface the actor implements.
    #[inline]
    #[must_use]
    pub fn interface_id(&self) -> &str {
        &self.interface_id
    }

    /// Current state of the actor's mailbox.
    #[must_use]
    pub fn status(&self) -> MailboxStatus {
        self.mailbox.status()
    }

    pub(crate) fn tracker(&self) -> TaskTracker {
        self.tracker.clone()
    }

    /// Places an envelope at the back of the actor's mailbox.
    ///
    /// # Errors
    ///
    /// [`ActiveError::ActorStopped`] once [`ActorHandle::stop`] has been called or the
    /// actor's task has ended.
    #[instrument(skip(self, envelope), fields(actor = %self.name, method = %envelope.invocation.method))]
    pub async fn enqueue(&self, envelope: Envelope) -> Result<(), ActiveError> {
        if self.mailbox.is_closing() {
            return Err(ActiveError::ActorStopped(self.name.clone()));
        }
        trace!(invocation = envelope.invocation.invocation_id, "enqueue");
        self.outbox
            .send(MailboxItem::Invoke(envelope))
            .await
            .map_err(|_| ActiveError::ActorStopped(self.name.clone()))
    }

    /// Sends an invocation and waits for its result, up to the configured call timeout.
    ///
    /// # Errors
    ///
    /// The method's own failure, [`ActiveError::CallTimeout`] when the deadline passes,
    /// or [`ActiveError::ActorStopped`] if the actor is stopping.
    pub async fn call(&self, invocation: Invocation) -> CallResult {
        let method = invocation.method.clone();
        let exchange = async {
            let (reply, response) = oneshot::channel::<CallResult>();
            let envelope = Envelope::new(invocation, ReplyTarget::OneShot(reply));
            if let Err(err) = self.enqueue(envelope).await {
                return Err(err);
            }
            response
                .await
                .unwrap_or_else(|_| Err(ActiveError::ActorStopped(self.name.clone())))
        };
        match tokio::time::timeout(self.call_timeout, exchange).await {
            Ok(result) => result,
            Err(_) => {
                warn!(actor = %self.name, %method, "call timed out");
                Err(ActiveError::CallTimeout {
                    method,
                    timeout_ms: u64::try_from(self.call_timeout.as_millis()).unwrap_or(u64::MAX),
                })
            }
        }
    }

    /// Sends an invocation without waiting for a result.
    ///
    /// # Errors
    ///
    /// [`ActiveError::ActorStopped`] if the actor is stopping.
    pub async fn tell(&self, invocation: Invocation) -> Result<(), ActiveError> {
        self.enqueue(Envelope::new(invocation, ReplyTarget::Discard))
            .await
    }

    /// Stops the actor and waits for its task to finish.
    ///
    /// New invocations are rejected immediately. The invocation being processed, if
    /// any, completes; invocations still queued are answered with
    /// [`ActiveError::ActorStopped`]. Stopping an already stopped actor is a no-op.
    ///
    /// # Errors
    ///
    /// [`ActiveError::CallTimeout`] if the actor did not stop within the configured
    /// actor shutdown timeout; its task is cancelled in that case.
    #[instrument(skip(self), fields(actor = %self.name))]
    pub async fn stop(&self) -> Result<(), ActiveError> {
        self.mailbox.close();
        if !self.tracker.is_closed() {
            trace!("actor was never started");
            self.tracker.close();
            self.mailbox.set(MailboxStatus::Stopped);
            return Ok(());
        }
        if self
            .outbox
            .send(MailboxItem::Signal(SystemSignal::Terminate))
            .await
            .is_err()
        {
            trace!("mailbox already closed");
        }

        if tokio::time::timeout(self.shutdown_timeout, self.tracker.wait())
            .await
            .is_err()
        {
            let timeout_ms = u64::try_from(self.shutdown_timeout.as_millis()).unwrap_or(u64::MAX);
            error!("Actor did not stop within {} ms. Cancelling its task.", timeout_ms);
            self.cancellation_token.cancel();
            self.tracker.wait().await;
            return Err(ActiveError::CallTimeout {
                method: "stop".to_string(),
                timeout_ms,
            });
        }
        trace!("Actor terminated successfully.");
        Ok(())
    }
}
