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

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, error, instrument, trace, warn};

use crate::actor::{MailboxStatus, ManagedActor};
use crate::common::{ActiveError, CallResult};
use crate::message::{Envelope, FailureReport, Invocation, MailboxItem, SystemSignal};
use crate::proxy::MethodEntry;
use crate::state::Transactional;

/// Type-state marker for a [`ManagedActor`] that is actively running and processing messages.
///
/// A started actor lives inside its own task. It takes one message at a time from its
/// mailbox, in enqueue order, and is reached only through its
/// [`ActorHandle`](crate::common::ActorHandle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Started;

impl<State: Transactional> ManagedActor<Started, State> {
    #[instrument(skip(self), fields(actor = %self.handle.name))]
    pub(crate) async fn wake(mut self) {
        (self.after_start)(&self.id, &self.state);
        let cancel = self.handle.cancellation_token.clone();

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    trace!("Forceful cancellation triggered for actor: {}", self.name());
                    break;
                }

                incoming = self.inbox.recv() => {
                    let Some(item) = incoming else { break; };
                    match item {
                        MailboxItem::Invoke(envelope) => self.dispatch(envelope).await,
                        MailboxItem::Signal(SystemSignal::Terminate) => {
                            trace!("Terminate signal received");
                            break;
                        }
                    }
                }
            }
        }
        self.terminate().await;
    }

    async fn dispatch(&mut self, envelope: Envelope) {
        let Envelope {
            invocation,
            reply_to,
            ..
        } = envelope;
        trace!(method = %invocation.method, invocation = invocation.invocation_id, "dispatch");

        let result = if self.handle.mailbox.is_closing() {
            Err(ActiveError::ActorStopped(self.handle.name.clone()))
        } else {
            self.handle.mailbox.set(MailboxStatus::Processing);
            let result = self.process(&invocation);
            self.handle.mailbox.set(MailboxStatus::Idle);
            result
        };

        let one_way = reply_to.is_one_way();
        match reply_to.deliver(result).await {
            Ok(()) => {}
            Err(Ok(_)) => trace!(method = %invocation.method, "caller went away, reply dropped"),
            Err(Err(error)) => {
                if one_way {
                    warn!(method = %invocation.method, "one-way call failed: {error}");
                } else {
                    warn!(method = %invocation.method, "caller went away before failure: {error}");
                }
                self.runtime.report_failure(FailureReport::new(
                    self.handle.name.clone(),
                    self.handle.interface_id.clone(),
                    invocation.method,
                    invocation.invocation_id,
                    error,
                ));
            }
        }
    }

    /// Runs one invocation against the state.
    ///
    /// Mutating methods run inside a transaction that is committed on success and rolled
    /// back on an error return, a failed commit or a panic.
    fn process(&mut self, invocation: &Invocation) -> CallResult {
        let Some(entry) = self.table.entry(&invocation.method) else {
            return Err(ActiveError::UnknownMethod {
                interface_id: self.table.interface_id().to_string(),
                method: invocation.method.clone(),
            });
        };
        let state = &mut self.state;
        let arguments = invocation.arguments.as_slice();

        match entry {
            MethodEntry::ReadOnly(handler) => {
                catch_unwind(AssertUnwindSafe(|| handler(&*state, arguments))).unwrap_or_else(
                    |panic| Err(actor_failure(&invocation.method, panic.as_ref())),
                )
            }
            MethodEntry::Mutating(handler) => {
                state.begin()?;
                match catch_unwind(AssertUnwindSafe(|| handler(&mut *state, arguments))) {
                    Ok(Ok(value)) => match state.commit() {
                        Ok(()) => Ok(value),
                        Err(err) => {
                            debug!(method = %invocation.method, "commit failed: {err}");
                            if state.in_transaction() {
                                state.rollback();
                            }
                            Err(err)
                        }
                    },
                    Ok(Err(err)) => {
                        state.rollback();
                        Err(err)
                    }
                    Err(panic) => {
                        state.rollback();
                        let failure = actor_failure(&invocation.method, panic.as_ref());
                        error!(method = %invocation.method, "handler panicked, transaction rolled back: {failure}");
                        Err(failure)
                    }
                }
            }
        }
    }

    #[instrument(skip(self), fields(actor = %self.handle.name))]
    async fn terminate(mut self) {
        self.handle.mailbox.close();
        (self.before_stop)(&self.id, &self.state);

        self.inbox.close();
        let mut answered = 0_usize;
        while let Some(item) = self.inbox.recv().await {
            if let MailboxItem::Invoke(envelope) = item {
                let stopped = Err(ActiveError::ActorStopped(self.handle.name.clone()));
                if envelope.reply_to.deliver(stopped).await.is_err() {
                    trace!(method = %envelope.invocation.method, "queued invocation had no receiver");
                }
                answered += 1;
            }
        }
        if answered > 0 {
            debug!(answered, "answered queued invocations with ActorStopped");
        }
        if self.state.in_transaction() {
            self.state.rollback();
        }

        self.handle.mailbox.set(MailboxStatus::Stopped);
        (self.after_stop)(&self.id, &self.state);
        self.runtime.forget(&self.id);
        debug!("actor stopped");
    }
}

fn actor_failure(method: &str, panic: &(dyn Any + Send)) -> ActiveError {
    let reason = panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    ActiveError::ActorFailure {
        method: method.to_string(),
        reason,
    }
}
