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

//! The calling side of remote dispatch: one TCP connection to a listener, shared by
//! every proxy bound to an interface behind it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, trace, warn};

use super::config::RemoteConfig;
use super::protocol::{decode_response, is_heartbeat, is_response, read_frame, write_request};
use super::types::WireRequest;
use crate::common::{ActiveError, CallResult};
use crate::message::Invocation;

/// Statistics for a remote connection.
#[derive(Debug, Default)]
pub struct RemoteClientStats {
    /// Requests written to the connection.
    pub requests_sent: AtomicUsize,
    /// Replies matched to a waiting call.
    pub replies_matched: AtomicUsize,
    /// Replies dropped because no call was waiting for their id.
    pub late_replies: AtomicUsize,
    /// Calls that gave up waiting.
    pub timeouts: AtomicUsize,
}

impl RemoteClientStats {
    /// Get the number of requests sent.
    #[must_use]
    pub fn requests_sent(&self) -> usize {
        self.requests_sent.load(Ordering::Relaxed)
    }

    /// Get the number of replies matched to a waiting call.
    #[must_use]
    pub fn replies_matched(&self) -> usize {
        self.replies_matched.load(Ordering::Relaxed)
    }

    /// Get the number of late or duplicate replies dropped.
    #[must_use]
    pub fn late_replies(&self) -> usize {
        self.late_replies.load(Ordering::Relaxed)
    }

    /// Get the number of calls that timed out.
    #[must_use]
    pub fn timeouts(&self) -> usize {
        self.timeouts.load(Ordering::Relaxed)
    }
}

/// State shared with the connection's reader task.
#[derive(Debug, Default)]
struct Correlation {
    pending: DashMap<u64, oneshot::Sender<CallResult>>,
    stats: RemoteClientStats,
}

#[derive(Debug)]
struct ConnectionInner {
    address: String,
    outbound: mpsc::Sender<WireRequest>,
    correlation: Arc<Correlation>,
    request_timeout: Duration,
    cancel_token: CancellationToken,
}

impl Drop for ConnectionInner {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

/// Removes a call's pending entry when the call returns or is abandoned.
struct PendingGuard<'a> {
    pending: &'a DashMap<u64, oneshot::Sender<CallResult>>,
    invocation_id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.invocation_id);
    }
}

/// A connection to a remote listener.
///
/// Calls are correlated with their replies by invocation id, so any number of calls
/// may be in flight at once and replies may arrive in any order. A call whose reply
/// does not arrive within the request timeout fails with
/// [`ActiveError::RemoteTimeout`]; if the reply turns up later it is dropped and
/// counted in [`RemoteClientStats::late_replies`]. When the connection drops, every
/// waiting call fails with [`ActiveError::Transport`].
///
/// Clones share the connection, which closes when the last clone is dropped or
/// [`RemoteConnection::close`] is called.
#[derive(Debug, Clone)]
pub struct RemoteConnection {
    inner: Arc<ConnectionInner>,
}

impl RemoteConnection {
    /// Connects to the listener at `address`.
    ///
    /// # Errors
    ///
    /// [`ActiveError::Transport`] if the connection cannot be established within the
    /// configured connect timeout.
    #[instrument(skip(config))]
    pub async fn connect(address: &str, config: &RemoteConfig) -> Result<Self, ActiveError> {
        let stream = match tokio::time::timeout(config.connect_timeout(), TcpStream::connect(address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(ActiveError::Transport(format!("Failed to connect to {address}: {e}")));
            }
            Err(_) => {
                return Err(ActiveError::Transport(format!(
                    "Connecting to {address} timed out after {} ms",
                    config.timeouts.connect
                )));
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            debug!("could not disable Nagle's algorithm: {e}");
        }

        let (reader, writer) = stream.into_split();
        let (outbound, requests) = mpsc::channel(config.limits.outbound_queue.max(1));
        let correlation = Arc::new(Correlation::default());
        let cancel_token = CancellationToken::new();

        tokio::spawn(write_loop(writer, requests, address.to_string(), cancel_token.clone()));
        tokio::spawn(read_loop(
            reader,
            config.limits.max_frame_size,
            correlation.clone(),
            address.to_string(),
            cancel_token.clone(),
        ));

        debug!("connected");
        Ok(Self {
            inner: Arc::new(ConnectionInner {
                address: address.to_string(),
                outbound,
                correlation,
                request_timeout: config.request_timeout(),
                cancel_token,
            }),
        })
    }

    /// The listener address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.inner.address
    }

    /// Statistics for this connection.
    #[must_use]
    pub fn stats(&self) -> &RemoteClientStats {
        &self.inner.correlation.stats
    }

    /// Calls currently waiting for a reply.
    #[must_use]
    pub fn pending_calls(&self) -> usize {
        self.inner.correlation.pending.len()
    }

    /// Whether the connection has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.cancel_token.is_cancelled()
    }

    /// Closes the connection; waiting calls fail with [`ActiveError::Transport`].
    pub fn close(&self) {
        self.inner.cancel_token.cancel();
    }

    /// Sends `invocation` to the actor exposed as `interface_id` and waits for its reply.
    ///
    /// # Errors
    ///
    /// The remote method's failure, [`ActiveError::RemoteTimeout`] when no reply arrives
    /// in time, or [`ActiveError::Transport`] if the connection is gone.
    pub async fn call(&self, interface_id: &str, invocation: Invocation) -> CallResult {
        let correlation = &self.inner.correlation;
        let invocation_id = invocation.invocation_id;
        let (reply, response) = oneshot::channel();
        correlation.pending.insert(invocation_id, reply);
        // removes the entry however this future ends, including when it is dropped
        let _pending = PendingGuard {
            pending: &correlation.pending,
            invocation_id,
        };
        if self.is_closed() {
            return Err(self.closed());
        }

        let request = WireRequest::new(interface_id, invocation, false);
        if self.inner.outbound.send(request).await.is_err() {
            return Err(self.closed());
        }
        correlation.stats.requests_sent.fetch_add(1, Ordering::Relaxed);
        trace!(invocation = invocation_id, interface = interface_id, "request sent");

        match tokio::time::timeout(self.inner.request_timeout, response).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(self.closed()),
            Err(_) => {
                correlation.stats.timeouts.fetch_add(1, Ordering::Relaxed);
                let timeout_ms = u64::try_from(self.inner.request_timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(invocation = invocation_id, interface = interface_id, "remote call timed out after {timeout_ms} ms");
                Err(ActiveError::RemoteTimeout {
                    invocation_id,
                    timeout_ms,
                })
            }
        }
    }

    /// Sends `invocation` without waiting for a reply.
    ///
    /// # Errors
    ///
    /// [`ActiveError::Transport`] if the connection is gone.
    pub async fn tell(&self, interface_id: &str, invocation: Invocation) -> Result<(), ActiveError> {
        if self.is_closed() {
            return Err(self.closed());
        }
        let request = WireRequest::new(interface_id, invocation, true);
        self.inner
            .outbound
            .send(request)
            .await
            .map_err(|_| self.closed())?;
        self.inner
            .correlation
            .stats
            .requests_sent
            .fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn closed(&self) -> ActiveError {
        ActiveError::Transport(format!("connection to {} is closed", self.inner.address))
    }
}

async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut requests: mpsc::Receiver<WireRequest>,
    address: String,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;

            () = cancel_token.cancelled() => break,

            request = requests.recv() => {
                let Some(request) = request else { break; };
                if let Err(e) = write_request(&mut writer, &request).await {
                    error!("Failed to send request to {}: {}", address, e);
                    break;
                }
            }
        }
    }
    cancel_token.cancel();
}

async fn read_loop(
    mut reader: OwnedReadHalf,
    max_frame_size: usize,
    correlation: Arc<Correlation>,
    address: String,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;

            () = cancel_token.cancelled() => break,

            frame_result = read_frame(&mut reader, max_frame_size) => {
                match frame_result {
                    Ok(Some((msg_type, _))) if is_heartbeat(msg_type) => {
                        trace!("heartbeat from {}", address);
                    }
                    Ok(Some((msg_type, payload))) if is_response(msg_type) => {
                        match decode_response(&payload) {
                            Ok(response) => {
                                let invocation_id = response.invocation_id;
                                match correlation.pending.remove(&invocation_id) {
                                    Some((_, reply)) => {
                                        correlation.stats.replies_matched.fetch_add(1, Ordering::Relaxed);
                                        if reply.send(response.into_result()).is_err() {
                                            trace!(invocation = invocation_id, "caller went away");
                                        }
                                    }
                                    None => {
                                        correlation.stats.late_replies.fetch_add(1, Ordering::Relaxed);
                                        warn!(invocation = invocation_id, "dropping reply for an unknown invocation");
                                    }
                                }
                            }
                            Err(e) => error!("Undecodable response from {}: {}", address, e),
                        }
                    }
                    Ok(Some((msg_type, _))) => {
                        warn!("Unexpected message type {:#04x} from {}", msg_type, address);
                    }
                    Ok(None) => {
                        debug!("Connection to {} closed by listener", address);
                        break;
                    }
                    Err(e) => {
                        error!("Connection to {} failed: {}", address, e);
                        break;
                    }
                }
            }
        }
    }

    cancel_token.cancel();
    let waiting: Vec<u64> = correlation.pending.iter().map(|entry| *entry.key()).collect();
    for invocation_id in waiting {
        if let Some((_, reply)) = correlation.pending.remove(&invocation_id) {
            let closed = ActiveError::Transport(format!("connection to {address} closed"));
            if reply.send(Err(closed)).is_err() {
                trace!(invocation = invocation_id, "caller went away");
            }
        }
    }
}
