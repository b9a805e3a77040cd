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

//! TCP listener that serves exposed actors to remote callers.
//!
//! Each accepted connection gets a reader loop, which resolves requests to actors and
//! enqueues them, and a writer task, which frames responses as actors finish and sends
//! heartbeats while the connection is idle. Responses are written in completion order,
//! so requests on one connection may complete out of order.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Semaphore};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, trace, warn};

use super::config::RemoteConfig;
use super::protocol::{
    decode_request, is_heartbeat, read_frame, write_heartbeat, write_response, MSG_TYPE_REQUEST,
};
use super::types::{WireRequest, WireResponse};
use crate::common::{ActiveError, ActorHandle};
use crate::message::{Envelope, ReplyTarget};

/// Actors reachable through a listener, keyed by interface id.
pub type ExposedActors = Arc<DashMap<String, ActorHandle>>;

/// Statistics for a remote listener.
#[derive(Debug, Default)]
pub struct RemoteListenerStats {
    /// Total connections accepted.
    pub connections_accepted: AtomicUsize,
    /// Currently active connections.
    pub connections_active: AtomicUsize,
    /// Total requests received.
    pub requests_received: AtomicUsize,
    /// Total requests enqueued on an actor.
    pub requests_routed: AtomicUsize,
    /// Total errors encountered.
    pub errors: AtomicUsize,
}

impl RemoteListenerStats {
    /// Create new statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of connections accepted.
    #[must_use]
    pub fn connections_accepted(&self) -> usize {
        self.connections_accepted.load(Ordering::Relaxed)
    }

    /// Get the number of active connections.
    #[must_use]
    pub fn connections_active(&self) -> usize {
        self.connections_active.load(Ordering::Relaxed)
    }

    /// Get the number of requests received.
    #[must_use]
    pub fn requests_received(&self) -> usize {
        self.requests_received.load(Ordering::Relaxed)
    }

    /// Get the number of requests enqueued on an actor.
    #[must_use]
    pub fn requests_routed(&self) -> usize {
        self.requests_routed.load(Ordering::Relaxed)
    }

    /// Get the number of errors.
    #[must_use]
    pub fn errors(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }
}

/// Handle for managing a running listener.
#[derive(Debug, Clone)]
pub struct RemoteListenerHandle {
    local_addr: SocketAddr,
    /// Statistics for the listener.
    pub stats: Arc<RemoteListenerStats>,
    cancel_token: CancellationToken,
    tracker: TaskTracker,
}

impl RemoteListenerHandle {
    /// The address the listener is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Request the listener and its connections to stop.
    pub fn stop(&self) {
        self.cancel_token.cancel();
    }

    /// Stops the listener and waits for its connection handlers to finish.
    pub async fn shutdown(&self) {
        self.stop();
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// Check if the listener has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

/// A bound, not yet running, remote listener.
#[derive(Debug)]
pub struct RemoteListener {
    listener: TcpListener,
    config: RemoteConfig,
    exposed: ExposedActors,
}

impl RemoteListener {
    /// Binds `address`. Use port 0 to let the OS pick one.
    ///
    /// # Errors
    ///
    /// [`ActiveError::Transport`] if the address cannot be bound.
    pub async fn bind(
        address: &str,
        config: RemoteConfig,
        exposed: ExposedActors,
    ) -> Result<Self, ActiveError> {
        let listener = TcpListener::bind(address).await.map_err(|e| {
            ActiveError::Transport(format!("Failed to bind listener at {address}: {e}"))
        })?;
        Ok(Self {
            listener,
            config,
            exposed,
        })
    }

    /// The bound address.
    ///
    /// # Errors
    ///
    /// [`ActiveError::Transport`] if the socket cannot report it.
    pub fn local_addr(&self) -> Result<SocketAddr, ActiveError> {
        self.listener
            .local_addr()
            .map_err(|e| ActiveError::Transport(e.to_string()))
    }

    /// Spawns the accept loop. Cancelling `cancel_token` stops it along with every
    /// connection it accepted.
    ///
    /// # Errors
    ///
    /// [`ActiveError::Transport`] if the socket cannot report its address.
    pub fn spawn(self, cancel_token: CancellationToken) -> Result<RemoteListenerHandle, ActiveError> {
        let local_addr = self.local_addr()?;
        let stats = Arc::new(RemoteListenerStats::new());
        let tracker = TaskTracker::new();
        info!("Remote listener started on: {}", local_addr);

        let connection_semaphore = Arc::new(Semaphore::new(self.config.limits.max_connections));
        tracker.spawn(accept_loop(
            self,
            cancel_token.clone(),
            connection_semaphore,
            stats.clone(),
            tracker.clone(),
        ));

        Ok(RemoteListenerHandle {
            local_addr,
            stats,
            cancel_token,
            tracker,
        })
    }
}

/// Main accept loop for the listener.
async fn accept_loop(
    listener: RemoteListener,
    cancel_token: CancellationToken,
    connection_semaphore: Arc<Semaphore>,
    stats: Arc<RemoteListenerStats>,
    tracker: TaskTracker,
) {
    loop {
        tokio::select! {
            biased;

            () = cancel_token.cancelled() => {
                info!("Remote listener received shutdown signal");
                break;
            }

            accept_result = listener.listener.accept() => {
                match accept_result {
                    Ok((stream, peer)) => {
                        let Ok(permit) = connection_semaphore.clone().try_acquire_owned() else {
                            warn!("Maximum concurrent connections reached, rejecting connection from {}", peer);
                            stats.errors.fetch_add(1, Ordering::Relaxed);
                            continue;
                        };

                        stats.connections_accepted.fetch_add(1, Ordering::Relaxed);
                        stats.connections_active.fetch_add(1, Ordering::Relaxed);

                        let conn_id = stats.connections_accepted.load(Ordering::Relaxed);
                        trace!("Accepted connection #{} from {}", conn_id, peer);

                        let config = listener.config.clone();
                        let exposed = listener.exposed.clone();
                        let cancel_token = cancel_token.clone();
                        let stats = stats.clone();
                        let writers = tracker.clone();

                        tracker.spawn(async move {
                            handle_connection(stream, conn_id, config, exposed, cancel_token, stats, writers).await;
                            drop(permit);
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        stats.errors.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        }
    }
    info!("Remote listener shut down");
}

/// Handle a single caller connection.
async fn handle_connection(
    stream: TcpStream,
    conn_id: usize,
    config: RemoteConfig,
    exposed: ExposedActors,
    cancel_token: CancellationToken,
    stats: Arc<RemoteListenerStats>,
    tracker: TaskTracker,
) {
    let (mut reader, writer) = stream.into_split();
    let (outbound, responses) = mpsc::channel(config.limits.outbound_queue.max(1));
    let connection_token = cancel_token.child_token();
    tracker.spawn(write_loop(
        writer,
        responses,
        conn_id,
        config.clone(),
        connection_token.clone(),
    ));

    debug!("Connection #{} handler started", conn_id);
    read_loop(&mut reader, conn_id, &config, &exposed, &outbound, &connection_token, &stats).await;

    // The writer keeps draining until every actor holding a reply target has answered.
    drop(outbound);
    stats.connections_active.fetch_sub(1, Ordering::Relaxed);
    debug!("Connection #{} handler finished", conn_id);
}

async fn read_loop(
    reader: &mut OwnedReadHalf,
    conn_id: usize,
    config: &RemoteConfig,
    exposed: &ExposedActors,
    outbound: &mpsc::Sender<WireResponse>,
    cancel_token: &CancellationToken,
    stats: &RemoteListenerStats,
) {
    loop {
        tokio::select! {
            biased;

            () = cancel_token.cancelled() => {
                trace!("Connection #{} received shutdown signal", conn_id);
                break;
            }

            frame_result = read_frame(reader, config.limits.max_frame_size) => {
                match frame_result {
                    Ok(Some((msg_type, payload))) => {
                        if is_heartbeat(msg_type) {
                            trace!("Connection #{} received heartbeat", conn_id);
                            continue;
                        }
                        if msg_type != MSG_TYPE_REQUEST {
                            warn!("Connection #{} received unexpected message type: {:#04x}", conn_id, msg_type);
                            continue;
                        }

                        stats.requests_received.fetch_add(1, Ordering::Relaxed);
                        let request = match decode_request(&payload) {
                            Ok(request) => request,
                            Err(e) => {
                                error!("Connection #{} sent an undecodable request: {}", conn_id, e);
                                stats.errors.fetch_add(1, Ordering::Relaxed);
                                continue;
                            }
                        };

                        if let Err(e) = route_request(request, exposed, outbound, stats).await {
                            stats.errors.fetch_add(1, Ordering::Relaxed);
                            if outbound.send(e).await.is_err() {
                                break;
                            }
                        }
                    }
                    Ok(None) => {
                        debug!("Connection #{} closed by caller", conn_id);
                        break;
                    }
                    Err(e) => {
                        error!("Connection #{} error: {}", conn_id, e);
                        stats.errors.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                }
            }
        }
    }
}

/// Resolves the target actor and enqueues the invocation on it.
///
/// Returns the response to send immediately when the request cannot be routed.
/// One-way requests that fail to route are only logged.
async fn route_request(
    request: WireRequest,
    exposed: &ExposedActors,
    outbound: &mpsc::Sender<WireResponse>,
    stats: &RemoteListenerStats,
) -> Result<(), WireResponse> {
    let invocation_id = request.invocation_id;
    let one_way = request.one_way;
    let reject = |error: ActiveError| {
        if one_way {
            warn!(invocation = invocation_id, "dropping one-way request: {error}");
            Ok(())
        } else {
            Err(WireResponse::error(invocation_id, error))
        }
    };

    if let Err(e) = request.validate() {
        return reject(e);
    }
    let Some(handle) = exposed.get(&request.interface_id).map(|entry| entry.value().clone()) else {
        return reject(ActiveError::UnknownInterface(request.interface_id.clone()));
    };

    trace!(
        invocation = invocation_id,
        interface = %request.interface_id,
        method = %request.method_signature,
        "routing request"
    );
    let reply_to = if one_way {
        ReplyTarget::Discard
    } else {
        ReplyTarget::Remote {
            invocation_id,
            outbound: outbound.clone(),
        }
    };
    match handle.enqueue(Envelope::new(request.into_invocation(), reply_to)).await {
        Ok(()) => {
            stats.requests_routed.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
        Err(e) => reject(e),
    }
}

async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut responses: mpsc::Receiver<WireResponse>,
    conn_id: usize,
    config: RemoteConfig,
    cancel_token: CancellationToken,
) {
    let period = config.heartbeat_interval();
    let mut heartbeat = interval_at(Instant::now() + period, period);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            () = cancel_token.cancelled() => break,

            response = responses.recv() => {
                let Some(response) = response else { break; };
                trace!("Connection #{} answering invocation {}", conn_id, response.invocation_id);
                if let Err(e) = write_response(&mut writer, &response).await {
                    error!("Connection #{} failed to send response: {}", conn_id, e);
                    break;
                }
                heartbeat.reset();
            }

            _ = heartbeat.tick() => {
                if let Err(e) = write_heartbeat(&mut writer).await {
                    debug!("Connection #{} failed to send heartbeat: {}", conn_id, e);
                    break;
                }
            }
        }
    }
    cancel_token.cancel();
}
