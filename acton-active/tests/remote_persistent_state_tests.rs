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
#![allow(dead_code, unused_doc_comments)]

use std::sync::Arc;
use std::time::Duration;

use acton_active::prelude::*;
use acton_active::remote::protocol;
use acton_active::remote::WireResponse;
use acton_active_test::prelude::*;
use tokio::net::TcpListener;

use crate::setup::initialize_tracing;
use crate::setup::interfaces::{counter_table, CounterProxy, COUNTER};
use crate::setup::logs::FailingLog;

mod setup;

/// Starts a listener that answers the first request only after `delay`.
async fn slow_peer(delay: Duration) -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?.to_string();
    tokio::spawn(async move {
        let Ok((mut stream, _)) = listener.accept().await else {
            return;
        };
        let Ok(Some((_, payload))) = protocol::read_frame(&mut stream, protocol::MAX_FRAME_SIZE).await else {
            return;
        };
        let Ok(request) = protocol::decode_request(&payload) else {
            return;
        };
        tokio::time::sleep(delay).await;
        let response = WireResponse::from_result(request.invocation_id, &Ok(serde_json::json!(1)));
        let _ = protocol::write_response(&mut stream, &response).await;
        // hold the connection open so the late reply is read
        tokio::time::sleep(Duration::from_secs(5)).await;
    });
    Ok(address)
}

/// A call with a 2 s deadline whose reply arrives at 3 s fails with `RemoteTimeout`,
/// and the reply that does arrive is counted and dropped.
#[active_test]
async fn test_late_reply_is_discarded() -> anyhow::Result<()> {
    initialize_tracing();
    let address = slow_peer(Duration::from_secs(3)).await?;
    let config = RemoteConfig::default().with_request_timeout(Duration::from_secs(2));
    let connection = RemoteConnection::connect(&address, &config).await?;

    let invocation = Invocation::new("increment", encode_arguments(&1_i64)?);
    let invocation_id = invocation.invocation_id;
    let result = connection.call(COUNTER, invocation).await;
    assert_eq!(
        result,
        Err(ActiveError::RemoteTimeout {
            invocation_id,
            timeout_ms: 2_000,
        })
    );
    assert_eq!(connection.pending_calls(), 0);
    assert_eq!(connection.stats().timeouts(), 1);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    while connection.stats().late_replies() == 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(connection.stats().late_replies(), 1);
    assert_eq!(connection.stats().replies_matched(), 0);
    connection.close();
    Ok(())
}

/// Calls abandoned by their caller, here through an outer timeout, leave nothing
/// waiting on the connection.
#[active_test]
async fn test_abandoned_calls_are_forgotten() -> anyhow::Result<()> {
    initialize_tracing();
    let address = slow_peer(Duration::from_secs(60)).await?;
    let connection = RemoteConnection::connect(&address, &RemoteConfig::default()).await?;

    for _ in 0..100 {
        let invocation = Invocation::new("increment", encode_arguments(&1_i64)?);
        let abandoned = tokio::time::timeout(Duration::from_millis(5), connection.call(COUNTER, invocation)).await;
        assert!(abandoned.is_err());
    }
    assert_eq!(connection.pending_calls(), 0);
    assert_eq!(connection.stats().timeouts(), 0);
    assert!(!connection.is_closed());
    connection.close();
    Ok(())
}

/// Persistent state served remotely: commits land in the serving side's log and
/// refused appends reach the remote caller as the same persistence failure.
#[active_test]
async fn test_remote_persistent_counter() -> anyhow::Result<()> {
    initialize_tracing();
    let log = FailingLog::new();
    let server = ActiveApp::launch_async().await;
    let mut serving = ActiveObjectConfigurator::new(&server);
    serving
        .register_local(
            LocalRegistration::new(
                StateBackend::Persistent(log.clone()).cell("remote-counter", 0_i64),
                counter_table(),
            )
            .named("remote-counter")
            .exposed(),
        )
        .await?;
    let address = serving.serve("127.0.0.1:0").await?.to_string();

    let client = ActiveApp::launch_async().await;
    let mut calling = ActiveObjectConfigurator::new(&client);
    let counter = CounterProxy(calling.register_remote(COUNTER, &address).await?);
    for expected in 1..=3 {
        assert_eq!(counter.increment(1).await?, expected);
    }
    assert_eq!(log.entries("remote-counter").len(), 3);

    log.refuse("remote-counter");
    let refused = counter.increment(1).await;
    assert!(
        matches!(refused, Err(ActiveError::PersistenceFailure { ref entity_id, .. }) if entity_id == "remote-counter"),
        "unexpected result: {refused:?}"
    );
    assert_eq!(counter.read().await?, 3);

    let bindings = calling.bindings();
    assert_eq!(bindings.len(), 1);
    assert!(bindings[0].state.is_none());

    calling.shutdown().await?;
    serving.shutdown().await?;

    let recovered = PersistentCell::recovered("remote-counter", 0_i64, log)?;
    assert_eq!(*recovered.read(), 3);
    Ok(())
}

/// Pending remote calls fail with a transport error once the serving side goes away.
#[active_test]
async fn test_dropped_connection_fails_pending_calls() -> anyhow::Result<()> {
    initialize_tracing();
    let server = ActiveApp::launch_async().await;
    let mut serving = ActiveObjectConfigurator::new(&server);
    let log: Arc<dyn DurableLog> = Arc::new(InMemoryLog::new());
    serving
        .register_local(
            LocalRegistration::new(
                StateBackend::Persistent(log).cell("slow-counter", 0_i64),
                counter_table(),
            )
            .exposed(),
        )
        .await?;
    let address = serving.serve("127.0.0.1:0").await?.to_string();

    let connection = RemoteConnection::connect(&address, &RemoteConfig::default()).await?;
    let caller = connection.clone();
    let pending = tokio::spawn(async move {
        caller
            .call(COUNTER, Invocation::new("slow_increment", encode_arguments(&1_000_u64)?))
            .await
    });
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(connection.pending_calls(), 1);

    connection.close();
    let result = pending.await?;
    assert!(
        matches!(result, Err(ActiveError::Transport(_))),
        "unexpected result: {result:?}"
    );
    assert!(connection.is_closed());

    serving.shutdown().await?;
    Ok(())
}
