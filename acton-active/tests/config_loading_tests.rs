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

use std::fs;
use std::time::Duration;

use acton_active::prelude::*;
use acton_active_test::prelude::*;
use tempfile::TempDir;

use crate::setup::initialize_tracing;
use crate::setup::interfaces::{counter_table, CounterProxy, COUNTER};

mod setup;

/// Values present in the file override the defaults; everything else keeps its default.
#[active_test]
async fn test_custom_configuration_override() -> anyhow::Result<()> {
    initialize_tracing();
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("config.toml");
    let config_content = r#"
        [timeouts]
        call_timeout_ms = 750

        [limits]
        mailbox_capacity = 16

        [defaults]
        actor_name = "custom_actor"

        [remote.timeouts]
        request_timeout_ms = 2000
    "#;
    fs::write(&path, config_content)?;

    let config = ActiveConfig::load_from(&path);
    assert_eq!(config.call_timeout(), Duration::from_millis(750));
    assert_eq!(config.limits.mailbox_capacity, 16);
    assert_eq!(config.defaults.actor_name, "custom_actor");
    assert_eq!(config.remote.request_timeout(), Duration::from_secs(2));
    assert_eq!(
        config.actor_shutdown_timeout(),
        ActiveConfig::default().actor_shutdown_timeout()
    );
    assert_eq!(
        config.remote.connect_timeout(),
        RemoteConfig::default().connect_timeout()
    );
    Ok(())
}

/// Test error handling for malformed configuration files
#[active_test]
async fn test_malformed_config_handling() -> anyhow::Result<()> {
    initialize_tracing();
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("config.toml");
    let malformed_content = r#"
        [timeouts]
        call_timeout_ms = "not_a_number"

        [limits]
        mailbox_capacity = -1
    "#;
    fs::write(&path, malformed_content)?;

    let config = ActiveConfig::load_from(&path);
    assert_eq!(config.call_timeout(), ActiveConfig::default().call_timeout());
    assert_eq!(config.limits.mailbox_capacity, LimitsConfig::default().mailbox_capacity);

    let missing = ActiveConfig::load_from(&temp_dir.path().join("absent.toml"));
    assert_eq!(missing.limits.mailbox_capacity, LimitsConfig::default().mailbox_capacity);
    Ok(())
}

/// A runtime launched with an explicit configuration hands it to every actor.
#[active_test]
async fn test_config_values_used_in_behavior() -> anyhow::Result<()> {
    initialize_tracing();
    let mut config = ActiveConfig::default();
    config.limits.mailbox_capacity = 2;
    config.timeouts.call_timeout_ms = 150;
    let runtime = ActiveApp::launch_async_with_config(config).await;
    assert_eq!(runtime.config().limits.mailbox_capacity, 2);

    let handle = runtime
        .spawn_actor(StateBackend::InMemory.cell("counter", 0_i64), counter_table())
        .await?;
    let counter = CounterProxy(ActiveProxy::new(ProxyBinding::new(
        handle.interface_id().to_string(),
        ActorRef::Local(handle.clone()),
        None,
    )));

    // more one-way calls than the mailbox holds; senders wait for room
    for _ in 0..5 {
        counter.0.tell("increment", 1_i64).await?;
    }
    assert_eq!(counter.read().await?, 5);
    assert!(matches!(
        counter.slow_increment(600).await,
        Err(ActiveError::CallTimeout { timeout_ms: 150, .. })
    ));

    runtime.shutdown_all().await?;
    Ok(())
}

/// The process-wide defaults load without a configuration file.
#[active_test]
async fn test_process_defaults_are_available() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = ActiveApp::launch_async().await;
    assert_eq!(
        runtime.config().limits.mailbox_capacity,
        CONFIG.limits.mailbox_capacity
    );
    assert_eq!(runtime.config().call_timeout(), CONFIG.call_timeout());
    Ok(())
}

/// Zero capacities and intervals from a configuration file still give working actors
/// and listeners.
#[active_test]
async fn test_zero_values_are_clamped() -> anyhow::Result<()> {
    initialize_tracing();
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("config.toml");
    let config_content = r#"
        [limits]
        mailbox_capacity = 0

        [remote.timeouts]
        heartbeat_interval_ms = 0
    "#;
    fs::write(&path, config_content)?;
    let config = ActiveConfig::load_from(&path);
    assert_eq!(config.limits.mailbox_capacity, 0);
    assert_eq!(config.remote.heartbeat_interval(), Duration::from_millis(1));

    let server = ActiveApp::launch_async_with_config(config.clone()).await;
    let mut serving = ActiveObjectConfigurator::new(&server);
    let local = serving
        .register_local(LocalRegistration::new(
            StateBackend::InMemory.cell("counter", 0_i64),
            counter_table(),
        ))
        .await?;
    assert_eq!(local.call::<_, i64>("increment", 2_i64).await, Ok(2));
    let address = serving.serve("127.0.0.1:0").await?.to_string();

    let client = ActiveApp::launch_async_with_config(config).await;
    let mut calling = ActiveObjectConfigurator::new(&client);
    let remote = calling.register_remote(COUNTER, &address).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        remote.call::<_, i64>("read", ()).await,
        Err(ActiveError::UnknownInterface(COUNTER.to_string()))
    );

    calling.shutdown().await?;
    serving.shutdown().await?;
    Ok(())
}
