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

use acton_active::prelude::*;
use acton_active_test::prelude::*;

use crate::setup::initialize_tracing;
use crate::setup::interfaces::{account_state, account_table, counter_table, ACCOUNT, COUNTER};

mod setup;

fn counter_registration() -> LocalRegistration<BackedCell<i64>> {
    LocalRegistration::new(StateBackend::InMemory.cell("counter", 0_i64), counter_table())
}

#[active_test]
async fn test_interfaces_bind_once() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = ActiveApp::launch_async().await;
    let mut configurator = ActiveObjectConfigurator::new(&runtime);
    configurator.register_local(counter_registration()).await?;

    let again = configurator
        .register_local(counter_registration().named("second-counter"))
        .await;
    assert_eq!(again.err(), Some(ActiveError::BindingConflict(COUNTER.to_string())));

    // the conflict is detected before any connection is attempted
    let remote = configurator.register_remote(COUNTER, "127.0.0.1:1").await;
    assert_eq!(remote.err(), Some(ActiveError::BindingConflict(COUNTER.to_string())));
    assert_eq!(runtime.actor_count(), 1);

    configurator.shutdown().await?;
    Ok(())
}

#[active_test]
async fn test_unknown_interfaces_are_reported() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = ActiveApp::launch_async().await;
    let configurator = ActiveObjectConfigurator::new(&runtime);
    assert_eq!(
        configurator.proxy("ledger").err(),
        Some(ActiveError::UnknownInterface("ledger".to_string()))
    );
    assert_eq!(
        configurator.expose("ledger"),
        Err(ActiveError::UnknownInterface("ledger".to_string()))
    );
    assert!(configurator.bindings().is_empty());
    Ok(())
}

/// Proxies handed out later talk to the same actor as the one returned at registration.
#[active_test]
async fn test_proxies_share_the_bound_actor() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = ActiveApp::launch_async().await;
    let mut configurator = ActiveObjectConfigurator::new(&runtime);
    let first = configurator
        .register_local(counter_registration().named("primary-counter"))
        .await?;
    let second = configurator.proxy(COUNTER)?;

    let _: i64 = first.call("increment", 2_i64).await?;
    let value: i64 = second.call("increment", 3_i64).await?;
    assert_eq!(value, 5);
    assert_eq!(
        second.location(),
        ActorLocation::Local {
            actor: "primary-counter".to_string()
        }
    );
    assert_eq!(second.interface_id(), COUNTER);

    configurator.shutdown().await?;
    Ok(())
}

/// Bindings are listed in interface order with the state shape of each local actor.
#[active_test]
async fn test_bindings_describe_their_state() -> anyhow::Result<()> {
    initialize_tracing();
    let runtime = ActiveApp::launch_async().await;
    let mut configurator = ActiveObjectConfigurator::new(&runtime);
    let log: Arc<dyn DurableLog> = Arc::new(InMemoryLog::new());
    let durable = StateBackend::Persistent(log);

    configurator.register_local(counter_registration().exposed()).await?;
    let (state, parts) = account_state(&durable, &StateBackend::InMemory, &durable);
    configurator
        .register_local(LocalRegistration::new(state, account_table(&parts)))
        .await?;

    let bindings = configurator.bindings();
    let ids: Vec<&str> = bindings.iter().map(|info| info.interface_id.as_str()).collect();
    assert_eq!(ids, vec![ACCOUNT, COUNTER]);

    let account = &bindings[0];
    assert!(!account.exposed);
    let account_state = account.state.as_ref().expect("local binding has a descriptor");
    assert_eq!(account_state.backend, BackendKind::Nested);
    assert_eq!(account_state.entity_ids(), vec!["account-balance", "account-audit"]);

    let counter = &bindings[1];
    assert!(counter.exposed);
    assert_eq!(
        counter.location,
        ActorLocation::Local {
            actor: COUNTER.to_string()
        }
    );
    let counter_state = counter.state.as_ref().expect("local binding has a descriptor");
    assert_eq!(counter_state.backend, BackendKind::InMemory);
    assert!(counter_state.children.is_empty());

    configurator.shutdown().await?;
    assert!(configurator.bindings().is_empty());
    Ok(())
}

#[active_test]
async fn test_remote_bindings_cannot_be_exposed() -> anyhow::Result<()> {
    initialize_tracing();
    let server = ActiveApp::launch_async().await;
    let mut serving = ActiveObjectConfigurator::new(&server);
    serving.register_local(counter_registration().exposed()).await?;
    let address = serving.serve("127.0.0.1:0").await?.to_string();
    assert_eq!(serving.listeners().len(), 1);

    let client = ActiveApp::launch_async().await;
    let mut calling = ActiveObjectConfigurator::new(&client);
    calling.register_remote(COUNTER, &address).await?;
    assert!(matches!(
        calling.expose(COUNTER),
        Err(ActiveError::Configuration(_))
    ));
    let bindings = calling.bindings();
    assert_eq!(
        bindings[0].location,
        ActorLocation::Remote {
            address: address.clone()
        }
    );
    assert!(bindings[0].state.is_none());

    calling.shutdown().await?;
    serving.shutdown().await?;
    assert!(serving.listeners().is_empty());
    Ok(())
}

#[active_test]
async fn test_unreachable_remote_is_a_transport_error() -> anyhow::Result<()> {
    initialize_tracing();
    let vacant = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let address = vacant.local_addr()?.to_string();
    drop(vacant);

    let runtime = ActiveApp::launch_async().await;
    let mut configurator = ActiveObjectConfigurator::new(&runtime);
    let bound = configurator.register_remote(COUNTER, &address).await;
    assert!(matches!(bound, Err(ActiveError::Transport(_))), "unexpected result: {bound:?}");
    // a failed binding leaves the id free
    assert!(configurator.proxy(COUNTER).is_err());
    Ok(())
}
