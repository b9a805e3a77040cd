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
use std::time::Duration;

use acton_active::prelude::*;

use crate::setup::messages::{Stamp, Statement};

pub const COUNTER: &str = "counter";
pub const ORDERING: &str = "ordering";
pub const ACCOUNT: &str = "account";

/// A counter whose state lives on whichever backend the test picks.
pub fn counter_table() -> DispatchTable<BackedCell<i64>> {
    let mut table = DispatchTable::new(COUNTER);
    table
        .mutate_on("increment", |cell: &mut BackedCell<i64>, by: i64| {
            cell.update(|value| {
                *value += by;
                *value
            })
        })
        .mutate_on("fail_after_write", |cell: &mut BackedCell<i64>, by: i64| -> Result<i64, ActiveError> {
            cell.update(|value| *value += by)?;
            Err(ActiveError::application("rejected after write"))
        })
        .mutate_on("panic_after_write", |cell: &mut BackedCell<i64>, by: i64| -> Result<i64, ActiveError> {
            cell.update(|value| *value += by)?;
            panic!("counter exploded");
        })
        .mutate_on("slow_increment", |cell: &mut BackedCell<i64>, millis: u64| {
            std::thread::sleep(Duration::from_millis(millis));
            cell.update(|value| {
                *value += 1;
                *value
            })
        })
        .act_on("read", |cell: &BackedCell<i64>, (): ()| Ok(*cell.read()));
    table
}

/// Typed view over a counter proxy.
#[derive(Debug, Clone)]
pub struct CounterProxy(pub ActiveProxy);

impl CounterProxy {
    pub async fn increment(&self, by: i64) -> Result<i64, ActiveError> {
        self.0.call("increment", by).await
    }

    pub async fn fail_after_write(&self, by: i64) -> Result<i64, ActiveError> {
        self.0.call("fail_after_write", by).await
    }

    pub async fn panic_after_write(&self, by: i64) -> Result<i64, ActiveError> {
        self.0.call("panic_after_write", by).await
    }

    pub async fn slow_increment(&self, millis: u64) -> Result<i64, ActiveError> {
        self.0.call("slow_increment", millis).await
    }

    pub async fn read(&self) -> Result<i64, ActiveError> {
        self.0.call("read", ()).await
    }
}

/// Records every stamp it receives, in arrival order.
pub fn ordering_table() -> DispatchTable<StateCell<Vec<Stamp>>> {
    let mut table = DispatchTable::new(ORDERING);
    table
        .mutate_on("push", |cell: &mut StateCell<Vec<Stamp>>, stamp: Stamp| {
            cell.update(|stamps| stamps.push(stamp))
        })
        .act_on("entries", |cell: &StateCell<Vec<Stamp>>, (): ()| Ok(cell.read().clone()));
    table
}

/// Keys of the account's children: balance, movement history and an operation count.
#[derive(Debug, Clone, Copy)]
pub struct AccountParts {
    pub balance: StateKey<BackedCell<i64>>,
    pub history: StateKey<BackedCell<Vec<i64>>>,
    pub audit: StateKey<BackedCell<u64>>,
}

/// Builds the account state. Each child takes its backend from the matching argument.
pub fn account_state(
    balance: &StateBackend,
    history: &StateBackend,
    audit: &StateBackend,
) -> (NestedState, AccountParts) {
    let mut state = NestedState::new();
    let parts = AccountParts {
        balance: state.register(balance.cell("account-balance", 0_i64)),
        history: state.register(history.cell("account-history", Vec::<i64>::new())),
        audit: state.register(audit.cell("account-audit", 0_u64)),
    };
    (state, parts)
}

fn apply(state: &mut NestedState, parts: &AccountParts, amount: i64) -> Result<i64, ActiveError> {
    let balance = state.get_mut(parts.balance)?.update(|balance| {
        *balance += amount;
        *balance
    })?;
    state.get_mut(parts.history)?.update(|history| history.push(amount))?;
    state.get_mut(parts.audit)?.update(|count| *count += 1)?;
    Ok(balance)
}

pub fn account_table(parts: &AccountParts) -> DispatchTable<NestedState> {
    let parts = *parts;
    let mut table = DispatchTable::new(ACCOUNT);
    table
        .mutate_on("deposit", move |state: &mut NestedState, amount: i64| {
            apply(state, &parts, amount)
        })
        .mutate_on("withdraw", move |state: &mut NestedState, amount: i64| {
            let result = apply(state, &parts, -amount)?;
            if result < 0 {
                return Err(ActiveError::application("insufficient funds"));
            }
            Ok(result)
        })
        .act_on("statement", move |state: &NestedState, (): ()| {
            Ok(Statement {
                balance: *state.get(parts.balance)?.read(),
                history: state.get(parts.history)?.read().clone(),
                operations: *state.get(parts.audit)?.read(),
            })
        });
    table
}
