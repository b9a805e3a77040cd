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

use acton_active::prelude::*;

// state values need Clone, Debug and serde; the macro derives what is missing
#[active_state]
struct Ledger {
    balance: i64,
    deposits: u32,
}

#[active_message]
struct Receipt {
    balance: i64,
    deposits: u32,
}

#[active_main]
async fn main() -> Result<(), ActiveError> {
    let runtime = ActiveApp::launch_async().await;
    let mut configurator = ActiveObjectConfigurator::new(&runtime);

    let mut table = DispatchTable::new("ledger");
    table
        .mutate_on("deposit", |cell: &mut StateCell<Ledger>, amount: i64| {
            if amount <= 0 {
                return Err(ActiveError::application("deposits must be positive"));
            }
            cell.update(|ledger| {
                ledger.balance += amount;
                ledger.deposits += 1;
                Receipt {
                    balance: ledger.balance,
                    deposits: ledger.deposits,
                }
            })
        })
        .act_on("balance", |cell: &StateCell<Ledger>, (): ()| Ok(cell.read().balance));

    let ledger = configurator
        .register_local(LocalRegistration::new(StateCell::new(Ledger::default()), table))
        .await?;

    let receipt: Receipt = ledger.call("deposit", 25_i64).await?;
    println!("Deposited, balance is now {} after {} deposit(s)", receipt.balance, receipt.deposits);

    // a rejected deposit rolls back and leaves the balance alone
    if let Err(error) = ledger.call::<_, Receipt>("deposit", -5_i64).await {
        println!("Rejected: {error}");
    }
    let balance: i64 = ledger.call("balance", ()).await?;
    println!("Balance after the rejected deposit: {balance}");

    configurator.shutdown().await?;
    Ok(())
}
