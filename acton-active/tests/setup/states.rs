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

pub const TALLY: &str = "tally";

/// Running totals kept by the tally fixture.
#[active_state]
#[derive(PartialEq, Eq)]
pub struct Tally {
    pub total: i64,
    pub entries: u32,
}

/// Largest single entry the tally accepts.
#[active_state(no_default)]
#[derive(PartialEq, Eq)]
pub struct TallyLimits {
    pub max_entry: i64,
}

impl Default for TallyLimits {
    fn default() -> Self {
        Self { max_entry: 100 }
    }
}

pub fn tally_table(limits: TallyLimits) -> DispatchTable<BackedCell<Tally>> {
    let mut table = DispatchTable::new(TALLY);
    table
        .mutate_on("add", move |cell: &mut BackedCell<Tally>, amount: i64| {
            if amount.abs() > limits.max_entry {
                return Err(ActiveError::application(format!(
                    "entry {amount} exceeds {}",
                    limits.max_entry
                )));
            }
            cell.update(|tally| {
                tally.total += amount;
                tally.entries += 1;
                tally.clone()
            })
        })
        .act_on("read", |cell: &BackedCell<Tally>, (): ()| Ok(cell.read().clone()));
    table
}
