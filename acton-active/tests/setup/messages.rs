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

/// One entry recorded by the ordering fixture: which sender, and its sequence number.
#[active_message]
#[derive(PartialEq, Eq)]
pub struct Stamp {
    pub sender: u32,
    pub seq: u32,
}

/// Totals reported by the account fixture.
#[active_message]
#[derive(PartialEq, Eq)]
pub struct Statement {
    pub balance: i64,
    pub history: Vec<i64>,
    pub operations: u64,
}
