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

use std::time::SystemTime;

use crate::message::{Invocation, ReplyTarget, SystemSignal};

/// An invocation on its way through an actor's mailbox, together with where its
/// result must go.
#[derive(Debug)]
pub struct Envelope {
    pub(crate) invocation: Invocation,
    pub(crate) reply_to: ReplyTarget,
    pub(crate) timestamp: SystemTime,
}

impl Envelope {
    /// Wraps an invocation and its reply target.
    #[must_use]
    pub fn new(invocation: Invocation, reply_to: ReplyTarget) -> Self {
        Self {
            invocation,
            reply_to,
            timestamp: SystemTime::now(),
        }
    }

    /// The call being carried.
    #[must_use]
    pub const fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    /// When the envelope was created.
    #[must_use]
    pub const fn timestamp(&self) -> &SystemTime {
        &self.timestamp
    }
}

/// What an actor's mailbox carries.
#[derive(Debug)]
pub(crate) enum MailboxItem {
    Invoke(Envelope),
    Signal(SystemSignal),
}
