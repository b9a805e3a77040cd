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

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

/// Where an actor's message loop currently is.
///
/// `Idle → Processing → Idle` for every message, `Stopped` once the loop has ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MailboxStatus {
    /// Waiting for the next message.
    Idle,
    /// Running a method.
    Processing,
    /// The loop has ended; every further invocation fails with `ActorStopped`.
    Stopped,
}

impl MailboxStatus {
    const fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Processing => 1,
            Self::Stopped => 2,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Processing,
            _ => Self::Stopped,
        }
    }
}

/// Status shared between an actor's loop and its handles.
#[derive(Debug, Default)]
pub(crate) struct MailboxMonitor {
    status: AtomicU8,
    closing: AtomicBool,
}

impl MailboxMonitor {
    pub(crate) fn status(&self) -> MailboxStatus {
        MailboxStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, status: MailboxStatus) {
        self.status.store(status.as_u8(), Ordering::Release);
    }

    /// Marks the mailbox as refusing new work.
    pub(crate) fn close(&self) {
        self.closing.store(true, Ordering::Release);
    }

    pub(crate) fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }
}
