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

//! Test support for Acton Active.
//!
//! `#[active_test]` runs an async test on its own multi-thread Tokio runtime, inside a
//! tracing span named after the test, and logs the location of every panic.
//!
//! ```ignore
//! use acton_active_test::prelude::*;
//!
//! #[active_test]
//! async fn counter_increments() -> anyhow::Result<()> {
//!     // ...
//!     Ok(())
//! }
//! ```

/// Re-exports for test files.
pub mod prelude {
    pub use acton_active_test_macro::active_test;
}

#[doc(hidden)]
pub mod __private {
    pub use tokio;
    pub use tracing;
}
