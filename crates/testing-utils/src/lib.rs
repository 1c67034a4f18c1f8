//! # Campaign Testing Utils
//!
//! Test doubles and helpers shared by the workspace crates.
//!
//! - **Send capabilities**: [`ScriptedSender`] with scripted replies, an attempt
//!   log and an optional permit gate; [`PanickingSender`].
//! - **Session negotiation**: [`MockSessionNegotiator`] replaying pairing events.
//! - **Builders**: [`RecipientQueueBuilder`].
//! - **Helpers**: waiting on snapshots and collecting engine events.
//!
//! ```toml
//! [dev-dependencies]
//! campaign-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

pub use builders::*;
pub use helpers::*;
pub use mocks::*;
