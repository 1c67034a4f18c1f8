//! Dispatch engine for bulk messaging campaigns.
//!
//! [`DispatchEngine`] walks a [`RecipientQueue`](campaign_domain::RecipientQueue),
//! sends through an injected [`SendCapability`](campaign_domain::SendCapability),
//! paces attempts with jittered delays and publishes [`RunSnapshot`]s to observers.
//! [`CampaignSession`] wraps one engine per (recipients, message) pair.

pub mod campaign;
pub mod controller;
pub mod engine;
pub mod outcome;
pub mod pacing;
pub mod run_state;

pub use campaign::{CampaignSession, CampaignStep};
pub use controller::ControlAction;
pub use engine::{DispatchEngine, DispatchEngineBuilder};
pub use outcome::classify;
pub use pacing::JitterPacer;
pub use run_state::RunState;

pub use campaign_domain::{CampaignSummary, DispatchEvent, Outcome, RunPhase, RunSnapshot};
