//! Bilateral trade negotiation for computer-controlled parties.
//!
//! The engine drafts, balances and judges two-sided proposals. Everything it
//! knows about the game comes through the traits in [`world`] and [`oracle`].

mod balancer;
mod gold;
mod inventory;
mod limiter;
mod oracle;
mod orchestrator;
mod rng;
mod rules;
pub mod sandbox;
pub mod selfplay;
mod threshold;
mod world;

pub use crate::balancer::*;
pub use crate::gold::*;
pub use crate::inventory::*;
pub use crate::limiter::*;
pub use crate::oracle::*;
pub use crate::orchestrator::*;
pub use crate::rng::*;
pub use crate::rules::*;
pub use crate::selfplay::{
    run_selfplay, Scenario, ScenarioError, SelfPlayConfig, SelfPlayReport,
};
pub use crate::threshold::*;
pub use crate::world::*;
