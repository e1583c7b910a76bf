//! realm-core: resource accounting and hex adjacency for a grid-world
//! strategy simulation.
//!
//! Balances accrue lazily from stored checkpoints, spatial questions are
//! answered by composing predicates over attribute tables, and resource
//! chests move between entities exactly once.

pub mod arrival_subsystem;
pub mod attribute;
pub mod clock;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod gateway;
pub mod hex;
pub mod ledger;
pub mod observe;
pub mod query;
pub mod rng;
pub mod scenario_subsystem;
pub mod serde_u128_string;
pub mod settlement_subsystem;
pub mod spatial;
pub mod store;
pub mod subsystem;
pub mod transfer;
pub mod types;
