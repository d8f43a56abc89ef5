#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

//! Atomic external stores backing admission control and balances
//!
//! Both stores offer a Redis backend, where the conditional updates run
//! as Lua scripts, and an in-memory backend implementing the identical
//! check-then-mutate semantics for tests and embedded use.

pub mod admission;
pub mod balance;
mod error;

pub use admission::AdmissionStore;
pub use balance::BalanceStore;
pub use error::StoreError;
