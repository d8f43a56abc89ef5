#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

//! Channel selection: weighted random pick plus admission reservation
//!
//! The pick only distributes load proportional to configured weight;
//! the admission store's conditional acquire is the true capacity gate,
//! which keeps selection stateless across processes.

mod error;
mod lease;
mod selector;

pub use error::SelectorError;
pub use lease::ChannelLease;
pub use selector::ChannelSelector;
