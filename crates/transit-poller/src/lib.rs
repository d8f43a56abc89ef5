#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

//! Background reconciliation of async tasks against upstream status
//!
//! A single poller instance per deployment sweeps the running tasks on
//! a fixed interval, queries each task's upstream job, and drives the
//! terminal transitions together with their billing and admission side
//! effects. Running two pollers would duplicate refunds and releases;
//! the deployment constraint is one.

mod poller;

pub use poller::TaskPoller;
