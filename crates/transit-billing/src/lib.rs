#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod error;
mod service;

pub use error::BillingError;
pub use service::{BillingService, round4, token_cost};
