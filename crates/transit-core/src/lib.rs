#![allow(clippy::must_use_candidate)]

mod context;
mod error;

pub use context::AuthedUser;
pub use error::HttpError;
