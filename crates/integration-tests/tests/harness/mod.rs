//! Shared test harness: in-memory relay state, a bound test server,
//! and wiremock helpers for the upstream provider

#![allow(dead_code)]

pub mod env;
pub mod server;
pub mod upstream;

pub use env::{ADMIN_TOKEN, API_KEY, TestEnv};
pub use server::TestServer;
