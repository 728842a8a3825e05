//! Integration tests for the ultramem binary and library run flow.
//!
//! Run with: `cargo test --test integration`

mod cli;
mod run_flow;
