//! Command handlers.
//!
//! Each handler receives the service borrowed from inside
//! `McpService::scoped` and prints to stdout. Errors are returned as
//! `CliError` so `main` can pick the exit code.

pub mod call;
pub mod check;
pub mod servers;
pub mod tools;
