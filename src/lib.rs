// ABOUTME: Library root for verity - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod backend;
pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod fix;
pub mod graph;
pub mod output;
pub mod resilience;
pub mod scripts;
pub mod session;
pub mod testing;
pub mod types;
