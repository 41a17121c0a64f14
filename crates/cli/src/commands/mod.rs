//! Command handlers for the newsdesk CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod expand;
pub mod route;
mod runtime;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use expand::ExpandCommand;
pub use route::RouteCommand;
