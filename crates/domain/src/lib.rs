//! Shared domain types for the chatgate workspace: configuration, the
//! collaborator error type, and structured trace events.

pub mod config;
pub mod error;
pub mod trace;
