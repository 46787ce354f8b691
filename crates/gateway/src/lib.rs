//! chatgate server: gate dispatcher, HTTP surface, bootstrap and CLI.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod gate;
pub mod state;
