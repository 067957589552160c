//! Host simulator: versioned world state, invocation dispatch, configuration.

pub mod command;
pub mod command_dispatcher;
pub mod config;
pub mod world_state;

mod integration_tests;
