//! Definition of structures and functions,
//! which do not depend on the transport: roles, tokens, the state machine and config.

pub mod config;
pub mod error;
pub mod role;
pub mod state;
pub mod token;
