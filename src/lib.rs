//! Two-party alternating token passing over UDP.
//!
//! Two endpoints, the [initiator][Role::Initiator] and the [responder][Role::Responder],
//! exchange fixed tokens in strictly alternating rounds. The blocking receive of the peer
//! token is the only synchronization between them.
//!
//! Use [`launch`] to run both endpoints in separate threads, or [`run`] to run a single endpoint.

// Add warnings for missing public and private documentation.
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

pub mod common;

pub mod real;

pub use common::config::{EndpointConfig, StartBarrier};
pub use common::error::{ConfigError, EndpointError, TransportError, TransportOp};
pub use common::role::Role;
pub use common::state::EndpointState;
pub use common::token::Token;
pub use real::endpoint::{run, run_blocking, serve, Endpoint, ExchangeReport};
pub use real::launcher::{launch, LaunchError, LaunchReport, LauncherConfig};
pub use real::transport::{RecordingTransport, Transport, UdpTransport, WireEvent, WireLog};
