//! Real mode: endpoints talking over UDP sockets on the loopback host.

pub mod barrier;
pub mod endpoint;
pub mod launcher;
pub mod transport;

#[cfg(test)]
mod tests;
