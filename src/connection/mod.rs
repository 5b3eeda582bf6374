//! Connection plumbing
//!
//! This module handles:
//! * SSH tunnel lifecycle (handshake, auth, local port forward)
//! * The byte pump between the loopback listener and the SSH channel

mod tunnel;

pub use tunnel::SshTunnel;
