//! Chain module - the remote peer the client talks to
//!
//! This module provides:
//! - The [`RemotePeer`] trait every lifecycle component depends on
//! - An ethers-backed implementation over HTTP JSON-RPC
//! - The request/receipt types exchanged with the peer

pub mod peer;
pub mod provider;
pub mod types;

pub use peer::{PeerError, PeerResult, RemotePeer};
pub use provider::EthersPeer;
pub use types::{CallRequest, LogEntry, Receipt, TxLookup};

#[cfg(test)]
pub use peer::MockRemotePeer;
