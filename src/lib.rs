//! Transaction-issuing client for EVM-compatible chains
//!
//! An [`Account`] owns a signing identity and its nonce sequence, builds and
//! signs transactions, submits them to a [`chain::RemotePeer`] and polls
//! until they are final.

pub mod account;
pub mod chain;
pub mod config;
pub mod contract;
pub mod error;
pub mod meter;
pub mod metrics;
pub mod tx;

#[cfg(test)]
pub(crate) mod test_utils;

pub use account::Account;
pub use error::{ClientError, ClientResult, Stage};
