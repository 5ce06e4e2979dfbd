//! Transaction lifecycle: identity, nonce sequencing, building, broadcast and confirmation

mod broadcaster;
mod builder;
mod confirmation;
mod gas;
mod nonce;
mod signer;
mod transaction;

pub use broadcaster::Broadcaster;
pub use builder::TransactionBuilder;
pub use confirmation::ConfirmationTracker;
pub use gas::{CallKind, GasEstimator};
pub use nonce::NonceSequencer;
pub use signer::SignerIdentity;
pub use transaction::{SignedTransaction, UnsignedTransaction};
