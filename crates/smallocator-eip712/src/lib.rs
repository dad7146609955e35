//! C5: EIP-712 claim-hash derivation and EIP-2098 signing for The Compact.

pub mod claim_hash;
pub mod domain;
pub mod signer;

pub use claim_hash::claim_hash;
pub use signer::{CompactSignature, Eip2098Error, SmallocatorSigner};
