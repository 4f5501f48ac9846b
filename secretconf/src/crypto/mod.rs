//! Cryptography used by the store: the sealed-value envelope, key derivation,
//! and the standalone key-pair helper. Each submodule covers one concern so
//! the security model stays small and auditable.

pub mod envelope;
pub mod integrity;
pub mod keypair;

pub use envelope::{open, seal, EnvelopeError, SecretKey};
pub use integrity::derive_key;
pub use keypair::{generate_keypair, KeyPairError, KeyPairPaths};
