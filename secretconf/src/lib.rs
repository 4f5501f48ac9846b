//! secretconf: sectioned credential files where every field whose name starts
//! with `__` is encrypted at rest and decrypted transparently on read.
//!
//! The store (`store`) owns the file format and the read-modify-write cycle;
//! the envelope (`crypto`) seals individual values. `config` and `cli` are the
//! thin front-end used by the `hush` binaries.

pub mod cli;
pub mod config;
pub mod crypto;
pub mod store;

pub use crypto::{derive_key, generate_keypair, SecretKey};
pub use store::{read_section, read_store, write_section, Section, SectionStore, Store, StoreError};
