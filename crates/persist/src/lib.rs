//! Persistence: bit-exact recording wire format and a file-backed recording
//! store.
//!
//! # Invariants
//! - Wire bytes decode to exactly the samples that were encoded.
//! - Stored files are covered by an append-only sha256 hash chain.
//! - Any integrity or schema mismatch fails closed.

pub mod store;
pub mod wire;

pub use store::{ChainLink, HashChain, RecordingMeta, RecordingStore, StoreError, StoreMeta};
pub use wire::{WireError, decode, encode, read_recording, write_recording};
