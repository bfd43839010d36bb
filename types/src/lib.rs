//! Common types for the covault pooled-contribution vault.
//!
//! Everything that crosses the host boundary or lands in persistent state is
//! defined here with an explicit binary codec: opaque identifiers, the vault
//! configuration and lifecycle status, participant and holder records, token
//! metadata, the typed state `Key`/`Value` pairs, the inbound invocation
//! [`Envelope`], and the per-invocation [`Receipt`].

mod codec;
mod constants;
pub mod execution;
mod primitives;
mod token;
mod vault;

pub use codec::{read_string, string_encode_size, write_string};
pub use constants::*;
pub use execution::{Envelope, Event, Key, Payment, Receipt, Trigger, Value};
pub use primitives::{Address, AssetId, TokenId};
pub use token::{
    HolderRecord, HolderSet, PayoutRecord, SettlementRecord, TokenMeta, TokenSet,
};
pub use vault::{ConfigError, ContributorSet, Insertion, Participant, VaultConfig, VaultStatus};
