//! Vault configuration, lifecycle status, and the contribution ledger types.

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use thiserror::Error as ThisError;

use crate::{Address, AssetId, MAX_CONTRIBUTORS};

/// Immutable vault parameters, written once at initialization and read-only
/// for the engine afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VaultConfig {
    /// Funding threshold in atomic units of the settlement asset.
    pub target_amount: u64,
    /// Absolute ledger timestamp after which the vault can be finalized.
    pub deadline: u64,
    /// Recipient of the full raised amount on success.
    pub beneficiary: Address,
    /// Asset contributions are denominated in (and refunds/settlement paid in).
    pub settlement_asset: AssetId,
    /// Sender allowed to submit administrative triggers (maturity sweeps,
    /// settlement delivery callbacks).
    pub operator: Address,
    /// Token inventory staged proportionally to contributors on success.
    pub token_supply: u64,
}

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum ConfigError {
    #[error("target_amount must be non-zero")]
    TargetZero,
    #[error("deadline must be non-zero")]
    DeadlineZero,
    #[error("token_supply must be non-zero")]
    TokenSupplyZero,
}

impl VaultConfig {
    /// Check the parameters a host must not initialize a vault with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_amount == 0 {
            return Err(ConfigError::TargetZero);
        }
        if self.deadline == 0 {
            return Err(ConfigError::DeadlineZero);
        }
        if self.token_supply == 0 {
            return Err(ConfigError::TokenSupplyZero);
        }
        Ok(())
    }
}

impl Write for VaultConfig {
    fn write(&self, writer: &mut impl BufMut) {
        self.target_amount.write(writer);
        self.deadline.write(writer);
        self.beneficiary.write(writer);
        self.settlement_asset.write(writer);
        self.operator.write(writer);
        self.token_supply.write(writer);
    }
}

impl Read for VaultConfig {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            target_amount: u64::read(reader)?,
            deadline: u64::read(reader)?,
            beneficiary: Address::read(reader)?,
            settlement_asset: AssetId::read(reader)?,
            operator: Address::read(reader)?,
            token_supply: u64::read(reader)?,
        })
    }
}

impl EncodeSize for VaultConfig {
    fn encode_size(&self) -> usize {
        self.target_amount.encode_size()
            + self.deadline.encode_size()
            + Address::SIZE
            + AssetId::SIZE
            + Address::SIZE
            + self.token_supply.encode_size()
    }
}

/// Vault lifecycle status. Transitions only move forward:
/// `Active → ThresholdReached → {Succeeded | FailedRefunding}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum VaultStatus {
    #[default]
    Active,
    ThresholdReached,
    Succeeded,
    FailedRefunding,
}

impl VaultStatus {
    /// Whether contributions are still recorded in this status.
    pub fn accepts_contributions(&self) -> bool {
        matches!(self, Self::Active | Self::ThresholdReached)
    }

    /// Whether the deadline decision has already been made.
    pub fn is_finalized(&self) -> bool {
        matches!(self, Self::Succeeded | Self::FailedRefunding)
    }
}

impl Write for VaultStatus {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Active => 0u8.write(writer),
            Self::ThresholdReached => 1u8.write(writer),
            Self::Succeeded => 2u8.write(writer),
            Self::FailedRefunding => 3u8.write(writer),
        }
    }
}

impl Read for VaultStatus {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::Active),
            1 => Ok(Self::ThresholdReached),
            2 => Ok(Self::Succeeded),
            3 => Ok(Self::FailedRefunding),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl EncodeSize for VaultStatus {
    fn encode_size(&self) -> usize {
        u8::SIZE
    }
}

/// Per-contributor ledger record. Created on first contribution.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Participant {
    /// Total contributed, in atomic units. Only increases while the vault
    /// accepts contributions.
    pub contributed: u64,
    /// Flips false→true exactly once, when the refund payment is queued.
    pub refunded: bool,
}

impl Write for Participant {
    fn write(&self, writer: &mut impl BufMut) {
        self.contributed.write(writer);
        self.refunded.write(writer);
    }
}

impl Read for Participant {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            contributed: u64::read(reader)?,
            refunded: bool::read(reader)?,
        })
    }
}

impl EncodeSize for Participant {
    fn encode_size(&self) -> usize {
        self.contributed.encode_size() + self.refunded.encode_size()
    }
}

/// Result of a [`ContributorSet::insert`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Insertion {
    /// Address was added to the index.
    Inserted,
    /// Address was already present; the index is unchanged.
    Present,
    /// The index is at capacity; the address is not tracked.
    Full,
}

/// Insertion-ordered, capacity-bounded set of contributor addresses.
///
/// Insertion is idempotent: an address appears at most once regardless of how
/// many contributions it makes. Once the set holds [`MAX_CONTRIBUTORS`]
/// entries, further addresses are dropped rather than grown unbounded.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ContributorSet {
    entries: Vec<Address>,
}

impl ContributorSet {
    pub fn insert(&mut self, address: Address) -> Insertion {
        if self.entries.contains(&address) {
            return Insertion::Present;
        }
        if self.entries.len() >= MAX_CONTRIBUTORS {
            return Insertion::Full;
        }
        self.entries.push(address);
        Insertion::Inserted
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.entries.contains(address)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.entries.iter()
    }
}

impl Write for ContributorSet {
    fn write(&self, writer: &mut impl BufMut) {
        (self.entries.len() as u32).write(writer);
        for address in &self.entries {
            address.write(writer);
        }
    }
}

impl Read for ContributorSet {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let len = u32::read(reader)? as usize;
        if len > MAX_CONTRIBUTORS {
            return Err(Error::Invalid("ContributorSet", "too many entries"));
        }
        let mut entries = Vec::with_capacity(len);
        for _ in 0..len {
            let address = Address::read(reader)?;
            if entries.contains(&address) {
                return Err(Error::Invalid("ContributorSet", "duplicate address"));
            }
            entries.push(address);
        }
        Ok(Self { entries })
    }
}

impl EncodeSize for ContributorSet {
    fn encode_size(&self) -> usize {
        4 + self.entries.len() * Address::SIZE
    }
}
