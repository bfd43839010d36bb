//! Host-boundary types: the inbound invocation envelope, the typed state
//! key/value pairs, outbound payment instructions, events, and the
//! per-invocation receipt.

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};

use crate::{
    read_string, string_encode_size, write_string, Address, AssetId, ContributorSet, HolderSet,
    Participant, PayoutRecord, SettlementRecord, TokenId, TokenMeta, TokenSet, VaultConfig,
    VaultStatus, DUST_CEILING, MAX_EVENTS, MAX_REASON_LENGTH,
};

/// One inbound transaction, as classified and decoded by the host adapter.
/// The engine sees exactly one envelope per invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub sender: Address,
    pub trigger: Trigger,
}

/// What the inbound transaction carries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// A payment in the settlement asset. At or below [`DUST_CEILING`] it is
    /// a control signal; above, a contribution.
    /// Binary: [0] [amount:u64 BE]
    Payment { amount: u64 },

    /// A coupon deposit in the coupon currency, to be split among current
    /// holders.
    /// Binary: [1] [amount:u64 BE]
    Coupon { amount: u64 },

    /// Administrative sweep flipping matured flags on tracked tokens.
    /// Binary: [2]
    MaturityScan,

    /// Host callback reporting whether the queued settlement payment was
    /// actually delivered.
    /// Binary: [3] [success:u8]
    SettlementDelivery { success: bool },

    /// The sender asks for their contribution back. Only honored in refund
    /// mode.
    /// Binary: [4]
    RefundClaim,
}

impl Trigger {
    /// Whether a payment of `amount` is a control signal rather than a
    /// contribution.
    pub fn is_dust(amount: u64) -> bool {
        amount <= DUST_CEILING
    }
}

impl Write for Envelope {
    fn write(&self, writer: &mut impl BufMut) {
        self.sender.write(writer);
        self.trigger.write(writer);
    }
}

impl Read for Envelope {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            sender: Address::read(reader)?,
            trigger: Trigger::read(reader)?,
        })
    }
}

impl EncodeSize for Envelope {
    fn encode_size(&self) -> usize {
        Address::SIZE + self.trigger.encode_size()
    }
}

impl Write for Trigger {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Payment { amount } => {
                0u8.write(writer);
                amount.write(writer);
            }
            Self::Coupon { amount } => {
                1u8.write(writer);
                amount.write(writer);
            }
            Self::MaturityScan => 2u8.write(writer),
            Self::SettlementDelivery { success } => {
                3u8.write(writer);
                success.write(writer);
            }
            Self::RefundClaim => 4u8.write(writer),
        }
    }
}

impl Read for Trigger {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let trigger = match reader.get_u8() {
            0 => Self::Payment {
                amount: u64::read(reader)?,
            },
            1 => Self::Coupon {
                amount: u64::read(reader)?,
            },
            2 => Self::MaturityScan,
            3 => Self::SettlementDelivery {
                success: bool::read(reader)?,
            },
            4 => Self::RefundClaim,
            i => return Err(Error::InvalidEnum(i)),
        };
        Ok(trigger)
    }
}

impl EncodeSize for Trigger {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Payment { amount } | Self::Coupon { amount } => amount.encode_size(),
                Self::MaturityScan | Self::RefundClaim => 0,
                Self::SettlementDelivery { success } => success.encode_size(),
            }
    }
}

/// An outbound payment instruction queued with the emitter. Serialization
/// into the host's transaction format happens outside the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Payment {
    pub destination: Address,
    pub amount: u64,
    pub asset: AssetId,
}

impl Write for Payment {
    fn write(&self, writer: &mut impl BufMut) {
        self.destination.write(writer);
        self.amount.write(writer);
        self.asset.write(writer);
    }
}

impl Read for Payment {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            destination: Address::read(reader)?,
            amount: u64::read(reader)?,
            asset: AssetId::read(reader)?,
        })
    }
}

impl EncodeSize for Payment {
    fn encode_size(&self) -> usize {
        Address::SIZE + self.amount.encode_size() + AssetId::SIZE
    }
}

/// Typed persistent-state keys.
#[derive(Hash, Eq, PartialEq, Ord, PartialOrd, Clone, Debug)]
pub enum Key {
    /// Immutable vault parameters (tag 0).
    Config,
    /// Lifecycle status (tag 1).
    Status,
    /// Aggregate raised total (tag 2).
    TotalRaised,
    /// Per-contributor ledger record (tag 3).
    Participant(Address),
    /// Bounded contributor index (tag 4).
    Contributors,
    /// Staged token-holder population (tag 5).
    Holders,
    /// Per-token metadata (tag 6).
    Token(TokenId),
    /// Bounded token index for the maturity sweep (tag 7).
    Tokens,
    /// Token currently receiving coupons (tag 8).
    ActiveToken,
    /// Last coupon distribution bookkeeping (tag 9).
    LastPayout,
    /// Settlement emission tracking (tag 10).
    Settlement,
}

impl Write for Key {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Config => 0u8.write(writer),
            Self::Status => 1u8.write(writer),
            Self::TotalRaised => 2u8.write(writer),
            Self::Participant(address) => {
                3u8.write(writer);
                address.write(writer);
            }
            Self::Contributors => 4u8.write(writer),
            Self::Holders => 5u8.write(writer),
            Self::Token(token) => {
                6u8.write(writer);
                token.write(writer);
            }
            Self::Tokens => 7u8.write(writer),
            Self::ActiveToken => 8u8.write(writer),
            Self::LastPayout => 9u8.write(writer),
            Self::Settlement => 10u8.write(writer),
        }
    }
}

impl Read for Key {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let key = match reader.get_u8() {
            0 => Self::Config,
            1 => Self::Status,
            2 => Self::TotalRaised,
            3 => Self::Participant(Address::read(reader)?),
            4 => Self::Contributors,
            5 => Self::Holders,
            6 => Self::Token(TokenId::read(reader)?),
            7 => Self::Tokens,
            8 => Self::ActiveToken,
            9 => Self::LastPayout,
            10 => Self::Settlement,
            i => return Err(Error::InvalidEnum(i)),
        };
        Ok(key)
    }
}

impl EncodeSize for Key {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Participant(_) => Address::SIZE,
                Self::Token(_) => TokenId::SIZE,
                Self::Config
                | Self::Status
                | Self::TotalRaised
                | Self::Contributors
                | Self::Holders
                | Self::Tokens
                | Self::ActiveToken
                | Self::LastPayout
                | Self::Settlement => 0,
            }
    }
}

/// Typed persistent-state values. Tags mirror [`Key`].
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Value {
    Config(VaultConfig),
    Status(VaultStatus),
    TotalRaised(u64),
    Participant(Participant),
    Contributors(ContributorSet),
    Holders(HolderSet),
    Token(TokenMeta),
    Tokens(TokenSet),
    ActiveToken(TokenId),
    LastPayout(PayoutRecord),
    Settlement(SettlementRecord),
}

impl Write for Value {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Config(config) => {
                0u8.write(writer);
                config.write(writer);
            }
            Self::Status(status) => {
                1u8.write(writer);
                status.write(writer);
            }
            Self::TotalRaised(total) => {
                2u8.write(writer);
                total.write(writer);
            }
            Self::Participant(participant) => {
                3u8.write(writer);
                participant.write(writer);
            }
            Self::Contributors(contributors) => {
                4u8.write(writer);
                contributors.write(writer);
            }
            Self::Holders(holders) => {
                5u8.write(writer);
                holders.write(writer);
            }
            Self::Token(meta) => {
                6u8.write(writer);
                meta.write(writer);
            }
            Self::Tokens(tokens) => {
                7u8.write(writer);
                tokens.write(writer);
            }
            Self::ActiveToken(token) => {
                8u8.write(writer);
                token.write(writer);
            }
            Self::LastPayout(record) => {
                9u8.write(writer);
                record.write(writer);
            }
            Self::Settlement(record) => {
                10u8.write(writer);
                record.write(writer);
            }
        }
    }
}

impl Read for Value {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let value = match reader.get_u8() {
            0 => Self::Config(VaultConfig::read(reader)?),
            1 => Self::Status(VaultStatus::read(reader)?),
            2 => Self::TotalRaised(u64::read(reader)?),
            3 => Self::Participant(Participant::read(reader)?),
            4 => Self::Contributors(ContributorSet::read(reader)?),
            5 => Self::Holders(HolderSet::read(reader)?),
            6 => Self::Token(TokenMeta::read(reader)?),
            7 => Self::Tokens(TokenSet::read(reader)?),
            8 => Self::ActiveToken(TokenId::read(reader)?),
            9 => Self::LastPayout(PayoutRecord::read(reader)?),
            10 => Self::Settlement(SettlementRecord::read(reader)?),
            i => return Err(Error::InvalidEnum(i)),
        };
        Ok(value)
    }
}

impl EncodeSize for Value {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Config(config) => config.encode_size(),
                Self::Status(status) => status.encode_size(),
                Self::TotalRaised(total) => total.encode_size(),
                Self::Participant(participant) => participant.encode_size(),
                Self::Contributors(contributors) => contributors.encode_size(),
                Self::Holders(holders) => holders.encode_size(),
                Self::Token(meta) => meta.encode_size(),
                Self::Tokens(tokens) => tokens.encode_size(),
                Self::ActiveToken(_) => TokenId::SIZE,
                Self::LastPayout(record) => record.encode_size(),
                Self::Settlement(record) => record.encode_size(),
            }
    }
}

/// Events reported by an accepted invocation, for audit trails and host
/// logging. Rejected invocations report none (everything rolls back).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// A contribution was recorded (tag 0).
    ContributionRecorded {
        contributor: Address,
        amount: u64,
        total_contributed: u64,
        total_raised: u64,
    },
    /// The aggregate total crossed the funding target (tag 1). Fired at most
    /// once per vault.
    ThresholdReached { total_raised: u64 },
    /// The settlement payment to the beneficiary was queued (tag 2).
    VaultSettled { beneficiary: Address, amount: u64 },
    /// The initial token allocation was staged to contributors (tag 3).
    TokensStaged {
        holders: u32,
        supply: u64,
        staged: u64,
    },
    /// The vault missed its target and refunds opened (tag 4).
    RefundModeActivated {
        total_raised: u64,
        target_amount: u64,
    },
    /// A refund payment was queued (tag 5).
    RefundIssued { contributor: Address, amount: u64 },
    /// A coupon pool was split among holders (tag 6).
    CouponDistributed {
        pool: u64,
        distributed: u64,
        recipients: u32,
    },
    /// An individual coupon payment could not be queued and was skipped
    /// (tag 7).
    CouponSkipped { holder: Address, share: u64 },
    /// A token's maturity flag flipped (tag 8).
    TokenMatured { token: TokenId, maturity_ts: u64 },
    /// The host confirmed delivery of the settlement payment (tag 9).
    SettlementConfirmed { amount: u64 },
}

impl Write for Event {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::ContributionRecorded {
                contributor,
                amount,
                total_contributed,
                total_raised,
            } => {
                0u8.write(writer);
                contributor.write(writer);
                amount.write(writer);
                total_contributed.write(writer);
                total_raised.write(writer);
            }
            Self::ThresholdReached { total_raised } => {
                1u8.write(writer);
                total_raised.write(writer);
            }
            Self::VaultSettled {
                beneficiary,
                amount,
            } => {
                2u8.write(writer);
                beneficiary.write(writer);
                amount.write(writer);
            }
            Self::TokensStaged {
                holders,
                supply,
                staged,
            } => {
                3u8.write(writer);
                holders.write(writer);
                supply.write(writer);
                staged.write(writer);
            }
            Self::RefundModeActivated {
                total_raised,
                target_amount,
            } => {
                4u8.write(writer);
                total_raised.write(writer);
                target_amount.write(writer);
            }
            Self::RefundIssued {
                contributor,
                amount,
            } => {
                5u8.write(writer);
                contributor.write(writer);
                amount.write(writer);
            }
            Self::CouponDistributed {
                pool,
                distributed,
                recipients,
            } => {
                6u8.write(writer);
                pool.write(writer);
                distributed.write(writer);
                recipients.write(writer);
            }
            Self::CouponSkipped { holder, share } => {
                7u8.write(writer);
                holder.write(writer);
                share.write(writer);
            }
            Self::TokenMatured { token, maturity_ts } => {
                8u8.write(writer);
                token.write(writer);
                maturity_ts.write(writer);
            }
            Self::SettlementConfirmed { amount } => {
                9u8.write(writer);
                amount.write(writer);
            }
        }
    }
}

impl Read for Event {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let event = match reader.get_u8() {
            0 => Self::ContributionRecorded {
                contributor: Address::read(reader)?,
                amount: u64::read(reader)?,
                total_contributed: u64::read(reader)?,
                total_raised: u64::read(reader)?,
            },
            1 => Self::ThresholdReached {
                total_raised: u64::read(reader)?,
            },
            2 => Self::VaultSettled {
                beneficiary: Address::read(reader)?,
                amount: u64::read(reader)?,
            },
            3 => Self::TokensStaged {
                holders: u32::read(reader)?,
                supply: u64::read(reader)?,
                staged: u64::read(reader)?,
            },
            4 => Self::RefundModeActivated {
                total_raised: u64::read(reader)?,
                target_amount: u64::read(reader)?,
            },
            5 => Self::RefundIssued {
                contributor: Address::read(reader)?,
                amount: u64::read(reader)?,
            },
            6 => Self::CouponDistributed {
                pool: u64::read(reader)?,
                distributed: u64::read(reader)?,
                recipients: u32::read(reader)?,
            },
            7 => Self::CouponSkipped {
                holder: Address::read(reader)?,
                share: u64::read(reader)?,
            },
            8 => Self::TokenMatured {
                token: TokenId::read(reader)?,
                maturity_ts: u64::read(reader)?,
            },
            9 => Self::SettlementConfirmed {
                amount: u64::read(reader)?,
            },
            i => return Err(Error::InvalidEnum(i)),
        };
        Ok(event)
    }
}

impl EncodeSize for Event {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::ContributionRecorded { .. } => Address::SIZE + 3 * u64::SIZE,
                Self::ThresholdReached { .. } => u64::SIZE,
                Self::VaultSettled { .. } => Address::SIZE + u64::SIZE,
                Self::TokensStaged { .. } => u32::SIZE + 2 * u64::SIZE,
                Self::RefundModeActivated { .. } => 2 * u64::SIZE,
                Self::RefundIssued { .. } => Address::SIZE + u64::SIZE,
                Self::CouponDistributed { .. } => 2 * u64::SIZE + u32::SIZE,
                Self::CouponSkipped { .. } => Address::SIZE + u64::SIZE,
                Self::TokenMatured { .. } => TokenId::SIZE + u64::SIZE,
                Self::SettlementConfirmed { .. } => u64::SIZE,
            }
    }
}

/// The terminal result of one invocation. `Rejected` obliges the host to
/// discard every buffered state write and queued payment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Receipt {
    Accepted {
        reason: String,
        events: Vec<Event>,
    },
    Rejected {
        reason: String,
        code: u32,
    },
}

impl Receipt {
    pub fn accepted(reason: &str, events: Vec<Event>) -> Self {
        Self::Accepted {
            reason: reason.to_string(),
            events,
        }
    }

    pub fn rejected(reason: &str, code: u32) -> Self {
        Self::Rejected {
            reason: reason.to_string(),
            code,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    pub fn events(&self) -> &[Event] {
        match self {
            Self::Accepted { events, .. } => events,
            Self::Rejected { .. } => &[],
        }
    }
}

impl Write for Receipt {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Accepted { reason, events } => {
                0u8.write(writer);
                write_string(reason, writer);
                (events.len() as u32).write(writer);
                for event in events {
                    event.write(writer);
                }
            }
            Self::Rejected { reason, code } => {
                1u8.write(writer);
                write_string(reason, writer);
                code.write(writer);
            }
        }
    }
}

impl Read for Receipt {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let receipt = match reader.get_u8() {
            0 => {
                let reason = read_string(reader, MAX_REASON_LENGTH)?;
                let len = u32::read(reader)? as usize;
                if len > MAX_EVENTS {
                    return Err(Error::Invalid("Receipt", "too many events"));
                }
                let mut events = Vec::with_capacity(len);
                for _ in 0..len {
                    events.push(Event::read(reader)?);
                }
                Self::Accepted { reason, events }
            }
            1 => Self::Rejected {
                reason: read_string(reader, MAX_REASON_LENGTH)?,
                code: u32::read(reader)?,
            },
            i => return Err(Error::InvalidEnum(i)),
        };
        Ok(receipt)
    }
}

impl EncodeSize for Receipt {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Accepted { reason, events } => {
                    string_encode_size(reason)
                        + 4
                        + events.iter().map(|e| e.encode_size()).sum::<usize>()
                }
                Self::Rejected { reason, .. } => string_encode_size(reason) + u32::SIZE,
            }
    }
}
