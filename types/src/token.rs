//! Token metadata, holder records, and distribution bookkeeping.

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};

use crate::{Address, TokenId, MAX_HOLDERS, MAX_TOKENS};

/// Per-token lifecycle metadata, keyed by [`TokenId`] in persistent state.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct TokenMeta {
    /// Absolute ledger timestamp at which the token matures.
    pub maturity_ts: u64,
    /// Coupons left to pay. Only decreases, floored at zero.
    pub coupons_remaining: u64,
    /// Monotonic false→true.
    pub is_matured: bool,
}

impl TokenMeta {
    /// Whether a sweep at `now` should flip the matured flag.
    pub fn matures_at(&self, now: u64) -> bool {
        !self.is_matured && now >= self.maturity_ts
    }

    pub fn mark_matured(&mut self) {
        self.is_matured = true;
    }

    /// Consume one coupon, flooring at zero.
    pub fn consume_coupon(&mut self) {
        self.coupons_remaining = self.coupons_remaining.saturating_sub(1);
    }
}

impl Write for TokenMeta {
    fn write(&self, writer: &mut impl BufMut) {
        self.maturity_ts.write(writer);
        self.coupons_remaining.write(writer);
        self.is_matured.write(writer);
    }
}

impl Read for TokenMeta {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            maturity_ts: u64::read(reader)?,
            coupons_remaining: u64::read(reader)?,
            is_matured: bool::read(reader)?,
        })
    }
}

impl EncodeSize for TokenMeta {
    fn encode_size(&self) -> usize {
        self.maturity_ts.encode_size()
            + self.coupons_remaining.encode_size()
            + self.is_matured.encode_size()
    }
}

/// Insertion-ordered, capacity-bounded set of token ids swept by the
/// maturity tracker.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct TokenSet {
    entries: Vec<TokenId>,
}

impl TokenSet {
    /// Idempotent insert; returns false when already present or at capacity.
    pub fn insert(&mut self, token: TokenId) -> bool {
        if self.entries.contains(&token) || self.entries.len() >= MAX_TOKENS {
            return false;
        }
        self.entries.push(token);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TokenId> {
        self.entries.iter()
    }
}

impl Write for TokenSet {
    fn write(&self, writer: &mut impl BufMut) {
        (self.entries.len() as u32).write(writer);
        for token in &self.entries {
            token.write(writer);
        }
    }
}

impl Read for TokenSet {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let len = u32::read(reader)? as usize;
        if len > MAX_TOKENS {
            return Err(Error::Invalid("TokenSet", "too many entries"));
        }
        let mut entries = Vec::with_capacity(len);
        for _ in 0..len {
            entries.push(TokenId::read(reader)?);
        }
        Ok(Self { entries })
    }
}

impl EncodeSize for TokenSet {
    fn encode_size(&self) -> usize {
        4 + self.entries.len() * TokenId::SIZE
    }
}

/// A token holder and its recorded holding, the weight used for coupon
/// distribution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HolderRecord {
    pub address: Address,
    pub held_units: u64,
}

impl Write for HolderRecord {
    fn write(&self, writer: &mut impl BufMut) {
        self.address.write(writer);
        self.held_units.write(writer);
    }
}

impl Read for HolderRecord {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            address: Address::read(reader)?,
            held_units: u64::read(reader)?,
        })
    }
}

impl EncodeSize for HolderRecord {
    fn encode_size(&self) -> usize {
        Address::SIZE + self.held_units.encode_size()
    }
}

/// Capacity-bounded list of token holders. The staged token-holding
/// population that coupon payouts distribute over; it may differ from the
/// original contributor index.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct HolderSet {
    entries: Vec<HolderRecord>,
}

impl HolderSet {
    /// Set `address`'s holding to `held_units`, inserting if new. Returns
    /// false when a new entry would exceed capacity.
    pub fn stage(&mut self, address: Address, held_units: u64) -> bool {
        if let Some(existing) = self.entries.iter_mut().find(|r| r.address == address) {
            existing.held_units = held_units;
            return true;
        }
        if self.entries.len() >= MAX_HOLDERS {
            return false;
        }
        self.entries.push(HolderRecord {
            address,
            held_units,
        });
        true
    }

    pub fn holding(&self, address: &Address) -> u64 {
        self.entries
            .iter()
            .find(|r| r.address == *address)
            .map(|r| r.held_units)
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HolderRecord> {
        self.entries.iter()
    }
}

impl Write for HolderSet {
    fn write(&self, writer: &mut impl BufMut) {
        (self.entries.len() as u32).write(writer);
        for record in &self.entries {
            record.write(writer);
        }
    }
}

impl Read for HolderSet {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let len = u32::read(reader)? as usize;
        if len > MAX_HOLDERS {
            return Err(Error::Invalid("HolderSet", "too many entries"));
        }
        let mut entries = Vec::with_capacity(len);
        for _ in 0..len {
            let record = HolderRecord::read(reader)?;
            if entries.iter().any(|r: &HolderRecord| r.address == record.address) {
                return Err(Error::Invalid("HolderSet", "duplicate address"));
            }
            entries.push(record);
        }
        Ok(Self { entries })
    }
}

impl EncodeSize for HolderSet {
    fn encode_size(&self) -> usize {
        4 + self.entries.len() * (Address::SIZE + u64::SIZE)
    }
}

/// Bookkeeping for the most recent coupon distribution.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct PayoutRecord {
    /// Incoming pool amount.
    pub pool: u64,
    /// Total actually allotted; `pool - distributed` is dust retained by the
    /// vault.
    pub distributed: u64,
    /// Holders that received a non-zero share.
    pub recipients: u32,
    /// Holders whose share could not be queued and was retained instead.
    pub skipped: u32,
    /// Ledger time of the triggering invocation.
    pub time: u64,
}

impl Write for PayoutRecord {
    fn write(&self, writer: &mut impl BufMut) {
        self.pool.write(writer);
        self.distributed.write(writer);
        self.recipients.write(writer);
        self.skipped.write(writer);
        self.time.write(writer);
    }
}

impl Read for PayoutRecord {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            pool: u64::read(reader)?,
            distributed: u64::read(reader)?,
            recipients: u32::read(reader)?,
            skipped: u32::read(reader)?,
            time: u64::read(reader)?,
        })
    }
}

impl EncodeSize for PayoutRecord {
    fn encode_size(&self) -> usize {
        self.pool.encode_size()
            + self.distributed.encode_size()
            + self.recipients.encode_size()
            + self.skipped.encode_size()
            + self.time.encode_size()
    }
}

/// Settlement payment tracking. Emission only queues an instruction; the
/// host reports actual delivery later, so "queued" and "confirmed" are
/// recorded separately.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct SettlementRecord {
    pub amount: u64,
    /// Ledger time at which the payment was queued.
    pub emitted_at: u64,
    /// Set once the host reports successful delivery.
    pub confirmed: bool,
}

impl Write for SettlementRecord {
    fn write(&self, writer: &mut impl BufMut) {
        self.amount.write(writer);
        self.emitted_at.write(writer);
        self.confirmed.write(writer);
    }
}

impl Read for SettlementRecord {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            amount: u64::read(reader)?,
            emitted_at: u64::read(reader)?,
            confirmed: bool::read(reader)?,
        })
    }
}

impl EncodeSize for SettlementRecord {
    fn encode_size(&self) -> usize {
        self.amount.encode_size() + self.emitted_at.encode_size() + self.confirmed.encode_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_codec::{Encode, ReadExt};

    fn addr(tag: u8) -> Address {
        Address::new([tag; Address::LEN])
    }

    #[test]
    fn matured_flag_is_monotonic() {
        let mut meta = TokenMeta {
            maturity_ts: 100,
            coupons_remaining: 4,
            is_matured: false,
        };
        assert!(!meta.matures_at(99));
        assert!(meta.matures_at(100));
        meta.mark_matured();
        assert!(meta.is_matured);
        // A second sweep at the same time has nothing left to do.
        assert!(!meta.matures_at(100));
    }

    #[test]
    fn coupons_floor_at_zero() {
        let mut meta = TokenMeta {
            maturity_ts: 0,
            coupons_remaining: 1,
            is_matured: false,
        };
        meta.consume_coupon();
        assert_eq!(meta.coupons_remaining, 0);
        meta.consume_coupon();
        assert_eq!(meta.coupons_remaining, 0);
    }

    #[test]
    fn holder_stage_upserts() {
        let mut holders = HolderSet::default();
        assert!(holders.stage(addr(1), 100));
        assert!(holders.stage(addr(1), 250));
        assert_eq!(holders.len(), 1);
        assert_eq!(holders.holding(&addr(1)), 250);
        assert_eq!(holders.holding(&addr(2)), 0);
    }

    #[test]
    fn holder_set_respects_capacity() {
        let mut holders = HolderSet::default();
        for i in 0..MAX_HOLDERS {
            let mut bytes = [0u8; Address::LEN];
            bytes[0] = i as u8;
            assert!(holders.stage(Address::new(bytes), 1));
        }
        assert!(!holders.stage(addr(0xFF), 1));
        // Updating an existing holder still works at capacity.
        assert!(holders.stage(addr(0), 7));
    }

    #[test]
    fn holder_set_round_trip() {
        let mut holders = HolderSet::default();
        holders.stage(addr(1), 100);
        holders.stage(addr(2), 300);
        let encoded = holders.encode();
        assert_eq!(encoded.len(), holders.encode_size());
        let decoded = HolderSet::read(&mut encoded.as_ref()).expect("decode holders");
        assert_eq!(decoded, holders);
    }

    #[test]
    fn token_set_insert_is_idempotent() {
        let mut tokens = TokenSet::default();
        let id = TokenId::new([5u8; TokenId::LEN]);
        assert!(tokens.insert(id));
        assert!(!tokens.insert(id));
        assert_eq!(tokens.len(), 1);
    }
}
