use anyhow::{bail, Result};
use covault_types::{
    Address, ContributorSet, Envelope, HolderSet, Key, Participant, Receipt, Trigger, Value,
    VaultConfig, VaultStatus,
};
use std::collections::BTreeMap;
use tracing::debug;

use crate::emitter::Emitter;
use crate::state::{State, Status};

mod handlers;

/// One invocation's view of the vault: reads fall through a pending overlay
/// to durable state, writes and queued payments are buffered until the host
/// accepts the receipt.
///
/// A [`Receipt::Rejected`] obliges the host to drop the layer (and the
/// emitter's queue) without committing; durable state is untouched.
pub struct Layer<'a, S: State, E: Emitter> {
    state: &'a S,
    emitter: &'a mut E,
    pending: BTreeMap<Key, Status>,

    /// Ledger timestamp of the invocation being processed.
    now: u64,
}

impl<'a, S: State, E: Emitter> Layer<'a, S, E> {
    pub fn new(state: &'a S, emitter: &'a mut E, now: u64) -> Self {
        Self {
            state,
            emitter,
            pending: BTreeMap::new(),
            now,
        }
    }

    fn insert(&mut self, key: Key, value: Value) {
        self.pending.insert(key, Status::Update(value));
    }

    /// Route one envelope to its handler and produce the invocation receipt.
    ///
    /// An `Err` is a host-level fault (missing configuration, storage
    /// failure), not a vault decision; the host must not commit on it.
    pub fn apply(&mut self, envelope: &Envelope) -> Result<Receipt> {
        let sender = envelope.sender;
        let receipt = match envelope.trigger {
            Trigger::Payment { amount } => {
                if Trigger::is_dust(amount) {
                    self.handle_control(sender)?
                } else {
                    self.handle_contribution(sender, amount)?
                }
            }
            Trigger::Coupon { amount } => self.handle_coupon(sender, amount)?,
            Trigger::MaturityScan => self.handle_maturity_scan(sender)?,
            Trigger::SettlementDelivery { success } => {
                self.handle_settlement_delivery(sender, success)?
            }
            Trigger::RefundClaim => self.handle_refund_claim(sender)?,
        };

        debug!(
            sender = %sender,
            accepted = receipt.is_accepted(),
            events = receipt.events().len(),
            "processed envelope"
        );
        Ok(receipt)
    }

    /// Hand the buffered change set to the host, consuming the layer.
    pub fn commit(self) -> Vec<(Key, Status)> {
        self.pending.into_iter().collect()
    }

    /// Recorded contribution balance for `address`; zero for strangers.
    pub fn balance(&self, address: &Address) -> Result<u64> {
        Ok(self.participant(address)?.contributed)
    }

    /// Indexed contributor addresses, in first-contribution order.
    pub fn participants(&self) -> Result<Vec<Address>> {
        Ok(self.contributors()?.iter().copied().collect())
    }

    fn config(&self) -> Result<VaultConfig> {
        match self.get(&Key::Config)? {
            Some(Value::Config(config)) => Ok(config),
            _ => bail!("vault config missing"),
        }
    }

    fn status(&self) -> Result<VaultStatus> {
        Ok(match self.get(&Key::Status)? {
            Some(Value::Status(status)) => status,
            _ => VaultStatus::default(),
        })
    }

    fn total_raised(&self) -> Result<u64> {
        Ok(match self.get(&Key::TotalRaised)? {
            Some(Value::TotalRaised(total)) => total,
            _ => 0,
        })
    }

    fn participant(&self, address: &Address) -> Result<Participant> {
        Ok(match self.get(&Key::Participant(*address))? {
            Some(Value::Participant(participant)) => participant,
            _ => Participant::default(),
        })
    }

    fn contributors(&self) -> Result<ContributorSet> {
        Ok(match self.get(&Key::Contributors)? {
            Some(Value::Contributors(contributors)) => contributors,
            _ => ContributorSet::default(),
        })
    }

    fn holders(&self) -> Result<HolderSet> {
        Ok(match self.get(&Key::Holders)? {
            Some(Value::Holders(holders)) => holders,
            _ => HolderSet::default(),
        })
    }
}

impl<'a, S: State, E: Emitter> State for Layer<'a, S, E> {
    fn get(&self, key: &Key) -> Result<Option<Value>> {
        Ok(match self.pending.get(key) {
            Some(Status::Update(value)) => Some(value.clone()),
            Some(Status::Delete) => None,
            None => self.state.get(key)?,
        })
    }

    fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        self.pending.insert(key, Status::Update(value));
        Ok(())
    }

    fn delete(&mut self, key: &Key) -> Result<()> {
        self.pending.insert(key.clone(), Status::Delete);
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::emitter::Queue;
    use crate::state::Memory;
    use covault_types::{Event, REJECT_DEADLINE_PASSED, REJECT_FUNDING_CLOSED};

    #[test]
    fn missing_config_is_a_host_fault() {
        let memory = Memory::default();
        let mut queue = Queue::new(8);
        let mut layer = Layer::new(&memory, &mut queue, 10);
        let result = layer.apply(&Envelope {
            sender: addr(1),
            trigger: Trigger::Payment { amount: 5_000 },
        });
        assert!(result.is_err());
    }

    #[test]
    fn overlay_reads_see_pending_writes() {
        let memory = fixtures::vault();
        let mut queue = Queue::new(8);
        let mut layer = Layer::new(&memory, &mut queue, 10);

        layer.insert(Key::TotalRaised, Value::TotalRaised(777));
        assert_eq!(layer.total_raised().expect("read total"), 777);

        State::delete(&mut layer, &Key::TotalRaised).expect("delete");
        assert_eq!(layer.total_raised().expect("read total"), 0);
    }

    #[test]
    fn dust_routes_to_control_and_above_dust_to_contribution() {
        let mut memory = fixtures::vault();

        // At the ceiling: control signal, acknowledged, nothing recorded.
        let receipt = contribute(&mut memory, 10, addr(1), covault_types::DUST_CEILING);
        assert_eq!(receipt, Receipt::accepted("Deadline not reached", vec![]));
        assert_eq!(memory.get(&Key::TotalRaised).expect("get total"), None);

        // One above: a real contribution.
        let receipt = contribute(&mut memory, 11, addr(1), covault_types::DUST_CEILING + 1);
        assert!(receipt.is_accepted());
        assert_eq!(
            memory.get(&Key::TotalRaised).expect("get total"),
            Some(Value::TotalRaised(covault_types::DUST_CEILING + 1))
        );
    }

    #[test]
    fn rejection_leaves_state_untouched() {
        let mut memory = fixtures::vault();
        contribute(&mut memory, 10, addr(1), 5_000);

        // Contribution after the deadline must change nothing.
        let receipt = contribute(&mut memory, DEADLINE + 1, addr(2), 5_000);
        assert_eq!(
            receipt,
            Receipt::rejected("Funding deadline passed", REJECT_DEADLINE_PASSED)
        );
        assert_eq!(
            memory.get(&Key::TotalRaised).expect("get total"),
            Some(Value::TotalRaised(5_000))
        );
        assert_eq!(memory.get(&Key::Participant(addr(2))).expect("get"), None);
    }

    // Success path end to end: fund past the target, finalize after the
    // deadline, observe the settlement payment and staged holders.
    #[test]
    fn funded_vault_settles_to_the_beneficiary() {
        let mut memory = fixtures::vault();
        contribute(&mut memory, 10, addr(1), 6_000);
        contribute(&mut memory, 20, addr(2), 4_000);

        let (receipt, payments) = finalize(&mut memory, DEADLINE + 1, addr(1));
        assert!(receipt.is_accepted());
        assert!(receipt
            .events()
            .iter()
            .any(|e| matches!(e, Event::VaultSettled { amount: 10_000, .. })));

        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].destination, beneficiary());
        assert_eq!(payments[0].amount, 10_000);

        assert_eq!(
            memory.get(&Key::Status).expect("get status"),
            Some(Value::Status(VaultStatus::Succeeded))
        );
        match memory.get(&Key::Holders).expect("get holders") {
            Some(Value::Holders(holders)) => {
                assert_eq!(holders.holding(&addr(1)), TOKEN_SUPPLY * 6 / 10);
                assert_eq!(holders.holding(&addr(2)), TOKEN_SUPPLY * 4 / 10);
            }
            other => panic!("unexpected holders entry: {other:?}"),
        }
    }

    // Failure path end to end: fall short of the target, finalize, then each
    // contributor claims exactly one refund.
    #[test]
    fn underfunded_vault_refunds_each_contributor_once() {
        let mut memory = fixtures::vault();
        contribute(&mut memory, 10, addr(1), 2_000);
        contribute(&mut memory, 20, addr(2), 3_000);

        let (receipt, payments) = finalize(&mut memory, DEADLINE + 1, addr(9));
        assert!(receipt.is_accepted());
        assert!(payments.is_empty());
        assert_eq!(
            memory.get(&Key::Status).expect("get status"),
            Some(Value::Status(VaultStatus::FailedRefunding))
        );

        let (receipt, payments) = claim_refund(&mut memory, DEADLINE + 2, addr(1));
        assert!(receipt.is_accepted());
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].destination, addr(1));
        assert_eq!(payments[0].amount, 2_000);

        // A second claim from the same contributor is refused.
        let (receipt, payments) = claim_refund(&mut memory, DEADLINE + 3, addr(1));
        assert_eq!(
            receipt,
            Receipt::rejected("Already refunded", covault_types::REJECT_ALREADY_REFUNDED)
        );
        assert!(payments.is_empty());
    }

    #[test]
    fn contributions_are_closed_once_settled() {
        let mut memory = fixtures::vault();
        contribute(&mut memory, 10, addr(1), TARGET);
        finalize(&mut memory, DEADLINE + 1, addr(1));

        let receipt = contribute(&mut memory, DEADLINE + 2, addr(2), 5_000);
        assert_eq!(
            receipt,
            Receipt::rejected("Funding closed", REJECT_FUNDING_CLOSED)
        );
    }

    #[test]
    fn ledger_queries_default_for_strangers() {
        let mut memory = fixtures::vault();
        contribute(&mut memory, 10, addr(2), 600);
        contribute(&mut memory, 11, addr(1), 400);

        let mut queue = Queue::new(8);
        let layer = Layer::new(&memory, &mut queue, 12);
        assert_eq!(layer.balance(&addr(2)).expect("balance"), 600);
        assert_eq!(layer.balance(&addr(7)).expect("balance"), 0);
        assert_eq!(
            layer.participants().expect("participants"),
            vec![addr(2), addr(1)]
        );
    }
}
