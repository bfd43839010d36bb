use super::super::*;
use covault_types::{
    Address, Event, Insertion, REJECT_AMOUNT_OVERFLOW, REJECT_DEADLINE_PASSED,
    REJECT_FUNDING_CLOSED,
};
use tracing::{info, warn};

impl<'a, S: State, E: Emitter> Layer<'a, S, E> {
    /// Record a contribution against the sender's ledger entry.
    ///
    /// Contributions are accepted in `Active` and `ThresholdReached` (raising
    /// past the target is allowed until the deadline), and refused once the
    /// deadline passes or the vault is finalized. The threshold transition
    /// fires on the contribution that crosses the target, at most once.
    pub(in crate::layer) fn handle_contribution(
        &mut self,
        sender: Address,
        amount: u64,
    ) -> anyhow::Result<Receipt> {
        let config = self.config()?;
        let status = self.status()?;

        if status.is_finalized() {
            return Ok(Receipt::rejected("Funding closed", REJECT_FUNDING_CLOSED));
        }
        if self.now >= config.deadline {
            return Ok(Receipt::rejected(
                "Funding deadline passed",
                REJECT_DEADLINE_PASSED,
            ));
        }

        let mut participant = self.participant(&sender)?;
        let (Some(total_contributed), Some(total_raised)) = (
            participant.contributed.checked_add(amount),
            self.total_raised()?.checked_add(amount),
        ) else {
            return Ok(Receipt::rejected(
                "Contribution overflow",
                REJECT_AMOUNT_OVERFLOW,
            ));
        };
        participant.contributed = total_contributed;
        self.insert(Key::Participant(sender), Value::Participant(participant));
        self.insert(Key::TotalRaised, Value::TotalRaised(total_raised));

        let mut contributors = self.contributors()?;
        match contributors.insert(sender) {
            Insertion::Inserted => {
                self.insert(Key::Contributors, Value::Contributors(contributors));
            }
            Insertion::Present => {}
            Insertion::Full => {
                // The ledger entry still accrues; the address just never
                // receives a token allocation.
                warn!(contributor = %sender, "contributor index full; contribution not indexed");
            }
        }

        let mut events = vec![Event::ContributionRecorded {
            contributor: sender,
            amount,
            total_contributed,
            total_raised,
        }];

        if status == VaultStatus::Active && total_raised >= config.target_amount {
            self.insert(Key::Status, Value::Status(VaultStatus::ThresholdReached));
            events.push(Event::ThresholdReached { total_raised });
            info!(total_raised, target = config.target_amount, "funding target reached");
        }

        Ok(Receipt::accepted("Investment accepted", events))
    }
}
