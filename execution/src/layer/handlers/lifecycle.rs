use super::super::*;
use covault_types::{
    Address, Event, Payment, SettlementRecord, REJECT_ALREADY_REFUNDED, REJECT_NO_INVESTMENT,
    REJECT_REFUNDS_UNAVAILABLE, REJECT_REFUND_EMISSION, REJECT_SETTLEMENT_EMISSION,
};
use crate::distribution::distribute;
use tracing::{info, warn};

impl<'a, S: State, E: Emitter> Layer<'a, S, E> {
    /// A dust payment is a control signal asking for the deadline decision.
    /// Before the deadline, and once the vault is finalized, it is
    /// acknowledged without touching state.
    pub(in crate::layer) fn handle_control(&mut self, _sender: Address) -> anyhow::Result<Receipt> {
        let config = self.config()?;
        match self.status()? {
            VaultStatus::Active | VaultStatus::ThresholdReached => {
                if self.now < config.deadline {
                    return Ok(Receipt::accepted("Deadline not reached", vec![]));
                }
                let total_raised = self.total_raised()?;
                if total_raised >= config.target_amount {
                    self.finalize_success(&config, total_raised)
                } else {
                    self.finalize_failure(&config, total_raised)
                }
            }
            VaultStatus::Succeeded | VaultStatus::FailedRefunding => {
                Ok(Receipt::accepted("Already finalized", vec![]))
            }
        }
    }

    /// Queue the full raised amount to the beneficiary and stage the token
    /// allocation proportional to recorded contributions.
    fn finalize_success(
        &mut self,
        config: &VaultConfig,
        total_raised: u64,
    ) -> anyhow::Result<Receipt> {
        if let Err(err) = self.emitter.emit(Payment {
            destination: config.beneficiary,
            amount: total_raised,
            asset: config.settlement_asset,
        }) {
            warn!(%err, "settlement payment could not be queued");
            return Ok(Receipt::rejected(
                "Settlement emission failed",
                REJECT_SETTLEMENT_EMISSION,
            ));
        }
        self.insert(
            Key::Settlement,
            Value::Settlement(SettlementRecord {
                amount: total_raised,
                emitted_at: self.now,
                confirmed: false,
            }),
        );

        let contributors = self.contributors()?;
        let mut weights = Vec::with_capacity(contributors.len());
        for address in contributors.iter() {
            weights.push((*address, self.participant(address)?.contributed));
        }
        let outcome = distribute(config.token_supply, &weights);

        let mut holders = self.holders()?;
        let mut staged = 0u64;
        for (address, units) in &outcome.shares {
            if holders.stage(*address, *units) {
                staged += units;
            } else {
                warn!(holder = %address, units, "holder set full; allocation dropped");
            }
        }
        let holder_count = holders.len() as u32;
        self.insert(Key::Holders, Value::Holders(holders));
        self.insert(Key::Status, Value::Status(VaultStatus::Succeeded));

        info!(
            total_raised,
            holders = holder_count,
            staged,
            "vault settled"
        );
        Ok(Receipt::accepted(
            "Vault settled",
            vec![
                Event::VaultSettled {
                    beneficiary: config.beneficiary,
                    amount: total_raised,
                },
                Event::TokensStaged {
                    holders: holder_count,
                    supply: config.token_supply,
                    staged,
                },
            ],
        ))
    }

    fn finalize_failure(
        &mut self,
        config: &VaultConfig,
        total_raised: u64,
    ) -> anyhow::Result<Receipt> {
        self.insert(Key::Status, Value::Status(VaultStatus::FailedRefunding));
        info!(
            total_raised,
            target = config.target_amount,
            "funding target missed; refunds open"
        );
        Ok(Receipt::accepted(
            "Refund mode activated",
            vec![Event::RefundModeActivated {
                total_raised,
                target_amount: config.target_amount,
            }],
        ))
    }

    /// Refund the sender's full recorded contribution, exactly once. The
    /// `refunded` flag is the sole guard against double payment.
    pub(in crate::layer) fn handle_refund_claim(
        &mut self,
        sender: Address,
    ) -> anyhow::Result<Receipt> {
        let config = self.config()?;
        if self.status()? != VaultStatus::FailedRefunding {
            return Ok(Receipt::rejected(
                "Refunds unavailable",
                REJECT_REFUNDS_UNAVAILABLE,
            ));
        }

        let mut participant = self.participant(&sender)?;
        if participant.contributed == 0 {
            return Ok(Receipt::rejected(
                "No investment to refund",
                REJECT_NO_INVESTMENT,
            ));
        }
        if participant.refunded {
            return Ok(Receipt::rejected("Already refunded", REJECT_ALREADY_REFUNDED));
        }

        let amount = participant.contributed;
        if let Err(err) = self.emitter.emit(Payment {
            destination: sender,
            amount,
            asset: config.settlement_asset,
        }) {
            warn!(contributor = %sender, %err, "refund payment could not be queued");
            return Ok(Receipt::rejected(
                "Refund emission failed",
                REJECT_REFUND_EMISSION,
            ));
        }

        participant.refunded = true;
        self.insert(Key::Participant(sender), Value::Participant(participant));
        Ok(Receipt::accepted(
            "Refund issued",
            vec![Event::RefundIssued {
                contributor: sender,
                amount,
            }],
        ))
    }
}
