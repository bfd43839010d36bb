use super::super::*;
use covault_types::{
    Address, Event, Payment, PayoutRecord, TokenMeta, REJECT_FUNDING_CLOSED, REJECT_NO_INVESTMENT,
};
use crate::distribution::distribute;
use tracing::warn;

impl<'a, S: State, E: Emitter> Layer<'a, S, E> {
    /// Split a coupon deposit among current holders, proportional to held
    /// units.
    ///
    /// Delivery is best effort: a holder whose payment cannot be queued is
    /// skipped and reported, the rest still get paid. The undistributed
    /// remainder (flooring dust plus skipped shares) stays with the vault.
    pub(in crate::layer) fn handle_coupon(
        &mut self,
        _sender: Address,
        amount: u64,
    ) -> anyhow::Result<Receipt> {
        let config = self.config()?;
        if self.status()? != VaultStatus::Succeeded {
            return Ok(Receipt::rejected("Vault not settled", REJECT_FUNDING_CLOSED));
        }
        if amount == 0 {
            return Ok(Receipt::accepted("Empty coupon ignored", vec![]));
        }

        let holders = self.holders()?;
        if holders.is_empty() {
            return Ok(Receipt::rejected("No holders", REJECT_NO_INVESTMENT));
        }

        let weights: Vec<_> = holders
            .iter()
            .map(|record| (record.address, record.held_units))
            .collect();
        let outcome = distribute(amount, &weights);

        let mut events = Vec::new();
        let mut delivered = 0u64;
        let mut recipients = 0u32;
        let mut skipped = 0u32;
        for (address, share) in &outcome.shares {
            match self.emitter.emit(Payment {
                destination: *address,
                amount: *share,
                asset: config.settlement_asset,
            }) {
                Ok(()) => {
                    delivered += share;
                    recipients += 1;
                }
                Err(err) => {
                    warn!(holder = %address, share, %err, "coupon payment skipped");
                    skipped += 1;
                    events.push(Event::CouponSkipped {
                        holder: *address,
                        share: *share,
                    });
                }
            }
        }

        self.insert(
            Key::LastPayout,
            Value::LastPayout(PayoutRecord {
                pool: amount,
                distributed: delivered,
                recipients,
                skipped,
                time: self.now,
            }),
        );
        self.consume_active_coupon()?;

        events.push(Event::CouponDistributed {
            pool: amount,
            distributed: delivered,
            recipients,
        });
        Ok(Receipt::accepted("Coupons distributed", events))
    }

    /// Tick down the payment schedule of the token currently receiving
    /// coupons, when one is tracked.
    fn consume_active_coupon(&mut self) -> anyhow::Result<()> {
        let token = match self.get(&Key::ActiveToken)? {
            Some(Value::ActiveToken(token)) => token,
            _ => return Ok(()),
        };
        let mut meta = match self.get(&Key::Token(token))? {
            Some(Value::Token(meta)) => meta,
            _ => TokenMeta::default(),
        };
        meta.consume_coupon();
        self.insert(Key::Token(token), Value::Token(meta));
        Ok(())
    }
}
