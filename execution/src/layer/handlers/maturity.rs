use super::super::*;
use covault_types::{
    Address, Event, Payment, TokenSet, REJECT_SETTLEMENT_EMISSION, REJECT_UNAUTHORIZED,
};
use tracing::{info, warn};

impl<'a, S: State, E: Emitter> Layer<'a, S, E> {
    /// Flip the matured flag on every tracked token whose maturity timestamp
    /// has passed. Already-matured tokens are left alone, so repeating the
    /// sweep is harmless.
    pub(in crate::layer) fn handle_maturity_scan(
        &mut self,
        sender: Address,
    ) -> anyhow::Result<Receipt> {
        let config = self.config()?;
        if sender != config.operator {
            return Ok(Receipt::rejected("Unauthorized", REJECT_UNAUTHORIZED));
        }

        let tokens = match self.get(&Key::Tokens)? {
            Some(Value::Tokens(tokens)) => tokens,
            _ => TokenSet::default(),
        };

        let mut events = Vec::new();
        for token in tokens.iter().copied() {
            let mut meta = match self.get(&Key::Token(token))? {
                Some(Value::Token(meta)) => meta,
                _ => continue,
            };
            if !meta.matures_at(self.now) {
                continue;
            }
            meta.mark_matured();
            let maturity_ts = meta.maturity_ts;
            self.insert(Key::Token(token), Value::Token(meta));
            info!(token = %token, maturity_ts, "token matured");
            events.push(Event::TokenMatured { token, maturity_ts });
        }

        Ok(Receipt::accepted("Maturity scan complete", events))
    }

    /// Process the host's report on the queued settlement payment: mark it
    /// confirmed, or re-queue it for another attempt.
    pub(in crate::layer) fn handle_settlement_delivery(
        &mut self,
        sender: Address,
        success: bool,
    ) -> anyhow::Result<Receipt> {
        let config = self.config()?;
        if sender != config.operator {
            return Ok(Receipt::rejected("Unauthorized", REJECT_UNAUTHORIZED));
        }

        let mut settlement = match self.get(&Key::Settlement)? {
            Some(Value::Settlement(settlement)) => settlement,
            _ => {
                return Ok(Receipt::rejected(
                    "No settlement pending",
                    REJECT_SETTLEMENT_EMISSION,
                ))
            }
        };
        if settlement.confirmed {
            return Ok(Receipt::accepted("Settlement already confirmed", vec![]));
        }

        if success {
            settlement.confirmed = true;
            let amount = settlement.amount;
            self.insert(Key::Settlement, Value::Settlement(settlement));
            return Ok(Receipt::accepted(
                "Settlement confirmed",
                vec![Event::SettlementConfirmed { amount }],
            ));
        }

        // Delivery failed upstream; queue another attempt.
        if let Err(err) = self.emitter.emit(Payment {
            destination: config.beneficiary,
            amount: settlement.amount,
            asset: config.settlement_asset,
        }) {
            warn!(%err, "settlement retry could not be queued");
            return Ok(Receipt::rejected(
                "Settlement emission failed",
                REJECT_SETTLEMENT_EMISSION,
            ));
        }
        settlement.emitted_at = self.now;
        let amount = settlement.amount;
        self.insert(Key::Settlement, Value::Settlement(settlement));
        Ok(Receipt::accepted(
            "Settlement payment re-queued",
            vec![Event::VaultSettled {
                beneficiary: config.beneficiary,
                amount,
            }],
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::layer::fixtures::*;
    use crate::state::{Memory, State as _};
    use covault_types::{
        Envelope, Event, Key, Receipt, TokenId, TokenMeta, TokenSet, Trigger, Value,
        REJECT_SETTLEMENT_EMISSION, REJECT_UNAUTHORIZED,
    };

    fn token(tag: u8) -> TokenId {
        TokenId::new([tag; TokenId::LEN])
    }

    fn seed_tokens(memory: &mut Memory, specs: &[(u8, u64, bool)]) {
        let mut set = TokenSet::default();
        for (tag, maturity_ts, is_matured) in specs {
            set.insert(token(*tag));
            memory
                .insert(
                    Key::Token(token(*tag)),
                    Value::Token(TokenMeta {
                        maturity_ts: *maturity_ts,
                        coupons_remaining: 4,
                        is_matured: *is_matured,
                    }),
                )
                .expect("seed token");
        }
        memory.insert(Key::Tokens, Value::Tokens(set)).expect("seed set");
    }

    fn scan(memory: &mut Memory, now: u64, sender: covault_types::Address) -> Receipt {
        invoke(
            memory,
            now,
            Envelope {
                sender,
                trigger: Trigger::MaturityScan,
            },
        )
        .0
    }

    #[test]
    fn scan_flips_only_due_tokens() {
        let mut memory = vault();
        seed_tokens(&mut memory, &[(1, 100, false), (2, 500, false), (3, 50, true)]);

        let receipt = scan(&mut memory, 200, operator());
        assert!(receipt.is_accepted());
        let matured: Vec<_> = receipt
            .events()
            .iter()
            .filter_map(|e| match e {
                Event::TokenMatured { token, .. } => Some(*token),
                _ => None,
            })
            .collect();
        assert_eq!(matured, vec![token(1)]);

        match memory.get(&Key::Token(token(2))).expect("get token") {
            Some(Value::Token(meta)) => assert!(!meta.is_matured),
            other => panic!("unexpected token entry: {other:?}"),
        }
    }

    #[test]
    fn repeated_scans_report_nothing_new() {
        let mut memory = vault();
        seed_tokens(&mut memory, &[(1, 100, false)]);

        let receipt = scan(&mut memory, 200, operator());
        assert_eq!(receipt.events().len(), 1);
        let receipt = scan(&mut memory, 300, operator());
        assert!(receipt.is_accepted());
        assert!(receipt.events().is_empty());
    }

    #[test]
    fn scan_requires_the_operator() {
        let mut memory = vault();
        seed_tokens(&mut memory, &[(1, 100, false)]);

        let receipt = scan(&mut memory, 200, addr(1));
        assert_eq!(receipt, Receipt::rejected("Unauthorized", REJECT_UNAUTHORIZED));
        match memory.get(&Key::Token(token(1))).expect("get token") {
            Some(Value::Token(meta)) => assert!(!meta.is_matured),
            other => panic!("unexpected token entry: {other:?}"),
        }
    }

    fn deliver(memory: &mut Memory, now: u64, sender: covault_types::Address, success: bool) -> (Receipt, Vec<covault_types::Payment>) {
        invoke(
            memory,
            now,
            Envelope {
                sender,
                trigger: Trigger::SettlementDelivery { success },
            },
        )
    }

    fn settled_vault() -> Memory {
        let mut memory = vault();
        contribute(&mut memory, 10, addr(1), TARGET);
        finalize(&mut memory, DEADLINE + 1, addr(1));
        memory
    }

    #[test]
    fn successful_delivery_confirms_the_settlement() {
        let mut memory = settled_vault();
        let (receipt, payments) = deliver(&mut memory, DEADLINE + 5, operator(), true);
        assert_eq!(
            receipt,
            Receipt::accepted(
                "Settlement confirmed",
                vec![Event::SettlementConfirmed { amount: TARGET }],
            )
        );
        assert!(payments.is_empty());

        // Reporting again is a no-op, not a second confirmation.
        let (receipt, _) = deliver(&mut memory, DEADLINE + 6, operator(), true);
        assert_eq!(receipt, Receipt::accepted("Settlement already confirmed", vec![]));
    }

    #[test]
    fn failed_delivery_requeues_the_payment() {
        let mut memory = settled_vault();
        let (receipt, payments) = deliver(&mut memory, DEADLINE + 5, operator(), false);
        assert!(receipt.is_accepted());
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].destination, beneficiary());
        assert_eq!(payments[0].amount, TARGET);

        match memory.get(&Key::Settlement).expect("get settlement") {
            Some(Value::Settlement(record)) => {
                assert!(!record.confirmed);
                assert_eq!(record.emitted_at, DEADLINE + 5);
            }
            other => panic!("unexpected settlement entry: {other:?}"),
        }
    }

    #[test]
    fn delivery_report_without_settlement_is_refused() {
        let mut memory = vault();
        let (receipt, _) = deliver(&mut memory, 10, operator(), true);
        assert_eq!(
            receipt,
            Receipt::rejected("No settlement pending", REJECT_SETTLEMENT_EMISSION)
        );
    }

    #[test]
    fn delivery_report_requires_the_operator() {
        let mut memory = settled_vault();
        let (receipt, _) = deliver(&mut memory, DEADLINE + 5, addr(1), true);
        assert_eq!(receipt, Receipt::rejected("Unauthorized", REJECT_UNAUTHORIZED));
    }
}
