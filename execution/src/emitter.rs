//! Outbound payment queueing.
//!
//! The engine never moves funds itself; it queues [`Payment`] instructions
//! with an [`Emitter`] and the host turns accepted queues into real
//! transactions. Queueing can fail (the host bounds how many payments one
//! invocation may emit), and handlers decide per call site whether a failure
//! rejects the invocation or is skipped.

use covault_types::Payment;
use thiserror::Error;

#[cfg(any(test, feature = "mocks"))]
use covault_types::Address;
#[cfg(any(test, feature = "mocks"))]
use std::collections::HashSet;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EmitError {
    #[error("payment queue full (capacity {capacity})")]
    QueueFull { capacity: usize },
    #[error("payment refused by host")]
    Refused,
}

pub trait Emitter {
    fn emit(&mut self, payment: Payment) -> Result<(), EmitError>;
}

/// Capacity-bounded in-order payment queue. When an invocation is rejected
/// the host must discard the queue along with the state change set.
pub struct Queue {
    capacity: usize,
    payments: Vec<Payment>,
}

impl Queue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            payments: Vec::new(),
        }
    }

    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    pub fn drain(&mut self) -> Vec<Payment> {
        std::mem::take(&mut self.payments)
    }
}

impl Emitter for Queue {
    fn emit(&mut self, payment: Payment) -> Result<(), EmitError> {
        if self.payments.len() >= self.capacity {
            return Err(EmitError::QueueFull {
                capacity: self.capacity,
            });
        }
        self.payments.push(payment);
        Ok(())
    }
}

/// Queue wrapper that refuses payments to designated destinations, for
/// exercising per-recipient failure paths.
#[cfg(any(test, feature = "mocks"))]
pub struct FailingEmitter {
    inner: Queue,
    refused: HashSet<Address>,
}

#[cfg(any(test, feature = "mocks"))]
impl FailingEmitter {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Queue::new(capacity),
            refused: HashSet::new(),
        }
    }

    pub fn refuse(&mut self, destination: Address) {
        self.refused.insert(destination);
    }

    pub fn payments(&self) -> &[Payment] {
        self.inner.payments()
    }
}

#[cfg(any(test, feature = "mocks"))]
impl Emitter for FailingEmitter {
    fn emit(&mut self, payment: Payment) -> Result<(), EmitError> {
        if self.refused.contains(&payment.destination) {
            return Err(EmitError::Refused);
        }
        self.inner.emit(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covault_types::AssetId;

    fn payment(tag: u8) -> Payment {
        Payment {
            destination: Address::new([tag; Address::LEN]),
            amount: 100,
            asset: AssetId::default(),
        }
    }

    #[test]
    fn queue_enforces_capacity() {
        let mut queue = Queue::new(2);
        assert_eq!(queue.emit(payment(1)), Ok(()));
        assert_eq!(queue.emit(payment(2)), Ok(()));
        assert_eq!(
            queue.emit(payment(3)),
            Err(EmitError::QueueFull { capacity: 2 })
        );
        assert_eq!(queue.payments().len(), 2);
    }

    #[test]
    fn failing_emitter_refuses_marked_destinations() {
        let mut emitter = FailingEmitter::new(8);
        emitter.refuse(Address::new([2u8; Address::LEN]));
        assert_eq!(emitter.emit(payment(1)), Ok(()));
        assert_eq!(emitter.emit(payment(2)), Err(EmitError::Refused));
        assert_eq!(emitter.payments().len(), 1);
    }
}
