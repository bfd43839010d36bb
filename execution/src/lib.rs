//! Covault execution engine.
//!
//! This crate contains the deterministic vault logic: the contribution
//! ledger, the lifecycle state machine, proportional distribution, coupon
//! payouts, and maturity tracking. The host adapter decodes inbound
//! transactions into [`covault_types::Envelope`]s, runs each one through a
//! [`Layer`], and commits the change set only when the [`Receipt`] is
//! accepted.
//!
//! ## Determinism requirements
//! - Do not use wall-clock time inside execution; the only clock is the
//!   ledger timestamp the host passes to [`Layer::new`].
//! - Do not use randomness.
//! - Avoid iteration order of hash-based collections influencing outputs.
//!
//! ## Rollback invariant
//! A rejected invocation must leave no trace: the host discards the layer's
//! buffered writes and the emitter's payment queue together. Handlers are
//! written so that a failed payment emission never leaves earlier writes of
//! the same invocation half-applied.
//!
//! [`Receipt`]: covault_types::Receipt

pub mod distribution;

mod emitter;
mod layer;
mod state;

pub use distribution::{distribute, DistributionOutcome};
pub use emitter::{EmitError, Emitter, Queue};
pub use layer::Layer;
pub use state::{State, Status};

#[cfg(any(test, feature = "mocks"))]
pub use emitter::FailingEmitter;
#[cfg(any(test, feature = "mocks"))]
pub use state::Memory;
