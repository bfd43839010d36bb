/// Maximum number of tracked contributors. Contributions beyond this bound
/// still count toward the aggregate total but are not indexed for the
/// initial token allocation (declared degradation under host step budgets).
pub const MAX_CONTRIBUTORS: usize = 128;

/// Maximum number of token holders eligible for a coupon distribution.
pub const MAX_HOLDERS: usize = 64;

/// Maximum number of tokens tracked by the maturity sweep.
pub const MAX_TOKENS: usize = 128;

/// Payments at or below this amount (atomic units) are control signals, not
/// contributions.
pub const DUST_CEILING: u64 = 100;

/// Maximum length of a human-readable accept/reject reason.
pub const MAX_REASON_LENGTH: usize = 64;

/// Maximum number of events a single invocation may report.
pub const MAX_EVENTS: usize = 256;

/// Reject codes carried by [`crate::Receipt::Rejected`]. The numeric values
/// are stable wire values shared with the host's rollback reporting.
pub const REJECT_FUNDING_CLOSED: u32 = 1;
pub const REJECT_DEADLINE_PASSED: u32 = 2;
pub const REJECT_SETTLEMENT_EMISSION: u32 = 5;
pub const REJECT_REFUNDS_UNAVAILABLE: u32 = 6;
pub const REJECT_ALREADY_REFUNDED: u32 = 7;
pub const REJECT_NO_INVESTMENT: u32 = 8;
pub const REJECT_REFUND_EMISSION: u32 = 9;
pub const REJECT_AMOUNT_OVERFLOW: u32 = 10;
pub const REJECT_UNAUTHORIZED: u32 = 13;
