mod coupon;
mod funding;
mod lifecycle;
mod maturity;
