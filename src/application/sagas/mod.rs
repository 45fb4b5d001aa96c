//! Business saga declarations. Each one plugs a validation rule, an outbound request, a channel
//! and a callback shape into the generic engine.

pub mod account_discovery;
pub mod authorization;
pub mod otp_validation;
pub mod transaction_phase;
