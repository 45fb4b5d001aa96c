//! Application layer containing the saga runtime.
//!
//! This module defines the generic `Saga` engine, the await primitive it uses to correlate a
//! callback with the request that caused it, and the business sagas built on top of it.

pub mod engine;
pub mod notification;
pub mod sagas;
