//! Mute state and its autonomous expiry.

pub mod expiry;
pub mod store;

pub use expiry::{ExpiryScheduler, DEFAULT_SWEEP_INTERVAL};
pub use store::{JsonFileRestrictionStore, MemoryRestrictionStore, RestrictionRecord, RestrictionStore};
