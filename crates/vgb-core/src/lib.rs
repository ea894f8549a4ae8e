//! Core domain + application logic for the VIP group bot.
//!
//! This crate is framework-agnostic. Telegram and the payment gateway's HTTP
//! stack live behind ports (traits); adapters implement them.

pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod moderation;
pub mod payments;
pub mod resilience;

pub use errors::{Error, Result};
