//! Secondary settlement path used when the primary gateway is unavailable.

use crate::{errors::Error, payments::Amount, Result};

/// What the payer needs to settle through the secondary method.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecondaryInstructions {
    pub network: String,
    pub address: String,
    pub instructions: String,
}

/// Provider of secondary settlement instructions.
///
/// Passed explicitly into each charge call; the gateway client never reaches
/// for a global instance.
pub trait SettlementFallback: Send + Sync {
    fn instructions(&self, amount: Amount, description: &str) -> Result<SecondaryInstructions>;
}

/// USDT transfer to a statically configured wallet.
#[derive(Clone, Debug)]
pub struct UsdtSettlement {
    address: Option<String>,
    network: String,
    currency: String,
}

impl UsdtSettlement {
    pub fn new(
        address: Option<String>,
        network: impl Into<String>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            address: address.filter(|a| !a.trim().is_empty()),
            network: network.into(),
            currency: currency.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.address.is_some()
    }
}

impl SettlementFallback for UsdtSettlement {
    fn instructions(&self, amount: Amount, description: &str) -> Result<SecondaryInstructions> {
        let address = self
            .address
            .as_deref()
            .ok_or_else(|| Error::Config("USDT wallet address is not configured".to_string()))?;

        let instructions = format!(
            "Send the equivalent of {amount} {currency} in USDT over {network} to the address above.\n\
Reference: {description}\n\
After sending, forward the transaction hash to an admin to get access.",
            currency = self.currency,
            network = self.network,
        );

        Ok(SecondaryInstructions {
            network: self.network.clone(),
            address: address.trim().to_string(),
            instructions,
        })
    }
}
