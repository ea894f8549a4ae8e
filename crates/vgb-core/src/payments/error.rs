use std::time::Duration;

use crate::{
    payments::transport::TransportError,
    resilience::{CircuitOpen, Classify, FailureClass},
};

/// Everything that can go wrong while talking to the payment gateway.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum PaymentError {
    /// Rejected locally before any network attempt.
    #[error("invalid payment request: {0}")]
    Validation(String),

    #[error("payment gateway timed out")]
    Timeout,

    #[error("could not reach payment gateway: {0}")]
    Connection(String),

    #[error("payment gateway rate limited us (retry after {}s)", .retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    /// Valid transport, but the body did not have the expected shape.
    #[error("malformed gateway response: {0}")]
    ResponseShape(String),

    #[error(transparent)]
    CircuitOpen(#[from] CircuitOpen),

    #[error("payment gateway error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("unexpected payment error: {0}")]
    Unexpected(String),

    #[error("secondary settlement failed: {0}")]
    Fallback(String),
}

impl PaymentError {
    /// Failures that mean "primary unavailable or overloaded", where rerouting
    /// to the secondary settlement path is safe. Generic API errors are not.
    pub fn triggers_fallback(&self) -> bool {
        matches!(
            self,
            Self::CircuitOpen(_) | Self::RateLimited { .. } | Self::Timeout
        )
    }

    /// Text safe to show to a chat user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(reason) => format!("Invalid payment request: {reason}."),
            Self::Timeout | Self::Connection(_) => {
                "The payment service is not responding right now. Please try again in a few minutes."
                    .to_string()
            }
            Self::RateLimited { retry_after } => format!(
                "The payment service is busy. Please try again in {}s.",
                retry_after.as_secs()
            ),
            Self::CircuitOpen(open) => format!(
                "Payments are temporarily unavailable. Please try again in {}s.",
                open.retry_in.as_secs().max(1)
            ),
            Self::ResponseShape(_) | Self::Api { .. } | Self::Unexpected(_) => {
                "The payment could not be created. Please try again later or contact an admin."
                    .to_string()
            }
            Self::Fallback(_) => {
                "Payments are unavailable and no alternative method is configured. Please contact an admin."
                    .to_string()
            }
        }
    }
}

impl Classify for PaymentError {
    fn failure_class(&self) -> Option<FailureClass> {
        match self {
            Self::Timeout => Some(FailureClass::Timeout),
            Self::Connection(_) => Some(FailureClass::Connection),
            Self::RateLimited { .. } => Some(FailureClass::RateLimited),
            Self::ResponseShape(_) => Some(FailureClass::MalformedResponse),
            Self::Api { .. } => Some(FailureClass::Api),
            Self::Validation(_) | Self::CircuitOpen(_) | Self::Unexpected(_) | Self::Fallback(_) => {
                None
            }
        }
    }
}

impl From<TransportError> for PaymentError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Timeout => Self::Timeout,
            TransportError::Connect(msg) => Self::Connection(msg),
            TransportError::Other(msg) => Self::Unexpected(msg),
        }
    }
}
