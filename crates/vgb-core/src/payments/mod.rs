//! Payment gateway client with circuit breaking, retry and secondary settlement.

pub mod error;
pub mod fallback;
pub mod gateway;
pub mod transport;
pub mod types;

pub use error::PaymentError;
pub use fallback::{SecondaryInstructions, SettlementFallback, UsdtSettlement};
pub use gateway::{GatewayConfig, PaymentGateway, DEFAULT_RETRY_AFTER};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport, TransportError};
pub use types::{Amount, ChargeResult, ParseAmountError, PayerInfo, PaymentStatus};
