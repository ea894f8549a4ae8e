/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this type so the bot core can
/// handle failures consistently. Payment failures have their own taxonomy in
/// [`crate::payments::PaymentError`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store error: {0}")]
    Store(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
