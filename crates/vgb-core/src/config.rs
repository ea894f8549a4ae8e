use std::{env, fs, path::Path, path::PathBuf, str::FromStr, time::Duration};

use crate::{
    errors::Error,
    payments::{Amount, GatewayConfig},
    resilience::{CircuitBreakerConfig, RetryPolicy},
    Result,
};

/// Typed configuration for the bot, read from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub telegram_bot_token: String,
    pub telegram_admin_users: Vec<i64>,

    // Payment gateway
    pub payment_api_base_url: String,
    pub payment_api_key: String,
    pub payment_currency: String,
    pub vip_price: Amount,
    pub vip_description: String,

    // Secondary settlement
    pub usdt_wallet_address: Option<String>,
    pub usdt_network: String,

    // Resilience
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub request_timeout: Duration,

    // Moderation
    pub scheduler_interval: Duration,
    pub restrictions_file: PathBuf,
}

impl Config {
    /// Load from the process environment, after applying `.env` if present.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let vars = Vars { lookup: &lookup };

        let telegram_bot_token = vars
            .string("TELEGRAM_BOT_TOKEN")
            .ok_or_else(|| required("TELEGRAM_BOT_TOKEN"))?;
        let telegram_admin_users = parse_csv_i64(vars.string("TELEGRAM_ADMIN_USERS"));
        if telegram_admin_users.is_empty() {
            return Err(required("TELEGRAM_ADMIN_USERS"));
        }

        let payment_api_base_url = vars
            .string("PAYMENT_API_BASE_URL")
            .ok_or_else(|| required("PAYMENT_API_BASE_URL"))?
            .trim_end_matches('/')
            .to_string();
        if !payment_api_base_url.starts_with("http://")
            && !payment_api_base_url.starts_with("https://")
        {
            return Err(Error::Config(format!(
                "PAYMENT_API_BASE_URL must be an http(s) URL, got {payment_api_base_url:?}"
            )));
        }
        let payment_api_key = vars
            .string("PAYMENT_API_KEY")
            .ok_or_else(|| required("PAYMENT_API_KEY"))?;
        let payment_currency = vars
            .string("PAYMENT_CURRENCY")
            .unwrap_or_else(|| "BRL".to_string());

        let vip_price: Amount = vars.parsed("VIP_PRICE", Amount::from_cents(1000))?;
        if !vip_price.is_positive() {
            return Err(Error::Config("VIP_PRICE must be positive".to_string()));
        }
        let vip_description = vars
            .string("VIP_DESCRIPTION")
            .unwrap_or_else(|| "VIP group access".to_string());

        let usdt_wallet_address = vars.string("USDT_WALLET_ADDRESS");
        let usdt_network = vars
            .string("USDT_NETWORK")
            .unwrap_or_else(|| "TRC20".to_string());

        let failure_threshold = vars.parsed("CIRCUIT_FAILURE_THRESHOLD", 5u32)?;
        at_least("CIRCUIT_FAILURE_THRESHOLD", failure_threshold as u64, 1)?;
        let recovery_secs = vars.parsed("CIRCUIT_RECOVERY_TIMEOUT", 60u64)?;
        at_least("CIRCUIT_RECOVERY_TIMEOUT", recovery_secs, 1)?;
        let max_retries = vars.parsed("PAYMENT_MAX_RETRIES", 2u32)?;
        let base_backoff = vars.seconds_f64("PAYMENT_BACKOFF_BASE", 0.3)?;
        let request_timeout = vars.seconds_f64("PAYMENT_REQUEST_TIMEOUT", 30.0)?;

        let interval_secs = vars.parsed("MUTE_CHECK_INTERVAL", 60u64)?;
        at_least("MUTE_CHECK_INTERVAL", interval_secs, 1)?;
        let restrictions_file = PathBuf::from(
            vars.string("RESTRICTIONS_FILE")
                .unwrap_or_else(|| "/tmp/vgb-restrictions.json".to_string()),
        );

        Ok(Self {
            telegram_bot_token,
            telegram_admin_users,
            payment_api_base_url,
            payment_api_key,
            payment_currency,
            vip_price,
            vip_description,
            usdt_wallet_address,
            usdt_network,
            failure_threshold,
            recovery_timeout: Duration::from_secs(recovery_secs),
            max_retries,
            base_backoff,
            request_timeout,
            scheduler_interval: Duration::from_secs(interval_secs),
            restrictions_file,
        })
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.telegram_admin_users.contains(&user_id)
    }

    pub fn breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig::default()
            .with_failure_threshold(self.failure_threshold)
            .with_recovery_timeout(self.recovery_timeout)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.base_backoff)
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            base_url: self.payment_api_base_url.clone(),
            api_key: self.payment_api_key.clone(),
            currency: self.payment_currency.clone(),
            retry: self.retry_policy(),
        }
    }
}

struct Vars<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl Vars<'_> {
    /// Trimmed, non-empty value.
    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn parsed<T: FromStr>(&self, key: &str, default: T) -> Result<T> {
        match self.string(key) {
            None => Ok(default),
            Some(raw) => raw
                .parse::<T>()
                .map_err(|_| Error::Config(format!("{key} has an invalid value: {raw:?}"))),
        }
    }

    fn seconds_f64(&self, key: &str, default: f64) -> Result<Duration> {
        let secs = self.parsed(key, default)?;
        if !(secs > 0.0) {
            return Err(Error::Config(format!("{key} must be > 0, got {secs}")));
        }
        Duration::try_from_secs_f64(secs)
            .map_err(|_| Error::Config(format!("{key} is out of range: {secs}")))
    }
}

fn required(key: &str) -> Error {
    Error::Config(format!("{key} environment variable is required"))
}

fn at_least(key: &str, value: u64, min: u64) -> Result<()> {
    if value < min {
        return Err(Error::Config(format!("{key} must be >= {min}, got {value}")));
    }
    Ok(())
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}
