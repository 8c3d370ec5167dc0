use std::{env, str::FromStr, time::Duration as StdDuration};

use chrono::Duration;
use log::*;
use settlement_engine::gateway::{GatewayEnvironment, VnPayConfig, DEFAULT_UTC_OFFSET_HOURS, DEFAULT_VNPAY_URL};
use sps_common::{helpers::parse_boolean_flag, Secret};

const DEFAULT_SPS_HOST: &str = "127.0.0.1";
const DEFAULT_SPS_PORT: u16 = 8360;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/sps_store.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_EVENT_BUFFER_SIZE: usize = 64;
const DEFAULT_PUSH_TOKEN_CACHE_TTL: StdDuration = StdDuration::from_secs(300);
const DEFAULT_PAYMENT_EXPIRY_GRACE_MINUTES: i64 = 60;
// One year
const MAX_PAYMENT_EXPIRY_GRACE_MINUTES: i64 = 525_600;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the `for=` field of the Forwarded header will be used to determine the client's IP address.
    pub use_forwarded: bool,
    /// Capacity of the event channels and of the admin broadcast hub.
    pub event_buffer_size: usize,
    /// How long a push token read from the database is reused before it is read again.
    pub push_token_cache_ttl: StdDuration,
    /// How long past its gateway expiry a pending payment is kept open. `None` disables the payment expiry worker.
    pub payment_expiry_grace: Option<Duration>,
    pub vnpay: VnPayConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SPS_HOST.to_string(),
            port: DEFAULT_SPS_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            use_x_forwarded_for: false,
            use_forwarded: false,
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            push_token_cache_ttl: DEFAULT_PUSH_TOKEN_CACHE_TTL,
            payment_expiry_grace: Some(Duration::minutes(DEFAULT_PAYMENT_EXPIRY_GRACE_MINUTES)),
            vnpay: VnPayConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SPS_HOST").ok().unwrap_or_else(|| DEFAULT_SPS_HOST.into());
        let port = parse_env("SPS_PORT", DEFAULT_SPS_PORT);
        let database_url = env::var("SPS_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ SPS_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let max_connections = parse_env("SPS_DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS).max(1);
        let use_x_forwarded_for = parse_boolean_flag(env::var("SPS_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("SPS_USE_FORWARDED").ok(), false);
        let event_buffer_size = parse_env("SPS_EVENT_BUFFER_SIZE", DEFAULT_EVENT_BUFFER_SIZE).max(1);
        let push_token_cache_ttl =
            StdDuration::from_secs(parse_env("SPS_PUSH_TOKEN_CACHE_TTL", DEFAULT_PUSH_TOKEN_CACHE_TTL.as_secs()));
        let payment_expiry_grace = configure_payment_expiry(env::var("SPS_PAYMENT_EXPIRY_GRACE").ok());
        let vnpay = vnpay_config_from_env();
        Self {
            host,
            port,
            database_url,
            max_connections,
            use_x_forwarded_for,
            use_forwarded,
            event_buffer_size,
            push_token_cache_ttl,
            payment_expiry_grace,
            vnpay,
        }
    }
}

fn parse_env<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => {
            debug!("🪛️ {name} is not set. Using the default, {default}.");
            default
        },
    }
}

/// Reads the payment expiry grace period in minutes. `0`, `off`, `false` and `none` disable expiry.
pub fn configure_payment_expiry(value: Option<String>) -> Option<Duration> {
    let Some(value) = value else {
        info!(
            "🪛️ SPS_PAYMENT_EXPIRY_GRACE is not set. Using the default value of {DEFAULT_PAYMENT_EXPIRY_GRACE_MINUTES} \
             minutes."
        );
        return Some(Duration::minutes(DEFAULT_PAYMENT_EXPIRY_GRACE_MINUTES));
    };
    let value = value.trim().to_ascii_lowercase();
    if ["0", "off", "false", "none"].contains(&value.as_str()) {
        info!("🪛️ Payment expiry is disabled. Pending payments will stay open until the gateway calls back.");
        return None;
    }
    match value.parse::<i64>() {
        Ok(minutes) if minutes > 0 && minutes <= MAX_PAYMENT_EXPIRY_GRACE_MINUTES => Some(Duration::minutes(minutes)),
        _ => {
            warn!(
                "🪛️ Invalid configuration value for SPS_PAYMENT_EXPIRY_GRACE: {value}. Using the default value of \
                 {DEFAULT_PAYMENT_EXPIRY_GRACE_MINUTES} minutes."
            );
            Some(Duration::minutes(DEFAULT_PAYMENT_EXPIRY_GRACE_MINUTES))
        },
    }
}

fn vnpay_config_from_env() -> VnPayConfig {
    let tmn_code = env::var("SPS_VNP_TMN_CODE").ok().unwrap_or_else(|| {
        error!("🪛️ SPS_VNP_TMN_CODE is not set. Please set it to the merchant code issued by VNPay.");
        String::default()
    });
    let hash_secret = env::var("SPS_VNP_HASH_SECRET").ok().unwrap_or_else(|| {
        error!("🪛️ SPS_VNP_HASH_SECRET is not set. Payment requests and callbacks cannot be signed or verified.");
        String::default()
    });
    let payment_url = env::var("SPS_VNP_URL").ok().unwrap_or_else(|| {
        info!("🪛️ SPS_VNP_URL is not set. Using the sandbox gateway, {DEFAULT_VNPAY_URL}.");
        DEFAULT_VNPAY_URL.to_string()
    });
    let return_url = env::var("SPS_VNP_RETURN_URL").ok().unwrap_or_else(|| {
        error!("🪛️ SPS_VNP_RETURN_URL is not set. The gateway will not know where to send payers back to.");
        String::default()
    });
    let environment = env::var("SPS_VNP_ENVIRONMENT")
        .ok()
        .map(|s| {
            GatewayEnvironment::from_str(&s).unwrap_or_else(|e| {
                warn!("🪛️ {e}. Assuming production.");
                GatewayEnvironment::Production
            })
        })
        .unwrap_or_default();
    let trust_unsigned = parse_boolean_flag(env::var("SPS_VNP_TRUST_UNSIGNED").ok(), false);
    let config = VnPayConfig {
        tmn_code,
        hash_secret: Secret::new(hash_secret),
        payment_url,
        return_url,
        environment,
        trust_unsigned,
        utc_offset_hours: parse_env("SPS_VNP_UTC_OFFSET_HOURS", DEFAULT_UTC_OFFSET_HOURS),
    };
    if trust_unsigned {
        match environment {
            GatewayEnvironment::Sandbox => {
                warn!("🚨️ Callback signatures are NOT being checked. Never run like this against the live gateway 🚨️")
            },
            GatewayEnvironment::Production => {
                warn!("🪛️ SPS_VNP_TRUST_UNSIGNED is ignored in production. Callback signatures will be enforced.")
            },
        }
    }
    config
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that request handlers need. Secrets are deliberately left out.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn payment_expiry_grace() {
        assert_eq!(configure_payment_expiry(None), Some(Duration::minutes(60)));
        assert_eq!(configure_payment_expiry(Some("90".into())), Some(Duration::minutes(90)));
        assert_eq!(configure_payment_expiry(Some("0".into())), None);
        assert_eq!(configure_payment_expiry(Some(" OFF ".into())), None);
        assert_eq!(configure_payment_expiry(Some("-5".into())), Some(Duration::minutes(60)));
        assert_eq!(configure_payment_expiry(Some("soon".into())), Some(Duration::minutes(60)));
        assert_eq!(configure_payment_expiry(Some(i64::MAX.to_string())), Some(Duration::minutes(60)));
    }

    #[test]
    fn defaults() {
        let config = ServerConfig::new("0.0.0.0", 9000);
        assert_eq!(config.port, 9000);
        assert_eq!(config.max_connections, 25);
        assert_eq!(config.push_token_cache_ttl, StdDuration::from_secs(300));
        assert_eq!(config.vnpay.payment_url, DEFAULT_VNPAY_URL);
        let options = ServerOptions::from_config(&config);
        assert!(!options.use_x_forwarded_for && !options.use_forwarded);
    }
}
