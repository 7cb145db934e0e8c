use {
    crate::{adapters::adyen::client::DEFAULT_BASE_URL, domain::{id::MethodCode, method::PaymentMethod}},
    std::{env, net::SocketAddr},
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Process settings, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub listen_addr: SocketAddr,
    pub adyen_api_base_url: String,
    pub adyen_api_key: String,
    pub payment_methods: Vec<PaymentMethod>,
}

fn optional(name: &'static str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match optional(name) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

impl AppConfig {
    /// Loads `.env` if present, then reads the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let database_url = optional("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let payment_methods = match optional("PAYMENT_METHODS") {
            Some(raw) => parse_payment_methods(&raw)?,
            None => Vec::new(),
        };

        Ok(Self {
            database_url,
            database_max_connections: parse("DATABASE_MAX_CONNECTIONS", 20)?,
            listen_addr: parse("LISTEN_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            adyen_api_base_url: optional("ADYEN_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            adyen_api_key: optional("ADYEN_API_KEY").unwrap_or_default(),
            payment_methods,
        })
    }
}

/// `PAYMENT_METHODS` is a JSON array of method definitions.
pub fn parse_payment_methods(raw: &str) -> Result<Vec<PaymentMethod>, ConfigError> {
    let methods: Vec<PaymentMethod> =
        serde_json::from_str(raw).map_err(|e| ConfigError::Invalid {
            name: "PAYMENT_METHODS",
            reason: e.to_string(),
        })?;

    for method in &methods {
        MethodCode::new(method.code.as_str()).map_err(|e| ConfigError::Invalid {
            name: "PAYMENT_METHODS",
            reason: e.to_string(),
        })?;
        if method.is_adyen() && method.hmac_key.as_deref().is_none_or(|k| hex::decode(k).is_err()) {
            tracing::warn!(
                method_code = %method.code,
                "adyen method has no usable webhook HMAC key; its notifications will be refused"
            );
        }
    }
    Ok(methods)
}
