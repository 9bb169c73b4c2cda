use std::env::var;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;
use thiserror::Error;

use crate::{
    application::services::delivery::DeliveryPolicy,
    infrastructure::delivery::twilio::{DEFAULT_API_BASE, TwilioConfig},
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("An error occured while getting {0} env param")]
    Missing(&'static str),
    #[error("An error occured while parsing {0} env param: {1}")]
    Invalid(&'static str, String),
}

#[derive(Debug, Clone)]
pub enum DeliveryBackendConfig {
    Stub { success_rate: f64 },
    Twilio(TwilioConfig),
}

#[derive(Debug)]
pub struct Config {
    pub port: u16,
    pub scheme: String,
    pub host: String,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub cors_origin: String,
    pub poll_interval: Duration,
    pub send_interval: Duration,
    pub delivery_policy: DeliveryPolicy,
    pub delivery_backend: DeliveryBackendConfig,
}

impl Config {
    pub fn try_parse() -> Result<Config, ConfigError> {
        let _ = dotenv();
        Self::from_lookup(|key| var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
        let env = Env { lookup };

        let delivery_backend = match env.optional("DELIVERY_BACKEND").as_deref() {
            None | Some("stub") => DeliveryBackendConfig::Stub {
                success_rate: env.parse_or("STUB_SUCCESS_RATE", 0.9).and_then(|rate: f64| {
                    if (0.0..=1.0).contains(&rate) {
                        Ok(rate)
                    } else {
                        Err(ConfigError::Invalid(
                            "STUB_SUCCESS_RATE",
                            format!("{rate} is not a probability between 0 and 1"),
                        ))
                    }
                })?,
            },
            Some("twilio") => DeliveryBackendConfig::Twilio(TwilioConfig {
                account_sid: env.required("TWILIO_ACCOUNT_SID")?,
                auth_token: env.required("TWILIO_AUTH_TOKEN")?,
                from_number: env.required("TWILIO_PHONE_NUMBER")?,
                status_callback_url: env.optional("TWILIO_STATUS_CALLBACK_URL"),
                api_base: env
                    .optional("TWILIO_API_BASE")
                    .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            }),
            Some(other) => {
                return Err(ConfigError::Invalid(
                    "DELIVERY_BACKEND",
                    format!("unknown backend '{other}', expected 'stub' or 'twilio'"),
                ));
            }
        };

        let poll_interval_secs: u64 = env.parse_or("POLL_INTERVAL_SECONDS", 30)?;
        if poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "POLL_INTERVAL_SECONDS",
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Config {
            port: env.parse("PORT")?,
            scheme: env.required("SCHEME")?,
            host: env.required("HOST")?,
            database_url: env.optional("DATABASE_URL"),
            database_max_connections: env.parse_or("DATABASE_MAX_CONNECTIONS", 5)?,
            cors_origin: env
                .optional("CORS_ORIGIN")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            poll_interval: Duration::from_secs(poll_interval_secs),
            send_interval: Duration::from_millis(env.parse_or("SEND_INTERVAL_MILLIS", 1000)?),
            delivery_policy: DeliveryPolicy {
                max_attempts: env.parse_or("DELIVERY_MAX_ATTEMPTS", 3)?,
                retry_delay: Duration::from_millis(
                    env.parse_or("DELIVERY_RETRY_DELAY_MILLIS", 2000)?,
                ),
                attempt_timeout: Duration::from_secs(
                    env.parse_or("DELIVERY_ATTEMPT_TIMEOUT_SECONDS", 10)?,
                ),
            },
            delivery_backend,
        })
    }
}

struct Env<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn optional(&self, key: &'static str) -> Option<String> {
        (self.lookup)(key).filter(|value| !value.trim().is_empty())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.optional(key).ok_or(ConfigError::Missing(key))
    }

    fn parse<T>(&self, key: &'static str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: ToString,
    {
        self.required(key)?
            .trim()
            .parse()
            .map_err(|err: T::Err| ConfigError::Invalid(key, err.to_string()))
    }

    fn parse_or<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: ToString,
    {
        match self.optional(key) {
            Some(_) => self.parse(key),
            None => Ok(default),
        }
    }
}
