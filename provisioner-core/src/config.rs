use crate::errors::ConfigError;

pub const GATEWAY_VAR: &str = "GATEWAY";
pub const BROKER_VAR: &str = "BROKER";
pub const BIND_ADDRESS_VAR: &str = "BIND_ADDRESS";

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Reported to callers as the place to produce to / consume from the topic.
    pub gateway: String,
    /// Kafka broker to administer.
    pub broker: String,
    pub bind_address: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source. Empty values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let gateway = get(GATEWAY_VAR).ok_or(ConfigError::MissingVariable {
            var: GATEWAY_VAR,
            purpose: "the host and port of a liiklus gRPC endpoint",
        })?;
        let broker = get(BROKER_VAR).ok_or(ConfigError::MissingVariable {
            var: BROKER_VAR,
            purpose: "the host and port of a Kafka broker",
        })?;
        let bind_address =
            get(BIND_ADDRESS_VAR).unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        Ok(Self {
            gateway,
            broker,
            bind_address,
        })
    }

    pub fn brokers(&self) -> Vec<String> {
        vec![self.broker.clone()]
    }
}
