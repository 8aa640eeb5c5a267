use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_FACILITATOR_URL: &str = "https://facilitator.payai.network";
pub const DEFAULT_MOCK_FACILITATOR_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// The settings of a payment flow client.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowConfig {
    /// The primary facilitator.
    pub facilitator_url: String,

    /// The facilitator used when the primary is unreachable or failing.
    pub mock_facilitator_url: String,

    /// The wallet key used to derive the paying address and sign intents.
    pub private_key: Option<String>,

    /// The network identifier sent with every request.
    pub network: Option<String>,

    /// The recipient of signed intents.
    pub merchant_address: Option<String>,

    /// The timeout of create, verify and settle calls.
    pub timeout: Duration,

    /// The timeout of the liveness probe made when the session starts.
    pub probe_timeout: Duration,

    /// The timeout of later `/list` calls.
    pub discovery_timeout: Duration,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            facilitator_url: DEFAULT_FACILITATOR_URL.to_string(),
            mock_facilitator_url: DEFAULT_MOCK_FACILITATOR_URL.to_string(),
            private_key: None,
            network: None,
            merchant_address: None,
            timeout: DEFAULT_TIMEOUT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
        }
    }
}

impl FlowConfig {
    pub fn new(facilitator_url: impl Into<String>) -> Self {
        Self { facilitator_url: facilitator_url.into(), ..Default::default() }
    }

    pub fn with_mock_facilitator_url(mut self, url: impl Into<String>) -> Self {
        self.mock_facilitator_url = url.into();
        self
    }

    pub fn with_private_key(mut self, private_key: impl Into<String>) -> Self {
        self.private_key = Some(private_key.into());
        self
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    pub fn with_merchant_address(mut self, address: impl Into<String>) -> Self {
        self.merchant_address = Some(address.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Read the configuration from the process environment.
    ///
    /// Recognized variables: `FACILITATOR_URL` (or `PAYAI_FACILITATOR_URL`), `MOCK_FACILITATOR_URL`,
    /// `X402_PRIVATE_KEY` (or `PAYAI_WALLET_PRIVATE_KEY`), `X402_NETWORK`, `PAYAI_MERCHANT_ADDRESS`
    /// (or `ADDRESS`) and `X402_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |keys: &[&str]| keys.iter().find_map(|&key| lookup(key).filter(|v| !v.trim().is_empty()));
        let defaults = Self::default();

        let facilitator_url = get(&["FACILITATOR_URL", "PAYAI_FACILITATOR_URL"]).unwrap_or(defaults.facilitator_url);
        let mock_facilitator_url = get(&["MOCK_FACILITATOR_URL"]).unwrap_or(defaults.mock_facilitator_url);
        let timeout = match get(&["X402_TIMEOUT_SECS"]) {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(ConfigError::InvalidValue { key: "X402_TIMEOUT_SECS", value }),
            },
            None => defaults.timeout,
        };

        let config = Self {
            facilitator_url,
            mock_facilitator_url,
            private_key: get(&["X402_PRIVATE_KEY", "PAYAI_WALLET_PRIVATE_KEY"]),
            network: get(&["X402_NETWORK"]),
            merchant_address: get(&["PAYAI_MERCHANT_ADDRESS", "ADDRESS"]),
            timeout,
            ..defaults
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that both facilitator URLs are set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.facilitator_url.trim().is_empty() {
            return Err(ConfigError::EmptyUrl("facilitator_url"));
        }
        if self.mock_facilitator_url.trim().is_empty() {
            return Err(ConfigError::EmptyUrl("mock_facilitator_url"));
        }
        Ok(())
    }
}
