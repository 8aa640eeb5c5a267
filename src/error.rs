/// An error when turning a private key into a signer.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    /// The private key was empty.
    #[error("no private key provided")]
    MissingKey,

    /// The private key could not be parsed.
    #[error("invalid private key: {0}")]
    InvalidKey(String),

    /// An address inside the intent message could not be parsed.
    #[error("invalid {field} address in intent: {value}")]
    InvalidAddress {
        /// The message field holding the address.
        field: &'static str,

        /// The offending value.
        value: String,
    },

    /// The underlying signer failed.
    #[error("signing: {0}")]
    Signer(#[from] alloy_signer::Error),
}

/// An error when loading the flow configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration value could not be parsed.
    #[error("invalid value for {key}: {value}")]
    InvalidValue {
        /// The configuration key.
        key: &'static str,

        /// The raw value.
        value: String,
    },

    /// A configured URL was empty.
    #[error("{0} must not be empty")]
    EmptyUrl(&'static str),
}

/// An error when configuring a payment gate.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The route pattern was empty.
    #[error("route pattern must not be empty")]
    EmptyPattern,

    /// The route pattern did not start with a slash.
    #[error("route pattern must start with '/': {0}")]
    RelativePattern(String),
}
