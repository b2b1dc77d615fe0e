use serde::Deserialize;

use crate::error::VmError;

/// Connection settings for one customer account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VmConfig {
    pub customer_id: String,
    pub customer_api_token: String,
    pub base_api_url: String,
    /// Skip TLS certificate verification. Off unless explicitly enabled.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl VmConfig {
    pub fn new(customer_id: &str, customer_api_token: &str, base_api_url: &str) -> Self {
        Self {
            customer_id: customer_id.to_string(),
            customer_api_token: customer_api_token.to_string(),
            base_api_url: base_api_url.to_string(),
            accept_invalid_certs: false,
        }
    }

    /// Load settings from a config file (any format the `config` crate reads).
    pub fn load(path: &str) -> Result<Self, VmError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Load settings from `VM_CUSTOMER_ID`, `VM_CUSTOMER_API_TOKEN`,
    /// `VM_BASE_API_URL` and the optional `VM_ACCEPT_INVALID_CERTS`.
    pub fn from_env() -> Result<Self, VmError> {
        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix("VM"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
