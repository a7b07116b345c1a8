//! network profiles and client tuning

use crate::{
    client::TransactionOptions,
    error::{Result, SdkError},
    types::AccountAddress,
};

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, time::Duration};

pub const DEVNET_NODE_URL: &str = "https://fullnode.devnet.aptoslabs.com/v1";
pub const DEVNET_FAUCET_URL: &str = "https://faucet.devnet.aptoslabs.com";
pub const DEVNET_CONTRACT_ADDRESS: &str =
    "4723ae199cbcf97347e7d4c2d4e720df379834dd6be8b0743cc8f581502ee4dc";
/// devnet-only test key, funded from the faucet
pub const DEVNET_ADMIN_PRIVATE_KEY: &str =
    "0x3d926e326e419fdd759e4826d2e85f1d116c19ef499f8b0dd4672bdfd52d467c";

pub const DEFAULT_MAX_GAS_AMOUNT: u64 = 200_000;
pub const DEFAULT_EXPIRATION_SECS: u64 = 20;

/// network selector
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Devnet,
}

impl Network {
    pub fn profile(&self) -> NetworkProfile {
        match self {
            Network::Devnet => NetworkProfile::devnet(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Network::Devnet => "devnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "devnet" => Ok(Network::Devnet),
            other => Err(SdkError::Config(format!("unknown network: {}", other))),
        }
    }
}

/// everything needed to talk to one deployment of the contract
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkProfile {
    /// profile name
    pub name: String,
    /// fullnode rest endpoint
    pub node_url: String,
    /// faucet endpoint (test networks only)
    pub faucet_url: Option<String>,
    /// account the contract modules are published under
    pub contract_address: AccountAddress,
    /// hex ed25519 key of the admin account
    pub admin_private_key: String,
}

impl NetworkProfile {
    pub fn devnet() -> Self {
        Self {
            name: Network::Devnet.name().into(),
            node_url: DEVNET_NODE_URL.into(),
            faucet_url: Some(DEVNET_FAUCET_URL.into()),
            contract_address: AccountAddress::from_str(DEVNET_CONTRACT_ADDRESS)
                .unwrap_or_default(),
            admin_private_key: DEVNET_ADMIN_PRIVATE_KEY.into(),
        }
    }

    /// profile for a deployment not known to this crate
    pub fn custom(
        name: impl Into<String>,
        node_url: impl Into<String>,
        contract_address: AccountAddress,
        admin_private_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            node_url: node_url.into(),
            faucet_url: None,
            contract_address,
            admin_private_key: admin_private_key.into(),
        }
    }

    pub fn with_faucet(mut self, faucet_url: impl Into<String>) -> Self {
        self.faucet_url = Some(faucet_url.into());
        self
    }
}

/// client configuration
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// per http request timeout
    pub request_timeout: Duration,
    /// how long to wait for a transaction to reach terminal status
    pub wait_timeout: Duration,
    /// delay between status polls
    pub poll_interval: Duration,
    /// gas limit for generated transactions
    pub max_gas_amount: u64,
    /// expiration offset from now
    pub expiration_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            wait_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
            max_gas_amount: DEFAULT_MAX_GAS_AMOUNT,
            expiration_secs: DEFAULT_EXPIRATION_SECS,
        }
    }
}

impl ClientConfig {
    /// defaults applied to every transaction a wallet generates
    pub fn transaction_options(&self) -> TransactionOptions {
        TransactionOptions {
            max_gas_amount: Some(self.max_gas_amount),
            expiration_secs: Some(self.expiration_secs),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_devnet_profile() {
        let profile = Network::Devnet.profile();
        assert_eq!(profile.node_url, DEVNET_NODE_URL);
        assert_eq!(profile.faucet_url.as_deref(), Some(DEVNET_FAUCET_URL));
        assert_eq!(profile.contract_address.to_hex(), DEVNET_CONTRACT_ADDRESS);
    }

    #[test]
    fn test_network_from_str() {
        assert_eq!("devnet".parse::<Network>().unwrap(), Network::Devnet);
        assert_eq!(" DevNet ".parse::<Network>().unwrap(), Network::Devnet);
        assert!(matches!("mainnet".parse::<Network>(), Err(SdkError::Config(_))));
    }

    #[test]
    fn test_profile_serde() {
        let profile = NetworkProfile::custom(
            "local",
            "http://127.0.0.1:8080/v1",
            AccountAddress::ONE,
            "0x01",
        )
        .with_faucet("http://127.0.0.1:8081");
        let json = serde_json::to_string(&profile).unwrap();
        let back: NetworkProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back.contract_address, AccountAddress::ONE);
        assert_eq!(back.faucet_url.as_deref(), Some("http://127.0.0.1:8081"));
    }
}
