//! Client configuration: endpoint, commitment, program binding and the
//! local files the portal reads.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use gif_portal_core::Idl;
use solana_sdk::pubkey::Pubkey;

use crate::error::{ClientError, Result};

/// Default base-account keypair location, relative to the working directory.
pub const DEFAULT_BASE_ACCOUNT_PATH: &str = "keypair.json";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Cluster {
    #[default]
    Devnet,
    Testnet,
    MainnetBeta,
    Localnet,
    Custom(String),
}

impl Cluster {
    pub fn url(&self) -> &str {
        match self {
            Cluster::Devnet => "https://api.devnet.solana.com",
            Cluster::Testnet => "https://api.testnet.solana.com",
            Cluster::MainnetBeta => "https://api.mainnet-beta.solana.com",
            Cluster::Localnet => "http://127.0.0.1:8899",
            Cluster::Custom(url) => url,
        }
    }
}

impl FromStr for Cluster {
    type Err = ClientError;

    /// Accepts a cluster moniker or an http(s) URL.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "devnet" | "d" => Ok(Cluster::Devnet),
            "testnet" | "t" => Ok(Cluster::Testnet),
            "mainnet-beta" | "mainnet" | "m" => Ok(Cluster::MainnetBeta),
            "localnet" | "localhost" | "l" => Ok(Cluster::Localnet),
            url if url.starts_with("http://") || url.starts_with("https://") => {
                Ok(Cluster::Custom(url.to_string()))
            }
            other => Err(ClientError::Config(format!(
                "unknown cluster '{other}' (expected devnet, testnet, mainnet-beta, localnet or a URL)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Commitment {
    #[default]
    Processed,
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }

    /// Whether a `confirmationStatus` reported by the node meets this level.
    pub fn is_satisfied_by(&self, status: &str) -> bool {
        match self {
            Commitment::Processed => matches!(status, "processed" | "confirmed" | "finalized"),
            Commitment::Confirmed => matches!(status, "confirmed" | "finalized"),
            Commitment::Finalized => status == "finalized",
        }
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Commitment {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "processed" => Ok(Commitment::Processed),
            "confirmed" => Ok(Commitment::Confirmed),
            "finalized" => Ok(Commitment::Finalized),
            other => Err(ClientError::Config(format!("unknown commitment '{other}'"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub cluster: Cluster,
    pub commitment: Commitment,
    pub program_id: Pubkey,
    pub base_account_path: PathBuf,
    pub wallet_path: PathBuf,
    pub trust_path: PathBuf,
    pub request_timeout: Duration,
    pub confirm_attempts: u32,
    pub confirm_interval: Duration,
}

impl PortalConfig {
    pub fn new(cluster: Cluster, program_id: Pubkey) -> Self {
        let wallet_path = default_wallet_path();
        Self {
            cluster,
            commitment: Commitment::default(),
            program_id,
            base_account_path: PathBuf::from(DEFAULT_BASE_ACCOUNT_PATH),
            trust_path: trust_path_for(&wallet_path),
            wallet_path,
            request_timeout: Duration::from_secs(30),
            confirm_attempts: 30,
            confirm_interval: Duration::from_millis(500),
        }
    }

    pub fn rpc_url(&self) -> &str {
        self.cluster.url()
    }
}

/// Program id from an explicit override, falling back to the IDL's address.
pub fn resolve_program_id(idl: &Idl, override_id: Option<&str>) -> Result<Pubkey> {
    let address = match override_id {
        Some(id) => id,
        None => idl.program_address()?,
    };
    Pubkey::from_str(address)
        .map_err(|e| ClientError::Config(format!("invalid program id '{address}': {e}")))
}

/// `~/.config/solana/id.json`, the Solana CLI default keypair.
pub fn default_wallet_path() -> PathBuf {
    let home = std::env::var_os("HOME").unwrap_or_default();
    PathBuf::from(home).join(".config").join("solana").join("id.json")
}

/// Trust list stored next to the wallet keypair: `<wallet>.trusted`.
pub fn trust_path_for(wallet_path: &Path) -> PathBuf {
    let mut name = wallet_path.as_os_str().to_os_string();
    name.push(".trusted");
    PathBuf::from(name)
}
