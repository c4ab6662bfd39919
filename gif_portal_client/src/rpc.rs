//! JSON-RPC access to the cluster.
//!
//! `ProgramRpc` is the seam the portal talks through; `RpcClient` implements it
//! over HTTP with the four methods the portal needs.

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use tracing::{debug, trace};

use crate::config::{Commitment, PortalConfig};
use crate::error::{ClientError, Result};

/// Raw account as returned by `getAccountInfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub lamports: u64,
    pub owner: Pubkey,
    pub data: Vec<u8>,
    pub executable: bool,
}

/// Remote calls the portal depends on.
#[async_trait]
pub trait ProgramRpc: Send + Sync {
    /// `None` when the account does not exist.
    async fn get_account(&self, address: &Pubkey) -> Result<Option<AccountInfo>>;

    async fn latest_blockhash(&self) -> Result<Hash>;

    /// Submit a fully signed transaction and wait for it to land.
    async fn send_and_confirm(&self, tx: &Transaction) -> Result<Signature>;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct UiAccount {
    lamports: u64,
    owner: String,
    /// `[<base64 payload>, "base64"]`
    data: (String, String),
    executable: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockhashValue {
    blockhash: String,
    #[allow(dead_code)]
    last_valid_block_height: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
    pub slot: u64,
    pub err: Option<Value>,
    pub confirmation_status: Option<String>,
}

impl UiAccount {
    fn decode(self) -> Result<AccountInfo> {
        let (payload, encoding) = self.data;
        if encoding != "base64" {
            return Err(ClientError::InvalidResponse(format!(
                "unexpected account encoding '{encoding}'"
            )));
        }
        let data = BASE64
            .decode(payload)
            .map_err(|e| ClientError::InvalidResponse(format!("bad base64 account data: {e}")))?;
        let owner = Pubkey::from_str(&self.owner)
            .map_err(|e| ClientError::InvalidResponse(format!("bad owner '{}': {e}", self.owner)))?;
        Ok(AccountInfo {
            lamports: self.lamports,
            owner,
            data,
            executable: self.executable,
        })
    }
}

fn unwrap_response<T>(method: &str, response: RpcResponse<T>) -> Result<T> {
    if let Some(err) = response.error {
        return Err(ClientError::Rpc {
            code: err.code,
            message: err.message,
        });
    }
    response
        .result
        .ok_or_else(|| ClientError::InvalidResponse(format!("{method}: missing result")))
}

/// What one status poll says about a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Poll {
    Pending,
    Confirmed,
    Failed(String),
}

fn classify(status: Option<&SignatureStatus>, commitment: Commitment) -> Poll {
    let Some(status) = status else {
        return Poll::Pending;
    };
    if let Some(err) = &status.err {
        return Poll::Failed(err.to_string());
    }
    let reached = status
        .confirmation_status
        .as_deref()
        .is_some_and(|s| commitment.is_satisfied_by(s));
    if reached { Poll::Confirmed } else { Poll::Pending }
}

/// Ask `fetch` for the status up to `attempts` times, `interval` apart.
async fn poll_confirmation<F, Fut>(
    signature: &Signature,
    commitment: Commitment,
    attempts: u32,
    interval: Duration,
    mut fetch: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<SignatureStatus>>>,
{
    for attempt in 0..attempts {
        if attempt > 0 {
            tokio::time::sleep(interval).await;
        }
        let status = fetch().await?;
        match classify(status.as_ref(), commitment) {
            Poll::Confirmed => {
                let slot = status.map(|s| s.slot);
                debug!(%signature, ?slot, "transaction confirmed");
                return Ok(());
            }
            Poll::Failed(reason) => {
                return Err(ClientError::TransactionFailed {
                    signature: signature.to_string(),
                    reason,
                });
            }
            Poll::Pending => trace!(%signature, attempt, "not confirmed yet"),
        }
    }
    Err(ClientError::NotConfirmed {
        signature: signature.to_string(),
        attempts,
    })
}

/// Serialize a transaction for `sendTransaction` (bincode, then base64).
pub fn encode_transaction(tx: &Transaction) -> Result<String> {
    let bytes = bincode::serialize(tx).map_err(|e| ClientError::Serialization(e.to_string()))?;
    Ok(BASE64.encode(bytes))
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

pub struct RpcClient {
    http: reqwest::Client,
    url: String,
    commitment: Commitment,
    confirm_attempts: u32,
    confirm_interval: Duration,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: impl Into<String>, commitment: Commitment) -> Result<Self> {
        Self::with_timeout(url, commitment, Duration::from_secs(30))
    }

    pub fn with_timeout(
        url: impl Into<String>,
        commitment: Commitment,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
            commitment,
            confirm_attempts: 30,
            confirm_interval: Duration::from_millis(500),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn from_config(config: &PortalConfig) -> Result<Self> {
        let mut client =
            Self::with_timeout(config.rpc_url(), config.commitment, config.request_timeout)?;
        client.confirm_attempts = config.confirm_attempts;
        client.confirm_interval = config.confirm_interval;
        Ok(client)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        trace!(method, id, "rpc request");

        let response: RpcResponse<T> = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        unwrap_response(method, response)
    }

    pub async fn get_account_info(&self, address: &Pubkey) -> Result<Option<AccountInfo>> {
        let response: WithContext<Option<UiAccount>> = self
            .call(
                "getAccountInfo",
                json!([address.to_string(), {
                    "encoding": "base64",
                    "commitment": self.commitment.as_str(),
                }]),
            )
            .await?;
        response.value.map(UiAccount::decode).transpose()
    }

    pub async fn get_balance(&self, address: &Pubkey) -> Result<u64> {
        let response: WithContext<u64> = self
            .call(
                "getBalance",
                json!([address.to_string(), { "commitment": self.commitment.as_str() }]),
            )
            .await?;
        Ok(response.value)
    }

    pub async fn get_latest_blockhash(&self) -> Result<Hash> {
        let response: WithContext<BlockhashValue> = self
            .call(
                "getLatestBlockhash",
                json!([{ "commitment": self.commitment.as_str() }]),
            )
            .await?;
        Hash::from_str(&response.value.blockhash).map_err(|e| {
            ClientError::InvalidResponse(format!("bad blockhash '{}': {e}", response.value.blockhash))
        })
    }

    pub async fn send_transaction(&self, tx: &Transaction) -> Result<Signature> {
        let encoded = encode_transaction(tx)?;
        let signature: String = self
            .call(
                "sendTransaction",
                json!([encoded, {
                    "encoding": "base64",
                    "preflightCommitment": self.commitment.as_str(),
                }]),
            )
            .await?;
        Signature::from_str(&signature)
            .map_err(|e| ClientError::InvalidResponse(format!("bad signature '{signature}': {e}")))
    }

    pub async fn get_signature_status(&self, signature: &Signature) -> Result<Option<SignatureStatus>> {
        let response: WithContext<Vec<Option<SignatureStatus>>> = self
            .call(
                "getSignatureStatuses",
                json!([[signature.to_string()], { "searchTransactionHistory": true }]),
            )
            .await?;
        Ok(response.value.into_iter().next().flatten())
    }

    /// Poll until the signature reaches the configured commitment.
    pub async fn confirm_transaction(&self, signature: &Signature) -> Result<()> {
        poll_confirmation(
            signature,
            self.commitment,
            self.confirm_attempts,
            self.confirm_interval,
            || self.get_signature_status(signature),
        )
        .await
    }
}

#[async_trait]
impl ProgramRpc for RpcClient {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<AccountInfo>> {
        self.get_account_info(address).await
    }

    async fn latest_blockhash(&self) -> Result<Hash> {
        self.get_latest_blockhash().await
    }

    async fn send_and_confirm(&self, tx: &Transaction) -> Result<Signature> {
        let signature = self.send_transaction(tx).await?;
        debug!(%signature, "transaction submitted");
        self.confirm_transaction(&signature).await?;
        Ok(signature)
    }
}
