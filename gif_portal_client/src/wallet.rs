//! Wallet capability provider.
//!
//! The portal never holds the user's key directly; it asks a provider to
//! connect and to sign. `FileWallet` is the provider backed by a local keypair
//! file plus a trust list of keys the user already approved, so a later
//! non-interactive `connect` can succeed without prompting.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::Transaction;
use thiserror::Error;
use tracing::{debug, info};

use crate::error::Result;
use crate::keypair::load_keypair;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("no wallet provider found")]
    NotFound,

    #[error("wallet {0} has not been approved yet")]
    NotTrusted(Pubkey),

    #[error("connection request rejected")]
    Rejected,

    #[error("wallet not connected")]
    NotConnected,

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("trust list {path}: {reason}")]
    TrustList { path: String, reason: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Succeed only if the user approved this app before; never prompt.
    pub only_if_trusted: bool,
}

impl ConnectOptions {
    pub fn trusted() -> Self {
        Self {
            only_if_trusted: true,
        }
    }

    pub fn interactive() -> Self {
        Self {
            only_if_trusted: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectResponse {
    pub public_key: Pubkey,
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Whether a provider is present at all.
    fn is_available(&self) -> bool;

    async fn connect(
        &self,
        options: ConnectOptions,
    ) -> std::result::Result<ConnectResponse, WalletError>;

    /// Key of the connected wallet, `None` before a successful `connect`.
    fn public_key(&self) -> Option<Pubkey>;

    /// Add the wallet's signature to `tx` for `recent_blockhash`.
    async fn sign_transaction(
        &self,
        tx: &mut Transaction,
        recent_blockhash: Hash,
    ) -> std::result::Result<(), WalletError>;
}

// ---------------------------------------------------------------------------
// Trust list
// ---------------------------------------------------------------------------

/// Keys the user approved, one base58 key per line.
#[derive(Debug, Clone)]
pub struct TrustList {
    path: PathBuf,
}

impl TrustList {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn error(&self, reason: impl ToString) -> WalletError {
        WalletError::TrustList {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn load(&self) -> std::result::Result<HashSet<Pubkey>, WalletError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(e) => return Err(self.error(e)),
        };
        contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| Pubkey::from_str(l).map_err(|e| self.error(format!("bad key '{l}': {e}"))))
            .collect()
    }

    pub fn contains(&self, key: &Pubkey) -> std::result::Result<bool, WalletError> {
        Ok(self.load()?.contains(key))
    }

    pub fn insert(&self, key: &Pubkey) -> std::result::Result<(), WalletError> {
        if self.contains(key)? {
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.error(e))?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.error(e))?;
        writeln!(file, "{key}").map_err(|e| self.error(e))
    }
}

// ---------------------------------------------------------------------------
// File-backed provider
// ---------------------------------------------------------------------------

/// Decides an interactive connection request for the given key.
pub type Approver = Box<dyn Fn(&Pubkey) -> bool + Send + Sync>;

pub struct FileWallet {
    keypair: Option<Keypair>,
    trust: TrustList,
    approver: Approver,
    connected: AtomicBool,
}

impl FileWallet {
    /// A provider around an in-memory key; `None` models an absent provider.
    /// Interactive requests are rejected until an approver is set.
    pub fn new(keypair: Option<Keypair>, trust: TrustList) -> Self {
        Self {
            keypair,
            trust,
            approver: Box::new(|_| false),
            connected: AtomicBool::new(false),
        }
    }

    /// Open the keypair at `keypair_path`. A missing file means no provider;
    /// a malformed one is an error.
    pub fn open(keypair_path: &Path, trust_path: &Path) -> Result<Self> {
        let keypair = if keypair_path.exists() {
            Some(load_keypair(keypair_path)?)
        } else {
            debug!(path = %keypair_path.display(), "wallet keypair not found");
            None
        };
        Ok(Self::new(keypair, TrustList::at(trust_path)))
    }

    pub fn with_approver<F>(mut self, approver: F) -> Self
    where
        F: Fn(&Pubkey) -> bool + Send + Sync + 'static,
    {
        self.approver = Box::new(approver);
        self
    }

    pub fn trust_list(&self) -> &TrustList {
        &self.trust
    }
}

#[async_trait]
impl WalletProvider for FileWallet {
    fn is_available(&self) -> bool {
        self.keypair.is_some()
    }

    async fn connect(
        &self,
        options: ConnectOptions,
    ) -> std::result::Result<ConnectResponse, WalletError> {
        let keypair = self.keypair.as_ref().ok_or(WalletError::NotFound)?;
        let public_key = keypair.pubkey();

        if !self.trust.contains(&public_key)? {
            if options.only_if_trusted {
                return Err(WalletError::NotTrusted(public_key));
            }
            if !(self.approver)(&public_key) {
                return Err(WalletError::Rejected);
            }
            self.trust.insert(&public_key)?;
            info!(%public_key, "wallet approved");
        }

        self.connected.store(true, Ordering::SeqCst);
        Ok(ConnectResponse { public_key })
    }

    fn public_key(&self) -> Option<Pubkey> {
        match &self.keypair {
            Some(kp) if self.connected.load(Ordering::SeqCst) => Some(kp.pubkey()),
            _ => None,
        }
    }

    async fn sign_transaction(
        &self,
        tx: &mut Transaction,
        recent_blockhash: Hash,
    ) -> std::result::Result<(), WalletError> {
        let keypair = match &self.keypair {
            Some(kp) if self.connected.load(Ordering::SeqCst) => kp,
            Some(_) => return Err(WalletError::NotConnected),
            None => return Err(WalletError::NotFound),
        };
        tx.try_partial_sign(&[keypair], recent_blockhash)
            .map_err(|e| WalletError::Signing(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::instruction::{AccountMeta, Instruction};

    fn wallet_in(dir: &Path) -> (FileWallet, Pubkey) {
        let keypair = Keypair::new();
        let key = keypair.pubkey();
        let wallet = FileWallet::new(Some(keypair), TrustList::at(dir.join("id.json.trusted")));
        (wallet, key)
    }

    #[tokio::test]
    async fn test_absent_provider() {
        let dir = tempfile::tempdir().unwrap();
        let wallet = FileWallet::open(&dir.path().join("missing.json"), &dir.path().join("t"))
            .unwrap();
        assert!(!wallet.is_available());
        assert!(matches!(
            wallet.connect(ConnectOptions::trusted()).await,
            Err(WalletError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_trusted_connect_requires_prior_approval() {
        let dir = tempfile::tempdir().unwrap();
        let (wallet, key) = wallet_in(dir.path());

        assert!(matches!(
            wallet.connect(ConnectOptions::trusted()).await,
            Err(WalletError::NotTrusted(k)) if k == key
        ));
        assert!(wallet.public_key().is_none());

        // default approver declines
        assert!(matches!(
            wallet.connect(ConnectOptions::interactive()).await,
            Err(WalletError::Rejected)
        ));

        let wallet = wallet.with_approver(|_| true);
        let response = wallet.connect(ConnectOptions::interactive()).await.unwrap();
        assert_eq!(response.public_key, key);
        assert!(wallet.trust_list().contains(&key).unwrap());

        let response = wallet.connect(ConnectOptions::trusted()).await.unwrap();
        assert_eq!(response.public_key, key);
        assert_eq!(wallet.public_key(), Some(key));
    }

    #[tokio::test]
    async fn test_sign_requires_connection() {
        let dir = tempfile::tempdir().unwrap();
        let (wallet, key) = wallet_in(dir.path());
        let wallet = wallet.with_approver(|_| true);

        let ix = Instruction {
            program_id: Pubkey::new_unique(),
            accounts: vec![AccountMeta::new(key, true)],
            data: vec![],
        };
        let mut tx = Transaction::new_with_payer(&[ix], Some(&key));
        let blockhash = Hash::new_unique();

        assert!(matches!(
            wallet.sign_transaction(&mut tx, blockhash).await,
            Err(WalletError::NotConnected)
        ));

        wallet.connect(ConnectOptions::interactive()).await.unwrap();
        wallet.sign_transaction(&mut tx, blockhash).await.unwrap();
        assert!(tx.is_signed());
        assert!(tx.verify().is_ok());
    }

    #[test]
    fn test_trust_list_insert_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let trust = TrustList::at(dir.path().join("trusted"));
        let key = Pubkey::new_unique();
        trust.insert(&key).unwrap();
        trust.insert(&key).unwrap();
        let contents = fs::read_to_string(trust.path()).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(trust.load().unwrap().contains(&key));
    }
}
