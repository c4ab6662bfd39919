use std::path::PathBuf;

use gif_portal_core::{DecodeError, IdlError};
use thiserror::Error;

use crate::wallet::WalletError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("invalid rpc response: {0}")]
    InvalidResponse(String),

    #[error("account decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Idl(#[from] IdlError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error("keypair error: {0}")]
    Keypair(String),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Config(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("transaction {signature} failed: {reason}")]
    TransactionFailed { signature: String, reason: String },

    #[error("transaction {signature} not confirmed after {attempts} attempts")]
    NotConfirmed { signature: String, attempts: u32 },

    #[error("base account state unavailable: {0}")]
    Unavailable(String),

    #[error("base account is not initialized, run initialize first")]
    NotInitialized,

    #[error("gif link is empty")]
    EmptyLink,

    #[error("wallet not connected")]
    NotConnected,
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ClientError::Io {
            path: path.into(),
            source,
        }
    }
}
