// gif_portal_core: shared types for the GIF portal program client.
//
// The portal program is an Anchor program that keeps a single `BaseAccount`
// holding an append-only list of GIF links. This crate only knows the wire
// shapes: instruction data, account layout and the IDL. Building and sending
// transactions lives in gif_portal_client.

pub mod idl;

use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

pub use idl::{Idl, IdlError};

/// Length of the Anchor discriminator prefix on instruction and account data.
pub const DISCRIMINATOR_LEN: usize = 8;

/// Bytes the program allocates for the base account (`space = 9000`).
pub const BASE_ACCOUNT_SPACE: usize = 9000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("account data too short: {0} bytes")]
    TooShort(usize),

    #[error("discriminator mismatch: expected {expected}, found {found}")]
    Discriminator { expected: String, found: String },

    #[error("unknown instruction discriminator {0}")]
    UnknownInstruction(String),

    #[error("borsh decode failed: {0}")]
    Borsh(String),
}

/// Anchor sighash: first 8 bytes of `sha256("<namespace>:<name>")`.
pub fn sighash(namespace: &str, name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let digest = Sha256::digest(format!("{namespace}:{name}").as_bytes());
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
    out
}

// ---------------------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------------------

/// Instructions accepted by the GIF portal program.
///
/// Account ordering (matches the IDL):
///
/// | Instruction | Accounts in order                                      |
/// |-------------|--------------------------------------------------------|
/// | initialize  | base_account (mut, signer), user (mut, signer), system |
/// | add_gif     | base_account (mut), user (mut, signer)                 |
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Create the base account. Only valid once per base-account keypair.
    Initialize,

    /// Append a link; the signing user is recorded as its author.
    AddGif { gif_link: String },
}

impl Instruction {
    /// Rust-side method name, which is what Anchor hashes.
    pub fn method_name(&self) -> &'static str {
        match self {
            Instruction::Initialize => "initialize",
            Instruction::AddGif { .. } => "add_gif",
        }
    }

    pub fn discriminator(&self) -> [u8; DISCRIMINATOR_LEN] {
        sighash("global", self.method_name())
    }

    /// Encode as program instruction data: discriminator followed by borsh args.
    pub fn data(&self) -> Vec<u8> {
        let mut data = self.discriminator().to_vec();
        if let Instruction::AddGif { gif_link } = self {
            // borsh string: u32 LE length, then the UTF-8 bytes
            data.extend_from_slice(&(gif_link.len() as u32).to_le_bytes());
            data.extend_from_slice(gif_link.as_bytes());
        }
        data
    }

    /// Decode instruction data produced by [`Instruction::data`].
    pub fn try_from_data(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < DISCRIMINATOR_LEN {
            return Err(DecodeError::TooShort(data.len()));
        }
        let (disc, mut args) = data.split_at(DISCRIMINATOR_LEN);

        if disc == sighash("global", "initialize") {
            return Ok(Instruction::Initialize);
        }
        if disc == sighash("global", "add_gif") {
            let gif_link = String::deserialize(&mut args)
                .map_err(|e| DecodeError::Borsh(e.to_string()))?;
            return Ok(Instruction::AddGif { gif_link });
        }
        Err(DecodeError::UnknownInstruction(hex::encode(disc)))
    }
}

// ---------------------------------------------------------------------------
// Account state (stored on-chain in the base account)
// ---------------------------------------------------------------------------

/// One submitted link.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ItemStruct {
    pub gif_link: String,
    /// Public key of the submitting wallet.
    pub user_address: [u8; 32],
}

#[derive(Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct BaseAccount {
    pub total_gifs: u64,
    pub gif_list: Vec<ItemStruct>,
}

pub fn base_account_discriminator() -> [u8; DISCRIMINATOR_LEN] {
    sighash("account", "BaseAccount")
}

impl BaseAccount {
    /// Append a link the way the program does it.
    pub fn push(&mut self, gif_link: String, user_address: [u8; 32]) {
        self.gif_list.push(ItemStruct {
            gif_link,
            user_address,
        });
        self.total_gifs += 1;
    }

    /// Decode raw account data. Bytes past the encoded state are ignored,
    /// since the account is allocated at a fixed size.
    pub fn try_from_account_data(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < DISCRIMINATOR_LEN {
            return Err(DecodeError::TooShort(data.len()));
        }
        let (disc, mut body) = data.split_at(DISCRIMINATOR_LEN);
        let expected = base_account_discriminator();
        if disc != expected {
            return Err(DecodeError::Discriminator {
                expected: hex::encode(expected),
                found: hex::encode(disc),
            });
        }
        BaseAccount::deserialize(&mut body).map_err(|e| DecodeError::Borsh(e.to_string()))
    }

    /// Encode as account data (discriminator + borsh), without padding.
    pub fn to_account_data(&self) -> std::io::Result<Vec<u8>> {
        let mut data = base_account_discriminator().to_vec();
        self.serialize(&mut data)?;
        Ok(data)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
