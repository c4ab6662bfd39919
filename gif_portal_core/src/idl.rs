//! Anchor IDL for the portal program.
//!
//! The IDL is the interface description the client binds to: it supplies the
//! program address and the account layout of each instruction. The client
//! refuses to bind to an IDL whose layout differs from what it encodes.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// IDL shipped with the client, pointing at the default deployment.
pub const DEFAULT_IDL_JSON: &str = include_str!("../idl/gif_portal.json");

#[derive(Debug, Error)]
pub enum IdlError {
    #[error("failed to read IDL {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid IDL JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IDL has no metadata.address")]
    MissingAddress,

    #[error("IDL is missing instruction '{0}'")]
    MissingInstruction(&'static str),

    #[error("IDL is missing account type '{0}'")]
    MissingAccount(&'static str),

    #[error("IDL layout mismatch in '{name}': {detail}")]
    Layout { name: String, detail: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Idl {
    pub version: String,
    pub name: String,
    pub instructions: Vec<IdlInstruction>,
    #[serde(default)]
    pub accounts: Vec<IdlTypeDef>,
    #[serde(default)]
    pub types: Vec<IdlTypeDef>,
    #[serde(default)]
    pub metadata: Option<IdlMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlInstruction {
    pub name: String,
    pub accounts: Vec<IdlAccountItem>,
    #[serde(default)]
    pub args: Vec<IdlField>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlAccountItem {
    pub name: String,
    #[serde(rename = "isMut")]
    pub is_mut: bool,
    #[serde(rename = "isSigner")]
    pub is_signer: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlTypeDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlMetadata {
    pub address: String,
}

/// (name, is_mut, is_signer) for each account the client passes.
type AccountLayout = &'static [(&'static str, bool, bool)];

const INITIALIZE_ACCOUNTS: AccountLayout = &[
    ("baseAccount", true, true),
    ("user", true, true),
    ("systemProgram", false, false),
];

const ADD_GIF_ACCOUNTS: AccountLayout = &[("baseAccount", true, false), ("user", true, true)];

const BASE_ACCOUNT_FIELDS: &[&str] = &["totalGifs", "gifList"];

impl Idl {
    pub fn from_json(json: &str) -> Result<Self, IdlError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, IdlError> {
        let json = std::fs::read_to_string(path).map_err(|source| IdlError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// The IDL embedded in this crate.
    pub fn bundled() -> Result<Self, IdlError> {
        Self::from_json(DEFAULT_IDL_JSON)
    }

    /// Program address (base58) from `metadata.address`.
    pub fn program_address(&self) -> Result<&str, IdlError> {
        self.metadata
            .as_ref()
            .map(|m| m.address.as_str())
            .filter(|a| !a.is_empty())
            .ok_or(IdlError::MissingAddress)
    }

    pub fn instruction(&self, name: &str) -> Option<&IdlInstruction> {
        self.instructions.iter().find(|ix| ix.name == name)
    }

    pub fn account(&self, name: &str) -> Option<&IdlTypeDef> {
        self.accounts.iter().find(|a| a.name == name)
    }

    /// Check that the IDL describes the instructions and account the client
    /// encodes, with the same account ordering and flags.
    pub fn validate(&self) -> Result<(), IdlError> {
        let initialize = self
            .instruction("initialize")
            .ok_or(IdlError::MissingInstruction("initialize"))?;
        check_accounts(initialize, INITIALIZE_ACCOUNTS)?;
        if !initialize.args.is_empty() {
            return Err(IdlError::Layout {
                name: initialize.name.clone(),
                detail: format!("expected no args, found {}", initialize.args.len()),
            });
        }

        let add_gif = self
            .instruction("addGif")
            .ok_or(IdlError::MissingInstruction("addGif"))?;
        check_accounts(add_gif, ADD_GIF_ACCOUNTS)?;
        match add_gif.args.as_slice() {
            [arg] if arg.ty == Value::String("string".into()) => {}
            other => {
                return Err(IdlError::Layout {
                    name: add_gif.name.clone(),
                    detail: format!("expected a single string arg, found {} args", other.len()),
                });
            }
        }

        let base = self
            .account("BaseAccount")
            .ok_or(IdlError::MissingAccount("BaseAccount"))?;
        let fields: Vec<&str> = base.ty["fields"]
            .as_array()
            .map(|f| f.iter().filter_map(|f| f["name"].as_str()).collect())
            .unwrap_or_default();
        if fields != BASE_ACCOUNT_FIELDS {
            return Err(IdlError::Layout {
                name: base.name.clone(),
                detail: format!("expected fields {:?}, found {:?}", BASE_ACCOUNT_FIELDS, fields),
            });
        }
        Ok(())
    }
}

fn check_accounts(ix: &IdlInstruction, expected: AccountLayout) -> Result<(), IdlError> {
    let found: Vec<(&str, bool, bool)> = ix
        .accounts
        .iter()
        .map(|a| (a.name.as_str(), a.is_mut, a.is_signer))
        .collect();
    if found.as_slice() != expected {
        return Err(IdlError::Layout {
            name: ix.name.clone(),
            detail: format!("expected accounts {:?}, found {:?}", expected, found),
        });
    }
    Ok(())
}
