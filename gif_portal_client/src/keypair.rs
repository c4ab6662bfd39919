//! Keypair files.
//!
//! Three encodings are accepted on load:
//! - a JSON array of 64 bytes (Solana CLI),
//! - the web3.js object form `{"_keypair": {"secretKey": {"0": .., "1": ..}}}`,
//! - a bare base58 secret key string (wallet export).
//!
//! Files are always written in the array form.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde_json::Value;
use solana_sdk::signature::Keypair;

use crate::error::{ClientError, Result};

const SECRET_KEY_LEN: usize = 64;

pub fn load_keypair(path: &Path) -> Result<Keypair> {
    let contents = fs::read_to_string(path).map_err(|e| ClientError::io(path, e))?;
    parse_keypair(&contents)
        .map_err(|e| ClientError::Keypair(format!("{}: {}", path.display(), e)))
}

pub fn parse_keypair(contents: &str) -> Result<Keypair> {
    let trimmed = contents.trim();
    let bytes = if trimmed.starts_with('[') || trimmed.starts_with('{') {
        let value: Value = serde_json::from_str(trimmed)
            .map_err(|e| ClientError::Keypair(format!("invalid JSON: {e}")))?;
        secret_from_json(&value)?
    } else {
        bs58::decode(trimmed)
            .into_vec()
            .map_err(|e| ClientError::Keypair(format!("invalid base58 secret: {e}")))?
    };
    keypair_from_secret(&bytes)
}

// `Keypair::from_bytes` is deprecated upstream in favor of `TryFrom`, which
// older 2.x releases lack.
#[allow(deprecated)]
fn keypair_from_secret(bytes: &[u8]) -> Result<Keypair> {
    if bytes.len() != SECRET_KEY_LEN {
        return Err(ClientError::Keypair(format!(
            "secret key must be {SECRET_KEY_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    Keypair::from_bytes(bytes).map_err(|e| ClientError::Keypair(e.to_string()))
}

fn secret_from_json(value: &Value) -> Result<Vec<u8>> {
    match value {
        Value::Array(items) => items.iter().map(json_byte).collect(),
        Value::Object(map) => {
            let secret = map
                .get("_keypair")
                .and_then(|k| k.get("secretKey"))
                .or_else(|| map.get("secretKey"))
                .ok_or_else(|| ClientError::Keypair("missing secretKey".into()))?;
            match secret {
                Value::Array(_) => secret_from_json(secret),
                // web3.js serializes a Uint8Array as {"0": n, "1": n, ...}
                Value::Object(indexed) => {
                    let mut bytes = vec![None; indexed.len()];
                    for (key, v) in indexed {
                        let idx: usize = key
                            .parse()
                            .map_err(|_| ClientError::Keypair(format!("bad secretKey index '{key}'")))?;
                        let slot = bytes.get_mut(idx).ok_or_else(|| {
                            ClientError::Keypair(format!("secretKey index {idx} out of range"))
                        })?;
                        *slot = Some(json_byte(v)?);
                    }
                    bytes
                        .into_iter()
                        .collect::<Option<Vec<u8>>>()
                        .ok_or_else(|| ClientError::Keypair("secretKey has gaps".into()))
                }
                _ => Err(ClientError::Keypair("secretKey must be an array or object".into())),
            }
        }
        _ => Err(ClientError::Keypair("unsupported keypair JSON".into())),
    }
}

fn json_byte(v: &Value) -> Result<u8> {
    v.as_u64()
        .and_then(|n| u8::try_from(n).ok())
        .ok_or_else(|| ClientError::Keypair(format!("not a byte: {v}")))
}

/// Write `keypair` as a JSON byte array. Refuses to replace an existing file
/// unless `force` is set.
pub fn write_keypair(path: &Path, keypair: &Keypair, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(ClientError::Keypair(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ClientError::io(parent, e))?;
    }
    let json = serde_json::to_string(&keypair.to_bytes().to_vec())
        .map_err(|e| ClientError::Serialization(e.to_string()))?;
    let mut file = fs::File::create(path).map_err(|e| ClientError::io(path, e))?;
    file.write_all(json.as_bytes())
        .map_err(|e| ClientError::io(path, e))?;
    Ok(())
}
