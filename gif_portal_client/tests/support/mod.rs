//! In-memory stand-in for the cluster running the portal program.
//!
//! Verifies signatures and blockhash the way a node would, then applies
//! `initialize` / `add_gif` to its own account map.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use gif_portal_client::{AccountInfo, ClientError, FileWallet, ProgramRpc, Result, TrustList};
use gif_portal_core::{BASE_ACCOUNT_SPACE, BaseAccount, Instruction};
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::Transaction;

pub struct FakeProgram {
    program_id: Pubkey,
    blockhash: Hash,
    accounts: Mutex<HashMap<Pubkey, AccountInfo>>,
    sent: Mutex<Vec<Instruction>>,
    fail_reads: AtomicBool,
}

fn program_error(message: impl Into<String>) -> ClientError {
    ClientError::Rpc {
        code: -32002,
        message: message.into(),
    }
}

fn encode(state: &BaseAccount) -> Vec<u8> {
    let mut data = state.to_account_data().unwrap();
    data.resize(BASE_ACCOUNT_SPACE, 0);
    data
}

impl FakeProgram {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            blockhash: Hash::new_unique(),
            accounts: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            fail_reads: AtomicBool::new(false),
        }
    }

    /// Instructions that were applied, in order.
    pub fn sent(&self) -> Vec<Instruction> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn insert_account(&self, address: Pubkey, account: AccountInfo) {
        self.accounts.lock().unwrap().insert(address, account);
    }

    fn apply(&self, instruction: &Instruction, base: Pubkey, user: Pubkey) -> Result<()> {
        let mut accounts = self.accounts.lock().unwrap();
        match instruction {
            Instruction::Initialize => {
                if accounts.get(&base).is_some_and(|a| !a.data.is_empty()) {
                    return Err(program_error(format!("account {base} already in use")));
                }
                accounts.insert(
                    base,
                    AccountInfo {
                        lamports: 63_534_080,
                        owner: self.program_id,
                        data: encode(&BaseAccount::default()),
                        executable: false,
                    },
                );
            }
            Instruction::AddGif { gif_link } => {
                let account = accounts
                    .get_mut(&base)
                    .filter(|a| a.owner == self.program_id)
                    .ok_or_else(|| program_error("AccountNotInitialized"))?;
                let mut state = BaseAccount::try_from_account_data(&account.data)?;
                state.push(gif_link.clone(), user.to_bytes());
                account.data = encode(&state);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ProgramRpc for FakeProgram {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<AccountInfo>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ClientError::Rpc {
                code: -32005,
                message: "node is behind".into(),
            });
        }
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    async fn latest_blockhash(&self) -> Result<Hash> {
        Ok(self.blockhash)
    }

    async fn send_and_confirm(&self, tx: &Transaction) -> Result<Signature> {
        tx.verify()
            .map_err(|e| program_error(format!("signature verification failed: {e}")))?;
        if tx.message.recent_blockhash != self.blockhash {
            return Err(program_error("Blockhash not found"));
        }

        let keys = &tx.message.account_keys;
        for compiled in &tx.message.instructions {
            if keys[compiled.program_id_index as usize] != self.program_id {
                return Err(program_error("unexpected program"));
            }
            let instruction = Instruction::try_from_data(&compiled.data)?;
            let base = keys[compiled.accounts[0] as usize];
            let user = keys[compiled.accounts[1] as usize];
            self.apply(&instruction, base, user)?;
            self.sent.lock().unwrap().push(instruction);
        }
        Ok(tx.signatures[0])
    }
}

/// A wallet with a fresh key. When `trusted`, the key is already on the trust
/// list so a non-interactive connect succeeds.
pub fn wallet(dir: &Path, trusted: bool) -> (FileWallet, Pubkey) {
    let keypair = Keypair::new();
    let key = keypair.pubkey();
    let trust = TrustList::at(dir.join("id.json.trusted"));
    if trusted {
        trust.insert(&key).unwrap();
    }
    (FileWallet::new(Some(keypair), trust), key)
}
