//! Remote account client: binds an RPC endpoint to the portal program and the
//! fixed base account, and turns the three program operations into calls.

use std::fmt;

use gif_portal_core::{BaseAccount, Idl, Instruction as ProgramInstruction};
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk_ids::system_program;
use solana_sdk::transaction::Transaction;
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};
use crate::rpc::ProgramRpc;
use crate::wallet::WalletProvider;

/// One link as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub gif_link: String,
    pub user_address: Pubkey,
}

/// Result of reading the base account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success(Vec<Entry>),
    /// The account does not exist (or holds no data) yet.
    NotFound,
    /// The read failed or returned something that is not a base account.
    TransientError(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    Initialized(Signature),
    /// The account already existed; nothing was sent.
    AlreadyInitialized,
}

impl fmt::Display for InitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitOutcome::Initialized(sig) => write!(f, "initialized ({sig})"),
            InitOutcome::AlreadyInitialized => f.write_str("already initialized"),
        }
    }
}

pub struct GifPortalClient<R> {
    rpc: R,
    program_id: Pubkey,
    base_account: Keypair,
}

impl<R: ProgramRpc> GifPortalClient<R> {
    pub fn new(rpc: R, program_id: Pubkey, base_account: Keypair) -> Self {
        Self {
            rpc,
            program_id,
            base_account,
        }
    }

    /// Bind to `program_id` after checking that `idl` describes the layout
    /// this client encodes.
    pub fn bind(rpc: R, idl: &Idl, program_id: Pubkey, base_account: Keypair) -> Result<Self> {
        idl.validate()?;
        debug!(program = %program_id, idl = %idl.name, "bound to program");
        Ok(Self::new(rpc, program_id, base_account))
    }

    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    pub fn base_account_address(&self) -> Pubkey {
        self.base_account.pubkey()
    }

    pub fn initialize_instruction(&self, user: &Pubkey) -> Instruction {
        Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new(self.base_account.pubkey(), true),
                AccountMeta::new(*user, true),
                AccountMeta::new_readonly(system_program::ID, false),
            ],
            data: ProgramInstruction::Initialize.data(),
        }
    }

    pub fn add_gif_instruction(&self, user: &Pubkey, gif_link: &str) -> Instruction {
        Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new(self.base_account.pubkey(), false),
                AccountMeta::new(*user, true),
            ],
            data: ProgramInstruction::AddGif {
                gif_link: gif_link.to_string(),
            }
            .data(),
        }
    }

    /// Read the full entry list.
    pub async fn fetch_entries(&self) -> FetchOutcome {
        let address = self.base_account.pubkey();
        let account = match self.rpc.get_account(&address).await {
            Ok(Some(account)) if !account.data.is_empty() => account,
            Ok(_) => {
                debug!(%address, "base account not found");
                return FetchOutcome::NotFound;
            }
            Err(e) => {
                warn!(%address, error = %e, "failed to fetch base account");
                return FetchOutcome::TransientError(e.to_string());
            }
        };

        if account.owner != self.program_id {
            let reason = format!(
                "account {address} is owned by {}, expected {}",
                account.owner, self.program_id
            );
            warn!("{reason}");
            return FetchOutcome::TransientError(reason);
        }

        match BaseAccount::try_from_account_data(&account.data) {
            Ok(state) => {
                debug!(%address, total = state.total_gifs, "fetched base account");
                FetchOutcome::Success(
                    state
                        .gif_list
                        .into_iter()
                        .map(|item| Entry {
                            gif_link: item.gif_link,
                            user_address: Pubkey::new_from_array(item.user_address),
                        })
                        .collect(),
                )
            }
            Err(e) => {
                warn!(%address, error = %e, "base account data did not decode");
                FetchOutcome::TransientError(e.to_string())
            }
        }
    }

    /// Create the base account, unless it already exists.
    pub async fn initialize(&self, wallet: &dyn WalletProvider) -> Result<InitOutcome> {
        match self.fetch_entries().await {
            FetchOutcome::Success(_) => {
                info!(address = %self.base_account.pubkey(), "base account already initialized");
                return Ok(InitOutcome::AlreadyInitialized);
            }
            FetchOutcome::TransientError(reason) => return Err(ClientError::Unavailable(reason)),
            FetchOutcome::NotFound => {}
        }

        let user = wallet.public_key().ok_or(ClientError::NotConnected)?;
        let signature = self
            .submit(wallet, self.initialize_instruction(&user), true)
            .await?;
        info!(address = %self.base_account.pubkey(), %signature, "created base account");
        Ok(InitOutcome::Initialized(signature))
    }

    /// Append `gif_link` with the connected wallet as author.
    pub async fn add_gif(&self, wallet: &dyn WalletProvider, gif_link: &str) -> Result<Signature> {
        if gif_link.is_empty() {
            return Err(ClientError::EmptyLink);
        }
        let user = wallet.public_key().ok_or(ClientError::NotConnected)?;
        let signature = self
            .submit(wallet, self.add_gif_instruction(&user, gif_link), false)
            .await?;
        info!(%signature, gif_link, "gif sent to the program");
        Ok(signature)
    }

    async fn submit(
        &self,
        wallet: &dyn WalletProvider,
        instruction: Instruction,
        base_account_signs: bool,
    ) -> Result<Signature> {
        let payer = wallet.public_key().ok_or(ClientError::NotConnected)?;
        let blockhash = self.rpc.latest_blockhash().await?;

        let mut tx = Transaction::new_with_payer(&[instruction], Some(&payer));
        if base_account_signs {
            tx.try_partial_sign(&[&self.base_account], blockhash)
                .map_err(|e| ClientError::Keypair(format!("base account signing failed: {e}")))?;
        }
        wallet.sign_transaction(&mut tx, blockhash).await?;

        self.rpc.send_and_confirm(&tx).await
    }
}
