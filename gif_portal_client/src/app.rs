//! View state and the controller that drives it.
//!
//! `Portal` is the single composition root: it owns the application context
//! together with the remote client and the wallet provider, and every state
//! change goes through one of its methods.

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use tracing::{info, warn};

use crate::client::{Entry, FetchOutcome, GifPortalClient, InitOutcome};
use crate::error::{ClientError, Result};
use crate::rpc::ProgramRpc;
use crate::wallet::{ConnectOptions, WalletProvider};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub wallet_address: Option<Pubkey>,
}

/// What the portal knows about the base account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AccountState {
    /// Not fetched yet.
    #[default]
    Unknown,
    /// The account does not exist; it needs the one-time initialize.
    Uninitialized,
    /// The last fetch failed for a reason other than a missing account.
    Unreachable(String),
    Ready(Vec<Entry>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiBranch {
    NotConnected,
    ConnectedUnknown,
    ConnectedUninitialized,
    ConnectedReady,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppContext {
    pub session: Session,
    /// Pending link text, not yet submitted.
    pub input: String,
    pub account: AccountState,
}

impl AppContext {
    pub fn branch(&self) -> UiBranch {
        if self.session.wallet_address.is_none() {
            return UiBranch::NotConnected;
        }
        match self.account {
            AccountState::Unknown => UiBranch::ConnectedUnknown,
            AccountState::Uninitialized | AccountState::Unreachable(_) => {
                UiBranch::ConnectedUninitialized
            }
            AccountState::Ready(_) => UiBranch::ConnectedReady,
        }
    }

    pub fn entries(&self) -> Option<&[Entry]> {
        match &self.account {
            AccountState::Ready(entries) => Some(entries),
            _ => None,
        }
    }
}

pub struct Portal<R, W> {
    context: AppContext,
    client: GifPortalClient<R>,
    wallet: W,
}

impl<R: ProgramRpc, W: WalletProvider> Portal<R, W> {
    pub fn new(client: GifPortalClient<R>, wallet: W) -> Self {
        Self {
            context: AppContext::default(),
            client,
            wallet,
        }
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub fn branch(&self) -> UiBranch {
        self.context.branch()
    }

    pub fn client(&self) -> &GifPortalClient<R> {
        &self.client
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    /// Non-interactive connect. Absence of a provider or a refusal leaves the
    /// session empty and is only logged.
    pub async fn check_authorization(&mut self) {
        if !self.wallet.is_available() {
            warn!("wallet provider not found, get a wallet keypair first");
            return;
        }
        match self.wallet.connect(ConnectOptions::trusted()).await {
            Ok(response) => {
                info!(public_key = %response.public_key, "connected with public key");
                self.on_connected(response.public_key).await;
            }
            Err(e) => warn!(error = %e, "trusted wallet connection unavailable"),
        }
    }

    /// Interactive connect: always asks the provider.
    pub async fn request_authorization(&mut self) -> Result<Pubkey> {
        let response = self.wallet.connect(ConnectOptions::interactive()).await?;
        info!(public_key = %response.public_key, "connected with public key");
        self.on_connected(response.public_key).await;
        Ok(response.public_key)
    }

    async fn on_connected(&mut self, public_key: Pubkey) {
        self.context.session.wallet_address = Some(public_key);
        self.context.account = AccountState::Unknown;
        self.refresh().await;
    }

    /// Re-read the base account and update the account state.
    pub async fn refresh(&mut self) -> &AccountState {
        self.context.account = match self.client.fetch_entries().await {
            FetchOutcome::Success(entries) => AccountState::Ready(entries),
            FetchOutcome::NotFound => AccountState::Uninitialized,
            FetchOutcome::TransientError(reason) => AccountState::Unreachable(reason),
        };
        &self.context.account
    }

    /// One-time creation of the base account, then a re-fetch.
    pub async fn initialize_account(&mut self) -> Result<InitOutcome> {
        if self.context.session.wallet_address.is_none() {
            return Err(ClientError::NotConnected);
        }
        let outcome = self
            .client
            .initialize(&self.wallet)
            .await
            .inspect_err(|e| warn!(error = %e, "error creating base account"))?;
        self.refresh().await;
        Ok(outcome)
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.context.input = text.into();
    }

    /// Submit the pending input. Empty input is dropped with a log line and
    /// `Ok(None)`. Appends need a ready base account; otherwise the input is
    /// kept and nothing is sent. The input is cleared before the remote call.
    pub async fn submit(&mut self) -> Result<Option<Signature>> {
        if self.context.input.is_empty() {
            info!("no gif link given");
            return Ok(None);
        }
        if self.context.session.wallet_address.is_none() {
            return Err(ClientError::NotConnected);
        }
        if !matches!(self.context.account, AccountState::Ready(_)) {
            warn!(state = ?self.context.account, "gif link held back, base account not ready");
            return Err(ClientError::NotInitialized);
        }

        let link = std::mem::take(&mut self.context.input);
        info!(gif_link = %link, "submitting gif link");
        let signature = self
            .client
            .add_gif(&self.wallet, &link)
            .await
            .inspect_err(|e| warn!(error = %e, "error sending gif"))?;
        self.refresh().await;
        Ok(Some(signature))
    }

    /// `set_input` followed by `submit`.
    pub async fn append_entry(&mut self, link: &str) -> Result<Option<Signature>> {
        self.set_input(link);
        self.submit().await
    }
}
