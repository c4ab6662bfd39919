//! Portal flows against an in-memory program.
//!
//! Run with: `cargo test -p gif_portal_client --test portal_flow`

mod support;

use gif_portal_client::view::{CONNECT_PROMPT, INITIALIZE_PROMPT, render};
use gif_portal_client::{
    AccountState, ClientError, FileWallet, GifPortalClient, InitOutcome, Portal, TrustList,
    UiBranch,
};
use gif_portal_core::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use support::{FakeProgram, wallet};

const LINK: &str = "https://example.com/a.gif";

fn portal(wallet: FileWallet) -> Portal<FakeProgram, FileWallet> {
    let program_id = Pubkey::new_unique();
    let client = GifPortalClient::new(FakeProgram::new(program_id), program_id, Keypair::new());
    Portal::new(client, wallet)
}

#[tokio::test]
async fn test_no_provider_renders_connect() {
    let dir = tempfile::tempdir().unwrap();
    let mut portal = portal(FileWallet::new(None, TrustList::at(dir.path().join("t"))));

    portal.check_authorization().await;

    assert_eq!(portal.branch(), UiBranch::NotConnected);
    assert!(portal.context().session.wallet_address.is_none());
    assert!(render(portal.context()).contains(CONNECT_PROMPT));
}

#[tokio::test]
async fn test_untrusted_wallet_stays_disconnected() {
    let dir = tempfile::tempdir().unwrap();
    let (wallet, _) = wallet(dir.path(), false);
    let mut portal = portal(wallet);

    portal.check_authorization().await;

    assert_eq!(portal.branch(), UiBranch::NotConnected);
    assert!(portal.client().rpc().sent().is_empty());
}

#[tokio::test]
async fn test_trusted_connection_sets_session_and_fetches() {
    let dir = tempfile::tempdir().unwrap();
    let (wallet, key) = wallet(dir.path(), true);
    let mut portal = portal(wallet);

    portal.check_authorization().await;

    assert_eq!(portal.context().session.wallet_address, Some(key));
    // fresh ledger: the automatic fetch finds no account
    assert_eq!(portal.context().account, AccountState::Uninitialized);
    assert_eq!(portal.branch(), UiBranch::ConnectedUninitialized);
    assert!(render(portal.context()).contains(INITIALIZE_PROMPT));
}

#[tokio::test]
async fn test_interactive_connect_records_trust() {
    let dir = tempfile::tempdir().unwrap();
    let (wallet, key) = wallet(dir.path(), false);
    let mut first = portal(wallet.with_approver(|_| true));

    assert_eq!(first.request_authorization().await.unwrap(), key);
    assert_eq!(first.context().session.wallet_address, Some(key));
    assert!(first.wallet().trust_list().contains(&key).unwrap());
}

#[tokio::test]
async fn test_rejected_interactive_connect() {
    let dir = tempfile::tempdir().unwrap();
    let (wallet, _) = wallet(dir.path(), false);
    let mut portal = portal(wallet.with_approver(|_| false));

    assert!(portal.request_authorization().await.is_err());
    assert_eq!(portal.branch(), UiBranch::NotConnected);
}

#[tokio::test]
async fn test_empty_submit_issues_no_call() {
    let dir = tempfile::tempdir().unwrap();
    let (wallet, _) = wallet(dir.path(), true);
    let mut portal = portal(wallet);
    portal.check_authorization().await;
    portal.initialize_account().await.unwrap();
    let sent_before = portal.client().rpc().sent().len();

    assert_eq!(portal.append_entry("").await.unwrap(), None);

    assert_eq!(portal.client().rpc().sent().len(), sent_before);
    assert_eq!(portal.context().entries().unwrap().len(), 0);
}

#[tokio::test]
async fn test_append_while_ready_refetches_new_link() {
    let dir = tempfile::tempdir().unwrap();
    let (wallet, key) = wallet(dir.path(), true);
    let mut portal = portal(wallet);
    portal.check_authorization().await;

    let outcome = portal.initialize_account().await.unwrap();
    assert!(matches!(outcome, InitOutcome::Initialized(_)));
    assert_eq!(portal.branch(), UiBranch::ConnectedReady);

    portal.set_input(LINK);
    let signature = portal.submit().await.unwrap();
    assert!(signature.is_some());
    assert!(portal.context().input.is_empty());

    let appends: Vec<_> = portal
        .client()
        .rpc()
        .sent()
        .into_iter()
        .filter(|ix| matches!(ix, Instruction::AddGif { .. }))
        .collect();
    assert_eq!(
        appends,
        vec![Instruction::AddGif {
            gif_link: LINK.to_string()
        }]
    );

    let entries = portal.context().entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].gif_link, LINK);
    assert_eq!(entries[0].user_address, key);
    assert_eq!(portal.branch(), UiBranch::ConnectedReady);
    assert!(render(portal.context()).contains(LINK));
}

#[tokio::test]
async fn test_append_before_initialize_sends_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (wallet, _) = wallet(dir.path(), true);
    let mut portal = portal(wallet);
    portal.check_authorization().await;
    assert_eq!(portal.branch(), UiBranch::ConnectedUninitialized);

    let result = portal.append_entry(LINK).await;

    assert!(matches!(result, Err(ClientError::NotInitialized)));
    assert!(portal.client().rpc().sent().is_empty());
    assert_eq!(portal.context().input, LINK);
    assert_eq!(portal.context().account, AccountState::Uninitialized);
}

#[tokio::test]
async fn test_append_while_unreachable_sends_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (wallet, _) = wallet(dir.path(), true);
    let mut portal = portal(wallet);
    portal.client().rpc().fail_reads(true);
    portal.check_authorization().await;

    assert!(matches!(
        portal.append_entry(LINK).await,
        Err(ClientError::NotInitialized)
    ));
    assert!(portal.client().rpc().sent().is_empty());
    assert_eq!(portal.context().input, LINK);
}

#[tokio::test]
async fn test_fetch_failure_routes_to_initialize() {
    let dir = tempfile::tempdir().unwrap();
    let (wallet, _) = wallet(dir.path(), true);
    let mut portal = portal(wallet);
    portal.client().rpc().fail_reads(true);

    portal.check_authorization().await;

    assert!(matches!(
        portal.context().account,
        AccountState::Unreachable(_)
    ));
    assert_eq!(portal.branch(), UiBranch::ConnectedUninitialized);
    let text = render(portal.context());
    assert!(text.contains(INITIALIZE_PROMPT));
    assert!(text.contains("node is behind"));

    // initialize refuses to guess while the account state is unknown
    assert!(portal.initialize_account().await.is_err());
    assert!(portal.client().rpc().sent().is_empty());
}

#[tokio::test]
async fn test_initialize_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let (wallet, _) = wallet(dir.path(), true);
    let mut portal = portal(wallet);
    portal.check_authorization().await;

    portal.initialize_account().await.unwrap();
    let second = portal.initialize_account().await.unwrap();

    assert_eq!(second, InitOutcome::AlreadyInitialized);
    assert_eq!(portal.client().rpc().sent(), vec![Instruction::Initialize]);
}

#[tokio::test]
async fn test_actions_require_connection() {
    let dir = tempfile::tempdir().unwrap();
    let (wallet, _) = wallet(dir.path(), false);
    let mut portal = portal(wallet);

    assert!(portal.initialize_account().await.is_err());
    assert!(portal.append_entry(LINK).await.is_err());
    assert!(portal.client().rpc().sent().is_empty());
}
