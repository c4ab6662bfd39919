//! Client for the GIF portal program.
//!
//! Layers, leaves first:
//! - [`wallet`]: the capability provider that connects and signs.
//! - [`rpc`]: JSON-RPC transport behind the [`rpc::ProgramRpc`] seam.
//! - [`client`]: program calls against the fixed base account.
//! - [`app`]: view state and the [`app::Portal`] controller.
//! - [`view`]: text rendering of the view state.

pub mod app;
pub mod client;
pub mod config;
pub mod error;
pub mod keypair;
pub mod rpc;
pub mod view;
pub mod wallet;

pub use app::{AccountState, AppContext, Portal, Session, UiBranch};
pub use client::{Entry, FetchOutcome, GifPortalClient, InitOutcome};
pub use config::{Cluster, Commitment, PortalConfig};
pub use error::{ClientError, Result};
pub use rpc::{AccountInfo, ProgramRpc, RpcClient};
pub use wallet::{ConnectOptions, ConnectResponse, FileWallet, TrustList, WalletError, WalletProvider};
