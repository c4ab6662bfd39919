use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use gif_portal_client::config::{DEFAULT_BASE_ACCOUNT_PATH, resolve_program_id, trust_path_for};
use gif_portal_client::keypair::{load_keypair, write_keypair};
use gif_portal_client::view::render;
use gif_portal_client::{
    AccountState, ClientError, Cluster, FileWallet, GifPortalClient, InitOutcome, Portal,
    PortalConfig, RpcClient, UiBranch,
};
use gif_portal_core::Idl;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// GIF Portal CLI: view and grow an on-chain GIF collection
///
/// Flow:
///   1. gif-portal keygen        (once: base account keypair)
///   2. gif-portal connect       (approve your wallet)
///   3. gif-portal init          (one-time account creation)
///   4. gif-portal add <link>  /  gif-portal list
#[derive(Parser)]
#[command(name = "gif-portal", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// RPC URL or cluster moniker (devnet, testnet, mainnet-beta, localnet)
    #[arg(long, short = 'u', env = "GIF_PORTAL_RPC_URL", default_value = "devnet", global = true)]
    url: String,

    /// Commitment for reads and preflight (processed, confirmed, finalized)
    #[arg(long, env = "GIF_PORTAL_COMMITMENT", default_value = "processed", global = true)]
    commitment: String,

    /// Program IDL JSON (defaults to the bundled IDL)
    #[arg(long, env = "GIF_PORTAL_IDL", global = true)]
    idl: Option<PathBuf>,

    /// Program id (base58); defaults to the IDL's metadata.address
    #[arg(long, env = "GIF_PORTAL_PROGRAM_ID", global = true)]
    program_id: Option<String>,

    /// Base account keypair file
    #[arg(
        long,
        short = 'b',
        env = "GIF_PORTAL_BASE_ACCOUNT",
        default_value = DEFAULT_BASE_ACCOUNT_PATH,
        global = true
    )]
    base_account: PathBuf,

    /// Wallet keypair file (defaults to ~/.config/solana/id.json)
    #[arg(long, short = 'w', env = "GIF_PORTAL_WALLET", global = true)]
    wallet: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show configuration, wallet balance and the portal view (never prompts)
    Status,

    /// Connect the wallet, asking for approval if needed
    Connect,

    /// Create the base account (one time)
    Init,

    /// Add a GIF link
    Add {
        /// Link to the GIF
        link: String,
    },

    /// Print all GIF links, one per line: <link> TAB <submitter>
    List,

    /// Interactive session over the portal view
    Shell,

    /// Create a base account keypair
    Keygen {
        /// Output path (defaults to --base-account)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate for
        #[arg(value_enum)]
        shell: Shell,
    },
}

type CliPortal = Portal<RpcClient, FileWallet>;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn build_config(global: &GlobalArgs) -> Result<(PortalConfig, Idl)> {
    let idl = match &global.idl {
        Some(path) => Idl::from_file(path)?,
        None => Idl::bundled()?,
    };
    let cluster: Cluster = global.url.parse()?;
    let program_id = resolve_program_id(&idl, global.program_id.as_deref())?;

    let mut config = PortalConfig::new(cluster, program_id);
    config.commitment = global.commitment.parse()?;
    config.base_account_path = global.base_account.clone();
    if let Some(wallet) = &global.wallet {
        config.trust_path = trust_path_for(wallet);
        config.wallet_path = wallet.clone();
    }
    debug!(
        rpc = config.rpc_url(),
        program = %config.program_id,
        base_account = %config.base_account_path.display(),
        "configuration resolved"
    );
    Ok((config, idl))
}

/// Ask on `output` whether `key` may connect; only "y" or "yes" approves.
fn prompt_approval(key: &Pubkey, mut input: impl BufRead, mut output: impl Write) -> bool {
    if write!(output, "🔑 Connect wallet {key} to GIF Portal? [y/N] ").is_err()
        || output.flush().is_err()
    {
        return false;
    }
    let mut answer = String::new();
    if input.read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Wrap a blocking approver so it runs without stalling the runtime's workers.
fn off_runtime<F>(approve: F) -> impl Fn(&Pubkey) -> bool + Send + Sync + 'static
where
    F: Fn(&Pubkey) -> bool + Send + Sync + 'static,
{
    move |key: &Pubkey| tokio::task::block_in_place(|| approve(key))
}

fn open_portal(global: &GlobalArgs) -> Result<(PortalConfig, CliPortal)> {
    let (config, idl) = build_config(global)?;
    let base_account = load_keypair(&config.base_account_path).with_context(|| {
        format!(
            "cannot load base account keypair '{}'\n  Create one first:  gif-portal keygen\n  Or set path:       --base-account <path> or GIF_PORTAL_BASE_ACCOUNT=<path>",
            config.base_account_path.display()
        )
    })?;
    let rpc = RpcClient::from_config(&config)?;
    let client = GifPortalClient::bind(rpc, &idl, config.program_id, base_account)?;
    let wallet = FileWallet::open(&config.wallet_path, &config.trust_path)?.with_approver(
        off_runtime(|key| prompt_approval(key, io::stdin().lock(), io::stdout())),
    );
    Ok((config, Portal::new(client, wallet)))
}

fn keygen(path: &Path, force: bool) -> Result<Keypair> {
    let keypair = Keypair::new();
    write_keypair(path, &keypair, force)?;
    Ok(keypair)
}

async fn require_connection(portal: &mut CliPortal) -> Result<()> {
    portal.check_authorization().await;
    if portal.branch() == UiBranch::NotConnected {
        bail!("wallet not connected, run `gif-portal connect` first");
    }
    Ok(())
}

/// Why the base account cannot be listed or appended to yet.
fn not_ready(account: &AccountState) -> anyhow::Error {
    match account {
        AccountState::Unreachable(reason) => anyhow!("could not load the GIF account: {reason}"),
        _ => anyhow!("base account not initialized, run `gif-portal init` first"),
    }
}

fn report_submit(signature: Option<Signature>) {
    match signature {
        Some(sig) => {
            println!("📤 GIF sent to the program");
            println!("   signature: {sig}");
        }
        None => println!("ℹ️  No gif link given, nothing sent"),
    }
}

fn print_shell_help() {
    println!("Commands:");
    println!("  connect        approve and connect the wallet");
    println!("  init           one-time base account creation");
    println!("  add <link>     add a GIF (a bare http(s) link works too)");
    println!("  refresh        re-fetch the GIF list");
    println!("  quit           leave");
}

/// Next stdin line, read on the blocking pool; `None` at end of input.
async fn read_line() -> Result<Option<String>> {
    let line = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .map(|n| (n > 0).then_some(line))
    })
    .await??;
    Ok(line)
}

async fn run_shell(portal: &mut CliPortal) -> Result<()> {
    portal.check_authorization().await;

    loop {
        print!("{}", render(portal.context()));
        print!("gif-portal> ");
        io::stdout().flush()?;

        let Some(line) = read_line().await? else {
            break;
        };
        let line = line.trim();
        let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));

        let result = match cmd {
            "" => Ok(()),
            "quit" | "exit" | "q" => break,
            "help" | "?" => {
                print_shell_help();
                Ok(())
            }
            "connect" => portal
                .request_authorization()
                .await
                .map(|key| println!("✅ Connected with public key: {key}")),
            "refresh" => {
                portal.refresh().await;
                Ok(())
            }
            "init" => portal
                .initialize_account()
                .await
                .map(|outcome| println!("✅ Base account {outcome}")),
            "add" => portal.append_entry(rest.trim()).await.map(report_submit),
            _ if line.starts_with("http://") || line.starts_with("https://") => {
                portal.append_entry(line).await.map(report_submit)
            }
            other => {
                println!("unknown command '{other}', try `help`");
                Ok(())
            }
        };
        if let Err(e) = result {
            eprintln!("❌ {e}");
        }
        println!();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        // ── Completions ─────────────────────────────────────────────────
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "gif-portal", &mut io::stdout());
        }

        // ── Keygen ──────────────────────────────────────────────────────
        Commands::Keygen { out, force } => {
            let path = out.unwrap_or(cli.global.base_account);
            let keypair = keygen(&path, force)?;
            println!("🔑 Base account keypair written to {}", path.display());
            println!("   Address: {}", keypair.pubkey());
        }

        // ── Status ──────────────────────────────────────────────────────
        Commands::Status => {
            let (config, mut portal) = open_portal(&cli.global)?;
            println!("📊 GIF Portal Status");
            println!("   RPC:           {}", config.rpc_url());
            println!("   Commitment:    {}", config.commitment);
            println!("   Program ID:    {}", config.program_id);
            println!("   Base account:  {}", portal.client().base_account_address());
            println!("   Wallet file:   {}", config.wallet_path.display());
            portal.check_authorization().await;
            if let Some(address) = portal.context().session.wallet_address {
                match portal.client().rpc().get_balance(&address).await {
                    Ok(lamports) => println!("   Balance:       {lamports} lamports"),
                    Err(e) => {
                        warn!(%address, error = %e, "balance unavailable");
                        println!("   Balance:       unavailable");
                    }
                }
            }
            println!();
            print!("{}", render(portal.context()));
        }

        // ── Connect ─────────────────────────────────────────────────────
        Commands::Connect => {
            let (_, mut portal) = open_portal(&cli.global)?;
            let key = portal
                .request_authorization()
                .await
                .context("wallet connection failed")?;
            println!("✅ Connected with public key: {key}");
            println!();
            print!("{}", render(portal.context()));
        }

        // ── Init ────────────────────────────────────────────────────────
        Commands::Init => {
            let (_, mut portal) = open_portal(&cli.global)?;
            require_connection(&mut portal).await?;
            println!(
                "🏗  Initializing base account {}...",
                portal.client().base_account_address()
            );
            match portal.initialize_account().await? {
                InitOutcome::Initialized(sig) => {
                    println!("✅ Created a new base account");
                    println!("   signature: {sig}");
                }
                InitOutcome::AlreadyInitialized => {
                    println!("ℹ️  Base account already initialized, nothing sent");
                }
            }
        }

        // ── Add ─────────────────────────────────────────────────────────
        Commands::Add { link } => {
            let (_, mut portal) = open_portal(&cli.global)?;
            require_connection(&mut portal).await?;
            match portal.append_entry(&link).await {
                Err(ClientError::NotInitialized) => return Err(not_ready(&portal.context().account)),
                result => report_submit(result?),
            }
            println!();
            print!("{}", render(portal.context()));
        }

        // ── List ────────────────────────────────────────────────────────
        Commands::List => {
            let (_, mut portal) = open_portal(&cli.global)?;
            require_connection(&mut portal).await?;
            let Some(entries) = portal.context().entries() else {
                return Err(not_ready(&portal.context().account));
            };
            for entry in entries {
                println!("{}\t{}", entry.gif_link, entry.user_address);
            }
        }

        // ── Shell ───────────────────────────────────────────────────────
        Commands::Shell => {
            let (_, mut portal) = open_portal(&cli.global)?;
            run_shell(&mut portal).await?;
        }
    }
    Ok(())
}
