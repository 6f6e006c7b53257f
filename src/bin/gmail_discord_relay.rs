use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use log::{error, info};

use gmail_discord_relay::auth::{token_manager::TokenManager, token_store};
use gmail_discord_relay::config::{Config, load_config};
use gmail_discord_relay::daemon::{Relay, RelaySettings, run_daemon};
use gmail_discord_relay::discord::webhook::WebhookClient;
use gmail_discord_relay::gmail::api::GmailApi;
use gmail_discord_relay::store::StateStore;

#[derive(Parser)]
#[command(name = "gmail_discord_relay")]
#[command(about = "Forward new unread Gmail messages to a Discord webhook", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Poll the inbox and deliver notifications
    Run {
        /// Seconds between checks (overrides config and CHECK_INTERVAL)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval: Option<u64>,

        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },

    /// Acquire Gmail credentials interactively and exit
    Auth,

    /// Show the stored history id and how many messages were delivered
    Status,

    /// Store the OAuth client secret in keyring
    SetClientSecret {
        #[arg(long)]
        client_id: String,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::SetClientSecret { client_id } => {
            eprintln!("Paste client secret (end with Ctrl-D):");
            let mut secret = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut secret)?;
            token_store::save_client_secret(&client_id, secret.trim())?;
            println!("Saved client secret for client_id {}", client_id);
            Ok(())
        }

        Command::Auth => {
            let cfg = configuration()?;
            TokenManager::from_config(&cfg)?.get_access_token()?;
            println!("Gmail authorization complete for {}", cfg.user_email()?);
            Ok(())
        }

        Command::Status => {
            let cfg = configuration()?;
            let dir = cfg.resolve_state_dir()?;
            let state = StateStore::open(&dir)?;
            println!("State directory: {}", dir.display());
            match state.cursor.get() {
                Some(c) => println!("History id: {c}"),
                None => println!("History id: (not yet recorded)"),
            }
            println!("Delivered messages: {}", state.ledger.len());
            Ok(())
        }

        Command::Run { interval, once } => {
            let cfg = configuration()?;
            let webhook = WebhookClient::new(cfg.webhook_url()?)?;

            let token_mgr = TokenManager::from_config(&cfg)?;
            if let Err(e) = token_mgr.get_access_token() {
                error!("Gmail authentication failed: {e:#}");
                return Err(e);
            }
            info!("Gmail authentication succeeded");

            let gmail = GmailApi::new(token_mgr.unattended())?;
            let state = StateStore::open(&cfg.resolve_state_dir()?)?;
            let settings = RelaySettings {
                throttle: cfg.throttle(),
                mark_as_read: cfg.mark_as_read,
            };
            let mut relay = Relay::new(gmail, webhook, state, settings);

            if once {
                let report = relay.run_once()?;
                println!(
                    "{} candidate(s): {} delivered, {} skipped, {} failed",
                    report.candidates, report.delivered, report.skipped, report.failed
                );
                return Ok(());
            }

            let every = interval
                .map(std::time::Duration::from_secs)
                .unwrap_or_else(|| cfg.check_interval());
            run_daemon(&mut relay, every)
        }
    }
}

fn configuration() -> Result<Config> {
    load_config().map_err(|e| anyhow!("Configuration error: {e}"))
}
