use clap::{Parser, Subcommand};
use eyre::Context;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use streamlabs_tiktok_live::config::{Config, DEFAULT_CONFIG_PATH};
use streamlabs_tiktok_live::streamlabs_api::{AudienceType, ClientOptions};
use streamlabs_tiktok_live::version_check::{CURRENT_VERSION, check_for_update};
use streamlabs_tiktok_live::{TokenSource, local_token, setup_session_client};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Go live on TikTok through the Streamlabs relay.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Settings file holding the token, title, game and audience type.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Streamlabs API token; overrides the one in the settings file.
    #[arg(long, env = "STREAMLABS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the account the token belongs to and whether it may go live.
    Info,
    /// Search game categories.
    Search { query: String },
    /// Start a LIVE, print the ingest details and end it on Ctrl-C.
    Live {
        /// Stream title (defaults to the saved one).
        #[arg(long)]
        title: Option<String>,
        /// Category name (defaults to the saved one).
        #[arg(long)]
        game: Option<String>,
        /// Mark the stream as intended for mature audiences.
        #[arg(long)]
        mature: bool,
        /// Remember title, game, audience type and token for next time.
        #[arg(long)]
        save: bool,
    },
    /// Look for a token in Streamlabs Desktop's local files.
    Token {
        /// Directory to search instead of Streamlabs Desktop's default.
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Store the token in the settings file.
        #[arg(long)]
        save: bool,
    },
    /// Check whether a newer release is available.
    CheckUpdate {
        /// GitHub-style "latest release" endpoint.
        #[arg(long)]
        releases_url: String,
    },
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(&cli.config).await;
    let notify = async |_id: &str, title: &str, message: &str| eprintln!("{title}: {message}");

    match cli.command {
        Command::Token { dir, save } => {
            let token = match dir {
                Some(dir) => local_token::find_token_in_dir(&dir).await?,
                None => local_token::find_local_token().await?,
            };
            let Some(token) = token else {
                eyre::bail!(
                    "no API token found locally; log in to Streamlabs Desktop with TikTok first"
                );
            };
            println!("{token}");
            if save {
                config.token = token;
                config.save(&cli.config).await?;
            }
        }
        Command::CheckUpdate { releases_url } => {
            let http = reqwest::Client::builder()
                .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
                .build()
                .context("build HTTP client")?;
            match check_for_update(&http, &releases_url, CURRENT_VERSION).await? {
                Some(update) => {
                    println!("update available: {} -> {}", update.current, update.latest);
                    println!("download: {}", update.download_url);
                }
                None => println!("up to date ({CURRENT_VERSION})"),
            }
        }
        Command::Info => {
            let (_, account, source) = setup_session_client(
                &mut config,
                cli.token.as_deref(),
                ClientOptions::default(),
                notify,
            )
            .await?;
            remember_discovered_token(&config, &cli.config, source).await?;

            let Some(account) = account else {
                eyre::bail!("could not reach Streamlabs; account state unknown");
            };
            println!(
                "username:           {}",
                account.username.as_deref().unwrap_or("Unknown")
            );
            println!(
                "application status: {}",
                account.application_status.as_deref().unwrap_or("Unknown")
            );
            println!("can go live:        {}", account.can_be_live);
        }
        Command::Search { query } => {
            let (client, _, source) = setup_session_client(
                &mut config,
                cli.token.as_deref(),
                ClientOptions::default(),
                notify,
            )
            .await?;
            remember_discovered_token(&config, &cli.config, source).await?;
            for category in client.search(&query).await {
                println!("{:<40} {}", category.full_name, category.game_mask_id);
            }
        }
        Command::Live {
            title,
            game,
            mature,
            save,
        } => {
            let (mut client, account, source) = setup_session_client(
                &mut config,
                cli.token.as_deref(),
                ClientOptions::default(),
                notify,
            )
            .await?;

            if let Some(title) = title {
                config.title = title;
            }
            if let Some(game) = game {
                config.game = game;
            }
            if mature {
                config.audience_type = AudienceType::Mature;
            }
            if config.title.trim().is_empty() {
                eyre::bail!("a stream title is required (use --title)");
            }
            match account {
                Some(account) if !account.can_be_live => {
                    eyre::bail!("this account is not allowed to go live yet");
                }
                Some(_) => {}
                None => tracing::warn!("account state unknown, trying to go live anyway"),
            }
            if save {
                config.save(&cli.config).await?;
            } else {
                remember_discovered_token(&config, &cli.config, source).await?;
            }

            let category = client.resolve_category(&config.game).await;
            if category.is_empty() && !config.game.is_empty() {
                tracing::warn!(game = %config.game, "category not found, streaming as Other");
            }

            let Some(ingest) = client
                .start(&config.title, &category, config.audience_type)
                .await
            else {
                eyre::bail!("failed to start stream; check your connection and try again");
            };
            println!("server: {}", ingest.rtmp_url);
            println!("key:    {}", ingest.stream_key);
            eprintln!("stream is live; press Ctrl-C to end it");

            tokio::signal::ctrl_c()
                .await
                .context("wait for Ctrl-C")?;

            if client.end().await {
                eprintln!("stream ended");
            } else {
                eyre::bail!("failed to end stream; end it from TikTok LIVE Center");
            }
        }
    }

    Ok(())
}

/// Saves a token found in Streamlabs Desktop's files so the next run does not have to search.
async fn remember_discovered_token(
    config: &Config,
    path: &Path,
    source: TokenSource,
) -> eyre::Result<()> {
    if source == TokenSource::LocalDiscovery {
        config.save(path).await?;
    }
    Ok(())
}
