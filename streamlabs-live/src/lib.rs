use crate::config::Config;
use crate::streamlabs_api::{AccountInfo, ClientError, ClientOptions, SessionClient};
use eyre::Context;
use reqwest::StatusCode;
use std::ops::AsyncFnMut;

pub mod config;
pub mod local_token;
pub mod streamlabs_api;
pub mod version_check;

/// Where the token for a session came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// Given by the caller (command line, environment, text field).
    Explicit,
    /// Read from the configuration file.
    Config,
    /// Scraped from Streamlabs Desktop's local logs.
    LocalDiscovery,
}

/// Complete token setup shared by every front-end.
///
/// Picks a token, builds a [`SessionClient`] for it and checks it against the relay.
/// Returns the client, the account info fetched during validation (if the relay could be
/// reached), and where the token came from. `config.token` is updated to the token in use; the
/// caller decides whether to save it.
pub async fn setup_session_client<F>(
    config: &mut Config,
    explicit_token: Option<&str>,
    options: ClientOptions,
    mut notify_callback: F,
) -> eyre::Result<(SessionClient, Option<AccountInfo>, TokenSource)>
where
    F: AsyncFnMut(&str, &str, &str),
{
    // ==============================================================================
    // Token Acquisition Strategy
    // ==============================================================================
    // An explicitly supplied token always wins, then whatever was saved last time.
    // Only when neither exists do we go looking through Streamlabs Desktop's files.
    let (token, source) = match explicit_token.map(str::trim).filter(|t| !t.is_empty()) {
        Some(token) => (token.to_string(), TokenSource::Explicit),
        None if config.has_token() => (config.token.trim().to_string(), TokenSource::Config),
        None => {
            notify_callback(
                "sl_local_token",
                "Looking for a token",
                "No token configured, searching Streamlabs Desktop's local files.",
            )
            .await;

            let token = local_token::find_local_token()
                .await
                .context("discover local Streamlabs token")?
                .ok_or_else(|| {
                    eyre::eyre!(
                        "no API token found locally; log in to Streamlabs Desktop with TikTok first"
                    )
                })?;
            (token, TokenSource::LocalDiscovery)
        }
    };
    tracing::debug!(?source, "selected Streamlabs token");

    let client =
        SessionClient::with_options(token.clone(), options).context("create Streamlabs session")?;

    // ==============================================================================
    // Token Validation
    // ==============================================================================
    // A token the relay explicitly rejects is useless and worth failing on. Any other failure
    // (network down, relay overloaded) leaves the token's validity unknown, so we carry on
    // and let the individual operations degrade on their own.
    let account = match client.try_info().await {
        Ok(info) => Some(info),
        Err(e @ ClientError::HttpStatus { status, .. })
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN =>
        {
            notify_callback(
                "sl_token_rejected",
                "Token rejected",
                "Streamlabs rejected the API token. Obtain a new one and try again.",
            )
            .await;
            return Err(e).context("validate Streamlabs token");
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not validate token, continuing");
            None
        }
    };

    config.token = token;
    Ok((client, account, source))
}
