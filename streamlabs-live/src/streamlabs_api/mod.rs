//! Client for the Streamlabs TikTok relay API.
//!
//! Streamlabs Desktop can stream to TikTok LIVE through a relay that hands out RTMP ingest
//! details on request. This module talks to that relay directly, which is all that is needed to
//! go live from any encoder (OBS, ffmpeg, ...) with a Streamlabs token.
//!
//! # Core Concepts
//!
//! - [`SessionClient`] owns one bearer token and one connection pool and exposes the four relay
//!   operations: account info, category search, start, and end.
//! - Every operation has a *soft failure* value instead of an error: `None` for info and start,
//!   `[Other]` for search, `false` for end. Details of what went wrong are logged through
//!   `tracing`.
//! - Reads are retried with exponential backoff on transient failures (see [`RetryPolicy`]).
//!   Starting and ending a stream are sent exactly once.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use streamlabs_tiktok_live::streamlabs_api::{AudienceType, SessionClient};
//!
//! # async fn example() -> eyre::Result<()> {
//! let mut client = SessionClient::new("0123456789abcdef")?;
//!
//! if let Some(info) = client.info().await {
//!     println!("logged in as {:?}, can go live: {}", info.username, info.can_be_live);
//! }
//!
//! let category = client.resolve_category("Minecraft").await;
//! if let Some(ingest) = client.start("Building a castle", &category, AudienceType::General).await {
//!     println!("server: {}\nkey: {}", ingest.rtmp_url, ingest.stream_key);
//!     // ... stream ...
//!     client.end().await;
//! }
//! # Ok(())
//! # }
//! ```

pub mod categories;
pub mod client;
pub mod error;
pub mod info;
pub mod retry;
pub mod stream;

pub use categories::CategorySuggestion;
pub use client::{ClientOptions, SessionClient};
pub use error::ClientError;
pub use info::AccountInfo;
pub use retry::RetryPolicy;
pub use stream::{AudienceType, StreamCredentials, StreamIdentifier};
