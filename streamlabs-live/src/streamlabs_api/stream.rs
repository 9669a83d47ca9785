//! Stream lifecycle types: starting and ending a TikTok LIVE through the relay.
//!
//! # Lifecycle
//!
//! A [`StreamIdentifier`] does not exist until `POST /stream/start` succeeds. It is then held by
//! the session client until the next successful start replaces it, and `POST /stream/<id>/end`
//! uses whichever identifier is currently held.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Who the stream is intended for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudienceType {
    /// Suitable for all viewers.
    #[default]
    #[serde(rename = "0")]
    General,
    /// Restricted to adult viewers.
    #[serde(rename = "1")]
    Mature,
}

impl AudienceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "0",
            Self::Mature => "1",
        }
    }
}

impl fmt::Display for AudienceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque handle for a stream the relay has provisioned.
///
/// The relay has been seen to encode it both as a JSON string and as a number, so both are
/// accepted and kept in their textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StreamIdentifier(String);

impl StreamIdentifier {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for StreamIdentifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(id) => Self(id),
            RawId::Number(id) => Self(id.to_string()),
        })
    }
}

/// Raw response of `POST /stream/start`.
#[derive(Debug, Deserialize)]
pub struct StartStreamResponse {
    pub id: StreamIdentifier,
    pub rtmp: String,
    pub key: String,
}

/// Where to point the encoder once a stream has started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamCredentials {
    /// RTMP ingest URL ("server" in OBS).
    pub rtmp_url: String,
    /// Stream key for the ingest URL.
    pub stream_key: String,
}

/// Raw response of `POST /stream/<id>/end`.
#[derive(Debug, Deserialize)]
pub struct EndStreamResponse {
    #[serde(default)]
    pub success: bool,
}
