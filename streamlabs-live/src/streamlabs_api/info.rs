//! Account and capability information from the `/info` endpoint.

use serde::{Deserialize, Serialize};

/// Raw response of `GET /info`.
///
/// Every field is optional on the wire; the relay omits `user` entirely for tokens that were
/// never linked to a TikTok account.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct InfoResponse {
    #[serde(default)]
    pub user: Option<InfoUser>,
    #[serde(default)]
    pub application_status: Option<ApplicationStatus>,
    #[serde(default)]
    pub can_be_live: bool,
}

/// The TikTok account the token is linked to.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct InfoUser {
    #[serde(default)]
    pub username: Option<String>,
}

/// State of the account's application for LIVE access.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ApplicationStatus {
    #[serde(default)]
    pub status: Option<String>,
}

/// Snapshot of what the authenticated account is and whether it may go live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    /// TikTok username, if the relay reported one.
    pub username: Option<String>,
    /// Application status text such as `"approved"`, if reported.
    pub application_status: Option<String>,
    /// Whether the account is currently allowed to start a LIVE.
    pub can_be_live: bool,
}

impl From<InfoResponse> for AccountInfo {
    fn from(response: InfoResponse) -> Self {
        Self {
            username: response.user.and_then(|u| u.username),
            application_status: response.application_status.and_then(|s| s.status),
            can_be_live: response.can_be_live,
        }
    }
}
