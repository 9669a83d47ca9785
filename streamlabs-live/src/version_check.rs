//! Release checks: is there a newer build than the one running?

use eyre::Context;
use semver::Version;
use serde::Deserialize;

/// Version of this build.
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The fields used from a GitHub-style "latest release" response.
#[derive(Debug, Deserialize)]
struct LatestRelease {
    tag_name: String,
    html_url: String,
}

/// Outcome of comparing the running build against the latest release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateInfo {
    pub current: Version,
    pub latest: Version,
    /// Page where the latest release can be downloaded.
    pub download_url: String,
}

impl UpdateInfo {
    pub fn is_update_available(&self) -> bool {
        self.latest > self.current
    }
}

/// Parses a release tag such as `v1.4`, `1.4.2` or `v2.0.0-rc.1`.
///
/// A leading `v` is ignored and missing minor/patch components count as zero.
pub fn parse_version(tag: &str) -> eyre::Result<Version> {
    let raw = tag.trim();
    let raw = raw
        .strip_prefix('v')
        .or_else(|| raw.strip_prefix('V'))
        .unwrap_or(raw);

    let mut candidate = raw.to_string();
    for _ in 0..3 {
        if let Ok(version) = Version::parse(&candidate) {
            return Ok(version);
        }
        candidate = pad_version(&candidate);
    }
    Version::parse(raw).with_context(|| format!("parse version tag {tag:?}"))
}

/// Appends a `.0` component before any pre-release or build suffix.
fn pad_version(version: &str) -> String {
    match version.find(['-', '+']) {
        Some(idx) => format!("{}.0{}", &version[..idx], &version[idx..]),
        None => format!("{version}.0"),
    }
}

/// Fetches the latest release from `releases_url` and compares it with `current`.
///
/// Returns `Some` only when the latest release is strictly newer.
#[tracing::instrument(skip(client))]
pub async fn check_for_update(
    client: &reqwest::Client,
    releases_url: &str,
    current: &str,
) -> eyre::Result<Option<UpdateInfo>> {
    let release: LatestRelease = client
        .get(releases_url)
        .send()
        .await
        .context("request latest release")?
        .error_for_status()
        .context("latest release lookup failed")?
        .json()
        .await
        .context("parse latest release as JSON")?;

    let info = UpdateInfo {
        current: parse_version(current)?,
        latest: parse_version(&release.tag_name)?,
        download_url: release.html_url,
    };
    tracing::debug!(current = %info.current, latest = %info.latest, "compared versions");

    Ok(info.is_update_available().then_some(info))
}
