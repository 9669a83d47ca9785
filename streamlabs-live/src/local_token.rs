//! Discovery of the Streamlabs token left behind by Streamlabs Desktop.
//!
//! Streamlabs Desktop keeps its Local Storage in a LevelDB directory whose write-ahead `.log`
//! files contain the logged-in account's `apiToken` in plain JSON. When the user has logged in
//! to Streamlabs Desktop with TikTok, the newest of those files holds a token this crate can use.

use eyre::Context;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::SystemTime;

/// Only the newest files are examined; older ones rarely hold a token that still works.
pub const MAX_LOG_FILES: usize = 10;

static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)"apiToken":"([a-f0-9]+)""#).expect("token pattern is valid")
});

/// Location of Streamlabs Desktop's Local Storage logs on this platform.
///
/// Supported on Windows (`%APPDATA%`) and macOS (`~/Library/Application Support`) only, the two
/// platforms Streamlabs Desktop ships for.
pub fn default_log_dir() -> eyre::Result<PathBuf> {
    if !cfg!(any(target_os = "windows", target_os = "macos")) {
        eyre::bail!("local token discovery is only supported on Windows and macOS");
    }
    let dirs = directories::BaseDirs::new()
        .ok_or_else(|| eyre::eyre!("cannot determine the user's home directory"))?;
    Ok(dirs
        .data_dir()
        .join("slobs-client")
        .join("Local Storage")
        .join("leveldb"))
}

/// Looks for a token in the default Streamlabs Desktop log directory.
pub async fn find_local_token() -> eyre::Result<Option<String>> {
    let dir = default_log_dir()?;
    find_token_in_dir(&dir).await
}

/// Looks for a token in the `.log` files of `dir`.
///
/// Files are examined newest first, at most [`MAX_LOG_FILES`] of them, and the search stops at
/// the first file containing a token; within that file the last occurrence wins. Unreadable
/// files are skipped.
///
/// Fails if `dir` has no `.log` files at all, which usually means Streamlabs Desktop is not
/// installed. Returns `Ok(None)` if there are logs but none holds a token.
#[tracing::instrument]
pub async fn find_token_in_dir(dir: &Path) -> eyre::Result<Option<String>> {
    let files = newest_log_files(dir).await?;
    if files.is_empty() {
        eyre::bail!(
            "no Streamlabs log files found in {}; is Streamlabs Desktop installed and logged in with TikTok?",
            dir.display()
        );
    }

    for file in files.into_iter().take(MAX_LOG_FILES) {
        let contents = match tokio::fs::read(&file).await {
            Ok(contents) => contents,
            Err(e) => {
                tracing::debug!(file = %file.display(), error = %e, "skipping unreadable log file");
                continue;
            }
        };

        if let Some(token) = last_token_in(&String::from_utf8_lossy(&contents)) {
            tracing::info!(file = %file.display(), "found Streamlabs token");
            return Ok(Some(token.to_string()));
        }
    }

    tracing::debug!("no token in Streamlabs log files");
    Ok(None)
}

/// Returns the last `apiToken` value in `contents`.
fn last_token_in(contents: &str) -> Option<&str> {
    TOKEN_PATTERN
        .captures_iter(contents)
        .last()
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}

/// Lists the `.log` files of `dir`, most recently modified first.
async fn newest_log_files(dir: &Path) -> eyre::Result<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).with_context(|| format!("list {}", dir.display())),
    };

    let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("list {}", dir.display()))?
    {
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "log") {
            continue;
        }
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        files.push((modified, path));
    }

    files.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn write_log(dir: &Path, name: &str, contents: &[u8], age: Duration) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        let file = std::fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
        path
    }

    #[test]
    fn test_last_token_in() {
        let contents = r#"xx"apiToken":"aaa111"yy ... "APITOKEN":"BBB222" zz"#;
        assert_eq!(last_token_in(contents), Some("BBB222"));
        assert_eq!(last_token_in(r#""apiToken":"not-hex""#), None);
        assert_eq!(last_token_in(""), None);
    }

    #[tokio::test]
    async fn test_newest_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        write_log(
            dir.path(),
            "000001.log",
            br#"{"apiToken":"0ld0ld"}"#,
            Duration::from_secs(3600),
        );
        write_log(
            dir.path(),
            "000002.log",
            br#"{"apiToken":"feed01"} {"apiToken":"feed02"}"#,
            Duration::from_secs(60),
        );

        let token = find_token_in_dir(dir.path()).await.unwrap();
        assert_eq!(token.as_deref(), Some("feed02"));
    }

    #[tokio::test]
    async fn test_falls_back_to_older_files() {
        let dir = tempfile::tempdir().unwrap();
        write_log(
            dir.path(),
            "old.log",
            b"\xff\xfe garbage \"apiToken\":\"c0ffee\" \x00\x01",
            Duration::from_secs(3600),
        );
        write_log(dir.path(), "new.log", b"nothing here", Duration::from_secs(1));
        write_log(
            dir.path(),
            "CURRENT",
            br#""apiToken":"ba5eba11""#,
            Duration::ZERO,
        );

        let token = find_token_in_dir(dir.path()).await.unwrap();
        assert_eq!(token.as_deref(), Some("c0ffee"));
    }

    #[tokio::test]
    async fn test_only_newest_files_are_searched() {
        let dir = tempfile::tempdir().unwrap();
        write_log(
            dir.path(),
            "ancient.log",
            br#""apiToken":"abc""#,
            Duration::from_secs(100_000),
        );
        for i in 0..MAX_LOG_FILES {
            write_log(
                dir.path(),
                &format!("{i:06}.log"),
                b"no token",
                Duration::from_secs(i as u64 + 1),
            );
        }

        assert_eq!(find_token_in_dir(dir.path()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_no_logs_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_token_in_dir(dir.path()).await.is_err());
        assert!(
            find_token_in_dir(&dir.path().join("missing"))
                .await
                .is_err()
        );
    }
}
