//! Watch-list of source wallets, reloaded from a plain text file.

use std::path::{Path, PathBuf};

use tokio::sync::RwLock;
use tracing::{error, info};

/// In-memory snapshot of the wallets to copy.
///
/// `reload` is the only writer; the poller reads through `snapshot`.
pub struct WalletRegistry {
    path: PathBuf,
    wallets: RwLock<Vec<String>>,
}

impl WalletRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            wallets: RwLock::new(Vec::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the wallets file and replace the snapshot.
    ///
    /// A read failure empties the snapshot and is logged, never returned.
    pub async fn reload(&self) -> Vec<String> {
        let loaded = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => parse_wallets(&contents),
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Error reading wallets file");
                Vec::new()
            }
        };

        let mut wallets = self.wallets.write().await;
        *wallets = loaded;
        info!(count = wallets.len(), "Loaded wallets");
        wallets.clone()
    }

    /// Current wallets.
    pub async fn snapshot(&self) -> Vec<String> {
        self.wallets.read().await.clone()
    }
}

/// One address per line; blank lines and `#` comments are skipped.
fn parse_wallets(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_wallets() {
        let contents = "0xaaa\n\n  0xbbb  \r\n# paused\n0xccc";
        assert_eq!(parse_wallets(contents), vec!["0xaaa", "0xbbb", "0xccc"]);
    }

    #[tokio::test]
    async fn test_reload_replaces_snapshot() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0xaaa\n0xbbb").unwrap();

        let registry = WalletRegistry::new(file.path());
        assert!(registry.snapshot().await.is_empty());

        let loaded = registry.reload().await;
        assert_eq!(loaded, vec!["0xaaa", "0xbbb"]);
        assert_eq!(registry.snapshot().await, loaded);

        std::fs::write(file.path(), "0xccc\n").unwrap();
        assert_eq!(registry.reload().await, vec!["0xccc"]);
        assert_eq!(registry.snapshot().await, vec!["0xccc"]);
    }

    #[tokio::test]
    async fn test_missing_file_resets_to_empty() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0xaaa").unwrap();

        let registry = WalletRegistry::new(file.path());
        assert_eq!(registry.reload().await.len(), 1);

        let path = file.path().to_path_buf();
        drop(file);
        assert!(!path.exists());

        assert!(registry.reload().await.is_empty());
        assert!(registry.snapshot().await.is_empty());
    }
}
