//! File-backed token store
//!
//! Keeps the token pair in memory behind a tokio Mutex and mirrors every
//! change to a JSON file. Writes go through a temp file + rename while the
//! lock is held, so neither a concurrent reader nor a crash can observe a
//! half-written pair.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use common::Secret;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::{StoredTokens, TokenPair, TokenStore};

/// Token store persisted to a JSON file.
pub struct FileTokenStore {
    path: PathBuf,
    state: Mutex<StoredTokens>,
}

impl FileTokenStore {
    /// Load tokens from the given file path.
    ///
    /// If the file doesn't exist, creates its parent directories and writes
    /// `{}` (logged-out cold start).
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading token file: {e}")))?;
            let stored: StoredTokens = serde_json::from_str(&contents)
                .map_err(|e| Error::Parse(format!("parsing token file: {e}")))?;
            info!(
                path = %path.display(),
                has_access_token = stored.access().is_some(),
                "loaded tokens"
            );
            stored
        } else {
            info!(path = %path.display(), "token file not found, starting logged out");
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(dir)
                    .await
                    .map_err(|e| Error::Io(format!("creating token directory: {e}")))?;
            }
            let stored = StoredTokens::default();
            write_atomic(&path, &stored).await?;
            stored
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn access_token(&self) -> Pin<Box<dyn Future<Output = Option<Secret<String>>> + Send + '_>> {
        Box::pin(async move { self.state.lock().await.access() })
    }

    fn refresh_token(&self) -> Pin<Box<dyn Future<Output = Option<Secret<String>>> + Send + '_>> {
        Box::pin(async move { self.state.lock().await.refresh() })
    }

    fn save_tokens(
        &self,
        tokens: TokenPair,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let mut next = state.clone();
            next.set(tokens);
            write_atomic(&self.path, &next).await?;
            *state = next;
            debug!("saved token pair");
            Ok(())
        })
    }

    fn clear_tokens(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let mut next = state.clone();
            next.clear();
            let written = write_atomic(&self.path, &next).await;
            // Memory is logged out even when the file could not be rewritten
            *state = next;

            if let Err(e) = written {
                warn!(
                    error = %e,
                    path = %self.path.display(),
                    "rewriting token file failed, removing it"
                );
                match tokio::fs::remove_file(&self.path).await {
                    Ok(()) => {}
                    Err(remove) if remove.kind() == std::io::ErrorKind::NotFound => {}
                    Err(remove) => {
                        return Err(Error::Io(format!(
                            "clearing token file: {e}; removing it: {remove}"
                        )));
                    }
                }
            }
            debug!("cleared tokens");
            Ok(())
        })
    }
}

/// Sibling temp file for `path`: `.<file name>.tmp.<pid>`.
fn temp_path(path: &Path) -> Result<PathBuf> {
    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        Some(_) => Path::new("."),
        None => return Err(Error::Io("token path has no parent directory".into())),
    };
    let name = path
        .file_name()
        .ok_or_else(|| Error::Io("token path has no file name".into()))?;
    Ok(dir.join(format!(
        ".{}.tmp.{}",
        name.to_string_lossy(),
        std::process::id()
    )))
}

/// Write tokens to a file atomically.
///
/// Writes a temp file in the same directory, then renames it over the
/// target. Permissions are 0600 on unix since the file holds bearer tokens.
async fn write_atomic(path: &Path, data: &StoredTokens) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::Parse(format!("serializing tokens: {e}")))?;

    let tmp_path = temp_path(path)?;

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp token file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting token file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp token file: {e}")))?;

    debug!(path = %path.display(), "persisted tokens");
    Ok(())
}
