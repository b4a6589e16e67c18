//! Writing screen captures to disk.

use std::path::{Component, Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{Result, Tn3270Error};

/// Check a screenshot destination.
///
/// Rejects an empty path and any path with a `..` component. Returns the path
/// with `.` components removed.
pub fn validate_screenshot_path(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Err(Tn3270Error::InvalidPath("path cannot be empty".to_string()));
    }

    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                return Err(Tn3270Error::InvalidPath(
                    "path cannot contain parent directory references".to_string(),
                ));
            }
            Component::CurDir => {}
            other => cleaned.push(other),
        }
    }

    if cleaned.as_os_str().is_empty() {
        return Err(Tn3270Error::InvalidPath(format!(
            "path does not name a file: {}",
            path.display()
        )));
    }
    Ok(cleaned)
}

/// Write screen text to `path`, creating parent directories.
///
/// The file is created owner-readable only on unix.
pub async fn write_screen(path: &Path, screen: &str) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(screen.as_bytes()).await?;
    file.flush().await?;

    debug!(path = %path.display(), bytes = screen.len(), "wrote screenshot");
    Ok(())
}
