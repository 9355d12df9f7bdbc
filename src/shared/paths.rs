use std::path::{Path, PathBuf};

/// Get the base storage directory following the XDG Base Directory
/// Specification. `ATELIER_DATA_DIR` overrides everything (used by tests and
/// portable installs); otherwise `$XDG_DATA_HOME/atelier` or
/// `~/.local/share/atelier`.
pub fn get_storage_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("ATELIER_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Ok(xdg_data) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg_data).join("atelier");
    }

    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("atelier")
}

/// Get the logs directory path.
/// Returns `{storage_dir}/logs`.
pub fn get_log_dir() -> PathBuf {
    get_storage_dir().join("logs")
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
