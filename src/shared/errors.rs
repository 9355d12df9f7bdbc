use thiserror::Error;

/// Common error taxonomy used across the core.
///
/// Best-effort background paths (scanning, discovery) log these and carry on;
/// user-initiated actions propagate them so the caller can show
/// [`CoreError::user_message`] and leave in-memory state untouched.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Folder reference can no longer be resolved: {0}")]
    Stale(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Filesystem operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse data: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Protected: {0}")]
    Protected(String),
}

impl CoreError {
    pub fn stale(msg: impl Into<String>) -> Self {
        CoreError::Stale(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        CoreError::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        CoreError::Validation(msg.into())
    }

    pub fn protected(msg: impl Into<String>) -> Self {
        CoreError::Protected(msg.into())
    }

    /// Title + message pair for user-facing failure reporting.
    /// Every user-triggered failure path surfaces one of these, never silence.
    pub fn user_message(&self) -> (&'static str, String) {
        match self {
            CoreError::Stale(_) => ("Dossier inaccessible", self.to_string()),
            CoreError::NotFound(_) => ("Introuvable", self.to_string()),
            CoreError::Io(_) => ("Erreur disque", self.to_string()),
            CoreError::Decode(_) => ("Fichier illisible", self.to_string()),
            CoreError::Validation(_) => ("Saisie invalide", self.to_string()),
            CoreError::Protected(_) => ("Élément protégé", self.to_string()),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
