use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogbookError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    AuthFailure(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] rusqlite::Error),

    #[error("line {line}: {message}")]
    ImportFormat { line: usize, message: String },

    #[error("io failed: {0}")]
    Io(#[from] std::io::Error),
}

impl LogbookError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::AuthFailure(message.into())
    }

    /// Import problems that are not tied to one data row use line 1 (the header).
    pub fn import_format(line: usize, message: impl Into<String>) -> Self {
        Self::ImportFormat {
            line,
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_failed",
            Self::AuthFailure(_) => "auth_failed",
            Self::StorageUnavailable(_) => "storage_unavailable",
            Self::ImportFormat { .. } => "import_format",
            Self::Io(_) => "io_failed",
        }
    }
}

pub type Result<T> = std::result::Result<T, LogbookError>;
