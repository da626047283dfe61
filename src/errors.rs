use thiserror::Error;

/// Errors that can occur while resolving and caching workflow references.
#[derive(Error, Debug)]
pub enum UsesGraphError {
    #[error("fetch error: {message} (reference: {reference})")]
    Fetch { message: String, reference: String },

    #[error("store error: {message} (operation: {operation})")]
    Store { message: String, operation: String },

    #[error("scan error: {message} (path: {path})")]
    Scan { message: String, path: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("traversal cancelled")]
    Cancelled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for results using `UsesGraphError`.
pub type Result<T> = std::result::Result<T, UsesGraphError>;
