//! Error types module
//!
//! All failures the transform pipeline can report are unified under
//! `PipelineError`. Tool controllers catch these at their boundary and turn
//! them into user-visible notifications; nothing here is meant to reach a
//! global crash handler.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like a disabled control being triggered
    Debug,
    /// Warning level - for recoverable issues like a failed fetch or save
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error notifications - defines how an error should be presented
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "ASSET_FETCH_FAILED")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (the user can retry)
    fn is_recoverable(&self) -> bool;

    /// Message shown to the user
    fn user_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    /// Operation name has no token mapping
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Apply was triggered with nothing selected
    #[error("No operations supplied")]
    NoOperations,

    #[error("Invalid parameter '{parameter}' for operation '{operation}'")]
    InvalidParameter { operation: String, parameter: String },

    /// Network or decode failure fetching an asset
    #[error("Asset fetch failed: {0}")]
    AssetFetch(String),

    /// Operation incompatible with the current image state
    #[error("Unsupported transformation chain: {0}")]
    UnsupportedChain(String),

    #[error("No editable image on the canvas")]
    NoEditableObject,

    /// Another operation holds the processing gate
    #[error("Another operation is in progress: {0}")]
    Busy(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Export failed: {0}")]
    Export(String),
}

/// Errors raised by the transformation URL builder
pub type TransformError = PipelineError;

pub type PipelineResult<T> = Result<T, PipelineError>;

impl ErrorMetadata for PipelineError {
    fn error_code(&self) -> &'static str {
        match self {
            PipelineError::InvalidOperation(_) => "INVALID_OPERATION",
            PipelineError::NoOperations => "NO_OPERATIONS",
            PipelineError::InvalidParameter { .. } => "INVALID_PARAMETER",
            PipelineError::AssetFetch(_) => "ASSET_FETCH_FAILED",
            PipelineError::UnsupportedChain(_) => "UNSUPPORTED_CHAIN",
            PipelineError::NoEditableObject => "NO_EDITABLE_OBJECT",
            PipelineError::Busy(_) => "BUSY",
            PipelineError::Persistence(_) => "PERSISTENCE_FAILED",
            PipelineError::Upload(_) => "UPLOAD_FAILED",
            PipelineError::Export(_) => "EXPORT_FAILED",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PipelineError::AssetFetch(_)
                | PipelineError::Busy(_)
                | PipelineError::Persistence(_)
                | PipelineError::Upload(_)
                | PipelineError::Export(_)
        )
    }

    fn user_message(&self) -> String {
        match self {
            PipelineError::InvalidOperation(_) | PipelineError::InvalidParameter { .. } => {
                "This operation is not available".to_string()
            }
            PipelineError::NoOperations => "Select options before applying".to_string(),
            PipelineError::AssetFetch(_) => {
                "Failed to load the transformed image. Please try again.".to_string()
            }
            PipelineError::UnsupportedChain(reason) => reason.clone(),
            PipelineError::NoEditableObject => "Please add an image first".to_string(),
            PipelineError::Busy(message) => format!("Please wait: {}", message),
            PipelineError::Persistence(_) => {
                "Failed to save project. Please try again.".to_string()
            }
            PipelineError::Upload(reason) => reason.clone(),
            PipelineError::Export(_) => "Failed to export image. Please try again.".to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            PipelineError::NoOperations
            | PipelineError::NoEditableObject
            | PipelineError::Busy(_)
            | PipelineError::UnsupportedChain(_) => LogLevel::Debug,
            PipelineError::AssetFetch(_)
            | PipelineError::Persistence(_)
            | PipelineError::Upload(_)
            | PipelineError::Export(_) => LogLevel::Warn,
            PipelineError::InvalidOperation(_) | PipelineError::InvalidParameter { .. } => {
                LogLevel::Error
            }
        }
    }
}
