/*!
 * Error types for the vault-translator application.
 *
 * This module contains custom error types for the different parts of the
 * translation pipeline, using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The request did not complete within the configured deadline
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),
}

/// The eight failure kinds a pipeline run can end in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedAddress,
    CollectionMismatch,
    UnsafePath,
    ResourceNotFound,
    WriteDenied,
    BackupFailed,
    TranslationFailed,
    InvalidMode,
}

/// Protocol-level error class a transport maps each kind onto
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The caller sent something unusable
    InvalidInput,
    /// The pipeline failed while doing its job
    Internal,
}

impl ErrorKind {
    /// Map the kind to its protocol error class
    pub fn class(self) -> ErrorClass {
        match self {
            Self::MalformedAddress
            | Self::CollectionMismatch
            | Self::UnsafePath
            | Self::ResourceNotFound
            | Self::InvalidMode => ErrorClass::InvalidInput,
            Self::WriteDenied | Self::BackupFailed | Self::TranslationFailed => ErrorClass::Internal,
        }
    }

    /// Stable identifier used in logs and CLI output
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MalformedAddress => "malformed_address",
            Self::CollectionMismatch => "collection_mismatch",
            Self::UnsafePath => "unsafe_path",
            Self::ResourceNotFound => "resource_not_found",
            Self::WriteDenied => "write_denied",
            Self::BackupFailed => "backup_failed",
            Self::TranslationFailed => "translation_failed",
            Self::InvalidMode => "invalid_mode",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can end a translation pipeline run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The address string is not a recognised `open` address
    #[error("Malformed address: {0}")]
    MalformedAddress(String),

    /// The address names a collection other than the configured one
    #[error("Collection mismatch: requested '{requested}', configured '{configured}'")]
    CollectionMismatch {
        /// Collection named by the address
        requested: String,
        /// Collection the server is configured for
        configured: String,
    },

    /// The path would escape the sandbox or touch hidden files
    #[error("Unsafe path '{path}': {reason}")]
    UnsafePath {
        /// Offending path as given
        path: String,
        /// Which check rejected it
        reason: &'static str,
    },

    /// The target file is absent or unreadable
    #[error("Resource not found: {path}")]
    ResourceNotFound {
        /// Vault-relative path
        path: String,
        /// Underlying I/O error, if any
        #[source]
        source: Option<std::io::Error>,
    },

    /// Writing the target failed
    #[error("Write denied for {path}: {source}")]
    WriteDenied {
        /// Vault-relative path
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Creating the backup failed; the source is untouched
    #[error("Backup of {path} failed: {source}")]
    BackupFailed {
        /// Vault-relative path of the source
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The generation call failed
    #[error("Translation failed: {0}")]
    TranslationFailed(#[source] ProviderError),

    /// The apply mode is not one of replace, append, parallel
    #[error("Invalid mode '{0}': expected replace, append or parallel")]
    InvalidMode(String),
}

impl PipelineError {
    /// Kind of this error, independent of its payload
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedAddress(_) => ErrorKind::MalformedAddress,
            Self::CollectionMismatch { .. } => ErrorKind::CollectionMismatch,
            Self::UnsafePath { .. } => ErrorKind::UnsafePath,
            Self::ResourceNotFound { .. } => ErrorKind::ResourceNotFound,
            Self::WriteDenied { .. } => ErrorKind::WriteDenied,
            Self::BackupFailed { .. } => ErrorKind::BackupFailed,
            Self::TranslationFailed(_) => ErrorKind::TranslationFailed,
            Self::InvalidMode(_) => ErrorKind::InvalidMode,
        }
    }

    /// Shortcut for `self.kind().class()`
    pub fn class(&self) -> ErrorClass {
        self.kind().class()
    }
}

impl From<ProviderError> for PipelineError {
    fn from(error: ProviderError) -> Self {
        Self::TranslationFailed(error)
    }
}
