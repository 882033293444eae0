//! Centralized Error Handling Module
//!
//! Every failure carries a unique error code so logs can be grepped and
//! callers can tell "no bytecode" apart from "provider down".
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - RPC_xxx: Ledger provider errors
//! - CONTRACT_xxx: Data errors
//! - STORE_xxx: Persistence errors
//! - CFG_xxx: Configuration errors

use std::fmt;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    /// Coarse failure class surfaced to callers
    pub fn taxonomy(&self) -> ErrorTaxonomy {
        self.code.taxonomy()
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Failure classes callers need to distinguish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorTaxonomy {
    /// Address has no deployed bytecode
    NoCode,
    /// RPC / network failure
    Provider,
    /// Configuration, storage and everything else
    Other,
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // Provider Errors
    // ============================================
    /// RPC connection failed
    RpcConnectionFailed,
    /// RPC request timeout
    RpcTimeout,
    /// RPC rate limited (HTTP 429 / -32005)
    RpcRateLimited,
    /// RPC returned error response
    RpcError,
    /// No RPC endpoint produced an answer
    RpcNoEndpoints,
    /// Invalid RPC response
    RpcInvalidResponse,

    // ============================================
    // Data Errors
    // ============================================
    /// Address has no deployed bytecode
    ContractNoCode,

    // ============================================
    // Storage Errors
    // ============================================
    /// Backing store failure
    StoreError,

    // ============================================
    // Configuration Errors
    // ============================================
    /// Missing environment variable
    ConfigMissingEnv,
    /// Invalid configuration value
    ConfigInvalidValue,

    // ============================================
    // Generic Errors
    // ============================================
    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RpcConnectionFailed => "RPC_CONNECTION_FAILED",
            Self::RpcTimeout => "RPC_TIMEOUT",
            Self::RpcRateLimited => "RPC_RATE_LIMITED",
            Self::RpcError => "RPC_ERROR",
            Self::RpcNoEndpoints => "RPC_NO_ENDPOINTS",
            Self::RpcInvalidResponse => "RPC_INVALID_RESPONSE",

            Self::ContractNoCode => "CONTRACT_NO_CODE",

            Self::StoreError => "STORE_ERROR",

            Self::ConfigMissingEnv => "CFG_MISSING_ENV",
            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",

            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    pub fn taxonomy(&self) -> ErrorTaxonomy {
        match self {
            Self::ContractNoCode => ErrorTaxonomy::NoCode,
            Self::RpcConnectionFailed
            | Self::RpcTimeout
            | Self::RpcRateLimited
            | Self::RpcError
            | Self::RpcNoEndpoints
            | Self::RpcInvalidResponse => ErrorTaxonomy::Provider,
            _ => ErrorTaxonomy::Other,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RpcTimeout | Self::RpcRateLimited | Self::RpcConnectionFailed
        )
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    /// Address has no bytecode
    pub fn no_code(address: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::ContractNoCode,
            format!("Address {} has no deployed bytecode", address),
        )
    }

    /// RPC connection failed
    pub fn rpc_connection_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RpcConnectionFailed, msg)
    }

    /// RPC timeout
    pub fn rpc_timeout(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RpcTimeout, msg)
    }

    /// RPC rate limited
    pub fn rpc_rate_limited() -> Self {
        Self::new(ErrorCode::RpcRateLimited, "Rate limited (HTTP 429)")
    }

    /// RPC returned an error object
    pub fn rpc_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RpcError, msg)
    }

    /// RPC response could not be understood
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RpcInvalidResponse, msg)
    }

    /// Missing env var
    pub fn missing_env(key_name: &str) -> Self {
        Self::new(
            ErrorCode::ConfigMissingEnv,
            format!("Missing environment variable: {}", key_name),
        )
    }

    /// Invalid config value
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigInvalidValue, msg)
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        Self::new(ErrorCode::Unknown, err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorCode::Unknown, "IO error", err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::rpc_timeout("Request timeout")
        } else if err.is_connect() {
            Self::new(ErrorCode::RpcConnectionFailed, "Connection failed")
        } else if err.is_decode() {
            Self::with_source(ErrorCode::RpcInvalidResponse, "Undecodable response body", err)
        } else {
            Self::new(ErrorCode::RpcError, err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::RpcInvalidResponse, "JSON parse error", err)
    }
}

impl From<hex::FromHexError> for AppError {
    fn from(err: hex::FromHexError) -> Self {
        Self::with_source(ErrorCode::RpcInvalidResponse, "Hex decode error", err)
    }
}

impl From<tokio::time::error::Elapsed> for AppError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::rpc_timeout("Provider call exceeded its deadline")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = AppError::rpc_timeout("Connection timed out");
        assert_eq!(err.code, ErrorCode::RpcTimeout);
        assert_eq!(err.code_str(), "RPC_TIMEOUT");
        assert_eq!(err.to_string(), "[RPC_TIMEOUT] Connection timed out");
    }

    #[test]
    fn test_retryable() {
        assert!(ErrorCode::RpcTimeout.is_retryable());
        assert!(ErrorCode::RpcRateLimited.is_retryable());
        assert!(!ErrorCode::ContractNoCode.is_retryable());
        assert!(!ErrorCode::RpcInvalidResponse.is_retryable());
    }

    #[test]
    fn test_taxonomy_separates_failure_classes() {
        assert_eq!(AppError::no_code("0xabc").taxonomy(), ErrorTaxonomy::NoCode);
        assert_eq!(AppError::rpc_rate_limited().taxonomy(), ErrorTaxonomy::Provider);
        assert_eq!(
            AppError::new(ErrorCode::RpcNoEndpoints, "down").taxonomy(),
            ErrorTaxonomy::Provider
        );
        assert_eq!(
            AppError::new(ErrorCode::StoreError, "boom").taxonomy(),
            ErrorTaxonomy::Other
        );
    }

    #[tokio::test]
    async fn test_elapsed_deadline_is_a_retryable_timeout() {
        let elapsed = tokio::time::timeout(
            std::time::Duration::from_millis(1),
            std::future::pending::<()>(),
        )
        .await
        .unwrap_err();
        let err = AppError::from(elapsed);
        assert_eq!(err.code, ErrorCode::RpcTimeout);
        assert!(err.is_retryable());
        assert_eq!(err.taxonomy(), ErrorTaxonomy::Provider);
    }
}
