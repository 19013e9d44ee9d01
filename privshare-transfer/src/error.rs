//! Transfer error types

use crate::network::NetworkError;
use privshare_core::PrivShareError;
use privshare_metadata::StoreError;
use thiserror::Error;

/// Errors from uploads, previews and downloads
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("No identity connected; connect a wallet before uploading")]
    NoIdentity,

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("{0}")]
    Decryption(String),

    #[error("This file is encrypted. Please provide the decryption key.")]
    MissingKey,

    #[error("Upload failed: {}", .reason.guidance(.auto_error, .fallback_error))]
    ProviderSelection {
        reason: ProviderFailure,
        auto_error: String,
        fallback_error: String,
    },

    #[error("Upload to storage provider failed: {0}")]
    Upload(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to download file from any provider after {attempts} attempts. Last error: {last_error}")]
    AllProvidersExhausted { attempts: usize, last_error: String },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, TransferError>;

impl From<PrivShareError> for TransferError {
    fn from(err: PrivShareError) -> Self {
        match err {
            PrivShareError::Encryption(_) => Self::Encryption(err.to_string()),
            PrivShareError::Decryption(_) | PrivShareError::InvalidIv(_) => {
                Self::Decryption(err.to_string())
            }
            PrivShareError::Validation(_)
            | PrivShareError::InvalidKeyLength { .. }
            | PrivShareError::Decode(_) => Self::Validation(err.to_string()),
        }
    }
}

/// Why provider negotiation failed, for user-facing guidance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFailure {
    /// Server errors or connectivity problems
    TransientNetwork,
    /// Gas estimation or on-chain transaction failure
    TransactionFailed,
    /// Provider or chain refused the identity
    AccessDenied,
    Unknown,
}

impl ProviderFailure {
    /// Classify the error from the last negotiation attempt
    pub fn classify(err: &NetworkError) -> Self {
        match err {
            NetworkError::Http { status, .. } if *status >= 500 || *status == 0 => {
                Self::TransientNetwork
            }
            NetworkError::Http { status: 401 | 403, .. } | NetworkError::AccessDenied(_) => {
                Self::AccessDenied
            }
            NetworkError::Transaction(_) => Self::TransactionFailed,
            NetworkError::Http { message, .. } | NetworkError::Other(message) => {
                Self::classify_message(message)
            }
        }
    }

    fn classify_message(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if message.contains("500") || lower.contains("internal server error") {
            Self::TransientNetwork
        } else if lower.contains("failed to estimate gas") {
            Self::TransactionFailed
        } else if lower.contains("access denied") || lower.contains("unauthorized") {
            Self::AccessDenied
        } else {
            Self::Unknown
        }
    }

    /// User-actionable explanation
    pub fn guidance(&self, auto_error: &str, fallback_error: &str) -> String {
        match self {
            Self::TransientNetwork => "Network connection issues. Please check your internet \
                connection and try again. Both providers returned server errors. This might be \
                a temporary network issue."
                .to_string(),
            Self::TransactionFailed => "Blockchain transaction failed. This might be due to \
                network congestion or insufficient gas. Please try again later."
                .to_string(),
            Self::AccessDenied => "The storage provider refused the request. Check that the \
                wallet is authorized and has a sufficient storage allowance."
                .to_string(),
            Self::Unknown => format!(
                "Both auto-selected and fallback providers failed. Auto-selected error: {}. \
                 Fallback error: {}",
                auto_error, fallback_error
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16, message: &str) -> NetworkError {
        NetworkError::Http {
            status,
            message: message.into(),
        }
    }

    #[test]
    fn test_classify_server_errors_as_transient() {
        assert_eq!(
            ProviderFailure::classify(&http(502, "bad gateway")),
            ProviderFailure::TransientNetwork
        );
        assert_eq!(
            ProviderFailure::classify(&NetworkError::Other(
                "request failed: 500 Internal Server Error".into()
            )),
            ProviderFailure::TransientNetwork
        );
    }

    #[test]
    fn test_classify_gas_failures() {
        assert_eq!(
            ProviderFailure::classify(&NetworkError::Transaction("reverted".into())),
            ProviderFailure::TransactionFailed
        );
        assert_eq!(
            ProviderFailure::classify(&NetworkError::Other(
                "failed to estimate gas: execution reverted".into()
            )),
            ProviderFailure::TransactionFailed
        );
    }

    #[test]
    fn test_classify_access_denied() {
        assert_eq!(
            ProviderFailure::classify(&http(403, "forbidden")),
            ProviderFailure::AccessDenied
        );
        assert_eq!(
            ProviderFailure::classify(&NetworkError::AccessDenied("no allowance".into())),
            ProviderFailure::AccessDenied
        );
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(
            ProviderFailure::classify(&http(409, "conflict")),
            ProviderFailure::Unknown
        );
        assert_eq!(
            ProviderFailure::classify(&NetworkError::Other("weird".into())),
            ProviderFailure::Unknown
        );
    }

    #[test]
    fn test_provider_selection_messages_are_distinct() {
        let err = |reason| TransferError::ProviderSelection {
            reason,
            auto_error: "auto boom".into(),
            fallback_error: "fallback boom".into(),
        };

        let transient = err(ProviderFailure::TransientNetwork).to_string();
        let tx = err(ProviderFailure::TransactionFailed).to_string();
        let denied = err(ProviderFailure::AccessDenied).to_string();
        let unknown = err(ProviderFailure::Unknown).to_string();

        assert!(transient.contains("Network connection issues"));
        assert!(tx.contains("insufficient gas"));
        assert!(denied.contains("refused"));
        assert!(unknown.contains("auto boom"));
        assert!(unknown.contains("fallback boom"));
        assert!(unknown.starts_with("Upload failed: "));
    }

    #[test]
    fn test_core_errors_map_to_transfer_errors() {
        let err: TransferError = PrivShareError::Decryption("bad padding".into()).into();
        assert!(matches!(err, TransferError::Decryption(_)));
        assert!(err.to_string().contains("check if the key is correct"));

        let err: TransferError = PrivShareError::Validation("too short".into()).into();
        assert!(matches!(err, TransferError::Validation(_)));
    }
}
