//! Application-wide error types.
//!
//! [`HuntyError`] covers infrastructure failures (database, HTTP, config).
//! [`RegistrationError`] is the user-facing taxonomy for wallet and ledger
//! flows: every variant renders a message that can be shown as-is, and
//! retryability is a property of the variant rather than a list of codes.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HuntyError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("XDR error: {0}")]
    Xdr(String),

    #[error("Hunt {0} not found")]
    HuntNotFound(u64),
}

pub type Result<T> = std::result::Result<T, HuntyError>;

/// Failures of the registration / transaction-submission flows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("Invalid hunt ID. Please check the hunt and try again.")]
    InvalidHuntId,

    #[error("Invalid player address. Please connect your wallet.")]
    MissingPlayerAddress,

    #[error("Invalid Stellar address format. Please check your wallet connection.")]
    MalformedPlayerAddress,

    #[error("No wallet detected. Please install Freighter or another Soroban-compatible wallet to continue.")]
    WalletNotFound,

    #[error("Unable to get your wallet address. Please ensure your wallet is connected and unlocked.")]
    WalletNotConnected,

    #[error("Unable to sign transaction. Please ensure you're using a compatible wallet like Freighter.")]
    WalletSigningFailed,

    #[error("Your wallet address doesn't match the expected address. Please reconnect your wallet.")]
    AddressMismatch,

    #[error("Transaction was cancelled. Please try again when you're ready.")]
    UserRejected,

    #[error("Your wallet account was not found on the network. Please ensure your wallet is funded.")]
    AccountNotFound,

    #[error("Unable to load your wallet account. Please check your network connection and try again.")]
    AccountLoadFailed,

    #[error("Transaction timed out. Please check your network connection and try again.")]
    TransactionTimeout,

    /// `detail` keeps the raw RPC message so callers can inspect contract errors.
    #[error("Failed to submit transaction. Please try again.")]
    SubmissionFailed { detail: String },

    #[error("Transaction was submitted but no confirmation was received. Please refresh and check your registration status.")]
    SubmissionUnconfirmed,

    #[error("Network error while checking registration status. Please check your connection and try again.")]
    NetworkError,

    #[error("Unable to check registration status: {0}")]
    QueryFailed(String),

    #[error("Registration failed: {0}. Please try again.")]
    Unexpected(String),
}

impl RegistrationError {
    /// Stable machine-readable code for this failure.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidHuntId => "INVALID_HUNT_ID",
            Self::MissingPlayerAddress | Self::MalformedPlayerAddress => "INVALID_PLAYER_ADDRESS",
            Self::WalletNotFound => "WALLET_NOT_FOUND",
            Self::WalletNotConnected => "WALLET_NOT_CONNECTED",
            Self::WalletSigningFailed => "WALLET_SIGNING_FAILED",
            Self::AddressMismatch => "ADDRESS_MISMATCH",
            Self::UserRejected => "USER_REJECTED",
            Self::AccountNotFound => "ACCOUNT_NOT_FOUND",
            Self::AccountLoadFailed => "ACCOUNT_LOAD_FAILED",
            Self::TransactionTimeout => "TRANSACTION_TIMEOUT",
            Self::SubmissionFailed { .. } | Self::SubmissionUnconfirmed => "SUBMISSION_FAILED",
            Self::NetworkError => "NETWORK_ERROR",
            Self::QueryFailed(_) => "QUERY_FAILED",
            Self::Unexpected(_) => "UNEXPECTED",
        }
    }

    /// Whether another attempt could plausibly succeed without user action.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::InvalidHuntId
                | Self::MissingPlayerAddress
                | Self::MalformedPlayerAddress
                | Self::WalletNotFound
                | Self::WalletNotConnected
                | Self::WalletSigningFailed
                | Self::AddressMismatch
                | Self::UserRejected
        )
    }

    /// Classify a raw failure message from a progress query.
    pub fn from_query_failure(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("network") || lower.contains("timeout") || lower.contains("fetch") {
            Self::NetworkError
        } else {
            Self::QueryFailed(message.to_string())
        }
    }
}

/// Errors that carry their own retry classification.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for RegistrationError {
    fn is_retryable(&self) -> bool {
        RegistrationError::is_retryable(self)
    }
}
