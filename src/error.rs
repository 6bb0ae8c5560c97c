//! Error types for FitLink.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Failure classes reported by the account-creation collaborator.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Email {email} is already registered")]
    EmailInUse { email: String },

    #[error("Password rejected as too weak")]
    WeakPassword,

    #[error("Email address rejected by the auth service")]
    InvalidEmail,

    #[error("Account creation failed: {0}")]
    Failed(String),
}

impl AccountError {
    /// Message shown to the user on the credentials step.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::EmailInUse { .. } => "This email is already in use. Try signing in instead.",
            Self::WeakPassword => "Password is too weak. Use at least 6 characters.",
            Self::InvalidEmail => "Please enter a valid email address.",
            Self::Failed(_) => "Could not create your account. Please try again.",
        }
    }
}

impl From<DatabaseError> for AccountError {
    fn from(e: DatabaseError) -> Self {
        Self::Failed(e.to_string())
    }
}

/// Failure classes reported by the record-lookup collaborator.
///
/// Permission failures are kept apart from transport failures so that a
/// misconfigured access rule is distinguishable from a flaky network.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Permission denied on collection {collection}")]
    PermissionDenied { collection: String },

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Backend failure: {0}")]
    Backend(String),
}

impl From<DatabaseError> for LookupError {
    fn from(e: DatabaseError) -> Self {
        Self::Backend(e.to_string())
    }
}

/// Daily tracking and meal plan errors.
#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Unknown chart window: {0}")]
    UnknownWindow(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}
