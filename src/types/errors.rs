use std::fmt;

// === HistoryError ===

/// Errors related to browsing history operations.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryError {
    /// No history entry matched the given identifier or URL.
    NotFound(String),
    /// Database operation failed.
    DatabaseError(String),
    /// The request was superseded by a newer one before it finished.
    Cancelled,
    /// A visit was rejected because it is missing required data.
    InvalidVisit(String),
}

impl HistoryError {
    /// Whether the error only means a newer request took over.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, HistoryError::Cancelled)
    }
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryError::NotFound(id) => write!(f, "History entry not found: {}", id),
            HistoryError::DatabaseError(msg) => write!(f, "History database error: {}", msg),
            HistoryError::Cancelled => write!(f, "History request superseded"),
            HistoryError::InvalidVisit(msg) => write!(f, "Invalid history visit: {}", msg),
        }
    }
}

impl std::error::Error for HistoryError {}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    IoError(String),
    /// Failed to serialize or deserialize settings.
    SerializationError(String),
    /// The provided settings key is invalid.
    InvalidKey(String),
    /// The provided settings value is invalid.
    InvalidValue(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::IoError(msg) => write!(f, "Settings I/O error: {}", msg),
            SettingsError::SerializationError(msg) => {
                write!(f, "Settings serialization error: {}", msg)
            }
            SettingsError::InvalidKey(key) => write!(f, "Invalid settings key: {}", key),
            SettingsError::InvalidValue(msg) => {
                write!(f, "Invalid settings value: {}", msg)
            }
        }
    }
}

impl std::error::Error for SettingsError {}
