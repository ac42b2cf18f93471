use thiserror::Error;

#[derive(Error, Debug)]
pub enum BoardError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Authentication failed: {message}")]
    AuthError { message: String },

    #[error("Store write failed: {message}")]
    StoreError { message: String },

    #[error("Subscription error: {message}")]
    SubscriptionError { message: String },
}

/// 對應使用者可見的錯誤狀態 (欄位錯誤另由 FieldErrors 表示)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Initialization,
    Subscription,
    Write,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BoardError {
    pub fn auth(message: impl Into<String>) -> Self {
        Self::AuthError {
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::StoreError {
            message: message.into(),
        }
    }

    pub fn subscription(message: impl Into<String>) -> Self {
        Self::SubscriptionError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            BoardError::AuthError { .. } => ErrorCategory::Initialization,
            BoardError::SubscriptionError { .. } => ErrorCategory::Subscription,
            // 網路錯誤多半發生在寫入或輪詢時，呼叫端會再依情境轉換
            BoardError::StoreError { .. } | BoardError::ApiError(_) => ErrorCategory::Write,
            BoardError::MissingConfigError { .. }
            | BoardError::InvalidConfigValueError { .. }
            | BoardError::TomlError(_) => ErrorCategory::Configuration,
            BoardError::CsvError(_) | BoardError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Subscription => ErrorSeverity::Low,
            ErrorCategory::Write => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Initialization | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Initialization => {
                "Failed to authenticate. Please try again later.".to_string()
            }
            ErrorCategory::Subscription => {
                "Live registration counts are unavailable right now.".to_string()
            }
            ErrorCategory::Write => "Failed to register. Please try again.".to_string(),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::System => format!("Unexpected error: {}", self),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Initialization => {
                "Check network access and the firebase api_key / auth_endpoint settings"
            }
            ErrorCategory::Subscription => {
                "Registration still works; the board refreshes once the store is reachable"
            }
            ErrorCategory::Write => "Your entries were kept, submit again",
            ErrorCategory::Configuration => "Fix the configuration file and restart",
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }
}

pub type Result<T> = std::result::Result<T, BoardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_follow_user_facing_states() {
        assert_eq!(
            BoardError::auth("unreachable").category(),
            ErrorCategory::Initialization
        );
        assert_eq!(
            BoardError::store("permission denied").category(),
            ErrorCategory::Write
        );
        assert_eq!(
            BoardError::subscription("stream closed").category(),
            ErrorCategory::Subscription
        );
        assert_eq!(
            BoardError::MissingConfigError {
                field: "firebase.api_key".to_string()
            }
            .category(),
            ErrorCategory::Configuration
        );
    }

    #[test]
    fn test_write_failure_message_is_generic_retry() {
        let err = BoardError::store("HTTP 403");
        assert_eq!(
            err.user_friendly_message(),
            "Failed to register. Please try again."
        );
        assert_eq!(err.severity(), ErrorSeverity::Medium);
    }

    #[test]
    fn test_auth_failure_is_critical() {
        assert_eq!(
            BoardError::auth("boom").severity(),
            ErrorSeverity::Critical
        );
    }
}
