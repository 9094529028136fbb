//! Error types for xbot

use thiserror::Error;

pub type Result<T> = std::result::Result<T, XbotError>;

#[derive(Error, Debug)]
pub enum XbotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Social API error: {0}")]
    Social(#[from] SocialError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl XbotError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            XbotError::InvalidInput(_) => 3,
            XbotError::Social(SocialError::Unauthorized(_)) => 2,
            XbotError::Config(ConfigError::MissingCredential(_)) => 2,
            XbotError::Social(_) => 1,
            XbotError::Config(_) => 1,
            XbotError::Llm(_) => 1,
            XbotError::Storage(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Missing required credential {0} (set it in the environment or .env)")]
    MissingCredential(String),
}

/// How a failed call should be treated by a long-running loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Stop the affected loop; retrying cannot help
    Terminal,
    /// Back off for the long rate-limit window, then resume
    RateLimit,
    /// Skip or back off briefly, then continue
    Transient,
}

#[derive(Error, Debug, Clone)]
pub enum SocialError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API request failed: {0}")]
    Api(String),
}

impl SocialError {
    pub fn kind(&self) -> FailureKind {
        match self {
            SocialError::Unauthorized(_) => FailureKind::Terminal,
            SocialError::RateLimited(_) => FailureKind::RateLimit,
            SocialError::Forbidden(_) | SocialError::Network(_) | SocialError::Api(_) => {
                FailureKind::Transient
            }
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum LlmError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("API returned an error: {0}")]
    Api(String),

    #[error("Response contained no text")]
    EmptyResponse,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing column in CSV: {0}")]
    MissingColumn(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_invalid_input() {
        let error = XbotError::InvalidInput("Empty keyword list".to_string());
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_unauthorized() {
        let error = XbotError::Social(SocialError::Unauthorized("bad token".to_string()));
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_missing_credential() {
        let error = XbotError::Config(ConfigError::MissingCredential("BEARER_TOKEN".to_string()));
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_other_errors() {
        assert_eq!(
            XbotError::Social(SocialError::RateLimited("slow down".to_string())).exit_code(),
            1
        );
        assert_eq!(
            XbotError::Social(SocialError::Forbidden("nope".to_string())).exit_code(),
            1
        );
        assert_eq!(XbotError::Llm(LlmError::EmptyResponse).exit_code(), 1);
        assert_eq!(
            XbotError::Storage(StorageError::MissingColumn("Tweet Text".to_string())).exit_code(),
            1
        );
    }

    #[test]
    fn test_failure_kind_mapping() {
        assert_eq!(
            SocialError::Unauthorized("x".to_string()).kind(),
            FailureKind::Terminal
        );
        assert_eq!(
            SocialError::RateLimited("x".to_string()).kind(),
            FailureKind::RateLimit
        );
        assert_eq!(
            SocialError::Forbidden("x".to_string()).kind(),
            FailureKind::Transient
        );
        assert_eq!(
            SocialError::Network("x".to_string()).kind(),
            FailureKind::Transient
        );
        assert_eq!(SocialError::Api("x".to_string()).kind(), FailureKind::Transient);
    }

    #[test]
    fn test_error_message_formatting() {
        let error = XbotError::Social(SocialError::Unauthorized("Invalid token".to_string()));
        assert_eq!(
            error.to_string(),
            "Social API error: Unauthorized: Invalid token"
        );

        let error = XbotError::Storage(StorageError::MissingColumn("Tweet Text".to_string()));
        assert_eq!(
            error.to_string(),
            "Storage error: Missing column in CSV: Tweet Text"
        );
    }

    #[test]
    fn test_error_conversion_from_social_error() {
        let social_error = SocialError::Api("boom".to_string());
        let error: XbotError = social_error.into();

        match error {
            XbotError::Social(_) => {}
            _ => panic!("Expected XbotError::Social"),
        }
    }

    #[test]
    fn test_social_error_clone() {
        let original = SocialError::Network("Connection reset".to_string());
        let cloned = original.clone();

        assert_eq!(original.to_string(), cloned.to_string());
    }
}
