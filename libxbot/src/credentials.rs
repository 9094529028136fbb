//! API credentials loaded from the environment
//!
//! Values come from process environment variables, optionally seeded from a
//! `.env` file in the working directory. Every value is held as a
//! [`SecretString`] so it is zeroed on drop and never printed by `Debug`.

use secrecy::SecretString;

use crate::error::{ConfigError, Result};

pub const API_KEY: &str = "API_KEY";
pub const API_KEY_SECRET: &str = "API_KEY_SECRET";
pub const ACCESS_TOKEN: &str = "ACCESS_TOKEN";
pub const ACCESS_TOKEN_SECRET: &str = "ACCESS_TOKEN_SECRET";
pub const BEARER_TOKEN: &str = "BEARER_TOKEN";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const LLM_SECRET_WORD: &str = "LLM_SECRET_WORD";

/// OAuth 1.0a user-context keys plus the app-only bearer token
#[derive(Debug, Clone)]
pub struct XCredentials {
    pub consumer_key: SecretString,
    pub consumer_secret: SecretString,
    pub access_token: SecretString,
    pub access_token_secret: SecretString,
    pub bearer_token: SecretString,
}

#[derive(Debug, Clone)]
pub struct LlmCredentials {
    pub api_key: SecretString,
    /// Shared-secret token that must appear in gated LLM requests
    pub secret_word: SecretString,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub x: XCredentials,
    pub llm: LlmCredentials,
}

impl Credentials {
    /// Load all credentials, reading `.env` first if present
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingCredential` naming the first variable that
    /// is unset or blank.
    pub fn from_env() -> Result<Self> {
        if dotenv::dotenv().is_ok() {
            tracing::debug!("Loaded environment from .env");
        }

        Ok(Self {
            x: XCredentials {
                consumer_key: required(API_KEY)?,
                consumer_secret: required(API_KEY_SECRET)?,
                access_token: required(ACCESS_TOKEN)?,
                access_token_secret: required(ACCESS_TOKEN_SECRET)?,
                bearer_token: required(BEARER_TOKEN)?,
            },
            llm: LlmCredentials {
                api_key: required(OPENAI_API_KEY)?,
                secret_word: required(LLM_SECRET_WORD)?,
            },
        })
    }
}

fn required(name: &str) -> Result<SecretString> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(SecretString::from(value.trim().to_string())),
        _ => Err(ConfigError::MissingCredential(name.to_string()).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;

    const ALL: [&str; 7] = [
        API_KEY,
        API_KEY_SECRET,
        ACCESS_TOKEN,
        ACCESS_TOKEN_SECRET,
        BEARER_TOKEN,
        OPENAI_API_KEY,
        LLM_SECRET_WORD,
    ];

    fn set_all() {
        for name in ALL {
            std::env::set_var(name, format!("value-for-{}", name.to_lowercase()));
        }
    }

    fn clear_all() {
        for name in ALL {
            std::env::remove_var(name);
        }
    }

    #[test]
    #[serial]
    fn test_loads_all_credentials() {
        set_all();

        let creds = Credentials::from_env().unwrap();
        assert_eq!(creds.x.consumer_key.expose_secret(), "value-for-api_key");
        assert_eq!(
            creds.llm.secret_word.expose_secret(),
            "value-for-llm_secret_word"
        );
        assert_eq!(creds.x.bearer_token.expose_secret(), "value-for-bearer_token");

        clear_all();
    }

    #[test]
    #[serial]
    fn test_missing_credential_is_named() {
        set_all();
        std::env::remove_var(BEARER_TOKEN);

        let err = Credentials::from_env().unwrap_err();
        assert!(err.to_string().contains("BEARER_TOKEN"));
        assert_eq!(err.exit_code(), 2);

        clear_all();
    }

    #[test]
    #[serial]
    fn test_blank_credential_is_missing() {
        set_all();
        std::env::set_var(LLM_SECRET_WORD, "   ");

        let err = Credentials::from_env().unwrap_err();
        assert!(err.to_string().contains("LLM_SECRET_WORD"));

        clear_all();
    }

    #[test]
    #[serial]
    fn test_debug_output_hides_secrets() {
        set_all();

        let creds = Credentials::from_env().unwrap();
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("value-for-api_key"));

        clear_all();
    }
}
