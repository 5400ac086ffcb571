//! API keys.
//!
//! A key is wrapped in [`ApiCredential`] as soon as it is read and is only
//! exposed where a request header is set. `Debug` and `Display` never print
//! it, so keys cannot leak through tracing fields or error chains.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};

use super::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// `api_key` in the rater's provider settings
    Settings,
    Environment,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CredentialSource::Settings => "settings",
            CredentialSource::Environment => "environment",
        })
    }
}

pub struct ApiCredential {
    value: SecretString,
    source: CredentialSource,
}

impl ApiCredential {
    pub fn new(value: impl Into<String>, source: CredentialSource) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
        }
    }

    /// The configured key, else the environment variable.
    ///
    /// Blank values count as absent in both places.
    pub fn resolve(
        configured: Option<&str>,
        env_var: &'static str,
        provider: &'static str,
    ) -> Result<Self, ProviderError> {
        if let Some(key) = configured.filter(|k| !k.trim().is_empty()) {
            return Ok(Self::new(key, CredentialSource::Settings));
        }

        std::env::var(env_var)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(|key| Self::new(key, CredentialSource::Environment))
            .ok_or(ProviderError::MissingCredential { provider, env_var })
    }

    /// The raw key. Use it to set a header and drop it.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED] ({})", self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "sk-raterbench-secret-0042";

    #[test]
    fn test_key_never_formatted() {
        let credential = ApiCredential::new(SECRET, CredentialSource::Settings);

        let debug = format!("{:?}", credential);
        let display = credential.to_string();
        assert!(!debug.contains(SECRET));
        assert!(!display.contains(SECRET));
        assert_eq!(display, "[REDACTED] (settings)");
        assert_eq!(credential.expose(), SECRET);
    }

    #[test]
    fn test_settings_key_wins_over_environment() {
        std::env::set_var("RATERBENCH_TEST_KEY_PRIORITY", "env-key");

        let credential =
            ApiCredential::resolve(Some("settings-key"), "RATERBENCH_TEST_KEY_PRIORITY", "Test").unwrap();
        assert_eq!(credential.expose(), "settings-key");
        assert_eq!(credential.source(), CredentialSource::Settings);

        std::env::remove_var("RATERBENCH_TEST_KEY_PRIORITY");
    }

    #[test]
    fn test_environment_fallback() {
        std::env::set_var("RATERBENCH_TEST_KEY_FALLBACK", "env-key");

        let credential = ApiCredential::resolve(None, "RATERBENCH_TEST_KEY_FALLBACK", "Test").unwrap();
        assert_eq!(credential.expose(), "env-key");
        assert_eq!(credential.source(), CredentialSource::Environment);

        std::env::remove_var("RATERBENCH_TEST_KEY_FALLBACK");
    }

    #[test]
    fn test_blank_keys_are_missing() {
        std::env::set_var("RATERBENCH_TEST_KEY_BLANK", "  ");

        let result = ApiCredential::resolve(Some(""), "RATERBENCH_TEST_KEY_BLANK", "Test");
        assert!(matches!(
            result,
            Err(ProviderError::MissingCredential {
                provider: "Test",
                env_var: "RATERBENCH_TEST_KEY_BLANK"
            })
        ));

        std::env::remove_var("RATERBENCH_TEST_KEY_BLANK");
    }
}
