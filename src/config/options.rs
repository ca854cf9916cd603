use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Replace every output with a console sink.
pub const DEBUG_OUTPUT: &str = "debug-output";
/// Name of the secret holding the collector's service account token.
pub const SA_TOKEN_SECRET_NAME: &str = "service-account-token-secret-name";
pub const MIN_TLS_VERSION: &str = "min-tls-version";
pub const CIPHERS: &str = "ciphers";
/// Turn lenient degradations into compilation errors.
pub const STRICT_VALIDATION: &str = "strict-validation";

/// Generator toggles, a plain string map.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Options(BTreeMap<String, String>);

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Value of `key`, treating empty strings as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// A flag is on when set to `true` or present without a value.
    pub fn is_enabled(&self, key: &str) -> bool {
        self.0
            .get(key)
            .is_some_and(|value| value.is_empty() || value.eq_ignore_ascii_case("true"))
    }

    pub fn debug_output(&self) -> bool {
        self.is_enabled(DEBUG_OUTPUT)
    }

    pub fn strict(&self) -> bool {
        self.is_enabled(STRICT_VALIDATION)
    }

    pub fn service_account_token_secret(&self) -> Option<&str> {
        self.get(SA_TOKEN_SECRET_NAME)
    }

    pub fn min_tls_version(&self) -> Option<&str> {
        self.get(MIN_TLS_VERSION)
    }

    pub fn ciphers(&self) -> Option<&str> {
        self.get(CIPHERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_follow_presence() {
        let options = Options::new()
            .with(DEBUG_OUTPUT, "")
            .with(STRICT_VALIDATION, "False");
        assert!(options.debug_output());
        assert!(!options.strict());
        assert!(!Options::new().debug_output());
    }

    #[test]
    fn other_values_leave_flags_off() {
        for value in ["0", "no", "off", "yes"] {
            let options = Options::new().with(DEBUG_OUTPUT, value);
            assert!(!options.debug_output(), "{value:?} enabled the flag");
        }
        assert!(Options::new().with(STRICT_VALIDATION, "TRUE").strict());
    }

    #[test]
    fn empty_values_are_unset() {
        let options = Options::new()
            .with(MIN_TLS_VERSION, "")
            .with(CIPHERS, "TLS_AES_128_GCM_SHA256");
        assert_eq!(options.min_tls_version(), None);
        assert_eq!(options.ciphers(), Some("TLS_AES_128_GCM_SHA256"));
    }
}
