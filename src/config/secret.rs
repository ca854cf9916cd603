//! Secret material available to the compiler.
//!
//! The compiler never embeds file contents for certificates and keys, it only
//! decides whether a key is populated and refers to the file the collector
//! mounts for it. Credentials such as tokens and passwords are rendered inline.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const USERNAME: &str = "username";
pub const PASSWORD: &str = "password";
pub const TOKEN: &str = "token";
pub const TLS_CERT: &str = "tls.crt";
pub const TLS_KEY: &str = "tls.key";
pub const CA_BUNDLE: &str = "ca-bundle.crt";
pub const PASSPHRASE: &str = "passphrase";

/// Directory the collector mounts output secrets under.
pub const SECRETS_DIR: &str = "/var/run/ocp-collector/secrets";

/// Path of the file holding `key` of secret `name` inside the collector.
pub fn secret_path(name: &str, key: &str) -> String {
    format!("{SECRETS_DIR}/{name}/{key}")
}

/// One named secret: a map from key to opaque bytes.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret {
    data: BTreeMap<String, Vec<u8>>,
}

impl Secret {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Bytes stored under `key`. Empty values count as absent.
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.data
            .get(key)
            .map(Vec::as_slice)
            .filter(|value| !value.is_empty())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(|value| String::from_utf8_lossy(value).into_owned())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.data.keys()).finish()
    }
}

impl Serialize for Secret {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(
            self.data
                .iter()
                .map(|(key, value)| (key, String::from_utf8_lossy(value))),
        )
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let data = BTreeMap::<String, String>::deserialize(deserializer)?
            .into_iter()
            .map(|(key, value)| (key, value.into_bytes()))
            .collect();
        Ok(Self { data })
    }
}

/// Snapshot of every secret the forwarder spec can reference, by name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Secrets(BTreeMap<String, Secret>);

impl Secrets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, secret: Secret) -> Self {
        self.0.insert(name.into(), secret);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Secret> {
        self.0.get(name)
    }

    pub fn contains_key(&self, name: &str, key: &str) -> bool {
        self.get(name).is_some_and(|secret| secret.contains(key))
    }

    pub fn value(&self, name: &str, key: &str) -> Option<String> {
        self.get(name).and_then(|secret| secret.get_string(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_values_are_absent() {
        let secret = Secret::new().with(TOKEN, "").with(USERNAME, "admin");
        assert!(!secret.contains(TOKEN));
        assert_eq!(secret.get_string(USERNAME).as_deref(), Some("admin"));
    }

    #[test]
    fn deserializes_string_values_to_bytes() {
        let secrets: Secrets = serde_json::from_str(
            r#"{"es-secret": {"tls.crt": "-----BEGIN", "password": "s3cr3t"}}"#,
        )
        .unwrap();
        assert!(secrets.contains_key("es-secret", TLS_CERT));
        assert!(!secrets.contains_key("es-secret", TLS_KEY));
        assert!(!secrets.contains_key("missing", TLS_CERT));
        assert_eq!(
            secrets.value("es-secret", PASSWORD).as_deref(),
            Some("s3cr3t")
        );
    }

    #[test]
    fn debug_output_hides_values() {
        let secret = Secret::new().with(PASSWORD, "hunter2");
        let debug = format!("{secret:?}");
        assert!(debug.contains("password"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn builds_mounted_paths() {
        assert_eq!(
            secret_path("http-receiver", TLS_KEY),
            "/var/run/ocp-collector/secrets/http-receiver/tls.key"
        );
    }
}
