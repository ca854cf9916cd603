//! The forwarder specification: what the compiler is asked to build.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub mod format;
mod id;
pub mod options;
pub mod secret;
pub mod validation;

pub use format::{Format, FormatHint};
pub use id::{
    ComponentKey, format_component_id, make_id, make_input_id, make_inputs, make_output_id,
};
pub use options::Options;
pub use secret::{Secret, Secrets};

/// Input names every forwarder can reference without declaring them.
pub const RESERVED_INPUTS: [&str; 3] = ["application", "infrastructure", "audit"];

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ForwarderSpec {
    #[serde(default)]
    pub inputs: Vec<InputSpec>,
    #[serde(default)]
    pub pipelines: Vec<PipelineSpec>,
    #[serde(default)]
    pub outputs: Vec<OutputSpec>,
    #[serde(default)]
    pub secrets: Secrets,
    #[serde(default)]
    pub options: Options,
}

impl ForwarderSpec {
    pub fn output(&self, name: &str) -> Option<&OutputSpec> {
        self.outputs.iter().find(|output| output.name == name)
    }

    /// Whether `name` is declared or reserved.
    pub fn has_input(&self, name: &str) -> bool {
        RESERVED_INPUTS.contains(&name) || self.inputs.iter().any(|input| input.name == name)
    }

    /// Component IDs of every input the compiled document may consume.
    pub fn input_ids(&self) -> Vec<ComponentKey> {
        let mut ids = Vec::new();
        for name in RESERVED_INPUTS
            .iter()
            .copied()
            .chain(self.inputs.iter().map(|input| input.name.as_str()))
        {
            let id = make_input_id(name);
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct InputSpec {
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PipelineSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub input_refs: Vec<String>,
    #[serde(default)]
    pub output_refs: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OutputType {
    Http,
    Loki,
    Otlp,
}

impl OutputType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OutputType::Http => "http",
            OutputType::Loki => "loki",
            OutputType::Otlp => "otlp",
        }
    }
}

impl FromStr for OutputType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(OutputType::Http),
            "loki" => Ok(OutputType::Loki),
            "otlp" => Ok(OutputType::Otlp),
            _ => Err(format!("Unknown output type: {s}")),
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One destination. The type tag stays a string so unknown types surface as
/// a compilation error naming the output.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OutputSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<SecretRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<OutputTlsSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<Http>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loki: Option<Loki>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otlp: Option<Otlp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tuning: Option<Tuning>,
}

impl OutputSpec {
    pub fn new(name: impl Into<String>, kind: OutputType, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.as_str().to_owned(),
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn secret_name(&self) -> Option<&str> {
        self.secret
            .as_ref()
            .map(|secret| secret.name.as_str())
            .filter(|name| !name.is_empty())
    }

    /// Explicit authentication of the sub-spec matching the type tag.
    pub fn authentication(&self) -> Option<&HttpAuthentication> {
        match self.kind.parse::<OutputType>().ok()? {
            OutputType::Http => self.http.as_ref()?.authentication.as_ref(),
            OutputType::Loki => self.loki.as_ref()?.authentication.as_ref(),
            OutputType::Otlp => self.otlp.as_ref()?.authentication.as_ref(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SecretRef {
    pub name: String,
}

/// A key inside a named secret.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ValueReference {
    pub secret_name: String,
    pub key: String,
}

impl ValueReference {
    pub fn new(secret_name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            secret_name: secret_name.into(),
            key: key.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OutputTlsSpec {
    #[serde(default)]
    pub insecure_skip_verify: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca: Option<ValueReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<ValueReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<ValueReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_passphrase: Option<ValueReference>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HttpAuthentication {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<BearerToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<ValueReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<ValueReference>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "from", rename_all = "camelCase", deny_unknown_fields)]
pub enum BearerToken {
    Secret { secret: ValueReference },
    ServiceAccount,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Http {
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<HttpAuthentication>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Loki {
    #[serde(default)]
    pub label_keys: Vec<String>,
    /// Template selecting the tenant, e.g. `{.kubernetes.namespace_name||"none"}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<HttpAuthentication>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Otlp {
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<HttpAuthentication>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryMode {
    AtLeastOnce,
    AtMostOnce,
}

/// Output-agnostic delivery tuning.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Tuning {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_mode: Option<DeliveryMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<String>,
    /// Maximum batch size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_write: Option<u64>,
    /// Seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_retry_duration: Option<u64>,
    /// Seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retry_duration: Option<u64>,
}
