//! Per-output-type generators.
//!
//! Each generator turns one output into an ordered list of elements: the
//! normalization stages the destination needs, the sink, and the sink's
//! sections.

use snafu::Snafu;
use url::Url;

use crate::{
    config::{
        ComponentKey, Options, OutputSpec, OutputType, Secrets, Tuning, ValueReference,
        options::{SA_TOKEN_SECRET_NAME, STRICT_VALIDATION},
        secret::secret_path,
    },
    element::Elements,
};

pub mod console;
pub mod http;
pub mod loki;
pub mod opentelemetry;
pub mod util;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum BuildError {
    #[snafu(display("Output \"{}\" has unknown type \"{}\".", output, kind))]
    UnknownOutputType { output: String, kind: String },
    #[snafu(display("Output \"{}\" has invalid URL \"{}\": {}", output, url, source))]
    InvalidUrl {
        output: String,
        url: String,
        source: url::ParseError,
    },
    #[snafu(display(
        "Output \"{}\" references key \"{}\" of secret \"{}\", which is not populated.",
        output,
        key,
        secret
    ))]
    MissingSecretKey {
        output: String,
        secret: String,
        key: String,
    },
    #[snafu(display(
        "Output \"{}\" uses the service account token but option \"{}\" is not set.",
        output,
        option
    ))]
    MissingOption {
        output: String,
        option: &'static str,
    },
}

/// Everything a generator needs to build one output.
#[derive(Debug)]
pub struct SinkContext<'a> {
    /// ID of the sink, and base of every stage ID the generator derives.
    pub id: ComponentKey,
    pub output: &'a OutputSpec,
    pub inputs: Vec<ComponentKey>,
    pub secrets: &'a Secrets,
    pub tuning: Option<&'a Tuning>,
    pub options: &'a Options,
}

impl<'a> SinkContext<'a> {
    pub fn new(
        id: ComponentKey,
        output: &'a OutputSpec,
        inputs: Vec<ComponentKey>,
        secrets: &'a Secrets,
        options: &'a Options,
    ) -> Self {
        Self {
            id,
            output,
            inputs,
            secrets,
            tuning: output.tuning.as_ref(),
            options,
        }
    }

    pub fn strict(&self) -> bool {
        self.options.strict()
    }

    /// Value of `key` in the output's own secret.
    pub fn output_secret_value(&self, key: &str) -> Option<String> {
        self.secrets.value(self.output.secret_name()?, key)
    }

    /// Mounted path of `key` in the output's own secret, if populated.
    pub fn output_secret_path(&self, key: &str) -> Option<String> {
        let name = self.output.secret_name()?;
        self.secrets
            .contains_key(name, key)
            .then(|| secret_path(name, key))
    }

    fn check_reference(&self, reference: &ValueReference) -> Result<bool, BuildError> {
        if self
            .secrets
            .contains_key(&reference.secret_name, &reference.key)
        {
            return Ok(true);
        }
        if self.strict() {
            return MissingSecretKeySnafu {
                output: self.output.name.as_str(),
                secret: reference.secret_name.as_str(),
                key: reference.key.as_str(),
            }
            .fail();
        }
        warn!(
            message = "Referenced secret key is not populated, omitting it.",
            output = %self.output.name,
            secret = %reference.secret_name,
            key = %reference.key,
        );
        Ok(false)
    }

    /// Value behind an explicit reference.
    pub fn resolve_value(&self, reference: &ValueReference) -> Result<Option<String>, BuildError> {
        Ok(if self.check_reference(reference)? {
            self.secrets.value(&reference.secret_name, &reference.key)
        } else {
            None
        })
    }

    /// Mounted path of an explicit reference.
    pub fn resolve_path(&self, reference: &ValueReference) -> Result<Option<String>, BuildError> {
        Ok(self
            .check_reference(reference)?
            .then(|| secret_path(&reference.secret_name, &reference.key)))
    }

    /// Name of the secret holding the service account token.
    pub fn service_account_secret(&self) -> Result<Option<&'a str>, BuildError> {
        match self.options.service_account_token_secret() {
            Some(name) => Ok(Some(name)),
            None if self.strict() => MissingOptionSnafu {
                output: self.output.name.as_str(),
                option: SA_TOKEN_SECRET_NAME,
            }
            .fail(),
            None => {
                warn!(
                    message = "Service account token requested but no token secret is configured.",
                    output = %self.output.name,
                    option = SA_TOKEN_SECRET_NAME,
                );
                Ok(None)
            }
        }
    }

    /// The destination URL, or `None` when it doesn't parse and the
    /// `strict-validation` option is off.
    pub fn parse_url(&self) -> Result<Option<Url>, BuildError> {
        match Url::parse(&self.output.url) {
            Ok(url) => Ok(Some(url)),
            Err(source) if self.strict() => Err(BuildError::InvalidUrl {
                output: self.output.name.clone(),
                url: self.output.url.clone(),
                source,
            }),
            Err(error) => {
                warn!(
                    message = "Malformed output URL.",
                    output = %self.output.name,
                    url = %self.output.url,
                    %error,
                    hint = STRICT_VALIDATION,
                );
                Ok(None)
            }
        }
    }
}

/// Builds the elements of one output, dispatching on its type.
pub fn build(cx: &SinkContext<'_>) -> Result<Elements, BuildError> {
    let output_type = cx
        .output
        .kind
        .parse::<OutputType>()
        .map_err(|_| BuildError::UnknownOutputType {
            output: cx.output.name.clone(),
            kind: cx.output.kind.clone(),
        })?;
    debug!(
        message = "Generating output.",
        output = %cx.output.name,
        output_type = %output_type,
        id = %cx.id,
    );
    match output_type {
        OutputType::Http => http::build(cx),
        OutputType::Loki => loki::build(cx),
        OutputType::Otlp => opentelemetry::build(cx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        Secret,
        secret::{TLS_CERT, TOKEN},
    };

    fn fixture() -> (OutputSpec, Secrets) {
        let mut output = OutputSpec::new("out", OutputType::Http, "https://example.com");
        output.secret = Some(crate::config::SecretRef {
            name: "out-secret".into(),
        });
        let secrets = Secrets::new().with("out-secret", Secret::new().with(TOKEN, "abc"));
        (output, secrets)
    }

    #[test]
    fn rejects_unknown_types() {
        let (mut output, secrets) = fixture();
        output.kind = "kafka".into();
        let options = Options::new();
        let cx = SinkContext::new("output_out".into(), &output, vec!["in".into()], &secrets, &options);
        let error = build(&cx).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Output \"out\" has unknown type \"kafka\"."
        );
    }

    #[test]
    fn resolves_output_secret_keys() {
        let (output, secrets) = fixture();
        let options = Options::new();
        let cx = SinkContext::new("output_out".into(), &output, vec![], &secrets, &options);
        assert_eq!(cx.output_secret_value(TOKEN).as_deref(), Some("abc"));
        assert_eq!(cx.output_secret_path(TLS_CERT), None);
        assert_eq!(
            cx.output_secret_path(TOKEN).as_deref(),
            Some("/var/run/ocp-collector/secrets/out-secret/token")
        );
    }

    #[test]
    fn missing_references_fail_only_when_strict() {
        let (output, secrets) = fixture();
        let reference = ValueReference::new("out-secret", "password");

        let lenient = Options::new();
        let cx = SinkContext::new("output_out".into(), &output, vec![], &secrets, &lenient);
        assert_eq!(cx.resolve_value(&reference).unwrap(), None);

        let strict = Options::new().with(STRICT_VALIDATION, "true");
        let cx = SinkContext::new("output_out".into(), &output, vec![], &secrets, &strict);
        assert!(matches!(
            cx.resolve_value(&reference),
            Err(BuildError::MissingSecretKey { .. })
        ));
    }

    #[test]
    fn malformed_urls_fail_only_when_strict() {
        let (mut output, secrets) = fixture();
        output.url = "not a url".into();

        let lenient = Options::new();
        let cx = SinkContext::new("output_out".into(), &output, vec![], &secrets, &lenient);
        assert!(cx.parse_url().unwrap().is_none());

        let strict = Options::new().with(STRICT_VALIDATION, "");
        let cx = SinkContext::new("output_out".into(), &output, vec![], &secrets, &strict);
        assert!(matches!(cx.parse_url(), Err(BuildError::InvalidUrl { .. })));
    }
}
