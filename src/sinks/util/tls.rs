use crate::{
    config::{
        ComponentKey, ValueReference,
        secret::{CA_BUNDLE, PASSPHRASE, TLS_CERT, TLS_KEY},
    },
    element::{BlockKey, BlockWriter, Element},
    sinks::{BuildError, SinkContext},
};

/// TLS settings of a sink.
///
/// Certificate material is referenced by its mounted path, never inlined.
#[derive(Clone, PartialEq, Eq)]
pub struct TlsConfig {
    sink: ComponentKey,
    min_tls_version: Option<String>,
    ciphersuites: Option<String>,
    insecure: bool,
    key_file: Option<String>,
    crt_file: Option<String>,
    ca_file: Option<String>,
    key_pass: Option<String>,
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("sink", &self.sink)
            .field("min_tls_version", &self.min_tls_version)
            .field("ciphersuites", &self.ciphersuites)
            .field("insecure", &self.insecure)
            .field("key_file", &self.key_file)
            .field("crt_file", &self.crt_file)
            .field("ca_file", &self.ca_file)
            .field("key_pass", &self.key_pass.as_ref().map(|_| "**REDACTED**"))
            .finish()
    }
}

impl TlsConfig {
    /// Settings for the output's TLS spec, `None` when the output has none or
    /// nothing would be configured.
    ///
    /// Explicit references win over the well-known keys of the output's own
    /// secret.
    pub fn build(cx: &SinkContext<'_>) -> Result<Option<Self>, BuildError> {
        let Some(spec) = cx.output.tls.as_ref() else {
            return Ok(None);
        };

        let path = |reference: Option<&ValueReference>, key: &str| match reference {
            Some(reference) => cx.resolve_path(reference),
            None => Ok(cx.output_secret_path(key)),
        };
        let key_pass = match spec.key_passphrase.as_ref() {
            Some(reference) => cx.resolve_value(reference)?,
            None => cx.output_secret_value(PASSPHRASE),
        };

        let config = Self {
            sink: cx.id.clone(),
            min_tls_version: cx.options.min_tls_version().map(str::to_owned),
            ciphersuites: cx.options.ciphers().map(str::to_owned),
            insecure: spec.insecure_skip_verify,
            key_file: path(spec.key.as_ref(), TLS_KEY)?,
            crt_file: path(spec.certificate.as_ref(), TLS_CERT)?,
            ca_file: path(spec.ca.as_ref(), CA_BUNDLE)?,
            key_pass,
        };
        if config.is_empty() {
            debug!(message = "TLS spec configures nothing, omitting section.", output = %cx.output.name);
            return Ok(None);
        }
        Ok(Some(config))
    }

    fn is_empty(&self) -> bool {
        !self.insecure
            && self.min_tls_version.is_none()
            && self.ciphersuites.is_none()
            && self.key_file.is_none()
            && self.crt_file.is_none()
            && self.ca_file.is_none()
            && self.key_pass.is_none()
    }
}

impl Element for TlsConfig {
    fn name(&self) -> &'static str {
        "tls"
    }

    fn key(&self) -> BlockKey {
        BlockKey::Section {
            sink: self.sink.clone(),
            name: "tls",
        }
    }

    fn render(&self, out: &mut BlockWriter) {
        if let Some(version) = &self.min_tls_version {
            out.string("min_tls_version", version);
        }
        if let Some(ciphers) = &self.ciphersuites {
            out.string("ciphersuites", ciphers);
        }
        if self.insecure {
            out.bool("verify_certificate", false);
            out.bool("verify_hostname", false);
        }
        if let Some(path) = &self.key_file {
            out.string("key_file", path);
        }
        if let Some(path) = &self.crt_file {
            out.string("crt_file", path);
        }
        if let Some(path) = &self.ca_file {
            out.string("ca_file", path);
        }
        if let Some(pass) = &self.key_pass {
            out.string("key_pass", pass);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{
            OutputSpec, OutputTlsSpec, OutputType, Options, Secret, SecretRef, Secrets,
            ValueReference,
            options::{CIPHERS, MIN_TLS_VERSION},
        },
        element::render_element,
    };

    fn output(tls: OutputTlsSpec) -> OutputSpec {
        let mut output = OutputSpec::new("es", OutputType::Http, "https://es.svc:9200");
        output.secret = Some(SecretRef {
            name: "es-secret".into(),
        });
        output.tls = Some(tls);
        output
    }

    fn render(output: &OutputSpec, secrets: &Secrets, options: &Options) -> Option<String> {
        let cx = SinkContext::new("output_es".into(), output, vec![], secrets, options);
        TlsConfig::build(&cx)
            .unwrap()
            .map(|tls| render_element(&tls))
    }

    #[test]
    fn absent_without_tls_spec() {
        let mut output = output(OutputTlsSpec::default());
        output.tls = None;
        let secrets = Secrets::new().with("es-secret", Secret::new().with(TLS_CERT, "pem"));
        assert_eq!(render(&output, &secrets, &Options::new()), None);
    }

    #[test]
    fn insecure_without_material() {
        let output = output(OutputTlsSpec {
            insecure_skip_verify: true,
            ..Default::default()
        });
        similar_asserts::assert_eq!(
            render(&output, &Secrets::new(), &Options::new()).unwrap(),
            indoc::indoc! {r#"
                [sinks.output_es.tls]
                verify_certificate = false
                verify_hostname = false
            "#}
        );
    }

    #[test]
    fn uses_well_known_keys_and_profile_options() {
        let output = output(OutputTlsSpec::default());
        let secrets = Secrets::new().with(
            "es-secret",
            Secret::new()
                .with(TLS_CERT, "pem")
                .with(TLS_KEY, "pem")
                .with(CA_BUNDLE, "pem")
                .with(PASSPHRASE, "open sesame"),
        );
        let options = Options::new()
            .with(MIN_TLS_VERSION, "VersionTLS12")
            .with(CIPHERS, "TLS_AES_128_GCM_SHA256");
        similar_asserts::assert_eq!(
            render(&output, &secrets, &options).unwrap(),
            indoc::indoc! {r#"
                [sinks.output_es.tls]
                min_tls_version = "VersionTLS12"
                ciphersuites = "TLS_AES_128_GCM_SHA256"
                key_file = "/var/run/ocp-collector/secrets/es-secret/tls.key"
                crt_file = "/var/run/ocp-collector/secrets/es-secret/tls.crt"
                ca_file = "/var/run/ocp-collector/secrets/es-secret/ca-bundle.crt"
                key_pass = "open sesame"
            "#}
        );
    }

    #[test]
    fn explicit_references_win() {
        let output = output(OutputTlsSpec {
            ca: Some(ValueReference::new("custom-ca", "root.pem")),
            ..Default::default()
        });
        let secrets = Secrets::new()
            .with("es-secret", Secret::new().with(CA_BUNDLE, "pem"))
            .with("custom-ca", Secret::new().with("root.pem", "pem"));
        similar_asserts::assert_eq!(
            render(&output, &secrets, &Options::new()).unwrap(),
            indoc::indoc! {r#"
                [sinks.output_es.tls]
                ca_file = "/var/run/ocp-collector/secrets/custom-ca/root.pem"
            "#}
        );
    }

    #[test]
    fn nothing_to_configure_means_no_section() {
        let output = output(OutputTlsSpec::default());
        assert_eq!(render(&output, &Secrets::new(), &Options::new()), None);
    }
}
