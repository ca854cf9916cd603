//! Grafana Loki output.
//!
//! Records are dedotted, every label field is guaranteed to exist, and the
//! sink pushes JSON lines with the label set built from the configured keys.

use std::fmt::Write as _;

use url::Url;

use crate::{
    config::{ComponentKey, Loki},
    element::{BlockKey, BlockWriter, Element, Elements, bare_or_quoted},
    sinks::{
        BuildError, SinkContext, console,
        util::{EncodingConfig, RequestConfig, push_sections},
    },
    templating::{Template, vrl_path},
    transforms::{normalize, remap::Remap},
};

pub const DEFAULT_LABEL_KEYS: [&str; 4] = [
    "log_type",
    "kubernetes.container_name",
    "kubernetes.namespace_name",
    "kubernetes.pod_name",
];

/// Label resolved from the collector's environment rather than the record.
pub const HOST_LABEL: &str = "kubernetes.host";
pub const REQUIRED_LABEL_KEYS: [&str; 1] = [HOST_LABEL];
pub const NODE_NAME: &str = "${VECTOR_SELF_NODE_NAME}";

/// Record field holding collector-private values, never encoded.
pub const INTERNAL_FIELD: &str = "_internal";
pub const TENANT_FIELD: &str = "_internal.tenant_id";

/// Record keys turned into Loki stream labels.
///
/// Without configured keys the defaults are used; the required keys are
/// always present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LokiLabels {
    keys: Vec<String>,
}

impl LokiLabels {
    pub fn new(spec: Option<&Loki>) -> Self {
        let configured = spec.map(|loki| loki.label_keys.as_slice()).unwrap_or_default();
        let keys = if configured.is_empty() {
            let mut keys: Vec<String> = DEFAULT_LABEL_KEYS
                .iter()
                .chain(REQUIRED_LABEL_KEYS.iter())
                .map(|key| (*key).to_owned())
                .collect();
            keys.sort();
            keys
        } else {
            let mut keys = configured.to_vec();
            for required in REQUIRED_LABEL_KEYS {
                if !keys.iter().any(|key| key == required) {
                    keys.push(required.to_owned());
                }
            }
            keys
        };
        Self { keys }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// `(label name, value template)` pairs in key order. Values read the
    /// record path left by the dedot stage.
    pub fn labels(&self) -> Vec<(String, String)> {
        self.keys
            .iter()
            .map(|key| {
                let value = if key == HOST_LABEL {
                    NODE_NAME.to_owned()
                } else {
                    format!("{{{{{}}}}}", normalize::dedotted_path(key))
                };
                (normalize::dedot_key(key), value)
            })
            .collect()
    }
}

/// Defaults every label field to an empty string and copies a dynamic
/// tenant into the internal field.
pub fn remap_label_script(labels: &LokiLabels, tenant: Option<&Template>) -> String {
    let mut script = String::new();
    for key in labels.keys().iter().filter(|key| *key != HOST_LABEL) {
        let path = vrl_path(&normalize::dedotted_path(key));
        writeln!(script, "if !exists({path}) {{\n  {path} = \"\"\n}}")
            .expect("write to String never fails");
    }
    if let Some(tenant) = tenant.filter(|tenant| tenant.is_dynamic()) {
        writeln!(script, "{} = {}", vrl_path(TENANT_FIELD), tenant.to_vrl())
            .expect("write to String never fails");
    }
    script
}

/// `scheme://host[:port]` of the destination.
pub fn endpoint(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    }
}

/// The tenant: a static template is used as is, a dynamic one reads the
/// internal field, otherwise the URL path names it.
pub fn tenant_id(tenant: Option<&Template>, url: Option<&Url>) -> Option<String> {
    match tenant {
        Some(tenant) if tenant.is_dynamic() => Some(format!("{{{{ {} }}}}", TENANT_FIELD)),
        Some(tenant) if !tenant.get_ref().is_empty() => Some(tenant.get_ref().to_owned()),
        _ => url
            .map(|url| url.path().trim_matches('/'))
            .filter(|path| !path.is_empty())
            .map(str::to_owned),
    }
}

#[derive(Clone, Debug)]
pub struct LokiSink {
    id: ComponentKey,
    inputs: Vec<ComponentKey>,
    endpoint: String,
    tenant_id: Option<String>,
    compression: Option<String>,
}

impl Element for LokiSink {
    fn name(&self) -> &'static str {
        "loki"
    }

    fn key(&self) -> BlockKey {
        BlockKey::Sink(self.id.clone())
    }

    fn inputs(&self) -> &[ComponentKey] {
        &self.inputs
    }

    fn render(&self, out: &mut BlockWriter) {
        out.string("type", "loki");
        out.inputs(&self.inputs);
        out.string("endpoint", &self.endpoint);
        out.string("out_of_order_action", "accept");
        out.bool("healthcheck.enabled", false);
        if let Some(tenant) = &self.tenant_id {
            out.string("tenant_id", tenant);
        }
        if let Some(compression) = &self.compression {
            out.string("compression", compression);
        }
    }
}

/// The `labels` section of the Loki sink.
#[derive(Clone, Debug)]
pub struct LabelsConfig {
    sink: ComponentKey,
    labels: Vec<(String, String)>,
}

impl Element for LabelsConfig {
    fn name(&self) -> &'static str {
        "labels"
    }

    fn key(&self) -> BlockKey {
        BlockKey::Section {
            sink: self.sink.clone(),
            name: "labels",
        }
    }

    fn render(&self, out: &mut BlockWriter) {
        for (name, value) in &self.labels {
            out.string(&bare_or_quoted(name), value);
        }
    }
}

pub fn build(cx: &SinkContext<'_>) -> Result<Elements, BuildError> {
    if cx.options.debug_output() {
        return Ok(console::debug(cx));
    }
    let spec = cx.output.loki.as_ref();
    let url = cx.parse_url()?;
    let labels = LokiLabels::new(spec);
    let tenant = spec
        .and_then(|loki| loki.tenant_key.as_deref())
        .map(Template::parse);

    let dedot_id = cx.id.join("dedot");
    let remap_id = cx.id.join("remap_label");

    let sink = LokiSink {
        id: cx.id.clone(),
        inputs: vec![remap_id.clone()],
        endpoint: url.as_ref().map(endpoint).unwrap_or_default(),
        tenant_id: tenant_id(tenant.as_ref(), url.as_ref()),
        compression: cx.tuning.and_then(|t| t.compression.clone()),
    };
    let mut elements: Elements = vec![
        Box::new(normalize::dedot_labels(dedot_id.clone(), cx.inputs.clone())),
        Box::new(Remap::new(
            remap_id,
            vec![dedot_id],
            remap_label_script(&labels, tenant.as_ref()),
        )),
        Box::new(sink),
        Box::new(EncodingConfig::json(&cx.id).except_fields([INTERNAL_FIELD])),
        Box::new(LabelsConfig {
            sink: cx.id.clone(),
            labels: labels.labels(),
        }),
    ];
    push_sections(&mut elements, cx, RequestConfig::new(&cx.id, cx.tuning))?;
    Ok(elements)
}
