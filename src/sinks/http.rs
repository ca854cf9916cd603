use crate::{
    config::ComponentKey,
    element::{BlockKey, BlockWriter, Element, Elements},
    sinks::{
        BuildError, SinkContext, console,
        util::{EncodingConfig, RequestConfig, push_sections},
    },
    transforms::normalize,
};

pub const DEFAULT_METHOD: &str = "post";

/// A generic HTTP sink posting JSON records.
#[derive(Clone, Debug)]
pub struct HttpSink {
    id: ComponentKey,
    inputs: Vec<ComponentKey>,
    uri: String,
    method: String,
    compression: Option<String>,
}

impl HttpSink {
    pub fn new(id: ComponentKey, inputs: Vec<ComponentKey>, uri: impl Into<String>) -> Self {
        Self {
            id,
            inputs,
            uri: uri.into(),
            method: DEFAULT_METHOD.to_owned(),
            compression: None,
        }
    }

    pub fn with_method(mut self, method: Option<&str>) -> Self {
        if let Some(method) = method.filter(|m| !m.is_empty()) {
            self.method = method.to_lowercase();
        }
        self
    }

    pub fn with_compression(mut self, compression: Option<&str>) -> Self {
        self.compression = compression.map(str::to_owned);
        self
    }
}

impl Element for HttpSink {
    fn name(&self) -> &'static str {
        "http"
    }

    fn key(&self) -> BlockKey {
        BlockKey::Sink(self.id.clone())
    }

    fn inputs(&self) -> &[ComponentKey] {
        &self.inputs
    }

    fn render(&self, out: &mut BlockWriter) {
        out.string("type", "http");
        out.inputs(&self.inputs);
        out.string("uri", &self.uri);
        out.string("method", &self.method);
        if let Some(compression) = &self.compression {
            out.string("compression", compression);
        }
    }
}

/// Drops the file path, dedots labels and posts JSON to the output URL.
pub fn build(cx: &SinkContext<'_>) -> Result<Elements, BuildError> {
    if cx.options.debug_output() {
        return Ok(console::debug(cx));
    }
    // Only checked in strict mode, the URL is passed through as given.
    cx.parse_url()?;

    let spec = cx.output.http.as_ref();
    let normalize_id = cx.id.join("normalize");
    let dedot_id = cx.id.join("dedot");

    let mut elements: Elements = vec![
        Box::new(normalize::drop_file(
            normalize_id.clone(),
            cx.inputs.clone(),
        )),
        Box::new(normalize::dedot_labels(dedot_id.clone(), vec![normalize_id])),
        Box::new(
            HttpSink::new(cx.id.clone(), vec![dedot_id], cx.output.url.as_str())
                .with_method(spec.and_then(|http| http.method.as_deref()))
                .with_compression(cx.tuning.and_then(|t| t.compression.as_deref())),
        ),
        Box::new(EncodingConfig::json(&cx.id)),
    ];

    let mut request = RequestConfig::new(&cx.id, cx.tuning);
    if let Some(http) = spec {
        request = request.timeout(http.timeout).headers(&http.headers);
    }
    push_sections(&mut elements, cx, request)?;
    Ok(elements)
}
