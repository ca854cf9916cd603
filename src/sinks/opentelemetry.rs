//! OTLP/HTTP JSON output.
//!
//! Records are routed by origin, rewritten into OTLP log records, grouped
//! per container or per node, and framed as one `resourceLogs` payload per
//! request.

use crate::{
    config::ComponentKey,
    element::{BlockKey, BlockWriter, Element, Elements},
    sinks::{
        BuildError, SinkContext, console,
        util::{RequestConfig, push_sections},
    },
    transforms::{
        normalize,
        otel::{self, CONTAINER_BRANCH, JOURNAL_BRANCH},
    },
};

pub const CONTENT_TYPE: &str = "Content-Type";
pub const JSON_CONTENT: &str = "application/json";
pub const PAYLOAD_PREFIX: &str = "{\"resourceLogs\":";
pub const PAYLOAD_SUFFIX: &str = "}";

#[derive(Clone, Debug)]
pub struct OtlpSink {
    id: ComponentKey,
    inputs: Vec<ComponentKey>,
    uri: String,
    compression: Option<String>,
}

impl Element for OtlpSink {
    fn name(&self) -> &'static str {
        "otlp"
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
        out.string("method", "post");
        out.string("payload_prefix", PAYLOAD_PREFIX);
        out.string("payload_suffix", PAYLOAD_SUFFIX);
        out.string("encoding.codec", "json");
        if let Some(compression) = &self.compression {
            out.string("compression", compression);
        }
    }
}

pub fn build(cx: &SinkContext<'_>) -> Result<Elements, BuildError> {
    if cx.options.debug_output() {
        return Ok(console::debug(cx));
    }
    cx.parse_url()?;

    let dedot_id = cx.id.join("dedot");
    let reroute = otel::route_by_origin(cx.id.join("reroute"), vec![dedot_id.clone()]);
    let container_id = cx.id.join("pre_otlp_container");
    let journal_id = cx.id.join("pre_otlp_journal");
    let group_container_id = cx.id.join("group_by_container");
    let group_node_id = cx.id.join("group_by_node");
    let post_id = cx.id.join("post_otlp");

    let container = otel::transform_container(
        container_id.clone(),
        vec![reroute.branch(CONTAINER_BRANCH)],
    );
    let journal = otel::transform_journal(journal_id.clone(), vec![reroute.branch(JOURNAL_BRANCH)]);

    let mut elements: Elements = vec![
        Box::new(normalize::dedot_labels(dedot_id, cx.inputs.clone())),
        Box::new(reroute),
        Box::new(container),
        Box::new(otel::group_by_container(
            group_container_id.clone(),
            vec![container_id],
        )),
        Box::new(journal),
        Box::new(otel::group_by_node(group_node_id.clone(), vec![journal_id])),
        Box::new(otel::format_batch(
            post_id.clone(),
            vec![group_container_id, group_node_id],
        )),
        Box::new(OtlpSink {
            id: cx.id.clone(),
            inputs: vec![post_id],
            uri: cx.output.url.clone(),
            compression: cx.tuning.and_then(|t| t.compression.clone()),
        }),
    ];

    let mut request = RequestConfig::new(&cx.id, cx.tuning);
    if let Some(otlp) = cx.output.otlp.as_ref() {
        request = request.timeout(otlp.timeout).headers(&otlp.headers);
    }
    let request = request.require_header(CONTENT_TYPE, JSON_CONTENT);
    push_sections(&mut elements, cx, request)?;
    Ok(elements)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{
        config::{Options, OutputSpec, OutputType, Otlp, Secrets},
        element::render_element,
    };

    fn build_otlp(output: &OutputSpec) -> Elements {
        let secrets = Secrets::new();
        let options = Options::new();
        let cx = SinkContext::new(
            "otel_collector".into(),
            output,
            vec!["application".into()],
            &secrets,
            &options,
        );
        build(&cx).unwrap()
    }

    #[test]
    fn fans_out_and_merges() {
        let output = OutputSpec::new("otel-collector", OutputType::Otlp, "http://localhost:4318/v1/logs");
        let elements = build_otlp(&output);
        let wiring: Vec<_> = elements
            .iter()
            .map(|element| {
                let inputs: Vec<_> = element.inputs().iter().map(ToString::to_string).collect();
                (element.key().to_string(), inputs.join(","))
            })
            .collect();
        let expected = [
            ("transforms.otel_collector_dedot", "application"),
            ("transforms.otel_collector_reroute", "otel_collector_dedot"),
            (
                "transforms.otel_collector_pre_otlp_container",
                "otel_collector_reroute.container",
            ),
            (
                "transforms.otel_collector_group_by_container",
                "otel_collector_pre_otlp_container",
            ),
            (
                "transforms.otel_collector_pre_otlp_journal",
                "otel_collector_reroute.journal",
            ),
            (
                "transforms.otel_collector_group_by_node",
                "otel_collector_pre_otlp_journal",
            ),
            (
                "transforms.otel_collector_post_otlp",
                "otel_collector_group_by_container,otel_collector_group_by_node",
            ),
            ("sinks.otel_collector", "otel_collector_post_otlp"),
            ("sinks.otel_collector.request", ""),
        ];
        let expected: Vec<_> = expected
            .iter()
            .map(|(key, inputs)| ((*key).to_owned(), (*inputs).to_owned()))
            .collect();
        assert_eq!(wiring, expected);
    }

    #[test]
    fn renders_sink_and_request() {
        let mut output = OutputSpec::new("otel-collector", OutputType::Otlp, "http://localhost:4318/v1/logs");
        output.otlp = Some(Otlp {
            headers: BTreeMap::from([
                ("content-type".to_owned(), "text/plain".to_owned()),
                ("X-Tenant".to_owned(), "team-a".to_owned()),
            ]),
            timeout: Some(10),
            authentication: None,
        });
        let elements = build_otlp(&output);
        let tail: Vec<_> = elements[7..]
            .iter()
            .map(|element| render_element(element.as_ref()))
            .collect();
        similar_asserts::assert_eq!(
            tail.join("\n"),
            indoc::indoc! {r#"
                [sinks.otel_collector]
                type = "http"
                inputs = ["otel_collector_post_otlp"]
                uri = "http://localhost:4318/v1/logs"
                method = "post"
                payload_prefix = "{\"resourceLogs\":"
                payload_suffix = "}"
                encoding.codec = "json"

                [sinks.otel_collector.request]
                timeout_secs = 10
                headers = {"Content-Type"="application/json","X-Tenant"="team-a"}
            "#}
        );
    }

    #[test]
    fn describes_each_stage() {
        let output = OutputSpec::new("otel-collector", OutputType::Otlp, "http://localhost:4318/v1/logs");
        let elements = build_otlp(&output);
        let rendered = render_element(elements[1].as_ref());
        similar_asserts::assert_eq!(
            rendered,
            indoc::indoc! {r#"
                # Route container logs and journal logs separately
                [transforms.otel_collector_reroute]
                type = "route"
                inputs = ["otel_collector_dedot"]
                route.container = 'exists(.kubernetes)'
                route.journal = '!exists(.kubernetes)'
            "#}
        );
        assert_eq!(
            elements[6].description(),
            Some("Remap to match OTEL protocol")
        );
    }
}
