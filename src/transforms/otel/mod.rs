//! Stages converting collector records into OTLP log records.
//!
//! Container and journal records are rewritten by the same script builder,
//! driven by a [`SchemaTables`] per record origin. The tables are plain data
//! so [`crate::preview`] can evaluate them without running VRL.

use std::fmt::Write as _;

use indexmap::IndexMap;

use super::{
    reduce::{MergeStrategy, Reduce},
    remap::Remap,
    route::Route,
};
use crate::{config::ComponentKey, element::quote, templating::vrl_path};

pub mod severity;

pub use severity::SeverityTable;

pub const CONTAINER_BRANCH: &str = "container";
pub const JOURNAL_BRANCH: &str = "journal";

pub const CONTAINER_GROUP_BY: [&str; 3] = [
    ".kubernetes.namespace_name",
    ".kubernetes.pod_name",
    ".kubernetes.container_name",
];
pub const NODE_GROUP_BY: [&str; 1] = [".hostname"];

/// Field holding the resource of a rewritten record, merged with `retain`.
pub const RESOURCE_FIELD: &str = "resource";
/// Field holding the log record of a rewritten record, merged with `array`.
pub const LOG_RECORDS_FIELD: &str = "logRecords";

pub const FORMAT_BATCH: &str = r#". = {
  "resource": {
    "attributes": .resource.attributes
  },
  "scopeLogs": [
    {"logRecords": .logRecords}
  ]
}"#;

/// One comparison of a record field against a string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldTest {
    pub path: String,
    pub equals: bool,
    pub value: String,
}

impl FieldTest {
    pub fn eq(path: &str, value: &str) -> Self {
        Self {
            path: path.to_owned(),
            equals: true,
            value: value.to_owned(),
        }
    }

    pub fn ne(path: &str, value: &str) -> Self {
        Self {
            equals: false,
            ..Self::eq(path, value)
        }
    }

    fn to_vrl(&self) -> String {
        let op = if self.equals { "==" } else { "!=" };
        format!("{} {} {}", vrl_path(&self.path), op, quote(&self.value))
    }
}

/// Declarative description of one record-origin rewrite.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaTables {
    /// Records failing any test pass through unchanged.
    pub gate: Vec<FieldTest>,
    /// Prefix of every attribute derived from `meta`.
    pub prefix: String,
    /// Dotted record paths copied into resource attributes.
    pub meta: Vec<String>,
    /// Attribute sub-key renames, applied after the default derivation.
    pub replace: IndexMap<String, String>,
    /// Lowercase sub-keys that `replace` does not rename.
    pub downcase_unmatched: bool,
    /// Attribute prefix for the flattened `.kubernetes.labels` map.
    pub labels_prefix: Option<String>,
    /// Extra attributes, key to dotted record path.
    pub attributes: IndexMap<String, String>,
    /// Top-level fields carried next to the resource for grouping.
    pub keep: Vec<String>,
}

impl SchemaTables {
    pub fn container() -> Self {
        Self {
            gate: vec![
                FieldTest::ne("log_type", "audit"),
                FieldTest::ne("tag", ".journal.system"),
            ],
            prefix: "k8s.".into(),
            meta: strings([
                "kubernetes.pod_name",
                "kubernetes.pod_id",
                "kubernetes.namespace_name",
                "kubernetes.container_name",
                "openshift.cluster_id",
                "hostname",
                "file",
            ]),
            replace: pairs([
                ("pod.id", "pod.uid"),
                ("cluster.id", "cluster.uid"),
                ("hostname", "node.name"),
                ("file", "logs.file.path"),
            ]),
            downcase_unmatched: false,
            labels_prefix: Some("k8s.pod.labels.".into()),
            attributes: pairs([("openshift.log.type", "log_type")]),
            keep: strings(["kubernetes"]),
        }
    }

    pub fn journal() -> Self {
        Self {
            gate: vec![
                FieldTest::eq("log_type", "infrastructure"),
                FieldTest::eq("tag", ".journal.system"),
            ],
            prefix: "syslog.".into(),
            meta: strings([
                "systemd.t.BOOT_ID",
                "systemd.t.COMM",
                "systemd.t.CAP_EFFECTIVE",
                "systemd.t.CMDLINE",
                "systemd.t.EXE",
                "systemd.t.GID",
                "systemd.t.MACHINE_ID",
                "systemd.t.PID",
                "systemd.t.SELINUX_CONTEXT",
                "systemd.t.SYSTEMD_CGROUP",
                "systemd.t.SYSTEMD_INVOCATION_ID",
                "systemd.t.SYSTEMD_SLICE",
                "systemd.t.SYSTEMD_UNIT",
                "systemd.t.TRANSPORT",
                "systemd.t.UID",
                "systemd.u.SYSLOG_FACILITY",
                "systemd.u.SYSLOG_IDENTIFIER",
                "hostname",
                "openshift.cluster_id",
            ]),
            replace: pairs([
                ("hostname", "node.name"),
                ("cluster.id", "cluster.uid"),
                ("SYSTEMD.CGROUP", "system.cgroup"),
                ("SYSTEMD.INVOCATION.ID", "system.invocation.id"),
                ("SYSTEMD.SLICE", "system.slice"),
                ("SYSTEMD.UNIT", "system.unit"),
            ]),
            downcase_unmatched: true,
            labels_prefix: None,
            attributes: pairs([("openshift.log.type", "log_type"), ("openshift.log.tag", "tag")]),
            keep: strings(["hostname"]),
        }
    }

    /// Attribute key for a `meta` path.
    ///
    /// Multi-level paths contribute their last segment with `_` read as `.`;
    /// the result is renamed through `replace`.
    pub fn attribute_key(&self, path: &str) -> String {
        let sub_key = match path.rsplit_once('.') {
            Some((_, last)) => last.replace('_', "."),
            None => path.to_owned(),
        };
        let sub_key = match self.replace.get(&sub_key) {
            Some(replaced) => replaced.clone(),
            None if self.downcase_unmatched => sub_key.to_lowercase(),
            None => sub_key,
        };
        format!("{}{}", self.prefix, sub_key)
    }

    /// `(attribute key, record path)` for every `meta` path, in order.
    pub fn meta_attributes(&self) -> Vec<(String, &str)> {
        self.meta
            .iter()
            .map(|path| (self.attribute_key(path), path.as_str()))
            .collect()
    }

    pub fn gate_vrl(&self) -> String {
        let tests: Vec<_> = self.gate.iter().map(FieldTest::to_vrl).collect();
        tests.join(" && ")
    }
}

fn strings<const N: usize>(values: [&str; N]) -> Vec<String> {
    values.into_iter().map(str::to_owned).collect()
}

fn pairs<const N: usize>(values: [(&str, &str); N]) -> IndexMap<String, String> {
    values
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect()
}

fn push_attribute(script: &mut String, key: &str, value: &str) {
    writeln!(
        script,
        "  attributes = push(attributes, {{\"key\": {}, \"value\": {{\"stringValue\": {}}}}})",
        key, value
    )
    .expect("write to String never fails");
}

fn push_present_attribute(script: &mut String, key: &str, path: &str) {
    let path = vrl_path(path);
    writeln!(script, "  if {} != null {{", path).expect("write to String never fails");
    script.push_str("  ");
    push_attribute(script, &quote(key), &path);
    script.push_str("  }\n");
}

/// Builds the VRL program rewriting records matching `tables.gate`.
pub fn schema_script(tables: &SchemaTables, severity: &SeverityTable) -> String {
    let mut script = String::new();
    writeln!(script, "if {} {{", tables.gate_vrl()).expect("write to String never fails");
    script.push_str("  attributes = []\n");

    for (key, path) in tables.meta_attributes() {
        push_present_attribute(&mut script, &key, path);
    }

    if let Some(prefix) = &tables.labels_prefix {
        script.push_str("  for_each(object(.kubernetes.labels) ?? {}) -> |key, value| {\n");
        script.push_str("  ");
        push_attribute(&mut script, &format!("{} + key", quote(prefix)), "value");
        script.push_str("  }\n");
    }

    for (key, path) in &tables.attributes {
        push_present_attribute(&mut script, key, path);
    }

    write!(
        script,
        r#"
  r = {{}}
  ts, err = parse_timestamp(.@timestamp, format: "%+")
  if err == null {{
    r.timeUnixNano = to_string(to_unix_timestamp(ts, unit: "nanoseconds"))
  }}
  r.observedTimeUnixNano = to_string(to_unix_timestamp(now(), unit: "nanoseconds"))
  level = string(.level) ?? ""
  if level != "" {{
    r.severityText = level
  }}
  severity = get!({table}, [downcase(level)])
  r.severityNumber = if severity == null {{ {fallback} }} else {{ severity }}
  message, err = string(.message)
  if err == null {{
    r.body = {{"stringValue": message}}
  }}

"#,
        table = severity.to_vrl(),
        fallback = severity.fallback(),
    )
    .expect("write to String never fails");

    script.push_str("  . = {\n");
    for field in &tables.keep {
        writeln!(script, "    {}: {},", quote(field), vrl_path(field))
            .expect("write to String never fails");
    }
    writeln!(
        script,
        "    {}: {{\"attributes\": attributes}},\n    {}: r\n  }}",
        quote(RESOURCE_FIELD),
        quote(LOG_RECORDS_FIELD)
    )
    .expect("write to String never fails");
    script.push('}');
    script
}

pub fn route_by_origin(id: ComponentKey, inputs: Vec<ComponentKey>) -> Route {
    Route::new(id, inputs)
        .with_description("Route container logs and journal logs separately")
        .lane(CONTAINER_BRANCH, "exists(.kubernetes)")
        .lane(JOURNAL_BRANCH, "!exists(.kubernetes)")
}

pub fn transform_container(id: ComponentKey, inputs: Vec<ComponentKey>) -> Remap {
    let script = schema_script(&SchemaTables::container(), &SeverityTable::default());
    Remap::new(id, inputs, script).with_description("Normalize container log records to OTLP schema")
}

pub fn transform_journal(id: ComponentKey, inputs: Vec<ComponentKey>) -> Remap {
    let script = schema_script(&SchemaTables::journal(), &SeverityTable::default());
    Remap::new(id, inputs, script).with_description("Normalize node log events to OTLP schema")
}

fn group(id: ComponentKey, inputs: Vec<ComponentKey>, paths: &[&str]) -> Reduce {
    Reduce::new(id, inputs)
        .group_by(paths.iter().copied())
        .merge(RESOURCE_FIELD, MergeStrategy::Retain)
        .merge(LOG_RECORDS_FIELD, MergeStrategy::Array)
}

pub fn group_by_container(id: ComponentKey, inputs: Vec<ComponentKey>) -> Reduce {
    group(id, inputs, &CONTAINER_GROUP_BY)
}

pub fn group_by_node(id: ComponentKey, inputs: Vec<ComponentKey>) -> Reduce {
    group(id, inputs, &NODE_GROUP_BY)
}

pub fn format_batch(id: ComponentKey, inputs: Vec<ComponentKey>) -> Remap {
    Remap::new(id, inputs, FORMAT_BATCH).with_description("Remap to match OTEL protocol")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_container_attribute_keys() {
        let tables = SchemaTables::container();
        let keys: Vec<_> = tables
            .meta_attributes()
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        assert_eq!(
            keys,
            [
                "k8s.pod.name",
                "k8s.pod.uid",
                "k8s.namespace.name",
                "k8s.container.name",
                "k8s.cluster.uid",
                "k8s.node.name",
                "k8s.logs.file.path",
            ]
        );
    }

    #[test]
    fn derives_journal_attribute_keys() {
        let tables = SchemaTables::journal();
        assert_eq!(tables.attribute_key("systemd.t.BOOT_ID"), "syslog.boot.id");
        assert_eq!(
            tables.attribute_key("systemd.t.SYSTEMD_UNIT"),
            "syslog.system.unit"
        );
        assert_eq!(
            tables.attribute_key("systemd.u.SYSLOG_IDENTIFIER"),
            "syslog.syslog.identifier"
        );
        assert_eq!(tables.attribute_key("hostname"), "syslog.node.name");
        assert_eq!(
            tables.attribute_key("openshift.cluster_id"),
            "syslog.cluster.uid"
        );
    }

    #[test]
    fn gates_on_origin() {
        assert_eq!(
            SchemaTables::container().gate_vrl(),
            r#".log_type != "audit" && .tag != ".journal.system""#
        );
        assert_eq!(
            SchemaTables::journal().gate_vrl(),
            r#".log_type == "infrastructure" && .tag == ".journal.system""#
        );
    }

    #[test]
    fn container_script_guards_each_field() {
        let script = schema_script(&SchemaTables::container(), &SeverityTable::default());
        assert!(script.starts_with("if .log_type != \"audit\""));
        assert!(script.contains(
            "  if .kubernetes.pod_id != null {\n    attributes = push(attributes, {\"key\": \"k8s.pod.uid\", \"value\": {\"stringValue\": .kubernetes.pod_id}})\n  }\n"
        ));
        assert!(script.contains("for_each(object(.kubernetes.labels) ?? {})"));
        assert!(script.contains("\"k8s.pod.labels.\" + key"));
        let labels = script.find("k8s.pod.labels.");
        let log_type = script.find("openshift.log.type");
        assert!(labels.is_some() && labels < log_type);
        assert!(script.contains("\"kubernetes\": .kubernetes,"));
        assert!(script.contains("r.severityNumber = if severity == null { 9 } else { severity }"));
        assert!(!script.contains("parse_timestamp!"));
        assert!(script.ends_with("}"));
    }

    #[test]
    fn journal_script_keeps_hostname_for_grouping() {
        let script = schema_script(&SchemaTables::journal(), &SeverityTable::default());
        assert!(script.contains("\"hostname\": .hostname,"));
        assert!(script.contains("\"openshift.log.tag\""));
        assert!(!script.contains(".kubernetes.labels"));
    }
}
