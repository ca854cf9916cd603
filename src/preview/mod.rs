//! Local evaluation of the OTLP stages over JSON records.
//!
//! Runs the same schema tables, reduce settings and batch shape the
//! generated pipeline uses, so their effect on sample records can be
//! inspected without a running collector.

use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
    path::PathBuf,
};

use chrono::{DateTime, Utc};
use clap::Parser;
use serde_json::{Map, Value, json};
use snafu::{ResultExt, Snafu};

use crate::transforms::otel::{
    self, FieldTest, LOG_RECORDS_FIELD, RESOURCE_FIELD, SchemaTables, SeverityTable,
};

pub mod reduce;

pub use reduce::{Reducer, reduce_all};

#[derive(Debug, Snafu)]
pub enum PreviewError {
    #[snafu(display("Could not read records: {}", source))]
    ReadRecords { source: io::Error },
    #[snafu(display("Line {} is not a JSON record: {}", line, source))]
    InvalidRecord {
        line: usize,
        source: serde_json::Error,
    },
}

/// Value at a dotted record path such as `.kubernetes.pod_name`.
pub fn lookup<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.trim_start_matches('.')
        .split('.')
        .try_fold(record, |value, segment| value.get(segment))
}

fn passes(test: &FieldTest, record: &Value) -> bool {
    let matches = lookup(record, &test.path).and_then(Value::as_str) == Some(test.value.as_str());
    matches == test.equals
}

fn attribute(key: String, value: Value) -> Value {
    json!({"key": key, "value": {"stringValue": value}})
}

fn unix_nanos(time: DateTime<Utc>) -> Option<String> {
    time.timestamp_nanos_opt().map(|nanos| nanos.to_string())
}

/// Rewrites one record the way the schema stage for `tables` does.
///
/// Records failing the gate are returned unchanged. Missing fields only
/// omit their attribute.
pub fn apply_schema(
    tables: &SchemaTables,
    severity: &SeverityTable,
    record: Value,
    now: DateTime<Utc>,
) -> Value {
    if !tables.gate.iter().all(|test| passes(test, &record)) {
        return record;
    }

    let mut attributes = Vec::new();
    let guarded = |attributes: &mut Vec<Value>, key: String, path: &str| {
        if let Some(value) = lookup(&record, path).filter(|value| !value.is_null()) {
            attributes.push(attribute(key, value.clone()));
        }
    };
    for (key, path) in tables.meta_attributes() {
        guarded(&mut attributes, key, path);
    }
    if let Some(prefix) = &tables.labels_prefix {
        if let Some(labels) = lookup(&record, "kubernetes.labels").and_then(Value::as_object) {
            for (key, value) in labels {
                attributes.push(attribute(format!("{}{}", prefix, key), value.clone()));
            }
        }
    }
    for (key, path) in &tables.attributes {
        guarded(&mut attributes, key.clone(), path);
    }

    let mut log = Map::new();
    let timestamp = lookup(&record, "@timestamp")
        .and_then(Value::as_str)
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .and_then(|ts| unix_nanos(ts.with_timezone(&Utc)));
    if let Some(nanos) = timestamp {
        log.insert("timeUnixNano".into(), nanos.into());
    }
    if let Some(nanos) = unix_nanos(now) {
        log.insert("observedTimeUnixNano".into(), nanos.into());
    }
    let level = lookup(&record, "level")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if !level.is_empty() {
        log.insert("severityText".into(), level.into());
    }
    log.insert("severityNumber".into(), severity.lookup(level).into());
    if let Some(message) = lookup(&record, "message").and_then(Value::as_str) {
        log.insert("body".into(), json!({"stringValue": message}));
    }

    let mut out = Map::new();
    for field in &tables.keep {
        let value = lookup(&record, field).cloned().unwrap_or(Value::Null);
        out.insert(field.clone(), value);
    }
    out.insert(RESOURCE_FIELD.into(), json!({"attributes": attributes}));
    out.insert(LOG_RECORDS_FIELD.into(), Value::Object(log));
    Value::Object(out)
}

/// Shapes a reduced record as one OTLP `ResourceLogs`.
pub fn format_batch(record: &Value) -> Value {
    json!({
        "resource": {
            "attributes": lookup(record, "resource.attributes").cloned().unwrap_or(Value::Null)
        },
        "scopeLogs": [
            {"logRecords": record.get(LOG_RECORDS_FIELD).cloned().unwrap_or(Value::Null)}
        ]
    })
}

/// Runs route, schema, reduce and batch format over `records` as one
/// window, returning the request payload. Container groups come before node
/// groups.
pub fn preview(records: Vec<Value>, now: DateTime<Utc>) -> Value {
    let severity = SeverityTable::default();
    let container = SchemaTables::container();
    let journal = SchemaTables::journal();

    let (containers, nodes): (Vec<_>, Vec<_>) = records
        .into_iter()
        .partition(|record| record.get("kubernetes").is_some());
    let containers = containers
        .into_iter()
        .map(|record| apply_schema(&container, &severity, record, now));
    let nodes = nodes
        .into_iter()
        .map(|record| apply_schema(&journal, &severity, record, now));

    let group_container = otel::group_by_container("container".into(), vec!["in".into()]);
    let group_node = otel::group_by_node("node".into(), vec!["in".into()]);
    let batches: Vec<_> = reduce_all(&group_container, containers)
        .iter()
        .chain(reduce_all(&group_node, nodes).iter())
        .map(format_batch)
        .collect();
    json!({ "resourceLogs": batches })
}

/// Reads newline delimited JSON records, skipping blank lines.
pub fn read_records(reader: impl BufRead) -> Result<Vec<Value>, PreviewError> {
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.context(ReadRecordsSnafu)?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line).context(InvalidRecordSnafu { line: index + 1 })?);
    }
    Ok(records)
}

#[derive(Parser, Debug)]
#[command(rename_all = "kebab-case")]
pub struct Opts {
    /// Newline delimited JSON records. Reads stdin when omitted.
    #[arg(long, env = "FORWARDER_CONF_PREVIEW_INPUT")]
    pub input: Option<PathBuf>,

    /// Observation time stamped on every record, RFC 3339. Defaults to now.
    #[arg(long)]
    pub now: Option<DateTime<Utc>>,
}

/// Pretty-prints `payload` followed by a newline.
fn write_payload(mut out: impl Write, payload: &Value) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut out, payload)?;
    writeln!(out)?;
    out.flush()
}

pub fn cmd(opts: &Opts) -> exitcode::ExitCode {
    let records = match &opts.input {
        Some(path) => match File::open(path) {
            Ok(file) => read_records(BufReader::new(file)),
            Err(error) => {
                error!(message = "Could not open records.", path = ?path, %error);
                return exitcode::NOINPUT;
            }
        },
        None => read_records(io::stdin().lock()),
    };
    let records = match records {
        Ok(records) => records,
        Err(error) => {
            error!(message = "Could not read records.", %error);
            return exitcode::DATAERR;
        }
    };
    debug!(message = "Previewing records.", count = records.len());

    let payload = preview(records, opts.now.unwrap_or_else(Utc::now));
    match write_payload(io::stdout().lock(), &payload) {
        Ok(()) => exitcode::OK,
        Err(error) => {
            error!(message = "Could not write payload.", %error);
            exitcode::IOERR
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn container_record() -> Value {
        json!({
            "@timestamp": "2023-11-14T22:13:20Z",
            "level": "ERROR",
            "message": "boom",
            "log_type": "application",
            "hostname": "node-1",
            "kubernetes": {
                "pod_name": "web-0",
                "namespace_name": "shop",
                "container_name": "app",
                "labels": {"app": "web"}
            }
        })
    }

    #[test]
    fn rewrites_container_records() {
        let out = apply_schema(
            &SchemaTables::container(),
            &SeverityTable::default(),
            container_record(),
            now(),
        );
        assert_eq!(
            out["resource"]["attributes"],
            json!([
                {"key": "k8s.pod.name", "value": {"stringValue": "web-0"}},
                {"key": "k8s.namespace.name", "value": {"stringValue": "shop"}},
                {"key": "k8s.container.name", "value": {"stringValue": "app"}},
                {"key": "k8s.node.name", "value": {"stringValue": "node-1"}},
                {"key": "k8s.pod.labels.app", "value": {"stringValue": "web"}},
                {"key": "openshift.log.type", "value": {"stringValue": "application"}},
            ])
        );
        assert_eq!(
            out["logRecords"],
            json!({
                "timeUnixNano": "1700000000000000000",
                "observedTimeUnixNano": "1704067200000000000",
                "severityText": "ERROR",
                "severityNumber": 3,
                "body": {"stringValue": "boom"},
            })
        );
        assert_eq!(out["kubernetes"]["pod_name"], "web-0");
    }

    #[test]
    fn unknown_or_missing_levels_map_to_nine() {
        let tables = SchemaTables::container();
        let severity = SeverityTable::default();
        let mut record = container_record();
        record["level"] = json!("chatty");
        let out = apply_schema(&tables, &severity, record.clone(), now());
        assert_eq!(out["logRecords"]["severityNumber"], 9);

        record.as_object_mut().unwrap().remove("level");
        let out = apply_schema(&tables, &severity, record, now());
        assert_eq!(out["logRecords"]["severityNumber"], 9);
        assert!(out["logRecords"].get("severityText").is_none());
    }

    #[test]
    fn gate_passes_other_records_through() {
        let mut record = container_record();
        record["log_type"] = json!("audit");
        let out = apply_schema(
            &SchemaTables::container(),
            &SeverityTable::default(),
            record.clone(),
            now(),
        );
        assert_eq!(out, record);
    }

    #[test]
    fn batches_by_origin() {
        let journal = json!({
            "log_type": "infrastructure",
            "tag": ".journal.system",
            "hostname": "node-1",
            "message": "started",
            "systemd": {"t": {"SYSTEMD_UNIT": "kubelet.service"}}
        });
        let payload = preview(
            vec![container_record(), journal, container_record()],
            now(),
        );
        let batches = payload["resourceLogs"].as_array().unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(
            batches[0]["scopeLogs"][0]["logRecords"].as_array().map(Vec::len),
            Some(2)
        );
        assert_eq!(
            batches[1]["resource"]["attributes"][0],
            json!({"key": "syslog.system.unit", "value": {"stringValue": "kubelet.service"}})
        );
    }

    #[test]
    fn reads_ndjson() {
        let input = "{\"a\":1}\n\n{\"b\":2}\n";
        assert_eq!(read_records(input.as_bytes()).unwrap().len(), 2);
        let error = read_records("{\"a\":1}\nnope\n".as_bytes()).unwrap_err();
        assert!(error.to_string().starts_with("Line 2 is not a JSON record"));
    }

    #[test]
    fn write_errors_are_reported() {
        struct Full;
        impl Write for Full {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::ErrorKind::WriteZero.into())
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
        assert!(write_payload(Full, &json!([])).is_err());

        let mut out = Vec::new();
        write_payload(&mut out, &json!({"a": 1})).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\n  \"a\": 1\n}\n");
    }
}
