//! Common record normalization stages shared by the output generators.

use std::fmt::Write as _;

use super::remap::Remap;
use crate::config::ComponentKey;

/// Label maps whose keys may carry `.` or `/`, which most backends reject.
pub const DEDOT_FIELDS: [&str; 2] = ["kubernetes.namespace_labels", "kubernetes.labels"];

pub const DROP_FILE: &str = "del(.file)";

/// Removes collector-internal fields the destination has no use for.
pub fn drop_file(id: ComponentKey, inputs: Vec<ComponentKey>) -> Remap {
    Remap::new(id, inputs, DROP_FILE)
}

/// Stamps a sequence number and rewrites `.` and `/` in label keys to `_`.
pub fn dedot_labels(id: ComponentKey, inputs: Vec<ComponentKey>) -> Remap {
    Remap::new(id, inputs, dedot_script(&DEDOT_FIELDS))
}

pub fn dedot_script(fields: &[&str]) -> String {
    let mut script =
        String::from(".openshift.sequence = to_unix_timestamp(now(), unit: \"nanoseconds\")\n");
    for field in fields {
        write!(
            script,
            r#"if is_object(.{field}) {{
    for_each(object!(.{field})) -> |key,value| {{
      newkey = replace(key, r'[\./]', "_")
      .{field} = set!(.{field},[newkey],value)
      if newkey != key {{
        .{field} = remove!(.{field},[key],true)
      }}
    }}
}}
"#
        )
        .expect("write to String never fails");
    }
    script
}

/// The record path of `key` after [`dedot_labels`] ran: a key inside one
/// of the label maps has its `.` and `/` replaced by `_`.
pub fn dedotted_path(key: &str) -> String {
    for field in DEDOT_FIELDS {
        if let Some(label) = key
            .strip_prefix(field)
            .and_then(|rest| rest.strip_prefix('.'))
            .filter(|label| !label.is_empty())
        {
            return format!("{}.{}", field, label.replace(['.', '/'], "_"));
        }
    }
    key.to_owned()
}

/// Replaces `.`, `/` and `-` with `_`, the label name form Loki accepts.
pub fn dedot_key(key: &str) -> String {
    key.replace(['.', '/', '-'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedots_each_label_map() {
        let script = dedot_script(&DEDOT_FIELDS);
        assert!(script.starts_with(".openshift.sequence = "));
        assert!(script.contains("if is_object(.kubernetes.namespace_labels) {"));
        assert!(script.contains(
            ".kubernetes.labels = remove!(.kubernetes.labels,[key],true)"
        ));
        assert_eq!(script.matches("for_each").count(), 2);
    }

    #[test]
    fn dedots_keys() {
        assert_eq!(
            dedot_key("kubernetes.labels.app.kubernetes.io/name"),
            "kubernetes_labels_app_kubernetes_io_name"
        );
        assert_eq!(dedot_key("log-type"), "log_type");
    }

    #[test]
    fn dedots_paths_inside_label_maps() {
        assert_eq!(
            dedotted_path("kubernetes.labels.app.kubernetes.io/name"),
            "kubernetes.labels.app_kubernetes_io_name"
        );
        assert_eq!(
            dedotted_path("kubernetes.namespace_labels.team/owner-id"),
            "kubernetes.namespace_labels.team_owner-id"
        );
        assert_eq!(dedotted_path("kubernetes.labels"), "kubernetes.labels");
        assert_eq!(
            dedotted_path("kubernetes.labelsmith.a.b"),
            "kubernetes.labelsmith.a.b"
        );
        assert_eq!(dedotted_path("kubernetes.pod_name"), "kubernetes.pod_name");
    }
}
