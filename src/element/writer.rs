use std::{collections::BTreeMap, fmt, fmt::Write as _};

use super::BlockKey;
use crate::config::{ComponentKey, make_inputs};

/// Renders `value` as a TOML basic string.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                write!(out, "\\u{:04X}", c as u32).expect("write to String never fails")
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Renders `["a","b"]`.
pub fn list<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let quoted: Vec<_> = values.into_iter().map(|v| quote(v.as_ref())).collect();
    format!("[{}]", quoted.join(","))
}

/// Keys made only of `[A-Za-z0-9_-]` are written bare, anything else quoted.
pub fn bare_or_quoted(key: &str) -> String {
    let bare = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if bare { key.to_owned() } else { quote(key) }
}

/// Accumulates the text of one block.
///
/// Keys are written verbatim, so dotted keys such as `route.container`
/// address nested tables.
#[derive(Debug, Default)]
pub struct BlockWriter {
    buf: String,
}

impl BlockWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn comment(&mut self, text: &str) {
        for line in text.lines() {
            writeln!(self.buf, "# {}", line).expect("write to String never fails");
        }
    }

    pub(crate) fn header(&mut self, key: &BlockKey) {
        writeln!(self.buf, "[{}]", key).expect("write to String never fails");
    }

    /// `key = value` with `value` written as is.
    pub fn raw(&mut self, key: &str, value: impl fmt::Display) {
        writeln!(self.buf, "{} = {}", key, value).expect("write to String never fails");
    }

    pub fn string(&mut self, key: &str, value: &str) {
        self.raw(key, quote(value));
    }

    /// `key = 'value'`, falling back to a basic string when the value can't
    /// be a literal.
    pub fn literal(&mut self, key: &str, value: &str) {
        if value.contains('\'') || value.contains('\n') {
            self.string(key, value);
        } else {
            self.raw(key, format_args!("'{}'", value));
        }
    }

    pub fn bool(&mut self, key: &str, value: bool) {
        self.raw(key, value);
    }

    pub fn list<I, S>(&mut self, key: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.raw(key, list(values));
    }

    pub fn inputs(&mut self, inputs: &[ComponentKey]) {
        self.raw("inputs", make_inputs(inputs));
    }

    /// `key = {"k1"="v1","k2"="v2"}`, keys in sorted order.
    pub fn table(&mut self, key: &str, entries: &BTreeMap<String, String>) {
        let pairs: Vec<_> = entries
            .iter()
            .map(|(k, v)| format!("{}={}", quote(k), quote(v)))
            .collect();
        self.raw(key, format_args!("{{{}}}", pairs.join(",")));
    }

    /// A multi-line literal holding a script, each line indented by two
    /// spaces.
    pub fn script(&mut self, key: &str, source: &str) {
        if source.contains("'''") {
            self.string(key, source);
            return;
        }
        writeln!(self.buf, "{} = '''", key).expect("write to String never fails");
        for line in source.lines() {
            if line.trim().is_empty() {
                self.buf.push('\n');
            } else {
                writeln!(self.buf, "  {}", line).expect("write to String never fails");
            }
        }
        self.buf.push_str("'''\n");
    }

    pub(crate) fn finish(self) -> String {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_basic_strings() {
        assert_eq!(quote("plain"), r#""plain""#);
        assert_eq!(quote(r#"{"resourceLogs":"#), r#""{\"resourceLogs\":""#);
        assert_eq!(quote("a\\b\nc"), r#""a\\b\nc""#);
        assert_eq!(quote("\u{1}"), r#""\u0001""#);
    }

    #[test]
    fn quotes_keys_only_when_needed() {
        assert_eq!(bare_or_quoted("kubernetes_pod_name"), "kubernetes_pod_name");
        assert_eq!(bare_or_quoted("a.b"), r#""a.b""#);
        assert_eq!(bare_or_quoted(""), r#""""#);
    }

    #[test]
    fn writes_tables_sorted() {
        let mut out = BlockWriter::new();
        let headers = BTreeMap::from([
            ("k2".to_owned(), "v2".to_owned()),
            ("k1".to_owned(), "v1".to_owned()),
        ]);
        out.table("headers", &headers);
        assert_eq!(out.finish(), "headers = {\"k1\"=\"v1\",\"k2\"=\"v2\"}\n");
    }

    #[test]
    fn indents_scripts() {
        let mut out = BlockWriter::new();
        out.script("source", "if true {\n  .a = 1\n}\n\n.b = 2");
        assert_eq!(
            out.finish(),
            "source = '''\n  if true {\n    .a = 1\n  }\n\n  .b = 2\n'''\n"
        );
    }

    #[test]
    fn literal_falls_back_to_basic_string() {
        let mut out = BlockWriter::new();
        out.literal("route.a", "exists(.kubernetes)");
        out.literal("route.b", ".x == 'y'");
        assert_eq!(
            out.finish(),
            "route.a = 'exists(.kubernetes)'\nroute.b = \".x == 'y'\"\n"
        );
    }
}
