use std::sync::LazyLock;

use regex::Regex;

use crate::element::quote;

static FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{\s*(\.[^{}|"\s]+)\s*(?:\|\|\s*"([^"]*)"\s*)?\}"#).expect("valid field pattern")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Static(String),
    /// A record field, with the text used when it is missing.
    Field { path: String, default: String },
}

/// A user template such as `app-{.kubernetes.namespace_name||"none"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    src: String,
    parts: Vec<Part>,
}

impl Template {
    pub fn parse(src: &str) -> Self {
        let mut parts = Vec::new();
        let mut last = 0;
        for cap in FIELD.captures_iter(src) {
            let Some(whole) = cap.get(0) else { continue };
            if whole.start() > last {
                parts.push(Part::Static(src[last..whole.start()].to_owned()));
            }
            parts.push(Part::Field {
                path: cap[1].to_owned(),
                default: cap.get(2).map_or("", |m| m.as_str()).to_owned(),
            });
            last = whole.end();
        }
        if last < src.len() {
            parts.push(Part::Static(src[last..].to_owned()));
        }
        Self {
            src: src.to_owned(),
            parts,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.parts
            .iter()
            .any(|part| matches!(part, Part::Field { .. }))
    }

    pub fn get_ref(&self) -> &str {
        &self.src
    }

    /// A VRL expression evaluating to the rendered string.
    pub fn to_vrl(&self) -> String {
        if self.parts.is_empty() {
            return quote("");
        }
        let terms: Vec<_> = self
            .parts
            .iter()
            .map(|part| match part {
                Part::Static(text) => quote(text),
                Part::Field { path, default } => {
                    format!("(to_string({}) ?? {})", vrl_path(path), quote(default))
                }
            })
            .collect();
        terms.join(" + ")
    }
}

/// Renders a dotted record path as a VRL path, quoting segments that are not
/// plain identifiers.
pub fn vrl_path(dotted: &str) -> String {
    let mut path = String::new();
    for segment in dotted.trim_start_matches('.').split('.') {
        path.push('.');
        let plain = !segment.is_empty()
            && segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '@');
        if plain {
            path.push_str(segment);
        } else {
            path.push_str(&quote(segment));
        }
    }
    path
}
