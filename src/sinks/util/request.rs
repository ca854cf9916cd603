use std::collections::BTreeMap;

use crate::{
    config::{ComponentKey, Tuning},
    element::{BlockKey, BlockWriter, Element},
};

/// Per-request settings of an HTTP based sink.
#[derive(Clone, Debug)]
pub struct RequestConfig {
    sink: ComponentKey,
    timeout_secs: Option<u64>,
    headers: BTreeMap<String, String>,
    retry_initial_backoff_secs: Option<u64>,
    retry_max_duration_secs: Option<u64>,
}

impl RequestConfig {
    pub fn new(sink: &ComponentKey, tuning: Option<&Tuning>) -> Self {
        let positive = |value: Option<u64>| value.filter(|secs| *secs > 0);
        Self {
            sink: sink.clone(),
            timeout_secs: None,
            headers: BTreeMap::new(),
            retry_initial_backoff_secs: positive(tuning.and_then(|t| t.min_retry_duration)),
            retry_max_duration_secs: positive(tuning.and_then(|t| t.max_retry_duration)),
        }
    }

    pub fn timeout(mut self, secs: Option<u64>) -> Self {
        self.timeout_secs = secs.filter(|secs| *secs > 0);
        self
    }

    pub fn headers(mut self, headers: &BTreeMap<String, String>) -> Self {
        self.headers
            .extend(headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Sets `name`, replacing any user header that differs only in case.
    pub fn require_header(mut self, name: &str, value: &str) -> Self {
        self.headers.retain(|key, _| !key.eq_ignore_ascii_case(name));
        self.headers.insert(name.to_owned(), value.to_owned());
        self
    }

    fn is_empty(&self) -> bool {
        self.timeout_secs.is_none()
            && self.headers.is_empty()
            && self.retry_initial_backoff_secs.is_none()
            && self.retry_max_duration_secs.is_none()
    }

    /// The section, unless there is nothing to configure.
    pub fn into_section(self) -> Option<Self> {
        (!self.is_empty()).then_some(self)
    }
}

impl Element for RequestConfig {
    fn name(&self) -> &'static str {
        "request"
    }

    fn key(&self) -> BlockKey {
        BlockKey::Section {
            sink: self.sink.clone(),
            name: "request",
        }
    }

    fn render(&self, out: &mut BlockWriter) {
        if let Some(secs) = self.timeout_secs {
            out.raw("timeout_secs", secs);
        }
        if !self.headers.is_empty() {
            out.table("headers", &self.headers);
        }
        if let Some(secs) = self.retry_initial_backoff_secs {
            out.raw("retry_initial_backoff_secs", secs);
        }
        if let Some(secs) = self.retry_max_duration_secs {
            out.raw("retry_max_duration_secs", secs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::render_element;

    #[test]
    fn omits_empty_section() {
        let request = RequestConfig::new(&"out".into(), None).timeout(Some(0));
        assert!(request.into_section().is_none());
    }

    #[test]
    fn required_header_wins() {
        let headers = BTreeMap::from([
            ("content-type".to_owned(), "text/plain".to_owned()),
            ("X-Scope".to_owned(), "a".to_owned()),
        ]);
        let tuning = Tuning {
            min_retry_duration: Some(5),
            max_retry_duration: Some(60),
            ..Default::default()
        };
        let request = RequestConfig::new(&"out".into(), Some(&tuning))
            .timeout(Some(30))
            .headers(&headers)
            .require_header("Content-Type", "application/json")
            .into_section()
            .unwrap();
        similar_asserts::assert_eq!(
            render_element(&request),
            indoc::indoc! {r#"
                [sinks.out.request]
                timeout_secs = 30
                headers = {"Content-Type"="application/json","X-Scope"="a"}
                retry_initial_backoff_secs = 5
                retry_max_duration_secs = 60
            "#}
        );
    }
}
