use std::fmt;

use serde::{Deserialize, Serialize};

use crate::element::list;

/// Identifier of a transform or sink in a compiled document.
///
/// A key may also address one named output of a route, written
/// `<component>.<branch>`.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ComponentKey(String);

impl ComponentKey {
    pub fn id(&self) -> &str {
        &self.0
    }

    /// Key of a stage derived from this one, `<self>_<suffix>`.
    pub fn join(&self, suffix: &str) -> Self {
        make_id(&self.0, suffix)
    }

    /// Key addressing the named output of this component.
    pub fn branch(&self, name: &str) -> Self {
        Self::from(format!("{}.{}", self.0, name))
    }

    /// The component this key belongs to, without any branch.
    pub fn component(&self) -> &str {
        self.0
            .split_once('.')
            .map_or(self.0.as_str(), |(component, _)| component)
    }

    /// The branch this key addresses, if any.
    pub fn port(&self) -> Option<&str> {
        self.0.split_once('.').map(|(_, port)| port)
    }
}

impl From<String> for ComponentKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ComponentKey {
    fn from(value: &str) -> Self {
        Self::from(value.to_owned())
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Replaces every character outside `[A-Za-z0-9_]` with `_`.
pub fn format_component_id(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

pub fn make_id(base: &str, suffix: &str) -> ComponentKey {
    ComponentKey(format_component_id(&format!("{base}_{suffix}")))
}

pub fn make_output_id(name: &str) -> ComponentKey {
    make_id("output", name)
}

pub fn make_input_id(name: &str) -> ComponentKey {
    make_id("input", name)
}

/// Renders `["a","b"]`.
pub fn make_inputs(inputs: &[ComponentKey]) -> String {
    list(inputs.iter().map(ComponentKey::id))
}
