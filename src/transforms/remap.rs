use crate::{
    config::ComponentKey,
    element::{BlockKey, BlockWriter, Element},
};

/// A `remap` transform running a VRL program.
#[derive(Clone, Debug)]
pub struct Remap {
    id: ComponentKey,
    inputs: Vec<ComponentKey>,
    description: Option<String>,
    source: String,
}

impl Remap {
    pub fn new(id: ComponentKey, inputs: Vec<ComponentKey>, source: impl Into<String>) -> Self {
        Self {
            id,
            inputs,
            description: None,
            source: source.into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub const fn id(&self) -> &ComponentKey {
        &self.id
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl Element for Remap {
    fn name(&self) -> &'static str {
        "remap"
    }

    fn key(&self) -> BlockKey {
        BlockKey::Transform(self.id.clone())
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn inputs(&self) -> &[ComponentKey] {
        &self.inputs
    }

    fn render(&self, out: &mut BlockWriter) {
        out.string("type", "remap");
        out.inputs(&self.inputs);
        out.script("source", &self.source);
    }
}
