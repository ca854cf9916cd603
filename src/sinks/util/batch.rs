use crate::{
    config::{ComponentKey, Tuning},
    element::{BlockKey, BlockWriter, Element},
};

/// Upper bound on the size of one outgoing batch.
#[derive(Clone, Debug)]
pub struct BatchConfig {
    sink: ComponentKey,
    max_bytes: u64,
}

impl BatchConfig {
    pub fn from_tuning(sink: &ComponentKey, tuning: Option<&Tuning>) -> Option<Self> {
        let max_bytes = tuning?.max_write.filter(|bytes| *bytes > 0)?;
        Some(Self {
            sink: sink.clone(),
            max_bytes,
        })
    }
}

impl Element for BatchConfig {
    fn name(&self) -> &'static str {
        "batch"
    }

    fn key(&self) -> BlockKey {
        BlockKey::Section {
            sink: self.sink.clone(),
            name: "batch",
        }
    }

    fn render(&self, out: &mut BlockWriter) {
        out.raw("max_bytes", self.max_bytes);
    }
}
