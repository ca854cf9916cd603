use crate::{
    config::{ComponentKey, DeliveryMode, Tuning},
    element::{BlockKey, BlockWriter, Element},
};

/// End-to-end acknowledgements for a sink.
#[derive(Clone, Debug)]
pub struct AcknowledgementsConfig {
    sink: ComponentKey,
    enabled: bool,
}

impl AcknowledgementsConfig {
    /// Enabled for at-least-once delivery, absent otherwise.
    pub fn from_tuning(sink: &ComponentKey, tuning: Option<&Tuning>) -> Option<Self> {
        match tuning?.delivery_mode? {
            DeliveryMode::AtLeastOnce => Some(Self {
                sink: sink.clone(),
                enabled: true,
            }),
            DeliveryMode::AtMostOnce => None,
        }
    }
}

impl Element for AcknowledgementsConfig {
    fn name(&self) -> &'static str {
        "acknowledgements"
    }

    fn key(&self) -> BlockKey {
        BlockKey::Section {
            sink: self.sink.clone(),
            name: "acknowledgements",
        }
    }

    fn render(&self, out: &mut BlockWriter) {
        out.bool("enabled", self.enabled);
    }
}
