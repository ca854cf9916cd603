use crate::{
    config::{ComponentKey, DeliveryMode, Tuning},
    element::{BlockKey, BlockWriter, Element},
};

/// Size of the disk buffer backing at-least-once delivery.
pub const DISK_BUFFER_MAX_SIZE: u64 = 268_435_488;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferType {
    Memory,
    Disk { max_size: u64 },
}

/// What happens when the buffer is full.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WhenFull {
    Block,
    DropNewest,
}

impl WhenFull {
    pub const fn as_str(&self) -> &'static str {
        match self {
            WhenFull::Block => "block",
            WhenFull::DropNewest => "drop_newest",
        }
    }
}

#[derive(Clone, Debug)]
pub struct BufferConfig {
    sink: ComponentKey,
    kind: BufferType,
    when_full: WhenFull,
}

impl BufferConfig {
    pub fn from_tuning(sink: &ComponentKey, tuning: Option<&Tuning>) -> Option<Self> {
        let (kind, when_full) = match tuning?.delivery_mode? {
            DeliveryMode::AtLeastOnce => (
                BufferType::Disk {
                    max_size: DISK_BUFFER_MAX_SIZE,
                },
                WhenFull::Block,
            ),
            DeliveryMode::AtMostOnce => (BufferType::Memory, WhenFull::DropNewest),
        };
        Some(Self {
            sink: sink.clone(),
            kind,
            when_full,
        })
    }
}

impl Element for BufferConfig {
    fn name(&self) -> &'static str {
        "buffer"
    }

    fn key(&self) -> BlockKey {
        BlockKey::Section {
            sink: self.sink.clone(),
            name: "buffer",
        }
    }

    fn render(&self, out: &mut BlockWriter) {
        match self.kind {
            BufferType::Memory => out.string("when_full", self.when_full.as_str()),
            BufferType::Disk { max_size } => {
                out.string("type", "disk");
                out.string("when_full", self.when_full.as_str());
                out.raw("max_size", max_size);
            }
        }
    }
}
