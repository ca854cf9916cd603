use crate::{
    config::ComponentKey,
    element::{BlockKey, BlockWriter, Element},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Codec {
    Json,
}

impl Codec {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Codec::Json => "json",
        }
    }
}

/// The `encoding` section of a sink.
#[derive(Clone, Debug)]
pub struct EncodingConfig {
    sink: ComponentKey,
    codec: Codec,
    except_fields: Vec<String>,
}

impl EncodingConfig {
    pub fn json(sink: &ComponentKey) -> Self {
        Self {
            sink: sink.clone(),
            codec: Codec::Json,
            except_fields: Vec::new(),
        }
    }

    /// Fields removed from every record before encoding.
    pub fn except_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.except_fields = fields.into_iter().map(Into::into).collect();
        self
    }
}

impl Element for EncodingConfig {
    fn name(&self) -> &'static str {
        "encoding"
    }

    fn key(&self) -> BlockKey {
        BlockKey::Section {
            sink: self.sink.clone(),
            name: "encoding",
        }
    }

    fn render(&self, out: &mut BlockWriter) {
        out.string("codec", self.codec.as_str());
        if !self.except_fields.is_empty() {
            out.list("except_fields", &self.except_fields);
        }
    }
}
