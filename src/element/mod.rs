//! Blocks of a compiled document and the document itself.
//!
//! Every transform, sink and sink section is an [`Element`]. Generators return
//! ordered element lists, and a [`Document`] checks their graph shape once and
//! renders them as text.

use std::fmt;

use crate::config::{
    ComponentKey,
    validation::{ShapeError, check_shape},
};

mod writer;

pub use writer::{BlockWriter, bare_or_quoted, list, quote};

/// The table header a block renders under.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum BlockKey {
    Transform(ComponentKey),
    Sink(ComponentKey),
    /// A sub-table of a sink, such as `tls` or `request`.
    Section {
        sink: ComponentKey,
        name: &'static str,
    },
}

impl BlockKey {
    /// The component this block declares. Sections declare none.
    pub fn component(&self) -> Option<&ComponentKey> {
        match self {
            BlockKey::Transform(id) | BlockKey::Sink(id) => Some(id),
            BlockKey::Section { .. } => None,
        }
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockKey::Transform(id) => write!(f, "transforms.{}", id),
            BlockKey::Sink(id) => write!(f, "sinks.{}", id),
            BlockKey::Section { sink, name } => write!(f, "sinks.{}.{}", sink, name),
        }
    }
}

pub trait Element: fmt::Debug + Send + Sync {
    /// Name of the block template.
    fn name(&self) -> &'static str;

    fn key(&self) -> BlockKey;

    /// Rendered as a `#` comment above the header.
    fn description(&self) -> Option<&str> {
        None
    }

    fn inputs(&self) -> &[ComponentKey] {
        &[]
    }

    /// Named outputs consumed as `<id>.<name>`. Empty for single-output
    /// components.
    fn outputs(&self) -> Vec<&str> {
        Vec::new()
    }

    /// Writes the body of the block, without its header.
    fn render(&self, out: &mut BlockWriter);
}

pub type Elements = Vec<Box<dyn Element>>;

/// Renders one element as a complete block.
pub fn render_element(element: &dyn Element) -> String {
    let mut out = BlockWriter::new();
    if let Some(description) = element.description() {
        out.comment(description);
    }
    out.header(&element.key());
    element.render(&mut out);
    out.finish()
}

/// A validated, ordered list of blocks.
#[derive(Debug, Default)]
pub struct Document {
    elements: Elements,
}

impl Document {
    pub fn new(elements: Elements, external_inputs: &[ComponentKey]) -> Result<Self, ShapeError> {
        check_shape(&elements, external_inputs)?;
        Ok(Self { elements })
    }

    pub fn elements(&self) -> impl Iterator<Item = &dyn Element> {
        self.elements.iter().map(|element| element.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// IDs of the components the document declares, in order.
    pub fn component_ids(&self) -> impl Iterator<Item = ComponentKey> + '_ {
        self.elements()
            .filter_map(|element| element.key().component().cloned())
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.elements().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            f.write_str(&render_element(element))?;
        }
        Ok(())
    }
}
