use std::collections::{HashMap, HashSet};

use snafu::Snafu;

use super::ComponentKey;
use crate::element::{BlockKey, Element};

/// Structural problems of a compiled document.
#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(visibility(pub(crate)))]
pub enum ShapeError {
    #[snafu(display("More than one component with name \"{}\".", id))]
    DuplicateComponent { id: String },
    #[snafu(display("More than one block with key \"{}\".", key))]
    DuplicateBlock { key: String },
    #[snafu(display("Component \"{}\" lists itself as an input.", id))]
    SelfReferencingInput { id: String },
    #[snafu(display(
        "Input \"{}\" for component \"{}\" doesn't match any earlier component or input.",
        input,
        id
    ))]
    UndeclaredInput { id: String, input: String },
    #[snafu(display("Component \"{}\" has no inputs.", id))]
    EmptyInputs { id: String },
    #[snafu(display("Block \"{}\" belongs to undefined sink \"{}\".", key, sink))]
    OrphanSection { key: String, sink: String },
}

/// Checks the document graph in emission order: IDs are unique, every input
/// names an earlier component, a declared output of one, or an external
/// input, and sections follow the sink they configure.
pub fn check_shape(
    elements: &[Box<dyn Element>],
    external_inputs: &[ComponentKey],
) -> Result<(), ShapeError> {
    let mut components = HashMap::<String, Vec<String>>::new();
    let mut sinks = HashSet::<String>::new();
    let mut blocks = HashSet::<String>::new();

    for element in elements {
        let key = element.key();
        if !blocks.insert(key.to_string()) {
            return DuplicateBlockSnafu {
                key: key.to_string(),
            }
            .fail();
        }

        let id = match &key {
            BlockKey::Section { sink, .. } => {
                if !sinks.contains(sink.id()) {
                    return OrphanSectionSnafu {
                        key: key.to_string(),
                        sink: sink.id(),
                    }
                    .fail();
                }
                continue;
            }
            BlockKey::Transform(id) | BlockKey::Sink(id) => id,
        };

        if components.contains_key(id.id())
            || external_inputs.iter().any(|input| input == id)
        {
            return DuplicateComponentSnafu { id: id.id() }.fail();
        }

        let inputs = element.inputs();
        if inputs.is_empty() {
            return EmptyInputsSnafu { id: id.id() }.fail();
        }
        for input in inputs {
            if input.component() == id.id() {
                return SelfReferencingInputSnafu { id: id.id() }.fail();
            }
            let declared = external_inputs.contains(input)
                || (!sinks.contains(input.component())
                    && components
                        .get(input.component())
                        .is_some_and(|outputs| match input.port() {
                            Some(port) => outputs.iter().any(|output| output == port),
                            None => true,
                        }));
            if !declared {
                return UndeclaredInputSnafu {
                    id: id.id(),
                    input: input.id(),
                }
                .fail();
            }
        }

        let outputs = element.outputs().into_iter().map(str::to_owned).collect();
        components.insert(id.id().to_owned(), outputs);
        if matches!(key, BlockKey::Sink(_)) {
            sinks.insert(id.id().to_owned());
        }
    }

    Ok(())
}
