use crate::{
    config::ComponentKey,
    element::{BlockKey, BlockWriter, Element, Elements},
    sinks::SinkContext,
};

/// Writes records to standard output as JSON.
#[derive(Clone, Debug)]
pub struct ConsoleSink {
    id: ComponentKey,
    inputs: Vec<ComponentKey>,
}

impl ConsoleSink {
    pub const fn new(id: ComponentKey, inputs: Vec<ComponentKey>) -> Self {
        Self { id, inputs }
    }
}

impl Element for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    fn key(&self) -> BlockKey {
        BlockKey::Sink(self.id.clone())
    }

    fn inputs(&self) -> &[ComponentKey] {
        &self.inputs
    }

    fn render(&self, out: &mut BlockWriter) {
        out.string("type", "console");
        out.inputs(&self.inputs);
        out.string("encoding.codec", "json");
    }
}

/// Replaces a whole output with one console sink fed by the output's inputs.
pub fn debug(cx: &SinkContext<'_>) -> Elements {
    debug!(message = "Debug output enabled, emitting a console sink.", output = %cx.output.name);
    vec![Box::new(ConsoleSink::new(
        cx.id.join("debug"),
        cx.inputs.clone(),
    ))]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::render_element;

    #[test]
    fn renders_console_sink() {
        let sink = ConsoleSink::new("out_debug".into(), vec!["input_application".into()]);
        similar_asserts::assert_eq!(
            render_element(&sink),
            indoc::indoc! {r#"
                [sinks.out_debug]
                type = "console"
                inputs = ["input_application"]
                encoding.codec = "json"
            "#}
        );
    }
}
