use indexmap::IndexMap;

use crate::{
    config::ComponentKey,
    element::{BlockKey, BlockWriter, Element},
};

/// Splits a stream into named branches, each selected by a VRL predicate.
/// Downstream stages consume a branch as `<id>.<branch>`.
#[derive(Clone, Debug)]
pub struct Route {
    id: ComponentKey,
    inputs: Vec<ComponentKey>,
    description: Option<String>,
    route: IndexMap<String, String>,
}

impl Route {
    pub fn new(id: ComponentKey, inputs: Vec<ComponentKey>) -> Self {
        Self {
            id,
            inputs,
            description: None,
            route: IndexMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn lane(mut self, name: impl Into<String>, condition: impl Into<String>) -> Self {
        self.route.insert(name.into(), condition.into());
        self
    }

    /// Key of the named branch.
    pub fn branch(&self, name: &str) -> ComponentKey {
        self.id.branch(name)
    }
}

impl Element for Route {
    fn name(&self) -> &'static str {
        "route"
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

    fn outputs(&self) -> Vec<&str> {
        self.route.keys().map(String::as_str).collect()
    }

    fn render(&self, out: &mut BlockWriter) {
        out.string("type", "route");
        out.inputs(&self.inputs);
        for (name, condition) in &self.route {
            out.literal(&format!("route.{}", name), condition);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::render_element;

    #[test]
    fn renders_lanes_in_order() {
        let route = Route::new("r".into(), vec!["in".into()])
            .with_description("Split by origin")
            .lane("container", "exists(.kubernetes)")
            .lane("journal", "!exists(.kubernetes)");
        assert_eq!(route.branch("journal").id(), "r.journal");
        similar_asserts::assert_eq!(
            render_element(&route),
            indoc::indoc! {r#"
                # Split by origin
                [transforms.r]
                type = "route"
                inputs = ["in"]
                route.container = 'exists(.kubernetes)'
                route.journal = '!exists(.kubernetes)'
            "#}
        );
    }
}
