use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    config::ComponentKey,
    element::{BlockKey, BlockWriter, Element},
};

pub const DEFAULT_EXPIRE_AFTER_MS: u64 = 30_000;
pub const DEFAULT_MAX_EVENTS: usize = 500;

/// How values of one field are merged across a reduced group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Keep the first value.
    Discard,
    /// Keep the last value.
    Retain,
    /// Collect every value into an array, in arrival order.
    Array,
}

impl MergeStrategy {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MergeStrategy::Discard => "discard",
            MergeStrategy::Retain => "retain",
            MergeStrategy::Array => "array",
        }
    }
}

/// Bounds on how long and how large a group may grow before it is flushed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReduceWindow {
    pub expire_after_ms: u64,
    pub max_events: usize,
}

impl Default for ReduceWindow {
    fn default() -> Self {
        Self {
            expire_after_ms: DEFAULT_EXPIRE_AFTER_MS,
            max_events: DEFAULT_MAX_EVENTS,
        }
    }
}

/// A `reduce` transform grouping records by a set of field paths.
#[derive(Clone, Debug)]
pub struct Reduce {
    id: ComponentKey,
    inputs: Vec<ComponentKey>,
    description: Option<String>,
    window: ReduceWindow,
    group_by: Vec<String>,
    merge_strategies: IndexMap<String, MergeStrategy>,
}

impl Reduce {
    pub fn new(id: ComponentKey, inputs: Vec<ComponentKey>) -> Self {
        Self {
            id,
            inputs,
            description: None,
            window: ReduceWindow::default(),
            group_by: Vec::new(),
            merge_strategies: IndexMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub const fn with_window(mut self, window: ReduceWindow) -> Self {
        self.window = window;
        self
    }

    pub fn group_by<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn merge(mut self, field: impl Into<String>, strategy: MergeStrategy) -> Self {
        self.merge_strategies.insert(field.into(), strategy);
        self
    }

    pub const fn window(&self) -> ReduceWindow {
        self.window
    }

    pub fn group_by_paths(&self) -> &[String] {
        &self.group_by
    }

    pub const fn merge_strategies(&self) -> &IndexMap<String, MergeStrategy> {
        &self.merge_strategies
    }
}

impl Element for Reduce {
    fn name(&self) -> &'static str {
        "reduce"
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
        out.string("type", "reduce");
        out.inputs(&self.inputs);
        out.raw("expire_after_ms", self.window.expire_after_ms);
        out.raw("max_events", self.window.max_events);
        out.list("group_by", &self.group_by);
        for (field, strategy) in &self.merge_strategies {
            out.string(&format!("merge_strategies.{}", field), strategy.as_str());
        }
    }
}
