use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::lookup;
use crate::transforms::reduce::{MergeStrategy, Reduce, ReduceWindow};

#[derive(Debug)]
struct Group {
    stale_since_ms: u64,
    events: usize,
    fields: Map<String, Value>,
}

impl Group {
    fn new(stale_since_ms: u64) -> Self {
        Self {
            stale_since_ms,
            events: 0,
            fields: Map::new(),
        }
    }

    fn merge(&mut self, record: Map<String, Value>, strategies: &IndexMap<String, MergeStrategy>) {
        for (field, value) in record {
            let strategy = strategies
                .get(&field)
                .copied()
                .unwrap_or(MergeStrategy::Discard);
            match strategy {
                MergeStrategy::Array => match self.fields.get_mut(&field) {
                    Some(Value::Array(values)) => values.push(value),
                    _ => {
                        self.fields.insert(field, Value::Array(vec![value]));
                    }
                },
                MergeStrategy::Retain => {
                    self.fields.insert(field, value);
                }
                MergeStrategy::Discard => {
                    self.fields.entry(field).or_insert(value);
                }
            }
        }
        self.events += 1;
    }
}

/// Evaluates a `reduce` stage over records arriving at known times.
///
/// Fields without a strategy keep their first value. A group is flushed when
/// it reaches `max_events`, or once `expire_after_ms` has passed since its
/// last record. Every push first flushes all groups stale at that time.
#[derive(Debug)]
pub struct Reducer {
    window: ReduceWindow,
    group_by: Vec<String>,
    strategies: IndexMap<String, MergeStrategy>,
    groups: IndexMap<String, Group>,
    flushed: Vec<Value>,
}

impl Reducer {
    pub fn new(reduce: &Reduce) -> Self {
        Self {
            window: reduce.window(),
            group_by: reduce.group_by_paths().to_vec(),
            strategies: reduce.merge_strategies().clone(),
            groups: IndexMap::new(),
            flushed: Vec::new(),
        }
    }

    fn group_key(&self, record: &Value) -> String {
        let parts: Vec<_> = self
            .group_by
            .iter()
            .map(|path| lookup(record, path).cloned().unwrap_or(Value::Null))
            .collect();
        Value::Array(parts).to_string()
    }

    fn flush_group(&mut self, key: &str) {
        if let Some(group) = self.groups.shift_remove(key) {
            self.flushed.push(Value::Object(group.fields));
        }
    }

    fn flush_stale(&mut self, now_ms: u64) {
        let expire_after_ms = self.window.expire_after_ms;
        let stale: Vec<_> = self
            .groups
            .iter()
            .filter(|(_, group)| now_ms.saturating_sub(group.stale_since_ms) >= expire_after_ms)
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale {
            self.flush_group(&key);
        }
    }

    pub fn push(&mut self, record: Value, at_ms: u64) {
        let Value::Object(fields) = record else {
            warn!(message = "Dropping non-object record.");
            return;
        };
        let key = self.group_key(&Value::Object(fields.clone()));
        self.flush_stale(at_ms);

        let group = self
            .groups
            .entry(key.clone())
            .or_insert_with(|| Group::new(at_ms));
        group.stale_since_ms = at_ms;
        group.merge(fields, &self.strategies);
        if group.events >= self.window.max_events {
            self.flush_group(&key);
        }
    }

    /// Flushes every open group, oldest first, and returns all reduced
    /// records in flush order.
    pub fn finish(mut self) -> Vec<Value> {
        let open: Vec<_> = self.groups.drain(..).map(|(_, group)| group).collect();
        self.flushed
            .extend(open.into_iter().map(|group| Value::Object(group.fields)));
        self.flushed
    }
}

/// Reduces `records` that all arrive within one window.
pub fn reduce_all(reduce: &Reduce, records: impl IntoIterator<Item = Value>) -> Vec<Value> {
    let mut reducer = Reducer::new(reduce);
    for record in records {
        reducer.push(record, 0);
    }
    reducer.finish()
}
