//! Aggregations over grouped records.

use serde_json::{json, Value};

use crate::{Record, RecordStream};

#[derive(Debug, Clone)]
pub struct Agg {
    op: AggOp,
    field: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AggOp {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

pub fn count() -> Agg {
    Agg {
        op: AggOp::Count,
        field: String::new(),
    }
}

pub fn sum(field: &str) -> Agg {
    Agg {
        op: AggOp::Sum,
        field: field.to_string(),
    }
}

pub fn avg(field: &str) -> Agg {
    Agg {
        op: AggOp::Avg,
        field: field.to_string(),
    }
}

pub fn min(field: &str) -> Agg {
    Agg {
        op: AggOp::Min,
        field: field.to_string(),
    }
}

pub fn max(field: &str) -> Agg {
    Agg {
        op: AggOp::Max,
        field: field.to_string(),
    }
}

impl Agg {
    fn apply(&self, rows: &[Record]) -> Value {
        let nums = || {
            rows.iter()
                .filter_map(|r| r.get(&self.field).and_then(Value::as_f64))
        };
        match self.op {
            AggOp::Count => json!(rows.len()),
            AggOp::Sum => json!(nums().sum::<f64>()),
            AggOp::Avg => {
                let (n, total) = nums().fold((0u64, 0.0), |(n, t), v| (n + 1, t + v));
                if n == 0 {
                    Value::Null
                } else {
                    json!(total / n as f64)
                }
            }
            AggOp::Min => nums().reduce(f64::min).map_or(Value::Null, |v| json!(v)),
            AggOp::Max => nums().reduce(f64::max).map_or(Value::Null, |v| json!(v)),
        }
    }
}

/// Replace the member array under `group_field` with one named result field
/// per aggregation.
pub fn aggregate<S: Into<String>>(
    group_field: &str,
    aggs: Vec<(S, Agg)>,
) -> impl FnOnce(RecordStream) -> RecordStream {
    let group_field = group_field.to_string();
    let aggs: Vec<(String, Agg)> = aggs.into_iter().map(|(name, a)| (name.into(), a)).collect();
    move |input| {
        Box::new(input.map(move |mut r| {
            let members: Vec<Record> = match r.remove(&group_field) {
                Some(Value::Array(items)) => items
                    .into_iter()
                    .filter_map(|v| match v {
                        Value::Object(m) => Some(m),
                        _ => None,
                    })
                    .collect(),
                _ => Vec::new(),
            };
            for (name, agg) in &aggs {
                r.insert(name.clone(), agg.apply(&members));
            }
            r
        }))
    }
}
