//! Stream transforms. Each constructor returns a transform that is applied
//! to a whole stream: `op(args)(records)`.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::{Record, RecordStream};

pub fn filter<P>(predicate: P) -> impl FnOnce(RecordStream) -> RecordStream
where
    P: Fn(&Record) -> bool + 'static,
{
    move |input| Box::new(input.filter(move |r| predicate(r)))
}

/// Keep only the named fields, in the stream's field order.
pub fn select<S: Into<String>>(fields: Vec<S>) -> impl FnOnce(RecordStream) -> RecordStream {
    let keep: Vec<String> = fields.into_iter().map(Into::into).collect();
    move |input| {
        Box::new(input.map(move |r| {
            let mut out = Record::new();
            for field in &keep {
                if let Some(v) = r.get(field) {
                    out.insert(field.clone(), v.clone());
                }
            }
            out
        }))
    }
}

/// Drop the named fields, keeping everything else.
pub fn reject<S: Into<String>>(fields: Vec<S>) -> impl FnOnce(RecordStream) -> RecordStream {
    let drop: BTreeSet<String> = fields.into_iter().map(Into::into).collect();
    move |input| {
        Box::new(input.map(move |r| {
            r.into_iter()
                .filter(|(k, _)| !drop.contains(k))
                .collect::<Record>()
        }))
    }
}

pub fn limit(n: usize) -> impl FnOnce(RecordStream) -> RecordStream {
    move |input| Box::new(input.take(n))
}

pub fn offset(n: usize) -> impl FnOnce(RecordStream) -> RecordStream {
    move |input| Box::new(input.skip(n))
}

/// Stable sort on one field. Numbers compare numerically, everything else
/// by its text rendering.
pub fn sort_by(field: &str, descending: bool) -> impl FnOnce(RecordStream) -> RecordStream {
    let field = field.to_string();
    move |input| {
        let mut rows: Vec<Record> = input.collect();
        rows.sort_by(|a, b| {
            let ord = compare_values(a.get(&field), b.get(&field));
            if descending {
                ord.reverse()
            } else {
                ord
            }
        });
        Box::new(rows.into_iter())
    }
}

pub fn distinct() -> impl FnOnce(RecordStream) -> RecordStream {
    move |input| {
        let mut seen = BTreeSet::new();
        Box::new(input.filter(move |r| seen.insert(serde_json::to_string(r).unwrap_or_default())))
    }
}

pub fn rename<S: Into<String>>(pairs: Vec<(S, S)>) -> impl FnOnce(RecordStream) -> RecordStream {
    let pairs: Vec<(String, String)> = pairs
        .into_iter()
        .map(|(from, to)| (from.into(), to.into()))
        .collect();
    move |input| {
        Box::new(input.map(move |r| {
            r.into_iter()
                .map(|(k, v)| match pairs.iter().find(|(from, _)| *from == k) {
                    Some((_, to)) => (to.clone(), v),
                    None => (k, v),
                })
                .collect::<Record>()
        }))
    }
}

/// Group the stream by the named key fields. Each output record carries the
/// key fields plus the group's member records as an array under
/// `group_field`. Records whose key fields hold nested values are skipped.
pub fn group_by<S: Into<String>>(
    group_field: &str,
    fields: Vec<S>,
) -> impl FnOnce(RecordStream) -> RecordStream {
    let group_field = group_field.to_string();
    let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
    move |input| {
        let mut order: Vec<String> = Vec::new();
        let mut groups: BTreeMap<String, (Record, Vec<Value>)> = BTreeMap::new();

        for r in input {
            let mut head = Record::new();
            let mut nested = false;
            for field in &fields {
                match r.get(field) {
                    Some(v) if matches!(v, Value::Array(_) | Value::Object(_)) => {
                        nested = true;
                        break;
                    }
                    Some(v) => {
                        head.insert(field.clone(), v.clone());
                    }
                    None => {
                        head.insert(field.clone(), Value::Null);
                    }
                }
            }
            if nested {
                continue;
            }
            let key = serde_json::to_string(&head).unwrap_or_default();
            let slot = groups.entry(key.clone()).or_insert_with(|| {
                order.push(key.clone());
                (head, Vec::new())
            });
            slot.1.push(Value::Object(r));
        }

        let rows: Vec<Record> = order
            .into_iter()
            .filter_map(|key| {
                groups.remove(&key).map(|(mut head, members)| {
                    head.insert(group_field.clone(), Value::Array(members));
                    head
                })
            })
            .collect();
        Box::new(rows.into_iter())
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a.and_then(Value::as_f64), b.and_then(Value::as_f64)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        _ => text_key(a).cmp(&text_key(b)),
    }
}

fn text_key(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}
