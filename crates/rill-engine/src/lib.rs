//! Record-stream engine: the library that both live `rill` stages and
//! generated programs run against.
//!
//! A record is an ordered field map; operations are constructors that return
//! a transform applicable to a whole stream, so `limit(10)(records)` reads
//! the same in hand-written code, in CLI execute mode, and in assembled
//! output.

pub mod agg;
pub mod io;
pub mod ops;

use serde_json::Value;

pub type Record = serde_json::Map<String, Value>;
pub type RecordStream = Box<dyn Iterator<Item = Record>>;

/// Numeric view of a field; missing or non-numeric fields read as 0.
pub fn get_num(record: &Record, field: &str) -> f64 {
    record.get(field).and_then(Value::as_f64).unwrap_or(0.0)
}

/// Text view of a field; missing fields read as the empty string, non-string
/// values render as their JSON text.
pub fn get_text(record: &Record, field: &str) -> String {
    match record.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

pub fn get_value<'a>(record: &'a Record, field: &str) -> Option<&'a Value> {
    record.get(field)
}

/// Left-to-right composition of two stream transforms.
pub fn compose<A, B, C, F, G>(f: F, g: G) -> impl FnOnce(A) -> C
where
    F: FnOnce(A) -> B,
    G: FnOnce(B) -> C,
{
    move |input| g(f(input))
}

/// Sequential-composition primitive: `chain!(a, b, c)(s)` is `c(b(a(s)))`.
#[macro_export]
macro_rules! chain {
    () => {
        |input: $crate::RecordStream| input
    };
    ($only:expr $(,)?) => {
        $only
    };
    ($first:expr, $($rest:expr),+ $(,)?) => {{
        let xf = $first;
        $(let xf = $crate::compose(xf, $rest);)+
        xf
    }};
}

#[derive(Debug, Clone)]
pub struct EngineError {
    pub message: String,
}

impl EngineError {
    pub fn new(message: String) -> Self {
        Self { message }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EngineError {}

pub mod prelude {
    pub use crate::agg::{aggregate, avg, count, max, min, sum, Agg};
    pub use crate::io::{
        parse_field_value, read_csv, read_csv_from, read_jsonl, read_jsonl_path, write_csv,
        write_csv_to, write_jsonl, write_jsonl_path,
    };
    pub use crate::ops::{
        distinct, filter, group_by, limit, offset, reject, rename, select, sort_by,
    };
    pub use crate::{chain, compose, get_num, get_text, get_value, EngineError, Record, RecordStream};
}
