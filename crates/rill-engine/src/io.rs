//! CSV and JSONL codecs for live record streams.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};

use serde_json::Value;

use crate::{EngineError, Record, RecordStream};

/// Infer a field's type from its CSV text: bool, then integer, then float,
/// then string.
pub fn parse_field_value(raw: &str) -> Value {
    if raw == "true" {
        return Value::Bool(true);
    }
    if raw == "false" {
        return Value::Bool(false);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Value::from(f);
    }
    Value::String(raw.to_string())
}

pub fn read_csv(path: &str) -> Result<RecordStream, EngineError> {
    let file = File::open(path).map_err(|e| EngineError::new(format!("open {path}: {e}")))?;
    Ok(read_csv_from(file))
}

/// Header row names the fields; malformed rows are skipped.
pub fn read_csv_from<R: Read + 'static>(reader: R) -> RecordStream {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = match rdr.headers() {
        Ok(h) => h.iter().map(str::to_string).collect(),
        Err(_) => return Box::new(std::iter::empty()),
    };
    Box::new(rdr.into_records().filter_map(move |row| {
        let row = row.ok()?;
        let mut rec = Record::new();
        for (i, cell) in row.iter().enumerate() {
            let name = headers
                .get(i)
                .cloned()
                .unwrap_or_else(|| format!("col{i}"));
            rec.insert(name, parse_field_value(cell));
        }
        Some(rec)
    }))
}

pub fn write_csv(stream: RecordStream, path: &str) -> Result<(), EngineError> {
    let file = File::create(path).map_err(|e| EngineError::new(format!("create {path}: {e}")))?;
    write_csv_to(stream, file)
}

/// The first record's fields become the header; later records are projected
/// onto those columns.
pub fn write_csv_to<W: Write>(stream: RecordStream, writer: W) -> Result<(), EngineError> {
    let mut wtr = csv::Writer::from_writer(writer);
    let mut headers: Vec<String> = Vec::new();
    for rec in stream {
        if headers.is_empty() {
            headers = rec.keys().cloned().collect();
            wtr.write_record(&headers)
                .map_err(|e| EngineError::new(format!("writing CSV header: {e}")))?;
        }
        let row: Vec<String> = headers.iter().map(|h| csv_cell(rec.get(h))).collect();
        wtr.write_record(&row)
            .map_err(|e| EngineError::new(format!("writing CSV row: {e}")))?;
    }
    wtr.flush()
        .map_err(|e| EngineError::new(format!("flushing CSV: {e}")))
}

pub fn read_jsonl_path(path: &str) -> Result<RecordStream, EngineError> {
    let file = File::open(path).map_err(|e| EngineError::new(format!("open {path}: {e}")))?;
    Ok(read_jsonl(file))
}

/// One JSON object per line; blank and malformed lines are skipped.
pub fn read_jsonl<R: Read + 'static>(reader: R) -> RecordStream {
    Box::new(BufReader::new(reader).lines().filter_map(|line| {
        let line = line.ok()?;
        if line.trim().is_empty() {
            return None;
        }
        match serde_json::from_str::<Value>(&line) {
            Ok(Value::Object(m)) => Some(m),
            _ => None,
        }
    }))
}

pub fn write_jsonl_path(stream: RecordStream, path: &str) -> Result<(), EngineError> {
    let file = File::create(path).map_err(|e| EngineError::new(format!("create {path}: {e}")))?;
    write_jsonl(stream, file)
}

pub fn write_jsonl<W: Write>(stream: RecordStream, writer: W) -> Result<(), EngineError> {
    let mut w = BufWriter::new(writer);
    for rec in stream {
        let line = serde_json::to_string(&rec)
            .map_err(|e| EngineError::new(format!("encoding record: {e}")))?;
        writeln!(w, "{line}").map_err(|e| EngineError::new(format!("writing record: {e}")))?;
    }
    w.flush()
        .map_err(|e| EngineError::new(format!("flushing output: {e}")))
}

fn csv_cell(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
