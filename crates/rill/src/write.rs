//! Sink stages: `write-csv` and `write-json`.

use std::io;

use anyhow::Result;

use rill_codegen::emit::{fallible_sink, literal_safe, quote};
use rill_codegen::fragment::Fragment;

use rill_engine::prelude::*;

use crate::stage;

pub fn run_write_csv(file: Option<&str>, emit: bool, provenance: &str) -> Result<()> {
    if emit {
        return emit_sink(file, "write_csv", "write_csv_to", provenance);
    }
    let records = read_jsonl(io::stdin());
    match file {
        Some(path) => write_csv(records, path)?,
        None => write_csv_to(records, io::stdout().lock())?,
    }
    Ok(())
}

pub fn run_write_json(file: Option<&str>, emit: bool, provenance: &str) -> Result<()> {
    if emit {
        return emit_sink(file, "write_jsonl_path", "write_jsonl", provenance);
    }
    let records = read_jsonl(io::stdin());
    match file {
        Some(path) => write_jsonl_path(records, path)?,
        None => write_jsonl(records, io::stdout().lock())?,
    }
    Ok(())
}

fn emit_sink(
    file: Option<&str>,
    file_op: &str,
    stream_op: &str,
    provenance: &str,
) -> Result<()> {
    let mut producer = stage::stdout_producer()?;
    let input = producer.input_name();
    let (code, imports) = match file {
        Some(path) => (
            fallible_sink(
                &format!("{file_op}({input}, {})", quote(path)),
                &format!("writing {}", literal_safe(path)),
            ),
            Vec::new(),
        ),
        None => (
            fallible_sink(
                &format!("{stream_op}({input}, io::stdout())"),
                "writing output",
            ),
            vec!["std::io".to_string()],
        ),
    };
    producer.push(Fragment::sink(
        &input,
        code,
        imports,
        Some(provenance.to_string()),
    ))?;
    Ok(())
}
