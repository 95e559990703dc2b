//! Source stages: `read-csv` and `read-json`.

use std::io;

use anyhow::Result;

use rill_codegen::emit::{fallible_init, literal_safe, quote};
use rill_codegen::fragment::{Fragment, SOURCE_VAR};
use rill_codegen::transport;
use rill_engine::prelude::*;

pub fn run_read_csv(file: Option<&str>, emit: bool, provenance: &str) -> Result<()> {
    if emit {
        return emit_init(csv_fragment(file, provenance));
    }
    let records = match file {
        Some(path) => read_csv(path)?,
        None => read_csv_from(io::stdin()),
    };
    write_jsonl(records, io::stdout().lock())?;
    Ok(())
}

pub fn run_read_json(file: Option<&str>, emit: bool, provenance: &str) -> Result<()> {
    if emit {
        return emit_init(json_fragment(file, provenance));
    }
    let records = match file {
        Some(path) => read_jsonl_path(path)?,
        None => read_jsonl(io::stdin()),
    };
    write_jsonl(records, io::stdout().lock())?;
    Ok(())
}

/// Sources run first in the pipeline; there is no upstream list to forward.
fn emit_init(fragment: Fragment) -> Result<()> {
    let mut out = io::stdout().lock();
    transport::write_fragment(&mut out, &fragment)?;
    Ok(())
}

fn csv_fragment(file: Option<&str>, provenance: &str) -> Fragment {
    match file {
        Some(path) => Fragment::init(
            SOURCE_VAR,
            fallible_init(
                SOURCE_VAR,
                &format!("read_csv({})", quote(path)),
                &format!("reading {}", literal_safe(path)),
            ),
            Vec::new(),
            Some(provenance.to_string()),
        ),
        None => Fragment::init(
            SOURCE_VAR,
            format!("let {SOURCE_VAR} = read_csv_from(io::stdin());"),
            vec!["std::io".to_string()],
            Some(provenance.to_string()),
        ),
    }
}

fn json_fragment(file: Option<&str>, provenance: &str) -> Fragment {
    match file {
        Some(path) => Fragment::init(
            SOURCE_VAR,
            fallible_init(
                SOURCE_VAR,
                &format!("read_jsonl_path({})", quote(path)),
                &format!("reading {}", literal_safe(path)),
            ),
            Vec::new(),
            Some(provenance.to_string()),
        ),
        None => Fragment::init(
            SOURCE_VAR,
            format!("let {SOURCE_VAR} = read_jsonl(io::stdin());"),
            vec!["std::io".to_string()],
            Some(provenance.to_string()),
        ),
    }
}
