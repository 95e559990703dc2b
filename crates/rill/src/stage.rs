//! Plumbing shared by every stage subcommand.

use std::io::{self, IsTerminal};

use anyhow::Result;

use rill_codegen::error::CodegenError;
use rill_codegen::fragment::Fragment;
use rill_codegen::producer::Producer;
use rill_codegen::transport;
use rill_engine::prelude::*;

/// Drain upstream fragments from stdin. An interactive stdin means the
/// stage runs first in its pipeline: no upstream, empty list.
pub fn upstream_fragments() -> Result<Vec<Fragment>, CodegenError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(Vec::new());
    }
    transport::read_fragments(stdin.lock())
}

pub fn stdout_producer() -> Result<Producer<io::StdoutLock<'static>>> {
    let upstream = upstream_fragments()?;
    Ok(Producer::new(upstream, io::stdout().lock()))
}

/// Execute-mode plumbing for intermediate stages: records in as JSONL on
/// stdin, transformed records out as JSONL on stdout.
pub fn execute_transform(xf: impl FnOnce(RecordStream) -> RecordStream) -> Result<()> {
    let records = read_jsonl(io::stdin());
    write_jsonl(xf(records), io::stdout().lock())?;
    Ok(())
}
