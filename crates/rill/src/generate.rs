//! `generate`: the terminal consumer. Reads the accumulated fragment stream
//! and writes one assembled Rust program.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use rill_codegen::assemble::assemble_program;

use crate::stage;

pub fn run(out: Option<&Path>) -> Result<()> {
    let fragments = stage::upstream_fragments()?;
    let program = assemble_program(&fragments)?;
    match out {
        Some(path) => {
            fs::write(path, &program).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("generated Rust program written to {}", path.display());
        }
        None => print!("{program}"),
    }
    Ok(())
}
