use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod generate;
mod group;
mod mode;
mod read;
mod stage;
mod transforms;
mod write;

#[derive(Parser)]
#[command(name = "rill")]
#[command(about = "Record pipelines that can replay themselves as Rust source.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Read CSV from a file (or stdin) into the record stream.
    ReadCsv {
        file: Option<String>,
        #[arg(long)]
        emit: bool,
    },
    /// Read line-delimited JSON from a file (or stdin).
    ReadJson {
        file: Option<String>,
        #[arg(long)]
        emit: bool,
    },
    /// Keep records matching every condition.
    Where {
        /// Condition as three values: FIELD OP VALUE. Repeatable.
        #[arg(long = "match", num_args = 3, value_names = ["FIELD", "OP", "VALUE"], action = clap::ArgAction::Append)]
        matches: Vec<String>,
        #[arg(long)]
        emit: bool,
    },
    /// Keep only the named fields (or drop them with --drop).
    Select {
        #[arg(required = true)]
        fields: Vec<String>,
        #[arg(long)]
        drop: bool,
        #[arg(long)]
        emit: bool,
    },
    /// Take the first N records.
    Limit {
        n: usize,
        #[arg(long)]
        emit: bool,
    },
    /// Skip the first N records.
    Offset {
        n: usize,
        #[arg(long)]
        emit: bool,
    },
    /// Sort by one field.
    Sort {
        field: String,
        #[arg(long)]
        desc: bool,
        #[arg(long)]
        emit: bool,
    },
    /// Drop exact duplicate records.
    Distinct {
        #[arg(long)]
        emit: bool,
    },
    /// Rename fields.
    Rename {
        /// Rename as two values: FROM TO. Repeatable.
        #[arg(long = "map", num_args = 2, value_names = ["FROM", "TO"], action = clap::ArgAction::Append, required = true)]
        map: Vec<String>,
        #[arg(long)]
        emit: bool,
    },
    /// Group by fields and aggregate.
    GroupBy {
        #[arg(required = true)]
        fields: Vec<String>,
        /// Count group members into the named result field. Repeatable.
        #[arg(long, value_name = "NAME", action = clap::ArgAction::Append)]
        count: Vec<String>,
        #[arg(long, num_args = 2, value_names = ["FIELD", "NAME"], action = clap::ArgAction::Append)]
        sum: Vec<String>,
        #[arg(long, num_args = 2, value_names = ["FIELD", "NAME"], action = clap::ArgAction::Append)]
        avg: Vec<String>,
        #[arg(long, num_args = 2, value_names = ["FIELD", "NAME"], action = clap::ArgAction::Append)]
        min: Vec<String>,
        #[arg(long, num_args = 2, value_names = ["FIELD", "NAME"], action = clap::ArgAction::Append)]
        max: Vec<String>,
        #[arg(long)]
        emit: bool,
    },
    /// Write the record stream as CSV to a file (or stdout).
    WriteCsv {
        file: Option<String>,
        #[arg(long)]
        emit: bool,
    },
    /// Write the record stream as line-delimited JSON to a file (or stdout).
    WriteJson {
        file: Option<String>,
        #[arg(long)]
        emit: bool,
    },
    /// Assemble the accumulated fragment stream into a Rust program.
    Generate {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    Version,
}

fn main() -> std::process::ExitCode {
    match try_main() {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            std::process::ExitCode::from(2)
        }
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let provenance = mode::invocation_line();

    match cli.cmd {
        Cmd::ReadCsv { file, emit } => {
            read::run_read_csv(file.as_deref(), mode::emit_requested(emit), &provenance)
        }
        Cmd::ReadJson { file, emit } => {
            read::run_read_json(file.as_deref(), mode::emit_requested(emit), &provenance)
        }
        Cmd::Where { matches, emit } => {
            transforms::run_where(&matches, mode::emit_requested(emit), &provenance)
        }
        Cmd::Select { fields, drop, emit } => {
            transforms::run_select(fields, drop, mode::emit_requested(emit), &provenance)
        }
        Cmd::Limit { n, emit } => transforms::run_limit(n, mode::emit_requested(emit), &provenance),
        Cmd::Offset { n, emit } => {
            transforms::run_offset(n, mode::emit_requested(emit), &provenance)
        }
        Cmd::Sort { field, desc, emit } => {
            transforms::run_sort(&field, desc, mode::emit_requested(emit), &provenance)
        }
        Cmd::Distinct { emit } => transforms::run_distinct(mode::emit_requested(emit), &provenance),
        Cmd::Rename { map, emit } => {
            transforms::run_rename(&map, mode::emit_requested(emit), &provenance)
        }
        Cmd::GroupBy {
            fields,
            count,
            sum,
            avg,
            min,
            max,
            emit,
        } => group::run_group_by(
            group::GroupByArgs {
                fields,
                count,
                sum,
                avg,
                min,
                max,
            },
            mode::emit_requested(emit),
            &provenance,
        ),
        Cmd::WriteCsv { file, emit } => {
            write::run_write_csv(file.as_deref(), mode::emit_requested(emit), &provenance)
        }
        Cmd::WriteJson { file, emit } => {
            write::run_write_json(file.as_deref(), mode::emit_requested(emit), &provenance)
        }
        Cmd::Generate { out } => generate::run(out.as_deref()),
        Cmd::Version => {
            println!("rill {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
