use rill_codegen::assemble::assemble_program;
use rill_codegen::error::CodegenErrorKind;
use rill_codegen::fragment::Fragment;

fn init_read_csv() -> Fragment {
    Fragment::init(
        "records",
        "let records = match read_csv(\"data.csv\") {\n    Ok(rows) => rows,\n    Err(err) => return Err(format!(\"reading data.csv: {err}\").into()),\n};".to_string(),
        Vec::new(),
        Some("rill read-csv data.csv".to_string()),
    )
}

fn stmt_filter(output: &str, input: &str) -> Fragment {
    Fragment::stmt(
        output,
        input,
        format!("let {output} = filter(|r| get_num(r, \"age\") > 18.0)({input});"),
        Vec::new(),
        Some("rill where --match age gt 18".to_string()),
    )
}

fn sink_write_csv(input: &str) -> Fragment {
    Fragment::sink(
        input,
        format!(
            "if let Err(err) = write_csv({input}, \"out.csv\") {{\n    return Err(format!(\"writing out.csv: {{err}}\").into());\n}}"
        ),
        Vec::new(),
        Some("rill write-csv out.csv".to_string()),
    )
}

#[test]
fn scenario_source_filter_sink_assembles_in_order() {
    let fragments = vec![
        init_read_csv(),
        stmt_filter("filtered", "records"),
        sink_write_csv("filtered"),
    ];
    let program = assemble_program(&fragments).unwrap();

    let read_at = program.find("read_csv(\"data.csv\")").unwrap();
    let filter_at = program.find("filter(|r| get_num(r, \"age\") > 18.0)").unwrap();
    let write_at = program.find("write_csv(filtered, \"out.csv\")").unwrap();
    assert!(read_at < filter_at && filter_at < write_at);

    // single stmt stays verbatim, no fusion
    assert!(!program.contains("chain!"));
    // entry-point idiom: no error returns survive
    assert!(!program.contains("return Err"));
    assert!(program.contains("process::exit(1)"));
    assert!(program.contains("use rill_engine::prelude::*;"));
    assert!(program.contains("fn main() {"));
}

#[test]
fn scenario_three_transforms_fuse_into_one_chain() {
    let fragments = vec![
        stmt_filter("filtered", "records"),
        Fragment::stmt(
            "limited",
            "filtered",
            "let limited = limit(10)(filtered);".to_string(),
            Vec::new(),
            None,
        ),
        Fragment::stmt(
            "sorted",
            "limited",
            "let sorted = sort_by(\"age\", false)(limited);".to_string(),
            Vec::new(),
            None,
        ),
    ];
    let program = assemble_program(&fragments).unwrap();

    let chain_at = program.find("let sorted = chain!(").unwrap();
    let f1 = program.find("filter(|r| get_num(r, \"age\") > 18.0),").unwrap();
    let f2 = program.find("limit(10),").unwrap();
    let f3 = program.find("sort_by(\"age\", false),").unwrap();
    assert!(chain_at < f1 && f1 < f2 && f2 < f3);

    // applied exactly once, to the first transform's input
    assert_eq!(program.matches(")(records);").count(), 1);
    assert!(!program.contains("(filtered);"));
    assert!(!program.contains("(limited);"));
}

#[test]
fn scenario_empty_pipeline_is_refused() {
    let err = assemble_program(&[]).unwrap_err();
    assert_eq!(err.kind, CodegenErrorKind::EmptyPipeline);
}

#[test]
fn scenario_missing_sink_gets_default_jsonl_output() {
    let fragments = vec![init_read_csv(), stmt_filter("filtered", "records")];
    let program = assemble_program(&fragments).unwrap();

    assert!(program.contains("write_jsonl(filtered, io::stdout())"));
    assert!(program.contains("use std::io;"));
    assert!(program.contains("use std::process;"));
    // default sink comes after the transform
    let filter_at = program.find("filter(").unwrap();
    let sink_at = program.find("write_jsonl(").unwrap();
    assert!(filter_at < sink_at);
}

#[test]
fn provenance_banner_replays_the_pipeline() {
    let fragments = vec![
        init_read_csv(),
        stmt_filter("filtered", "records"),
        sink_write_csv("filtered"),
    ];
    let program = assemble_program(&fragments).unwrap();
    assert!(program.starts_with("// Generated by rill"));
    assert!(program.contains("//   rill read-csv data.csv |\n"));
    assert!(program.contains("//   rill where --match age gt 18 |\n"));
    assert!(program.contains("//   rill generate\n"));
}

#[test]
fn fragments_without_provenance_render_no_banner() {
    let fragments = vec![Fragment::stmt(
        "limited",
        "records",
        "let limited = limit(3)(records);".to_string(),
        Vec::new(),
        None,
    )];
    let program = assemble_program(&fragments).unwrap();
    assert!(program.starts_with("use "));
}

#[test]
fn declared_imports_reach_the_import_block_once() {
    let fragments = vec![
        Fragment::stmt(
            "filtered",
            "records",
            "let filtered = filter(|r| Regex::new(\"^a\").map(|re| re.is_match(&get_text(r, \"name\"))).unwrap_or(false))(records);".to_string(),
            vec!["regex::Regex".to_string()],
            None,
        ),
        Fragment::stmt(
            "filtered2",
            "filtered",
            "let filtered2 = filter(|r| Regex::new(\"b$\").map(|re| re.is_match(&get_text(r, \"name\"))).unwrap_or(false))(filtered);".to_string(),
            vec!["regex::Regex".to_string()],
            None,
        ),
    ];
    let program = assemble_program(&fragments).unwrap();
    assert_eq!(program.matches("use regex::Regex;").count(), 1);
    // std imports come before external ones
    let std_at = program.find("use std::io;").unwrap();
    let ext_at = program.find("use regex::Regex;").unwrap();
    assert!(std_at < ext_at);
}
