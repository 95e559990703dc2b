use std::io::Write as _;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

fn run_rill(args: &[&str], stdin: &[u8], envs: &[(&str, &str)]) -> Output {
    let exe = env!("CARGO_BIN_EXE_rill");
    let mut cmd = Command::new(exe);
    cmd.args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .env_remove("RILL_EMIT");
    for (k, v) in envs {
        cmd.env(k, v);
    }
    let mut child = cmd.spawn().expect("spawn rill");
    child
        .stdin
        .as_mut()
        .expect("child stdin")
        .write_all(stdin)
        .expect("write stdin");
    child.wait_with_output().expect("run rill")
}

fn stdout_str(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr_str(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn tmp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("rill_test_{}_{name}", std::process::id()))
}

#[test]
fn execute_pipeline_filters_and_limits_records() {
    let input = b"{\"age\":30,\"name\":\"ada\"}\n{\"age\":10,\"name\":\"kid\"}\n{\"age\":41,\"name\":\"bob\"}\n";
    let out = run_rill(&["where", "--match", "age", "gt", "18"], input, &[]);
    assert_eq!(out.status.code(), Some(0), "stderr:\n{}", stderr_str(&out));
    let filtered = stdout_str(&out);
    assert_eq!(filtered.lines().count(), 2);
    assert!(filtered.contains("ada"));
    assert!(!filtered.contains("kid"));

    let out = run_rill(&["limit", "1"], filtered.as_bytes(), &[]);
    assert_eq!(out.status.code(), Some(0));
    assert_eq!(stdout_str(&out).lines().count(), 1);
}

#[test]
fn emit_pipeline_assembles_a_program() {
    // rill read-csv people.csv | rill where ... | rill sort ... | rill generate
    let out = run_rill(&["read-csv", "people.csv", "--emit"], b"", &[]);
    assert_eq!(out.status.code(), Some(0), "stderr:\n{}", stderr_str(&out));
    assert!(stdout_str(&out).contains("\"kind\":\"init\""));
    let wire = out.stdout;

    let out = run_rill(
        &["where", "--emit", "--match", "age", "gt", "18"],
        &wire,
        &[],
    );
    assert_eq!(out.status.code(), Some(0), "stderr:\n{}", stderr_str(&out));
    let wire = out.stdout;

    let out = run_rill(&["sort", "age", "--desc", "--emit"], &wire, &[]);
    assert_eq!(out.status.code(), Some(0), "stderr:\n{}", stderr_str(&out));
    let wire = out.stdout;

    let out = run_rill(&["generate"], &wire, &[]);
    assert_eq!(out.status.code(), Some(0), "stderr:\n{}", stderr_str(&out));
    let program = stdout_str(&out);

    assert!(program.contains("// Generated by rill"));
    assert!(program.contains("//   rill read-csv people.csv |"));
    assert!(program.contains("use rill_engine::prelude::*;"));
    assert!(program.contains("match read_csv(\"people.csv\")"));
    assert!(program.contains("let sorted = chain!("));
    assert!(program.contains("filter(|r| get_num(r, \"age\") > 18.0),"));
    assert!(program.contains("sort_by(\"age\", true),"));
    assert!(program.contains(")(records);"));
    // no sink stage: the default JSONL output is appended
    assert!(program.contains("write_jsonl(sorted, io::stdout())"));
    assert!(!program.contains("return Err"));
}

#[test]
fn env_var_flips_a_stage_into_emit_mode() {
    let out = run_rill(&["limit", "10"], b"", &[("RILL_EMIT", "1")]);
    assert_eq!(out.status.code(), Some(0), "stderr:\n{}", stderr_str(&out));
    let text = stdout_str(&out);
    assert!(text.contains("\"kind\":\"stmt\""));
    assert!(text.contains("\"outputName\":\"limited\""));
    assert!(text.contains("let limited = limit(10)(records);"));
    // provenance drops the implied mode context
    assert!(text.contains("\"provenance\":\"rill limit 10\""));
}

#[test]
fn group_by_emits_two_chained_fragments() {
    let out = run_rill(
        &[
            "group-by", "dept", "--count", "n", "--sum", "salary", "total", "--emit",
        ],
        b"",
        &[],
    );
    assert_eq!(out.status.code(), Some(0), "stderr:\n{}", stderr_str(&out));
    let text = stdout_str(&out);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("\"outputName\":\"grouped\""));
    assert!(lines[0].contains("group_by(\\\"_group\\\", vec![\\\"dept\\\"])"));
    assert!(lines[1].contains("\"inputName\":\"grouped\""));
    assert!(lines[1].contains("\"outputName\":\"aggregated\""));
}

#[test]
fn generate_with_no_fragments_fails_cleanly() {
    let out = run_rill(&["generate"], b"", &[]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stdout_str(&out).is_empty());
    assert!(stderr_str(&out).contains("no code fragments received"));
}

#[test]
fn generate_writes_to_a_file_and_confirms_on_stderr() {
    let out = run_rill(&["limit", "3", "--emit"], b"", &[]);
    let wire = out.stdout;

    let path = tmp_path("prog.rs");
    let out = run_rill(&["generate", "--out", path.to_str().unwrap()], &wire, &[]);
    assert_eq!(out.status.code(), Some(0), "stderr:\n{}", stderr_str(&out));
    assert!(stdout_str(&out).is_empty());
    assert!(stderr_str(&out).contains("generated Rust program written to"));

    let program = std::fs::read_to_string(&path).expect("read generated program");
    assert!(program.contains("fn main() {"));
    assert!(program.contains("let limited = limit(3)(records);"));
    std::fs::remove_file(&path).ok();
}

#[test]
fn malformed_fragment_stream_is_a_fatal_decode_error() {
    let out = run_rill(&["limit", "3", "--emit"], b"{\"kind\": \"stmt\", nope", &[]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr_str(&out).contains("decoding fragment"));
}

#[test]
fn stage_parameter_validation_fails_before_emission() {
    let out = run_rill(&["limit", "0", "--emit"], b"", &[]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stdout_str(&out).is_empty());
    assert!(stderr_str(&out).contains("limit must be positive"));

    let out = run_rill(
        &["where", "--emit", "--match", "age", "between", "9"],
        b"",
        &[],
    );
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr_str(&out).contains("unknown operator"));
}

#[test]
fn read_csv_executes_against_a_real_file() {
    let path = tmp_path("people.csv");
    std::fs::write(&path, "name,age\nada,41\nkid,10\n").expect("write fixture");

    let out = run_rill(&["read-csv", path.to_str().unwrap()], b"", &[]);
    assert_eq!(out.status.code(), Some(0), "stderr:\n{}", stderr_str(&out));
    let text = stdout_str(&out);
    assert_eq!(text.lines().count(), 2);
    assert!(text.contains("\"name\":\"ada\""));
    assert!(text.contains("\"age\":41"));
    std::fs::remove_file(&path).ok();
}

#[test]
fn repeated_stages_get_distinct_bindings() {
    let out = run_rill(&["limit", "10", "--emit"], b"", &[]);
    let wire = out.stdout;
    let out = run_rill(&["limit", "5", "--emit"], &wire, &[]);
    assert_eq!(out.status.code(), Some(0));
    let text = stdout_str(&out);
    assert!(text.contains("\"outputName\":\"limited\""));
    assert!(text.contains("\"outputName\":\"limited2\""));
    assert!(text.contains("let limited2 = limit(5)(limited);"));
}

#[test]
fn version_prints_the_crate_version() {
    let out = run_rill(&["version"], b"", &[]);
    assert_eq!(out.status.code(), Some(0));
    assert!(stdout_str(&out).starts_with("rill "));
}
