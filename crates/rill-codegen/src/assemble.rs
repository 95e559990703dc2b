//! Turns a complete, ordered fragment sequence into one compilable Rust
//! program: partition by kind, consolidate imports, fuse adjacent
//! transforms into a single `chain!` call, rewrite the return-an-error
//! idiom for `fn main()`, render.

use std::collections::BTreeSet;

use crate::error::{CodegenError, CodegenErrorKind};
use crate::fragment::{Fragment, FragmentKind, SOURCE_VAR};

/// Fixed import every generated program carries.
pub const ENGINE_IMPORT: &str = "rill_engine::prelude::*";

/// Extra imports for the synthesized default sink.
const DEFAULT_SINK_IMPORTS: [&str; 2] = ["std::io", "std::process"];

const RETURN_ERR: &str = "return Err(";

pub fn assemble_program(fragments: &[Fragment]) -> Result<String, CodegenError> {
    if fragments.is_empty() {
        return Err(CodegenError::new(
            CodegenErrorKind::EmptyPipeline,
            "no code fragments received".to_string(),
        ));
    }

    let inits: Vec<&Fragment> = by_kind(fragments, FragmentKind::Init);
    let stmts: Vec<&Fragment> = by_kind(fragments, FragmentKind::Stmt);
    let finals: Vec<&Fragment> = by_kind(fragments, FragmentKind::Final);

    let imports = consolidate_imports(fragments, finals.is_empty());

    let mut body: Vec<String> = Vec::new();
    for frag in &inits {
        body.push(rewrite_error_returns(&frag.code));
    }
    if stmts.len() == 1 {
        body.push(rewrite_error_returns(&stmts[0].code));
    } else if stmts.len() > 1 {
        body.extend(fuse_stmts(&stmts));
    }
    if finals.is_empty() {
        body.push(default_sink(last_output(&inits, &stmts)));
    } else {
        for frag in &finals {
            body.push(rewrite_error_returns(&frag.code));
        }
    }

    Ok(render_program(fragments, &imports, &body))
}

/// Union of every fragment's imports plus the fixed engine import, plus
/// what the default sink and the error-idiom rewrite need. Standard-library
/// paths sort before external ones, lexicographic within each group;
/// duplicates collapse. Stable by construction.
pub fn consolidate_imports(fragments: &[Fragment], with_default_sink: bool) -> Vec<String> {
    let mut set: BTreeSet<String> = BTreeSet::new();
    set.insert(ENGINE_IMPORT.to_string());
    if with_default_sink {
        set.extend(DEFAULT_SINK_IMPORTS.iter().map(|s| s.to_string()));
    }
    if fragments.iter().any(|f| f.code.contains(RETURN_ERR)) {
        set.insert("std::process".to_string());
    }
    for frag in fragments {
        for import in &frag.imports {
            if !import.is_empty() {
                set.insert(import.clone());
            }
        }
    }
    let (std_group, ext_group): (Vec<String>, Vec<String>) =
        set.into_iter().partition(|p| is_std_path(p));
    std_group.into_iter().chain(ext_group).collect()
}

fn is_std_path(path: &str) -> bool {
    matches!(path.split("::").next(), Some("std" | "core" | "alloc"))
}

fn by_kind<'a>(fragments: &'a [Fragment], kind: FragmentKind) -> Vec<&'a Fragment> {
    fragments.iter().filter(|f| f.kind == kind).collect()
}

fn last_output<'a>(inits: &[&'a Fragment], stmts: &[&'a Fragment]) -> &'a str {
    stmts
        .last()
        .or_else(|| inits.last())
        .map(|f| f.output_name.as_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(SOURCE_VAR)
}

/// Fuse consecutive extractable transforms into one `chain!` call bound to
/// the run's last output and applied to its first input. A fragment whose
/// code does not match the `let out = expr(in);` shape is emitted verbatim
/// in sequence position; runs on either side of it still fuse, which keeps
/// every binding a later fragment consumes.
fn fuse_stmts(stmts: &[&Fragment]) -> Vec<String> {
    let mut out = Vec::new();
    let mut run: Vec<(String, &Fragment)> = Vec::new();
    for frag in stmts {
        match extract_transform(frag) {
            Some(expr) => run.push((expr, *frag)),
            None => {
                flush_run(&mut out, &mut run);
                out.push(rewrite_error_returns(&frag.code));
            }
        }
    }
    flush_run(&mut out, &mut run);
    out
}

fn flush_run(out: &mut Vec<String>, run: &mut Vec<(String, &Fragment)>) {
    match run.as_slice() {
        [] => {}
        [(_, only)] => out.push(rewrite_error_returns(&only.code)),
        [(_, first), .., (_, last)] => {
            let mut buf = format!("let {} = chain!(\n", last.output_name);
            for (expr, _) in run.iter() {
                buf.push_str("    ");
                buf.push_str(expr);
                buf.push_str(",\n");
            }
            buf.push_str(&format!(")({});", first.input_name));
            out.push(buf);
        }
    }
    run.clear();
}

/// Pull the pure transform expression out of `let out = expr(in);`.
fn extract_transform(frag: &Fragment) -> Option<String> {
    let code = frag.code.trim();
    let rest = code.strip_prefix(&format!("let {} =", frag.output_name))?;
    let rest = rest.trim_start();
    let rest = rest.strip_suffix(';').unwrap_or(rest).trim_end();
    let expr = rest.strip_suffix(&format!("({})", frag.input_name))?;
    let expr = expr.trim_end();
    if expr.is_empty() {
        None
    } else {
        Some(expr.to_string())
    }
}

/// Serialize the last binding as line-delimited records on stdout;
/// synthesized only when the pipeline supplied no `Final` fragment.
fn default_sink(var: &str) -> String {
    format!(
        "if let Err(err) = write_jsonl({var}, io::stdout()) {{\n    eprintln!(\"writing output: {{err}}\");\n    process::exit(1);\n}}"
    )
}

/// Snippets are written as if they could return a formatted error to a
/// caller. The assembled body lives in `fn main()`, which cannot, so every
/// `return Err(format!(..).into())` becomes a stderr diagnostic followed by
/// a non-zero exit.
pub fn rewrite_error_returns(code: &str) -> String {
    let mut out = String::new();
    let mut rest = code;
    while let Some(idx) = rest.find(RETURN_ERR) {
        out.push_str(&rest[..idx]);
        let after = &rest[idx + RETURN_ERR.len()..];
        let Some(close) = balanced_paren_end(after) else {
            out.push_str(&rest[idx..]);
            return out;
        };
        let inner = &after[..close];
        let mut tail = &after[close + 1..];
        if let Some(t) = tail.strip_prefix(';') {
            tail = t;
        }
        out.push_str(&render_abort(inner));
        rest = tail;
    }
    out.push_str(rest);
    out
}

fn render_abort(inner: &str) -> String {
    let inner = inner.trim();
    let inner = inner.strip_suffix(".into()").unwrap_or(inner);
    if let Some(args) = inner
        .strip_prefix("format!(")
        .and_then(|r| r.strip_suffix(')'))
    {
        format!("{{ eprintln!({args}); process::exit(1) }}")
    } else {
        format!("{{ eprintln!(\"error: {{}}\", {inner}); process::exit(1) }}")
    }
}

/// Index of the `)` closing an already-open parenthesis, skipping string
/// literals.
fn balanced_paren_end(text: &str) -> Option<usize> {
    let mut depth = 1usize;
    let mut in_str = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if in_str {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_str = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_str = true,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn render_program(fragments: &[Fragment], imports: &[String], body: &[String]) -> String {
    let mut src = String::new();

    let provenance: Vec<&str> = fragments
        .iter()
        .filter_map(|f| f.provenance.as_deref())
        .collect();
    if !provenance.is_empty() {
        src.push_str(&format!(
            "// Generated by rill {}:\n//\n//   export RILL_EMIT=1\n",
            env!("CARGO_PKG_VERSION")
        ));
        for cmd in &provenance {
            src.push_str(&format!("//   {cmd} |\n"));
        }
        src.push_str("//   rill generate\n//\n");
    }

    let split = imports.iter().position(|p| !is_std_path(p));
    for (i, import) in imports.iter().enumerate() {
        if Some(i) == split && i > 0 {
            src.push('\n');
        }
        src.push_str(&format!("use {import};\n"));
    }
    src.push('\n');

    src.push_str("fn main() {\n");
    for stmt in body {
        for line in stmt.lines() {
            if line.is_empty() {
                src.push('\n');
            } else {
                src.push_str("    ");
                src.push_str(line);
                src.push('\n');
            }
        }
    }
    src.push_str("}\n");
    src
}
