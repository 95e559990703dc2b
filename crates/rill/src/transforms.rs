//! Intermediate stages: `where`, `select`, `limit`, `offset`, `sort`,
//! `distinct`, `rename`.

use std::cmp::Ordering;

use anyhow::Result;
use regex::Regex;
use serde_json::Value;

use rill_codegen::emit::{quote, OpExpr};
use rill_codegen::error::{CodegenError, CodegenErrorKind};
use rill_codegen::fragment::Fragment;

use rill_engine::prelude::*;

use crate::stage;

pub fn run_where(matches: &[String], emit: bool, provenance: &str) -> Result<()> {
    let conds = parse_conds(matches)?;
    if emit {
        let (predicate, imports) = render_predicate(&conds);
        return emit_stmt("filtered", OpExpr::new("filter").arg(predicate), imports, provenance);
    }
    let compiled = compile_conds(conds)?;
    stage::execute_transform(filter(move |r| compiled.iter().all(|c| c.matches(r))))
}

pub fn run_select(fields: Vec<String>, drop: bool, emit: bool, provenance: &str) -> Result<()> {
    if emit {
        let op = if drop { "reject" } else { "select" };
        let expr = OpExpr::new(op).arg(string_vec_literal(&fields));
        return emit_stmt("selected", expr, Vec::new(), provenance);
    }
    if drop {
        stage::execute_transform(reject(fields))
    } else {
        stage::execute_transform(select(fields))
    }
}

pub fn run_limit(n: usize, emit: bool, provenance: &str) -> Result<()> {
    if n == 0 {
        return Err(CodegenError::new(
            CodegenErrorKind::UnsupportedShape,
            "limit must be positive".to_string(),
        )
        .into());
    }
    if emit {
        return emit_stmt(
            "limited",
            OpExpr::new("limit").arg(n.to_string()),
            Vec::new(),
            provenance,
        );
    }
    stage::execute_transform(limit(n))
}

pub fn run_offset(n: usize, emit: bool, provenance: &str) -> Result<()> {
    if emit {
        return emit_stmt(
            "skipped",
            OpExpr::new("offset").arg(n.to_string()),
            Vec::new(),
            provenance,
        );
    }
    stage::execute_transform(offset(n))
}

pub fn run_sort(field: &str, desc: bool, emit: bool, provenance: &str) -> Result<()> {
    if emit {
        let expr = OpExpr::new("sort_by").quoted_arg(field).arg(desc.to_string());
        return emit_stmt("sorted", expr, Vec::new(), provenance);
    }
    stage::execute_transform(sort_by(field, desc))
}

pub fn run_distinct(emit: bool, provenance: &str) -> Result<()> {
    if emit {
        return emit_stmt("deduped", OpExpr::new("distinct"), Vec::new(), provenance);
    }
    stage::execute_transform(distinct())
}

pub fn run_rename(map: &[String], emit: bool, provenance: &str) -> Result<()> {
    let pairs: Vec<(String, String)> = map
        .chunks(2)
        .filter(|c| c.len() == 2)
        .map(|c| (c[0].clone(), c[1].clone()))
        .collect();
    if pairs.is_empty() {
        return Err(CodegenError::new(
            CodegenErrorKind::UnsupportedShape,
            "no rename mapping specified".to_string(),
        )
        .into());
    }
    if emit {
        let items: Vec<String> = pairs
            .iter()
            .map(|(from, to)| format!("({}, {})", quote(from), quote(to)))
            .collect();
        let expr = OpExpr::new("rename").arg(format!("vec![{}]", items.join(", ")));
        return emit_stmt("renamed", expr, Vec::new(), provenance);
    }
    stage::execute_transform(rename(pairs))
}

/// Forward upstream fragments and append one `Stmt` describing this stage.
fn emit_stmt(
    prefix: &str,
    expr: OpExpr,
    imports: Vec<String>,
    provenance: &str,
) -> Result<()> {
    let mut producer = stage::stdout_producer()?;
    let input = producer.input_name();
    let output = producer.next_output_name(prefix);
    let code = expr.binding(&output, &input);
    producer.push(Fragment::stmt(
        &output,
        &input,
        code,
        imports,
        Some(provenance.to_string()),
    ))?;
    Ok(())
}

fn string_vec_literal(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|s| quote(s)).collect();
    format!("vec![{}]", quoted.join(", "))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CondOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Contains,
    StartsWith,
    EndsWith,
    Regex,
}

#[derive(Debug, Clone)]
struct Cond {
    field: String,
    op: CondOp,
    value: String,
}

fn parse_conds(matches: &[String]) -> Result<Vec<Cond>, CodegenError> {
    let mut conds = Vec::new();
    for chunk in matches.chunks(3) {
        let [field, op, value] = chunk else {
            return Err(CodegenError::new(
                CodegenErrorKind::UnsupportedShape,
                "--match needs FIELD OP VALUE".to_string(),
            ));
        };
        let op = match op.as_str() {
            "eq" => CondOp::Eq,
            "ne" => CondOp::Ne,
            "gt" => CondOp::Gt,
            "ge" => CondOp::Ge,
            "lt" => CondOp::Lt,
            "le" => CondOp::Le,
            "contains" => CondOp::Contains,
            "startswith" => CondOp::StartsWith,
            "endswith" => CondOp::EndsWith,
            "regex" | "regexp" | "pattern" => CondOp::Regex,
            other => {
                return Err(CodegenError::new(
                    CodegenErrorKind::UnsupportedShape,
                    format!("unknown operator: {other}"),
                ))
            }
        };
        conds.push(Cond {
            field: field.clone(),
            op,
            value: value.clone(),
        });
    }
    Ok(conds)
}

struct CompiledCond {
    cond: Cond,
    re: Option<Regex>,
}

fn compile_conds(conds: Vec<Cond>) -> Result<Vec<CompiledCond>, CodegenError> {
    conds
        .into_iter()
        .map(|cond| {
            let re = if cond.op == CondOp::Regex {
                Some(Regex::new(&cond.value).map_err(|e| {
                    CodegenError::new(
                        CodegenErrorKind::UnsupportedShape,
                        format!("invalid pattern {:?}: {e}", cond.value),
                    )
                })?)
            } else {
                None
            };
            Ok(CompiledCond { cond, re })
        })
        .collect()
}

impl CompiledCond {
    fn matches(&self, r: &Record) -> bool {
        let c = &self.cond;
        match c.op {
            CondOp::Eq => compare_eq(r, &c.field, &c.value),
            CondOp::Ne => !compare_eq(r, &c.field, &c.value),
            CondOp::Gt => compare_order(r, &c.field, &c.value) == Some(Ordering::Greater),
            CondOp::Ge => matches!(
                compare_order(r, &c.field, &c.value),
                Some(Ordering::Greater) | Some(Ordering::Equal)
            ),
            CondOp::Lt => compare_order(r, &c.field, &c.value) == Some(Ordering::Less),
            CondOp::Le => matches!(
                compare_order(r, &c.field, &c.value),
                Some(Ordering::Less) | Some(Ordering::Equal)
            ),
            CondOp::Contains => get_text(r, &c.field).contains(&c.value),
            CondOp::StartsWith => get_text(r, &c.field).starts_with(&c.value),
            CondOp::EndsWith => get_text(r, &c.field).ends_with(&c.value),
            CondOp::Regex => self
                .re
                .as_ref()
                .is_some_and(|re| re.is_match(&get_text(r, &c.field))),
        }
    }
}

/// Numbers compare numerically when both sides are numeric; everything else
/// falls back to text.
fn compare_eq(r: &Record, field: &str, value: &str) -> bool {
    if let (Some(x), Ok(y)) = (
        r.get(field).and_then(Value::as_f64),
        value.parse::<f64>(),
    ) {
        return x == y;
    }
    get_text(r, field) == value
}

fn compare_order(r: &Record, field: &str, value: &str) -> Option<Ordering> {
    match (r.get(field).and_then(Value::as_f64), value.parse::<f64>()) {
        (Some(x), Ok(y)) => x.partial_cmp(&y),
        _ => Some(get_text(r, field).as_str().cmp(value)),
    }
}

/// Source text of the predicate closure for emit mode, plus any imports the
/// rendered conditions need.
fn render_predicate(conds: &[Cond]) -> (String, Vec<String>) {
    if conds.is_empty() {
        return ("|r| true".to_string(), Vec::new());
    }
    let mut imports = Vec::new();
    let rendered: Vec<String> = conds
        .iter()
        .map(|c| {
            let (text, extra) = render_cond(c);
            imports.extend(extra);
            text
        })
        .collect();
    imports.sort();
    imports.dedup();
    (format!("|r| {}", rendered.join(" && ")), imports)
}

fn render_cond(c: &Cond) -> (String, Vec<String>) {
    let field = quote(&c.field);
    let numeric = c.value.parse::<f64>().ok();
    let text_value = quote(&c.value);
    match c.op {
        CondOp::Eq => match numeric {
            Some(v) => (format!("get_num(r, {field}) == {v:?}"), Vec::new()),
            None => (format!("get_text(r, {field}) == {text_value}"), Vec::new()),
        },
        CondOp::Ne => match numeric {
            Some(v) => (format!("get_num(r, {field}) != {v:?}"), Vec::new()),
            None => (format!("get_text(r, {field}) != {text_value}"), Vec::new()),
        },
        CondOp::Gt => (ordered_cond(&field, ">", numeric, &text_value), Vec::new()),
        CondOp::Ge => (ordered_cond(&field, ">=", numeric, &text_value), Vec::new()),
        CondOp::Lt => (ordered_cond(&field, "<", numeric, &text_value), Vec::new()),
        CondOp::Le => (ordered_cond(&field, "<=", numeric, &text_value), Vec::new()),
        CondOp::Contains => (
            format!("get_text(r, {field}).contains({text_value})"),
            Vec::new(),
        ),
        CondOp::StartsWith => (
            format!("get_text(r, {field}).starts_with({text_value})"),
            Vec::new(),
        ),
        CondOp::EndsWith => (
            format!("get_text(r, {field}).ends_with({text_value})"),
            Vec::new(),
        ),
        CondOp::Regex => (
            format!(
                "Regex::new({text_value}).map(|re| re.is_match(&get_text(r, {field}))).unwrap_or(false)"
            ),
            vec!["regex::Regex".to_string()],
        ),
    }
}

fn ordered_cond(field: &str, op: &str, numeric: Option<f64>, text_value: &str) -> String {
    match numeric {
        Some(v) => format!("get_num(r, {field}) {op} {v:?}"),
        None => format!("get_text(r, {field}).as_str() {op} {text_value}"),
    }
}
