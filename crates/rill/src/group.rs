//! `group-by`: a compound stage. It contributes two chained fragments, one
//! for the grouping and one for the aggregation, so each can take part in
//! fusion on its own.

use anyhow::Result;

use rill_codegen::emit::{quote, OpExpr};
use rill_codegen::error::{CodegenError, CodegenErrorKind};
use rill_codegen::fragment::Fragment;

use rill_engine::prelude::*;

use crate::stage;

/// Field the grouping stage stores member records under, consumed and
/// removed again by the aggregation stage.
const GROUP_FIELD: &str = "_group";

pub struct GroupByArgs {
    pub fields: Vec<String>,
    pub count: Vec<String>,
    pub sum: Vec<String>,
    pub avg: Vec<String>,
    pub min: Vec<String>,
    pub max: Vec<String>,
}

#[derive(Clone, Copy, Debug)]
enum AggFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

#[derive(Debug)]
struct AggSpec {
    func: AggFunc,
    field: String,
    result: String,
}

pub fn run_group_by(args: GroupByArgs, emit: bool, provenance: &str) -> Result<()> {
    let specs = parse_specs(&args)?;
    if emit {
        return emit_group_by(&args.fields, &specs, provenance);
    }
    let aggs: Vec<(String, Agg)> = specs
        .iter()
        .map(|s| (s.result.clone(), s.agg()))
        .collect();
    stage::execute_transform(chain!(
        group_by(GROUP_FIELD, args.fields),
        aggregate(GROUP_FIELD, aggs),
    ))
}

fn parse_specs(args: &GroupByArgs) -> Result<Vec<AggSpec>, CodegenError> {
    let mut specs = Vec::new();
    for result in &args.count {
        specs.push(AggSpec {
            func: AggFunc::Count,
            field: String::new(),
            result: result.clone(),
        });
    }
    for (func, raw) in [
        (AggFunc::Sum, &args.sum),
        (AggFunc::Avg, &args.avg),
        (AggFunc::Min, &args.min),
        (AggFunc::Max, &args.max),
    ] {
        for pair in raw.chunks(2) {
            let [field, result] = pair else {
                continue;
            };
            specs.push(AggSpec {
                func,
                field: field.clone(),
                result: result.clone(),
            });
        }
    }
    if specs.is_empty() {
        return Err(CodegenError::new(
            CodegenErrorKind::UnsupportedShape,
            "no aggregations specified (use --count, --sum, --avg, --min or --max)".to_string(),
        ));
    }
    Ok(specs)
}

impl AggSpec {
    fn agg(&self) -> Agg {
        match self.func {
            AggFunc::Count => count(),
            AggFunc::Sum => sum(&self.field),
            AggFunc::Avg => avg(&self.field),
            AggFunc::Min => min(&self.field),
            AggFunc::Max => max(&self.field),
        }
    }

    fn render(&self) -> String {
        let result = quote(&self.result);
        match self.func {
            AggFunc::Count => format!("({result}, count())"),
            AggFunc::Sum => format!("({result}, sum({}))", quote(&self.field)),
            AggFunc::Avg => format!("({result}, avg({}))", quote(&self.field)),
            AggFunc::Min => format!("({result}, min({}))", quote(&self.field)),
            AggFunc::Max => format!("({result}, max({}))", quote(&self.field)),
        }
    }
}

fn emit_group_by(fields: &[String], specs: &[AggSpec], provenance: &str) -> Result<()> {
    let mut producer = stage::stdout_producer()?;

    let input = producer.input_name();
    let grouped = producer.next_output_name("grouped");
    let field_list: Vec<String> = fields.iter().map(|f| quote(f)).collect();
    let group_code = OpExpr::new("group_by")
        .quoted_arg(GROUP_FIELD)
        .arg(format!("vec![{}]", field_list.join(", ")))
        .binding(&grouped, &input);
    producer.push(Fragment::stmt(
        &grouped,
        &input,
        group_code,
        Vec::new(),
        Some(provenance.to_string()),
    ))?;

    // second fragment of the same invocation: no provenance of its own
    let agg_input = producer.input_name();
    let aggregated = producer.next_output_name("aggregated");
    let items: Vec<String> = specs.iter().map(AggSpec::render).collect();
    let agg_code = OpExpr::new("aggregate")
        .quoted_arg(GROUP_FIELD)
        .arg(format!("vec![{}]", items.join(", ")))
        .binding(&aggregated, &agg_input);
    producer.push(Fragment::stmt(
        &aggregated,
        &agg_input,
        agg_code,
        Vec::new(),
        None,
    ))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> GroupByArgs {
        GroupByArgs {
            fields: vec!["dept".to_string()],
            count: vec!["n".to_string()],
            sum: vec!["salary".to_string(), "total".to_string()],
            avg: Vec::new(),
            min: Vec::new(),
            max: Vec::new(),
        }
    }

    #[test]
    fn specs_collect_all_aggregations() {
        let specs = parse_specs(&args()).unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].render(), "(\"n\", count())");
        assert_eq!(specs[1].render(), "(\"total\", sum(\"salary\"))");
    }

    #[test]
    fn no_aggregations_is_an_unsupported_shape() {
        let empty = GroupByArgs {
            fields: vec!["dept".to_string()],
            count: Vec::new(),
            sum: Vec::new(),
            avg: Vec::new(),
            min: Vec::new(),
            max: Vec::new(),
        };
        let err = parse_specs(&empty).unwrap_err();
        assert_eq!(err.kind, CodegenErrorKind::UnsupportedShape);
    }
}
