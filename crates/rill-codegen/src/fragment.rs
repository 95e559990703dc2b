use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Variable name the first fragment consumes when no `Init` fragment has
/// established one.
pub const SOURCE_VAR: &str = "records";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FragmentKind {
    /// Establishes the initial data source; at most one, always first.
    Init,
    /// An intermediate transformation.
    Stmt,
    /// A terminal sink; at most one, always last.
    Final,
}

/// One stage's contribution to the generated program. Exists only on the
/// wire: producers create it immediately before serialization, consumers
/// either forward it unchanged or fold it into assembled text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fragment {
    pub kind: FragmentKind,
    /// Variable this fragment's code binds; empty for `Final` fragments.
    #[serde(default)]
    pub output_name: String,
    /// Variable this fragment's code consumes.
    #[serde(default)]
    pub input_name: String,
    /// Snippet valid verbatim inside the generated program's entry point.
    pub code: String,
    /// Additional `use` paths beyond the engine's fixed prelude import.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,
    /// Original command line, carried for the program banner only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<String>,
}

impl Fragment {
    pub fn init(
        output_name: &str,
        code: String,
        imports: Vec<String>,
        provenance: Option<String>,
    ) -> Self {
        Self {
            kind: FragmentKind::Init,
            output_name: output_name.to_string(),
            input_name: String::new(),
            code,
            imports,
            provenance,
        }
    }

    pub fn stmt(
        output_name: &str,
        input_name: &str,
        code: String,
        imports: Vec<String>,
        provenance: Option<String>,
    ) -> Self {
        Self {
            kind: FragmentKind::Stmt,
            output_name: output_name.to_string(),
            input_name: input_name.to_string(),
            code,
            imports,
            provenance,
        }
    }

    pub fn sink(
        input_name: &str,
        code: String,
        imports: Vec<String>,
        provenance: Option<String>,
    ) -> Self {
        Self {
            kind: FragmentKind::Final,
            output_name: String::new(),
            input_name: input_name.to_string(),
            code,
            imports,
            provenance,
        }
    }
}

/// Pick a binding name for a new fragment: the bare `prefix` when free,
/// otherwise `prefix2`, `prefix3`, ... so repeated stages of the same kind
/// never collide.
pub fn next_output_name<'a>(prefix: &str, used: impl IntoIterator<Item = &'a str>) -> String {
    let used: BTreeSet<&str> = used.into_iter().collect();
    if !used.contains(prefix) {
        return prefix.to_string();
    }
    let mut n = 2usize;
    loop {
        let candidate = format!("{prefix}{n}");
        if !used.contains(candidate.as_str()) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_field_names_are_camel_case() {
        let frag = Fragment::stmt(
            "filtered",
            "records",
            "let filtered = limit(5)(records);".to_string(),
            Vec::new(),
            Some("rill limit 5".to_string()),
        );
        let json = serde_json::to_value(&frag).unwrap();
        assert_eq!(json["kind"], "stmt");
        assert_eq!(json["outputName"], "filtered");
        assert_eq!(json["inputName"], "records");
        assert_eq!(json["provenance"], "rill limit 5");
        assert!(json.get("imports").is_none());
    }

    #[test]
    fn absent_optional_fields_decode_to_defaults() {
        let frag: Fragment =
            serde_json::from_str(r#"{"kind":"final","inputName":"rows","code":"x"}"#).unwrap();
        assert_eq!(frag.kind, FragmentKind::Final);
        assert!(frag.output_name.is_empty());
        assert!(frag.imports.is_empty());
        assert!(frag.provenance.is_none());
    }

    #[test]
    fn output_names_stay_unique_per_prefix() {
        assert_eq!(next_output_name("filtered", []), "filtered");
        assert_eq!(next_output_name("filtered", ["records"]), "filtered");
        assert_eq!(next_output_name("filtered", ["filtered"]), "filtered2");
        assert_eq!(
            next_output_name("filtered", ["filtered", "filtered2"]),
            "filtered3"
        );
    }
}
