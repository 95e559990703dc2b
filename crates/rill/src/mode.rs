//! Mode selection and provenance.
//!
//! Every stage takes an explicit `--emit` flag; the `RILL_EMIT` environment
//! variable is also recognized so a whole pipeline can be flipped with one
//! export. Both are resolved here, once, before any stage logic runs. This
//! module is also the only place that inspects the process argument vector:
//! the reconstructed command line is passed down as a plain value.

pub fn emit_requested(flag: bool) -> bool {
    if flag {
        return true;
    }
    matches!(
        std::env::var("RILL_EMIT").ok().as_deref(),
        Some("1") | Some("true")
    )
}

/// The invoking command line, with the mode flag filtered out (it is implied
/// by the fragment context) and arguments quoted for shell replay.
pub fn invocation_line() -> String {
    let args: Vec<String> = std::env::args().skip(1).collect();
    rebuild_line(&args)
}

fn rebuild_line(args: &[String]) -> String {
    let mut parts = vec!["rill".to_string()];
    for arg in args {
        if arg == "--emit" {
            continue;
        }
        parts.push(shell_quote(arg));
    }
    parts.join(" ")
}

fn shell_quote(s: &str) -> String {
    if !s.is_empty() && s.chars().all(is_plain_shell_char) {
        return s.to_string();
    }
    if s.contains('\'') {
        let escaped = s
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('$', "\\$")
            .replace('`', "\\`");
        return format!("\"{escaped}\"");
    }
    format!("'{s}'")
}

fn is_plain_shell_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':')
}
