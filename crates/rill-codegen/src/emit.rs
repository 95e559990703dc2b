//! Snippet construction. Stages describe their operation as a small
//! expression node (engine operation plus ordered, already-rendered
//! arguments) and render text from it, so every emitted statement has the
//! canonical `let out = op(args)(input);` shape the assembler can take
//! apart again.

/// Render `raw` as a Rust string literal.
pub fn quote(raw: &str) -> String {
    format!("{raw:?}")
}

/// Strip characters that would break a `format!` message literal. Used for
/// diagnostic context built from user input (file paths in error messages).
pub fn literal_safe(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '"' | '{' | '}' | '\\'))
        .collect()
}

#[derive(Debug, Clone)]
pub struct OpExpr {
    op: String,
    args: Vec<String>,
}

impl OpExpr {
    pub fn new(op: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            args: Vec::new(),
        }
    }

    /// Append an argument given as source text.
    pub fn arg(mut self, expr: impl Into<String>) -> Self {
        self.args.push(expr.into());
        self
    }

    /// Append a string-literal argument.
    pub fn quoted_arg(self, raw: &str) -> Self {
        self.arg(quote(raw))
    }

    pub fn render(&self) -> String {
        format!("{}({})", self.op, self.args.join(", "))
    }

    /// `op(args)(input)`
    pub fn applied(&self, input: &str) -> String {
        format!("{}({input})", self.render())
    }

    /// `let output = op(args)(input);`
    pub fn binding(&self, output: &str, input: &str) -> String {
        format!("let {output} = {};", self.applied(input))
    }
}

/// A source-establishing statement for a fallible engine call, written in
/// the return-an-error idiom the assembler later rewrites for `fn main()`.
/// `context` must be literal-safe text (no quotes or braces).
pub fn fallible_init(output: &str, call: &str, context: &str) -> String {
    format!(
        "let {output} = match {call} {{\n    Ok(rows) => rows,\n    Err(err) => return Err(format!(\"{context}: {{err}}\").into()),\n}};"
    )
}

/// A terminal statement for a fallible engine call, same idiom as
/// [`fallible_init`].
pub fn fallible_sink(call: &str, context: &str) -> String {
    format!(
        "if let Err(err) = {call} {{\n    return Err(format!(\"{context}: {{err}}\").into());\n}}"
    )
}
