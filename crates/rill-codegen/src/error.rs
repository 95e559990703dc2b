#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodegenErrorKind {
    /// Malformed or truncated data on the fragment stream.
    TransportDecode,
    /// The assembler was handed zero fragments.
    EmptyPipeline,
    /// A stage precondition failed before anything was emitted.
    UnsupportedShape,
    Internal,
}

#[derive(Debug, Clone)]
pub struct CodegenError {
    pub kind: CodegenErrorKind,
    pub message: String,
}

impl CodegenError {
    pub fn new(kind: CodegenErrorKind, message: String) -> Self {
        Self { kind, message }
    }
}

impl std::fmt::Display for CodegenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CodegenError {}
