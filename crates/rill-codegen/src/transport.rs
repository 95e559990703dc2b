//! Wire convention: fragments travel as concatenated JSON objects on the
//! byte stream between stages, one per line when we write them. The pipe
//! carries either live records or fragments, never both in one invocation.

use std::io::{Read, Write};

use crate::error::{CodegenError, CodegenErrorKind};
use crate::fragment::Fragment;

/// Drain every fragment from `reader`, in pipeline order. Empty input is an
/// empty list (the first stage of a pipeline has no upstream). Malformed or
/// truncated trailing data is fatal.
pub fn read_fragments<R: Read>(reader: R) -> Result<Vec<Fragment>, CodegenError> {
    let mut fragments = Vec::new();
    for item in serde_json::Deserializer::from_reader(reader).into_iter::<Fragment>() {
        match item {
            Ok(frag) => fragments.push(frag),
            Err(e) => {
                return Err(CodegenError::new(
                    CodegenErrorKind::TransportDecode,
                    format!("decoding fragment: {e}"),
                ))
            }
        }
    }
    Ok(fragments)
}

pub fn write_fragment<W: Write>(writer: &mut W, fragment: &Fragment) -> Result<(), CodegenError> {
    let line = serde_json::to_string(fragment).map_err(|e| {
        CodegenError::new(
            CodegenErrorKind::Internal,
            format!("encoding fragment: {e}"),
        )
    })?;
    writeln!(writer, "{line}").map_err(|e| {
        CodegenError::new(CodegenErrorKind::Internal, format!("writing fragment: {e}"))
    })
}

pub fn write_fragments<W: Write>(
    writer: &mut W,
    fragments: &[Fragment],
) -> Result<(), CodegenError> {
    for fragment in fragments {
        write_fragment(writer, fragment)?;
    }
    Ok(())
}
