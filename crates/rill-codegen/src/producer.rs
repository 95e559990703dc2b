//! Shared emit-mode plumbing for pipeline stages: drain the upstream
//! fragment list, forward it unchanged, append this stage's own fragments.

use std::io::{Read, Write};

use crate::error::CodegenError;
use crate::fragment::{next_output_name, Fragment, SOURCE_VAR};
use crate::transport;

pub struct Producer<W: Write> {
    upstream: Vec<Fragment>,
    appended: Vec<Fragment>,
    forwarded: bool,
    writer: W,
}

impl<W: Write> Producer<W> {
    pub fn new(upstream: Vec<Fragment>, writer: W) -> Self {
        Self {
            upstream,
            appended: Vec::new(),
            forwarded: false,
            writer,
        }
    }

    /// Drain the upstream list from `reader`. An empty reader (stage runs
    /// first in the pipeline) produces an empty list.
    pub fn from_reader<R: Read>(reader: R, writer: W) -> Result<Self, CodegenError> {
        Ok(Self::new(transport::read_fragments(reader)?, writer))
    }

    pub fn upstream(&self) -> &[Fragment] {
        &self.upstream
    }

    /// Variable this stage's fragment should consume: the most recent
    /// binding in the sequence, or the fixed source name when the pipeline
    /// starts here.
    pub fn input_name(&self) -> String {
        self.upstream
            .iter()
            .chain(self.appended.iter())
            .rev()
            .map(|f| f.output_name.as_str())
            .find(|name| !name.is_empty())
            .unwrap_or(SOURCE_VAR)
            .to_string()
    }

    /// Binding name for a new fragment, unique across the whole sequence.
    pub fn next_output_name(&self, prefix: &str) -> String {
        let used = self
            .upstream
            .iter()
            .chain(self.appended.iter())
            .map(|f| f.output_name.as_str())
            .filter(|name| !name.is_empty());
        next_output_name(prefix, used)
    }

    /// Emit a fragment, forwarding the upstream list first if it has not
    /// been forwarded yet. Fragments written earlier in this invocation are
    /// visible to `input_name`/`next_output_name`.
    pub fn push(&mut self, fragment: Fragment) -> Result<(), CodegenError> {
        if !self.forwarded {
            transport::write_fragments(&mut self.writer, &self.upstream)?;
            self.forwarded = true;
        }
        transport::write_fragment(&mut self.writer, &fragment)?;
        self.appended.push(fragment);
        Ok(())
    }
}
