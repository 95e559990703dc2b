//! Fragment protocol core.
//!
//! When a pipeline runs in emit mode, each stage describes its own operation
//! as a code fragment, forwards everything it received from upstream, and the
//! terminal `generate` stage assembles the accumulated sequence into one
//! standalone Rust program. This crate holds the pieces every stage shares:
//! the fragment data model, the wire transport, producer plumbing, the
//! snippet builder, and the assembler.

pub mod assemble;
pub mod emit;
pub mod error;
pub mod fragment;
pub mod producer;
pub mod transport;
