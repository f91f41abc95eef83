//! Model backends: where assistant turns are streamed from.

pub mod openai;

use anyhow::Result;

use crate::history::Turn;

pub use openai::OpenAiBackend;

/// A live, in-flight completion. Fragments are pulled one at a time in
/// delivery order; `Ok(None)` marks a clean end of stream. Dropping the
/// stream closes the underlying connection.
pub trait FragmentStream {
    fn next_fragment(&mut self) -> Result<Option<String>>;
}

/// Something that can turn a prompt plus history into a fragment stream.
///
/// The agent loop only ever talks to this trait, so tests substitute a
/// scripted backend and never touch the network.
pub trait Backend {
    fn stream_completion(
        &self,
        system_prompt: &str,
        history: &[Turn],
    ) -> Result<Box<dyn FragmentStream>>;
}
