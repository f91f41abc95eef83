//! The turn-taking agent loop: stream a reply, detect a tool call, dispatch,
//! feed the result back, repeat.

use anyhow::Result;

use crate::backend::Backend;
use crate::history::{History, Turn};
use crate::interrupt::CancelSource;
use crate::markers;
use crate::output::{Output, SessionLog};
use crate::stream::{first_tool_call, StreamParser, ToolCallOutcome};
use crate::tools::ToolRegistry;

/// How a full exchange ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// The model produced a reply with no further tool call.
    Done,
    /// The user cancelled mid-stream (or the stream failed); the partial
    /// turn is finalized in history.
    Cancelled,
    /// The dispatch depth cap was hit before the model stopped calling
    /// tools.
    DepthLimit,
}

enum TurnEnd {
    Completed,
    Interrupted,
}

pub struct Agent {
    backend: Box<dyn Backend>,
    tools: ToolRegistry,
    cancel: Box<dyn CancelSource>,
    system_prompt: String,
    max_tool_depth: usize,
    history: History,
}

impl Agent {
    pub fn new(
        backend: Box<dyn Backend>,
        tools: ToolRegistry,
        cancel: Box<dyn CancelSource>,
        max_tool_depth: usize,
    ) -> Self {
        let system_prompt = build_system_prompt(&tools);
        Agent {
            backend,
            tools,
            cancel,
            system_prompt,
            max_tool_depth,
            history: History::new(),
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Run one full exchange: the user's message, the streamed reply, and
    /// any number of tool dispatch cycles up to the depth cap.
    ///
    /// Deliberately iterative: each dispatch pushes a tool-result turn and
    /// loops back to stream the continuation, so depth is bounded by the
    /// cap rather than the call stack.
    pub fn run_exchange(
        &mut self,
        user_input: &str,
        output: &mut dyn Output,
        log: &mut SessionLog,
    ) -> Result<ExchangeOutcome> {
        self.history.push(Turn::user(user_input.to_string()));
        log.record("user", user_input);

        let mut depth = 0usize;
        loop {
            self.cancel.reset();
            let (end, transcript) = self.stream_one_turn(output)?;
            output.finish_turn();

            // Only fully-finalized turns enter history; an empty transcript
            // (cancelled before anything arrived) leaves no trace.
            if !transcript.is_empty() {
                log.record("assistant", &transcript);
                self.history.push(Turn::assistant(transcript.clone()));
            }

            if let TurnEnd::Interrupted = end {
                return Ok(ExchangeOutcome::Cancelled);
            }

            let call = match first_tool_call(&transcript) {
                ToolCallOutcome::Absent => return Ok(ExchangeOutcome::Done),
                ToolCallOutcome::Malformed(reason) => {
                    output.warn(&format!("ignoring tool call: {}", reason));
                    return Ok(ExchangeOutcome::Done);
                }
                ToolCallOutcome::Found(call) => call,
            };

            depth += 1;
            if depth > self.max_tool_depth {
                output.warn(&format!(
                    "tool dispatch depth cap ({}) reached, stopping",
                    self.max_tool_depth
                ));
                return Ok(ExchangeOutcome::DepthLimit);
            }

            output.tool_dispatch(&call.name, &call.arguments);
            let result = self.tools.dispatch(&call.name, &call.arguments);
            log.record("tool-result", &result);

            // Each dispatch cycle leaves three turns: an assistant note
            // recording which tool ran, the wrapped result, and the empty
            // user message that opens the continuation request.
            self.history
                .push(Turn::assistant(format!("[dispatching {}]", call.name)));
            self.history.push(Turn::user(markers::wrap_tool_result(&result)));
            self.history.push(Turn::user(String::new()));
        }
    }

    /// Stream a single assistant turn, presenting display units as they
    /// become safe. Returns how the turn ended and the full raw transcript.
    ///
    /// Cancellation is polled between fragments and takes effect only once
    /// at least one fragment has arrived. The stream handle is dropped on
    /// every path, which closes the connection.
    fn stream_one_turn(&mut self, output: &mut dyn Output) -> Result<(TurnEnd, String)> {
        let mut stream = self
            .backend
            .stream_completion(&self.system_prompt, self.history.turns())?;

        let mut parser = StreamParser::new();
        let mut fragments = 0usize;
        let mut end = TurnEnd::Completed;

        loop {
            if fragments > 0 && self.cancel.is_cancelled() {
                end = TurnEnd::Interrupted;
                break;
            }
            match stream.next_fragment() {
                Ok(Some(fragment)) => {
                    fragments += 1;
                    for unit in parser.feed(&fragment) {
                        output.present(&unit);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    // Finalize whatever arrived and end the exchange as if
                    // cancelled; the partial turn stays in history.
                    output.warn(&format!("stream error: {:#}", e));
                    end = TurnEnd::Interrupted;
                    break;
                }
            }
        }
        drop(stream);

        // The flushed tail is plain text from fragments that already
        // arrived, so it is shown on the interrupted paths as well.
        let (tail, transcript) = parser.finish();
        if let Some(tail) = tail {
            output.present(&tail);
        }
        Ok((end, transcript))
    }
}

/// The instructions the model needs to use tools: both marker pairs and the
/// exact JSON call shape.
pub fn build_system_prompt(tools: &ToolRegistry) -> String {
    format!(
        "You are a helpful assistant with access to local tools.\n\
         \n\
         To invoke a tool, emit exactly one block of the form\n\
         {call_start}{{\"name\": \"<tool>\", \"arguments\": \"<json string>\"}}{call_end}\n\
         anywhere in your reply. `arguments` is a JSON object encoded as a\n\
         string; pass \"\" when the tool takes none. After the block, stop:\n\
         the result will arrive in your next turn wrapped in\n\
         {result_start}...{result_end} markers. At most one tool call per\n\
         reply; only the first is honored.\n\
         \n\
         Available tools:\n\
         {catalog}\n\
         \n\
         File paths are relative to the user's working directory. For a\n\
         plain answer, reply without any marker blocks.",
        call_start = markers::TOOL_CALL_START,
        call_end = markers::TOOL_CALL_END,
        result_start = markers::TOOL_RESULT_START,
        result_end = markers::TOOL_RESULT_END,
        catalog = tools.catalog(),
    )
}
