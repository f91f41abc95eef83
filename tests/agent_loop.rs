//! End-to-end exercises of the exchange loop with a scripted backend.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use tangent::agent::{Agent, ExchangeOutcome};
use tangent::backend::{Backend, FragmentStream};
use tangent::history::Role;
use tangent::interrupt::CancelSource;
use tangent::output::{Output, SessionLog};
use tangent::tools::{Tool, ToolRegistry};

/// One scripted stream event.
#[derive(Clone)]
enum Step {
    Frag(&'static str),
    Fail(&'static str),
}

/// Backend that replays scripted replies in order. Optionally raises a shared
/// cancel flag once a given number of fragments have been handed out, which
/// simulates the user pressing Ctrl+C mid-stream.
struct ScriptedBackend {
    replies: Mutex<VecDeque<Vec<Step>>>,
    calls: Mutex<usize>,
    cancel_after: Option<(Arc<AtomicBool>, usize)>,
}

impl ScriptedBackend {
    fn new(replies: Vec<Vec<Step>>) -> Self {
        ScriptedBackend {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(0),
            cancel_after: None,
        }
    }

    fn cancelling_after(mut self, flag: Arc<AtomicBool>, fragments: usize) -> Self {
        self.cancel_after = Some((flag, fragments));
        self
    }
}

struct ScriptedStream {
    steps: VecDeque<Step>,
    emitted: usize,
    cancel_after: Option<(Arc<AtomicBool>, usize)>,
}

impl Backend for ScriptedBackend {
    fn stream_completion(
        &self,
        _system_prompt: &str,
        _history: &[tangent::history::Turn],
    ) -> Result<Box<dyn FragmentStream>> {
        *self.calls.lock().unwrap() += 1;
        let steps = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted backend exhausted"))?;
        Ok(Box::new(ScriptedStream {
            steps: steps.into_iter().collect(),
            emitted: 0,
            cancel_after: self.cancel_after.clone(),
        }))
    }
}

impl FragmentStream for ScriptedStream {
    fn next_fragment(&mut self) -> Result<Option<String>> {
        match self.steps.pop_front() {
            Some(Step::Frag(text)) => {
                self.emitted += 1;
                if let Some((flag, n)) = &self.cancel_after {
                    if self.emitted == *n {
                        flag.store(true, Ordering::SeqCst);
                    }
                }
                Ok(Some(text.to_string()))
            }
            Some(Step::Fail(message)) => Err(anyhow!("{}", message)),
            None => Ok(None),
        }
    }
}

/// Orphan-rule workaround: a local wrapper so a shared scripted backend can
/// be handed to the agent as a `Box<dyn Backend>`.
struct SharedBackend(Arc<ScriptedBackend>);

impl Backend for SharedBackend {
    fn stream_completion(
        &self,
        system_prompt: &str,
        history: &[tangent::history::Turn],
    ) -> Result<Box<dyn FragmentStream>> {
        self.0.stream_completion(system_prompt, history)
    }
}

/// Cancel source over a plain shared flag.
struct TestCancel(Arc<AtomicBool>);

impl CancelSource for TestCancel {
    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Recorded {
    units: Vec<String>,
    dispatches: Vec<(String, String)>,
    warnings: Vec<String>,
}

/// Output sink that records everything instead of printing.
#[derive(Clone, Default)]
struct RecordingOutput(Arc<Mutex<Recorded>>);

impl RecordingOutput {
    fn displayed(&self) -> String {
        self.0.lock().unwrap().units.concat()
    }
    fn dispatches(&self) -> Vec<(String, String)> {
        self.0.lock().unwrap().dispatches.clone()
    }
    fn warnings(&self) -> Vec<String> {
        self.0.lock().unwrap().warnings.clone()
    }
}

impl Output for RecordingOutput {
    fn present(&mut self, text: &str) {
        self.0.lock().unwrap().units.push(text.to_string());
    }
    fn finish_turn(&mut self) {}
    fn tool_dispatch(&mut self, name: &str, arguments: &str) {
        self.0
            .lock()
            .unwrap()
            .dispatches
            .push((name.to_string(), arguments.to_string()));
    }
    fn warn(&mut self, message: &str) {
        self.0.lock().unwrap().warnings.push(message.to_string());
    }
}

/// Tool that records its invocations and answers "pong".
struct PingTool(Arc<Mutex<Vec<String>>>);

impl Tool for PingTool {
    fn name(&self) -> &str {
        "ping"
    }
    fn description(&self) -> &str {
        "replies with pong"
    }
    fn execute(&self, arguments: &str) -> Result<String> {
        self.0.lock().unwrap().push(arguments.to_string());
        Ok("pong".to_string())
    }
}

struct FailingTool;

impl Tool for FailingTool {
    fn name(&self) -> &str {
        "flaky"
    }
    fn description(&self) -> &str {
        "always fails"
    }
    fn execute(&self, _arguments: &str) -> Result<String> {
        anyhow::bail!("disk on fire")
    }
}

fn agent_with(
    backend: Arc<ScriptedBackend>,
    tools: ToolRegistry,
    flag: Arc<AtomicBool>,
    max_depth: usize,
) -> Agent {
    Agent::new(
        Box::new(SharedBackend(backend)),
        tools,
        Box::new(TestCancel(flag)),
        max_depth,
    )
}

fn registry_with_ping() -> (ToolRegistry, Arc<Mutex<Vec<String>>>) {
    let invocations = Arc::new(Mutex::new(Vec::new()));
    let mut tools = ToolRegistry::new();
    tools.register(Box::new(PingTool(Arc::clone(&invocations))));
    (tools, invocations)
}

#[test]
fn tool_call_turn_dispatches_and_continues() {
    let backend = Arc::new(ScriptedBackend::new(vec![
        vec![
            Step::Frag("Sure. "),
            Step::Frag(r#"<@TOOL>{"name":"ping","arguments":""}</@TOOL>"#),
        ],
        vec![Step::Frag("All done.")],
    ]));
    let (tools, invocations) = registry_with_ping();
    let mut agent = agent_with(
        Arc::clone(&backend),
        tools,
        Arc::new(AtomicBool::new(false)),
        8,
    );
    let mut output = RecordingOutput::default();

    let outcome = agent
        .run_exchange("run ping", &mut output.clone(), &mut SessionLog::disabled())
        .unwrap();

    assert_eq!(outcome, ExchangeOutcome::Done);
    assert_eq!(output.displayed(), "Sure. All done.");
    assert_eq!(output.dispatches(), [("ping".to_string(), String::new())]);
    assert_eq!(invocations.lock().unwrap().len(), 1);
    assert_eq!(*backend.calls.lock().unwrap(), 2);

    // History records the full dispatch cycle: the user message, the
    // transcript with markers intact, an assistant note for the dispatch,
    // the wrapped result, the empty continuation message, and the reply.
    let turns = agent.history().turns();
    assert_eq!(turns.len(), 6);
    assert_eq!(turns[0].role, Role::User);
    assert!(turns[1].content.contains("<@TOOL>"));
    assert_eq!(turns[2].role, Role::Assistant);
    assert!(turns[2].content.contains("ping"));
    assert_eq!(turns[3].content, "<@TOOL-RESULT>pong</@TOOL-RESULT>");
    assert_eq!(turns[4].role, Role::User);
    assert!(turns[4].content.is_empty());
    assert_eq!(turns[5].content, "All done.");
}

#[test]
fn plain_reply_displays_the_whole_transcript() {
    let backend = Arc::new(ScriptedBackend::new(vec![vec![
        Step::Frag("Just a "),
        Step::Frag("plain answer."),
    ]]));
    let mut agent = agent_with(
        backend,
        ToolRegistry::new(),
        Arc::new(AtomicBool::new(false)),
        8,
    );
    let mut output = RecordingOutput::default();

    let outcome = agent
        .run_exchange("hi", &mut output.clone(), &mut SessionLog::disabled())
        .unwrap();

    assert_eq!(outcome, ExchangeOutcome::Done);
    assert_eq!(output.displayed(), "Just a plain answer.");
    assert!(output.dispatches().is_empty());
    assert_eq!(agent.history().turns()[1].content, "Just a plain answer.");
}

#[test]
fn cancellation_finalizes_partial_turn_without_dispatch() {
    let flag = Arc::new(AtomicBool::new(false));
    let backend = Arc::new(
        ScriptedBackend::new(vec![vec![
            Step::Frag("The first chunk of the reply, "),
            Step::Frag("the second chunk of the reply, "),
            Step::Frag(r#"<@TOOL>{"name":"ping","arguments":""}</@TOOL>"#),
        ]])
        .cancelling_after(Arc::clone(&flag), 2),
    );
    let (tools, invocations) = registry_with_ping();
    let mut agent = agent_with(Arc::clone(&backend), tools, flag, 8);
    let mut output = RecordingOutput::default();

    let outcome = agent
        .run_exchange("go", &mut output.clone(), &mut SessionLog::disabled())
        .unwrap();

    assert_eq!(outcome, ExchangeOutcome::Cancelled);
    // Only the two delivered fragments exist; the tool-call fragment was
    // never pulled and nothing was dispatched. All plain text from those
    // fragments is displayed, including the end-of-turn flush.
    let partial = "The first chunk of the reply, the second chunk of the reply, ";
    assert_eq!(output.displayed(), partial);
    assert_eq!(agent.history().turns()[1].content, partial);
    assert!(output.dispatches().is_empty());
    assert!(invocations.lock().unwrap().is_empty());
    assert_eq!(*backend.calls.lock().unwrap(), 1);
}

#[test]
fn stale_cancel_flag_does_not_cancel_the_next_exchange() {
    let flag = Arc::new(AtomicBool::new(true));
    let backend = Arc::new(ScriptedBackend::new(vec![vec![Step::Frag("fine")]]));
    let mut agent = agent_with(backend, ToolRegistry::new(), flag, 8);
    let mut output = RecordingOutput::default();

    let outcome = agent
        .run_exchange("hi", &mut output.clone(), &mut SessionLog::disabled())
        .unwrap();

    assert_eq!(outcome, ExchangeOutcome::Done);
    assert_eq!(output.displayed(), "fine");
}

#[test]
fn mid_stream_error_ends_exchange_with_partial_turn() {
    let backend = Arc::new(ScriptedBackend::new(vec![vec![
        Step::Frag("partial text before the line dropped, then "),
        Step::Fail("connection reset"),
    ]]));
    let mut agent = agent_with(
        backend,
        ToolRegistry::new(),
        Arc::new(AtomicBool::new(false)),
        8,
    );
    let mut output = RecordingOutput::default();

    let outcome = agent
        .run_exchange("hi", &mut output.clone(), &mut SessionLog::disabled())
        .unwrap();

    assert_eq!(outcome, ExchangeOutcome::Cancelled);
    assert_eq!(
        agent.history().turns()[1].content,
        "partial text before the line dropped, then "
    );
    // What arrived is displayed in full even though the stream failed.
    assert_eq!(
        output.displayed(),
        "partial text before the line dropped, then "
    );
    assert!(output
        .warnings()
        .iter()
        .any(|w| w.contains("connection reset")));
}

#[test]
fn malformed_tool_call_warns_and_finishes_the_turn() {
    let backend = Arc::new(ScriptedBackend::new(vec![vec![Step::Frag(
        "<@TOOL>not json</@TOOL>",
    )]]));
    let (tools, invocations) = registry_with_ping();
    let mut agent = agent_with(backend, tools, Arc::new(AtomicBool::new(false)), 8);
    let mut output = RecordingOutput::default();

    let outcome = agent
        .run_exchange("hi", &mut output.clone(), &mut SessionLog::disabled())
        .unwrap();

    assert_eq!(outcome, ExchangeOutcome::Done);
    assert!(invocations.lock().unwrap().is_empty());
    assert!(output
        .warnings()
        .iter()
        .any(|w| w.contains("ignoring tool call")));
}

#[test]
fn tool_failure_folds_into_the_result_turn() {
    let backend = Arc::new(ScriptedBackend::new(vec![
        vec![Step::Frag(r#"<@TOOL>{"name":"flaky","arguments":""}</@TOOL>"#)],
        vec![Step::Frag("Recovered.")],
    ]));
    let mut tools = ToolRegistry::new();
    tools.register(Box::new(FailingTool));
    let mut agent = agent_with(backend, tools, Arc::new(AtomicBool::new(false)), 8);
    let mut output = RecordingOutput::default();

    let outcome = agent
        .run_exchange("hi", &mut output.clone(), &mut SessionLog::disabled())
        .unwrap();

    assert_eq!(outcome, ExchangeOutcome::Done);
    // Turn 2 is the dispatch note, turn 3 the wrapped (failed) result.
    let result_turn = &agent.history().turns()[3].content;
    assert!(result_turn.starts_with("<@TOOL-RESULT>Error:"));
    assert!(result_turn.contains("disk on fire"));
    assert_eq!(output.displayed(), "Recovered.");
}

#[test]
fn depth_cap_stops_a_tool_call_loop() {
    let call_reply = vec![Step::Frag(r#"<@TOOL>{"name":"ping","arguments":""}</@TOOL>"#)];
    let backend = Arc::new(ScriptedBackend::new(vec![
        call_reply.clone(),
        call_reply.clone(),
        call_reply.clone(),
    ]));
    let (tools, invocations) = registry_with_ping();
    let mut agent = agent_with(Arc::clone(&backend), tools, Arc::new(AtomicBool::new(false)), 2);
    let mut output = RecordingOutput::default();

    let outcome = agent
        .run_exchange("loop forever", &mut output.clone(), &mut SessionLog::disabled())
        .unwrap();

    assert_eq!(outcome, ExchangeOutcome::DepthLimit);
    assert_eq!(invocations.lock().unwrap().len(), 2);
    assert!(output.warnings().iter().any(|w| w.contains("depth cap")));
}

#[test]
fn marker_split_across_fragments_still_dispatches() {
    let backend = Arc::new(ScriptedBackend::new(vec![
        vec![
            Step::Frag("Sure. <@TO"),
            Step::Frag(r#"OL>{"name":"ping","arguments":""}</@TO"#),
            Step::Frag("OL>"),
        ],
        vec![Step::Frag("Done.")],
    ]));
    let (tools, invocations) = registry_with_ping();
    let mut agent = agent_with(backend, tools, Arc::new(AtomicBool::new(false)), 8);
    let mut output = RecordingOutput::default();

    let outcome = agent
        .run_exchange("go", &mut output.clone(), &mut SessionLog::disabled())
        .unwrap();

    assert_eq!(outcome, ExchangeOutcome::Done);
    assert_eq!(invocations.lock().unwrap().len(), 1);
    assert_eq!(output.displayed(), "Sure. Done.");
}
