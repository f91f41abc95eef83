//! Tool-call extraction from a completed turn transcript.

use serde::{Deserialize, Serialize};

use crate::markers::{TOOL_CALL_END, TOOL_CALL_START};

/// A decoded tool invocation. `arguments` is itself JSON text (or empty when
/// the tool takes none).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

/// Result of scanning a transcript for a tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCallOutcome {
    /// The first complete tool-call block, decoded.
    Found(ToolCall),
    /// A block was present but its payload did not decode; the reason is a
    /// human-readable diagnostic. The turn continues as a normal reply.
    Malformed(String),
    /// No tool-call block in the transcript.
    Absent,
}

/// Locate and decode the first (leftmost, non-greedy) tool-call block.
///
/// Pure and deterministic: the same transcript always yields the same
/// outcome. Only the first block is honored; any later blocks in the same
/// turn are ignored.
pub fn first_tool_call(transcript: &str) -> ToolCallOutcome {
    let Some(start_idx) = transcript.find(TOOL_CALL_START) else {
        return ToolCallOutcome::Absent;
    };
    let body_start = start_idx + TOOL_CALL_START.len();
    let Some(end_idx) = transcript[body_start..].find(TOOL_CALL_END) else {
        // Unterminated block (truncated stream): nothing to dispatch.
        return ToolCallOutcome::Absent;
    };
    let body = transcript[body_start..body_start + end_idx].trim();

    match serde_json::from_str::<ToolCall>(body) {
        Ok(call) => ToolCallOutcome::Found(call),
        Err(e) => ToolCallOutcome::Malformed(format!("invalid tool-call payload: {}", e)),
    }
}

/// Encode a tool call into its wire block form.
pub fn encode_tool_call(call: &ToolCall) -> String {
    // ToolCall serializes to a flat object of strings; this cannot fail.
    let payload = serde_json::to_string(call).unwrap_or_default();
    format!("{}{}{}", TOOL_CALL_START, payload, TOOL_CALL_END)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_basic_call() {
        let transcript = r#"Sure. <@TOOL>{"name":"ping","arguments":""}</@TOOL>"#;
        let outcome = first_tool_call(transcript);
        assert_eq!(
            outcome,
            ToolCallOutcome::Found(ToolCall {
                name: "ping".to_string(),
                arguments: String::new(),
            })
        );
    }

    #[test]
    fn extract_call_with_arguments() {
        let transcript = r#"<@TOOL>{"name":"file-read","arguments":"{\"fileName\":\"a.txt\"}"}</@TOOL>"#;
        match first_tool_call(transcript) {
            ToolCallOutcome::Found(call) => {
                assert_eq!(call.name, "file-read");
                assert_eq!(call.arguments, r#"{"fileName":"a.txt"}"#);
            }
            other => panic!("expected Found, got {:?}", other),
        }
    }

    #[test]
    fn no_block_reports_absent() {
        assert_eq!(
            first_tool_call("Just a normal conversational reply."),
            ToolCallOutcome::Absent
        );
    }

    #[test]
    fn unterminated_block_reports_absent() {
        assert_eq!(
            first_tool_call(r#"text <@TOOL>{"name":"x""#),
            ToolCallOutcome::Absent
        );
    }

    #[test]
    fn malformed_json_reports_malformed() {
        let outcome = first_tool_call("<@TOOL>not json at all</@TOOL>");
        match outcome {
            ToolCallOutcome::Malformed(reason) => {
                assert!(reason.contains("invalid tool-call payload"));
            }
            other => panic!("expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn only_first_block_is_honored() {
        let transcript = concat!(
            r#"<@TOOL>{"name":"first","arguments":""}</@TOOL>"#,
            " then ",
            r#"<@TOOL>{"name":"second","arguments":""}</@TOOL>"#,
        );
        match first_tool_call(transcript) {
            ToolCallOutcome::Found(call) => assert_eq!(call.name, "first"),
            other => panic!("expected Found, got {:?}", other),
        }
    }

    #[test]
    fn extraction_is_idempotent() {
        let transcript = r#"<@TOOL>{"name":"ping","arguments":""}</@TOOL>"#;
        let first = first_tool_call(transcript);
        let second = first_tool_call(transcript);
        assert_eq!(first, second);
    }

    #[test]
    fn encode_then_extract_round_trips() {
        let call = ToolCall {
            name: "file-read".to_string(),
            arguments: r#"{"fileName":"a.txt"}"#.to_string(),
        };
        let block = encode_tool_call(&call);
        assert_eq!(first_tool_call(&block), ToolCallOutcome::Found(call));
    }

    #[test]
    fn payload_whitespace_is_tolerated() {
        let transcript = "<@TOOL>\n  {\"name\":\"ping\",\"arguments\":\"\"}\n</@TOOL>";
        match first_tool_call(transcript) {
            ToolCallOutcome::Found(call) => assert_eq!(call.name, "ping"),
            other => panic!("expected Found, got {:?}", other),
        }
    }

    #[test]
    fn missing_arguments_field_defaults_to_empty() {
        let transcript = r#"<@TOOL>{"name":"ping"}</@TOOL>"#;
        match first_tool_call(transcript) {
            ToolCallOutcome::Found(call) => {
                assert_eq!(call.name, "ping");
                assert!(call.arguments.is_empty());
            }
            other => panic!("expected Found, got {:?}", other),
        }
    }
}
