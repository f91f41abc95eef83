//! Sentinel marker grammar for control blocks embedded in model output.

/// Start marker for a tool-call block.
pub const TOOL_CALL_START: &str = "<@TOOL>";
/// End marker for a tool-call block.
pub const TOOL_CALL_END: &str = "</@TOOL>";
/// Start marker for a tool-result block.
pub const TOOL_RESULT_START: &str = "<@TOOL-RESULT>";
/// End marker for a tool-result block.
pub const TOOL_RESULT_END: &str = "</@TOOL-RESULT>";

/// Length of the longest marker in the grammar. The parser retains one byte
/// less than this across fragment boundaries so a split marker is never
/// flushed as display text.
pub const MAX_MARKER_LEN: usize = TOOL_RESULT_END.len();

/// All (start, end) marker pairs. Markers are distinct literals and never
/// nest or overlap.
pub const MARKER_PAIRS: &[(&str, &str)] = &[
    (TOOL_CALL_START, TOOL_CALL_END),
    (TOOL_RESULT_START, TOOL_RESULT_END),
];

/// Find the earliest start marker in `text`.
///
/// Returns `(byte_offset, start_marker, end_marker)` for the textually
/// earliest match. When both pairs match, the lower offset wins; offsets are
/// never equal because the start literals differ from the first byte that
/// distinguishes them onward.
pub fn find_earliest_start(text: &str) -> Option<(usize, &'static str, &'static str)> {
    MARKER_PAIRS
        .iter()
        .filter_map(|(start, end)| text.find(start).map(|i| (i, *start, *end)))
        .min_by_key(|(i, _, _)| *i)
}

/// Wrap tool output in tool-result markers for the continuation turn.
pub fn wrap_tool_result(text: &str) -> String {
    format!("{}{}{}", TOOL_RESULT_START, text, TOOL_RESULT_END)
}
