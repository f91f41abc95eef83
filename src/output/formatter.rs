//! Terminal output with ANSI colors and lightweight markdown rendering.
//!
//! Display units arrive as arbitrary text slices. Complete lines are
//! formatted and printed as they close; the trailing partial line is held
//! until more text arrives or the turn finishes.

use std::io::Write;

use colored::Colorize;

use super::Output;

pub struct TerminalOutput {
    line_buffer: String,
    in_code_block: bool,
    printed_anything: bool,
}

impl TerminalOutput {
    pub fn new() -> Self {
        TerminalOutput {
            line_buffer: String::new(),
            in_code_block: false,
            printed_anything: false,
        }
    }

    fn flush_partial_line(&mut self) {
        if !self.line_buffer.is_empty() {
            let line = std::mem::take(&mut self.line_buffer);
            let formatted = format_markdown_line(&line, &mut self.in_code_block);
            print!("{}", formatted);
            flush_stdout();
            self.printed_anything = true;
        }
    }
}

impl Default for TerminalOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl Output for TerminalOutput {
    fn present(&mut self, text: &str) {
        self.line_buffer.push_str(text);
        while let Some(newline) = self.line_buffer.find('\n') {
            let rest = self.line_buffer.split_off(newline + 1);
            let line = std::mem::replace(&mut self.line_buffer, rest);
            let formatted = format_markdown_line(line.trim_end_matches('\n'), &mut self.in_code_block);
            println!("{}", formatted);
            self.printed_anything = true;
        }
        flush_stdout();
    }

    fn finish_turn(&mut self) {
        self.flush_partial_line();
        if self.printed_anything {
            println!();
        }
        self.in_code_block = false;
        self.printed_anything = false;
    }

    fn tool_dispatch(&mut self, name: &str, arguments: &str) {
        self.flush_partial_line();
        let summary = truncate_to_line(arguments, 80);
        if summary.is_empty() {
            println!("{}", format!("→ {}", name).cyan());
        } else {
            println!("{} {}", format!("→ {}", name).cyan(), summary.dimmed());
        }
    }

    fn warn(&mut self, message: &str) {
        self.flush_partial_line();
        eprintln!("{}", message.yellow());
    }
}

/// Take the first line of `s`, truncated to `max_chars` with a `...` suffix.
pub fn truncate_to_line(s: &str, max_chars: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    if first_line.chars().count() > max_chars {
        let cut: String = first_line.chars().take(max_chars).collect();
        format!("{}...", cut)
    } else {
        first_line.to_string()
    }
}

/// Format one line of markdown for the terminal.
///
/// Fenced code block delimiters toggle `in_code_block` and render dimmed;
/// lines inside a block render bright-black with no inline formatting;
/// headings render bold; everything else gets inline formatting.
pub fn format_markdown_line(line: &str, in_code_block: &mut bool) -> String {
    let trimmed = line.trim_start();

    if trimmed.starts_with("```") {
        *in_code_block = !*in_code_block;
        return format!("{}", line.dimmed());
    }

    if *in_code_block {
        return format!("{}", line.bright_black());
    }

    if trimmed.starts_with("# ") || trimmed.starts_with("## ") || trimmed.starts_with("### ") {
        return format!("{}", line.bold());
    }

    format_inline_markdown(line)
}

/// Inline markdown: `` `code` `` cyan, `**bold**`, `*italic*`. Unclosed
/// delimiters are left untouched.
pub fn format_inline_markdown(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut result = String::with_capacity(line.len() + 16);
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '`' {
            if let Some(end) = chars[i + 1..].iter().position(|&c| c == '`') {
                let end = i + 1 + end;
                let code: String = chars[i + 1..end].iter().collect();
                result.push_str(&format!("\x1b[36m`{}`\x1b[0m", code));
                i = end + 1;
                continue;
            }
        }

        if chars[i] == '*' {
            let double = i + 1 < chars.len() && chars[i + 1] == '*';
            if double {
                if let Some(end) = find_double_asterisk(&chars, i + 2) {
                    let inner: String = chars[i + 2..end].iter().collect();
                    result.push_str(&format!("\x1b[1m**{}**\x1b[22m", inner));
                    i = end + 2;
                    continue;
                }
            } else if let Some(end) = find_single_asterisk(&chars, i + 1) {
                let inner: String = chars[i + 1..end].iter().collect();
                result.push_str(&format!("\x1b[3m*{}*\x1b[23m", inner));
                i = end + 1;
                continue;
            }
        }

        result.push(chars[i]);
        i += 1;
    }

    result
}

fn find_double_asterisk(chars: &[char], start: usize) -> Option<usize> {
    if chars.len() < 2 {
        return None;
    }
    (start..chars.len() - 1).find(|&j| chars[j] == '*' && chars[j + 1] == '*')
}

fn find_single_asterisk(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start;
    while j < chars.len() {
        if chars[j] == '*' {
            if j + 1 < chars.len() && chars[j + 1] == '*' {
                j += 2;
                continue;
            }
            return Some(j);
        }
        j += 1;
    }
    None
}

fn flush_stdout() {
    std::io::stdout().flush().ok();
}
