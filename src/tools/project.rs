//! Project overview tool: a shallow tree of the working directory so the
//! model can orient itself without a chain of dir-list calls.

use std::fs;
use std::path::Path;

use anyhow::Result;

use super::Tool;

const MAX_DEPTH: usize = 3;
const MAX_ENTRIES: usize = 200;

// Directories that add noise without orientation value.
const SKIPPED: &[&str] = &["target", "node_modules", ".git", ".venv", "__pycache__"];

pub struct ProjectInfo;

impl Tool for ProjectInfo {
    fn name(&self) -> &str {
        "project-info"
    }

    fn description(&self) -> &str {
        "tree of the working directory (3 levels deep); no arguments"
    }

    fn execute(&self, _arguments: &str) -> Result<String> {
        let mut lines = Vec::new();
        walk(Path::new("."), 0, &mut lines)?;
        if lines.is_empty() {
            return Ok("(empty directory)".to_string());
        }
        if lines.len() > MAX_ENTRIES {
            let omitted = lines.len() - MAX_ENTRIES;
            lines.truncate(MAX_ENTRIES);
            lines.push(format!("... {} more entries omitted", omitted));
        }
        Ok(lines.join("\n"))
    }
}

fn walk(dir: &Path, depth: usize, lines: &mut Vec<String>) -> Result<()> {
    if depth >= MAX_DEPTH {
        return Ok(());
    }
    let mut entries: Vec<_> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || SKIPPED.contains(&name.as_str()) {
            continue;
        }
        let indent = "  ".repeat(depth);
        if entry.file_type()?.is_dir() {
            lines.push(format!("{}{}/", indent, name));
            walk(&entry.path(), depth + 1, lines)?;
        } else {
            lines.push(format!("{}{}", indent, name));
        }
    }
    Ok(())
}
