//! Built-in filesystem tools. Paths resolve relative to the process working
//! directory; the model is told as much in the system prompt.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::Tool;

#[derive(Deserialize)]
struct FileArgs {
    #[serde(rename = "fileName")]
    file_name: String,
}

#[derive(Deserialize)]
struct FileWriteArgs {
    #[serde(rename = "fileName")]
    file_name: String,
    content: String,
}

#[derive(Deserialize)]
struct DirListArgs {
    #[serde(default = "default_path")]
    path: String,
}

fn default_path() -> String {
    ".".to_string()
}

pub struct FileRead;

impl Tool for FileRead {
    fn name(&self) -> &str {
        "file-read"
    }

    fn description(&self) -> &str {
        r#"read a text file; arguments: {"fileName": "path"}"#
    }

    fn execute(&self, arguments: &str) -> Result<String> {
        let args: FileArgs =
            serde_json::from_str(arguments).context("file-read arguments")?;
        fs::read_to_string(&args.file_name)
            .with_context(|| format!("reading {}", args.file_name))
    }
}

pub struct FileWrite;

impl Tool for FileWrite {
    fn name(&self) -> &str {
        "file-write"
    }

    fn description(&self) -> &str {
        r#"write a text file, creating parent directories; arguments: {"fileName": "path", "content": "text"}"#
    }

    fn execute(&self, arguments: &str) -> Result<String> {
        let args: FileWriteArgs =
            serde_json::from_str(arguments).context("file-write arguments")?;
        if let Some(parent) = Path::new(&args.file_name).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }
        fs::write(&args.file_name, &args.content)
            .with_context(|| format!("writing {}", args.file_name))?;
        Ok(format!(
            "wrote {} bytes to {}",
            args.content.len(),
            args.file_name
        ))
    }
}

pub struct DirList;

impl Tool for DirList {
    fn name(&self) -> &str {
        "dir-list"
    }

    fn description(&self) -> &str {
        r#"list a directory, one entry per line, directories suffixed with /; arguments: {"path": "dir"} (default ".")"#
    }

    fn execute(&self, arguments: &str) -> Result<String> {
        let args: DirListArgs = if arguments.trim().is_empty() {
            DirListArgs {
                path: default_path(),
            }
        } else {
            serde_json::from_str(arguments).context("dir-list arguments")?
        };

        let mut entries = Vec::new();
        for entry in fs::read_dir(&args.path).with_context(|| format!("listing {}", args.path))? {
            let entry = entry?;
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type()?.is_dir() {
                name.push('/');
            }
            entries.push(name);
        }
        entries.sort();
        Ok(entries.join("\n"))
    }
}
