//! Local tools the model can invoke through tool-call blocks.

pub mod fs;
pub mod project;

use anyhow::Result;

/// One callable tool. `arguments` is the raw JSON string from the tool-call
/// payload; each tool decodes its own argument shape.
pub trait Tool {
    fn name(&self) -> &str;

    /// One-line description shown to the model in the system prompt,
    /// including the expected argument object.
    fn description(&self) -> &str;

    fn execute(&self, arguments: &str) -> Result<String>;
}

/// Named lookup over the available tools.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        ToolRegistry { tools: Vec::new() }
    }

    /// Registry preloaded with the built-in tools.
    pub fn with_builtins() -> Self {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(fs::FileRead));
        registry.register(Box::new(fs::FileWrite));
        registry.register(Box::new(fs::DirList));
        registry.register(Box::new(project::ProjectInfo));
        registry
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    /// Execute a tool by name. Failures of any kind, including an unknown
    /// tool name, fold into the returned text so the conversation continues
    /// with the model seeing what went wrong.
    pub fn dispatch(&self, name: &str, arguments: &str) -> String {
        let Some(tool) = self.tools.iter().find(|t| t.name() == name) else {
            return format!("Error: unknown tool '{}'", name);
        };
        match tool.execute(arguments) {
            Ok(output) => output,
            Err(e) => format!("Error: {:#}", e),
        }
    }

    /// Tool listing for the system prompt, one `name: description` per line.
    pub fn catalog(&self) -> String {
        self.tools
            .iter()
            .map(|t| format!("- {}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
