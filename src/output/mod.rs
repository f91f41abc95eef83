//! Presentation sinks for display units and loop events.

pub mod formatter;
pub mod logger;

pub use formatter::TerminalOutput;
pub use logger::SessionLog;

/// Where display units go. The agent loop hands over text exactly as the
/// parser emitted it and never looks back; formatting and buffering live
/// behind this trait.
pub trait Output {
    /// Present one display unit. Units are arbitrary slices of the visible
    /// text, not lines; implementations buffer as needed.
    fn present(&mut self, text: &str);

    /// The current turn is over (completed or cancelled); flush anything
    /// buffered and end the line.
    fn finish_turn(&mut self);

    /// A tool is being dispatched.
    fn tool_dispatch(&mut self, name: &str, arguments: &str);

    /// A non-fatal problem the user should see.
    fn warn(&mut self, message: &str);
}
