//! Tangent - streaming chat agent with inline tool calls.
//!
//! The model's reply streams in as text fragments; tool-call blocks embedded
//! in the stream are hidden from the display, executed locally, and their
//! results fed back for a continuation turn.

pub mod agent;
pub mod backend;
pub mod cli;
pub mod config;
pub mod history;
pub mod interrupt;
pub mod markers;
pub mod output;
pub mod stream;
pub mod tools;
