//! Streaming client for OpenAI-compatible chat completion endpoints.
//!
//! Sends one POST to `{base_url}/chat/completions` with `stream: true` and
//! reads the response as server-sent events, line by line. Each `data:` line
//! carries one JSON chunk; text lives at `choices[0].delta.content`. The
//! literal `data: [DONE]` terminates the stream.

use std::io::{BufRead, BufReader, Read};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_json::Value;

use crate::history::Turn;

use super::{Backend, FragmentStream};

#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    base_url: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
    stream: bool,
}

impl OpenAiBackend {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        temperature: f64,
        max_tokens: u32,
    ) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        OpenAiBackend {
            base_url,
            api_key: api_key.into(),
            model: model.into(),
            temperature,
            max_tokens,
        }
    }
}

impl Backend for OpenAiBackend {
    fn stream_completion(
        &self,
        system_prompt: &str,
        history: &[Turn],
    ) -> Result<Box<dyn FragmentStream>> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(WireMessage {
            role: "system",
            content: system_prompt,
        });
        for turn in history {
            messages.push(WireMessage {
                role: match turn.role {
                    crate::history::Role::User => "user",
                    crate::history::Role::Assistant => "assistant",
                },
                content: &turn.content,
            });
        }

        let request = CompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: true,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .build();
        let response = agent
            .post(&url)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("Content-Type", "application/json")
            .send_json(serde_json::to_value(&request)?)
            .map_err(|e| match e {
                ureq::Error::Status(code, resp) => {
                    let body = resp.into_string().unwrap_or_default();
                    anyhow!("completion request failed: HTTP {}: {}", code, body)
                }
                other => anyhow!("completion request failed: {}", other),
            })?;

        Ok(Box::new(SseStream {
            reader: BufReader::new(response.into_reader()),
            done: false,
        }))
    }
}

/// Reader over an open SSE response body. Dropping it closes the connection,
/// which is how a cancelled turn is abandoned.
struct SseStream {
    reader: BufReader<Box<dyn Read + Send + Sync + 'static>>,
    done: bool,
}

impl FragmentStream for SseStream {
    fn next_fragment(&mut self) -> Result<Option<String>> {
        if self.done {
            return Ok(None);
        }
        let mut line = String::new();
        loop {
            line.clear();
            let n = self
                .reader
                .read_line(&mut line)
                .context("reading completion stream")?;
            if n == 0 {
                // Server closed without [DONE]; treat as end of stream.
                self.done = true;
                return Ok(None);
            }
            let Some(data) = line.trim_end().strip_prefix("data:") else {
                // Comment lines, event names, blank keep-alives.
                continue;
            };
            let data = data.trim_start();
            if data == "[DONE]" {
                self.done = true;
                return Ok(None);
            }
            if data.is_empty() {
                continue;
            }
            let chunk: Value =
                serde_json::from_str(data).context("decoding completion chunk")?;
            if let Some(text) = chunk["choices"][0]["delta"]["content"].as_str() {
                if !text.is_empty() {
                    return Ok(Some(text.to_string()));
                }
            }
            // Role-only deltas and finish_reason chunks carry no text.
        }
    }
}
