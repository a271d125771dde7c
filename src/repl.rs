use std::io::Write as _;

use futures::StreamExt;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::domain::ChatResponse;
use crate::events::AgentEvent;

const HELP: &str = "\
commands:
  /help     show this help
  /status   agent health overview
  /clear    drop the current session and start fresh
  /history  show the session transcript
  /stream   toggle live agent event rendering
  /quit     leave
anything else is sent to the drone copilot.";

/// Line-oriented terminal client over the user HTTP API.
pub struct Repl {
    http: reqwest::Client,
    base_url: String,
    session_id: Option<String>,
    stream_events: bool,
}

impl Repl {
    pub fn new(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session_id: None,
            stream_events: false,
        }
    }

    /// Run until `/quit` or EOF.
    pub async fn run(&mut self) -> std::io::Result<()> {
        println!("wingman drone copilot — type /help for commands");
        let stdin = BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();

        loop {
            print!("> ");
            std::io::stdout().flush()?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            let line = line.trim().to_string();
            if line.is_empty() {
                continue;
            }

            match line.as_str() {
                "/quit" => break,
                "/help" => println!("{HELP}"),
                "/stream" => {
                    self.stream_events = !self.stream_events;
                    println!(
                        "event rendering {}",
                        if self.stream_events { "on" } else { "off" }
                    );
                }
                "/status" => self.show_status().await,
                "/clear" => self.clear_session().await,
                "/history" => self.show_history().await,
                _ => {
                    if self.stream_events {
                        self.send_streaming(&line).await;
                    } else {
                        self.send_plain(&line).await;
                    }
                }
            }
        }
        println!("bye");
        Ok(())
    }

    async fn show_status(&self) {
        match self
            .http
            .get(format!("{}/api/health", self.base_url))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
        {
            Ok(response) => match response.json::<Value>().await {
                Ok(health) => {
                    println!("status: {}", health["status"].as_str().unwrap_or("?"));
                    if let Some(agents) = health["agents"].as_object() {
                        for (name, up) in agents {
                            println!("  {name}: {}", if up.as_bool().unwrap_or(false) { "up" } else { "down" });
                        }
                    }
                }
                Err(e) => println!("status unavailable: {e}"),
            },
            Err(e) => println!("status unavailable: {e}"),
        }
    }

    async fn clear_session(&mut self) {
        if let Some(id) = self.session_id.take() {
            let _ = self
                .http
                .delete(format!("{}/api/sessions/{id}", self.base_url))
                .send()
                .await;
            println!("session cleared");
        } else {
            println!("no session yet");
        }
    }

    async fn show_history(&self) {
        let Some(id) = &self.session_id else {
            println!("no session yet");
            return;
        };
        match self
            .http
            .get(format!("{}/api/sessions/{id}/history", self.base_url))
            .send()
            .await
        {
            Ok(response) => match response.json::<Value>().await {
                Ok(body) => {
                    let empty = Vec::new();
                    for turn in body["history"].as_array().unwrap_or(&empty) {
                        println!(
                            "  {}: {}",
                            turn["role"].as_str().unwrap_or("?"),
                            turn["content"].as_str().unwrap_or("")
                        );
                    }
                }
                Err(e) => println!("history unavailable: {e}"),
            },
            Err(e) => println!("history unavailable: {e}"),
        }
    }

    fn chat_body(&self, message: &str) -> Value {
        let mut body = serde_json::json!({"message": message});
        if let Some(id) = &self.session_id {
            body["session_id"] = Value::String(id.clone());
        }
        body
    }

    async fn send_plain(&mut self, message: &str) {
        let result = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .json(&self.chat_body(message))
            .send()
            .await;
        match result {
            Ok(response) => match response.json::<ChatResponse>().await {
                Ok(chat) => self.render_response(&chat),
                Err(e) => println!("bad response: {e}"),
            },
            Err(e) => println!("request failed: {e}"),
        }
    }

    async fn send_streaming(&mut self, message: &str) {
        let result = self
            .http
            .post(format!("{}/api/chat/stream", self.base_url))
            .json(&self.chat_body(message))
            .send()
            .await;
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                println!("request failed: {e}");
                return;
            }
        };

        let mut buffer = String::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!(error = %e, "stream interrupted");
                    break;
                }
            };
            buffer.push_str(&String::from_utf8_lossy(&chunk));
            while let Some(boundary) = buffer.find("\n\n") {
                let block = buffer[..boundary].to_string();
                buffer.drain(..boundary + 2);
                self.render_sse_block(&block);
            }
        }
    }

    fn render_sse_block(&mut self, block: &str) {
        let mut kind = "message";
        let mut data = String::new();
        for line in block.lines() {
            if let Some(rest) = line.strip_prefix("event:") {
                kind = rest.trim();
            } else if let Some(rest) = line.strip_prefix("data:") {
                data.push_str(rest.trim());
            }
        }
        match kind {
            "agent_event" => {
                if let Ok(event) = serde_json::from_str::<AgentEvent>(&data) {
                    println!("  [{}] {}", event.agent, event.event_type);
                }
            }
            "result" => {
                if let Ok(chat) = serde_json::from_str::<ChatResponse>(&data) {
                    self.render_response(&chat);
                }
            }
            "error" => println!("stream error: {data}"),
            _ => {}
        }
    }

    fn render_response(&mut self, chat: &ChatResponse) {
        self.session_id = Some(chat.session_id.clone());
        println!("{}", chat.answer);
        if chat.needs_clarification {
            println!("  (waiting for your clarification)");
        }
        println!(
            "  [goal={} iterations={} tools={} {}ms]",
            chat.goal_achieved,
            chat.react_iterations,
            chat.tool_calls.len(),
            chat.duration_ms
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_body_carries_the_session_once_known() {
        let mut repl = Repl::new("http://127.0.0.1:3000".into());
        assert!(repl.chat_body("hi").get("session_id").is_none());
        repl.session_id = Some("s1".into());
        assert_eq!(repl.chat_body("hi")["session_id"], "s1");
    }
}
