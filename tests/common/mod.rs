#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::stream;
use multillm::error::LLMError;
use multillm::http::{HttpRequest, HttpResponse, HttpStreamResponse, HttpTransport};
use serde_json::Value;

/// Canned reply; `chunks` are concatenated for `send` and streamed one by one for `send_stream`.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub chunks: Vec<Vec<u8>>,
}

impl MockReply {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            chunks: vec![body.to_string().into_bytes()],
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            chunks: vec![body.as_bytes().to_vec()],
        }
    }

    /// One network chunk per line, each terminated by `\n`.
    pub fn sse(lines: &[&str]) -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            chunks: lines
                .iter()
                .map(|line| format!("{line}\n").into_bytes())
                .collect(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }
}

type Responder = Box<dyn Fn(&HttpRequest) -> MockReply + Send + Sync>;

/// In-memory transport that records every request.
pub struct MockTransport {
    responder: Responder,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&HttpRequest) -> MockReply + Send + Sync + 'static,
    {
        Arc::new(Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(reply: MockReply) -> Arc<Self> {
        Self::new(move |_| reply.clone())
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("lock").clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().expect("lock").len()
    }

    fn reply(&self, request: HttpRequest) -> MockReply {
        let reply = (self.responder)(&request);
        self.requests.lock().expect("lock").push(request);
        reply
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LLMError> {
        let reply = self.reply(request);
        Ok(HttpResponse {
            status: reply.status,
            headers: reply.headers,
            body: reply.chunks.concat(),
        })
    }

    async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, LLMError> {
        let reply = self.reply(request);
        let chunks: Vec<Result<Vec<u8>, LLMError>> = reply.chunks.into_iter().map(Ok).collect();
        Ok(HttpStreamResponse {
            status: reply.status,
            headers: reply.headers,
            body: Box::pin(stream::iter(chunks)),
        })
    }
}

/// Parses the JSON body of a recorded request.
pub fn body_json(request: &HttpRequest) -> Value {
    serde_json::from_slice(request.body.as_deref().unwrap_or_default()).expect("json body")
}

/// Model requested in a recorded OpenAI-compatible body.
pub fn requested_model(request: &HttpRequest) -> String {
    body_json(request)["model"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

pub fn openai_completion(model: &str, content: &str) -> Value {
    serde_json::json!({
        "id": "gen-1",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": model,
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 12, "completion_tokens": 8, "total_tokens": 20 }
    })
}

pub fn openai_delta(content: &str) -> String {
    format!(
        "data: {}",
        serde_json::json!({ "choices": [{ "index": 0, "delta": { "content": content }, "finish_reason": null }] })
    )
}

pub fn openai_finish(reason: &str) -> String {
    format!(
        "data: {}",
        serde_json::json!({ "choices": [{ "index": 0, "delta": {}, "finish_reason": reason }] })
    )
}
