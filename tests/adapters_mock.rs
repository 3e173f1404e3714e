mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::StreamExt;
use multillm::http::HttpMethod;
use multillm::provider::{ClaudeAdapter, OpenAiAdapter, OpenRouterAdapter, QwenAdapter};
use multillm::{
    ChatAdapter, ChatMessage, ChatOptions, ChatOutput, ChatStream, CompletionRequest, LLMError,
    ParamFallback, ParseFailure, ParseFailureHook, ProviderKind, Role, Settings, create_client,
};
use serde_json::json;

use common::{
    MockReply, MockTransport, body_json, openai_completion, openai_delta, openai_finish,
};

fn settings() -> Settings {
    Settings {
        timeout_secs: 12.0,
        ..Settings::default()
    }
    .with_api_key(ProviderKind::OpenAi, "sk-openai")
    .with_api_key(ProviderKind::Claude, "sk-ant-claude")
    .with_api_key(ProviderKind::Qwen, "sk-dashscope")
    .with_api_key(ProviderKind::OpenRouter, "sk-or-v1-router")
}

fn conversation() -> CompletionRequest {
    CompletionRequest::new(vec![
        ChatMessage::system("You are concise."),
        ChatMessage::user("What is Rust?"),
    ])
}

async fn collect_text(mut stream: ChatStream) -> (String, Vec<Option<String>>) {
    let mut text = String::new();
    let mut reasons = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.expect("chunk");
        if let Some(content) = chunk.content() {
            text.push_str(content);
        }
        reasons.push(chunk.finish_reason().map(str::to_string));
    }
    (text, reasons)
}

#[tokio::test]
async fn openai_complete_sends_payload_and_passes_body_through() {
    let transport = MockTransport::replying(MockReply::json(
        200,
        openai_completion("gpt-4.1-mini", "A systems language."),
    ));
    let adapter = OpenAiAdapter::from_settings(&settings(), transport.clone()).expect("adapter");

    let request = conversation().with_options(ChatOptions::default().with_extra("top_p", 0.5));
    let response = adapter.complete(request).await.expect("response");
    assert_eq!(response.choices.len(), 1);
    assert_eq!(response.choices[0].message.role, Role::Assistant);
    assert_eq!(response.text(), Some("A systems language."));
    assert_eq!(response.usage["total_tokens"], json!(20));
    assert_eq!(response.extra["id"], json!("gen-1"));

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    let sent = &requests[0];
    assert_eq!(sent.method, HttpMethod::Post);
    assert_eq!(sent.url, "https://api.openai.com/v1/chat/completions");
    assert_eq!(sent.timeout, Some(Duration::from_secs(12)));
    assert_eq!(
        sent.headers.get("Authorization").map(String::as_str),
        Some("Bearer sk-openai")
    );
    assert_eq!(
        body_json(sent),
        json!({
            "model": "gpt-4.1-mini",
            "messages": [
                { "role": "system", "content": "You are concise." },
                { "role": "user", "content": "What is Rust?" }
            ],
            "max_tokens": 1000,
            "temperature": 0.7,
            "stream": false,
            "top_p": 0.5
        })
    );
}

#[tokio::test]
async fn openrouter_sends_attribution_headers_and_sampling_extras() {
    let transport = MockTransport::replying(MockReply::json(
        200,
        openai_completion("anthropic/claude-sonnet-4", "ok"),
    ));
    let adapter = OpenRouterAdapter::from_settings(&settings(), transport.clone())
        .expect("adapter")
        .with_base_url("http://localhost:8080/api/v1/");

    let options = ChatOptions::default()
        .with_model("anthropic/claude-sonnet-4")
        .with_extra("top_k", 20)
        .with_extra("repetition_penalty", 1.1)
        .with_extra("unsupported", true);
    adapter
        .complete(conversation().with_options(options))
        .await
        .expect("response");

    let sent = &transport.requests()[0];
    assert_eq!(sent.url, "http://localhost:8080/api/v1/chat/completions");
    assert_eq!(
        sent.headers.get("HTTP-Referer").map(String::as_str),
        Some("http://localhost:3000")
    );
    assert_eq!(
        sent.headers.get("X-Title").map(String::as_str),
        Some("Multi-LLM Client")
    );
    let body = body_json(sent);
    assert_eq!(body["model"], json!("anthropic/claude-sonnet-4"));
    assert_eq!(body["top_k"], json!(20));
    assert_eq!(body["repetition_penalty"], json!(1.1));
    assert!(body.get("unsupported").is_none());
}

#[tokio::test]
async fn claude_maps_messages_api_response() {
    let transport = MockTransport::replying(MockReply::json(
        200,
        json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "model": "claude-3-haiku-20240307",
            "content": [{ "type": "text", "text": "Rust is a language." }],
            "stop_reason": "end_turn",
            "usage": { "input_tokens": 10, "output_tokens": 5 }
        }),
    ));
    let adapter = ClaudeAdapter::from_settings(&settings(), transport.clone()).expect("adapter");

    let response = adapter.complete(conversation()).await.expect("response");
    assert_eq!(response.text(), Some("Rust is a language."));
    assert_eq!(response.choices[0].finish_reason.as_deref(), Some("end_turn"));
    assert_eq!(response.model, "claude-3-haiku-20240307");

    let sent = &transport.requests()[0];
    assert_eq!(sent.url, "https://api.anthropic.com/v1/messages");
    assert_eq!(
        sent.headers.get("x-api-key").map(String::as_str),
        Some("sk-ant-claude")
    );
    assert_eq!(
        sent.headers.get("anthropic-version").map(String::as_str),
        Some("2023-06-01")
    );
    let body = body_json(sent);
    assert_eq!(body["system"], json!("You are concise."));
    assert_eq!(
        body["messages"],
        json!([{ "role": "user", "content": "What is Rust?" }])
    );
    assert!(body.get("temperature").is_none());
}

#[tokio::test]
async fn qwen_maps_dashscope_response_with_requested_model() {
    let transport = MockTransport::replying(MockReply::json(
        200,
        json!({
            "output": {
                "choices": [{
                    "message": { "role": "assistant", "content": "Rust 是一门系统编程语言。" },
                    "finish_reason": "stop"
                }]
            },
            "usage": { "input_tokens": 12, "output_tokens": 9, "total_tokens": 21 },
            "request_id": "req-1"
        }),
    ));
    let adapter = QwenAdapter::from_settings(&settings(), transport.clone()).expect("adapter");

    let request = conversation().with_options(ChatOptions::default().with_model("qwen-max"));
    let response = adapter.complete(request).await.expect("response");
    assert_eq!(response.text(), Some("Rust 是一门系统编程语言。"));
    assert_eq!(response.model, "qwen-max");
    assert_eq!(response.usage["total_tokens"], json!(21));

    let sent = &transport.requests()[0];
    assert_eq!(
        sent.url,
        "https://dashscope.aliyuncs.com/api/v1/services/aigc/text-generation/generation"
    );
    let body = body_json(sent);
    assert_eq!(body["input"]["messages"][0]["role"], json!("system"));
    assert_eq!(body["parameters"]["result_format"], json!("message"));
    assert_eq!(body["parameters"]["incremental_output"], json!(false));
}

#[tokio::test]
async fn status_codes_map_to_provider_tagged_errors() {
    let cases: Vec<(ProviderKind, u16, &str)> = vec![
        (ProviderKind::Claude, 401, "Claude: authentication failed"),
        (ProviderKind::OpenRouter, 402, "OpenRouter: insufficient credits"),
        (ProviderKind::Qwen, 429, "Qwen: rate limit exceeded"),
        (ProviderKind::OpenAi, 500, "OpenAI: API call failed (500) - upstream exploded"),
    ];

    for (kind, status, expected) in cases {
        let transport = MockTransport::replying(
            MockReply::text(status, "upstream exploded").with_header("Retry-After", "4"),
        );
        let adapter =
            create_client(kind.as_str(), &settings(), transport.clone()).expect("adapter");
        let err = adapter.complete(conversation()).await.expect_err("status error");
        let message = err.to_string();
        assert!(
            message.starts_with(expected),
            "{kind}: unexpected message {message}"
        );
        assert_eq!(transport.call_count(), 1, "{kind}: no retries expected");
        if let LLMError::RateLimit { retry_after, .. } = err {
            assert_eq!(retry_after, Some(Duration::from_secs(4)));
        }
    }
}

#[tokio::test]
async fn openrouter_stream_stops_at_first_finish_reason() {
    let lines = [
        ": OPENROUTER PROCESSING".to_string(),
        openai_delta("Hello"),
        String::new(),
        openai_delta(", world"),
        "data: {broken".to_string(),
        openai_finish("stop"),
        openai_delta("never yielded"),
        "data: [DONE]".to_string(),
    ];
    let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
    let transport = MockTransport::replying(MockReply::sse(&lines));
    let adapter =
        OpenRouterAdapter::from_settings(&settings(), transport.clone()).expect("adapter");

    let stream = adapter.stream(conversation()).await.expect("stream");
    let (text, reasons) = collect_text(stream).await;
    assert_eq!(text, "Hello, world");
    assert_eq!(reasons, vec![None, None, Some("stop".to_string())]);
    assert_eq!(body_json(&transport.requests()[0])["stream"], json!(true));
}

#[tokio::test]
async fn claude_stream_translates_event_types() {
    let transport = MockTransport::replying(MockReply::sse(&[
        "event: message_start",
        r#"data: {"type":"message_start","message":{"id":"msg_1","model":"claude-3-haiku-20240307"}}"#,
        r#"data: {"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#,
        "event: ping",
        r#"data: {"type":"ping"}"#,
        r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hello"}}"#,
        r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":" there"}}"#,
        r#"data: {"type":"content_block_stop","index":0}"#,
        r#"data: {"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":2}}"#,
        r#"data: {"type":"message_stop"}"#,
    ]));
    let adapter = ClaudeAdapter::from_settings(&settings(), transport).expect("adapter");

    let stream = adapter.stream(conversation()).await.expect("stream");
    let (text, reasons) = collect_text(stream).await;
    assert_eq!(text, "Hello there");
    assert_eq!(reasons.last(), Some(&Some("stop".to_string())));
    assert_eq!(reasons.len(), 3);
}

#[tokio::test]
async fn qwen_stream_normalizes_null_finish_reason() {
    let transport = MockTransport::replying(MockReply::sse(&[
        "id:1",
        "event:result",
        r#"data:{"output":{"choices":[{"message":{"content":"Rust","role":"assistant"},"finish_reason":"null"}]}}"#,
        "",
        "id:2",
        r#"data:{"output":{"choices":[{"message":{"content":" rocks","role":"assistant"},"finish_reason":"stop"}]}}"#,
    ]));
    let adapter = QwenAdapter::from_settings(&settings(), transport.clone()).expect("adapter");

    let stream = adapter.stream(conversation()).await.expect("stream");
    let (text, reasons) = collect_text(stream).await;
    assert_eq!(text, "Rust rocks");
    assert_eq!(reasons, vec![None, Some("stop".to_string())]);

    let sent = &transport.requests()[0];
    assert_eq!(body_json(sent)["parameters"]["incremental_output"], json!(true));
    assert_eq!(
        sent.headers.get("X-DashScope-SSE").map(String::as_str),
        Some("enable")
    );
}

#[tokio::test]
async fn stream_error_status_drains_body_into_error() {
    let transport = MockTransport::replying(MockReply::text(
        401,
        r#"{"type":"error","error":{"type":"authentication_error"}}"#,
    ));
    let adapter = ClaudeAdapter::from_settings(&settings(), transport).expect("adapter");

    let err = adapter
        .stream(conversation())
        .await
        .err()
        .expect("auth error");
    assert!(matches!(err, LLMError::Auth { provider: "Claude" }));
}

#[tokio::test]
async fn chat_completion_dispatches_on_stream_flag() {
    let transport = MockTransport::new(|request| {
        if body_json(request)["stream"] == json!(true) {
            MockReply::sse(&[
                r#"data: {"choices":[{"delta":{"content":"hi"},"finish_reason":"stop"}]}"#,
            ])
        } else {
            MockReply::json(200, openai_completion("gpt-4.1-mini", "hi"))
        }
    });
    let adapter = OpenAiAdapter::from_settings(&settings(), transport).expect("adapter");

    let output = adapter
        .chat_completion(conversation())
        .await
        .expect("output");
    assert!(matches!(output, ChatOutput::Complete(_)));

    let output = adapter
        .chat_completion(conversation().streaming(true))
        .await
        .expect("output");
    let stream = output.into_stream().expect("stream output");
    let (text, _) = collect_text(stream).await;
    assert_eq!(text, "hi");
}

#[tokio::test]
async fn static_catalogs_make_no_network_calls() {
    let transport = MockTransport::replying(MockReply::text(500, "unexpected call"));
    let settings = settings();

    let claude = ClaudeAdapter::from_settings(&settings, transport.clone()).expect("adapter");
    let ids: Vec<String> = claude
        .get_available_models()
        .await
        .expect("models")
        .into_iter()
        .map(|model| model.id)
        .collect();
    assert_eq!(
        ids,
        vec![
            "claude-3-opus-20240229",
            "claude-3-sonnet-20240229",
            "claude-3-haiku-20240307"
        ]
    );
    assert!(!claude.capabilities().supports_live_model_listing);

    let qwen = QwenAdapter::from_settings(&settings, transport.clone()).expect("adapter");
    let models = qwen.get_available_models().await.expect("models");
    assert_eq!(models.len(), 3);
    assert!(models.iter().all(|model| model.object == "model"));

    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn live_listing_issues_get_models() {
    let transport = MockTransport::replying(MockReply::json(
        200,
        json!({ "data": [
            { "id": "openai/gpt-5", "context_length": 400000 },
            { "id": "qwen/qwen3-coder" }
        ] }),
    ));
    let adapter =
        OpenRouterAdapter::from_settings(&settings(), transport.clone()).expect("adapter");

    let models = adapter.get_available_models().await.expect("models");
    assert_eq!(models.len(), 2);
    assert_eq!(models[0].extra["context_length"], json!(400000));

    let sent = &transport.requests()[0];
    assert_eq!(sent.method, HttpMethod::Get);
    assert_eq!(sent.url, "https://openrouter.ai/api/v1/models");
    assert!(adapter.capabilities().supports_live_model_listing);
}

#[tokio::test]
async fn empty_conversation_fails_before_any_request() {
    let transport = MockTransport::replying(MockReply::json(200, json!({})));
    let settings = settings();

    for id in multillm::get_available_providers() {
        let adapter = create_client(id, &settings, transport.clone()).expect("adapter");
        let err = adapter
            .complete(CompletionRequest::default())
            .await
            .expect_err("validation");
        assert!(matches!(err, LLMError::Validation { .. }), "{id}: {err}");
        assert!(adapter.stream(CompletionRequest::default()).await.is_err());
    }
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn unknown_provider_is_rejected_without_network() {
    let transport = MockTransport::replying(MockReply::json(200, json!({})));
    let err = create_client("gemini", &settings(), transport.clone())
        .err()
        .expect("invalid config");
    assert!(matches!(err, LLMError::InvalidConfig { .. }));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn identical_requests_produce_identical_payloads() {
    let transport = MockTransport::replying(MockReply::json(200, openai_completion("m", "x")));
    let adapter =
        OpenRouterAdapter::from_settings(&settings(), transport.clone()).expect("adapter");

    let request = conversation().with_options(
        ChatOptions::default()
            .with_temperature(0.3)
            .with_extra("top_p", 0.8)
            .with_extra("top_k", 5),
    );
    adapter.complete(request.clone()).await.expect("first");
    adapter.complete(request).await.expect("second");

    let requests = transport.requests();
    assert_eq!(requests[0].body, requests[1].body);
}

#[tokio::test]
async fn zero_temperature_follows_fallback_policy() {
    let request = conversation().with_options(
        ChatOptions::default()
            .with_temperature(0.0)
            .with_max_tokens(0),
    );

    for (fallback, temperature, max_tokens) in [
        (ParamFallback::Presence, json!(0.0), json!(0)),
        (ParamFallback::Falsy, json!(0.7), json!(1000)),
    ] {
        let transport = MockTransport::replying(MockReply::json(200, openai_completion("m", "x")));
        let settings = Settings {
            param_fallback: fallback,
            ..settings()
        };
        let adapter =
            OpenRouterAdapter::from_settings(&settings, transport.clone()).expect("adapter");
        adapter.complete(request.clone()).await.expect("response");

        let body = body_json(&transport.requests()[0]);
        assert_eq!(body["temperature"], temperature, "{fallback:?}");
        assert_eq!(body["max_tokens"], max_tokens, "{fallback:?}");
    }
}

#[tokio::test]
async fn parse_failure_hook_observes_dropped_lines() {
    let failures: Arc<Mutex<Vec<ParseFailure>>> = Arc::default();
    let sink = Arc::clone(&failures);
    let hook: ParseFailureHook = Arc::new(move |failure: &ParseFailure| {
        sink.lock().expect("lock").push(failure.clone());
    });

    let finish = openai_finish("stop");
    let transport = MockTransport::replying(MockReply::sse(&["data: {not json", finish.as_str()]));
    let adapter = OpenAiAdapter::from_settings(&settings(), transport)
        .expect("adapter")
        .with_parse_failure_hook(hook);

    let stream = adapter.stream(conversation()).await.expect("stream");
    let (_, reasons) = collect_text(stream).await;
    assert_eq!(reasons, vec![Some("stop".to_string())]);

    let failures = failures.lock().expect("lock");
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].provider, "OpenAI");
    assert_eq!(failures[0].line, "data: {not json");
}

#[tokio::test]
async fn claude_system_only_conversation_is_forwarded() {
    let transport = MockTransport::replying(MockReply::json(
        200,
        json!({
            "model": "claude-3-haiku-20240307",
            "content": [{ "type": "text", "text": "Hello." }],
            "stop_reason": "end_turn"
        }),
    ));
    let adapter = ClaudeAdapter::from_settings(&settings(), transport.clone()).expect("adapter");

    let request = CompletionRequest::new(vec![
        ChatMessage::system("Greet the user."),
        ChatMessage::system("Be brief."),
    ]);
    adapter.complete(request).await.expect("response");

    let body = body_json(&transport.requests()[0]);
    assert_eq!(body["system"], json!("Greet the user."));
    assert_eq!(body["messages"], json!([]));
}

#[test]
fn unusable_timeout_is_rejected_at_construction() {
    let transport = MockTransport::replying(MockReply::json(200, json!({})));
    let settings: Settings = serde_json::from_value(json!({
        "openrouter": { "api_key": "sk-or-v1-x", "model": "m" },
        "timeout_secs": -1.0
    }))
    .expect("settings");

    let err = OpenRouterAdapter::from_settings(&settings, transport.clone())
        .err()
        .expect("invalid timeout");
    assert!(matches!(err, LLMError::InvalidConfig { ref field, .. } if field == "timeout"));

    let settings = Settings {
        timeout_secs: f64::NAN,
        ..self::settings()
    };
    for id in multillm::get_available_providers() {
        let err = create_client(id, &settings, transport.clone())
            .err()
            .expect("invalid timeout");
        assert!(matches!(err, LLMError::InvalidConfig { .. }), "{id}: {err}");
    }
    assert_eq!(transport.call_count(), 0);
}
