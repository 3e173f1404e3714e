use futures_util::StreamExt;
use multillm::http::reqwest::default_dyn_transport;
use multillm::{ChatMessage, ChatOptions, ComparisonOutcome, MultiModelManager, Settings};

fn load_settings() -> Option<Settings> {
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("skip live test: {err}");
            return None;
        }
    };
    if settings.openrouter.api_key.is_none() {
        eprintln!("skip live test: OPENROUTER_API_KEY missing");
        return None;
    }
    Some(settings)
}

fn question() -> Vec<ChatMessage> {
    vec![
        ChatMessage::system("You are a helpful assistant."),
        ChatMessage::user("Please introduce Rust language in one sentence."),
    ]
}

#[tokio::test]
#[ignore = "requires OPENROUTER_API_KEY"]
async fn openrouter_live_single_and_stream() {
    let Some(settings) = load_settings() else {
        return;
    };
    let transport = default_dyn_transport().expect("transport");
    let manager = MultiModelManager::new(&settings, transport).expect("manager");
    let options = ChatOptions::default().with_max_tokens(100);

    let output = manager
        .chat_with_model("gpt-4.1-mini", question(), false, options.clone())
        .await
        .expect("chat request should succeed");
    let response = output.into_response().expect("complete response");
    assert!(
        response.text().is_some_and(|text| !text.trim().is_empty()),
        "chat response should contain text"
    );

    let output = manager
        .chat_with_model("gpt-4.1-mini", question(), true, options)
        .await
        .expect("stream request should succeed");
    let mut stream = output.into_stream().expect("stream output");
    let mut text = String::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.expect("stream chunk should be ok");
        if let Some(content) = chunk.content() {
            text.push_str(content);
        }
    }
    assert!(!text.is_empty(), "stream should yield text");
}

#[tokio::test]
#[ignore = "requires OPENROUTER_API_KEY"]
async fn openrouter_live_compare_reports_bad_model() {
    let Some(settings) = load_settings() else {
        return;
    };
    let transport = default_dyn_transport().expect("transport");
    let manager = MultiModelManager::new(&settings, transport).expect("manager");

    let results = manager
        .compare_models(
            &["bad-model-name-causing-error", "gpt-4.1-mini"],
            &question(),
            &ChatOptions::default().with_max_tokens(100),
        )
        .await;
    assert!(results["bad-model-name-causing-error"].is_error());
    assert!(matches!(
        results["gpt-4.1-mini"],
        ComparisonOutcome::Success { .. }
    ));
}
