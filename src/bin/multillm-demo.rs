use std::io::{self, Write};

use clap::{Parser, ValueEnum};
use futures_util::StreamExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

use multillm::http::reqwest::default_dyn_transport;
use multillm::provider::openrouter::ModelCatalog;
use multillm::{
    ChatMessage, ChatOptions, ChatOutput, ComparisonOutcome, LLMError, MultiModelManager, Settings,
    StreamProgress,
};
use serde_json::Value;

const DEFAULT_MESSAGE: &str = "Explain what a supervisor agent is. Key points only.";
const PROVIDERS: [&str; 4] = ["openai", "anthropic", "qwen", "google"];

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Ask the first model once
    Single,
    /// Ask every model concurrently and print the results side by side
    Compare,
    /// Stream every model concurrently
    Stream,
    /// List catalog models per vendor
    Provider,
}

#[derive(Parser)]
#[command(name = "multillm-demo")]
#[command(version)]
#[command(about = "Run one prompt against several LLMs through OpenRouter")]
struct Cli {
    #[arg(short, long, value_enum, default_value_t = Mode::Single)]
    mode: Mode,

    /// Catalog alias or OpenRouter model id; repeat for several (defaults to PREFERRED_MODELS)
    #[arg(long = "model")]
    models: Vec<String>,

    #[arg(long, default_value = DEFAULT_MESSAGE)]
    message: String,

    #[arg(long, default_value_t = 0.2)]
    temperature: f64,

    #[arg(long, default_value_t = 200)]
    max_tokens: u32,

    /// Stream the answer in single mode
    #[arg(long)]
    stream: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), LLMError> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Mode::Provider = cli.mode {
        print_catalog_by_provider();
        return Ok(());
    }

    let settings = Settings::from_env()?;
    let models = if cli.models.is_empty() {
        settings.preferred_models.clone()
    } else {
        cli.models.clone()
    };
    info!(
        mode = ?cli.mode,
        ?models,
        temperature = cli.temperature,
        max_tokens = cli.max_tokens,
        "starting demo"
    );

    let manager = MultiModelManager::new(&settings, default_dyn_transport()?)?;
    let messages = vec![ChatMessage::user(cli.message.clone())];
    let options = ChatOptions::default()
        .with_temperature(cli.temperature)
        .with_max_tokens(cli.max_tokens);

    println!("Question: {}", cli.message);
    println!("{}", "-".repeat(50));

    match cli.mode {
        Mode::Single => run_single(&manager, &models, messages, options, cli.stream).await,
        Mode::Compare => {
            run_compare(&manager, &models, &messages, &options).await;
            Ok(())
        }
        Mode::Stream => {
            run_stream(&manager, &models, &messages, &options).await;
            Ok(())
        }
        Mode::Provider => Ok(()),
    }
}

async fn run_single(
    manager: &MultiModelManager,
    models: &[String],
    messages: Vec<ChatMessage>,
    options: ChatOptions,
    stream: bool,
) -> Result<(), LLMError> {
    let Some(model) = models.first() else {
        return Err(LLMError::invalid_config("model", "no model selected"));
    };
    println!("Model: {model}");

    let output = manager
        .chat_with_model(model, messages, stream, options)
        .await?;
    match output {
        ChatOutput::Stream(mut chunks) => {
            while let Some(chunk) = chunks.next().await {
                let chunk = chunk?;
                if let Some(text) = chunk.content() {
                    print!("{text}");
                    let _ = io::stdout().flush();
                }
                if let Some(reason) = chunk.finish_reason() {
                    println!("\n\nFinished: {reason}");
                    break;
                }
            }
        }
        ChatOutput::Complete(response) => {
            println!("Answer: {}", response.text().unwrap_or_default());
            println!("Usage: {}", Value::Object(response.usage));
        }
    }
    Ok(())
}

async fn run_compare(
    manager: &MultiModelManager,
    models: &[String],
    messages: &[ChatMessage],
    options: &ChatOptions,
) {
    let results = manager.compare_models(models, messages, options).await;
    for (index, (model, outcome)) in results.iter().enumerate() {
        println!("\n{}. {model}", index + 1);
        match outcome {
            ComparisonOutcome::Success { response, usage, .. } => {
                println!("Answer: {response}");
                println!("Usage: {}", Value::Object(usage.clone()));
            }
            ComparisonOutcome::Error { error } => println!("Error: {error}"),
        }
        println!("{}", "-".repeat(30));
    }
}

async fn run_stream(
    manager: &MultiModelManager,
    models: &[String],
    messages: &[ChatMessage],
    options: &ChatOptions,
) {
    let observer = |progress: StreamProgress<'_>| match progress {
        StreamProgress::Started { model } => println!("\n=== {model} ==="),
        StreamProgress::Delta { model, content } => {
            print!("[{model}] {content}");
            let _ = io::stdout().flush();
        }
        StreamProgress::Finished {
            model,
            finish_reason,
        } => println!("\n[{model}] finished: {finish_reason}"),
        StreamProgress::Failed { model, error } => println!("[{model}] error: {error}"),
    };

    let results = manager
        .stream_multiple_models_with(models, messages, options, &observer)
        .await;
    let completed = results.iter().filter(|(_, text)| text.is_some()).count();
    info!(completed, total = results.len(), "streaming finished");
}

fn print_catalog_by_provider() {
    let catalog = ModelCatalog::new();
    for provider in PROVIDERS {
        println!("{} models:", provider.to_uppercase());
        for model in catalog.models_by_provider(provider) {
            println!("  - {model}");
        }
        println!();
    }
}
