//! llm-relay - load a model and stream one chat completion from the command line.

use std::env;
use std::io::Write;

use llm_relay::common::ChatMessage;
use llm_relay::{available_models, ChatSession, Config, StreamCallbacks};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_usage() {
    eprintln!("usage: llm-relay [--model <id>] [--list-models] [--version] <prompt>...");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Flags come first; the first other word starts the prompt.
    let mut model = None;
    let mut prompt_words = Vec::new();
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("llm-relay {}", VERSION);
                return Ok(());
            }
            "--list-models" => {
                for id in available_models() {
                    println!("{}", id);
                }
                return Ok(());
            }
            "--model" | "-m" => model = Some(args.next().ok_or("--model requires a value")?),
            _ => {
                prompt_words.push(arg);
                prompt_words.extend(args.by_ref());
            }
        }
    }
    if prompt_words.is_empty() {
        print_usage();
        return Err("no prompt given".into());
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load().map_err(|e| format!("Failed to load configuration: {}", e))?;
    let model = model.unwrap_or_else(|| config.defaults.model.clone());

    let session = ChatSession::from_config(&config);
    session.set_progress_callback(|text| eprintln!("[load] {}", text));

    session
        .initialize(&model, config.defaults.temperature, config.defaults.top_p)
        .await?;

    let messages = vec![ChatMessage::user(prompt_words.join(" "))];
    let mut printed = 0;
    let mut failure = None;
    let mut handler = StreamCallbacks::new(
        |text: &str| {
            // Updates carry the whole text so far; print only the new tail.
            print!("{}", &text[printed..]);
            let _ = std::io::stdout().flush();
            printed = text.len();
        },
        |_message: String, usage: llm_relay::common::Usage| {
            println!();
            eprintln!(
                "[usage] prompt={} completion={} total={}",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
            if let Some(extra) = usage.extra {
                eprintln!(
                    "[usage] prefill={:.1} tok/s decode={:.1} tok/s e2e={:.2}s",
                    extra.prefill_tokens_per_s, extra.decode_tokens_per_s, extra.e2e_latency_s
                );
            }
        },
        |error: llm_relay::Error| failure = Some(error),
    );

    session.stream_chat(messages, &mut handler).await;
    drop(handler);

    match failure {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}
