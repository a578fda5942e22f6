//! chat-stream CLI: send one message and print the streamed reply as it arrives.
//!
//! Usage:
//!   chat-stream-cli send <message> [--conversation <id>] [--model <id>] [--thinking] [--no-stream] [--config <yaml>]
//!   chat-stream-cli version
//!   chat-stream-cli help

use anyhow::{anyhow, bail, Context};
use chat_stream::transport::EnvToken;
use chat_stream::types::SendMessagePayload;
use chat_stream::{
    CancelHandle, ChatCompletionChunk, Error, RequestSpec, SessionOutcome, StreamConfig,
    StreamObserver, StreamingReplyConsumer,
};
use std::io::Write;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    match args[1].as_str() {
        "send" => {
            if let Err(e) = cmd_send(&args[2..]).await {
                eprintln!("Error: {e:#}");
                std::process::exit(1);
            }
        }
        "version" | "--version" | "-V" => {
            println!("chat-stream-cli {}", env!("CARGO_PKG_VERSION"));
        }
        "help" | "--help" | "-h" => print_usage(),
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!(
        r#"chat-stream-cli: stream a chat reply to stdout

USAGE:
    chat-stream-cli <COMMAND> [OPTIONS]

COMMANDS:
    send <message>              Send a message and print the reply
        --conversation <id>     Conversation id (default 0: create on first send)
        --model <id>            Model id to request
        --thinking              Ask for extended thinking
        --no-stream             Request a single JSON reply instead of a stream
        --config <path>         YAML config file
    version                     Show version information
    help                        Show this help message

ENVIRONMENT:
    CHAT_STREAM_BASE_URL        Backend base URL
    CHAT_STREAM_HEARTBEAT_SECS  Stall window in seconds (default 15)
    CHAT_STREAM_TOKEN           Bearer token
    RUST_LOG                    Log filter (default warn)"#
    );
}

#[derive(Debug, Default)]
struct SendOptions {
    message: Option<String>,
    conversation_id: u64,
    model: Option<String>,
    thinking: bool,
    no_stream: bool,
    config: Option<String>,
}

impl SendOptions {
    fn parse(args: &[String]) -> anyhow::Result<Self> {
        let mut opts = SendOptions::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--conversation" => {
                    let v = iter.next().ok_or_else(|| anyhow!("--conversation needs a value"))?;
                    opts.conversation_id = v
                        .parse()
                        .with_context(|| format!("invalid conversation id: {v}"))?;
                }
                "--model" => {
                    opts.model = Some(iter.next().ok_or_else(|| anyhow!("--model needs a value"))?.clone());
                }
                "--config" => {
                    opts.config = Some(iter.next().ok_or_else(|| anyhow!("--config needs a value"))?.clone());
                }
                "--thinking" => opts.thinking = true,
                "--no-stream" => opts.no_stream = true,
                flag if flag.starts_with("--") => bail!("unknown option: {flag}"),
                text => {
                    if opts.message.is_some() {
                        bail!("only one message may be given");
                    }
                    opts.message = Some(text.to_string());
                }
            }
        }
        Ok(opts)
    }
}

/// Prints fragments as they arrive and keeps the terminal error, if any.
#[derive(Default)]
struct StdoutObserver {
    error: Option<Error>,
    printed: bool,
}

impl StreamObserver for StdoutObserver {
    fn on_delta(&mut self, fragment: &str, _chunk: &ChatCompletionChunk) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(fragment.as_bytes());
        let _ = out.flush();
        self.printed = true;
    }

    fn on_done(&mut self) {
        if self.printed {
            println!();
        }
    }

    fn on_error(&mut self, error: Error) {
        if self.printed {
            println!();
        }
        self.error = Some(error);
    }

    fn on_cancelled(&mut self) {
        eprintln!("\n[cancelled]");
    }
}

async fn cmd_send(args: &[String]) -> anyhow::Result<()> {
    let opts = SendOptions::parse(args)?;
    let message = opts
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| anyhow!("a non-empty message is required"))?;

    let config = match &opts.config {
        Some(path) => StreamConfig::from_yaml_file(path)?.with_env_overrides(),
        None => StreamConfig::from_env(),
    };
    let consumer = StreamingReplyConsumer::builder()
        .config(config)
        .token_provider(Arc::new(EnvToken::default()))
        .build()?;

    let mut payload = SendMessagePayload::new(message);
    if let Some(model) = opts.model {
        payload = payload.model(model);
    }
    if opts.thinking {
        payload = payload.thinking(true);
    }
    let request = if opts.no_stream {
        RequestSpec::unstreamed(opts.conversation_id, payload)
    } else {
        RequestSpec::streamed(opts.conversation_id, payload)
    };

    let cancel = CancelHandle::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.abort();
        }
    });

    let mut observer = StdoutObserver::default();
    let (outcome, stats) = consumer.run(&request, &mut observer, &cancel).await;
    tracing::debug!(?stats, "session stats");

    match outcome {
        SessionOutcome::Completed | SessionOutcome::Cancelled => Ok(()),
        SessionOutcome::Failed => Err(observer
            .error
            .map(anyhow::Error::from)
            .unwrap_or_else(|| anyhow!("stream failed"))),
    }
}
