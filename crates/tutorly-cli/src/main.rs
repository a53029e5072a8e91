mod commands;
mod config;

use anyhow::Context;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::{render_message, render_notice, render_previews, render_thread, Command, HELP};
use config::Config;
use tutorly_api::HttpChatApi;
use tutorly_chat::{ChatNotice, ChatSession, PageOutcome};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load().context("Failed to load configuration")?;

    init_logging(&config);

    tracing::info!("Starting Tutorly chat client");
    tracing::info!("API: {}, realtime: {}", config.api.base_url, config.realtime.url);

    let api = Arc::new(HttpChatApi::new(config.api.clone()).context("Failed to build API client")?);
    let session = Arc::new(
        ChatSession::builder()
            .api(api)
            .transport_config(config.realtime.clone())
            .config(config.chat.clone())
            .build()?,
    );

    let printer = tokio::spawn(print_notices(Arc::clone(&session)));

    if let Err(e) = session.start().await {
        tracing::error!("Chat session did not fully start: {}", e);
    }
    println!("{}", render_previews(&session.previews()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(usage) => {
                println!("{}", usage);
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        if let Err(e) = run(&session, command).await {
            println!("error: {}", e);
        }
    }

    session.shutdown().await;
    printer.abort();
    Ok(())
}

async fn run(session: &ChatSession, command: Command) -> anyhow::Result<()> {
    match command {
        Command::List => println!("{}", render_previews(&session.previews())),
        Command::Open(thread_id) => {
            let outcome = session.select(thread_id).await?;
            if let Some(e) = outcome.backfill_error {
                println!("could not load history: {}", e);
            }
            println!("{}", render_thread(&outcome.thread));
        }
        Command::Older => {
            let thread_id = session
                .active_thread()
                .context("open a chat first")?;
            match session.load_older(thread_id).await? {
                PageOutcome::Loaded { added, .. } => {
                    if let Some(thread) = session.thread(thread_id) {
                        println!("{}", render_thread(&thread));
                    }
                    println!("-- {} older messages loaded", added);
                }
                PageOutcome::Exhausted => println!("-- beginning of conversation"),
                PageOutcome::InFlight => println!("-- already loading"),
            }
        }
        Command::Chat(user_id) => {
            let thread_id = session.open_chat_with(user_id).await?;
            let outcome = session.select(thread_id).await?;
            println!("{}", render_thread(&outcome.thread));
        }
        Command::Send(text) => {
            let thread_id = session
                .active_thread()
                .context("open a chat first")?;
            session.send_text(thread_id, &text).await?;
        }
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }
    Ok(())
}

async fn print_notices(session: Arc<ChatSession>) {
    let mut notices = session.subscribe_notices();
    loop {
        match notices.recv().await {
            Ok(ChatNotice::Incoming { thread_id, message_id }) => {
                let Some(thread) = session.thread(thread_id) else {
                    continue;
                };
                if let Some(message) = thread.messages().iter().find(|m| m.id == message_id) {
                    println!("[{}] {}", thread.title(), render_message(message));
                }
            }
            Ok(notice) => {
                if let Some(text) = render_notice(&notice) {
                    println!("{}", text);
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("Skipped {} chat notices", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}
