use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use toolrelay_core::ConversationHub;

use crate::app::{ConfigSources, Relay};

/// Run the line-oriented chat loop on one thread.
///
/// `/clear` forgets the thread's history; `exit`, `quit`, EOF or Ctrl+C end
/// the session. Providers are shut down on every exit path.
pub async fn run_chat(
    sources: &ConfigSources,
    thread: String,
    model: Option<String>,
    mock: bool,
) -> Result<()> {
    let relay = Relay::start(sources, mock).await?;
    let orchestrator = Arc::new(relay.orchestrator(model, mock));
    let hub = ConversationHub::new(orchestrator, relay.logger.clone());

    println!(
        "toolrelay chat (thread: {thread}, providers: {})",
        relay.registry.len()
    );
    println!("Type your message and press Enter. Type 'exit' or Ctrl+D to quit.\n");

    let result = chat_loop(&hub, &thread).await;
    relay.shutdown().await;
    result
}

async fn chat_loop(hub: &ConversationHub, thread: &str) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "exit" || input == "quit" {
            break;
        }
        if input == "/clear" {
            hub.clear(thread).await;
            println!("[history cleared]\n");
            continue;
        }

        let outcome = hub.handle_message_outcome(thread, input).await;
        if let Some(error) = &outcome.error {
            eprintln!("[error: {error}]");
        }
        if outcome.rounds > 0 {
            eprintln!("[{} tool round(s)]", outcome.rounds);
        }
        println!("{}\n", outcome.text);
    }

    Ok(())
}
