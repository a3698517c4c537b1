//! Command execution.

use anyhow::{Context, Result};
use lexchat_core::{MessageDraft, SharedChat};
use std::io::Write;
use telemetry::{health, metrics};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::debug;

use super::app::App;
use super::args::Commands;
use super::output::{millis_to_utc, print_message, print_outcome, print_status, StatusReport};

/// Line reader over stdin.
pub struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Prints `label` and reads one line. `None` on end of input.
    pub async fn line(&mut self, label: &str) -> Result<Option<String>> {
        print!("{}", label);
        std::io::stdout().flush().context("Failed to write to stdout")?;
        self.lines
            .next_line()
            .await
            .context("Failed to read from stdin")
    }
}

pub async fn execute(app: App, command: Commands) -> Result<()> {
    match command {
        Commands::Chat { chat } => {
            if let Some(chat_id) = chat {
                app.workflow.select_chat(chat_id);
            }
            chat_loop(&app, None).await
        }
        Commands::Send { chat, message } => {
            if let Some(chat_id) = chat {
                app.workflow.select_chat(chat_id);
            }
            let outcome = app.send(MessageDraft::text(message.join(" "))).await?;
            print_outcome(&outcome);
            Ok(())
        }
        Commands::Login { username, password } => {
            let password = password_or_prompt(password).await?;
            let credentials = app.login(&username, &password).await?;
            println!("Logged in as {}", credentials.email);
            Ok(())
        }
        Commands::Register { email, password } => {
            let password = password_or_prompt(password).await?;
            let credentials = app.register(&email, &password).await?;
            println!("Account created, logged in as {}", credentials.email);
            Ok(())
        }
        Commands::Logout => {
            app.auth().clear();
            println!("Logged out");
            Ok(())
        }
        Commands::Status { json } => {
            app.backend.check_reachable().await;
            let report = status_report(&app);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_status(&report);
            }
            Ok(())
        }
        Commands::Chats => {
            let backend = &app.backend;
            let chats = app
                .authorized(|token| async move { backend.list_chats(&token).await })
                .await?;

            if chats.is_empty() {
                println!("No chats yet");
            }
            for chat in chats {
                println!("{}  {}  {}", chat.id, chat.updated_at, chat.title);
            }
            Ok(())
        }
        Commands::History { chat_id } => {
            let backend = &app.backend;
            let id = chat_id.as_str();
            let messages = app
                .authorized(|token| async move { backend.chat_history(&token, id).await })
                .await?;

            for message in &messages {
                print_message(message);
            }
            Ok(())
        }
        Commands::Shared { chat_id } => {
            let shared = app
                .backend
                .shared_chat(&chat_id)
                .await
                .with_context(|| format!("Failed to open shared chat {}", chat_id))?;

            if let Some(title) = &shared.title {
                println!("== {} ==", title);
                println!();
            }
            for message in &shared.messages {
                print_message(message);
            }
            println!("Your next message continues this conversation in a new chat.");
            chat_loop(&app, Some(shared)).await
        }
    }
}

pub fn status_report(app: &App) -> StatusReport {
    let mut tracker = app.workflow.tracker().lock();
    tracker.refresh_from_store();
    StatusReport {
        email: app.auth().credentials().map(|c| c.email),
        session: tracker.snapshot(),
        message_limit: tracker.config().message_limit,
        remaining: tracker.remaining(),
        resets_at: tracker.resets_at().and_then(millis_to_utc),
        persistent: tracker.is_persistent(),
        health: health().report(),
        metrics: metrics().snapshot(),
    }
}

async fn password_or_prompt(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }
    Prompt::new()
        .line("Password: ")
        .await?
        .context("No password given")
}

/// Interactive loop. A pending shared chat is continued by the first message.
async fn chat_loop(app: &App, mut shared: Option<SharedChat>) -> Result<()> {
    let mut prompt = Prompt::new();
    println!("Type a message, /new for a new chat, /status, or /quit.");

    while let Some(line) = prompt.line("> ").await? {
        let text = line.trim();
        match text {
            "" => continue,
            "/quit" | "/exit" => break,
            "/new" => {
                app.workflow.new_chat();
                shared = None;
                println!("Started a new chat");
                continue;
            }
            "/status" => {
                print_status(&status_report(app));
                continue;
            }
            _ => {}
        }

        let result = match &shared {
            Some(chat) => app.continue_shared(chat, text).await,
            None => app.send(MessageDraft::text(text)).await,
        };

        match result {
            Ok(outcome) => {
                if outcome.delivery().is_some() {
                    shared = None;
                }
                print_outcome(&outcome);
            }
            Err(e) => {
                debug!(error = ?e, "Send failed");
                eprintln!("Could not send message: {}", e);
            }
        }
    }

    Ok(())
}
