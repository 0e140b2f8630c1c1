//! Babel dialogue engine - console host.
//!
//! Reads one command per line from stdin:
//!
//! - `/talk <id>` opens a dialogue with an NPC
//! - `/next` reveals the next queued line
//! - `/skip` (or an empty line) skips the current reveal
//! - `/stop` closes the dialogue
//! - `/npcs` lists registered NPCs
//! - `/quit` exits
//!
//! Anything else is sent to the active NPC as player input.

use std::sync::Arc;

use babel_domain::NpcId;
use babel_engine::infrastructure::{
    console::{ConsolePanel, ConsoleText},
    ollama::OllamaClient,
    resilient_llm::{ResilientLlmClient, RetryConfig},
    settings::load_settings_from_env,
};
use babel_engine::roster::babel_roster;
use babel_engine::use_cases::{PlayerInput, TriggerContext};
use babel_engine::App;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root (the binary may run from `crates/engine`).
    load_dotenv_from_repo_root();

    // Initialize logging on stderr so it does not interleave with dialogue text
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "babel_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting Babel dialogue engine");

    let settings = load_settings_from_env();
    tracing::info!(
        mode = %settings.mode,
        reentry_policy = %settings.reentry_policy,
        gateway_timeout_secs = settings.gateway_timeout_secs,
        "Dialogue settings loaded"
    );

    let ollama = OllamaClient::from_env();
    let retry_config = RetryConfig::default();
    tracing::info!(
        model = ollama.model(),
        max_retries = retry_config.max_retries,
        "LLM client configured"
    );
    let llm = Arc::new(ResilientLlmClient::new(Arc::new(ollama), retry_config));

    let app = App::new(
        settings,
        llm,
        Arc::new(ConsoleText),
        Arc::new(ConsolePanel),
    );
    let loaded = app.load_npcs(babel_roster()?)?;
    tracing::info!(npcs = loaded, "Town loaded");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, arg) = line.split_once(' ').unwrap_or((line, ""));

        let result = match command {
            "/quit" => break,
            "/talk" => match arg.trim().parse::<u32>() {
                Ok(id) => app
                    .interaction
                    .try_interact(TriggerContext::player_interacting(), NpcId::new(id))
                    .await
                    .map(|opened| {
                        if opened.is_none() {
                            println!("Already talking.");
                        }
                    }),
                Err(_) => {
                    println!("Usage: /talk <npc id>");
                    Ok(())
                }
            },
            "/next" => app.dialogue.display_next_sentence().await.map(|_| ()),
            "" | "/skip" => app.dialogue.handle_input(PlayerInput::Skip).await,
            "/stop" => app.dialogue.handle_input(PlayerInput::Stop).await,
            "/npcs" => {
                for npc in app.registry.all() {
                    let npc = npc.read().await;
                    println!("{:>3}  {} ({})", npc.id(), npc.name(), npc.job());
                }
                Ok(())
            }
            _ => {
                app.dialogue
                    .handle_input(PlayerInput::Submit(line.to_string()))
                    .await
            }
        };

        if let Err(e) = result {
            tracing::warn!(error = %e, "Input rejected");
        }
    }

    app.shutdown().await;
    tracing::info!("Babel dialogue engine stopped");
    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
